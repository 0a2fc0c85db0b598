use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "kernel")]
pub struct Model {
    /// 内核标识，如 `xray`
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    /// engine 或 node
    pub category: String,
    pub kernel_type: String,
    /// 支持的协议（JSON 数组）
    #[sea_orm(column_type = "Text")]
    pub protocols: String,
    pub status: String,
    /// 每次写入配置加一，用于乐观并发控制
    pub version: i32,
    /// 内核配置（JSON）
    #[sea_orm(column_type = "Text")]
    pub config: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

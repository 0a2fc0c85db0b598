use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "managed_host")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub address: String,
    pub port: i32,
    /// 传输层配置（JSON 文本）
    #[sea_orm(column_type = "Text")]
    #[serde(rename = "networkConfig")]
    pub network_config: String,
    /// TLS / Reality 等安全层配置（JSON 文本）
    #[sea_orm(column_type = "Text")]
    #[serde(rename = "streamSecurityConfig")]
    pub stream_security_config: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

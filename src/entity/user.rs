use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 订阅用户
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub username: String,
    #[serde(rename = "kernelId")]
    pub kernel_id: String,
    pub protocol: String,
    #[serde(rename = "dataAllowanceGB")]
    pub data_allowance_gb: f64,
    #[serde(rename = "dataUsedGB")]
    pub data_used_gb: f64,
    #[serde(rename = "validityPeriodDays")]
    pub validity_period_days: i32,
    #[sea_orm(unique)]
    #[serde(rename = "sublinkPath")]
    pub sublink_path: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

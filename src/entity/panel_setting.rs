use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "panel_setting")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// 设置键名
    #[sea_orm(unique)]
    pub key: String,
    /// 设置值（按 value_type 编码的文本）
    #[sea_orm(column_type = "Text")]
    pub value: String,
    /// 设置说明
    pub description: String,
    /// 值类型：number, string, boolean, json
    pub value_type: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// 设置键常量
pub mod setting_keys {
    /// 面板名称
    pub const PANEL_NAME: &str = "panel_name";
    /// 管理会话超时（分钟）
    pub const SESSION_TIMEOUT_MINUTES: &str = "session_timeout_minutes";
    /// 面板级 Xray 入站列表
    pub const XRAY_INBOUNDS: &str = "xray_inbounds";
    pub const TELEGRAM_ENABLED: &str = "telegram_enabled";
    pub const TELEGRAM_BOT_TOKEN: &str = "telegram_bot_token";
    pub const TELEGRAM_ADMIN_CHAT_ID: &str = "telegram_admin_chat_id";
    /// 禁止访问的国家代码列表
    pub const BLOCKED_COUNTRIES: &str = "blocked_countries";
    pub const DOMAIN: &str = "domain";
    pub const SSL_ENABLED: &str = "ssl_enabled";
    pub const SSL_CERT_PATH: &str = "ssl_cert_path";
    pub const SSL_KEY_PATH: &str = "ssl_key_path";
}

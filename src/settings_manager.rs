use anyhow::{bail, Context};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::entity::panel_setting::{self, setting_keys};
use crate::entity::PanelSetting;
use crate::schema::settings::{
    DomainSettings, GeneralSettings, TelegramSettings, XrayInboundSetting,
};

/// 面板设置缓存管理器
#[derive(Clone)]
pub struct SettingsManager {
    db: DatabaseConnection,
    cache: Arc<RwLock<HashMap<String, SettingValue>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Number(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Json(Value),
}

impl SettingValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SettingValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<String> {
        match self {
            SettingValue::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<Value> {
        match self {
            SettingValue::Json(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// 数据库中的文本形式
    fn encode(&self) -> anyhow::Result<String> {
        Ok(match self {
            SettingValue::Number(n) => n.to_string(),
            SettingValue::Float(f) => f.to_string(),
            SettingValue::String(s) => serde_json::to_string(s)?,
            SettingValue::Boolean(b) => b.to_string(),
            SettingValue::Json(v) => serde_json::to_string(v)?,
        })
    }
}

fn optional_string(value: &Option<String>) -> SettingValue {
    SettingValue::String(value.clone().unwrap_or_default())
}

/// 面板全局设置的完整视图
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelSettings {
    pub general: GeneralSettings,
    pub xray_inbounds: Vec<XrayInboundSetting>,
    pub telegram: TelegramSettings,
    pub blocked_countries: Vec<String>,
    pub domain: DomainSettings,
}

impl SettingsManager {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 从数据库加载所有设置到缓存
    pub async fn load_from_db(&self) -> anyhow::Result<()> {
        let settings = PanelSetting::find().all(&self.db).await?;

        let mut cache = self.cache.write().await;
        cache.clear();
        for setting in settings {
            let value = parse_value(&setting.key, &setting.value, &setting.value_type);
            cache.insert(setting.key, value);
        }

        info!("✅ 已加载 {} 个面板设置项", cache.len());
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Option<SettingValue> {
        let cache = self.cache.read().await;
        cache.get(key).cloned()
    }

    pub async fn get_number(&self, key: &str, default: i64) -> i64 {
        self.get(key).await.and_then(|v| v.as_i64()).unwrap_or(default)
    }

    pub async fn get_string(&self, key: &str, default: &str) -> String {
        self.get(key)
            .await
            .and_then(|v| v.as_string())
            .unwrap_or_else(|| default.to_string())
    }

    /// 空字符串视为未设置
    pub async fn get_optional_string(&self, key: &str) -> Option<String> {
        self.get(key)
            .await
            .and_then(|v| v.as_string())
            .filter(|s| !s.is_empty())
    }

    pub async fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key).await.and_then(|v| v.as_bool()).unwrap_or(default)
    }

    pub async fn get_json(&self, key: &str) -> Option<Value> {
        self.get(key).await.and_then(|v| v.as_json())
    }

    pub async fn set(&self, key: &str, value: SettingValue) -> anyhow::Result<()> {
        self.set_many(vec![(key, value)]).await
    }

    /// 在同一事务中写入多个设置，成功后刷新缓存
    pub async fn set_many(&self, values: Vec<(&str, SettingValue)>) -> anyhow::Result<()> {
        let now = chrono::Utc::now().naive_utc();
        let txn = self.db.begin().await?;
        for (key, value) in &values {
            let Some(setting) = PanelSetting::find()
                .filter(panel_setting::Column::Key.eq(*key))
                .one(&txn)
                .await?
            else {
                bail!("设置项不存在: {}", key);
            };
            let mut active_model: panel_setting::ActiveModel = setting.into();
            active_model.value = Set(value.encode()?);
            active_model.updated_at = Set(now);
            active_model.update(&txn).await?;
        }
        txn.commit().await.context("保存面板设置失败")?;

        let mut cache = self.cache.write().await;
        for (key, value) in values {
            cache.insert(key.to_string(), value);
        }
        Ok(())
    }

    pub async fn general(&self) -> GeneralSettings {
        let defaults = GeneralSettings::default();
        GeneralSettings {
            panel_name: self
                .get_string(setting_keys::PANEL_NAME, &defaults.panel_name)
                .await,
            session_timeout_minutes: self
                .get_number(
                    setting_keys::SESSION_TIMEOUT_MINUTES,
                    defaults.session_timeout_minutes,
                )
                .await,
        }
    }

    pub async fn xray_inbounds(&self) -> Vec<XrayInboundSetting> {
        let Some(value) = self.get_json(setting_keys::XRAY_INBOUNDS).await else {
            return Vec::new();
        };
        serde_json::from_value(value).unwrap_or_else(|e| {
            warn!("⚠️ 面板入站设置无法解析，按空列表处理: {}", e);
            Vec::new()
        })
    }

    pub async fn telegram(&self) -> TelegramSettings {
        TelegramSettings {
            enabled: self.get_bool(setting_keys::TELEGRAM_ENABLED, false).await,
            bot_token: self
                .get_optional_string(setting_keys::TELEGRAM_BOT_TOKEN)
                .await,
            admin_chat_id: self
                .get_optional_string(setting_keys::TELEGRAM_ADMIN_CHAT_ID)
                .await
                .and_then(|id| id.parse().ok()),
        }
    }

    pub async fn blocked_countries(&self) -> Vec<String> {
        self.get_json(setting_keys::BLOCKED_COUNTRIES)
            .await
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default()
    }

    pub async fn domain(&self) -> DomainSettings {
        DomainSettings {
            domain: self.get_optional_string(setting_keys::DOMAIN).await,
            ssl_enabled: self.get_bool(setting_keys::SSL_ENABLED, false).await,
            ssl_cert_path: self.get_optional_string(setting_keys::SSL_CERT_PATH).await,
            ssl_key_path: self.get_optional_string(setting_keys::SSL_KEY_PATH).await,
        }
    }

    pub async fn snapshot(&self) -> PanelSettings {
        PanelSettings {
            general: self.general().await,
            xray_inbounds: self.xray_inbounds().await,
            telegram: self.telegram().await,
            blocked_countries: self.blocked_countries().await,
            domain: self.domain().await,
        }
    }

    pub async fn save_general(&self, general: &GeneralSettings) -> anyhow::Result<()> {
        self.set_many(vec![
            (
                setting_keys::PANEL_NAME,
                SettingValue::String(general.panel_name.clone()),
            ),
            (
                setting_keys::SESSION_TIMEOUT_MINUTES,
                SettingValue::Number(general.session_timeout_minutes),
            ),
        ])
        .await
    }

    pub async fn save_inbounds(&self, inbounds: &[XrayInboundSetting]) -> anyhow::Result<()> {
        let value = serde_json::to_value(inbounds)?;
        self.set(setting_keys::XRAY_INBOUNDS, SettingValue::Json(value))
            .await
    }

    pub async fn save_telegram(&self, telegram: &TelegramSettings) -> anyhow::Result<()> {
        self.set_many(vec![
            (
                setting_keys::TELEGRAM_ENABLED,
                SettingValue::Boolean(telegram.enabled),
            ),
            (
                setting_keys::TELEGRAM_BOT_TOKEN,
                optional_string(&telegram.bot_token),
            ),
            (
                setting_keys::TELEGRAM_ADMIN_CHAT_ID,
                optional_string(&telegram.admin_chat_id.map(|id| id.to_string())),
            ),
        ])
        .await
    }

    pub async fn save_blocked_countries(&self, countries: &[String]) -> anyhow::Result<()> {
        let value = serde_json::to_value(countries)?;
        self.set(setting_keys::BLOCKED_COUNTRIES, SettingValue::Json(value))
            .await
    }

    pub async fn save_domain(&self, domain: &DomainSettings) -> anyhow::Result<()> {
        self.set_many(vec![
            (setting_keys::DOMAIN, optional_string(&domain.domain)),
            (
                setting_keys::SSL_ENABLED,
                SettingValue::Boolean(domain.ssl_enabled),
            ),
            (
                setting_keys::SSL_CERT_PATH,
                optional_string(&domain.ssl_cert_path),
            ),
            (
                setting_keys::SSL_KEY_PATH,
                optional_string(&domain.ssl_key_path),
            ),
        ])
        .await
    }
}

fn parse_value(key: &str, value_str: &str, value_type: &str) -> SettingValue {
    match value_type {
        "number" => {
            if let Ok(n) = value_str.parse::<i64>() {
                SettingValue::Number(n)
            } else if let Ok(f) = value_str.parse::<f64>() {
                SettingValue::Float(f)
            } else {
                warn!("无法解析数值设置 {}: {}", key, value_str);
                SettingValue::Number(0)
            }
        }
        "boolean" => SettingValue::Boolean(value_str.parse::<bool>().unwrap_or(false)),
        "json" => match serde_json::from_str(value_str) {
            Ok(v) => SettingValue::Json(v),
            Err(e) => {
                warn!("无法解析 JSON 设置 {}: {}", key, e);
                SettingValue::Json(Value::Null)
            }
        },
        "string" => match serde_json::from_str::<String>(value_str) {
            Ok(s) => SettingValue::String(s),
            Err(_) => SettingValue::String(value_str.to_string()),
        },
        _ => SettingValue::String(value_str.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration;
    use crate::schema::settings::InboundProtocol;
    use serde_json::json;

    async fn manager() -> SettingsManager {
        let db = migration::connect("sqlite::memory:").await.unwrap();
        migration::migrate(&db).await.unwrap();
        let manager = SettingsManager::new(db);
        manager.load_from_db().await.unwrap();
        manager
    }

    #[tokio::test]
    async fn test_seeded_defaults() {
        let manager = manager().await;
        let settings = manager.snapshot().await;
        assert_eq!(settings.general, GeneralSettings::default());
        assert!(settings.xray_inbounds.is_empty());
        assert_eq!(settings.telegram, TelegramSettings::default());
        assert!(settings.blocked_countries.is_empty());
        assert_eq!(settings.domain, DomainSettings::default());
    }

    #[tokio::test]
    async fn test_saved_sections_survive_reload() {
        let manager = manager().await;
        let telegram = TelegramSettings {
            enabled: true,
            bot_token: Some("123456:ABCdefGhIJKlmNoPQRsTUVwxyZ".to_string()),
            admin_chat_id: Some(-1001234567),
        };
        manager.save_telegram(&telegram).await.unwrap();
        manager
            .save_blocked_countries(&["IR".to_string(), "CN".to_string()])
            .await
            .unwrap();
        let inbound = XrayInboundSetting {
            tag: "vless-in".to_string(),
            port: 443,
            protocol: InboundProtocol::Vless,
            settings: json!({ "clients": [] }),
            stream_settings: json!({}),
        };
        manager.save_inbounds(&[inbound.clone()]).await.unwrap();

        let fresh = SettingsManager::new(manager.db.clone());
        fresh.load_from_db().await.unwrap();
        let settings = fresh.snapshot().await;
        assert_eq!(settings.telegram, telegram);
        assert_eq!(settings.blocked_countries, vec!["IR", "CN"]);
        assert_eq!(settings.xray_inbounds, vec![inbound]);
    }

    #[tokio::test]
    async fn test_unknown_key_rejected() {
        let manager = manager().await;
        assert!(manager
            .set("no_such_key", SettingValue::Boolean(true))
            .await
            .is_err());
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("k", "42", "number"), SettingValue::Number(42));
        assert_eq!(parse_value("k", "1.5", "number"), SettingValue::Float(1.5));
        assert_eq!(
            parse_value("k", "\"Kernel Panel\"", "string"),
            SettingValue::String("Kernel Panel".to_string())
        );
        assert_eq!(parse_value("k", "[1]", "json"), SettingValue::Json(json!([1])));
        assert_eq!(parse_value("k", "{", "json"), SettingValue::Json(Value::Null));
    }
}

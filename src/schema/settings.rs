//! 面板全局设置的各个分区表单

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;

use super::fields::{
    field_enum, form_from, is_valid_hostname, pretty_json, FieldEnum, FormDefaults, FormReader,
    RawForm,
};
use super::user::is_valid_username;
use crate::error::{ConfigError, ValidationErrors};

field_enum! {
    /// Xray 入站协议
    pub enum InboundProtocol {
        Vless => "vless",
        Vmess => "vmess",
        Trojan => "trojan",
        Shadowsocks => "shadowsocks",
        Socks => "socks",
        Http => "http",
        DokodemoDoor => "dokodemo-door",
    }
}

/// 面板级 Xray 入站
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XrayInboundSetting {
    pub tag: String,
    pub port: u16,
    pub protocol: InboundProtocol,
    pub settings: Value,
    pub stream_settings: Value,
}

impl XrayInboundSetting {
    pub fn validate(form: &RawForm) -> Result<Self, ValidationErrors> {
        let mut r = FormReader::new(form);
        let tag = r.required_str("tag");
        let port = r.port("port");
        let protocol = r.enum_field::<InboundProtocol>("protocol");
        let settings = r.json("settings");
        let stream_settings = r.json("streamSettings");

        let inbound = (|| {
            Some(Self {
                tag: tag?,
                port: port?,
                protocol: protocol?,
                settings: settings?,
                stream_settings: stream_settings?,
            })
        })();
        r.finish(inbound)
    }

    pub fn to_form(&self) -> FormDefaults {
        form_from(json!({
            "tag": self.tag,
            "port": self.port,
            "protocol": self.protocol.as_str(),
            "settings": pretty_json(&self.settings),
            "streamSettings": pretty_json(&self.stream_settings),
        }))
    }
}

/// 校验入站列表，错误字段形如 `xrayInbounds[1].port`
pub fn validate_inbounds(form: &RawForm) -> Result<Vec<XrayInboundSetting>, ValidationErrors> {
    const FIELD: &str = "xrayInbounds";
    let items = match form.get(FIELD) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(ConfigError::invalid(FIELD, "expected a list of inbounds").into());
        }
    };

    let mut errors = ValidationErrors::default();
    let mut inbounds = Vec::with_capacity(items.len());
    let mut tags = HashSet::new();

    for (index, item) in items.iter().enumerate() {
        let prefix = format!("{}[{}]", FIELD, index);
        let Value::Object(item) = item else {
            errors.push(ConfigError::invalid(&prefix, "expected an object"));
            continue;
        };
        match XrayInboundSetting::validate(item) {
            Ok(inbound) => {
                if !tags.insert(inbound.tag.clone()) {
                    errors.push(
                        ConfigError::invalid("tag", format!("duplicate tag '{}'", inbound.tag))
                            .scoped(&prefix),
                    );
                }
                inbounds.push(inbound);
            }
            Err(e) => {
                for err in e.0 {
                    errors.push(err.scoped(&prefix));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(inbounds)
    } else {
        Err(errors)
    }
}

/// 常规设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralSettings {
    pub panel_name: String,
    pub session_timeout_minutes: i64,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            panel_name: "Kernel Panel".to_string(),
            session_timeout_minutes: 30,
        }
    }
}

impl GeneralSettings {
    pub fn validate(form: &RawForm) -> Result<Self, ValidationErrors> {
        let mut r = FormReader::new(form);
        let panel_name = r.required_str("panelName");
        let session_timeout_minutes = r.integer("sessionTimeoutMinutes").and_then(|minutes| {
            if minutes >= 1 {
                Some(minutes)
            } else {
                r.error(ConfigError::invalid("sessionTimeoutMinutes", "must be at least 1"));
                None
            }
        });

        let general = (|| {
            Some(Self {
                panel_name: panel_name?,
                session_timeout_minutes: session_timeout_minutes?,
            })
        })();
        r.finish(general)
    }
}

/// Telegram 机器人通知
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TelegramSettings {
    pub enabled: bool,
    pub bot_token: Option<String>,
    pub admin_chat_id: Option<i64>,
}

/// 机器人令牌形如 `123456:ABC-DEF...`
fn is_valid_bot_token(token: &str) -> bool {
    match token.split_once(':') {
        Some((id, secret)) => {
            !id.is_empty()
                && id.chars().all(|c| c.is_ascii_digit())
                && secret.len() >= 20
                && secret
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        }
        None => false,
    }
}

impl TelegramSettings {
    pub fn validate(form: &RawForm) -> Result<Self, ValidationErrors> {
        let mut r = FormReader::new(form);
        let enabled = r.boolean("enabled", false);
        let bot_token = r.optional_str("botToken");
        let admin_chat_id = if r.has_field("adminChatId") {
            r.integer("adminChatId")
        } else {
            None
        };

        match &bot_token {
            Some(token) if !is_valid_bot_token(token) => {
                r.error(ConfigError::invalid("botToken", "expected '<bot id>:<secret>'"));
            }
            None if enabled => r.error(ConfigError::MissingField("botToken".to_string())),
            _ => {}
        }
        if enabled && admin_chat_id.is_none() && !r.has_error("adminChatId") {
            r.error(ConfigError::MissingField("adminChatId".to_string()));
        }

        r.finish(Some(Self {
            enabled,
            bot_token,
            admin_chat_id,
        }))
    }
}

/// 面板域名与证书
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DomainSettings {
    pub domain: Option<String>,
    pub ssl_enabled: bool,
    pub ssl_cert_path: Option<String>,
    pub ssl_key_path: Option<String>,
}

impl DomainSettings {
    pub fn validate(form: &RawForm) -> Result<Self, ValidationErrors> {
        let mut r = FormReader::new(form);
        let domain = r.optional_str("domain").and_then(|domain| {
            if is_valid_hostname(&domain) {
                Some(domain)
            } else {
                r.error(ConfigError::invalid("domain", "expected a domain name"));
                None
            }
        });
        let ssl_enabled = r.boolean("sslEnabled", false);
        let ssl_cert_path = r.optional_str("sslCertPath");
        let ssl_key_path = r.optional_str("sslKeyPath");

        if ssl_enabled {
            if domain.is_none() && !r.has_error("domain") {
                r.error(ConfigError::MissingField("domain".to_string()));
            }
            if ssl_cert_path.is_none() {
                r.error(ConfigError::MissingField("sslCertPath".to_string()));
            }
            if ssl_key_path.is_none() {
                r.error(ConfigError::MissingField("sslKeyPath".to_string()));
            }
        }

        r.finish(Some(Self {
            domain,
            ssl_enabled,
            ssl_cert_path,
            ssl_key_path,
        }))
    }
}

pub fn validate_blocked_countries(form: &RawForm) -> Result<Vec<String>, ValidationErrors> {
    let mut r = FormReader::new(form);
    let countries = r.country_list("blockedCountries");
    r.finish(Some(countries))
}

/// 管理员凭据修改
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialsForm {
    pub current_password: String,
    pub username: String,
    pub new_password: Option<String>,
}

impl CredentialsForm {
    pub fn validate(form: &RawForm) -> Result<Self, ValidationErrors> {
        let mut r = FormReader::new(form);
        let current_password = r.required_str("currentPassword");
        let username = r.required_str("username").and_then(|name| {
            if is_valid_username(&name) {
                Some(name)
            } else {
                r.error(ConfigError::invalid(
                    "username",
                    "3-32 characters of letters, digits, '_', '.', '-'",
                ));
                None
            }
        });
        let new_password = r.optional_str("newPassword").and_then(|password| {
            if password.chars().count() >= 8 {
                Some(password)
            } else {
                r.error(ConfigError::invalid("newPassword", "must be at least 8 characters"));
                None
            }
        });

        let credentials = (|| {
            Some(Self {
                current_password: current_password?,
                username: username?,
                new_password,
            })
        })();
        r.finish(credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inbound(tag: &str, port: Value) -> Value {
        json!({
            "tag": tag,
            "port": port,
            "protocol": "vless",
            "settings": "{\"clients\": []}",
            "streamSettings": "{}",
        })
    }

    #[test]
    fn test_inbounds_scoped_errors() {
        let form = form_from(json!({
            "xrayInbounds": [
                inbound("a", json!(443)),
                inbound("b", json!(0)),
                inbound("a", json!(8443)),
                "nope",
            ]
        }));
        let errors = validate_inbounds(&form).unwrap_err();
        let fields: Vec<String> = errors.iter().map(|e| e.field().to_string()).collect();
        assert_eq!(
            fields,
            vec!["xrayInbounds[1].port", "xrayInbounds[2].tag", "xrayInbounds[3]"]
        );
    }

    #[test]
    fn test_inbound_round_trip() {
        let form = form_from(json!({ "xrayInbounds": [inbound("vless-in", json!("443"))] }));
        let inbounds = validate_inbounds(&form).unwrap();
        assert_eq!(inbounds[0].port, 443);
        let again = XrayInboundSetting::validate(&inbounds[0].to_form()).unwrap();
        assert_eq!(again, inbounds[0]);
    }

    #[test]
    fn test_telegram_requires_token_when_enabled() {
        let form = form_from(json!({ "enabled": true }));
        let errors = TelegramSettings::validate(&form).unwrap_err();
        assert!(errors.has_field("botToken"));
        assert!(errors.has_field("adminChatId"));

        let form = form_from(json!({
            "enabled": true,
            "botToken": "123456:ABCdefGhIJKlmNoPQRsTUVwxyZ",
            "adminChatId": "-1001234567",
        }));
        let telegram = TelegramSettings::validate(&form).unwrap();
        assert_eq!(telegram.admin_chat_id, Some(-1001234567));

        let disabled = TelegramSettings::validate(&form_from(json!({}))).unwrap();
        assert_eq!(disabled, TelegramSettings::default());
    }

    #[test]
    fn test_ssl_requires_paths() {
        let form = form_from(json!({ "domain": "panel.example.com", "sslEnabled": true }));
        let errors = DomainSettings::validate(&form).unwrap_err();
        assert!(errors.has_field("sslCertPath"));
        assert!(errors.has_field("sslKeyPath"));
    }

    #[test]
    fn test_blocked_countries() {
        let form = form_from(json!({ "blockedCountries": ["IR", "CN"] }));
        assert_eq!(validate_blocked_countries(&form).unwrap(), vec!["IR", "CN"]);

        let form = form_from(json!({ "blockedCountries": "IR, Mars" }));
        assert!(validate_blocked_countries(&form).is_err());
    }

    #[test]
    fn test_credentials_password_length() {
        let form = form_from(json!({
            "currentPassword": "old-secret",
            "username": "root",
            "newPassword": "short",
        }));
        let errors = CredentialsForm::validate(&form).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.has_field("newPassword"));
    }
}

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::fields::{field_enum, form_from, join_list, pretty_json, FieldEnum, FormDefaults, FormReader, RawForm};
use crate::error::ValidationErrors;

field_enum! {
    /// Xray 日志级别
    pub enum XrayLogLevel {
        Debug => "debug",
        Info => "info",
        Warning => "warning",
        Error => "error",
        Off => "none",
    }
}

/// Xray-core 配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XrayConfig {
    pub log_level: XrayLogLevel,
    pub dns_servers: Vec<String>,
    pub inbounds: Vec<Value>,
    pub outbounds: Vec<Value>,
}

impl Default for XrayConfig {
    fn default() -> Self {
        Self {
            log_level: XrayLogLevel::Warning,
            dns_servers: vec!["1.1.1.1".to_string(), "8.8.8.8".to_string()],
            inbounds: Vec::new(),
            outbounds: vec![
                json!({ "protocol": "freedom", "tag": "direct" }),
                json!({ "protocol": "blackhole", "tag": "block" }),
            ],
        }
    }
}

impl XrayConfig {
    pub fn validate(form: &RawForm) -> Result<Self, ValidationErrors> {
        let mut r = FormReader::new(form);
        let log_level = r.enum_field::<XrayLogLevel>("logLevel");
        let dns_servers = r.string_list("dnsServers");
        let inbounds = r.json_array("inbounds");
        let outbounds = r.json_array("outbounds");

        r.finish(log_level.map(|log_level| Self {
            log_level,
            dns_servers,
            inbounds,
            outbounds,
        }))
    }

    pub fn to_form(&self) -> FormDefaults {
        form_from(json!({
            "logLevel": self.log_level.as_str(),
            "dnsServers": join_list(&self.dns_servers),
            "inbounds": pretty_json(&self.inbounds),
            "outbounds": pretty_json(&self.outbounds),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::schema::fields::form_from;

    #[test]
    fn test_validate_xray_form() {
        let form = form_from(json!({
            "logLevel": "info",
            "dnsServers": "1.1.1.1, 8.8.8.8",
            "inbounds": "[{\"tag\": \"vless-in\", \"port\": 443}]",
            "outbounds": "[]",
        }));
        let config = XrayConfig::validate(&form).unwrap();
        assert_eq!(config.log_level, XrayLogLevel::Info);
        assert_eq!(config.dns_servers, vec!["1.1.1.1", "8.8.8.8"]);
        assert_eq!(config.inbounds.len(), 1);
        assert!(config.outbounds.is_empty());
    }

    #[test]
    fn test_unknown_log_level() {
        let form = form_from(json!({ "logLevel": "verbose" }));
        let errors = XrayConfig::validate(&form).unwrap_err();
        assert_eq!(
            errors.0,
            vec![ConfigError::InvalidEnum {
                field: "logLevel".to_string(),
                value: "verbose".to_string(),
                allowed: vec!["debug", "info", "warning", "error", "none"],
            }]
        );
    }

    #[test]
    fn test_all_errors_reported_together() {
        let form = form_from(json!({
            "logLevel": "loud",
            "inbounds": "[{",
            "outbounds": "{}",
        }));
        let errors = XrayConfig::validate(&form).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.has_field("logLevel"));
        assert!(errors.has_field("inbounds"));
        assert!(errors.has_field("outbounds"));
    }

    #[test]
    fn test_serialized_shape() {
        let value = serde_json::to_value(XrayConfig::default()).unwrap();
        assert_eq!(value["logLevel"], "warning");
        assert!(value["dnsServers"].is_array());
        assert!(value["inbounds"].is_array());
    }
}

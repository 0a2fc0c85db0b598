use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::fields::{field_enum, form_from, join_list, pretty_json, FieldEnum, FormDefaults, FormReader, RawForm};
use crate::error::ValidationErrors;

field_enum! {
    /// sing-box 日志级别
    pub enum SingBoxLogLevel {
        Trace => "trace",
        Debug => "debug",
        Info => "info",
        Warn => "warn",
        Error => "error",
        Fatal => "fatal",
        Panic => "panic",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SingBoxDns {
    pub servers: Vec<String>,
}

/// sing-box 配置，DNS 服务器在表单中以 `dnsServers` 编辑
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingBoxConfig {
    pub log_level: SingBoxLogLevel,
    pub dns: SingBoxDns,
    pub inbounds: Vec<Value>,
    pub outbounds: Vec<Value>,
}

impl Default for SingBoxConfig {
    fn default() -> Self {
        Self {
            log_level: SingBoxLogLevel::Info,
            dns: SingBoxDns {
                servers: vec!["tls://1.1.1.1".to_string()],
            },
            inbounds: Vec::new(),
            outbounds: vec![json!({ "type": "direct", "tag": "direct" })],
        }
    }
}

impl SingBoxConfig {
    pub fn validate(form: &RawForm) -> Result<Self, ValidationErrors> {
        let mut r = FormReader::new(form);
        let log_level = r.enum_field::<SingBoxLogLevel>("logLevel");
        let servers = r.string_list("dnsServers");
        let inbounds = r.json_array("inbounds");
        let outbounds = r.json_array("outbounds");

        r.finish(log_level.map(|log_level| Self {
            log_level,
            dns: SingBoxDns { servers },
            inbounds,
            outbounds,
        }))
    }

    pub fn to_form(&self) -> FormDefaults {
        form_from(json!({
            "logLevel": self.log_level.as_str(),
            "dnsServers": join_list(&self.dns.servers),
            "inbounds": pretty_json(&self.inbounds),
            "outbounds": pretty_json(&self.outbounds),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dns_servers_nested() {
        let form = form_from(json!({
            "logLevel": "warn",
            "dnsServers": ["8.8.8.8", " 1.1.1.1 ", ""],
        }));
        let config = SingBoxConfig::validate(&form).unwrap();
        assert_eq!(config.dns.servers, vec!["8.8.8.8", "1.1.1.1"]);

        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["dns"]["servers"], json!(["8.8.8.8", "1.1.1.1"]));
    }

    #[test]
    fn test_xray_level_not_accepted() {
        let form = form_from(json!({ "logLevel": "warning" }));
        let errors = SingBoxConfig::validate(&form).unwrap_err();
        assert!(errors.has_field("logLevel"));
    }
}

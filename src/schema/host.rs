use serde_json::{json, Value};

use super::fields::{form_from, is_valid_address, pretty_json, FormDefaults, FormReader, RawForm};
use crate::entity::managed_host;
use crate::error::{ConfigError, ValidationErrors};

/// 经过校验的托管主机表单
#[derive(Debug, Clone, PartialEq)]
pub struct HostDraft {
    pub name: String,
    pub address: String,
    pub port: u16,
    pub network_config: Value,
    pub stream_security_config: Value,
}

impl HostDraft {
    pub fn validate(form: &RawForm) -> Result<Self, ValidationErrors> {
        let mut r = FormReader::new(form);
        let name = r.required_str("name");
        let address = r.required_str("address").and_then(|address| {
            if is_valid_address(&address) {
                Some(address)
            } else {
                r.error(ConfigError::invalid("address", "expected a hostname or IP address"));
                None
            }
        });
        let port = r.port("port");
        let network_config = r.json("networkConfig");
        let stream_security_config = r.json("streamSecurityConfig");

        let draft = (|| {
            Some(Self {
                name: name?,
                address: address?,
                port: port?,
                network_config: network_config?,
                stream_security_config: stream_security_config?,
            })
        })();
        r.finish(draft)
    }
}

/// 存储的 JSON 文本解析失败时原样作为字符串返回
pub fn stored_json(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub fn host_form(model: &managed_host::Model) -> FormDefaults {
    form_from(json!({
        "name": model.name,
        "address": model.address,
        "port": model.port,
        "networkConfig": pretty_json(&stored_json(&model.network_config)),
        "streamSecurityConfig": pretty_json(&stored_json(&model.stream_security_config)),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_network_config() {
        let form = form_from(json!({
            "name": "edge-1",
            "address": "edge.example.com",
            "port": 443,
            "networkConfig": "{ invalid",
            "streamSecurityConfig": "{}",
        }));
        let errors = HostDraft::validate(&form).unwrap_err();
        assert_eq!(errors.0, vec![ConfigError::InvalidJson("networkConfig".to_string())]);
    }

    #[test]
    fn test_inner_shape_not_checked() {
        let form = form_from(json!({
            "name": "edge-1",
            "address": "203.0.113.7",
            "port": "8443",
            "networkConfig": "{}",
            "streamSecurityConfig": "{\"security\": \"reality\", \"whatever\": [1]}",
        }));
        let draft = HostDraft::validate(&form).unwrap();
        assert_eq!(draft.network_config, json!({}));
        assert_eq!(draft.stream_security_config["security"], "reality");
        assert_eq!(draft.port, 8443);
    }
}

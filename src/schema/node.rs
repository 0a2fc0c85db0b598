use serde_json::json;

use super::fields::{field_enum, form_from, is_valid_address, FieldEnum, FormDefaults, FormReader, RawForm};
use crate::entity::server_node;
use crate::error::{ConfigError, ValidationErrors};

field_enum! {
    /// 节点连接方式
    pub enum ConnectionType {
        Rest => "rest",
        Grpc => "grpc",
    }
}

field_enum! {
    /// 节点状态
    pub enum NodeStatus {
        Online => "online",
        Offline => "offline",
        Disabled => "disabled",
    }
}

/// 经过校验的节点表单
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDraft {
    pub name: String,
    pub address: String,
    pub port: u16,
    pub connection_type: ConnectionType,
    pub consumption_factor: f64,
    pub status: NodeStatus,
}

impl NodeDraft {
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
        let connection_type = r.enum_field::<ConnectionType>("connectionType");
        let consumption_factor = r.number("consumptionFactor").and_then(|factor| {
            if factor > 0.0 {
                Some(factor)
            } else {
                r.error(ConfigError::invalid("consumptionFactor", "must be greater than 0"));
                None
            }
        });
        // 缺失或空白时默认离线
        let status = match r.optional_enum::<NodeStatus>("status") {
            Some(status) => Some(status),
            None if r.has_error("status") => None,
            None => Some(NodeStatus::Offline),
        };

        let draft = (|| {
            Some(Self {
                name: name?,
                address: address?,
                port: port?,
                connection_type: connection_type?,
                consumption_factor: consumption_factor?,
                status: status?,
            })
        })();
        r.finish(draft)
    }
}

pub fn node_form(model: &server_node::Model) -> FormDefaults {
    form_from(json!({
        "name": model.name,
        "address": model.address,
        "port": model.port,
        "connectionType": model.connection_type,
        "consumptionFactor": model.consumption_factor,
        "status": model.status,
    }))
}

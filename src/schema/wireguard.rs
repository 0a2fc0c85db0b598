use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::IpAddr;

use super::fields::{form_from, pretty_json, FormDefaults, FormReader, RawForm};
use crate::error::{ConfigError, ValidationErrors};

/// WireGuard 配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireGuardConfig {
    pub private_key: String,
    pub address: String,
    pub listen_port: u16,
    pub peers: Vec<Value>,
}

impl WireGuardConfig {
    /// 使用随机生成的私钥创建默认配置
    pub fn generate() -> Self {
        Self {
            private_key: generate_private_key(),
            address: "10.66.0.1/24".to_string(),
            listen_port: 51820,
            peers: Vec::new(),
        }
    }

    pub fn validate(form: &RawForm) -> Result<Self, ValidationErrors> {
        let mut r = FormReader::new(form);
        let private_key = r.required_str("privateKey").and_then(|key| {
            if is_valid_key(&key) {
                Some(key)
            } else {
                r.error(ConfigError::invalid(
                    "privateKey",
                    "expected a base64-encoded 32-byte key",
                ));
                None
            }
        });
        let address = r.required_str("address").and_then(|address| {
            if is_valid_cidr(&address) {
                Some(address)
            } else {
                r.error(ConfigError::invalid(
                    "address",
                    "expected an interface address like 10.0.0.1/24",
                ));
                None
            }
        });
        let listen_port = r.port("listenPort");
        let peers = r.json_array("peers");

        let config = (|| {
            Some(Self {
                private_key: private_key?,
                address: address?,
                listen_port: listen_port?,
                peers,
            })
        })();
        r.finish(config)
    }

    pub fn to_form(&self) -> FormDefaults {
        form_from(json!({
            "privateKey": self.private_key,
            "address": self.address,
            "listenPort": self.listen_port,
            "peers": pretty_json(&self.peers),
        }))
    }
}

/// Curve25519 私钥：32 字节随机数并按规范钳位
pub fn generate_private_key() -> String {
    let mut key: [u8; 32] = rand::random();
    key[0] &= 248;
    key[31] &= 127;
    key[31] |= 64;
    STANDARD.encode(key)
}

fn is_valid_key(key: &str) -> bool {
    STANDARD
        .decode(key)
        .map(|bytes| bytes.len() == 32)
        .unwrap_or(false)
}

fn is_valid_cidr(value: &str) -> bool {
    let Some((ip, prefix)) = value.split_once('/') else {
        return false;
    };
    let Ok(prefix) = prefix.parse::<u8>() else {
        return false;
    };
    match ip.parse::<IpAddr>() {
        Ok(IpAddr::V4(_)) => prefix <= 32,
        Ok(IpAddr::V6(_)) => prefix <= 128,
        Err(_) => false,
    }
}

//! 内核配置模型与校验
//!
//! 六种内核各自一个配置结构，`KernelConfig` 把它们收拢为一个封闭的和类型。
//! 对外提供三个操作：
//! - [`validate`]：按内核类型校验表单，返回配置或全部字段错误
//! - [`to_display`]：把配置还原成可编辑的表单值
//! - [`merge`]：在已有配置上浅合并一个补丁

pub mod fields;
pub mod host;
pub mod node;
pub mod openvpn;
pub mod psiphon;
pub mod settings;
pub mod singbox;
pub mod tor_warp;
pub mod user;
pub mod wireguard;
pub mod xray;

use serde::Serialize;
use serde_json::Value;

use crate::error::ValidationErrors;
use fields::{field_enum, overlay};

pub use fields::{FieldEnum, FormDefaults, RawForm};
pub use openvpn::OpenVpnConfig;
pub use psiphon::PsiphonConfig;
pub use singbox::SingBoxConfig;
pub use tor_warp::TorWarpConfig;
pub use wireguard::WireGuardConfig;
pub use xray::XrayConfig;

field_enum! {
    /// 内核类型
    pub enum KernelType {
        Xray => "xray",
        OpenVpn => "openvpn",
        WireGuard => "wireguard",
        SingBox => "singbox",
        TorWarp => "tor",
        Psiphon => "psiphon",
    }
}

/// 内核配置，序列化时不带类型标签，形状与对应内核的配置一致
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum KernelConfig {
    Xray(XrayConfig),
    OpenVpn(OpenVpnConfig),
    WireGuard(WireGuardConfig),
    SingBox(SingBoxConfig),
    TorWarp(TorWarpConfig),
    Psiphon(PsiphonConfig),
}

impl KernelConfig {
    pub fn kernel_type(&self) -> KernelType {
        match self {
            KernelConfig::Xray(_) => KernelType::Xray,
            KernelConfig::OpenVpn(_) => KernelType::OpenVpn,
            KernelConfig::WireGuard(_) => KernelType::WireGuard,
            KernelConfig::SingBox(_) => KernelType::SingBox,
            KernelConfig::TorWarp(_) => KernelType::TorWarp,
            KernelConfig::Psiphon(_) => KernelType::Psiphon,
        }
    }

    /// 新内核的默认配置
    pub fn default_for(kind: KernelType) -> Self {
        match kind {
            KernelType::Xray => KernelConfig::Xray(XrayConfig::default()),
            KernelType::OpenVpn => KernelConfig::OpenVpn(OpenVpnConfig::default()),
            KernelType::WireGuard => KernelConfig::WireGuard(WireGuardConfig::generate()),
            KernelType::SingBox => KernelConfig::SingBox(SingBoxConfig::default()),
            KernelType::TorWarp => KernelConfig::TorWarp(TorWarpConfig::default()),
            KernelType::Psiphon => KernelConfig::Psiphon(PsiphonConfig::default()),
        }
    }

    /// 按类型反序列化已存储的配置
    pub fn from_value(kind: KernelType, value: Value) -> serde_json::Result<Self> {
        Ok(match kind {
            KernelType::Xray => KernelConfig::Xray(serde_json::from_value(value)?),
            KernelType::OpenVpn => KernelConfig::OpenVpn(serde_json::from_value(value)?),
            KernelType::WireGuard => KernelConfig::WireGuard(serde_json::from_value(value)?),
            KernelType::SingBox => KernelConfig::SingBox(serde_json::from_value(value)?),
            KernelType::TorWarp => KernelConfig::TorWarp(serde_json::from_value(value)?),
            KernelType::Psiphon => KernelConfig::Psiphon(serde_json::from_value(value)?),
        })
    }
}

/// 按内核类型校验表单
pub fn validate(kind: KernelType, form: &RawForm) -> Result<KernelConfig, ValidationErrors> {
    Ok(match kind {
        KernelType::Xray => KernelConfig::Xray(XrayConfig::validate(form)?),
        KernelType::OpenVpn => KernelConfig::OpenVpn(OpenVpnConfig::validate(form)?),
        KernelType::WireGuard => KernelConfig::WireGuard(WireGuardConfig::validate(form)?),
        KernelType::SingBox => KernelConfig::SingBox(SingBoxConfig::validate(form)?),
        KernelType::TorWarp => KernelConfig::TorWarp(TorWarpConfig::validate(form)?),
        KernelType::Psiphon => KernelConfig::Psiphon(PsiphonConfig::validate(form)?),
    })
}

/// 配置转回表单：列表合并为逗号分隔文本，JSON 字段格式化为文本
pub fn to_display(config: &KernelConfig) -> FormDefaults {
    match config {
        KernelConfig::Xray(c) => c.to_form(),
        KernelConfig::OpenVpn(c) => c.to_form(),
        KernelConfig::WireGuard(c) => c.to_form(),
        KernelConfig::SingBox(c) => c.to_form(),
        KernelConfig::TorWarp(c) => c.to_form(),
        KernelConfig::Psiphon(c) => c.to_form(),
    }
}

/// 浅合并补丁后整体重新校验
///
/// 补丁中的字段整体替换原值，列表字段不追加；值为 null 时清空可选字段。
pub fn merge(existing: &KernelConfig, patch: &RawForm) -> Result<KernelConfig, ValidationErrors> {
    let merged = overlay(to_display(existing), patch);
    validate(existing.kernel_type(), &merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use super::fields::form_from;
    use serde_json::json;

    fn all_defaults() -> Vec<KernelConfig> {
        KernelType::ALLOWED
            .iter()
            .filter_map(|s| KernelType::parse(s))
            .map(KernelConfig::default_for)
            .collect()
    }

    #[test]
    fn test_display_round_trip() {
        let mut configs = all_defaults();
        configs.push(KernelConfig::Psiphon(PsiphonConfig {
            ports: vec![443, 8443, 443],
            transport_mode: psiphon::PsiphonTransportMode::FrontedMeek,
            enable_country_selection: true,
            selected_countries: vec!["US".to_string(), "DE".to_string()],
            custom_server_list: Some("server-a,server-b".to_string()),
            bandwidth_limit_mbps: Some(2.5),
        }));
        configs.push(KernelConfig::Xray(XrayConfig {
            inbounds: vec![json!({ "tag": "in", "port": 443, "settings": { "clients": [] } })],
            ..XrayConfig::default()
        }));

        for config in configs {
            let form = to_display(&config);
            let parsed = validate(config.kernel_type(), &form).unwrap();
            assert_eq!(parsed, config);
            assert_eq!(to_display(&parsed), form);
        }
    }

    #[test]
    fn test_display_round_trip_variants() {
        use std::net::Ipv4Addr;

        let configs = vec![
            KernelConfig::Xray(XrayConfig {
                log_level: xray::XrayLogLevel::Off,
                dns_servers: Vec::new(),
                inbounds: Vec::new(),
                outbounds: Vec::new(),
            }),
            KernelConfig::OpenVpn(OpenVpnConfig {
                port: 443,
                proto: openvpn::OpenVpnProto::Tcp,
                cipher: "CHACHA20-POLY1305".to_string(),
                auth: "SHA512".to_string(),
                dev: openvpn::OpenVpnDev::Tap,
                server_ip: Ipv4Addr::new(172, 16, 0, 0),
                server_netmask: Ipv4Addr::new(255, 255, 0, 0),
            }),
            KernelConfig::WireGuard(WireGuardConfig {
                private_key: wireguard::generate_private_key(),
                address: "10.10.0.1/16".to_string(),
                listen_port: 1,
                peers: vec![json!({ "publicKey": "peer", "allowedIPs": ["10.10.0.2/32"] })],
            }),
            KernelConfig::WireGuard(WireGuardConfig {
                peers: Vec::new(),
                listen_port: 65535,
                ..WireGuardConfig::generate()
            }),
            KernelConfig::SingBox(SingBoxConfig {
                log_level: singbox::SingBoxLogLevel::Panic,
                dns: singbox::SingBoxDns {
                    servers: vec!["tls://8.8.8.8".to_string(), "local".to_string()],
                },
                inbounds: vec![json!({ "type": "vless", "listen_port": 443 })],
                outbounds: Vec::new(),
            }),
            KernelConfig::SingBox(SingBoxConfig {
                dns: singbox::SingBoxDns { servers: Vec::new() },
                ..SingBoxConfig::default()
            }),
            KernelConfig::TorWarp(TorWarpConfig {
                ports: Vec::new(),
                fake_domain: "cdn.example.org".to_string(),
                enable_country_selection: false,
                selected_countries: Vec::new(),
            }),
            KernelConfig::TorWarp(TorWarpConfig {
                ports: vec![9150, 9050, 9150],
                fake_domain: "www.example.com".to_string(),
                enable_country_selection: true,
                selected_countries: vec!["NL".to_string()],
            }),
            KernelConfig::Psiphon(PsiphonConfig {
                ports: Vec::new(),
                transport_mode: psiphon::PsiphonTransportMode::Auto,
                enable_country_selection: false,
                selected_countries: Vec::new(),
                custom_server_list: None,
                bandwidth_limit_mbps: None,
            }),
            KernelConfig::Psiphon(PsiphonConfig {
                custom_server_list: Some("a.example.net:443, b.example.net:443".to_string()),
                bandwidth_limit_mbps: Some(0.0),
                ..PsiphonConfig::default()
            }),
        ];

        for config in configs {
            let form = to_display(&config);
            let parsed = validate(config.kernel_type(), &form)
                .unwrap_or_else(|e| panic!("{:?} rejected its own form: {:?}", config, e));
            assert_eq!(parsed, config);
            assert_eq!(to_display(&parsed), form);
        }
    }

    #[test]
    fn test_stored_value_round_trip() {
        for config in all_defaults() {
            let value = serde_json::to_value(&config).unwrap();
            let decoded = KernelConfig::from_value(config.kernel_type(), value).unwrap();
            assert_eq!(decoded, config);
        }
    }

    #[test]
    fn test_merge_replaces_arrays() {
        let existing = KernelConfig::default_for(KernelType::TorWarp);
        let patch = form_from(json!({ "ports": "9999" }));
        let merged = merge(&existing, &patch).unwrap();
        match merged {
            KernelConfig::TorWarp(c) => {
                assert_eq!(c.ports, vec![9999]);
                assert_eq!(c.fake_domain, "www.example.com");
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn test_merge_null_clears_optional() {
        let existing = KernelConfig::Psiphon(PsiphonConfig {
            bandwidth_limit_mbps: Some(10.0),
            ..PsiphonConfig::default()
        });
        let patch = form_from(json!({ "transportMode": "OSSH" }));
        let mut patch = patch;
        patch.insert("bandwidthLimitMbps".into(), Value::Null);

        match merge(&existing, &patch).unwrap() {
            KernelConfig::Psiphon(c) => {
                assert_eq!(c.bandwidth_limit_mbps, None);
                assert_eq!(c.transport_mode, psiphon::PsiphonTransportMode::Ossh);
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn test_merge_rejects_invalid_patch() {
        let existing = KernelConfig::default_for(KernelType::Xray);
        let patch = form_from(json!({ "logLevel": "verbose" }));
        let errors = merge(&existing, &patch).unwrap_err();
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
    fn test_kernel_type_strings() {
        assert_eq!(KernelType::parse("tor"), Some(KernelType::TorWarp));
        assert_eq!(KernelType::OpenVpn.to_string(), "openvpn");
        assert_eq!(KernelType::parse("Xray"), None);
    }
}

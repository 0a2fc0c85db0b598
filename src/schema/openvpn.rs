use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::Ipv4Addr;

use super::fields::{field_enum, form_from, FieldEnum, FormDefaults, FormReader, RawForm};
use crate::error::{ConfigError, ValidationErrors};

field_enum! {
    /// OpenVPN 传输协议
    pub enum OpenVpnProto {
        Tcp => "tcp",
        Udp => "udp",
    }
}

field_enum! {
    /// OpenVPN 虚拟网卡类型
    pub enum OpenVpnDev {
        Tun => "tun",
        Tap => "tap",
    }
}

/// OpenVPN 配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenVpnConfig {
    pub port: u16,
    pub proto: OpenVpnProto,
    pub cipher: String,
    pub auth: String,
    pub dev: OpenVpnDev,
    pub server_ip: Ipv4Addr,
    pub server_netmask: Ipv4Addr,
}

impl Default for OpenVpnConfig {
    fn default() -> Self {
        Self {
            port: 1194,
            proto: OpenVpnProto::Udp,
            cipher: "AES-256-GCM".to_string(),
            auth: "SHA256".to_string(),
            dev: OpenVpnDev::Tun,
            server_ip: Ipv4Addr::new(10, 8, 0, 0),
            server_netmask: Ipv4Addr::new(255, 255, 255, 0),
        }
    }
}

/// 子网掩码的 1 位必须连续
fn is_contiguous_mask(mask: Ipv4Addr) -> bool {
    let bits = u32::from(mask);
    bits.leading_ones() + bits.trailing_zeros() == 32
}

fn read_ipv4(r: &mut FormReader<'_>, field: &str) -> Option<Ipv4Addr> {
    let raw = r.required_str(field)?;
    match raw.parse::<Ipv4Addr>() {
        Ok(addr) => Some(addr),
        Err(_) => {
            r.error(ConfigError::invalid(field, "expected an IPv4 address"));
            None
        }
    }
}

impl OpenVpnConfig {
    pub fn validate(form: &RawForm) -> Result<Self, ValidationErrors> {
        let mut r = FormReader::new(form);
        let port = r.port("port");
        let proto = r.enum_field::<OpenVpnProto>("proto");
        let cipher = r.required_str("cipher");
        let auth = r.required_str("auth");
        let dev = r.enum_field::<OpenVpnDev>("dev");
        let server_ip = read_ipv4(&mut r, "serverIp");
        let server_netmask = read_ipv4(&mut r, "serverNetmask").and_then(|mask| {
            if is_contiguous_mask(mask) {
                Some(mask)
            } else {
                r.error(ConfigError::invalid("serverNetmask", "netmask bits must be contiguous"));
                None
            }
        });

        let config = (|| {
            Some(Self {
                port: port?,
                proto: proto?,
                cipher: cipher?,
                auth: auth?,
                dev: dev?,
                server_ip: server_ip?,
                server_netmask: server_netmask?,
            })
        })();
        r.finish(config)
    }

    pub fn to_form(&self) -> FormDefaults {
        form_from(json!({
            "port": self.port,
            "proto": self.proto.as_str(),
            "cipher": self.cipher,
            "auth": self.auth,
            "dev": self.dev.as_str(),
            "serverIp": self.server_ip.to_string(),
            "serverNetmask": self.server_netmask.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> RawForm {
        form_from(json!({
            "port": "1194",
            "proto": "udp",
            "cipher": "AES-256-GCM",
            "auth": "SHA256",
            "dev": "tun",
            "serverIp": "10.8.0.0",
            "serverNetmask": "255.255.255.0",
        }))
    }

    #[test]
    fn test_validate_openvpn() {
        let config = OpenVpnConfig::validate(&valid_form()).unwrap();
        assert_eq!(config, OpenVpnConfig::default());
    }

    #[test]
    fn test_port_boundaries() {
        for (port, ok) in [(1, true), (65535, true), (0, false), (65536, false)] {
            let mut form = valid_form();
            form.insert("port".into(), json!(port));
            assert_eq!(OpenVpnConfig::validate(&form).is_ok(), ok, "port {}", port);
        }
    }

    #[test]
    fn test_rejects_bad_enums_and_addresses() {
        let mut form = valid_form();
        form.insert("proto".into(), json!("sctp"));
        form.insert("dev".into(), json!("eth"));
        form.insert("serverIp".into(), json!("10.8.0"));
        form.insert("serverNetmask".into(), json!("255.0.255.0"));

        let errors = OpenVpnConfig::validate(&form).unwrap_err();
        assert_eq!(errors.len(), 4);
        for field in ["proto", "dev", "serverIp", "serverNetmask"] {
            assert!(errors.has_field(field), "missing error for {}", field);
        }
    }

    #[test]
    fn test_contiguous_mask() {
        assert!(is_contiguous_mask(Ipv4Addr::new(255, 255, 0, 0)));
        assert!(is_contiguous_mask(Ipv4Addr::new(0, 0, 0, 0)));
        assert!(!is_contiguous_mask(Ipv4Addr::new(255, 0, 255, 0)));
    }
}

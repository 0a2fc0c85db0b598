use serde::{Deserialize, Serialize};
use serde_json::json;

use super::fields::{field_enum, form_from, join_list, FieldEnum, FormDefaults, FormReader, RawForm};
use crate::error::{ConfigError, ValidationErrors};

field_enum! {
    /// Psiphon 传输模式
    pub enum PsiphonTransportMode {
        Auto => "auto",
        Ossh => "OSSH",
        TlsOssh => "TLS-OSSH",
        QuicOssh => "QUIC-OSSH",
        UnfrontedMeek => "UNFRONTED-MEEK-OSSH",
        FrontedMeek => "FRONTED-MEEK-OSSH",
    }
}

/// Psiphon Pro 配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PsiphonConfig {
    pub ports: Vec<u16>,
    pub transport_mode: PsiphonTransportMode,
    pub enable_country_selection: bool,
    pub selected_countries: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_server_list: Option<String>,
    /// 带宽上限（Mbps），为空表示不限速
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bandwidth_limit_mbps: Option<f64>,
}

impl Default for PsiphonConfig {
    fn default() -> Self {
        Self {
            ports: vec![8080],
            transport_mode: PsiphonTransportMode::Auto,
            enable_country_selection: false,
            selected_countries: Vec::new(),
            custom_server_list: None,
            bandwidth_limit_mbps: None,
        }
    }
}

impl PsiphonConfig {
    pub fn validate(form: &RawForm) -> Result<Self, ValidationErrors> {
        let mut r = FormReader::new(form);
        let ports = r.port_list("ports");
        let transport_mode = r.enum_field::<PsiphonTransportMode>("transportMode");
        let enable_country_selection = r.boolean("enableCountrySelection", false);
        let selected_countries = r.country_list("selectedCountries");
        let custom_server_list = r.optional_str("customServerList");
        let bandwidth_limit_mbps = r.optional_number("bandwidthLimitMbps").and_then(|limit| {
            if limit >= 0.0 {
                Some(limit)
            } else {
                r.error(ConfigError::invalid("bandwidthLimitMbps", "must not be negative"));
                None
            }
        });

        r.finish(transport_mode.map(|transport_mode| Self {
            ports,
            transport_mode,
            enable_country_selection,
            selected_countries,
            custom_server_list,
            bandwidth_limit_mbps,
        }))
    }

    pub fn to_form(&self) -> FormDefaults {
        form_from(json!({
            "ports": join_list(&self.ports),
            "transportMode": self.transport_mode.as_str(),
            "enableCountrySelection": self.enable_country_selection,
            "selectedCountries": join_list(&self.selected_countries),
            "customServerList": self.custom_server_list,
            "bandwidthLimitMbps": self.bandwidth_limit_mbps,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_fields() {
        let form = form_from(json!({
            "ports": [8080, "8443"],
            "transportMode": "QUIC-OSSH",
            "bandwidthLimitMbps": "12.5",
        }));
        let config = PsiphonConfig::validate(&form).unwrap();
        assert_eq!(config.ports, vec![8080, 8443]);
        assert_eq!(config.bandwidth_limit_mbps, Some(12.5));
        assert_eq!(config.custom_server_list, None);

        let value = serde_json::to_value(&config).unwrap();
        assert!(value.get("customServerList").is_none());
    }

    #[test]
    fn test_negative_bandwidth_and_bad_mode() {
        let form = form_from(json!({
            "ports": "8080",
            "transportMode": "carrier-pigeon",
            "bandwidthLimitMbps": -1,
        }));
        let errors = PsiphonConfig::validate(&form).unwrap_err();
        assert!(errors.has_field("transportMode"));
        assert!(errors.has_field("bandwidthLimitMbps"));
    }

    #[test]
    fn test_form_omits_absent_optionals() {
        let form = PsiphonConfig::default().to_form();
        assert!(!form.contains_key("customServerList"));
        assert!(!form.contains_key("bandwidthLimitMbps"));
        assert_eq!(form["ports"], json!("8080"));
    }
}

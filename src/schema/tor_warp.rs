use serde::{Deserialize, Serialize};
use serde_json::json;

use super::fields::{form_from, is_valid_hostname, join_list, FormDefaults, FormReader, RawForm};
use crate::error::{ConfigError, ValidationErrors};

/// Tor / Warp 伪装站点配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TorWarpConfig {
    pub ports: Vec<u16>,
    pub fake_domain: String,
    pub enable_country_selection: bool,
    pub selected_countries: Vec<String>,
}

impl Default for TorWarpConfig {
    fn default() -> Self {
        Self {
            ports: vec![9050, 9150],
            fake_domain: "www.example.com".to_string(),
            enable_country_selection: false,
            selected_countries: Vec::new(),
        }
    }
}

impl TorWarpConfig {
    pub fn validate(form: &RawForm) -> Result<Self, ValidationErrors> {
        let mut r = FormReader::new(form);
        let ports = r.port_list("ports");
        let fake_domain = r.required_str("fakeDomain").and_then(|domain| {
            if is_valid_hostname(&domain) {
                Some(domain)
            } else {
                r.error(ConfigError::invalid("fakeDomain", "expected a domain name"));
                None
            }
        });
        let enable_country_selection = r.boolean("enableCountrySelection", false);
        let selected_countries = r.country_list("selectedCountries");

        r.finish(fake_domain.map(|fake_domain| Self {
            ports,
            fake_domain,
            enable_country_selection,
            selected_countries,
        }))
    }

    pub fn to_form(&self) -> FormDefaults {
        form_from(json!({
            "ports": join_list(&self.ports),
            "fakeDomain": self.fake_domain,
            "enableCountrySelection": self.enable_country_selection,
            "selectedCountries": join_list(&self.selected_countries),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ports_string_is_normalized() {
        let form = form_from(json!({
            "ports": "9050,,abc,9150",
            "fakeDomain": "cdn.example.org",
            "enableCountrySelection": "on",
            "selectedCountries": "DE, NL",
        }));
        let config = TorWarpConfig::validate(&form).unwrap();
        assert_eq!(config.ports, vec![9050, 9150]);
        assert!(config.enable_country_selection);
        assert_eq!(config.selected_countries, vec!["DE", "NL"]);
    }

    #[test]
    fn test_ports_may_be_empty() {
        let form = form_from(json!({ "ports": "abc,,x", "fakeDomain": "example.org" }));
        let config = TorWarpConfig::validate(&form).unwrap();
        assert!(config.ports.is_empty());

        let form = form_from(json!({ "fakeDomain": "example.org" }));
        let config = TorWarpConfig::validate(&form).unwrap();
        assert!(config.ports.is_empty());
        assert!(config.selected_countries.is_empty());
    }

    #[test]
    fn test_bad_domain_and_country() {
        let form = form_from(json!({
            "ports": "9050",
            "fakeDomain": "not a domain",
            "selectedCountries": "ZZ",
        }));
        let errors = TorWarpConfig::validate(&form).unwrap_err();
        assert!(errors.has_field("fakeDomain"));
        assert!(errors.has_field("selectedCountries"));
    }
}

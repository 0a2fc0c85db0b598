use chrono::{Duration, NaiveDateTime};
use serde_json::json;

use super::fields::{field_enum, form_from, FormDefaults, FormReader, RawForm};
use crate::entity::user;
use crate::error::{ConfigError, ValidationErrors};

/// 经过校验的订阅用户表单
#[derive(Debug, Clone, PartialEq)]
pub struct UserDraft {
    pub username: String,
    pub kernel_id: String,
    pub protocol: String,
    pub data_allowance_gb: f64,
    pub data_used_gb: f64,
    pub validity_period_days: i32,
    pub sublink_path: Option<String>,
}

/// 用户名：3-32 位字母、数字、`_`、`.`、`-`
pub fn is_valid_username(username: &str) -> bool {
    (3..=32).contains(&username.len())
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

fn is_valid_sublink(path: &str) -> bool {
    (4..=64).contains(&path.len())
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
}

fn non_negative(r: &mut FormReader<'_>, field: &str) -> Option<f64> {
    let value = r.number(field)?;
    if value < 0.0 {
        r.error(ConfigError::invalid(field, "must not be negative"));
        return None;
    }
    Some(value)
}

impl UserDraft {
    pub fn validate(form: &RawForm) -> Result<Self, ValidationErrors> {
        let mut r = FormReader::new(form);
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
        let kernel_id = r.required_str("kernelId");
        let protocol = r.required_str("protocol");
        let data_allowance_gb = non_negative(&mut r, "dataAllowanceGB");
        let data_used_gb = if r.has_field("dataUsedGB") {
            non_negative(&mut r, "dataUsedGB")
        } else {
            Some(0.0)
        };
        if let (Some(allowance), Some(used)) = (data_allowance_gb, data_used_gb) {
            if used > allowance {
                r.error(ConfigError::UsageExceedsAllowance { used, allowance });
            }
        }
        let validity_period_days = r.integer("validityPeriodDays").and_then(|days| {
            match i32::try_from(days) {
                Ok(days) if days >= 1 => Some(days),
                _ => {
                    r.error(ConfigError::invalid(
                        "validityPeriodDays",
                        "must be a positive number of days",
                    ));
                    None
                }
            }
        });
        let sublink_path = r.optional_str("sublinkPath").and_then(|path| {
            if is_valid_sublink(&path) {
                Some(path)
            } else {
                r.error(ConfigError::invalid(
                    "sublinkPath",
                    "4-64 characters of letters, digits, '_', '-'",
                ));
                None
            }
        });

        let draft = (|| {
            Some(Self {
                username: username?,
                kernel_id: kernel_id?,
                protocol: protocol?,
                data_allowance_gb: data_allowance_gb?,
                data_used_gb: data_used_gb?,
                validity_period_days: validity_period_days?,
                sublink_path,
            })
        })();
        r.finish(draft)
    }
}

field_enum! {
    /// 由有效期和用量推导出的用户状态
    pub enum UserStatus {
        Active => "active",
        Limited => "limited",
        Expired => "expired",
    }
}

/// 到期时间：创建时间加有效天数
pub fn expires_at(model: &user::Model) -> NaiveDateTime {
    model.created_at + Duration::days(i64::from(model.validity_period_days))
}

/// 过期优先于流量用尽
pub fn user_status(model: &user::Model, now: NaiveDateTime) -> UserStatus {
    if expires_at(model) <= now {
        UserStatus::Expired
    } else if model.data_used_gb >= model.data_allowance_gb {
        UserStatus::Limited
    } else {
        UserStatus::Active
    }
}

/// 已有用户转回编辑表单
pub fn user_form(model: &user::Model) -> FormDefaults {
    form_from(json!({
        "username": model.username,
        "kernelId": model.kernel_id,
        "protocol": model.protocol,
        "dataAllowanceGB": model.data_allowance_gb,
        "dataUsedGB": model.data_used_gb,
        "validityPeriodDays": model.validity_period_days,
        "sublinkPath": model.sublink_path,
    }))
}

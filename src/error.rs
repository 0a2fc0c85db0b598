//! 表单校验错误
//!
//! 所有错误都绑定到具体字段，校验时收集全部错误后一次性返回，
//! 前端可以同时在多个字段上显示提示。

use serde::Serialize;
use thiserror::Error;

/// 单个字段的校验错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{0}: invalid JSON")]
    InvalidJson(String),

    #[error("{field}: port {value} is out of range 1-65535")]
    PortOutOfRange { field: String, value: i64 },

    #[error("{field}: '{value}' is not one of [{allowed_list}]", allowed_list = .allowed.join(", "))]
    InvalidEnum {
        field: String,
        value: String,
        allowed: Vec<&'static str>,
    },

    #[error("{0}: field is required")]
    MissingField(String),

    #[error("{field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("{field}: unknown country code '{code}'")]
    UnknownCountry { field: String, code: String },

    #[error("dataUsedGB ({used}) exceeds dataAllowanceGB ({allowance})")]
    UsageExceedsAllowance { used: f64, allowance: f64 },
}

impl ConfigError {
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// 出错的字段名
    pub fn field(&self) -> &str {
        match self {
            ConfigError::InvalidJson(field) | ConfigError::MissingField(field) => field,
            ConfigError::PortOutOfRange { field, .. }
            | ConfigError::InvalidEnum { field, .. }
            | ConfigError::InvalidValue { field, .. }
            | ConfigError::UnknownCountry { field, .. } => field,
            ConfigError::UsageExceedsAllowance { .. } => "dataUsedGB",
        }
    }

    /// 机器可读的错误码
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::InvalidJson(_) => "invalid_json",
            ConfigError::PortOutOfRange { .. } => "port_out_of_range",
            ConfigError::InvalidEnum { .. } => "invalid_enum",
            ConfigError::MissingField(_) => "missing_field",
            ConfigError::InvalidValue { .. } => "invalid_value",
            ConfigError::UnknownCountry { .. } => "unknown_country",
            ConfigError::UsageExceedsAllowance { .. } => "usage_exceeds_allowance",
        }
    }

    /// 给字段名加前缀，用于列表中的子表单（如 `xrayInbounds[0].port`）
    pub fn scoped(self, prefix: &str) -> Self {
        let scope = |field: String| format!("{}.{}", prefix, field);
        match self {
            ConfigError::InvalidJson(field) => ConfigError::InvalidJson(scope(field)),
            ConfigError::MissingField(field) => ConfigError::MissingField(scope(field)),
            ConfigError::PortOutOfRange { field, value } => ConfigError::PortOutOfRange {
                field: scope(field),
                value,
            },
            ConfigError::InvalidEnum {
                field,
                value,
                allowed,
            } => ConfigError::InvalidEnum {
                field: scope(field),
                value,
                allowed,
            },
            ConfigError::InvalidValue { field, reason } => ConfigError::InvalidValue {
                field: scope(field),
                reason,
            },
            ConfigError::UnknownCountry { field, code } => ConfigError::UnknownCountry {
                field: scope(field),
                code,
            },
            other @ ConfigError::UsageExceedsAllowance { .. } => other,
        }
    }
}

/// 返回给前端的字段错误
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub code: &'static str,
    pub message: String,
}

impl From<&ConfigError> for FieldError {
    fn from(err: &ConfigError) -> Self {
        Self {
            field: err.field().to_string(),
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// 一次校验产生的全部字段错误
#[derive(Error, Debug, Clone, PartialEq, Default)]
#[error("{} field error(s)", .0.len())]
pub struct ValidationErrors(pub Vec<ConfigError>);

impl ValidationErrors {
    pub fn single(err: ConfigError) -> Self {
        Self(vec![err])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn push(&mut self, err: ConfigError) {
        self.0.push(err);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigError> {
        self.0.iter()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field() == field)
    }

    pub fn to_field_errors(&self) -> Vec<FieldError> {
        self.0.iter().map(FieldError::from).collect()
    }
}

impl From<ConfigError> for ValidationErrors {
    fn from(err: ConfigError) -> Self {
        Self::single(err)
    }
}

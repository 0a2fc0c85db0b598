//! 表单字段读取与转换
//!
//! 前端表单提交的值可能是字符串（输入框）也可能是 JSON 原生类型，
//! `FormReader` 统一处理两种形式并收集字段错误。

use serde_json::{Map, Value};
use std::fmt::Display;
use std::net::IpAddr;

use crate::error::{ConfigError, ValidationErrors};

/// 前端提交的原始表单
pub type RawForm = Map<String, Value>;

/// 回填到编辑表单的默认值
pub type FormDefaults = Map<String, Value>;

/// 可选国家列表 (ISO 3166-1 alpha-2)
pub const AVAILABLE_COUNTRIES: &[(&str, &str)] = &[
    ("AE", "United Arab Emirates"),
    ("AM", "Armenia"),
    ("AT", "Austria"),
    ("AU", "Australia"),
    ("BE", "Belgium"),
    ("BG", "Bulgaria"),
    ("BR", "Brazil"),
    ("CA", "Canada"),
    ("CH", "Switzerland"),
    ("CN", "China"),
    ("CZ", "Czechia"),
    ("DE", "Germany"),
    ("DK", "Denmark"),
    ("EE", "Estonia"),
    ("ES", "Spain"),
    ("FI", "Finland"),
    ("FR", "France"),
    ("GB", "United Kingdom"),
    ("HK", "Hong Kong"),
    ("IE", "Ireland"),
    ("IN", "India"),
    ("IR", "Iran"),
    ("IT", "Italy"),
    ("JP", "Japan"),
    ("KR", "South Korea"),
    ("KZ", "Kazakhstan"),
    ("LT", "Lithuania"),
    ("LV", "Latvia"),
    ("MD", "Moldova"),
    ("NL", "Netherlands"),
    ("NO", "Norway"),
    ("PL", "Poland"),
    ("RO", "Romania"),
    ("RS", "Serbia"),
    ("RU", "Russia"),
    ("SE", "Sweden"),
    ("SG", "Singapore"),
    ("TR", "Turkey"),
    ("UA", "Ukraine"),
    ("US", "United States"),
];

pub fn is_known_country(code: &str) -> bool {
    AVAILABLE_COUNTRIES.iter().any(|(c, _)| *c == code)
}

/// 固定取值集合的字段类型
pub trait FieldEnum: Sized + Copy {
    const ALLOWED: &'static [&'static str];

    fn parse(value: &str) -> Option<Self>;

    fn as_str(&self) -> &'static str;
}

/// 定义一个字符串枚举字段，序列化值与表单值一致
macro_rules! field_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident { $($variant:ident => $lit:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(#[serde(rename = $lit)] $variant,)+
        }

        impl $crate::schema::fields::FieldEnum for $name {
            const ALLOWED: &'static [&'static str] = &[$($lit),+];

            fn parse(value: &str) -> Option<Self> {
                match value {
                    $($lit => Some(Self::$variant),)+
                    _ => None,
                }
            }

            fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $lit,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str($crate::schema::fields::FieldEnum::as_str(self))
            }
        }
    };
}

pub(crate) use field_enum;

/// 解析逗号分隔的列表
///
/// 按 `,` 切分并去除空白，丢弃空项和 `parser` 无法解析的项，
/// 再用 `keep` 过滤。保持原有顺序，不去重。
pub fn parse_delimited_list<T, P, K>(raw: &str, parser: P, keep: K) -> Vec<T>
where
    P: Fn(&str) -> Option<T>,
    K: Fn(&T) -> bool,
{
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .filter_map(|item| parser(item))
        .filter(|item| keep(item))
        .collect()
}

/// 列表转回逗号分隔字符串
pub fn join_list<T: Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// JSON 字段回填为格式化文本
pub fn pretty_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

/// 将 `json!` 构造的对象转换为表单，去掉值为 null 的可选字段
pub fn form_from(value: Value) -> FormDefaults {
    match value {
        Value::Object(mut map) => {
            map.retain(|_, v| !v.is_null());
            map
        }
        _ => FormDefaults::new(),
    }
}

/// 浅合并：patch 中出现的键整体替换 base 中的键
pub fn overlay(mut base: RawForm, patch: &RawForm) -> RawForm {
    for (key, value) in patch {
        base.insert(key.clone(), value.clone());
    }
    base
}

pub fn check_port(field: &str, value: i64) -> Result<u16, ConfigError> {
    if (1..=65535).contains(&value) {
        Ok(value as u16)
    } else {
        Err(ConfigError::PortOutOfRange {
            field: field.to_string(),
            value,
        })
    }
}

pub fn is_valid_hostname(host: &str) -> bool {
    if host.is_empty() || host.len() > 253 {
        return false;
    }
    host.trim_end_matches('.').split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

/// 主机名或 IP 地址
pub fn is_valid_address(address: &str) -> bool {
    address.parse::<IpAddr>().is_ok() || is_valid_hostname(address)
}

fn integer_of(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn number_of(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|f| f.is_finite())
}

fn bool_of(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "yes" | "1" => Some(true),
            "false" | "off" | "no" | "0" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// 表单读取器，读取过程中累积字段错误
pub struct FormReader<'a> {
    form: &'a RawForm,
    errors: ValidationErrors,
}

impl<'a> FormReader<'a> {
    pub fn new(form: &'a RawForm) -> Self {
        Self {
            form,
            errors: ValidationErrors::default(),
        }
    }

    /// 取字段原值，null 视为缺失
    fn value(&self, field: &str) -> Option<&'a Value> {
        self.form.get(field).filter(|v| !v.is_null())
    }

    pub fn error(&mut self, err: ConfigError) {
        self.errors.push(err);
    }

    fn missing(&mut self, field: &str) {
        self.errors.push(ConfigError::MissingField(field.to_string()));
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.value(field).is_some()
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.errors.has_field(field)
    }

    /// 必填字符串，去除首尾空白后不能为空
    pub fn required_str(&mut self, field: &str) -> Option<String> {
        match self.optional_str(field) {
            Some(s) => Some(s),
            None => {
                if !self.errors.has_field(field) {
                    self.missing(field);
                }
                None
            }
        }
    }

    /// 可选字符串，空串视为未填写
    pub fn optional_str(&mut self, field: &str) -> Option<String> {
        match self.value(field)? {
            Value::String(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            _ => {
                self.error(ConfigError::invalid(field, "expected a string"));
                None
            }
        }
    }

    pub fn integer(&mut self, field: &str) -> Option<i64> {
        let Some(value) = self.value(field) else {
            self.missing(field);
            return None;
        };
        match integer_of(value) {
            Some(n) => Some(n),
            None => {
                self.error(ConfigError::invalid(field, "expected an integer"));
                None
            }
        }
    }

    pub fn port(&mut self, field: &str) -> Option<u16> {
        let value = self.integer(field)?;
        match check_port(field, value) {
            Ok(port) => Some(port),
            Err(e) => {
                self.error(e);
                None
            }
        }
    }

    pub fn number(&mut self, field: &str) -> Option<f64> {
        if !self.has_field(field) {
            self.missing(field);
            return None;
        }
        self.optional_number(field)
    }

    pub fn optional_number(&mut self, field: &str) -> Option<f64> {
        let value = self.value(field)?;
        if matches!(value, Value::String(s) if s.trim().is_empty()) {
            return None;
        }
        match number_of(value) {
            Some(n) => Some(n),
            None => {
                self.error(ConfigError::invalid(field, "expected a number"));
                None
            }
        }
    }

    /// 布尔开关，缺失时取默认值
    pub fn boolean(&mut self, field: &str, default: bool) -> bool {
        let Some(value) = self.value(field) else {
            return default;
        };
        match bool_of(value) {
            Some(b) => b,
            None => {
                self.error(ConfigError::invalid(field, "expected a boolean"));
                default
            }
        }
    }

    pub fn enum_field<E: FieldEnum>(&mut self, field: &str) -> Option<E> {
        let Some(raw) = self.required_str(field) else {
            return None;
        };
        self.parse_enum(field, &raw)
    }

    pub fn optional_enum<E: FieldEnum>(&mut self, field: &str) -> Option<E> {
        let raw = self.optional_str(field)?;
        self.parse_enum(field, &raw)
    }

    fn parse_enum<E: FieldEnum>(&mut self, field: &str, raw: &str) -> Option<E> {
        match E::parse(raw) {
            Some(v) => Some(v),
            None => {
                self.error(ConfigError::InvalidEnum {
                    field: field.to_string(),
                    value: raw.to_string(),
                    allowed: E::ALLOWED.to_vec(),
                });
                None
            }
        }
    }

    /// 字符串列表：逗号分隔文本或 JSON 数组，缺失时为空列表
    pub fn string_list(&mut self, field: &str) -> Vec<String> {
        match self.value(field) {
            None => Vec::new(),
            Some(Value::String(raw)) => {
                parse_delimited_list(raw, |s| Some(s.to_string()), |_| true)
            }
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.trim().to_string()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .filter(|s| !s.is_empty())
                .collect(),
            Some(_) => {
                self.error(ConfigError::invalid(field, "expected a comma-separated list"));
                Vec::new()
            }
        }
    }

    /// 端口列表：非数字项被丢弃，超出范围的数字记为错误
    pub fn port_list(&mut self, field: &str) -> Vec<u16> {
        let numbers: Vec<i64> = match self.value(field) {
            None => Vec::new(),
            Some(Value::String(raw)) => {
                parse_delimited_list(raw, |s| s.parse::<i64>().ok(), |_| true)
            }
            Some(Value::Array(items)) => items.iter().filter_map(integer_of).collect(),
            Some(_) => {
                self.error(ConfigError::invalid(field, "expected a comma-separated list"));
                return Vec::new();
            }
        };

        let mut ports = Vec::with_capacity(numbers.len());
        for n in numbers {
            match check_port(field, n) {
                Ok(port) => ports.push(port),
                Err(e) => self.error(e),
            }
        }
        ports
    }

    /// 国家代码列表，必须全部来自 `AVAILABLE_COUNTRIES`
    pub fn country_list(&mut self, field: &str) -> Vec<String> {
        let codes = self.string_list(field);
        for code in codes.iter().filter(|c| !is_known_country(c)) {
            self.errors.push(ConfigError::UnknownCountry {
                field: field.to_string(),
                code: code.clone(),
            });
        }
        codes.into_iter().filter(|c| is_known_country(c)).collect()
    }

    /// 任意 JSON 值，只检查语法
    pub fn json(&mut self, field: &str) -> Option<Value> {
        let Some(value) = self.value(field) else {
            self.missing(field);
            return None;
        };
        match value {
            Value::String(raw) if raw.trim().is_empty() => {
                self.missing(field);
                None
            }
            Value::String(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(parsed) => Some(parsed),
                Err(_) => {
                    self.error(ConfigError::InvalidJson(field.to_string()));
                    None
                }
            },
            other => Some(other.clone()),
        }
    }

    /// JSON 数组字段，缺失或空文本时为空数组
    pub fn json_array(&mut self, field: &str) -> Vec<Value> {
        match self.value(field) {
            None => return Vec::new(),
            Some(Value::String(raw)) if raw.trim().is_empty() => return Vec::new(),
            Some(_) => {}
        }
        match self.json(field) {
            Some(Value::Array(items)) => items,
            Some(_) => {
                self.error(ConfigError::invalid(field, "expected a JSON array"));
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    /// 结束读取：有任何错误时返回全部错误
    pub fn finish<T>(mut self, value: Option<T>) -> Result<T, ValidationErrors> {
        match value {
            Some(v) if self.errors.is_empty() => Ok(v),
            // 读取结果缺失却没有字段错误
            None if self.errors.is_empty() => {
                self.errors.push(ConfigError::invalid("form", "incomplete"));
                Err(self.errors)
            }
            _ => Err(self.errors),
        }
    }
}

pub mod auth;
pub mod host;
pub mod kernel;
pub mod node;
pub mod settings;
pub mod sublink;
pub mod user;

pub use auth::*;
pub use host::*;
pub use kernel::*;
pub use node::*;
pub use settings::*;
pub use sublink::*;
pub use user::*;

use axum::http::StatusCode;
use axum::response::Json;
use serde::Serialize;

use crate::error::{FieldError, ValidationErrors};

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: String,
    /// 校验失败时的字段错误列表
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            message: "Success".to_string(),
            errors: None,
        })
    }

    pub fn error(message: String) -> Json<Self> {
        Json(Self {
            success: false,
            data: None,
            message,
            errors: None,
        })
    }

    pub fn invalid(errors: &ValidationErrors) -> Json<Self> {
        Json(Self {
            success: false,
            data: None,
            message: "Validation failed".to_string(),
            errors: Some(errors.to_field_errors()),
        })
    }
}

pub type ApiResult<T> = (StatusCode, Json<ApiResponse<T>>);

pub fn ok<T>(data: T) -> ApiResult<T> {
    (StatusCode::OK, ApiResponse::success(data))
}

pub fn fail<T>(status: StatusCode, message: impl Into<String>) -> ApiResult<T> {
    (status, ApiResponse::error(message.into()))
}

pub fn not_found<T>(what: &str) -> ApiResult<T> {
    fail(StatusCode::NOT_FOUND, format!("{} not found", what))
}

pub fn validation_failed<T>(errors: &ValidationErrors) -> ApiResult<T> {
    (StatusCode::UNPROCESSABLE_ENTITY, ApiResponse::invalid(errors))
}

/// 基础设施错误：记录日志并返回 500
pub fn internal_error<T>(context: &str, err: anyhow::Error) -> ApiResult<T> {
    tracing::error!("{}: {:#}", context, err);
    fail(
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("{}: {}", context, err),
    )
}

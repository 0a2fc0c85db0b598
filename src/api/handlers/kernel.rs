use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    repository::{KernelRecord, KernelStatus, Repository},
    schema::{self, FormDefaults, KernelConfig, KernelType, RawForm},
    AppState,
};

use super::{fail, internal_error, not_found, ok, validation_failed, ApiResult};

/// 内核列表项，附带类型标签
#[derive(Debug, Serialize)]
pub struct KernelView {
    #[serde(rename = "type")]
    pub kernel_type: KernelType,
    #[serde(flatten)]
    pub kernel: KernelRecord,
}

impl From<KernelRecord> for KernelView {
    fn from(kernel: KernelRecord) -> Self {
        Self {
            kernel_type: kernel.kernel_type(),
            kernel,
        }
    }
}

/// 配置读取结果：存储形态与表单形态各一份
#[derive(Debug, Serialize)]
pub struct KernelConfigView {
    #[serde(rename = "type")]
    pub kernel_type: KernelType,
    pub version: i32,
    pub config: KernelConfig,
    pub form: FormDefaults,
}

impl From<&KernelRecord> for KernelConfigView {
    fn from(kernel: &KernelRecord) -> Self {
        Self {
            kernel_type: kernel.kernel_type(),
            version: kernel.version,
            config: kernel.config.clone(),
            form: schema::to_display(&kernel.config),
        }
    }
}

#[derive(Deserialize)]
pub struct UpdateConfigRequest {
    /// 客户端读取时的版本号，缺省时不做并发检查
    #[serde(rename = "expectedVersion")]
    pub expected_version: Option<i32>,
    #[serde(flatten)]
    pub form: RawForm,
}

async fn load_kernel(app_state: &AppState, id: &str) -> Result<KernelRecord, ApiResult<KernelConfigView>> {
    match app_state.kernels.get(&id.to_string()).await {
        Ok(Some(kernel)) => Ok(kernel),
        Ok(None) => Err(not_found("Kernel")),
        Err(e) => Err(internal_error("Failed to load kernel", e)),
    }
}

/// GET /api/kernels
pub async fn list_kernels(Extension(app_state): Extension<AppState>) -> ApiResult<Vec<KernelView>> {
    match app_state.kernels.list().await {
        Ok(kernels) => ok(kernels.into_iter().map(KernelView::from).collect()),
        Err(e) => internal_error("Failed to list kernels", e),
    }
}

/// GET /api/kernels/{id}
pub async fn get_kernel(
    Extension(app_state): Extension<AppState>,
    Path(id): Path<String>,
) -> ApiResult<KernelView> {
    match app_state.kernels.get(&id).await {
        Ok(Some(kernel)) => ok(kernel.into()),
        Ok(None) => not_found("Kernel"),
        Err(e) => internal_error("Failed to load kernel", e),
    }
}

/// GET /api/kernels/{id}/config
pub async fn get_kernel_config(
    Extension(app_state): Extension<AppState>,
    Path(id): Path<String>,
) -> ApiResult<KernelConfigView> {
    match load_kernel(&app_state, &id).await {
        Ok(kernel) => ok(KernelConfigView::from(&kernel)),
        Err(response) => response,
    }
}

async fn save_kernel_config(
    app_state: &AppState,
    kernel: &KernelRecord,
    expected_version: Option<i32>,
    config: KernelConfig,
) -> ApiResult<KernelConfigView> {
    let expected = expected_version.unwrap_or(kernel.version);
    match app_state.kernels.save_config(&kernel.id, expected, &config).await {
        Ok(Some(saved)) => {
            tracing::info!(
                "📝 内核 {} 配置已更新，版本 {} -> {}",
                saved.id,
                expected,
                saved.version
            );
            ok(KernelConfigView::from(&saved))
        }
        Ok(None) => {
            tracing::warn!("⚠️ 内核 {} 配置版本冲突，期望 {}", kernel.id, expected);
            fail(
                StatusCode::CONFLICT,
                "Kernel config was modified by another request",
            )
        }
        Err(e) => internal_error("Failed to save kernel config", e),
    }
}

/// PUT /api/kernels/{id}/config - 整体替换
pub async fn replace_kernel_config(
    Extension(app_state): Extension<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateConfigRequest>,
) -> ApiResult<KernelConfigView> {
    let kernel = match load_kernel(&app_state, &id).await {
        Ok(kernel) => kernel,
        Err(response) => return response,
    };
    match schema::validate(kernel.kernel_type(), &req.form) {
        Ok(config) => save_kernel_config(&app_state, &kernel, req.expected_version, config).await,
        Err(errors) => {
            tracing::info!("内核 {} 配置校验失败: {} 个字段错误", id, errors.len());
            validation_failed(&errors)
        }
    }
}

/// PATCH /api/kernels/{id}/config - 在现有配置上合并
pub async fn patch_kernel_config(
    Extension(app_state): Extension<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateConfigRequest>,
) -> ApiResult<KernelConfigView> {
    let kernel = match load_kernel(&app_state, &id).await {
        Ok(kernel) => kernel,
        Err(response) => return response,
    };
    match schema::merge(&kernel.config, &req.form) {
        Ok(config) => save_kernel_config(&app_state, &kernel, req.expected_version, config).await,
        Err(errors) => {
            tracing::info!("内核 {} 配置校验失败: {} 个字段错误", id, errors.len());
            validation_failed(&errors)
        }
    }
}

/// POST /api/kernels/{id}/{action} - start / stop / restart
///
/// 只记录状态，不启动任何进程。
pub async fn kernel_action(
    Extension(app_state): Extension<AppState>,
    Path((id, action)): Path<(String, String)>,
) -> ApiResult<KernelView> {
    let status = match action.as_str() {
        "start" | "restart" => KernelStatus::Running,
        "stop" => KernelStatus::Stopped,
        _ => {
            return fail(
                StatusCode::BAD_REQUEST,
                format!("Unknown kernel action: {}", action),
            )
        }
    };

    match app_state.kernels.set_status(&id, status).await {
        Ok(Some(kernel)) => {
            tracing::info!("⚙️ 内核 {} 执行 {}，状态: {}", id, action, kernel.status);
            ok(kernel.into())
        }
        Ok(None) => not_found("Kernel"),
        Err(e) => internal_error("Failed to update kernel status", e),
    }
}

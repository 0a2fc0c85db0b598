use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Json,
};
use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    entity::user,
    error::{ConfigError, ValidationErrors},
    repository::Repository,
    schema::{
        fields::overlay,
        user::{expires_at, user_form, user_status, UserDraft, UserStatus},
        RawForm,
    },
    AppState,
};

use super::{fail, internal_error, not_found, ok, validation_failed, ApiResult};

#[derive(Debug, Serialize)]
pub struct UserView {
    #[serde(flatten)]
    pub user: user::Model,
    pub status: UserStatus,
    #[serde(rename = "expiresAt")]
    pub expires_at: NaiveDateTime,
}

impl From<user::Model> for UserView {
    fn from(user: user::Model) -> Self {
        Self {
            status: user_status(&user, Utc::now().naive_utc()),
            expires_at: expires_at(&user),
            user,
        }
    }
}

/// 表单中的文本值，空白视为未填写
fn form_text(form: &RawForm, field: &str) -> Option<String> {
    match form.get(field)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// 校验表单，并确认内核存在且支持所选协议
///
/// 表单其余字段有错时仍会检查内核，所有字段错误一并返回。
async fn validate_user(
    app_state: &AppState,
    form: &RawForm,
) -> anyhow::Result<Result<UserDraft, ValidationErrors>> {
    let result = UserDraft::validate(form);
    let mut errors = match &result {
        Ok(_) => ValidationErrors::default(),
        Err(errors) => errors.clone(),
    };

    let kernel_id = form_text(form, "kernelId").filter(|_| !errors.has_field("kernelId"));
    if let Some(kernel_id) = kernel_id {
        match app_state.kernels.get(&kernel_id).await? {
            None => errors.push(ConfigError::invalid(
                "kernelId",
                format!("unknown kernel '{}'", kernel_id),
            )),
            Some(kernel) => {
                let protocol = form_text(form, "protocol").filter(|_| !errors.has_field("protocol"));
                if let Some(protocol) = protocol.filter(|p| !kernel.supports_protocol(p)) {
                    errors.push(ConfigError::invalid(
                        "protocol",
                        format!(
                            "kernel '{}' does not support '{}', supported: {}",
                            kernel.id,
                            protocol,
                            kernel.protocols.join(", ")
                        ),
                    ));
                }
            }
        }
    }

    match result {
        Ok(draft) if errors.is_empty() => Ok(Ok(draft)),
        _ => Ok(Err(errors)),
    }
}

/// 用户名或订阅路径被其他用户占用时返回冲突信息
async fn find_conflict(
    app_state: &AppState,
    user_id: i64,
    username: &str,
    sublink_path: &str,
) -> anyhow::Result<Option<String>> {
    if let Some(other) = app_state.users.find_by_username(username).await? {
        if other.id != user_id {
            return Ok(Some(format!("Username '{}' already exists", username)));
        }
    }
    if let Some(other) = app_state.users.find_by_sublink(sublink_path).await? {
        if other.id != user_id {
            return Ok(Some(format!("Sublink path '{}' already in use", sublink_path)));
        }
    }
    Ok(None)
}

async fn store_user(app_state: &AppState, model: user::Model) -> ApiResult<UserView> {
    match find_conflict(app_state, model.id, &model.username, &model.sublink_path).await {
        Ok(Some(message)) => return fail(StatusCode::CONFLICT, message),
        Ok(None) => {}
        Err(e) => return internal_error("Failed to check user", e),
    }

    let is_new = model.id == 0;
    match app_state.users.put(model).await {
        Ok(user) => {
            if is_new {
                tracing::info!("👤 已创建用户 {} (#{})", user.username, user.id);
            } else {
                tracing::info!("👤 已更新用户 {} (#{})", user.username, user.id);
            }
            ok(user.into())
        }
        Err(e) => internal_error("Failed to save user", e),
    }
}

/// GET /api/users
pub async fn list_users(Extension(app_state): Extension<AppState>) -> ApiResult<Vec<UserView>> {
    match app_state.users.list().await {
        Ok(users) => ok(users.into_iter().map(UserView::from).collect()),
        Err(e) => internal_error("Failed to list users", e),
    }
}

/// GET /api/users/{id}
pub async fn get_user(
    Extension(app_state): Extension<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<UserView> {
    match app_state.users.get(&id).await {
        Ok(Some(user)) => ok(user.into()),
        Ok(None) => not_found("User"),
        Err(e) => internal_error("Failed to load user", e),
    }
}

/// POST /api/users
pub async fn create_user(
    Extension(app_state): Extension<AppState>,
    Json(form): Json<RawForm>,
) -> ApiResult<UserView> {
    let draft = match validate_user(&app_state, &form).await {
        Ok(Ok(draft)) => draft,
        Ok(Err(errors)) => return validation_failed(&errors),
        Err(e) => return internal_error("Failed to validate user", e),
    };

    let now = Utc::now().naive_utc();
    let model = user::Model {
        id: 0,
        username: draft.username,
        kernel_id: draft.kernel_id,
        protocol: draft.protocol,
        data_allowance_gb: draft.data_allowance_gb,
        data_used_gb: draft.data_used_gb,
        validity_period_days: draft.validity_period_days,
        sublink_path: draft
            .sublink_path
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string()),
        created_at: now,
        updated_at: now,
    };
    store_user(&app_state, model).await
}

/// PUT /api/users/{id} - 表单合并到现有用户后整体校验
pub async fn update_user(
    Extension(app_state): Extension<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<RawForm>,
) -> ApiResult<UserView> {
    let existing = match app_state.users.get(&id).await {
        Ok(Some(user)) => user,
        Ok(None) => return not_found("User"),
        Err(e) => return internal_error("Failed to load user", e),
    };

    let form = overlay(user_form(&existing), &patch);
    let draft = match validate_user(&app_state, &form).await {
        Ok(Ok(draft)) => draft,
        Ok(Err(errors)) => return validation_failed(&errors),
        Err(e) => return internal_error("Failed to validate user", e),
    };

    let model = user::Model {
        username: draft.username,
        kernel_id: draft.kernel_id,
        protocol: draft.protocol,
        data_allowance_gb: draft.data_allowance_gb,
        data_used_gb: draft.data_used_gb,
        validity_period_days: draft.validity_period_days,
        sublink_path: draft.sublink_path.unwrap_or(existing.sublink_path.clone()),
        ..existing
    };
    store_user(&app_state, model).await
}

/// DELETE /api/users/{id}
pub async fn delete_user(
    Extension(app_state): Extension<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    match app_state.users.delete(&id).await {
        Ok(true) => {
            tracing::info!("🗑️ 已删除用户 #{}", id);
            ok(())
        }
        Ok(false) => not_found("User"),
        Err(e) => internal_error("Failed to delete user", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::fields::form_from;
    use crate::test_support;
    use serde_json::json;

    fn alice() -> RawForm {
        form_from(json!({
            "username": "alice",
            "kernelId": "xray",
            "protocol": "vless",
            "dataAllowanceGB": 50,
            "validityPeriodDays": 30,
        }))
    }

    async fn create(state: &AppState, form: RawForm) -> ApiResult<UserView> {
        create_user(Extension(state.clone()), Json(form)).await
    }

    #[tokio::test]
    async fn test_create_generates_sublink() {
        let state = test_support::state().await;
        let (status, Json(body)) = create(&state, alice()).await;
        assert_eq!(status, StatusCode::OK);
        let view = body.data.unwrap();
        assert_eq!(view.status, UserStatus::Active);
        assert_eq!(view.user.sublink_path.len(), 32);

        let (status, _) = create(&state, alice()).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_unknown_kernel_and_protocol() {
        let state = test_support::state().await;
        let mut form = alice();
        form.insert("kernelId".into(), json!("nope"));
        let (status, Json(body)) = create(&state, form).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.errors.unwrap()[0].field, "kernelId");

        let mut form = alice();
        form.insert("protocol".into(), json!("wireguard"));
        let (status, Json(body)) = create(&state, form).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.errors.unwrap()[0].field, "protocol");
    }

    #[tokio::test]
    async fn test_kernel_checked_alongside_form_errors() {
        let state = test_support::state().await;
        let mut form = alice();
        form.insert("username".into(), json!("a b"));
        form.insert("kernelId".into(), json!("nope"));
        let (status, Json(body)) = create(&state, form).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let fields: Vec<String> = body.errors.unwrap().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["username", "kernelId"]);

        let mut form = alice();
        form.insert("validityPeriodDays".into(), json!(0));
        form.insert("protocol".into(), json!("wireguard"));
        let (_, Json(body)) = create(&state, form).await;
        let fields: Vec<String> = body.errors.unwrap().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["validityPeriodDays", "protocol"]);
    }

    #[tokio::test]
    async fn test_edit_keeps_usage_within_allowance() {
        let state = test_support::state().await;
        let (_, Json(body)) = create(&state, alice()).await;
        let id = body.data.unwrap().user.id;

        let (status, Json(body)) = update_user(
            Extension(state.clone()),
            Path(id),
            Json(form_from(json!({ "dataUsedGB": 40 }))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.data.unwrap().user.data_used_gb, 40.0);

        // 降低额度到已用量以下被拒绝
        let (status, Json(body)) = update_user(
            Extension(state.clone()),
            Path(id),
            Json(form_from(json!({ "dataAllowanceGB": 30 }))),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.errors.unwrap()[0].code, "usage_exceeds_allowance");

        let stored = state.users.get(&id).await.unwrap().unwrap();
        assert!(stored.data_used_gb <= stored.data_allowance_gb);
        assert_eq!(stored.data_allowance_gb, 50.0);
    }

    #[tokio::test]
    async fn test_delete_user() {
        let state = test_support::state().await;
        let (_, Json(body)) = create(&state, alice()).await;
        let id = body.data.unwrap().user.id;

        let (status, _) = delete_user(Extension(state.clone()), Path(id)).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = get_user(Extension(state), Path(id)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

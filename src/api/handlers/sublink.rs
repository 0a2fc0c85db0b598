use axum::extract::{Extension, Path};
use chrono::{NaiveDateTime, Utc};
use serde::Serialize;

use crate::{
    repository::Repository,
    schema::user::{expires_at, user_status, UserStatus},
    AppState,
};

use super::{internal_error, not_found, ok, ApiResult};

/// 订阅页展示的只读信息
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionInfo {
    pub panel_name: String,
    pub username: String,
    pub kernel_id: String,
    pub kernel_name: Option<String>,
    pub protocol: String,
    pub status: UserStatus,
    #[serde(rename = "dataAllowanceGB")]
    pub data_allowance_gb: f64,
    #[serde(rename = "dataUsedGB")]
    pub data_used_gb: f64,
    #[serde(rename = "dataRemainingGB")]
    pub data_remaining_gb: f64,
    pub expires_at: NaiveDateTime,
}

/// GET /api/sub/{sublink_path} - 公开访问
pub async fn get_subscription(
    Extension(app_state): Extension<AppState>,
    Path(sublink_path): Path<String>,
) -> ApiResult<SubscriptionInfo> {
    let user = match app_state.users.find_by_sublink(&sublink_path).await {
        Ok(Some(user)) => user,
        Ok(None) => return not_found("Subscription"),
        Err(e) => return internal_error("Failed to load subscription", e),
    };

    // 内核缺失时仍返回订阅信息，只是没有内核名称
    let kernel_name = match app_state.kernels.get(&user.kernel_id).await {
        Ok(kernel) => kernel.map(|k| k.name),
        Err(e) => return internal_error("Failed to load kernel", e),
    };

    let general = app_state.settings.general().await;
    ok(SubscriptionInfo {
        panel_name: general.panel_name,
        status: user_status(&user, Utc::now().naive_utc()),
        expires_at: expires_at(&user),
        data_remaining_gb: (user.data_allowance_gb - user.data_used_gb).max(0.0),
        kernel_name,
        username: user.username,
        kernel_id: user.kernel_id,
        protocol: user.protocol,
        data_allowance_gb: user.data_allowance_gb,
        data_used_gb: user.data_used_gb,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::user;
    use crate::test_support;
    use axum::http::StatusCode;
    use axum::response::Json;

    #[tokio::test]
    async fn test_subscription_lookup() {
        let state = test_support::state().await;
        let now = Utc::now().naive_utc();
        state
            .users
            .put(user::Model {
                id: 0,
                username: "alice".to_string(),
                kernel_id: "xray".to_string(),
                protocol: "vless".to_string(),
                data_allowance_gb: 10.0,
                data_used_gb: 4.0,
                validity_period_days: 30,
                sublink_path: "alice-link".to_string(),
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        let (status, Json(body)) =
            get_subscription(Extension(state.clone()), Path("alice-link".to_string())).await;
        assert_eq!(status, StatusCode::OK);
        let info = body.data.unwrap();
        assert_eq!(info.kernel_name.as_deref(), Some("Xray-core"));
        assert_eq!(info.data_remaining_gb, 6.0);
        assert_eq!(info.status, UserStatus::Active);
        assert_eq!(info.panel_name, "Kernel Panel");

        let (status, _) =
            get_subscription(Extension(state), Path("nobody".to_string())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

use axum::{
    extract::{Extension, Path},
    response::Json,
};
use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::{
    entity::managed_host,
    repository::Repository,
    schema::{
        fields::overlay,
        host::{host_form, stored_json, HostDraft},
        RawForm,
    },
    AppState,
};

use super::{internal_error, not_found, ok, validation_failed, ApiResult};

/// 托管主机，JSON 字段已解析
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostView {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub port: i32,
    pub network_config: Value,
    pub stream_security_config: Value,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<managed_host::Model> for HostView {
    fn from(host: managed_host::Model) -> Self {
        Self {
            network_config: stored_json(&host.network_config),
            stream_security_config: stored_json(&host.stream_security_config),
            id: host.id,
            name: host.name,
            address: host.address,
            port: host.port,
            created_at: host.created_at,
            updated_at: host.updated_at,
        }
    }
}

fn apply_draft(mut model: managed_host::Model, draft: HostDraft) -> managed_host::Model {
    model.name = draft.name;
    model.address = draft.address;
    model.port = i32::from(draft.port);
    model.network_config = draft.network_config.to_string();
    model.stream_security_config = draft.stream_security_config.to_string();
    model
}

/// GET /api/hosts
pub async fn list_hosts(Extension(app_state): Extension<AppState>) -> ApiResult<Vec<HostView>> {
    match app_state.hosts.list().await {
        Ok(hosts) => ok(hosts.into_iter().map(HostView::from).collect()),
        Err(e) => internal_error("Failed to list hosts", e),
    }
}

/// GET /api/hosts/{id}
pub async fn get_host(
    Extension(app_state): Extension<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<HostView> {
    match app_state.hosts.get(&id).await {
        Ok(Some(host)) => ok(host.into()),
        Ok(None) => not_found("Host"),
        Err(e) => internal_error("Failed to load host", e),
    }
}

/// POST /api/hosts
pub async fn create_host(
    Extension(app_state): Extension<AppState>,
    Json(form): Json<RawForm>,
) -> ApiResult<HostView> {
    let draft = match HostDraft::validate(&form) {
        Ok(draft) => draft,
        Err(errors) => return validation_failed(&errors),
    };

    let now = Utc::now().naive_utc();
    let model = apply_draft(
        managed_host::Model {
            id: 0,
            name: String::new(),
            address: String::new(),
            port: 0,
            network_config: String::new(),
            stream_security_config: String::new(),
            created_at: now,
            updated_at: now,
        },
        draft,
    );
    match app_state.hosts.put(model).await {
        Ok(host) => {
            tracing::info!("🖥️ 已创建主机 {} ({}:{})", host.name, host.address, host.port);
            ok(host.into())
        }
        Err(e) => internal_error("Failed to create host", e),
    }
}

/// PUT /api/hosts/{id}
pub async fn update_host(
    Extension(app_state): Extension<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<RawForm>,
) -> ApiResult<HostView> {
    let existing = match app_state.hosts.get(&id).await {
        Ok(Some(host)) => host,
        Ok(None) => return not_found("Host"),
        Err(e) => return internal_error("Failed to load host", e),
    };

    let draft = match HostDraft::validate(&overlay(host_form(&existing), &patch)) {
        Ok(draft) => draft,
        Err(errors) => return validation_failed(&errors),
    };
    match app_state.hosts.put(apply_draft(existing, draft)).await {
        Ok(host) => {
            tracing::info!("🖥️ 已更新主机 {} (#{})", host.name, host.id);
            ok(host.into())
        }
        Err(e) => internal_error("Failed to update host", e),
    }
}

/// DELETE /api/hosts/{id}
pub async fn delete_host(
    Extension(app_state): Extension<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    match app_state.hosts.delete(&id).await {
        Ok(true) => {
            tracing::info!("🗑️ 已删除主机 #{}", id);
            ok(())
        }
        Ok(false) => not_found("Host"),
        Err(e) => internal_error("Failed to delete host", e),
    }
}

use axum::{
    extract::{Extension, Path},
    response::Json,
};
use chrono::Utc;

use crate::{
    entity::server_node,
    repository::Repository,
    schema::{
        fields::overlay,
        node::{node_form, NodeDraft},
        RawForm,
    },
    AppState,
};

use super::{internal_error, not_found, ok, validation_failed, ApiResult};

fn apply_draft(mut model: server_node::Model, draft: NodeDraft) -> server_node::Model {
    model.name = draft.name;
    model.address = draft.address;
    model.port = i32::from(draft.port);
    model.connection_type = draft.connection_type.to_string();
    model.consumption_factor = draft.consumption_factor;
    model.status = draft.status.to_string();
    model
}

/// GET /api/nodes
pub async fn list_nodes(
    Extension(app_state): Extension<AppState>,
) -> ApiResult<Vec<server_node::Model>> {
    match app_state.nodes.list().await {
        Ok(nodes) => ok(nodes),
        Err(e) => internal_error("Failed to list nodes", e),
    }
}

/// GET /api/nodes/{id}
pub async fn get_node(
    Extension(app_state): Extension<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<server_node::Model> {
    match app_state.nodes.get(&id).await {
        Ok(Some(node)) => ok(node),
        Ok(None) => not_found("Node"),
        Err(e) => internal_error("Failed to load node", e),
    }
}

/// POST /api/nodes
pub async fn create_node(
    Extension(app_state): Extension<AppState>,
    Json(form): Json<RawForm>,
) -> ApiResult<server_node::Model> {
    let draft = match NodeDraft::validate(&form) {
        Ok(draft) => draft,
        Err(errors) => return validation_failed(&errors),
    };

    let now = Utc::now().naive_utc();
    let model = apply_draft(
        server_node::Model {
            id: 0,
            name: String::new(),
            address: String::new(),
            port: 0,
            connection_type: String::new(),
            consumption_factor: 1.0,
            status: String::new(),
            created_at: now,
            updated_at: now,
        },
        draft,
    );
    match app_state.nodes.put(model).await {
        Ok(node) => {
            tracing::info!("🛰️ 已添加节点 {} ({}:{})", node.name, node.address, node.port);
            ok(node)
        }
        Err(e) => internal_error("Failed to create node", e),
    }
}

/// PUT /api/nodes/{id}
pub async fn update_node(
    Extension(app_state): Extension<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<RawForm>,
) -> ApiResult<server_node::Model> {
    let existing = match app_state.nodes.get(&id).await {
        Ok(Some(node)) => node,
        Ok(None) => return not_found("Node"),
        Err(e) => return internal_error("Failed to load node", e),
    };

    let draft = match NodeDraft::validate(&overlay(node_form(&existing), &patch)) {
        Ok(draft) => draft,
        Err(errors) => return validation_failed(&errors),
    };
    match app_state.nodes.put(apply_draft(existing, draft)).await {
        Ok(node) => {
            tracing::info!("🛰️ 已更新节点 {} (#{})", node.name, node.id);
            ok(node)
        }
        Err(e) => internal_error("Failed to update node", e),
    }
}

/// DELETE /api/nodes/{id}
pub async fn delete_node(
    Extension(app_state): Extension<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    match app_state.nodes.delete(&id).await {
        Ok(true) => {
            tracing::info!("🗑️ 已删除节点 #{}", id);
            ok(())
        }
        Ok(false) => not_found("Node"),
        Err(e) => internal_error("Failed to delete node", e),
    }
}

use axum::middleware::from_fn;
use axum::routing::{get, post, put};
use axum::{Extension, Router};
use std::path::Path;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tracing::info;

use crate::middleware::{auth_middleware, require_auth};
use crate::AppState;

pub mod handlers;

/// 构建完整的 Web 应用
pub fn router(app_state: AppState) -> Router {
    // 认证路由（需要登录）
    let protected = Router::new()
        .route("/auth/me", get(handlers::me))
        // 内核
        .route("/kernels", get(handlers::list_kernels))
        .route("/kernels/{id}", get(handlers::get_kernel))
        .route(
            "/kernels/{id}/config",
            get(handlers::get_kernel_config)
                .put(handlers::replace_kernel_config)
                .patch(handlers::patch_kernel_config),
        )
        .route("/kernels/{id}/{action}", post(handlers::kernel_action))
        // 订阅用户
        .route("/users", get(handlers::list_users).post(handlers::create_user))
        .route(
            "/users/{id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        // 托管主机
        .route("/hosts", get(handlers::list_hosts).post(handlers::create_host))
        .route(
            "/hosts/{id}",
            get(handlers::get_host)
                .put(handlers::update_host)
                .delete(handlers::delete_host),
        )
        // 服务器节点
        .route("/nodes", get(handlers::list_nodes).post(handlers::create_node))
        .route(
            "/nodes/{id}",
            get(handlers::get_node)
                .put(handlers::update_node)
                .delete(handlers::delete_node),
        )
        // 面板设置
        .route("/settings", get(handlers::get_settings))
        .route("/settings/countries", get(handlers::list_countries))
        .route("/settings/general", put(handlers::update_general))
        .route("/settings/inbounds", put(handlers::update_inbounds))
        .route("/settings/telegram", put(handlers::update_telegram))
        .route(
            "/settings/blocked-countries",
            put(handlers::update_blocked_countries),
        )
        .route("/settings/domain", put(handlers::update_domain))
        .route("/settings/credentials", put(handlers::update_credentials))
        .route_layer(from_fn(require_auth));

    let api_routes = Router::new()
        // 公开路由（无需认证）
        .route("/auth/login", post(handlers::login))
        .route("/sub/{sublink_path}", get(handlers::get_subscription))
        .merge(protected)
        // 解析令牌
        .layer(from_fn(auth_middleware))
        // 添加应用状态
        .layer(Extension(app_state.clone()));

    let static_dir = app_state.config.static_dir.clone();
    let index = Path::new(&static_dir).join("index.html");

    Router::new()
        .nest("/api", api_routes)
        // 静态文件服务，带 SPA fallback
        .fallback_service(ServeDir::new(&static_dir).fallback(ServeFile::new(index)))
        .layer(CorsLayer::permissive())
}

/// 启动 Web API 服务
pub fn start_web_server(app_state: AppState) -> tokio::task::JoinHandle<()> {
    let web_port = app_state.config.web_port;
    let app = router(app_state);

    tokio::spawn(async move {
        let web_addr = format!("0.0.0.0:{}", web_port);
        match tokio::net::TcpListener::bind(&web_addr).await {
            Ok(listener) => {
                info!("🌐 Web管理界面: http://{}", web_addr);
                if let Err(err) = axum::serve(listener, app).await {
                    tracing::error!("Web服务错误：{}", err);
                }
            }
            Err(err) => {
                tracing::error!("Web服务启动失败：{}", err);
            }
        }
    })
}

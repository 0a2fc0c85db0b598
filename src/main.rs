mod api;
mod auth;
mod config;
mod entity;
mod error;
mod jwt;
mod middleware;
mod migration;
mod repository;
mod schema;
mod seed;
mod settings_manager;

use anyhow::Result;
use clap::Parser;
use sea_orm::DatabaseConnection;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Config;
use crate::repository::{HostRepository, KernelRepository, NodeRepository, UserRepository};
use crate::settings_manager::SettingsManager;

#[derive(Parser)]
#[command(name = "kernel-panel", version, about = "Kernel Panel - 代理内核管理面板")]
struct Cli {
    /// 配置文件路径，默认查找 kernel-panel.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// 覆盖配置中的 Web 端口
    #[arg(long)]
    port: Option<u16>,
}

/// 应用状态
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<Config>,
    pub jwt_secret: Arc<str>,
    pub settings: SettingsManager,
    pub kernels: KernelRepository,
    pub users: UserRepository,
    pub hosts: HostRepository,
    pub nodes: NodeRepository,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: Config, jwt_secret: String) -> Self {
        Self {
            settings: SettingsManager::new(db.clone()),
            kernels: KernelRepository::new(db.clone()),
            users: UserRepository::new(db.clone()),
            hosts: HostRepository::new(db.clone()),
            nodes: NodeRepository::new(db.clone()),
            config: Arc::new(config),
            jwt_secret: Arc::from(jwt_secret),
            db,
        }
    }
}

/// 初始化 tracing 日志系统，设置日志目录时按天轮转写入文件
fn init_logging(log_dir: Option<&str>) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx::query=warn"));

    if let Some(dir) = log_dir {
        let file_appender = tracing_appender::rolling::daily(dir, "kernel-panel.log");
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(file_appender).with_ansi(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 读取配置
    let (mut config, config_path) = Config::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.web_port = port;
    }

    init_logging(config.log_dir.as_deref());
    info!("📋 kernel-panel 启动");
    match &config_path {
        Some(path) => info!("📋 加载配置文件: {}", path.display()),
        None => tracing::warn!("未找到配置文件，使用默认配置"),
    }
    info!("🌐 Web管理端口: {}", config.web_port);

    // 初始化数据库并运行迁移
    let db = migration::init_sqlite(&config.db_path).await?;
    migration::migrate(&db).await?;
    info!("✅ 数据库初始化完成: {}", config.db_path);

    let jwt_secret = config.get_jwt_secret()?;
    let app_state = AppState::new(db, config, jwt_secret);

    // 写入内核与管理员
    let created = seed::seed_kernels(&app_state.kernels).await?;
    if created > 0 {
        info!("🧩 已初始化 {} 个内核", created);
    }
    seed::initialize_admin(&app_state.db, &app_state.config).await?;

    // 加载面板设置
    if let Err(e) = app_state.settings.load_from_db().await {
        tracing::error!("加载面板设置失败: {}", e);
    }

    // 启动 Web API 服务
    let web_handle = api::start_web_server(app_state.clone());

    info!("✅ 所有服务已启动，等待终止信号...");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("收到 Ctrl+C 信号，正在关闭服务...");
        }
        _ = async {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};
                match signal(SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        sigterm.recv().await;
                    }
                    Err(e) => {
                        tracing::warn!("无法监听 SIGTERM: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("收到 SIGTERM 信号，正在关闭服务...");
        }
        result = web_handle => {
            if let Err(e) = result {
                tracing::error!("Web服务任务异常退出: {}", e);
            }
            tracing::warn!("Web服务已停止");
        }
    }

    Ok(())
}

use anyhow::Context;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::prelude::*;
use std::fs::create_dir_all;
use std::path::Path;

mod m20261001_000001_init;
mod m20261001_000002_create_panel_setting;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_init::Migration),
            Box::new(m20261001_000002_create_panel_setting::Migration),
        ]
    }
}

/// 连接数据库
///
/// 内存数据库只保留一个常驻连接，否则每个连接各自看到一个空库。
pub async fn connect(url: &str) -> anyhow::Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(url.to_string());
    if url.contains(":memory:") {
        options.max_connections(1).min_connections(1);
    }
    Database::connect(options)
        .await
        .with_context(|| format!("failed to connect database: {}", url))
}

/// 打开（必要时创建）SQLite 数据库文件
pub async fn init_sqlite(db_path: &str) -> anyhow::Result<DatabaseConnection> {
    let path = Path::new(db_path);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)
                .with_context(|| format!("无法创建数据目录: {}", parent.display()))?;
        }
    }
    connect(&format!("sqlite://{}?mode=rwc", db_path)).await
}

/// 连接并执行全部迁移
pub async fn migrate(db: &DatabaseConnection) -> anyhow::Result<()> {
    Migrator::up(db, None).await.context("数据库迁移失败")
}

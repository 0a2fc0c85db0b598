//! 首次启动时写入的内核与管理员

use anyhow::Result;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, QueryFilter, Set};
use tracing::info;

use crate::auth;
use crate::config::Config;
use crate::entity::{admin, Admin};
use crate::repository::{KernelCategory, KernelRecord, KernelRepository, KernelStatus, Repository};
use crate::schema::{KernelConfig, KernelType};

struct KernelSeed {
    name: &'static str,
    category: KernelCategory,
    kind: KernelType,
    protocols: &'static [&'static str],
}

const KERNELS: &[KernelSeed] = &[
    KernelSeed {
        name: "Xray-core",
        category: KernelCategory::Engine,
        kind: KernelType::Xray,
        protocols: &["vless", "vmess", "trojan", "shadowsocks"],
    },
    KernelSeed {
        name: "OpenVPN",
        category: KernelCategory::Engine,
        kind: KernelType::OpenVpn,
        protocols: &["openvpn"],
    },
    KernelSeed {
        name: "WireGuard",
        category: KernelCategory::Engine,
        kind: KernelType::WireGuard,
        protocols: &["wireguard"],
    },
    KernelSeed {
        name: "Sing-box",
        category: KernelCategory::Engine,
        kind: KernelType::SingBox,
        protocols: &["vless", "vmess", "trojan", "shadowsocks", "hysteria2", "tuic"],
    },
    KernelSeed {
        name: "Tor / Warp",
        category: KernelCategory::Node,
        kind: KernelType::TorWarp,
        protocols: &["socks", "http"],
    },
    KernelSeed {
        name: "Psiphon",
        category: KernelCategory::Node,
        kind: KernelType::Psiphon,
        protocols: &["socks", "http"],
    },
];

/// 补齐缺失的内核，已存在的不做修改，返回新建数量
pub async fn seed_kernels(repo: &KernelRepository) -> Result<usize> {
    let mut created = 0;
    for seed in KERNELS {
        let id = seed.kind.to_string();
        if repo.get(&id).await?.is_some() {
            continue;
        }

        let now = Utc::now().naive_utc();
        repo.put(KernelRecord {
            id: id.clone(),
            name: seed.name.to_string(),
            category: seed.category,
            protocols: seed.protocols.iter().map(|p| p.to_string()).collect(),
            status: KernelStatus::Stopped,
            version: 1,
            config: KernelConfig::default_for(seed.kind),
            created_at: now,
            updated_at: now,
        })
        .await?;
        info!("🧩 已创建内核: {} ({})", seed.name, id);
        created += 1;
    }
    Ok(created)
}

/// 管理员不存在时创建，返回生成的初始密码
pub async fn ensure_admin(db: &DatabaseConnection, username: &str) -> Result<Option<String>> {
    if Admin::find()
        .filter(admin::Column::Username.eq(username))
        .one(db)
        .await?
        .is_some()
    {
        return Ok(None);
    }

    let password = auth::generate_random_password(16);
    let password_hash = auth::hash_password(&password)?;
    let now = Utc::now().naive_utc();
    admin::ActiveModel {
        id: NotSet,
        username: Set(username.to_string()),
        password_hash: Set(password_hash),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    Ok(Some(password))
}

/// 初始化管理员账户，新密码打印到日志并保存到数据目录
pub async fn initialize_admin(db: &DatabaseConnection, config: &Config) -> Result<()> {
    let Some(password) = ensure_admin(db, &config.admin_username).await? else {
        info!("🔐 管理员 {} 已存在", config.admin_username);
        return Ok(());
    };

    info!("🔐 管理员账户已创建");
    info!("═══════════════════════════════════════════════════════════════");
    info!("👤 用户名: {}", config.admin_username);
    info!("🔑 密码: {}", password);
    info!("⚠️  请妥善保存此密码，仅在创建时显示一次！");
    info!("═══════════════════════════════════════════════════════════════");

    let data_dir = config.data_dir();
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!("无法创建 data 目录: {}", e);
        return Ok(());
    }
    let password_file = data_dir.join("admin_password.txt");
    let content = format!(
        "管理员初始密码\n═══════════════════════════════════════\n用户名: {}\n密码: {}\n═══════════════════════════════════════\n⚠️ 登录后建议修改密码并删除此文件！\n",
        config.admin_username, password
    );
    match std::fs::write(&password_file, content) {
        Ok(_) => info!("📁 密码已保存到: {}", password_file.display()),
        Err(e) => tracing::error!("无法保存密码文件: {}", e),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration;

    async fn db() -> DatabaseConnection {
        let db = migration::connect("sqlite::memory:").await.unwrap();
        migration::migrate(&db).await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_seed_kernels_is_idempotent() {
        let repo = KernelRepository::new(db().await);
        assert_eq!(seed_kernels(&repo).await.unwrap(), KERNELS.len());
        assert_eq!(seed_kernels(&repo).await.unwrap(), 0);

        let kernels = repo.list().await.unwrap();
        assert_eq!(kernels.len(), 6);
        for kernel in &kernels {
            assert_eq!(kernel.id, kernel.kernel_type().to_string());
            assert_eq!(kernel.status, KernelStatus::Stopped);
        }
        let tor = repo.get(&"tor".to_string()).await.unwrap().unwrap();
        assert_eq!(tor.category, KernelCategory::Node);
    }

    #[tokio::test]
    async fn test_ensure_admin_once() {
        let db = db().await;
        let password = ensure_admin(&db, "admin").await.unwrap().unwrap();
        assert_eq!(password.len(), 16);
        assert!(ensure_admin(&db, "admin").await.unwrap().is_none());

        let admin = Admin::find().one(&db).await.unwrap().unwrap();
        assert!(auth::verify_password(&password, &admin.password_hash).unwrap());
    }
}

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;

use super::Repository;
use crate::entity::{kernel, Kernel};
use crate::schema::fields::field_enum;
use crate::schema::{FieldEnum, KernelConfig, KernelType};

field_enum! {
    /// 内核分类
    pub enum KernelCategory {
        Engine => "engine",
        Node => "node",
    }
}

field_enum! {
    /// 内核运行状态
    pub enum KernelStatus {
        Running => "running",
        Stopped => "stopped",
        Error => "error",
    }
}

/// 解码后的内核记录，配置已按类型还原
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KernelRecord {
    pub id: String,
    pub name: String,
    pub category: KernelCategory,
    pub protocols: Vec<String>,
    pub status: KernelStatus,
    pub version: i32,
    pub config: KernelConfig,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl KernelRecord {
    pub fn kernel_type(&self) -> KernelType {
        self.config.kernel_type()
    }

    pub fn supports_protocol(&self, protocol: &str) -> bool {
        self.protocols.iter().any(|p| p == protocol)
    }
}

impl TryFrom<kernel::Model> for KernelRecord {
    type Error = anyhow::Error;

    fn try_from(model: kernel::Model) -> Result<Self> {
        let kind = KernelType::parse(&model.kernel_type)
            .ok_or_else(|| anyhow!("内核 {} 类型未知: {}", model.id, model.kernel_type))?;
        let category = KernelCategory::parse(&model.category)
            .ok_or_else(|| anyhow!("内核 {} 分类未知: {}", model.id, model.category))?;
        let status = KernelStatus::parse(&model.status)
            .ok_or_else(|| anyhow!("内核 {} 状态未知: {}", model.id, model.status))?;
        let protocols: Vec<String> = serde_json::from_str(&model.protocols)
            .with_context(|| format!("内核 {} 协议列表损坏", model.id))?;
        let stored = serde_json::from_str(&model.config)
            .with_context(|| format!("内核 {} 配置不是合法 JSON", model.id))?;
        let config = KernelConfig::from_value(kind, stored)
            .with_context(|| format!("内核 {} 配置与类型 {} 不符", model.id, kind))?;

        Ok(Self {
            id: model.id,
            name: model.name,
            category,
            protocols,
            status,
            version: model.version,
            config,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

fn to_active(record: &KernelRecord) -> Result<kernel::ActiveModel> {
    Ok(kernel::ActiveModel {
        id: Set(record.id.clone()),
        name: Set(record.name.clone()),
        category: Set(record.category.to_string()),
        kernel_type: Set(record.kernel_type().to_string()),
        protocols: Set(serde_json::to_string(&record.protocols)?),
        status: Set(record.status.to_string()),
        version: Set(record.version),
        config: Set(serde_json::to_string(&record.config)?),
        created_at: Set(record.created_at),
        updated_at: Set(Utc::now().naive_utc()),
    })
}

#[derive(Clone)]
pub struct KernelRepository {
    db: DatabaseConnection,
}

impl KernelRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// 仅当版本号仍为 `expected_version` 时写入新配置，版本号加一
    ///
    /// 版本不匹配（或内核不存在）时返回 `None`，不做任何修改。
    pub async fn save_config(
        &self,
        id: &str,
        expected_version: i32,
        config: &KernelConfig,
    ) -> Result<Option<KernelRecord>> {
        let result = Kernel::update_many()
            .col_expr(kernel::Column::Config, Expr::value(serde_json::to_string(config)?))
            .col_expr(
                kernel::Column::Version,
                Expr::col(kernel::Column::Version).add(1),
            )
            .col_expr(kernel::Column::UpdatedAt, Expr::value(Utc::now().naive_utc()))
            .filter(kernel::Column::Id.eq(id))
            .filter(kernel::Column::Version.eq(expected_version))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.get(&id.to_string()).await
    }

    pub async fn set_status(&self, id: &str, status: KernelStatus) -> Result<Option<KernelRecord>> {
        let result = Kernel::update_many()
            .col_expr(kernel::Column::Status, Expr::value(status.to_string()))
            .col_expr(kernel::Column::UpdatedAt, Expr::value(Utc::now().naive_utc()))
            .filter(kernel::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.get(&id.to_string()).await
    }
}

#[async_trait]
impl Repository for KernelRepository {
    type Id = String;
    type Entity = KernelRecord;

    async fn get(&self, id: &String) -> Result<Option<KernelRecord>> {
        Kernel::find_by_id(id.clone())
            .one(&self.db)
            .await?
            .map(KernelRecord::try_from)
            .transpose()
    }

    async fn list(&self) -> Result<Vec<KernelRecord>> {
        Kernel::find()
            .order_by_asc(kernel::Column::CreatedAt)
            .order_by_asc(kernel::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(KernelRecord::try_from)
            .collect()
    }

    async fn put(&self, entity: KernelRecord) -> Result<KernelRecord> {
        let active = to_active(&entity)?;
        let model = if Kernel::find_by_id(entity.id.clone())
            .one(&self.db)
            .await?
            .is_some()
        {
            active.update(&self.db).await?
        } else {
            active.insert(&self.db).await?
        };
        KernelRecord::try_from(model)
    }

    async fn delete(&self, id: &String) -> Result<bool> {
        let result = Kernel::delete_by_id(id.clone()).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration;
    use crate::schema::{TorWarpConfig, XrayConfig};

    async fn repo() -> KernelRepository {
        let db = migration::connect("sqlite::memory:").await.unwrap();
        migration::migrate(&db).await.unwrap();
        KernelRepository::new(db)
    }

    fn record(id: &str, config: KernelConfig) -> KernelRecord {
        let now = Utc::now().naive_utc();
        KernelRecord {
            id: id.to_string(),
            name: id.to_uppercase(),
            category: KernelCategory::Engine,
            protocols: vec!["vless".to_string(), "vmess".to_string()],
            status: KernelStatus::Stopped,
            version: 1,
            config,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_put_get_list_delete() {
        let repo = repo().await;
        let xray = record("xray", KernelConfig::Xray(XrayConfig::default()));
        repo.put(xray.clone()).await.unwrap();

        let stored = repo.get(&"xray".to_string()).await.unwrap().unwrap();
        assert_eq!(stored.config, xray.config);
        assert!(stored.supports_protocol("vless"));
        assert!(!stored.supports_protocol("trojan"));
        assert_eq!(repo.list().await.unwrap().len(), 1);

        assert!(repo.delete(&"xray".to_string()).await.unwrap());
        assert!(!repo.delete(&"xray".to_string()).await.unwrap());
        assert!(repo.get(&"xray".to_string()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_config_checks_version() {
        let repo = repo().await;
        repo.put(record("tor", KernelConfig::TorWarp(TorWarpConfig::default())))
            .await
            .unwrap();

        let updated = KernelConfig::TorWarp(TorWarpConfig {
            ports: vec![9999],
            ..TorWarpConfig::default()
        });
        let saved = repo.save_config("tor", 1, &updated).await.unwrap().unwrap();
        assert_eq!(saved.version, 2);
        assert_eq!(saved.config, updated);

        // 旧版本号写入被拒绝，配置保持不变
        let stale = KernelConfig::TorWarp(TorWarpConfig::default());
        assert!(repo.save_config("tor", 1, &stale).await.unwrap().is_none());
        let current = repo.get(&"tor".to_string()).await.unwrap().unwrap();
        assert_eq!(current.config, updated);
    }

    #[tokio::test]
    async fn test_set_status() {
        let repo = repo().await;
        repo.put(record("xray", KernelConfig::Xray(XrayConfig::default())))
            .await
            .unwrap();
        let running = repo
            .set_status("xray", KernelStatus::Running)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(running.status, KernelStatus::Running);
        assert!(repo
            .set_status("missing", KernelStatus::Running)
            .await
            .unwrap()
            .is_none());
    }
}

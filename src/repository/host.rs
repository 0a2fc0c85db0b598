use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, NotSet, QueryOrder, Set};

use super::Repository;
use crate::entity::{managed_host, ManagedHost};

#[derive(Clone)]
pub struct HostRepository {
    db: DatabaseConnection,
}

impl HostRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Repository for HostRepository {
    type Id = i64;
    type Entity = managed_host::Model;

    async fn get(&self, id: &i64) -> Result<Option<managed_host::Model>> {
        Ok(ManagedHost::find_by_id(*id).one(&self.db).await?)
    }

    async fn list(&self) -> Result<Vec<managed_host::Model>> {
        Ok(ManagedHost::find()
            .order_by_asc(managed_host::Column::Id)
            .all(&self.db)
            .await?)
    }

    async fn put(&self, entity: managed_host::Model) -> Result<managed_host::Model> {
        let is_new = entity.id == 0;
        let mut active = managed_host::ActiveModel::from(entity).reset_all();
        active.updated_at = Set(Utc::now().naive_utc());
        if is_new {
            active.id = NotSet;
            Ok(active.insert(&self.db).await?)
        } else {
            Ok(active.update(&self.db).await?)
        }
    }

    async fn delete(&self, id: &i64) -> Result<bool> {
        let result = ManagedHost::delete_by_id(*id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }
}

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, QueryFilter,
    QueryOrder, Set,
};

use super::Repository;
use crate::entity::{user, User};

#[derive(Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<user::Model>> {
        Ok(User::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await?)
    }

    pub async fn find_by_sublink(&self, sublink_path: &str) -> Result<Option<user::Model>> {
        Ok(User::find()
            .filter(user::Column::SublinkPath.eq(sublink_path))
            .one(&self.db)
            .await?)
    }
}

#[async_trait]
impl Repository for UserRepository {
    type Id = i64;
    type Entity = user::Model;

    async fn get(&self, id: &i64) -> Result<Option<user::Model>> {
        Ok(User::find_by_id(*id).one(&self.db).await?)
    }

    async fn list(&self) -> Result<Vec<user::Model>> {
        Ok(User::find()
            .order_by_asc(user::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// id 为 0 表示新记录
    async fn put(&self, entity: user::Model) -> Result<user::Model> {
        let is_new = entity.id == 0;
        let mut active = user::ActiveModel::from(entity).reset_all();
        active.updated_at = Set(Utc::now().naive_utc());
        if is_new {
            active.id = NotSet;
            Ok(active.insert(&self.db).await?)
        } else {
            Ok(active.update(&self.db).await?)
        }
    }

    async fn delete(&self, id: &i64) -> Result<bool> {
        let result = User::delete_by_id(*id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration;

    async fn repo() -> UserRepository {
        let db = migration::connect("sqlite::memory:").await.unwrap();
        migration::migrate(&db).await.unwrap();
        UserRepository::new(db)
    }

    fn user(username: &str, sublink: &str) -> user::Model {
        let now = Utc::now().naive_utc();
        user::Model {
            id: 0,
            username: username.to_string(),
            kernel_id: "xray".to_string(),
            protocol: "vless".to_string(),
            data_allowance_gb: 50.0,
            data_used_gb: 0.0,
            validity_period_days: 30,
            sublink_path: sublink.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_then_update() {
        let repo = repo().await;
        let alice = repo.put(user("alice", "alice-link")).await.unwrap();
        assert!(alice.id > 0);

        let mut edited = alice.clone();
        edited.data_used_gb = 12.0;
        let edited = repo.put(edited).await.unwrap();
        assert_eq!(edited.id, alice.id);
        assert_eq!(repo.list().await.unwrap().len(), 1);

        let found = repo.find_by_sublink("alice-link").await.unwrap().unwrap();
        assert_eq!(found.data_used_gb, 12.0);
        assert!(repo.find_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let repo = repo().await;
        repo.put(user("alice", "link-one")).await.unwrap();
        assert!(repo.put(user("alice", "link-two")).await.is_err());
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = repo().await;
        let alice = repo.put(user("alice", "alice-link")).await.unwrap();
        assert!(repo.delete(&alice.id).await.unwrap());
        assert!(repo.get(&alice.id).await.unwrap().is_none());
    }
}

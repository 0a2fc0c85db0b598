use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, NotSet, QueryOrder, Set};

use super::Repository;
use crate::entity::{server_node, ServerNode};

#[derive(Clone)]
pub struct NodeRepository {
    db: DatabaseConnection,
}

impl NodeRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Repository for NodeRepository {
    type Id = i64;
    type Entity = server_node::Model;

    async fn get(&self, id: &i64) -> Result<Option<server_node::Model>> {
        Ok(ServerNode::find_by_id(*id).one(&self.db).await?)
    }

    async fn list(&self) -> Result<Vec<server_node::Model>> {
        Ok(ServerNode::find()
            .order_by_asc(server_node::Column::Id)
            .all(&self.db)
            .await?)
    }

    async fn put(&self, entity: server_node::Model) -> Result<server_node::Model> {
        let is_new = entity.id == 0;
        let mut active = server_node::ActiveModel::from(entity).reset_all();
        active.updated_at = Set(Utc::now().naive_utc());
        if is_new {
            active.id = NotSet;
            Ok(active.insert(&self.db).await?)
        } else {
            Ok(active.update(&self.db).await?)
        }
    }

    async fn delete(&self, id: &i64) -> Result<bool> {
        let result = ServerNode::delete_by_id(*id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }
}

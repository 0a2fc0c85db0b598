//! 实体存储
//!
//! 处理器只通过 [`Repository`] 读写实体，校验逻辑不依赖具体存储。

use anyhow::Result;
use async_trait::async_trait;

mod host;
mod kernel;
mod node;
mod user;

pub use host::HostRepository;
pub use kernel::{KernelCategory, KernelRecord, KernelRepository, KernelStatus};
pub use node::NodeRepository;
pub use user::UserRepository;

#[async_trait]
pub trait Repository: Send + Sync {
    type Id: Send + Sync;
    type Entity: Send;

    async fn get(&self, id: &Self::Id) -> Result<Option<Self::Entity>>;

    async fn list(&self) -> Result<Vec<Self::Entity>>;

    /// 新记录插入，已有记录整体覆盖
    async fn put(&self, entity: Self::Entity) -> Result<Self::Entity>;

    /// 返回是否确实删除了记录
    async fn delete(&self, id: &Self::Id) -> Result<bool>;
}

//! Client takeover capability

use crate::error::ShellcacheResult;
use async_trait::async_trait;
use uuid::Uuid;

/// Lets an activated worker start controlling in-scope clients without a reload
#[async_trait]
pub trait Clients: Send + Sync {
    /// Make `worker_id` the controller of every in-scope client
    async fn claim(&self, worker_id: Uuid) -> ShellcacheResult<()>;
}

pub mod memory;
pub mod telegram;

use async_trait::async_trait;

use crate::error::AppResult;

/// Capability to deliver a text message to a recipient identified by an
/// opaque user id. Delivery may fail independently per recipient; failures
/// never affect settlement correctness.
#[async_trait]
pub trait Deliverer: Send + Sync {
    async fn deliver(&self, user_id: i64, text: &str) -> AppResult<()>;
}

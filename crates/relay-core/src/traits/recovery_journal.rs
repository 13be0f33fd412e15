use async_trait::async_trait;

use crate::errors::RelayResult;
use crate::models::RecoveryEvent;

/// Durable, append-only sink for recovery audit records.
#[async_trait]
pub trait RecoveryJournal: Send + Sync {
    async fn append(&self, event: &RecoveryEvent) -> RelayResult<()>;

    /// Most recent events, newest first.
    async fn recent(&self, limit: usize) -> RelayResult<Vec<RecoveryEvent>>;
}

use async_trait::async_trait;

use crate::errors::RelayResult;
use crate::models::CleanupReport;

/// Frees local storage on request. Implemented by the storage collaborator.
#[async_trait]
pub trait StorageCleanup: Send + Sync {
    /// Delete oldest-first until at least `target` bytes are freed.
    /// Returns the bytes actually freed.
    async fn free_bytes(&self, target: u64) -> RelayResult<u64>;

    /// Disk-exhaustion policy: oldest bulk artifacts first, pending
    /// telemetry only if that is not enough.
    async fn emergency_cleanup(&self) -> RelayResult<CleanupReport>;
}

use std::path::Path;

use async_trait::async_trait;

use crate::errors::RelayResult;

/// Destination for bulk artifacts.
///
/// Implementations must never leave a partially written object visible
/// under `key` when an upload fails.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn name(&self) -> &str;

    /// Upload `source` under `key`. Returns the bytes written.
    async fn put_file(&self, key: &str, source: &Path, content_type: &str) -> RelayResult<u64>;
}

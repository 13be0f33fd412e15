use serde::{Deserialize, Serialize};

use super::defaults;

/// Where bulk artifacts are uploaded to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BulkDestination {
    /// A mounted directory (NFS, removable disk, sync folder).
    Filesystem { root: String },
    /// An HTTP object store accepting `PUT <base_url>/<key>`.
    Http { base_url: String },
}

impl Default for BulkDestination {
    fn default() -> Self {
        Self::Filesystem {
            root: defaults::DEFAULT_BULK_FS_ROOT.to_string(),
        }
    }
}

/// BulkUploader configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkConfig {
    pub max_attempts: u32,
    pub backoff_base_secs: u64,
    pub backoff_cap_secs: u64,
    /// Ceiling on queued (pending) artifacts.
    pub max_queue: u64,
    pub poll_interval_secs: u64,
    pub destination: BulkDestination,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::DEFAULT_BULK_MAX_ATTEMPTS,
            backoff_base_secs: defaults::DEFAULT_BULK_BACKOFF_BASE_SECS,
            backoff_cap_secs: defaults::DEFAULT_BULK_BACKOFF_CAP_SECS,
            max_queue: defaults::DEFAULT_BULK_MAX_QUEUE,
            poll_interval_secs: defaults::DEFAULT_BULK_POLL_INTERVAL_SECS,
            destination: BulkDestination::default(),
        }
    }
}

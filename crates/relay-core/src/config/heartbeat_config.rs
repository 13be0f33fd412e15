use serde::{Deserialize, Serialize};

use super::defaults;

/// Periodic heartbeat publishing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::DEFAULT_HEARTBEAT_ENABLED,
            interval_secs: defaults::DEFAULT_HEARTBEAT_INTERVAL_SECS,
        }
    }
}

/// Local storage collaborator: where bulk artifact files live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directories scanned oldest-first during emergency cleanup.
    pub media_roots: Vec<String>,
    /// Free space the emergency cleanup aims to restore.
    pub emergency_target_free_bytes: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            media_roots: Vec::new(),
            emergency_target_free_bytes: defaults::DEFAULT_EMERGENCY_TARGET_FREE_BYTES,
        }
    }
}

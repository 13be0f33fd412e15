use serde::{Deserialize, Serialize};

use super::defaults;

/// DurableQueue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Path to the SQLite queue file. Created empty on first run.
    pub db_path: String,
    /// Number of read connections in the pool.
    pub read_pool_size: usize,
    /// Pending-record ceiling before non-alert eviction kicks in.
    pub max_pending: u64,
    /// Attempts after which a record is dead-lettered.
    pub max_attempts: u32,
    /// Share of the ceiling evicted at once when it is exceeded.
    pub eviction_fraction: f64,
    /// Days to keep sent, dead, and evicted records before pruning.
    pub retention_days: u32,
    /// Base delay before a failed record is reconsidered.
    pub retry_base_delay_secs: u64,
    /// Upper bound on the reconsideration delay.
    pub retry_max_delay_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            db_path: defaults::DEFAULT_QUEUE_DB_PATH.to_string(),
            read_pool_size: defaults::DEFAULT_READ_POOL_SIZE,
            max_pending: defaults::DEFAULT_MAX_PENDING,
            max_attempts: defaults::DEFAULT_MAX_ATTEMPTS,
            eviction_fraction: defaults::DEFAULT_EVICTION_FRACTION,
            retention_days: defaults::DEFAULT_RETENTION_DAYS,
            retry_base_delay_secs: defaults::DEFAULT_RETRY_BASE_DELAY_SECS,
            retry_max_delay_secs: defaults::DEFAULT_RETRY_MAX_DELAY_SECS,
        }
    }
}

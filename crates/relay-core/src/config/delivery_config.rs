use serde::{Deserialize, Serialize};

use super::defaults;

/// DeliveryEngine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Records fetched per drain cycle.
    pub batch_size: usize,
    pub drain_interval_secs: u64,
    /// Sleep while the network is unreachable.
    pub unreachable_wait_secs: u64,
    pub compression_enabled: bool,
    /// zstd level (1-22).
    pub compression_level: i32,
    /// Outbound ceiling in kilobits per second. 0 disables throttling.
    pub bandwidth_limit_kbps: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            batch_size: defaults::DEFAULT_BATCH_SIZE,
            drain_interval_secs: defaults::DEFAULT_DRAIN_INTERVAL_SECS,
            unreachable_wait_secs: defaults::DEFAULT_UNREACHABLE_WAIT_SECS,
            compression_enabled: defaults::DEFAULT_COMPRESSION_ENABLED,
            compression_level: defaults::DEFAULT_COMPRESSION_LEVEL,
            bandwidth_limit_kbps: defaults::DEFAULT_BANDWIDTH_LIMIT_KBPS,
        }
    }
}

impl DeliveryConfig {
    /// Bandwidth ceiling in bytes per second, `None` when unlimited.
    pub fn bytes_per_sec(&self) -> Option<u64> {
        (self.bandwidth_limit_kbps > 0).then(|| self.bandwidth_limit_kbps * 1000 / 8)
    }
}

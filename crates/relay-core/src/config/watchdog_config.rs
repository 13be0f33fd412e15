use serde::{Deserialize, Serialize};

use super::defaults;

/// Hardware watchdog petting. The board reboots if the pet loop stalls
/// for longer than the device timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    pub enabled: bool,
    /// Watchdog character device, e.g. `/dev/watchdog`.
    pub device_path: String,
    /// Must stay well under the device timeout.
    pub interval_secs: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::DEFAULT_WATCHDOG_ENABLED,
            device_path: defaults::DEFAULT_WATCHDOG_DEVICE.to_string(),
            interval_secs: defaults::DEFAULT_WATCHDOG_INTERVAL_SECS,
        }
    }
}

use serde::{Deserialize, Serialize};

use super::defaults;

/// NetworkMonitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Known external host for the reachability probe.
    pub probe_host: String,
    pub probe_port: u16,
    pub probe_timeout_secs: u64,
    pub check_interval_secs: u64,
    /// Interfaces whose link state is reported alongside reachability.
    pub interfaces: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            probe_host: defaults::DEFAULT_PROBE_HOST.to_string(),
            probe_port: defaults::DEFAULT_PROBE_PORT,
            probe_timeout_secs: defaults::DEFAULT_PROBE_TIMEOUT_SECS,
            check_interval_secs: defaults::DEFAULT_NETWORK_CHECK_INTERVAL_SECS,
            interfaces: defaults::DEFAULT_INTERFACES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

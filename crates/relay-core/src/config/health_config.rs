use serde::{Deserialize, Serialize};

use super::defaults;

/// HealthMonitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub check_interval_secs: u64,
    /// Per-probe timeout. A probe exceeding it counts as a failure.
    pub probe_timeout_secs: u64,
    /// Consecutive failures before a component is unhealthy.
    pub failure_threshold: u32,
    pub min_free_disk_bytes: u64,
    /// Any path on the filesystem to watch.
    pub disk_path: String,
    pub max_memory_percent: f64,
    pub max_cpu_temp_c: f64,
    pub thermal_zone_path: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: defaults::DEFAULT_HEALTH_CHECK_INTERVAL_SECS,
            probe_timeout_secs: defaults::DEFAULT_HEALTH_PROBE_TIMEOUT_SECS,
            failure_threshold: defaults::DEFAULT_FAILURE_THRESHOLD,
            min_free_disk_bytes: defaults::DEFAULT_MIN_FREE_DISK_BYTES,
            disk_path: defaults::DEFAULT_DISK_PATH.to_string(),
            max_memory_percent: defaults::DEFAULT_MAX_MEMORY_PERCENT,
            max_cpu_temp_c: defaults::DEFAULT_MAX_CPU_TEMP_C,
            thermal_zone_path: defaults::DEFAULT_THERMAL_ZONE_PATH.to_string(),
        }
    }
}

/// RecoveryManager configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Minimum time between two recoveries of the same component.
    pub cooldown_secs: u64,
    /// Wait between closing and reopening a sensor.
    pub sensor_settle_secs: u64,
    /// Largest share of bulk artifact files removed by one emergency cleanup.
    pub bulk_cleanup_fraction: f64,
    /// Share of pending telemetry evicted when bulk cleanup falls short.
    pub telemetry_cleanup_fraction: f64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: defaults::DEFAULT_RECOVERY_COOLDOWN_SECS,
            sensor_settle_secs: defaults::DEFAULT_SENSOR_SETTLE_SECS,
            bulk_cleanup_fraction: defaults::DEFAULT_BULK_CLEANUP_FRACTION,
            telemetry_cleanup_fraction: defaults::DEFAULT_TELEMETRY_CLEANUP_FRACTION,
        }
    }
}

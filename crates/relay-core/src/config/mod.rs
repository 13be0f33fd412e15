pub mod broker_config;
pub mod bulk_config;
pub mod defaults;
pub mod delivery_config;
pub mod health_config;
pub mod heartbeat_config;
pub mod network_config;
pub mod queue_config;
pub mod watchdog_config;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use broker_config::{BrokerConfig, ConnectionConfig};
pub use bulk_config::{BulkConfig, BulkDestination};
pub use delivery_config::DeliveryConfig;
pub use health_config::{HealthConfig, RecoveryConfig};
pub use heartbeat_config::{HeartbeatConfig, StorageConfig};
pub use network_config::NetworkConfig;
pub use queue_config::QueueConfig;
pub use watchdog_config::WatchdogConfig;

use crate::errors::{RelayError, RelayResult};

/// Identity of the device installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub id: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            id: defaults::DEFAULT_SITE_ID.to_string(),
        }
    }
}

/// Top-level configuration aggregating all subsystem configs.
///
/// Resolved once at startup; components receive the section they own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub site: SiteConfig,
    pub queue: QueueConfig,
    pub broker: BrokerConfig,
    pub connection: ConnectionConfig,
    pub delivery: DeliveryConfig,
    pub bulk: BulkConfig,
    pub network: NetworkConfig,
    pub health: HealthConfig,
    pub recovery: RecoveryConfig,
    pub heartbeat: HeartbeatConfig,
    pub storage: StorageConfig,
    pub watchdog: WatchdogConfig,
}

impl RelayConfig {
    /// Load config from a TOML string. Missing fields use defaults.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Read, parse, and validate a TOML config file.
    pub fn load(path: &Path) -> RelayResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&raw)
            .map_err(|e| RelayError::ConfigError(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no component can run with.
    pub fn validate(&self) -> RelayResult<()> {
        if self.site.id.trim().is_empty() {
            return Err(config_err("site.id must not be empty"));
        }
        if self.broker.endpoint.trim().is_empty() {
            return Err(config_err("broker.endpoint must be set"));
        }
        if self.connection.backoff_base_secs == 0 {
            return Err(config_err("connection.backoff_base_secs must be > 0"));
        }
        if self.connection.backoff_base_secs > self.connection.backoff_cap_secs {
            return Err(config_err(
                "connection.backoff_base_secs must not exceed backoff_cap_secs",
            ));
        }
        if self.bulk.backoff_base_secs > self.bulk.backoff_cap_secs {
            return Err(config_err(
                "bulk.backoff_base_secs must not exceed backoff_cap_secs",
            ));
        }
        for (name, secs) in [
            ("delivery.drain_interval_secs", self.delivery.drain_interval_secs),
            ("network.check_interval_secs", self.network.check_interval_secs),
            ("health.check_interval_secs", self.health.check_interval_secs),
            ("health.probe_timeout_secs", self.health.probe_timeout_secs),
            ("bulk.poll_interval_secs", self.bulk.poll_interval_secs),
            ("heartbeat.interval_secs", self.heartbeat.interval_secs),
            ("watchdog.interval_secs", self.watchdog.interval_secs),
        ] {
            if secs == 0 {
                return Err(config_err(&format!("{name} must be > 0")));
            }
        }
        for (name, fraction) in [
            ("queue.eviction_fraction", self.queue.eviction_fraction),
            ("recovery.bulk_cleanup_fraction", self.recovery.bulk_cleanup_fraction),
            (
                "recovery.telemetry_cleanup_fraction",
                self.recovery.telemetry_cleanup_fraction,
            ),
        ] {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err(config_err(&format!("{name} must be in (0, 1]")));
            }
        }
        if self.queue.max_pending == 0 || self.queue.max_attempts == 0 {
            return Err(config_err("queue.max_pending and queue.max_attempts must be > 0"));
        }
        if self.bulk.max_attempts == 0 || self.bulk.max_queue == 0 {
            return Err(config_err("bulk.max_attempts and bulk.max_queue must be > 0"));
        }
        if self.health.failure_threshold == 0 {
            return Err(config_err("health.failure_threshold must be > 0"));
        }
        if self.delivery.batch_size == 0 {
            return Err(config_err("delivery.batch_size must be > 0"));
        }
        Ok(())
    }

    /// Broker client id, derived from the site when not configured.
    pub fn client_id(&self) -> String {
        if self.broker.client_id.is_empty() {
            format!("relay-{}", self.site.id)
        } else {
            self.broker.client_id.clone()
        }
    }

    /// Full broker topic for a logical kind (`telemetry`, `heartbeat`, `alerts`).
    pub fn topic(&self, kind: &str) -> String {
        format!("{}/{}/{}", self.broker.topic_prefix, self.site.id, kind)
    }
}

fn config_err(msg: &str) -> RelayError {
    RelayError::ConfigError(msg.to_string())
}

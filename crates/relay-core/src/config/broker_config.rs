use serde::{Deserialize, Serialize};

use super::defaults;

/// Message-broker endpoint and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Broker host name, e.g. `xxxx-ats.iot.eu-west-1.amazonaws.com`.
    pub endpoint: String,
    pub port: u16,
    /// Client identifier. Empty means `relay-<site id>`.
    pub client_id: String,
    /// Device certificate (PEM).
    pub cert_path: String,
    /// Device private key (PEM).
    pub key_path: String,
    /// Root CA bundle (PEM).
    pub root_ca_path: String,
    /// Topics are `<prefix>/<site>/<kind>`.
    pub topic_prefix: String,
    pub connect_timeout_secs: u64,
    pub operation_timeout_secs: u64,
    pub disconnect_timeout_secs: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            port: defaults::DEFAULT_BROKER_PORT,
            client_id: String::new(),
            cert_path: defaults::DEFAULT_CERT_PATH.to_string(),
            key_path: defaults::DEFAULT_KEY_PATH.to_string(),
            root_ca_path: defaults::DEFAULT_ROOT_CA_PATH.to_string(),
            topic_prefix: defaults::DEFAULT_TOPIC_PREFIX.to_string(),
            connect_timeout_secs: defaults::DEFAULT_CONNECT_TIMEOUT_SECS,
            operation_timeout_secs: defaults::DEFAULT_OPERATION_TIMEOUT_SECS,
            disconnect_timeout_secs: defaults::DEFAULT_DISCONNECT_TIMEOUT_SECS,
        }
    }
}

/// Reconnect backoff policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub backoff_base_secs: u64,
    pub backoff_cap_secs: u64,
    /// Uninterrupted connected time after which the attempt counter resets.
    pub stable_reset_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            backoff_base_secs: defaults::DEFAULT_BACKOFF_BASE_SECS,
            backoff_cap_secs: defaults::DEFAULT_BACKOFF_CAP_SECS,
            stable_reset_secs: defaults::DEFAULT_STABLE_RESET_SECS,
        }
    }
}

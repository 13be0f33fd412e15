use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which recovery action applies to a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryKind {
    /// Close, settle, reinitialize.
    Sensor,
    /// Emergency storage cleanup.
    DiskSpace,
    /// Force a broker reconnect cycle.
    Delivery,
    /// Observed only.
    None,
}

/// Result of one health probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub ok: bool,
    pub detail: Option<String>,
}

impl ProbeResult {
    pub fn healthy() -> Self {
        Self {
            ok: true,
            detail: None,
        }
    }

    pub fn healthy_with(detail: impl Into<String>) -> Self {
        Self {
            ok: true,
            detail: Some(detail.into()),
        }
    }

    pub fn unhealthy(detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            detail: Some(detail.into()),
        }
    }
}

/// Per-component health, owned by the HealthMonitor.
///
/// `consecutive_failures` resets to zero on any successful probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub kind: RecoveryKind,
    pub last_probe_ok: Option<bool>,
    pub latency_ms: Option<u64>,
    pub detail: Option<String>,
    pub consecutive_failures: u32,
    /// Set once the failure threshold is crossed, cleared on success.
    pub unhealthy: bool,
    pub last_checked: Option<DateTime<Utc>>,
    pub last_recovery: Option<DateTime<Utc>>,
}

impl ComponentHealth {
    pub fn new(name: impl Into<String>, kind: RecoveryKind) -> Self {
        Self {
            name: name.into(),
            kind,
            last_probe_ok: None,
            latency_ms: None,
            detail: None,
            consecutive_failures: 0,
            unhealthy: false,
            last_checked: None,
            last_recovery: None,
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ComponentHealth;

/// Health report across all monitored components.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub overall_status: HealthStatus,
    pub components: Vec<ComponentHealth>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// A component falling back or failing, kept for alerting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DegradationEvent {
    pub component: String,
    pub failure: String,
    pub timestamp: DateTime<Utc>,
}

//! Aggregate health report generation.

use chrono::Utc;
use relay_core::models::{ComponentHealth, HealthReport, HealthStatus};

/// Builds a [`HealthReport`] from per-component entries.
pub struct HealthReporter;

impl HealthReporter {
    pub fn build(components: Vec<ComponentHealth>) -> HealthReport {
        HealthReport {
            overall_status: Self::derive_overall(&components),
            components,
            generated_at: Utc::now(),
        }
    }

    /// Unhealthy past the threshold, degraded while failures are
    /// accumulating, healthy otherwise (including never probed).
    pub fn component_status(component: &ComponentHealth) -> HealthStatus {
        if component.unhealthy {
            HealthStatus::Unhealthy
        } else if component.consecutive_failures > 0 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }

    /// Derive overall status: unhealthy if any component is unhealthy,
    /// degraded if any is degraded, otherwise healthy.
    pub fn derive_overall(components: &[ComponentHealth]) -> HealthStatus {
        let mut worst = HealthStatus::Healthy;
        for c in components {
            match Self::component_status(c) {
                HealthStatus::Unhealthy => return HealthStatus::Unhealthy,
                HealthStatus::Degraded => worst = HealthStatus::Degraded,
                HealthStatus::Healthy => {}
            }
        }
        worst
    }
}

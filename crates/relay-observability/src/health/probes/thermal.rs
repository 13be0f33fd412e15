//! CPU temperature from the sysfs thermal zone.
//!
//! The kernel reports millidegrees Celsius (`54321` is 54.321 °C).

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use relay_core::models::{ProbeResult, RecoveryKind};
use relay_core::traits::HealthCheckable;

/// Read the temperature in °C, or `None` when the zone is missing or unparsable.
pub fn read_cpu_temperature(path: &Path) -> Option<f64> {
    let raw = std::fs::read_to_string(path).ok()?;
    let millidegrees: i64 = raw.trim().parse().ok()?;
    Some(millidegrees as f64 / 1000.0)
}

pub struct CpuTemperatureProbe {
    path: PathBuf,
    max_celsius: f64,
}

impl CpuTemperatureProbe {
    pub fn new(path: impl Into<PathBuf>, max_celsius: f64) -> Self {
        Self {
            path: path.into(),
            max_celsius,
        }
    }
}

#[async_trait]
impl HealthCheckable for CpuTemperatureProbe {
    fn name(&self) -> &str {
        "cpu_temperature"
    }

    fn recovery_kind(&self) -> RecoveryKind {
        RecoveryKind::None
    }

    async fn probe(&self) -> ProbeResult {
        // Boards without a thermal zone are not failing.
        match read_cpu_temperature(&self.path) {
            Some(t) if t > self.max_celsius => {
                ProbeResult::unhealthy(format!("{t:.1}°C exceeds {:.1}°C", self.max_celsius))
            }
            Some(t) => ProbeResult::healthy_with(format!("{t:.1}°C")),
            None => ProbeResult::healthy_with("no temperature sensor"),
        }
    }
}

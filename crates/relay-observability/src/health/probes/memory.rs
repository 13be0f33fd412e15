use async_trait::async_trait;
use sysinfo::System;

use relay_core::models::{ProbeResult, RecoveryKind};
use relay_core::traits::HealthCheckable;

/// Used memory as a percentage of total. Observed only; there is no
/// automated remedy for memory pressure.
pub struct MemoryProbe {
    max_percent: f64,
}

impl MemoryProbe {
    pub fn new(max_percent: f64) -> Self {
        Self { max_percent }
    }

    pub fn used_percent() -> f64 {
        let mut sys = System::new();
        sys.refresh_memory();
        percent(sys.used_memory(), sys.total_memory())
    }
}

pub(crate) fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    used as f64 * 100.0 / total as f64
}

fn evaluate(used_percent: f64, max_percent: f64) -> ProbeResult {
    if used_percent > max_percent {
        ProbeResult::unhealthy(format!(
            "memory {used_percent:.1}% used, limit {max_percent:.1}%"
        ))
    } else {
        ProbeResult::healthy_with(format!("memory {used_percent:.1}% used"))
    }
}

#[async_trait]
impl HealthCheckable for MemoryProbe {
    fn name(&self) -> &str {
        "memory"
    }

    fn recovery_kind(&self) -> RecoveryKind {
        RecoveryKind::None
    }

    async fn probe(&self) -> ProbeResult {
        match tokio::task::spawn_blocking(Self::used_percent).await {
            Ok(used) => evaluate(used, self.max_percent),
            Err(e) => ProbeResult::unhealthy(format!("memory query failed: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn over_limit_is_unhealthy() {
        assert!(!evaluate(95.0, 90.0).ok);
        assert!(evaluate(90.0, 90.0).ok);
        assert!(evaluate(12.5, 90.0).ok);
    }

    #[test]
    fn percent_handles_zero_total() {
        assert_eq!(percent(5, 0), 0.0);
        assert_eq!(percent(1, 4), 25.0);
    }
}

use async_trait::async_trait;

use crate::errors::RelayResult;
use crate::models::{ProbeResult, RecoveryKind};

/// A component the HealthMonitor can probe and the RecoveryManager can repair.
///
/// Sensors implement all three lifecycle methods. Host resources (disk,
/// memory, temperature) only implement `probe`.
#[async_trait]
pub trait HealthCheckable: Send + Sync {
    /// Stable component name used in reports and the recovery log.
    fn name(&self) -> &str;

    fn recovery_kind(&self) -> RecoveryKind {
        RecoveryKind::Sensor
    }

    /// Cheap capability check. Must not block for long; the caller still
    /// wraps it in a timeout.
    async fn probe(&self) -> ProbeResult;

    /// Release the underlying handle.
    async fn shutdown(&self) -> RelayResult<()> {
        Ok(())
    }

    /// Reopen the underlying handle after `shutdown`.
    async fn reinitialize(&self) -> RelayResult<()> {
        Ok(())
    }
}

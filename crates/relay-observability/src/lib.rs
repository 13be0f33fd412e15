//! # relay-observability
//!
//! Health monitoring of registered components and host resources,
//! cooldown-guarded auto-recovery with an audit log, degradation tracking
//! with alerting, and structured tracing with one event per key operation.

pub mod degradation;
pub mod health;
pub mod recovery;
pub mod tracing_setup;

pub use degradation::{evaluate_alerts, AlertLevel, DegradationAlert, DegradationTracker};
pub use health::{HealthMonitor, HealthReporter, UnhealthyTransition};
pub use recovery::{RecoveryManager, RecoveryStats};
pub use tracing_setup::events;

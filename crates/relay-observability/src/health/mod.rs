//! Health monitoring subsystem.
//!
//! [`HealthMonitor`] polls every registered [`HealthCheckable`] on a fixed
//! interval, keeps one [`ComponentHealth`] per component, and emits an
//! [`UnhealthyTransition`] the moment a component crosses the failure
//! threshold. [`HealthReporter`] folds the entries into a [`HealthReport`].
//!
//! [`HealthCheckable`]: relay_core::traits::HealthCheckable
//! [`ComponentHealth`]: relay_core::models::ComponentHealth
//! [`HealthReport`]: relay_core::models::HealthReport

pub mod monitor;
pub mod probes;
pub mod reporter;

pub use monitor::{HealthMonitor, UnhealthyTransition};
pub use probes::{CpuTemperatureProbe, DiskProbe, HostSnapshot, MemoryProbe};
pub use reporter::HealthReporter;

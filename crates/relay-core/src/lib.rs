//! # relay-core
//!
//! Foundation crate for the relay edge resilience core.
//! Defines the data model, collaborator traits, errors, config, constants,
//! and the periodic-task scheduler every background loop runs on.
//! Every other crate in the workspace depends on this.

pub mod config;
pub mod constants;
pub mod errors;
pub mod models;
pub mod schedule;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use config::RelayConfig;
pub use errors::{ErrorClass, RelayError, RelayResult};
pub use models::{
    ArtifactCategory, BulkArtifact, ComponentHealth, ConnectionState, HealthReport, HealthStatus,
    Priority, RecordStatus, RecoveryEvent, TelemetryRecord, Topic,
};

mod bulk_artifact;
mod component_health;
mod connection_state;
mod health_report;
mod queue_stats;
mod recovery_event;
mod telemetry_record;

pub use bulk_artifact::{
    content_type_for, ArtifactCategory, ArtifactStatus, BulkArtifact, NewBulkArtifact,
};
pub use component_health::{ComponentHealth, ProbeResult, RecoveryKind};
pub use connection_state::ConnectionState;
pub use health_report::{DegradationEvent, HealthReport, HealthStatus};
pub use queue_stats::{ArtifactQueueStats, CleanupReport, QueueStats};
pub use recovery_event::{RecoveryAction, RecoveryEvent, RecoveryOutcome};
pub use telemetry_record::{NewTelemetryRecord, Priority, RecordStatus, TelemetryRecord, Topic};

/// Topic kind for periodic telemetry readings.
pub const TOPIC_TELEMETRY: &str = "telemetry";

/// Topic kind for liveness heartbeats.
pub const TOPIC_HEARTBEAT: &str = "heartbeat";

/// Topic kind for alerts. Alert records drain ahead of everything else.
pub const TOPIC_ALERTS: &str = "alerts";

/// Consecutive queue storage failures after which the queue is considered lost.
pub const FATAL_STORAGE_FAILURES: u32 = 5;

/// Extra headroom applied when freeing bytes during emergency cleanup.
pub const CLEANUP_BUFFER_RATIO: f64 = 0.10;

/// Header carrying the record id so the cloud side can drop duplicates.
pub const MESSAGE_ID_HEADER: &str = "x-relay-message-id";

/// Suffix for in-progress uploads on filesystem destinations.
pub const PARTIAL_SUFFIX: &str = ".partial";

/// Degradations per hour above which a component raises a warning.
pub const DEGRADATION_WARNING_PER_HOUR: usize = 3;

/// Hours of continuous degradation after which a component is critical.
pub const DEGRADATION_CRITICAL_HOURS: i64 = 24;

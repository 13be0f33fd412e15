/// Health probe and recovery errors.
#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    #[error("probe for {component} timed out after {timeout_secs}s")]
    ProbeTimeout {
        component: String,
        timeout_secs: u64,
    },

    #[error("probe for {component} failed: {reason}")]
    ProbeFailed { component: String, reason: String },

    #[error("recovery of {component} failed: {reason}")]
    RecoveryFailed { component: String, reason: String },
}

use super::{AuthError, BulkError, CapacityError, HealthError, NetworkError, StorageError};

/// Top-level error type for the relay system.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("network error: {0}")]
    NetworkError(#[from] NetworkError),

    #[error("auth error: {0}")]
    AuthError(#[from] AuthError),

    #[error("capacity error: {0}")]
    CapacityError(#[from] CapacityError),

    #[error("bulk upload error: {0}")]
    BulkError(#[from] BulkError),

    #[error("health error: {0}")]
    HealthError(#[from] HealthError),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("shutting down")]
    Cancelled,
}

/// How a caller should react to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Retry with backoff.
    Transient,
    /// Credentials are invalid; retrying cannot succeed.
    PermanentAuth,
    /// The queue medium failed; fatal for the affected record.
    Storage,
    /// A ceiling was hit; oldest non-priority work is evicted.
    Capacity,
    /// The request itself is bad and will fail the same way again.
    Permanent,
}

impl RelayError {
    /// Map onto the retry taxonomy. Callers choose re-enqueue, dead-letter,
    /// or escalation from this alone.
    pub fn class(&self) -> ErrorClass {
        match self {
            RelayError::NetworkError(NetworkError::Rejected { .. }) => ErrorClass::Permanent,
            RelayError::NetworkError(_) => ErrorClass::Transient,
            RelayError::AuthError(_) => ErrorClass::PermanentAuth,
            RelayError::StorageError(_) => ErrorClass::Storage,
            RelayError::CapacityError(_) => ErrorClass::Capacity,
            RelayError::BulkError(BulkError::SourceMissing { .. }) => ErrorClass::Permanent,
            RelayError::BulkError(BulkError::UploadFailed { .. }) => ErrorClass::Transient,
            RelayError::IoError(_) | RelayError::HealthError(_) | RelayError::Cancelled => {
                ErrorClass::Transient
            }
            RelayError::SerializationError(_) | RelayError::ConfigError(_) => {
                ErrorClass::Permanent
            }
        }
    }

    /// True when retrying may succeed.
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Transient
    }
}

/// Convenience alias used throughout the workspace.
pub type RelayResult<T> = Result<T, RelayError>;

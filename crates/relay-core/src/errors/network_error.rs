/// Broker and object-store transport errors.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("transient network error: {reason}")]
    Transient { reason: String },

    #[error("not connected (state: {state})")]
    NotConnected { state: String },

    #[error("connect timed out after {timeout_secs}s")]
    ConnectTimeout { timeout_secs: u64 },

    #[error("network unreachable: {reason}")]
    Unreachable { reason: String },

    #[error("publish rejected by broker: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Credential errors. Retrying cannot fix these.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("permanent authentication failure: {reason}")]
    PermanentAuth { reason: String },

    #[error("credential file unavailable: {path}: {reason}")]
    CredentialsMissing { path: String, reason: String },
}

/// Queue or retry-buffer ceilings.
#[derive(Debug, thiserror::Error)]
pub enum CapacityError {
    #[error("capacity exceeded for {resource}: {used}/{limit}")]
    CapacityExceeded {
        resource: String,
        used: u64,
        limit: u64,
    },
}

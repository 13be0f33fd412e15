use crate::models::ConnectionState;

/// The slice of the ConnectionManager that health and recovery need.
pub trait ConnectionControl: Send + Sync {
    fn state(&self) -> ConnectionState;

    /// Drop the current session and reconnect without waiting out backoff.
    fn force_reconnect(&self);
}

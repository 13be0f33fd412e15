//! Broker connection lifecycle.

mod backoff;
mod manager;

pub use backoff::{exponential_delay, Backoff};
pub use manager::{ConnectionManager, ConnectionStats};

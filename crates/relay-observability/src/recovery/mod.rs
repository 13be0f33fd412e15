//! Cooldown-guarded recovery of unhealthy components.

mod manager;

pub use manager::{RecoveryManager, RecoveryStats};

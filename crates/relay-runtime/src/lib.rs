//! # relay-runtime
//!
//! Owns every component of the relay core, wires them together by
//! injection, spawns their background loops, and shuts them down cleanly.
//! The hardware watchdog is petted from one of those loops.
//! Producers talk to [`RelayRuntime`]; nothing else is public surface.

pub mod cleanup;
pub mod deps;
pub mod heartbeat;
pub mod runtime;
pub mod watchdog;

pub use cleanup::EmergencyCleanup;
pub use deps::RuntimeDeps;
pub use runtime::{run, RelayRuntime, RuntimeStats};
pub use watchdog::{Watchdog, WatchdogStats};

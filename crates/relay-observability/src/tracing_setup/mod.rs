//! Tracing setup: structured JSON logging and event definitions.

pub mod events;

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "RELAY_LOG";

/// Initialize the tracing subscriber with structured JSON output.
///
/// Respects the `RELAY_LOG` environment variable for filtering.
/// Defaults to `info` level if not set. Calling it twice is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .json()
        .try_init();
}

/// Initialize tracing with a custom filter string (for testing or embedding).
pub fn init_tracing_with_filter(filter: &str) {
    let filter = EnvFilter::new(filter);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .json()
        .try_init();
}

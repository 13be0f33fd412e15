//! Periodic background tasks driven by a ticker and a cancellation token.
//!
//! Every loop in the system (drain, upload, network probe, health poll,
//! heartbeat, watchdog) runs through [`run_periodic`], so shutdown is one
//! `CancellationToken::cancel()` away regardless of what the loop does.

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
pub use tokio_util::sync::CancellationToken;

/// Run `tick` every `period` until `cancel` fires.
///
/// The first tick fires immediately. A tick in progress is allowed to
/// finish; missed ticks are delayed rather than bursted.
pub async fn run_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    cancel: CancellationToken,
    mut tick: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::debug!(task = name, period_ms = period.as_millis() as u64, "periodic task started");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => tick().await,
        }
    }

    tracing::debug!(task = name, "periodic task stopped");
}

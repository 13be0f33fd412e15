use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use relay_core::config::DeliveryConfig;
use relay_core::errors::{ErrorClass, NetworkError, RelayError, RelayResult};
use relay_core::models::{ConnectionState, RecordStatus, TelemetryRecord};
use relay_core::schedule::CancellationToken;
use relay_core::traits::OutboundMessage;
use relay_storage::DurableQueue;

use super::compression::Compressor;
use super::throttle::Throttle;
use crate::connection::ConnectionManager;

/// Why a drain cycle did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainSkip {
    Unreachable,
    NotConnected,
}

/// Outcome of one drain cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub claimed: usize,
    pub published: usize,
    /// Attempts that failed and were rescheduled.
    pub failed: usize,
    pub dead_lettered: usize,
    /// Claimed but handed back untouched because the session dropped.
    pub released: usize,
    pub skipped: Option<DrainSkip>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryStats {
    pub published: u64,
    pub failed: u64,
    pub dead_lettered: u64,
    /// Bytes on the wire, after compression.
    pub bytes_sent: u64,
    /// Compression savings on published records only.
    pub bytes_saved: u64,
    pub drain_cycles: u64,
    pub skipped_unreachable: u64,
    pub reconnections: u64,
    pub queue_depth: u64,
}

#[derive(Debug, Default)]
struct Counters {
    published: AtomicU64,
    failed: AtomicU64,
    dead_lettered: AtomicU64,
    bytes_sent: AtomicU64,
    bytes_saved: AtomicU64,
    drain_cycles: AtomicU64,
    skipped_unreachable: AtomicU64,
    queue_depth: AtomicU64,
}

/// Moves records from the DurableQueue to the broker.
///
/// Each cycle claims a FIFO batch (alerts first), publishes record by
/// record, and resolves every claimed record before returning: sent,
/// failed (rescheduled or dead-lettered), or released untouched.
pub struct DeliveryEngine {
    queue: Arc<DurableQueue>,
    connection: Arc<ConnectionManager>,
    reachability: watch::Receiver<bool>,
    config: DeliveryConfig,
    /// `<prefix>/<site>`; the record topic is appended.
    topic_base: String,
    compressor: Compressor,
    throttle: Throttle,
    counters: Counters,
}

impl DeliveryEngine {
    pub fn new(
        queue: Arc<DurableQueue>,
        connection: Arc<ConnectionManager>,
        reachability: watch::Receiver<bool>,
        config: DeliveryConfig,
        topic_base: impl Into<String>,
    ) -> Self {
        let compressor = Compressor::new(config.compression_enabled, config.compression_level);
        let throttle = Throttle::new(config.bytes_per_sec());
        Self {
            queue,
            connection,
            reachability,
            config,
            topic_base: topic_base.into().trim_end_matches('/').to_string(),
            compressor,
            throttle,
            counters: Counters::default(),
        }
    }

    fn is_reachable(&self) -> bool {
        *self.reachability.borrow()
    }

    /// The message to publish and the bytes compression saved on it.
    fn outbound(&self, record: &TelemetryRecord) -> (OutboundMessage, u64) {
        let encoded = self.compressor.encode(&record.payload);
        let message = OutboundMessage {
            topic: format!("{}/{}", self.topic_base, record.topic.as_str()),
            payload: encoded.bytes,
            qos: record.topic.qos(),
            message_id: record.message_id,
            content_encoding: encoded.content_encoding,
        };
        (message, encoded.saved)
    }

    /// Run one drain cycle.
    pub async fn drain_once(&self) -> RelayResult<DrainReport> {
        self.counters.drain_cycles.fetch_add(1, Ordering::Relaxed);
        let mut report = DrainReport::default();

        if !self.is_reachable() {
            self.counters
                .skipped_unreachable
                .fetch_add(1, Ordering::Relaxed);
            report.skipped = Some(DrainSkip::Unreachable);
            return Ok(report);
        }
        if self.connection.state() != ConnectionState::Connected {
            report.skipped = Some(DrainSkip::NotConnected);
            return Ok(report);
        }

        let batch = self.queue.fetch_pending(self.config.batch_size).await?;
        report.claimed = batch.len();

        for (i, record) in batch.iter().enumerate() {
            let (message, saved) = self.outbound(record);
            let size = message.payload.len() as u64;
            self.throttle.acquire(size).await;

            match self.connection.publish(&message).await {
                Ok(()) => {
                    if let Err(e) = self.queue.mark_sent(record.id).await {
                        return Err(self.abandon(&batch[i..], e).await);
                    }
                    report.published += 1;
                    self.counters.published.fetch_add(1, Ordering::Relaxed);
                    self.counters.bytes_sent.fetch_add(size, Ordering::Relaxed);
                    self.counters.bytes_saved.fetch_add(saved, Ordering::Relaxed);
                }
                Err(e) if halts_batch(&e) => {
                    let rest: Vec<i64> = batch[i..].iter().map(|r| r.id).collect();
                    report.released = self.queue.release(&rest).await?;
                    tracing::debug!(
                        released = report.released,
                        error = %e,
                        "delivery: session unavailable, batch handed back"
                    );
                    break;
                }
                Err(e) => {
                    let permanent = e.class() == ErrorClass::Permanent;
                    let status = match self
                        .queue
                        .mark_failed(record.id, &e.to_string(), permanent)
                        .await
                    {
                        Ok(status) => status,
                        Err(settle) => return Err(self.abandon(&batch[i..], settle).await),
                    };
                    self.counters.failed.fetch_add(1, Ordering::Relaxed);
                    if status == RecordStatus::Dead {
                        report.dead_lettered += 1;
                        self.counters.dead_lettered.fetch_add(1, Ordering::Relaxed);
                    } else {
                        report.failed += 1;
                    }
                    tracing::warn!(
                        record_id = record.id,
                        attempts = record.attempts + 1,
                        error = %e,
                        "delivery: publish failed"
                    );
                }
            }
        }

        if report.claimed > 0 {
            tracing::debug!(
                claimed = report.claimed,
                published = report.published,
                failed = report.failed,
                dead = report.dead_lettered,
                released = report.released,
                "delivery: drain cycle"
            );
        }
        Ok(report)
    }

    /// A claimed record could not be settled. Hand back everything from it
    /// onward so the next cycle claims it again, then surface the error.
    async fn abandon(&self, unsettled: &[TelemetryRecord], error: RelayError) -> RelayError {
        let ids: Vec<i64> = unsettled.iter().map(|r| r.id).collect();
        match self.queue.release(&ids).await {
            Ok(released) => tracing::warn!(
                released,
                error = %error,
                "delivery: could not settle record, batch handed back"
            ),
            Err(release_err) => tracing::error!(
                unsettled = ids.len(),
                error = %error,
                release_error = %release_err,
                "delivery: could not settle or release batch"
            ),
        }
        error
    }

    /// Drain until cancelled. Wakes early on reconnect or when the network
    /// comes back.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut state_rx = self.connection.subscribe();
        let mut reach_rx = self.reachability.clone();
        let interval = Duration::from_secs(self.config.drain_interval_secs);
        let unreachable_wait = Duration::from_secs(self.config.unreachable_wait_secs);
        tracing::debug!("delivery engine started");

        loop {
            if cancel.is_cancelled() {
                break;
            }
            let wait = match self.drain_once().await {
                Ok(r) if r.skipped == Some(DrainSkip::Unreachable) => unreachable_wait,
                Ok(r) if r.claimed >= self.config.batch_size && r.released == 0 => Duration::ZERO,
                Ok(_) => interval,
                Err(e) => {
                    tracing::warn!(error = %e, "delivery: drain cycle failed");
                    interval
                }
            };
            if wait.is_zero() {
                tokio::task::yield_now().await;
                continue;
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = changed(&mut state_rx) => {}
                _ = changed(&mut reach_rx) => {}
                _ = tokio::time::sleep(wait) => {}
            }
        }
        tracing::debug!("delivery engine stopped");
    }

    pub async fn stats(&self) -> DeliveryStats {
        match self.queue.stats().await {
            Ok(s) => self.counters.queue_depth.store(s.depth(), Ordering::Relaxed),
            Err(e) => tracing::debug!(error = %e, "delivery: queue stats unavailable"),
        }
        let c = &self.counters;
        DeliveryStats {
            published: c.published.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
            dead_lettered: c.dead_lettered.load(Ordering::Relaxed),
            bytes_sent: c.bytes_sent.load(Ordering::Relaxed),
            bytes_saved: c.bytes_saved.load(Ordering::Relaxed),
            drain_cycles: c.drain_cycles.load(Ordering::Relaxed),
            skipped_unreachable: c.skipped_unreachable.load(Ordering::Relaxed),
            reconnections: self.connection.stats().reconnections,
            queue_depth: c.queue_depth.load(Ordering::Relaxed),
        }
    }
}

/// Errors after which no further record in the batch can go out.
fn halts_batch(e: &RelayError) -> bool {
    matches!(e, RelayError::NetworkError(NetworkError::NotConnected { .. }))
        || e.class() == ErrorClass::PermanentAuth
}

/// Resolve on the next value; never resolve once the sender is gone.
async fn changed<T>(rx: &mut watch::Receiver<T>) {
    if rx.changed().await.is_err() {
        std::future::pending::<()>().await;
    }
}

//! DurableQueue: owns the ConnectionPool, runs migrations and crash
//! recovery at startup, and exposes the queue operations.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;

use relay_core::config::QueueConfig;
use relay_core::constants::FATAL_STORAGE_FAILURES;
use relay_core::errors::{ErrorClass, RelayResult};
use relay_core::models::{
    ArtifactQueueStats, ArtifactStatus, BulkArtifact, NewBulkArtifact, NewTelemetryRecord,
    QueueStats, RecordStatus, RecoveryEvent, TelemetryRecord,
};
use relay_core::traits::RecoveryJournal;
use relay_observability::events;

use crate::migrations;
use crate::pool::ConnectionPool;
use crate::queries::artifact_ops::{self, ArtifactInsert};
use crate::queries::eviction::{self, Eviction};
use crate::queries::maintenance::{self, StorageHealthReport};
use crate::queries::record_ops::{self, FailurePolicy};
use crate::queries::{recovery_log_ops, stats};
use crate::recovery;

/// On-disk, crash-safe queue of telemetry records and bulk artifacts.
///
/// Internally synchronized: every write goes through one async-locked
/// connection, so overlapping drain cycles can never claim the same record.
pub struct DurableQueue {
    pool: ConnectionPool,
    config: QueueConfig,
    /// Consecutive storage-class failures; reset by any successful write.
    storage_failures: AtomicU32,
    evicted_total: AtomicU64,
}

impl DurableQueue {
    /// Open (or create) the queue file at `path`.
    pub fn open(path: &Path, config: QueueConfig) -> RelayResult<Self> {
        let pool = ConnectionPool::open(path, config.read_pool_size)?;
        let queue = Self::from_pool(pool, config);
        queue.initialize()?;
        Ok(queue)
    }

    /// Open the file named in `config.db_path`.
    pub fn open_configured(config: QueueConfig) -> RelayResult<Self> {
        let path = PathBuf::from(&config.db_path);
        Self::open(&path, config)
    }

    /// Open an in-memory queue (for testing). All reads go through the writer.
    pub fn open_in_memory(config: QueueConfig) -> RelayResult<Self> {
        let pool = ConnectionPool::open_in_memory()?;
        let queue = Self::from_pool(pool, config);
        queue.initialize()?;
        Ok(queue)
    }

    fn from_pool(pool: ConnectionPool, config: QueueConfig) -> Self {
        Self {
            pool,
            config,
            storage_failures: AtomicU32::new(0),
            evicted_total: AtomicU64::new(0),
        }
    }

    /// Checkpoint leftovers from an unclean shutdown, migrate, and return
    /// records stranded in flight to pending.
    fn initialize(&self) -> RelayResult<()> {
        self.pool.writer.with_conn_sync(|conn| {
            recovery::attempt_wal_recovery(conn)?;
            migrations::run_migrations(conn)?;
            let records = record_ops::recover_in_flight(conn)?;
            let artifacts = artifact_ops::recover_in_flight(conn)?;
            if records > 0 || artifacts > 0 {
                tracing::warn!(
                    records = records,
                    artifacts = artifacts,
                    "queue: returned in-flight work to pending after restart"
                );
            }
            Ok(())
        })
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.pool.db_path.as_deref()
    }

    // --- connection routing ---

    async fn write<F, T>(&self, f: F) -> RelayResult<T>
    where
        F: FnOnce(&Connection) -> RelayResult<T>,
    {
        let result = self.pool.writer.with_conn(f).await;
        self.track(&result);
        result
    }

    /// File-backed: read pool (no writer contention). In-memory: the writer.
    async fn read<F, T>(&self, f: F) -> RelayResult<T>
    where
        F: FnOnce(&Connection) -> RelayResult<T>,
    {
        match &self.pool.readers {
            Some(readers) => readers.with_conn(f),
            None => self.pool.writer.with_conn(f).await,
        }
    }

    fn track<T>(&self, result: &RelayResult<T>) {
        match result {
            Ok(_) => {
                self.storage_failures.store(0, Ordering::Relaxed);
            }
            Err(e) if e.class() == ErrorClass::Storage => {
                let n = self.storage_failures.fetch_add(1, Ordering::Relaxed) + 1;
                if n >= FATAL_STORAGE_FAILURES {
                    tracing::error!(
                        consecutive_failures = n,
                        error = %e,
                        "queue: storage failing repeatedly"
                    );
                } else {
                    tracing::warn!(consecutive_failures = n, error = %e, "queue: storage error");
                }
            }
            Err(_) => {}
        }
    }

    /// True once storage has failed `FATAL_STORAGE_FAILURES` times in a row.
    /// Without a writable queue the delivery guarantee is gone.
    pub fn is_fatal(&self) -> bool {
        self.storage_failures.load(Ordering::Relaxed) >= FATAL_STORAGE_FAILURES
    }

    pub fn consecutive_storage_failures(&self) -> u32 {
        self.storage_failures.load(Ordering::Relaxed)
    }

    // --- telemetry records ---

    /// Persist a record and enforce the pending ceiling. Eviction problems
    /// are logged; they never fail the enqueue itself.
    pub async fn enqueue(&self, record: NewTelemetryRecord) -> RelayResult<i64> {
        let ceiling = self.config.max_pending;
        let fraction = self.config.eviction_fraction;

        let (id, eviction) = self
            .write(|conn| {
                let id = record_ops::insert_record(conn, &record)?;
                let eviction = match eviction::evict_over_ceiling(conn, ceiling, fraction) {
                    Ok(ev) => ev,
                    Err(e) => {
                        tracing::warn!(error = %e, "queue: capacity eviction failed");
                        Eviction::default()
                    }
                };
                Ok((id, eviction))
            })
            .await?;

        if eviction.records > 0 {
            self.evicted_total
                .fetch_add(eviction.records, Ordering::Relaxed);
            events::record_evicted(eviction.records, eviction.bytes, "queue capacity exceeded");
        }
        Ok(id)
    }

    /// Claim up to `limit` records for delivery.
    pub async fn fetch_pending(&self, limit: usize) -> RelayResult<Vec<TelemetryRecord>> {
        self.fetch_pending_at(limit, Utc::now()).await
    }

    /// [`fetch_pending`](Self::fetch_pending) with an explicit clock.
    pub async fn fetch_pending_at(
        &self,
        limit: usize,
        now: DateTime<Utc>,
    ) -> RelayResult<Vec<TelemetryRecord>> {
        self.write(|conn| record_ops::claim_pending(conn, limit, now))
            .await
    }

    pub async fn mark_sent(&self, id: i64) -> RelayResult<()> {
        self.write(|conn| record_ops::mark_sent(conn, id)).await
    }

    /// Count a failed attempt. Returns `Failed` (rescheduled) or `Dead`.
    pub async fn mark_failed(
        &self,
        id: i64,
        error: &str,
        permanent: bool,
    ) -> RelayResult<RecordStatus> {
        self.mark_failed_at(id, error, permanent, Utc::now()).await
    }

    pub async fn mark_failed_at(
        &self,
        id: i64,
        error: &str,
        permanent: bool,
        now: DateTime<Utc>,
    ) -> RelayResult<RecordStatus> {
        let policy = FailurePolicy {
            max_attempts: self.config.max_attempts,
            base_delay_secs: self.config.retry_base_delay_secs,
            max_delay_secs: self.config.retry_max_delay_secs,
        };
        let status = self
            .write(|conn| record_ops::mark_failed(conn, id, error, permanent, policy, now))
            .await?;
        if status == RecordStatus::Dead {
            events::record_dead_lettered(id, error);
        }
        Ok(status)
    }

    /// Hand claimed records back untouched (no attempt consumed).
    pub async fn release(&self, ids: &[i64]) -> RelayResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        self.write(|conn| record_ops::release(conn, ids)).await
    }

    pub async fn count_pending(&self) -> RelayResult<u64> {
        self.read(record_ops::count_pending).await
    }

    pub async fn get(&self, id: i64) -> RelayResult<Option<TelemetryRecord>> {
        self.read(|conn| record_ops::get_record(conn, id)).await
    }

    /// Dead-lettered records held for inspection, oldest first.
    pub async fn dead_letters(&self, limit: usize) -> RelayResult<Vec<TelemetryRecord>> {
        self.read(|conn| record_ops::list_by_status(conn, RecordStatus::Dead, limit))
            .await
    }

    pub async fn list_by_status(
        &self,
        status: RecordStatus,
        limit: usize,
    ) -> RelayResult<Vec<TelemetryRecord>> {
        self.read(|conn| record_ops::list_by_status(conn, status, limit))
            .await
    }

    /// Delete records with `status` created before `older_than`.
    pub async fn prune(&self, older_than: DateTime<Utc>, status: RecordStatus) -> RelayResult<usize> {
        self.write(|conn| record_ops::prune(conn, older_than, status))
            .await
    }

    /// Drop settled records older than the retention window.
    pub async fn prune_expired(&self) -> RelayResult<usize> {
        let cutoff = Utc::now() - Duration::days(i64::from(self.config.retention_days));
        let pruned = self
            .write(|conn| {
                let mut total = 0;
                for status in [RecordStatus::Sent, RecordStatus::Dead, RecordStatus::Evicted] {
                    total += record_ops::prune(conn, cutoff, status)?;
                }
                if total > 0 {
                    maintenance::incremental_vacuum(conn)?;
                }
                Ok(total)
            })
            .await?;
        if pruned > 0 {
            tracing::info!(pruned = pruned, "queue: pruned settled records");
        }
        Ok(pruned)
    }

    /// Emergency cleanup: evict `fraction` of the oldest non-alert backlog
    /// and return the space to the filesystem.
    pub async fn evict_oldest_pending(&self, fraction: f64) -> RelayResult<Eviction> {
        let eviction = self
            .write(|conn| {
                let ev = eviction::evict_fraction(conn, fraction)?;
                if ev.records > 0 {
                    maintenance::incremental_vacuum(conn)?;
                }
                Ok(ev)
            })
            .await?;
        if eviction.records > 0 {
            self.evicted_total
                .fetch_add(eviction.records, Ordering::Relaxed);
            events::record_evicted(eviction.records, eviction.bytes, "emergency storage cleanup");
        }
        Ok(eviction)
    }

    /// Records evicted since this queue was opened.
    pub fn evicted_total(&self) -> u64 {
        self.evicted_total.load(Ordering::Relaxed)
    }

    pub async fn stats(&self) -> RelayResult<QueueStats> {
        self.read(stats::queue_stats).await
    }

    // --- bulk artifacts ---

    pub async fn enqueue_artifact(
        &self,
        artifact: NewBulkArtifact,
        max_queue: u64,
    ) -> RelayResult<ArtifactInsert> {
        let now = Utc::now();
        let inserted = self
            .write(|conn| artifact_ops::insert_artifact(conn, &artifact, max_queue, now))
            .await?;
        if let Some(evicted) = inserted.evicted {
            tracing::warn!(
                artifact_id = evicted,
                max_queue = max_queue,
                "bulk: upload queue full, evicted oldest non-priority artifact"
            );
        }
        Ok(inserted)
    }

    pub async fn claim_artifact(&self, now: DateTime<Utc>) -> RelayResult<Option<BulkArtifact>> {
        self.write(|conn| artifact_ops::claim_next(conn, now)).await
    }

    pub async fn complete_artifact(&self, id: i64) -> RelayResult<()> {
        self.write(|conn| artifact_ops::complete(conn, id)).await
    }

    pub async fn artifact_failed(
        &self,
        id: i64,
        error: &str,
        permanent: bool,
        max_attempts: u32,
        retry_after: Duration,
        now: DateTime<Utc>,
    ) -> RelayResult<ArtifactStatus> {
        self.write(|conn| {
            artifact_ops::record_failure(conn, id, error, permanent, max_attempts, retry_after, now)
        })
        .await
    }

    pub async fn release_artifact(&self, id: i64) -> RelayResult<()> {
        self.write(|conn| artifact_ops::release(conn, id)).await
    }

    pub async fn get_artifact(&self, id: i64) -> RelayResult<Option<BulkArtifact>> {
        self.read(|conn| artifact_ops::get_artifact(conn, id)).await
    }

    pub async fn failed_artifacts(&self, limit: usize) -> RelayResult<Vec<BulkArtifact>> {
        self.read(|conn| artifact_ops::list_failed(conn, limit)).await
    }

    pub async fn artifact_stats(&self) -> RelayResult<ArtifactQueueStats> {
        self.read(stats::artifact_stats).await
    }

    // --- maintenance ---

    pub async fn integrity_check(&self) -> RelayResult<bool> {
        self.write(recovery::check_integrity).await
    }

    /// Fold the WAL into the main file. Called on shutdown.
    pub async fn checkpoint(&self) -> RelayResult<()> {
        self.write(maintenance::wal_checkpoint).await
    }

    pub async fn backup_to(&self, path: &Path) -> RelayResult<()> {
        self.write(|conn| recovery::create_backup(conn, path)).await
    }

    pub async fn restore_from(&self, path: &Path) -> RelayResult<()> {
        let result = self
            .pool
            .writer
            .with_conn_mut(|conn| recovery::restore_from_backup(conn, path))
            .await;
        self.track(&result);
        result
    }

    pub async fn storage_health(&self) -> RelayResult<StorageHealthReport> {
        self.read(maintenance::storage_health).await
    }
}

#[async_trait]
impl RecoveryJournal for DurableQueue {
    async fn append(&self, event: &RecoveryEvent) -> RelayResult<()> {
        self.write(|conn| recovery_log_ops::append_event(conn, event))
            .await
            .map(|_| ())
    }

    async fn recent(&self, limit: usize) -> RelayResult<Vec<RecoveryEvent>> {
        self.read(|conn| recovery_log_ops::recent_events(conn, limit))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::errors::{RelayError, StorageError};

    #[test]
    fn storage_failures_escalate_and_reset() {
        let queue = DurableQueue::open_in_memory(QueueConfig::default()).unwrap();
        let failure: RelayResult<()> = Err(RelayError::StorageError(StorageError::Unwritable {
            reason: "read-only filesystem".into(),
        }));

        for _ in 0..FATAL_STORAGE_FAILURES - 1 {
            queue.track(&failure);
        }
        assert!(!queue.is_fatal());
        queue.track(&failure);
        assert!(queue.is_fatal());

        queue.track(&Ok(()));
        assert!(!queue.is_fatal());
        assert_eq!(queue.consecutive_storage_failures(), 0);
    }

    #[test]
    fn non_storage_errors_do_not_count() {
        let queue = DurableQueue::open_in_memory(QueueConfig::default()).unwrap();
        let err: RelayResult<()> = Err(RelayError::ConfigError("x".into()));
        for _ in 0..10 {
            queue.track(&err);
        }
        assert!(!queue.is_fatal());
    }
}

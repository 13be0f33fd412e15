use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use relay_core::config::BulkConfig;
use relay_core::errors::{ErrorClass, RelayError, RelayResult};
use relay_core::models::{ArtifactCategory, ArtifactStatus, BulkArtifact, NewBulkArtifact};
use relay_core::schedule::{run_periodic, CancellationToken};
use relay_core::traits::ObjectStore;
use relay_observability::events;
use relay_storage::DurableQueue;

use super::keys::destination_key;
use crate::connection::exponential_delay;

/// What happened to the artifact picked by one upload step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded { id: i64, bytes: u64 },
    /// Rescheduled after `retry_in`.
    Retrying {
        id: i64,
        attempts: u32,
        retry_in: Duration,
    },
    /// Attempt cap reached or permanent error. The file stays on disk.
    Failed { id: i64, attempts: u32 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkStats {
    pub uploaded: u64,
    pub uploaded_by_category: BTreeMap<String, u64>,
    pub failed: u64,
    pub retries: u64,
    pub bytes_uploaded: u64,
    pub queue_depth: u64,
}

/// Uploads queued artifacts one at a time with a bounded retry policy.
pub struct BulkUploader {
    queue: Arc<DurableQueue>,
    store: Arc<dyn ObjectStore>,
    config: BulkConfig,
    site_id: String,
    reachability: Option<watch::Receiver<bool>>,
    uploaded: AtomicU64,
    failed: AtomicU64,
    retries: AtomicU64,
    bytes_uploaded: AtomicU64,
    by_category: DashMap<ArtifactCategory, u64>,
}

impl BulkUploader {
    pub fn new(
        queue: Arc<DurableQueue>,
        store: Arc<dyn ObjectStore>,
        config: BulkConfig,
        site_id: impl Into<String>,
    ) -> Self {
        Self {
            queue,
            store,
            config,
            site_id: site_id.into(),
            reachability: None,
            uploaded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            bytes_uploaded: AtomicU64::new(0),
            by_category: DashMap::new(),
        }
    }

    /// Pause uploads while the network is down.
    pub fn with_reachability(mut self, rx: watch::Receiver<bool>) -> Self {
        self.reachability = Some(rx);
        self
    }

    fn is_reachable(&self) -> bool {
        self.reachability.as_ref().map_or(true, |rx| *rx.borrow())
    }

    /// Destination key for a file produced today.
    pub fn key_for(&self, path: &Path, category: ArtifactCategory) -> String {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "artifact".to_string());
        destination_key(&self.site_id, Utc::now().date_naive(), category, &file_name)
    }

    /// Queue an artifact. An empty destination key is derived from the
    /// site, today's date, and the category.
    pub async fn enqueue(&self, mut artifact: NewBulkArtifact) -> RelayResult<i64> {
        if artifact.destination_key.is_empty() {
            artifact.destination_key = self.key_for(&artifact.path, artifact.category);
        }
        let inserted = self
            .queue
            .enqueue_artifact(artifact, self.config.max_queue)
            .await?;
        Ok(inserted.id)
    }

    /// Upload the next due artifact, if any.
    pub async fn upload_next(&self) -> RelayResult<Option<UploadOutcome>> {
        if !self.is_reachable() {
            return Ok(None);
        }
        let Some(artifact) = self.queue.claim_artifact(Utc::now()).await? else {
            return Ok(None);
        };
        self.upload(artifact).await.map(Some)
    }

    /// The outcome could not be recorded. Put the artifact back so it is
    /// claimed again rather than stranded in flight.
    async fn abandon(&self, artifact: &BulkArtifact, error: RelayError) -> RelayError {
        if let Err(release_err) = self.queue.release_artifact(artifact.id).await {
            tracing::error!(
                artifact_id = artifact.id,
                error = %error,
                release_error = %release_err,
                "bulk: could not settle or release artifact"
            );
        } else {
            tracing::warn!(
                artifact_id = artifact.id,
                error = %error,
                "bulk: could not settle artifact, handed back"
            );
        }
        error
    }

    async fn upload(&self, artifact: BulkArtifact) -> RelayResult<UploadOutcome> {
        let result = self
            .store
            .put_file(
                &artifact.destination_key,
                &artifact.path,
                &artifact.content_type,
            )
            .await;

        match result {
            Ok(bytes) => {
                if let Err(e) = self.queue.complete_artifact(artifact.id).await {
                    return Err(self.abandon(&artifact, e).await);
                }
                self.uploaded.fetch_add(1, Ordering::Relaxed);
                self.bytes_uploaded.fetch_add(bytes, Ordering::Relaxed);
                *self.by_category.entry(artifact.category).or_insert(0) += 1;
                tracing::info!(
                    artifact_id = artifact.id,
                    key = %artifact.destination_key,
                    bytes,
                    store = self.store.name(),
                    "bulk: uploaded"
                );
                Ok(UploadOutcome::Uploaded {
                    id: artifact.id,
                    bytes,
                })
            }
            Err(e) => {
                let permanent = e.class() == ErrorClass::Permanent;
                let retry_in = exponential_delay(
                    Duration::from_secs(self.config.backoff_base_secs),
                    Duration::from_secs(self.config.backoff_cap_secs),
                    artifact.attempts,
                );
                let retry_after = chrono::Duration::from_std(retry_in)
                    .unwrap_or_else(|_| chrono::Duration::seconds(self.config.backoff_cap_secs as i64));
                let error = e.to_string();
                let status = match self
                    .queue
                    .artifact_failed(
                        artifact.id,
                        &error,
                        permanent,
                        self.config.max_attempts,
                        retry_after,
                        Utc::now(),
                    )
                    .await
                {
                    Ok(status) => status,
                    Err(settle) => return Err(self.abandon(&artifact, settle).await),
                };
                let attempts = artifact.attempts + 1;

                if status == ArtifactStatus::Failed {
                    self.failed.fetch_add(1, Ordering::Relaxed);
                    events::artifact_failed(artifact.id, &artifact.destination_key, attempts, &error);
                    Ok(UploadOutcome::Failed {
                        id: artifact.id,
                        attempts,
                    })
                } else {
                    self.retries.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        artifact_id = artifact.id,
                        attempts,
                        retry_in_secs = retry_in.as_secs(),
                        error = %error,
                        "bulk: upload failed, will retry"
                    );
                    Ok(UploadOutcome::Retrying {
                        id: artifact.id,
                        attempts,
                        retry_in,
                    })
                }
            }
        }
    }

    /// Upload everything currently due. Returns the number of steps taken.
    pub async fn drain(&self, cancel: &CancellationToken) -> usize {
        let mut steps = 0;
        while !cancel.is_cancelled() {
            match self.upload_next().await {
                Ok(Some(_)) => steps += 1,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "bulk: upload step failed");
                    break;
                }
            }
        }
        steps
    }

    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let period = Duration::from_secs(self.config.poll_interval_secs);
        let token = cancel.clone();
        run_periodic("bulk_uploader", period, cancel, move || {
            let this = self.clone();
            let token = token.clone();
            async move {
                this.drain(&token).await;
            }
        })
        .await;
    }

    pub async fn stats(&self) -> BulkStats {
        let queue_depth = match self.queue.artifact_stats().await {
            Ok(s) => s.pending + s.in_flight,
            Err(e) => {
                tracing::debug!(error = %e, "bulk: queue stats unavailable");
                0
            }
        };
        BulkStats {
            uploaded: self.uploaded.load(Ordering::Relaxed),
            uploaded_by_category: self
                .by_category
                .iter()
                .map(|e| (e.key().as_str().to_string(), *e.value()))
                .collect(),
            failed: self.failed.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            bytes_uploaded: self.bytes_uploaded.load(Ordering::Relaxed),
            queue_depth,
        }
    }
}

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use relay_cloud::bulk::UploadOutcome;
use relay_cloud::{BulkUploader, FilesystemStore};
use relay_core::config::{BulkConfig, QueueConfig};
use relay_core::errors::{BulkError, RelayResult};
use relay_core::models::{ArtifactCategory, ArtifactStatus, NewBulkArtifact};
use relay_core::traits::ObjectStore;
use relay_storage::DurableQueue;

/// Fails the first `failures` uploads, then delegates to the filesystem.
struct FlakyStore {
    failures: AtomicU32,
    inner: FilesystemStore,
}

#[async_trait]
impl ObjectStore for FlakyStore {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn put_file(&self, key: &str, source: &Path, content_type: &str) -> RelayResult<u64> {
        let left = self.failures.load(Ordering::SeqCst);
        if left > 0 {
            self.failures.store(left - 1, Ordering::SeqCst);
            return Err(BulkError::UploadFailed {
                key: key.to_string(),
                reason: "connection reset".into(),
            }
            .into());
        }
        self.inner.put_file(key, source, content_type).await
    }
}

fn config() -> BulkConfig {
    BulkConfig {
        max_attempts: 4,
        // Zero delay so retries are due immediately.
        backoff_base_secs: 0,
        backoff_cap_secs: 0,
        max_queue: 10,
        ..BulkConfig::default()
    }
}

fn write_file(dir: &Path, name: &str, len: usize) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, vec![1u8; len]).unwrap();
    path
}

fn queue() -> Arc<DurableQueue> {
    Arc::new(DurableQueue::open_in_memory(QueueConfig::default()).unwrap())
}

#[tokio::test]
async fn artifact_lands_under_its_key() {
    let src = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    let file = write_file(src.path(), "frame.jpg", 4096);
    let uploader = BulkUploader::new(
        queue(),
        Arc::new(FilesystemStore::new(dest.path())),
        config(),
        "site-1",
    );

    uploader
        .enqueue(NewBulkArtifact::new(&file, "site-1/2024-05-01/visual/frame.jpg"))
        .await
        .unwrap();
    let outcome = uploader.upload_next().await.unwrap().unwrap();

    assert!(matches!(outcome, UploadOutcome::Uploaded { bytes: 4096, .. }));
    assert!(dest.path().join("site-1/2024-05-01/visual/frame.jpg").exists());
    assert!(uploader.upload_next().await.unwrap().is_none());

    let stats = uploader.stats().await;
    assert_eq!(stats.uploaded, 1);
    assert_eq!(stats.uploaded_by_category.get("visual"), Some(&1));
    assert_eq!(stats.bytes_uploaded, 4096);
    assert_eq!(stats.queue_depth, 0);
    // The source file belongs to the producer and is left alone.
    assert!(file.exists());
}

#[tokio::test]
async fn empty_key_is_derived_from_site_date_and_category() {
    let src = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    let file = write_file(src.path(), "clip.mp4", 10);
    let q = queue();
    let uploader = BulkUploader::new(
        q.clone(),
        Arc::new(FilesystemStore::new(dest.path())),
        config(),
        "site-9",
    );

    let id = uploader.enqueue(NewBulkArtifact::new(&file, "")).await.unwrap();
    let artifact = q.get_artifact(id).await.unwrap().unwrap();
    let today = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();
    assert_eq!(artifact.destination_key, format!("site-9/{today}/videos/clip.mp4"));
    assert_eq!(artifact.category, ArtifactCategory::Videos);
}

#[tokio::test]
async fn transient_failures_retry_then_succeed() {
    let src = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    let file = write_file(src.path(), "t.json", 64);
    let store = FlakyStore {
        failures: AtomicU32::new(2),
        inner: FilesystemStore::new(dest.path()),
    };
    let uploader = BulkUploader::new(queue(), Arc::new(store), config(), "s");
    uploader
        .enqueue(NewBulkArtifact::new(&file, "s/2024-01-01/telemetry/t.json"))
        .await
        .unwrap();

    assert!(matches!(
        uploader.upload_next().await.unwrap(),
        Some(UploadOutcome::Retrying { attempts: 1, .. })
    ));
    assert!(matches!(
        uploader.upload_next().await.unwrap(),
        Some(UploadOutcome::Retrying { attempts: 2, .. })
    ));
    assert!(matches!(
        uploader.upload_next().await.unwrap(),
        Some(UploadOutcome::Uploaded { bytes: 64, .. })
    ));

    let stats = uploader.stats().await;
    assert_eq!(stats.retries, 2);
    assert_eq!(stats.uploaded, 1);
    assert_eq!(stats.failed, 0);
}

#[tokio::test]
async fn exhausting_attempts_marks_failed_without_deleting_the_file() {
    let src = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    let file = write_file(src.path(), "v.mp4", 128);
    let store = FlakyStore {
        failures: AtomicU32::new(100),
        inner: FilesystemStore::new(dest.path()),
    };
    let q = queue();
    let uploader = BulkUploader::new(q.clone(), Arc::new(store), config(), "s");
    let id = uploader
        .enqueue(NewBulkArtifact::new(&file, "s/2024-01-01/videos/v.mp4"))
        .await
        .unwrap();

    let mut last = None;
    while let Some(outcome) = uploader.upload_next().await.unwrap() {
        last = Some(outcome);
    }
    assert_eq!(last, Some(UploadOutcome::Failed { id, attempts: 4 }));

    let artifact = q.get_artifact(id).await.unwrap().unwrap();
    assert_eq!(artifact.status, ArtifactStatus::Failed);
    assert!(file.exists());
    assert!(!dest.path().join("s/2024-01-01/videos/v.mp4").exists());

    let stats = uploader.stats().await;
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.retries, 3);
}

#[tokio::test]
async fn missing_source_fails_immediately() {
    let dest = tempfile::tempdir().unwrap();
    let uploader = BulkUploader::new(
        queue(),
        Arc::new(FilesystemStore::new(dest.path())),
        config(),
        "s",
    );
    let id = uploader
        .enqueue(NewBulkArtifact::new("/nonexistent/gone.jpg", "s/d/visual/gone.jpg"))
        .await
        .unwrap();

    assert_eq!(
        uploader.upload_next().await.unwrap(),
        Some(UploadOutcome::Failed { id, attempts: 1 })
    );
}

#[tokio::test]
async fn priority_artifacts_upload_first() {
    let src = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    let normal = write_file(src.path(), "a.jpg", 1);
    let urgent = write_file(src.path(), "b.jpg", 1);
    let uploader = BulkUploader::new(
        queue(),
        Arc::new(FilesystemStore::new(dest.path())),
        config(),
        "s",
    );
    uploader
        .enqueue(NewBulkArtifact::new(&normal, "s/d/visual/a.jpg"))
        .await
        .unwrap();
    let urgent_id = uploader
        .enqueue(NewBulkArtifact::new(&urgent, "s/d/visual/b.jpg").with_priority(true))
        .await
        .unwrap();

    match uploader.upload_next().await.unwrap() {
        Some(UploadOutcome::Uploaded { id, .. }) => assert_eq!(id, urgent_id),
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn uploads_pause_while_offline() {
    let src = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    let file = write_file(src.path(), "a.jpg", 1);
    let (tx, rx) = watch::channel(false);
    let uploader = BulkUploader::new(
        queue(),
        Arc::new(FilesystemStore::new(dest.path())),
        config(),
        "s",
    )
    .with_reachability(rx);
    uploader
        .enqueue(NewBulkArtifact::new(&file, "s/d/visual/a.jpg"))
        .await
        .unwrap();

    assert!(uploader.upload_next().await.unwrap().is_none());
    assert_eq!(uploader.stats().await.queue_depth, 1);

    tx.send_replace(true);
    assert!(matches!(
        uploader.upload_next().await.unwrap(),
        Some(UploadOutcome::Uploaded { .. })
    ));
}

#[test]
fn retry_delay_shape_matches_connection_backoff() {
    let delay = relay_cloud::connection::exponential_delay;
    let base = Duration::from_secs(1);
    let cap = Duration::from_secs(32);
    let got: Vec<u64> = (0..4).map(|a| delay(base, cap, a).as_secs()).collect();
    assert_eq!(got, vec![1, 2, 4, 8]);
}

#[tokio::test]
async fn artifact_is_reclaimable_when_completion_cannot_be_recorded() {
    let src = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    let db = src.path().join("queue.db");
    let queue = Arc::new(DurableQueue::open(&db, QueueConfig::default()).unwrap());
    let file = write_file(src.path(), "clip.mp4", 2048);
    let uploader = BulkUploader::new(
        queue.clone(),
        Arc::new(FilesystemStore::new(dest.path())),
        config(),
        "site-1",
    );
    uploader
        .enqueue(NewBulkArtifact::new(&file, "site-1/2024-05-01/video/clip.mp4"))
        .await
        .unwrap();

    let guard = rusqlite::Connection::open(&db).unwrap();
    guard
        .execute_batch(
            "CREATE TRIGGER block_complete BEFORE DELETE ON bulk_artifacts
             BEGIN SELECT RAISE(ABORT, 'disk I/O error'); END;",
        )
        .unwrap();
    assert!(uploader.upload_next().await.is_err());
    let stats = queue.artifact_stats().await.unwrap();
    assert_eq!(stats.in_flight, 0);
    assert_eq!(stats.pending, 1);

    guard.execute_batch("DROP TRIGGER block_complete;").unwrap();
    let outcome = uploader.upload_next().await.unwrap().unwrap();
    assert!(matches!(outcome, UploadOutcome::Uploaded { bytes: 2048, .. }));
    assert_eq!(queue.artifact_stats().await.unwrap().pending, 0);
}

//! Emergency storage cleanup: the disk-space recovery action.
//!
//! Bulk artifact files go first, oldest-first across all media roots. Pending
//! telemetry is only evicted when deleting files could not free enough.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;

use relay_core::config::{RecoveryConfig, StorageConfig};
use relay_core::constants::CLEANUP_BUFFER_RATIO;
use relay_core::errors::RelayResult;
use relay_core::models::CleanupReport;
use relay_core::traits::StorageCleanup;
use relay_observability::events;
use relay_observability::health::DiskProbe;
use relay_storage::DurableQueue;

#[derive(Debug, Clone)]
struct MediaFile {
    path: PathBuf,
    modified: SystemTime,
    len: u64,
}

pub struct EmergencyCleanup {
    roots: Vec<PathBuf>,
    target_free_bytes: u64,
    bulk_fraction: f64,
    telemetry_fraction: f64,
    queue: Arc<DurableQueue>,
    disk_path: PathBuf,
}

impl EmergencyCleanup {
    pub fn new(
        storage: &StorageConfig,
        recovery: &RecoveryConfig,
        queue: Arc<DurableQueue>,
        disk_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            roots: storage.media_roots.iter().map(PathBuf::from).collect(),
            target_free_bytes: storage.emergency_target_free_bytes,
            bulk_fraction: recovery.bulk_cleanup_fraction,
            telemetry_fraction: recovery.telemetry_cleanup_fraction,
            queue,
            disk_path: disk_path.into(),
        }
    }

    /// Free at least `needed` bytes if the policy allows it.
    pub async fn reclaim(&self, needed: u64) -> RelayResult<CleanupReport> {
        let goal = needed + (needed as f64 * CLEANUP_BUFFER_RATIO).ceil() as u64;
        let roots = self.roots.clone();
        let skip = self.queue.db_path().map(Path::to_path_buf);
        let fraction = self.bulk_fraction;

        let (files_deleted, bytes_from_files) =
            tokio::task::spawn_blocking(move || delete_oldest(&roots, skip.as_deref(), goal, fraction))
                .await
                .unwrap_or_else(|e| {
                    tracing::error!(error = %e, "cleanup: file pass panicked");
                    (0, 0)
                });

        let mut report = CleanupReport {
            files_deleted,
            bytes_from_files,
            ..CleanupReport::default()
        };

        if bytes_from_files < needed {
            let eviction = self.queue.evict_oldest_pending(self.telemetry_fraction).await?;
            report.records_evicted = eviction.records;
            report.bytes_from_records = eviction.bytes;
        }

        events::emergency_cleanup(
            report.files_deleted,
            report.bytes_from_files,
            report.records_evicted,
        );
        Ok(report)
    }
}

#[async_trait]
impl StorageCleanup for EmergencyCleanup {
    async fn free_bytes(&self, target: u64) -> RelayResult<u64> {
        Ok(self.reclaim(target).await?.bytes_freed())
    }

    async fn emergency_cleanup(&self) -> RelayResult<CleanupReport> {
        let disk_path = self.disk_path.clone();
        let target = self.target_free_bytes;
        let needed = tokio::task::spawn_blocking(move || shortfall(&disk_path, target))
            .await
            .unwrap_or(target);
        if needed == 0 {
            tracing::info!("cleanup: free space already above target");
            return Ok(CleanupReport::default());
        }
        self.reclaim(needed).await
    }
}

/// Bytes still missing to reach `target` free bytes on the disk holding `path`.
fn shortfall(path: &Path, target: u64) -> u64 {
    match DiskProbe::space_at(path) {
        Some((available, _)) => target.saturating_sub(available),
        None => target,
    }
}

/// `ceil(n * fraction)`, rounded first so `10 * 0.3` is 3.
fn share_of(n: usize, fraction: f64) -> usize {
    ((n as f64 * fraction * 1e9).round() / 1e9).ceil() as usize
}

fn collect_files(root: &Path, out: &mut Vec<MediaFile>) {
    let Ok(entries) = std::fs::read_dir(root) else {
        return;
    };
    for entry in entries.flatten() {
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if meta.is_dir() {
            collect_files(&entry.path(), out);
        } else if meta.is_file() {
            out.push(MediaFile {
                path: entry.path(),
                modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                len: meta.len(),
            });
        }
    }
}

/// Delete oldest files until `goal` bytes are gone or `fraction` of the
/// files has been removed. Returns (files, bytes).
fn delete_oldest(roots: &[PathBuf], skip: Option<&Path>, goal: u64, fraction: f64) -> (u64, u64) {
    let mut files = Vec::new();
    for root in roots {
        collect_files(root, &mut files);
    }
    if let Some(skip) = skip {
        let skip = skip.to_string_lossy().into_owned();
        files.retain(|f| !f.path.to_string_lossy().starts_with(&skip));
    }
    files.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)));

    let limit = share_of(files.len(), fraction);
    let mut deleted = 0u64;
    let mut freed = 0u64;
    for file in files.iter().take(limit) {
        if freed >= goal {
            break;
        }
        match std::fs::remove_file(&file.path) {
            Ok(()) => {
                deleted += 1;
                freed += file.len;
                tracing::debug!(path = %file.path.display(), bytes = file.len, "cleanup: deleted");
            }
            Err(e) => {
                tracing::warn!(path = %file.path.display(), error = %e, "cleanup: delete failed");
            }
        }
    }
    (deleted, freed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_rounds_up_without_float_drift() {
        assert_eq!(share_of(10, 0.5), 5);
        assert_eq!(share_of(10, 0.3), 3);
        assert_eq!(share_of(3, 0.5), 2);
        assert_eq!(share_of(0, 0.5), 0);
    }
}

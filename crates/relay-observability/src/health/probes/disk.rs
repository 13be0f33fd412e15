use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sysinfo::Disks;

use relay_core::models::{ProbeResult, RecoveryKind};
use relay_core::traits::HealthCheckable;

/// Free space at the mount holding the queue and media files. Falling below
/// the floor triggers emergency storage cleanup.
pub struct DiskProbe {
    path: PathBuf,
    min_free_bytes: u64,
}

impl DiskProbe {
    pub fn new(path: impl Into<PathBuf>, min_free_bytes: u64) -> Self {
        Self {
            path: path.into(),
            min_free_bytes,
        }
    }

    /// `(available, total)` bytes of the mount containing `path`.
    pub fn space_at(path: &Path) -> Option<(u64, u64)> {
        let disks = Disks::new_with_refreshed_list();
        let mounts: Vec<(PathBuf, u64, u64)> = disks
            .list()
            .iter()
            .map(|d| (d.mount_point().to_path_buf(), d.available_space(), d.total_space()))
            .collect();
        select_mount(&mounts, path)
    }
}

/// The longest mount point that is a prefix of `path`.
fn select_mount(mounts: &[(PathBuf, u64, u64)], path: &Path) -> Option<(u64, u64)> {
    mounts
        .iter()
        .filter(|(mount, _, _)| path.starts_with(mount))
        .max_by_key(|(mount, _, _)| mount.components().count())
        .map(|(_, available, total)| (*available, *total))
}

#[async_trait]
impl HealthCheckable for DiskProbe {
    fn name(&self) -> &str {
        "disk"
    }

    fn recovery_kind(&self) -> RecoveryKind {
        RecoveryKind::DiskSpace
    }

    async fn probe(&self) -> ProbeResult {
        let path = self.path.clone();
        let space = match tokio::task::spawn_blocking(move || Self::space_at(&path)).await {
            Ok(space) => space,
            Err(e) => return ProbeResult::unhealthy(format!("disk query failed: {e}")),
        };
        match space {
            Some((available, _)) if available < self.min_free_bytes => ProbeResult::unhealthy(
                format!("{available} bytes free, floor is {}", self.min_free_bytes),
            ),
            Some((available, _)) => ProbeResult::healthy_with(format!("{available} bytes free")),
            None => ProbeResult::healthy_with(format!(
                "no mounted disk found for {}",
                self.path.display()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_the_most_specific_mount() {
        let mounts = vec![
            (PathBuf::from("/"), 10, 100),
            (PathBuf::from("/data"), 20, 200),
            (PathBuf::from("/data/media"), 30, 300),
        ];
        assert_eq!(select_mount(&mounts, Path::new("/data/queue.db")), Some((20, 200)));
        assert_eq!(select_mount(&mounts, Path::new("/data/media/a.jpg")), Some((30, 300)));
        assert_eq!(select_mount(&mounts, Path::new("/var/log")), Some((10, 100)));
        assert_eq!(select_mount(&mounts[1..], Path::new("/var")), None);
    }

    #[test]
    fn mount_prefix_matches_whole_components() {
        let mounts = vec![(PathBuf::from("/"), 1, 1), (PathBuf::from("/dat"), 2, 2)];
        assert_eq!(select_mount(&mounts, Path::new("/data")), Some((1, 1)));
    }
}

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use relay_core::constants::PARTIAL_SUFFIX;
use relay_core::errors::{BulkError, RelayResult};
use relay_core::traits::ObjectStore;

use super::keys::validate_key;

/// Object store backed by a mounted directory.
///
/// Uploads are copied to `<key>.partial` and renamed into place, so a
/// reader never sees a half-written object.
#[derive(Debug, Clone)]
pub struct FilesystemStore {
    root: PathBuf,
}

impl FilesystemStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

fn upload_failed(key: &str, e: impl std::fmt::Display) -> BulkError {
    BulkError::UploadFailed {
        key: key.to_string(),
        reason: e.to_string(),
    }
}

#[async_trait]
impl ObjectStore for FilesystemStore {
    fn name(&self) -> &str {
        "filesystem"
    }

    async fn put_file(&self, key: &str, source: &Path, _content_type: &str) -> RelayResult<u64> {
        validate_key(key)?;
        if !tokio::fs::try_exists(source).await.unwrap_or(false) {
            return Err(BulkError::SourceMissing {
                path: source.display().to_string(),
            }
            .into());
        }

        let dest = self.object_path(key);
        let mut partial = dest.clone().into_os_string();
        partial.push(PARTIAL_SUFFIX);
        let partial = PathBuf::from(partial);

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| upload_failed(key, e))?;
        }

        let copied = match tokio::fs::copy(source, &partial).await {
            Ok(n) => n,
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(upload_failed(key, e).into());
            }
        };
        if let Err(e) = tokio::fs::rename(&partial, &dest).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(upload_failed(key, e).into());
        }
        Ok(copied)
    }
}

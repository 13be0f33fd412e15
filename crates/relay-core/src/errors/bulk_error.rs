/// Bulk artifact upload errors.
#[derive(Debug, thiserror::Error)]
pub enum BulkError {
    #[error("upload of {key} failed: {reason}")]
    UploadFailed { key: String, reason: String },

    #[error("artifact source missing: {path}")]
    SourceMissing { path: String },
}

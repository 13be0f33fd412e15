/// Storage-layer errors for the SQLite queue file.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    SqliteError { message: String },

    #[error("migration failed at version {version}: {reason}")]
    MigrationFailed { version: u32, reason: String },

    #[error("database corruption detected: {details}")]
    CorruptionDetected { details: String },

    #[error("queue medium unwritable: {reason}")]
    Unwritable { reason: String },

    #[error("record {id} not found")]
    RecordNotFound { id: i64 },
}

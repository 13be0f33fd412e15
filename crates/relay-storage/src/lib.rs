//! # relay-storage
//!
//! The DurableQueue: an on-disk, crash-safe SQLite store for telemetry
//! records awaiting delivery, the bulk artifact upload queue, and the
//! recovery audit log. WAL mode, one serialized writer, a small read pool,
//! and `PRAGMA user_version` migrations.

pub mod engine;
pub mod migrations;
pub mod pool;
pub mod queries;
pub mod recovery;

pub use engine::DurableQueue;

use relay_core::errors::{RelayError, StorageError};
use rusqlite::ErrorCode;

/// Wrap a message as a generic SQLite storage error.
pub fn to_storage_err(message: String) -> RelayError {
    StorageError::SqliteError { message }.into()
}

/// Classify a rusqlite error: an unwritable medium and corruption get their
/// own variants so callers can tell them apart from transient contention.
pub fn sqlite_err(e: rusqlite::Error) -> RelayError {
    match e.sqlite_error_code() {
        Some(
            ErrorCode::ReadOnly
            | ErrorCode::DiskFull
            | ErrorCode::CannotOpen
            | ErrorCode::SystemIoFailure
            | ErrorCode::PermissionDenied,
        ) => StorageError::Unwritable {
            reason: e.to_string(),
        }
        .into(),
        Some(ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase) => {
            StorageError::CorruptionDetected {
                details: e.to_string(),
            }
            .into()
        }
        _ => to_storage_err(e.to_string()),
    }
}

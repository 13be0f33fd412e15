//! Schema migrations using PRAGMA user_version.

pub mod v001_telemetry_records;
pub mod v002_bulk_artifacts;
pub mod v003_recovery_events;

use rusqlite::Connection;

use relay_core::errors::{RelayError, RelayResult, StorageError};

type Migration = fn(&Connection) -> RelayResult<()>;

const MIGRATIONS: &[(u32, Migration)] = &[
    (1, v001_telemetry_records::migrate),
    (2, v002_bulk_artifacts::migrate),
    (3, v003_recovery_events::migrate),
];

/// Latest schema version this build knows about.
pub const LATEST_VERSION: u32 = 3;

/// Run all pending migrations, each in its own transaction.
/// Returns the number applied.
pub fn run_migrations(conn: &Connection) -> RelayResult<usize> {
    let current = current_version(conn)?;
    let mut applied = 0;

    for (version, migrate) in MIGRATIONS {
        if current >= *version {
            continue;
        }
        let fail = |e: String| -> RelayError {
            StorageError::MigrationFailed {
                version: *version,
                reason: e,
            }
            .into()
        };

        let tx = conn.unchecked_transaction().map_err(|e| fail(e.to_string()))?;
        migrate(&tx).map_err(|e| fail(e.to_string()))?;
        tx.pragma_update(None, "user_version", version)
            .map_err(|e| fail(e.to_string()))?;
        tx.commit().map_err(|e| fail(e.to_string()))?;

        tracing::info!(version = version, "applied migration");
        applied += 1;
    }

    Ok(applied)
}

/// Get the current schema version.
pub fn current_version(conn: &Connection) -> RelayResult<u32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| {
            StorageError::SqliteError {
                message: e.to_string(),
            }
            .into()
        })
}

//! Attempt WAL checkpoint recovery after an unclean shutdown.

use rusqlite::Connection;

use relay_core::errors::RelayResult;

/// Force a WAL checkpoint. Returns false (and logs) if it fails.
pub fn attempt_wal_recovery(conn: &Connection) -> RelayResult<bool> {
    match conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE)") {
        Ok(()) => Ok(true),
        Err(e) => {
            tracing::warn!("WAL checkpoint recovery failed: {e}");
            Ok(false)
        }
    }
}

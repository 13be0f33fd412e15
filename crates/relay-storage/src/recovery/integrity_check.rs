//! PRAGMA integrity_check, detect corruption early.

use rusqlite::Connection;

use relay_core::errors::RelayResult;

use crate::queries::maintenance;

/// Run integrity check. Returns true if the queue file is healthy.
pub fn check_integrity(conn: &Connection) -> RelayResult<bool> {
    maintenance::integrity_check(conn)
}

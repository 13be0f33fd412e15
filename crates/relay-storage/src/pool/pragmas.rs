//! PRAGMA configuration applied to every SQLite connection.
//!
//! WAL mode, FULL sync on the writer (the queue must survive power loss),
//! 5s busy_timeout, incremental auto_vacuum so evicted payloads give
//! space back to the disk.

use rusqlite::Connection;

use relay_core::errors::RelayResult;

use crate::sqlite_err;

/// Apply durability and space pragmas to the write connection.
///
/// `auto_vacuum` only takes effect on a fresh file, which is why this runs
/// before migrations create any table.
pub fn apply_pragmas(conn: &Connection) -> RelayResult<()> {
    conn.execute_batch(
        "
        PRAGMA auto_vacuum = INCREMENTAL;
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = FULL;
        PRAGMA cache_size = -8000;
        PRAGMA busy_timeout = 5000;
        PRAGMA foreign_keys = ON;
        ",
    )
    .map_err(sqlite_err)?;
    Ok(())
}

/// Pragmas for read-only pool connections.
pub fn apply_read_pragmas(conn: &Connection) -> RelayResult<()> {
    conn.execute_batch(
        "
        PRAGMA busy_timeout = 5000;
        PRAGMA query_only = ON;
        ",
    )
    .map_err(sqlite_err)?;
    Ok(())
}

/// Verify that WAL mode is active on a connection.
pub fn verify_wal_mode(conn: &Connection) -> RelayResult<bool> {
    let mode: String = conn
        .pragma_query_value(None, "journal_mode", |row| row.get(0))
        .map_err(sqlite_err)?;
    Ok(mode.eq_ignore_ascii_case("wal"))
}

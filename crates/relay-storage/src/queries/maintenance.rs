//! Checkpoint, integrity check, incremental vacuum, size report.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use relay_core::errors::RelayResult;

use crate::sqlite_err;

/// WAL checkpoint, truncating the WAL file.
pub fn wal_checkpoint(conn: &Connection) -> RelayResult<()> {
    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE)")
        .map_err(sqlite_err)?;
    Ok(())
}

/// Run integrity check. Returns true if database is OK.
pub fn integrity_check(conn: &Connection) -> RelayResult<bool> {
    let result: String = conn
        .query_row("PRAGMA integrity_check", [], |row| row.get(0))
        .map_err(sqlite_err)?;
    Ok(result == "ok")
}

/// Give freed pages back to the filesystem.
pub fn incremental_vacuum(conn: &Connection) -> RelayResult<()> {
    conn.execute_batch("PRAGMA incremental_vacuum")
        .map_err(sqlite_err)?;
    Ok(())
}

/// Size of the queue file as SQLite sees it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageHealthReport {
    pub page_count: u64,
    pub page_size: u64,
    pub freelist_count: u64,
    pub file_size_bytes: u64,
}

impl StorageHealthReport {
    /// Share of the file sitting in free pages.
    pub fn fragmentation_pct(&self) -> f64 {
        if self.page_count == 0 {
            return 0.0;
        }
        self.freelist_count as f64 / self.page_count as f64 * 100.0
    }
}

pub fn storage_health(conn: &Connection) -> RelayResult<StorageHealthReport> {
    let pragma = |name: &str| -> RelayResult<u64> {
        conn.pragma_query_value(None, name, |row| row.get::<_, i64>(0))
            .map(|v| v as u64)
            .map_err(sqlite_err)
    };
    let page_count = pragma("page_count")?;
    let page_size = pragma("page_size")?;
    Ok(StorageHealthReport {
        page_count,
        page_size,
        freelist_count: pragma("freelist_count")?,
        file_size_bytes: page_count * page_size,
    })
}

//! Online backup of the queue file, and restore from a backup.

use std::path::Path;
use std::time::Duration;

use rusqlite::backup::Backup;
use rusqlite::Connection;

use relay_core::errors::RelayResult;

use crate::to_storage_err;

/// Copy the live database to `backup_path`.
pub fn create_backup(conn: &Connection, backup_path: &Path) -> RelayResult<()> {
    let mut dst = Connection::open(backup_path)
        .map_err(|e| to_storage_err(format!("open backup dest: {e}")))?;

    let backup = Backup::new(conn, &mut dst)
        .map_err(|e| to_storage_err(format!("init backup: {e}")))?;

    backup
        .run_to_completion(100, Duration::from_millis(10), None)
        .map_err(|e| to_storage_err(format!("run backup: {e}")))?;

    Ok(())
}

/// Overwrite the live database with the contents of `backup_path`.
pub fn restore_from_backup(conn: &mut Connection, backup_path: &Path) -> RelayResult<()> {
    let src = Connection::open(backup_path)
        .map_err(|e| to_storage_err(format!("open backup source: {e}")))?;

    let backup = Backup::new(&src, conn)
        .map_err(|e| to_storage_err(format!("init restore: {e}")))?;

    backup
        .run_to_completion(100, Duration::from_millis(10), None)
        .map_err(|e| to_storage_err(format!("run restore: {e}")))?;

    Ok(())
}

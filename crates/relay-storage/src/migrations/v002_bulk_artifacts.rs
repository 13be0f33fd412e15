//! v002: bulk_artifacts, the upload queue for files.

use rusqlite::Connection;

use relay_core::errors::RelayResult;

use crate::sqlite_err;

pub fn migrate(conn: &Connection) -> RelayResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS bulk_artifacts (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            path            TEXT NOT NULL,
            destination_key TEXT NOT NULL,
            content_type    TEXT NOT NULL,
            category        TEXT NOT NULL,
            priority        INTEGER NOT NULL DEFAULT 0,
            status          TEXT NOT NULL DEFAULT 'pending',
            attempts        INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL,
            next_attempt_at TEXT,
            last_error      TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_artifacts_drain
            ON bulk_artifacts(status, priority DESC, created_at, id);
        ",
    )
    .map_err(sqlite_err)?;
    Ok(())
}

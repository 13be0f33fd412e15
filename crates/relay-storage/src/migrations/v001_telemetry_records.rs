//! v001: telemetry_records, the delivery queue.

use rusqlite::Connection;

use relay_core::errors::RelayResult;

use crate::sqlite_err;

pub fn migrate(conn: &Connection) -> RelayResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS telemetry_records (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            message_id      TEXT NOT NULL UNIQUE,
            topic           TEXT NOT NULL,
            priority        INTEGER NOT NULL DEFAULT 0,
            payload         BLOB NOT NULL,
            payload_size    INTEGER NOT NULL,
            status          TEXT NOT NULL DEFAULT 'pending',
            attempts        INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL,
            last_attempt_at TEXT,
            next_attempt_at TEXT,
            last_error      TEXT,
            updated_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_records_drain
            ON telemetry_records(status, priority DESC, created_at, id);
        CREATE INDEX IF NOT EXISTS idx_records_created ON telemetry_records(created_at);
        ",
    )
    .map_err(sqlite_err)?;
    Ok(())
}

//! v003: recovery_events, append-only audit log.

use rusqlite::Connection;

use relay_core::errors::RelayResult;

use crate::sqlite_err;

pub fn migrate(conn: &Connection) -> RelayResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS recovery_events (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            component   TEXT NOT NULL,
            action      TEXT NOT NULL,
            outcome     TEXT NOT NULL,
            detail      TEXT,
            timestamp   TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_recovery_component
            ON recovery_events(component, timestamp);

        CREATE TRIGGER IF NOT EXISTS recovery_events_no_update
        BEFORE UPDATE ON recovery_events
        BEGIN
            SELECT RAISE(ABORT, 'recovery_events is append-only');
        END;
        ",
    )
    .map_err(sqlite_err)?;
    Ok(())
}

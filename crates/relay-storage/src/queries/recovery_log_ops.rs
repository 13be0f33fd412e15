//! Append-only recovery audit log.

use rusqlite::{params, Connection, Row};

use relay_core::errors::RelayResult;
use relay_core::models::{RecoveryAction, RecoveryEvent, RecoveryOutcome};

use super::{conversion_err, fmt_ts, parse_ts};
use crate::sqlite_err;

fn row_to_event(row: &Row<'_>) -> rusqlite::Result<RecoveryEvent> {
    let action: String = row.get(1)?;
    let outcome: String = row.get(2)?;
    let timestamp: String = row.get(4)?;
    Ok(RecoveryEvent {
        component: row.get(0)?,
        action: RecoveryAction::parse(&action)
            .ok_or_else(|| conversion_err(format!("unknown recovery action {action}")))?,
        outcome: RecoveryOutcome::parse(&outcome)
            .ok_or_else(|| conversion_err(format!("unknown recovery outcome {outcome}")))?,
        detail: row.get(3)?,
        timestamp: parse_ts(&timestamp)?,
    })
}

pub fn append_event(conn: &Connection, event: &RecoveryEvent) -> RelayResult<i64> {
    conn.execute(
        "INSERT INTO recovery_events (component, action, outcome, detail, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            event.component,
            event.action.as_str(),
            event.outcome.as_str(),
            event.detail,
            fmt_ts(&event.timestamp),
        ],
    )
    .map_err(sqlite_err)?;
    Ok(conn.last_insert_rowid())
}

/// Most recent events, newest first.
pub fn recent_events(conn: &Connection, limit: usize) -> RelayResult<Vec<RecoveryEvent>> {
    let mut stmt = conn
        .prepare(
            "SELECT component, action, outcome, detail, timestamp FROM recovery_events
             ORDER BY id DESC LIMIT ?1",
        )
        .map_err(sqlite_err)?;
    let rows = stmt
        .query_map(params![limit as i64], row_to_event)
        .map_err(sqlite_err)?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(sqlite_err)
}

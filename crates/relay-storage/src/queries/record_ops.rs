//! Telemetry record lifecycle: insert, claim, settle, prune.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use relay_core::errors::{RelayResult, StorageError};
use relay_core::models::{NewTelemetryRecord, Priority, RecordStatus, TelemetryRecord, Topic};

use super::{conversion_err, fmt_ts, parse_opt_ts, parse_ts};
use crate::sqlite_err;

const RECORD_COLUMNS: &str = "id, message_id, topic, priority, payload, status, attempts,
     created_at, last_attempt_at, next_attempt_at, last_error";

/// Eligible for a drain: pending, or failed with its retry delay elapsed.
const ELIGIBLE: &str = "(status = 'pending'
     OR (status = 'failed' AND (next_attempt_at IS NULL OR next_attempt_at <= ?1)))";

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<TelemetryRecord> {
    let message_id: String = row.get(1)?;
    let topic: String = row.get(2)?;
    let status: String = row.get(5)?;
    let created_at: String = row.get(7)?;
    Ok(TelemetryRecord {
        id: row.get(0)?,
        message_id: Uuid::parse_str(&message_id).map_err(|e| conversion_err(e.to_string()))?,
        topic: Topic::from(topic.as_str()),
        priority: Priority::from_i64(row.get(3)?),
        payload: row.get(4)?,
        status: RecordStatus::parse(&status)
            .ok_or_else(|| conversion_err(format!("unknown record status {status}")))?,
        attempts: row.get(6)?,
        created_at: parse_ts(&created_at)?,
        last_attempt_at: parse_opt_ts(row.get(8)?)?,
        next_attempt_at: parse_opt_ts(row.get(9)?)?,
        last_error: row.get(10)?,
    })
}

/// Insert a new pending record. Returns its id.
pub fn insert_record(conn: &Connection, record: &NewTelemetryRecord) -> RelayResult<i64> {
    conn.execute(
        "INSERT INTO telemetry_records
            (message_id, topic, priority, payload, payload_size, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6)",
        params![
            record.message_id.to_string(),
            record.topic.as_str(),
            record.topic.priority().as_i64(),
            record.payload,
            record.payload.len() as i64,
            fmt_ts(&record.created_at),
        ],
    )
    .map_err(sqlite_err)?;
    Ok(conn.last_insert_rowid())
}

/// Atomically select up to `limit` eligible records and mark them in flight.
///
/// Alerts first, then oldest first. A claimed record is invisible to any
/// other drain until it is settled or released.
pub fn claim_pending(
    conn: &Connection,
    limit: usize,
    now: DateTime<Utc>,
) -> RelayResult<Vec<TelemetryRecord>> {
    let tx = conn.unchecked_transaction().map_err(sqlite_err)?;
    let now_s = fmt_ts(&now);

    let records = {
        let mut stmt = tx
            .prepare(&format!(
                "SELECT {RECORD_COLUMNS} FROM telemetry_records
                 WHERE {ELIGIBLE}
                 ORDER BY priority DESC, created_at ASC, id ASC
                 LIMIT ?2"
            ))
            .map_err(sqlite_err)?;
        let rows = stmt
            .query_map(params![now_s, limit as i64], row_to_record)
            .map_err(sqlite_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(sqlite_err)?
    };

    {
        let mut claim = tx
            .prepare(
                "UPDATE telemetry_records
                 SET status = 'in_flight', last_attempt_at = ?2,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
            )
            .map_err(sqlite_err)?;
        for record in &records {
            claim
                .execute(params![record.id, now_s])
                .map_err(sqlite_err)?;
        }
    }

    tx.commit().map_err(sqlite_err)?;

    Ok(records
        .into_iter()
        .map(|mut r| {
            r.status = RecordStatus::InFlight;
            r.last_attempt_at = Some(now);
            r
        })
        .collect())
}

/// Mark a record acknowledged by the broker.
pub fn mark_sent(conn: &Connection, id: i64) -> RelayResult<()> {
    let updated = conn
        .execute(
            "UPDATE telemetry_records
             SET status = 'sent', next_attempt_at = NULL, last_error = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
             WHERE id = ?1",
            params![id],
        )
        .map_err(sqlite_err)?;
    if updated == 0 {
        return Err(StorageError::RecordNotFound { id }.into());
    }
    Ok(())
}

/// Retry delay after `attempts` failures: `min(base * 2^(attempts-1), max)`.
pub fn retry_delay(attempts: u32, base_secs: u64, max_secs: u64) -> Duration {
    let exp = attempts.saturating_sub(1).min(30);
    let secs = base_secs.saturating_mul(1u64 << exp).min(max_secs);
    Duration::seconds(secs as i64)
}

/// Parameters for settling a failed attempt.
#[derive(Debug, Clone, Copy)]
pub struct FailurePolicy {
    pub max_attempts: u32,
    pub base_delay_secs: u64,
    pub max_delay_secs: u64,
}

/// Record a failed attempt: bump the counter, then either reschedule with a
/// backoff-scaled delay or move the record to `dead` once the cap is reached.
/// `permanent` failures go straight to `dead`.
pub fn mark_failed(
    conn: &Connection,
    id: i64,
    error: &str,
    permanent: bool,
    policy: FailurePolicy,
    now: DateTime<Utc>,
) -> RelayResult<RecordStatus> {
    let attempts: Option<u32> = conn
        .query_row(
            "SELECT attempts FROM telemetry_records WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()
        .map_err(sqlite_err)?;
    let attempts = attempts.ok_or(StorageError::RecordNotFound { id })? + 1;

    let (status, next_attempt) = if permanent || attempts >= policy.max_attempts {
        (RecordStatus::Dead, None)
    } else {
        let delay = retry_delay(attempts, policy.base_delay_secs, policy.max_delay_secs);
        (RecordStatus::Failed, Some(fmt_ts(&(now + delay))))
    };

    conn.execute(
        "UPDATE telemetry_records
         SET status = ?2, attempts = ?3, next_attempt_at = ?4, last_error = ?5,
             last_attempt_at = ?6,
             updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE id = ?1",
        params![id, status.as_str(), attempts, next_attempt, error, fmt_ts(&now)],
    )
    .map_err(sqlite_err)?;

    Ok(status)
}

/// Return claimed records to `pending` without consuming an attempt.
pub fn release(conn: &Connection, ids: &[i64]) -> RelayResult<usize> {
    let mut stmt = conn
        .prepare(
            "UPDATE telemetry_records SET status = 'pending',
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
             WHERE id = ?1 AND status = 'in_flight'",
        )
        .map_err(sqlite_err)?;
    let mut released = 0;
    for id in ids {
        released += stmt.execute(params![id]).map_err(sqlite_err)?;
    }
    Ok(released)
}

/// Records left in flight by a crash go back to pending.
pub fn recover_in_flight(conn: &Connection) -> RelayResult<usize> {
    conn.execute(
        "UPDATE telemetry_records SET status = 'pending' WHERE status = 'in_flight'",
        [],
    )
    .map_err(sqlite_err)
}

/// Records still awaiting delivery (pending, retrying, or in flight).
pub fn count_pending(conn: &Connection) -> RelayResult<u64> {
    conn.query_row(
        "SELECT COUNT(*) FROM telemetry_records
         WHERE status IN ('pending', 'failed', 'in_flight')",
        [],
        |row| row.get::<_, i64>(0),
    )
    .map(|n| n as u64)
    .map_err(sqlite_err)
}

pub fn get_record(conn: &Connection, id: i64) -> RelayResult<Option<TelemetryRecord>> {
    conn.query_row(
        &format!("SELECT {RECORD_COLUMNS} FROM telemetry_records WHERE id = ?1"),
        params![id],
        row_to_record,
    )
    .optional()
    .map_err(sqlite_err)
}

/// Records with the given status, oldest first.
pub fn list_by_status(
    conn: &Connection,
    status: RecordStatus,
    limit: usize,
) -> RelayResult<Vec<TelemetryRecord>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM telemetry_records
             WHERE status = ?1 ORDER BY created_at ASC, id ASC LIMIT ?2"
        ))
        .map_err(sqlite_err)?;
    let rows = stmt
        .query_map(params![status.as_str(), limit as i64], row_to_record)
        .map_err(sqlite_err)?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(sqlite_err)
}

/// Delete records with `status` created before `older_than`.
pub fn prune(
    conn: &Connection,
    older_than: DateTime<Utc>,
    status: RecordStatus,
) -> RelayResult<usize> {
    conn.execute(
        "DELETE FROM telemetry_records WHERE status = ?1 AND created_at < ?2",
        params![status.as_str(), fmt_ts(&older_than)],
    )
    .map_err(sqlite_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_doubles_and_caps() {
        assert_eq!(retry_delay(1, 5, 300), Duration::seconds(5));
        assert_eq!(retry_delay(2, 5, 300), Duration::seconds(10));
        assert_eq!(retry_delay(3, 5, 300), Duration::seconds(20));
        assert_eq!(retry_delay(10, 5, 300), Duration::seconds(300));
        assert_eq!(retry_delay(64, 5, 300), Duration::seconds(300));
    }
}

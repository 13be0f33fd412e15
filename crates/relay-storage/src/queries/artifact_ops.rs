//! Bulk artifact queue. Successful uploads are deleted from the table.

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use relay_core::errors::{CapacityError, RelayResult, StorageError};
use relay_core::models::{ArtifactCategory, ArtifactStatus, BulkArtifact, NewBulkArtifact};

use super::{conversion_err, fmt_ts, parse_opt_ts, parse_ts};
use crate::sqlite_err;

const ARTIFACT_COLUMNS: &str = "id, path, destination_key, content_type, category, priority,
     status, attempts, created_at, next_attempt_at, last_error";

fn row_to_artifact(row: &Row<'_>) -> rusqlite::Result<BulkArtifact> {
    let path: String = row.get(1)?;
    let category: String = row.get(4)?;
    let status: String = row.get(6)?;
    let created_at: String = row.get(8)?;
    Ok(BulkArtifact {
        id: row.get(0)?,
        path: PathBuf::from(path),
        destination_key: row.get(2)?,
        content_type: row.get(3)?,
        category: ArtifactCategory::parse(&category)
            .ok_or_else(|| conversion_err(format!("unknown category {category}")))?,
        priority: row.get::<_, i64>(5)? != 0,
        status: ArtifactStatus::parse(&status)
            .ok_or_else(|| conversion_err(format!("unknown artifact status {status}")))?,
        attempts: row.get(7)?,
        created_at: parse_ts(&created_at)?,
        next_attempt_at: parse_opt_ts(row.get(9)?)?,
        last_error: row.get(10)?,
    })
}

/// Queued artifacts (pending or in flight).
pub fn count_queued(conn: &Connection) -> RelayResult<u64> {
    conn.query_row(
        "SELECT COUNT(*) FROM bulk_artifacts WHERE status IN ('pending', 'in_flight')",
        [],
        |row| row.get::<_, i64>(0),
    )
    .map(|n| n as u64)
    .map_err(sqlite_err)
}

/// Outcome of an artifact enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactInsert {
    pub id: i64,
    /// Id of the artifact evicted to make room, if any.
    pub evicted: Option<i64>,
}

/// Insert an artifact, evicting the oldest non-priority pending one if the
/// queue is at `max_queue`. Fails with `CapacityExceeded` only when nothing
/// can be evicted and the new artifact is not itself a priority item.
pub fn insert_artifact(
    conn: &Connection,
    artifact: &NewBulkArtifact,
    max_queue: u64,
    now: DateTime<Utc>,
) -> RelayResult<ArtifactInsert> {
    let tx = conn.unchecked_transaction().map_err(sqlite_err)?;

    let queued = count_queued(&tx)?;
    let mut evicted = None;
    if queued >= max_queue {
        let victim: Option<i64> = tx
            .query_row(
                "SELECT id FROM bulk_artifacts
                 WHERE status = 'pending' AND priority = 0
                 ORDER BY created_at ASC, id ASC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(sqlite_err)?;
        match victim {
            Some(id) => {
                tx.execute(
                    "UPDATE bulk_artifacts
                     SET status = 'evicted', last_error = 'evicted: upload queue full'
                     WHERE id = ?1",
                    params![id],
                )
                .map_err(sqlite_err)?;
                evicted = Some(id);
            }
            None if !artifact.priority => {
                return Err(CapacityError::CapacityExceeded {
                    resource: "bulk upload queue".to_string(),
                    used: queued,
                    limit: max_queue,
                }
                .into());
            }
            None => {}
        }
    }

    tx.execute(
        "INSERT INTO bulk_artifacts
            (path, destination_key, content_type, category, priority, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6)",
        params![
            artifact.path.to_string_lossy().into_owned(),
            artifact.destination_key,
            artifact.content_type,
            artifact.category.as_str(),
            artifact.priority as i64,
            fmt_ts(&now),
        ],
    )
    .map_err(sqlite_err)?;
    let id = tx.last_insert_rowid();
    tx.commit().map_err(sqlite_err)?;

    Ok(ArtifactInsert { id, evicted })
}

/// Claim the next due artifact: priority first, then oldest.
pub fn claim_next(conn: &Connection, now: DateTime<Utc>) -> RelayResult<Option<BulkArtifact>> {
    let tx = conn.unchecked_transaction().map_err(sqlite_err)?;
    let artifact = tx
        .query_row(
            &format!(
                "SELECT {ARTIFACT_COLUMNS} FROM bulk_artifacts
                 WHERE status = 'pending' AND (next_attempt_at IS NULL OR next_attempt_at <= ?1)
                 ORDER BY priority DESC, created_at ASC, id ASC
                 LIMIT 1"
            ),
            params![fmt_ts(&now)],
            row_to_artifact,
        )
        .optional()
        .map_err(sqlite_err)?;

    let Some(mut artifact) = artifact else {
        return Ok(None);
    };
    tx.execute(
        "UPDATE bulk_artifacts SET status = 'in_flight' WHERE id = ?1",
        params![artifact.id],
    )
    .map_err(sqlite_err)?;
    tx.commit().map_err(sqlite_err)?;

    artifact.status = ArtifactStatus::InFlight;
    Ok(Some(artifact))
}

/// Upload finished: drop the artifact from the queue.
pub fn complete(conn: &Connection, id: i64) -> RelayResult<()> {
    let deleted = conn
        .execute("DELETE FROM bulk_artifacts WHERE id = ?1", params![id])
        .map_err(sqlite_err)?;
    if deleted == 0 {
        return Err(StorageError::RecordNotFound { id }.into());
    }
    Ok(())
}

/// Record a failed upload attempt. Reschedules with `retry_after`, or marks
/// the artifact `failed` once `max_attempts` is reached (or immediately when
/// `permanent`).
pub fn record_failure(
    conn: &Connection,
    id: i64,
    error: &str,
    permanent: bool,
    max_attempts: u32,
    retry_after: Duration,
    now: DateTime<Utc>,
) -> RelayResult<ArtifactStatus> {
    let attempts: Option<u32> = conn
        .query_row(
            "SELECT attempts FROM bulk_artifacts WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()
        .map_err(sqlite_err)?;
    let attempts = attempts.ok_or(StorageError::RecordNotFound { id })? + 1;

    let (status, next) = if permanent || attempts >= max_attempts {
        (ArtifactStatus::Failed, None)
    } else {
        (ArtifactStatus::Pending, Some(fmt_ts(&(now + retry_after))))
    };

    conn.execute(
        "UPDATE bulk_artifacts
         SET status = ?2, attempts = ?3, next_attempt_at = ?4, last_error = ?5
         WHERE id = ?1",
        params![id, status.as_str(), attempts, next, error],
    )
    .map_err(sqlite_err)?;
    Ok(status)
}

/// Put a claimed artifact back without consuming an attempt.
pub fn release(conn: &Connection, id: i64) -> RelayResult<()> {
    conn.execute(
        "UPDATE bulk_artifacts SET status = 'pending' WHERE id = ?1 AND status = 'in_flight'",
        params![id],
    )
    .map_err(sqlite_err)?;
    Ok(())
}

pub fn recover_in_flight(conn: &Connection) -> RelayResult<usize> {
    conn.execute(
        "UPDATE bulk_artifacts SET status = 'pending' WHERE status = 'in_flight'",
        [],
    )
    .map_err(sqlite_err)
}

pub fn get_artifact(conn: &Connection, id: i64) -> RelayResult<Option<BulkArtifact>> {
    conn.query_row(
        &format!("SELECT {ARTIFACT_COLUMNS} FROM bulk_artifacts WHERE id = ?1"),
        params![id],
        row_to_artifact,
    )
    .optional()
    .map_err(sqlite_err)
}

/// Artifacts that exhausted their attempts, oldest first.
pub fn list_failed(conn: &Connection, limit: usize) -> RelayResult<Vec<BulkArtifact>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {ARTIFACT_COLUMNS} FROM bulk_artifacts
             WHERE status = 'failed' ORDER BY created_at ASC, id ASC LIMIT ?1"
        ))
        .map_err(sqlite_err)?;
    let rows = stmt
        .query_map(params![limit as i64], row_to_artifact)
        .map_err(sqlite_err)?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(sqlite_err)
}

//! Aggregate counts by status.

use rusqlite::Connection;

use relay_core::errors::RelayResult;
use relay_core::models::{ArtifactQueueStats, QueueStats};

use crate::sqlite_err;

pub fn queue_stats(conn: &Connection) -> RelayResult<QueueStats> {
    let mut stmt = conn
        .prepare(
            "SELECT status, COUNT(*), COALESCE(SUM(payload_size), 0)
             FROM telemetry_records GROUP BY status",
        )
        .map_err(sqlite_err)?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })
        .map_err(sqlite_err)?;

    let mut stats = QueueStats::default();
    for row in rows {
        let (status, count, bytes) = row.map_err(sqlite_err)?;
        let count = count as u64;
        match status.as_str() {
            "pending" => stats.pending = count,
            "in_flight" => stats.in_flight = count,
            "sent" => stats.sent = count,
            "failed" => stats.failed = count,
            "dead" => stats.dead = count,
            "evicted" => stats.evicted = count,
            _ => continue,
        }
        if matches!(status.as_str(), "pending" | "in_flight" | "failed") {
            stats.pending_bytes += bytes as u64;
        }
    }
    Ok(stats)
}

pub fn artifact_stats(conn: &Connection) -> RelayResult<ArtifactQueueStats> {
    let mut stmt = conn
        .prepare("SELECT status, COUNT(*) FROM bulk_artifacts GROUP BY status")
        .map_err(sqlite_err)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
        .map_err(sqlite_err)?;

    let mut stats = ArtifactQueueStats::default();
    for row in rows {
        let (status, count) = row.map_err(sqlite_err)?;
        let count = count as u64;
        match status.as_str() {
            "pending" => stats.pending = count,
            "in_flight" => stats.in_flight = count,
            "failed" => stats.failed = count,
            "evicted" => stats.evicted = count,
            _ => {}
        }
    }
    Ok(stats)
}

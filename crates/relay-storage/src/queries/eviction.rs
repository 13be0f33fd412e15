//! Capacity policy: evict the oldest non-alert records.
//!
//! Evicted rows keep their metadata (they stay observable) but their payload
//! is cleared so the space can be reclaimed.

use rusqlite::{params, Connection};

use relay_core::errors::RelayResult;
use relay_core::models::Priority;

use super::record_ops::count_pending;
use crate::sqlite_err;

/// Records removed by one eviction pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Eviction {
    pub records: u64,
    pub bytes: u64,
}

/// Mark the `limit` oldest evictable records as evicted. In-flight records
/// belong to a drain and alerts are exempt.
fn evict_oldest(conn: &Connection, limit: u64, reason: &str) -> RelayResult<Eviction> {
    if limit == 0 {
        return Ok(Eviction::default());
    }
    let tx = conn.unchecked_transaction().map_err(sqlite_err)?;

    let victims = "SELECT id FROM telemetry_records
         WHERE status IN ('pending', 'failed') AND priority = ?1
         ORDER BY created_at ASC, id ASC
         LIMIT ?2";

    let bytes: i64 = tx
        .query_row(
            &format!(
                "SELECT COALESCE(SUM(payload_size), 0) FROM telemetry_records
                 WHERE id IN ({victims})"
            ),
            params![Priority::Normal.as_i64(), limit as i64],
            |row| row.get(0),
        )
        .map_err(sqlite_err)?;

    let records = tx
        .execute(
            &format!(
                "UPDATE telemetry_records
                 SET status = 'evicted', payload = X'', last_error = ?3,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id IN ({victims})"
            ),
            params![Priority::Normal.as_i64(), limit as i64, reason],
        )
        .map_err(sqlite_err)?;

    tx.commit().map_err(sqlite_err)?;
    Ok(Eviction {
        records: records as u64,
        bytes: bytes as u64,
    })
}

/// Number of records to evict when `pending` exceeds `ceiling`: at least the
/// excess, or `fraction` of the ceiling when that is larger, so a full queue
/// is not trimmed one record per enqueue.
pub fn eviction_target(pending: u64, ceiling: u64, fraction: f64) -> u64 {
    if pending <= ceiling {
        return 0;
    }
    let excess = pending - ceiling;
    let batch = share_of(ceiling, fraction);
    excess.max(batch)
}

/// Enforce the pending ceiling. Called after every enqueue.
pub fn evict_over_ceiling(conn: &Connection, ceiling: u64, fraction: f64) -> RelayResult<Eviction> {
    let pending = count_pending(conn)?;
    let target = eviction_target(pending, ceiling, fraction);
    evict_oldest(conn, target, "evicted: queue capacity exceeded")
}

/// `ceil(n * fraction)`, rounded first so `10 * 0.3` is 3 and not 4.
fn share_of(n: u64, fraction: f64) -> u64 {
    let raw = (n as f64 * fraction * 1e9).round() / 1e9;
    raw.ceil() as u64
}

/// Emergency cleanup: evict `fraction` of the evictable backlog, oldest first.
pub fn evict_fraction(conn: &Connection, fraction: f64) -> RelayResult<Eviction> {
    let evictable: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM telemetry_records
             WHERE status IN ('pending', 'failed') AND priority = ?1",
            params![Priority::Normal.as_i64()],
            |row| row.get(0),
        )
        .map_err(sqlite_err)?;
    let target = share_of(evictable as u64, fraction);
    evict_oldest(conn, target, "evicted: emergency storage cleanup")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_is_zero_under_ceiling() {
        assert_eq!(eviction_target(100, 100, 0.5), 0);
        assert_eq!(eviction_target(3, 100, 0.5), 0);
    }

    #[test]
    fn target_is_fraction_of_ceiling_when_just_over() {
        assert_eq!(eviction_target(101, 100, 0.5), 50);
        assert_eq!(eviction_target(101, 100, 0.1), 10);
    }

    #[test]
    fn share_is_not_skewed_by_float_error() {
        assert_eq!(share_of(10, 0.3), 3);
        assert_eq!(share_of(10, 0.25), 3);
        assert_eq!(share_of(0, 0.5), 0);
    }

    #[test]
    fn target_covers_large_excess() {
        assert_eq!(eviction_target(400, 100, 0.5), 300);
    }
}

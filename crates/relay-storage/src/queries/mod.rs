//! SQL for each table. Every function takes a borrowed connection; the
//! engine decides which connection (writer or reader) runs it.

pub mod artifact_ops;
pub mod eviction;
pub mod maintenance;
pub mod record_ops;
pub mod recovery_log_ops;
pub mod stats;

use chrono::{DateTime, SecondsFormat, Utc};

/// Fixed-width RFC 3339, so string order equals time order in SQL.
pub(crate) fn fmt_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))
}

pub(crate) fn parse_opt_ts(s: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    s.as_deref().map(parse_ts).transpose()
}

pub(crate) fn conversion_err(msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, msg)),
    )
}

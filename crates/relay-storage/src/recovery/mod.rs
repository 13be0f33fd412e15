//! Crash recovery: integrity check, WAL checkpoint, backup/restore.

pub mod backup;
pub mod integrity_check;
pub mod wal_recovery;

pub use backup::{create_backup, restore_from_backup};
pub use integrity_check::check_integrity;
pub use wal_recovery::attempt_wal_recovery;

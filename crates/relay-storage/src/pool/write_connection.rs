//! Single write connection behind `tokio::sync::Mutex`.
//! Serialized writes, so a claimed record can never be claimed twice.

use std::path::Path;

use rusqlite::Connection;
use tokio::sync::Mutex;

use relay_core::errors::RelayResult;

use super::pragmas::apply_pragmas;
use crate::{sqlite_err, to_storage_err};

/// A single write connection protected by an async mutex.
pub struct WriteConnection {
    conn: Mutex<Connection>,
}

impl WriteConnection {
    /// Open (or create) the queue file.
    pub fn open(path: &Path) -> RelayResult<Self> {
        let conn = Connection::open(path).map_err(sqlite_err)?;
        apply_pragmas(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> RelayResult<Self> {
        let conn = Connection::open_in_memory().map_err(sqlite_err)?;
        apply_pragmas(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the write lock and execute a closure with the connection.
    pub async fn with_conn<F, T>(&self, f: F) -> RelayResult<T>
    where
        F: FnOnce(&Connection) -> RelayResult<T>,
    {
        let guard = self.conn.lock().await;
        f(&guard)
    }

    /// Mutable access, needed by backup restore.
    pub async fn with_conn_mut<F, T>(&self, f: F) -> RelayResult<T>
    where
        F: FnOnce(&mut Connection) -> RelayResult<T>,
    {
        let mut guard = self.conn.lock().await;
        f(&mut guard)
    }

    /// Synchronous access at startup, before the connection is shared.
    /// Fails instead of blocking if someone else holds the lock.
    pub fn with_conn_sync<F, T>(&self, f: F) -> RelayResult<T>
    where
        F: FnOnce(&Connection) -> RelayResult<T>,
    {
        let guard = self
            .conn
            .try_lock()
            .map_err(|e| to_storage_err(format!("write connection busy: {e}")))?;
        f(&guard)
    }
}

//! Read-only connections for stats and listings. Under WAL they never block
//! the writer, so `stats()` stays cheap while a drain is committing.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use rusqlite::{Connection, OpenFlags};

use relay_core::errors::RelayResult;

use super::pragmas::apply_read_pragmas;
use crate::sqlite_err;

/// Edge boxes have two to four cores.
const MAX_READERS: usize = 4;

pub struct ReadPool {
    readers: Vec<Mutex<Connection>>,
    cursor: AtomicUsize,
}

impl ReadPool {
    /// Open `size` readers (clamped to `1..=4`) on the queue file.
    pub fn open(path: &Path, size: usize) -> RelayResult<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let readers = (0..size.clamp(1, MAX_READERS))
            .map(|_| {
                let conn = Connection::open_with_flags(path, flags).map_err(sqlite_err)?;
                apply_read_pragmas(&conn)?;
                Ok(Mutex::new(conn))
            })
            .collect::<RelayResult<Vec<_>>>()?;
        Ok(Self {
            readers,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Run `f` on the next reader, round-robin.
    pub fn with_conn<F, T>(&self, f: F) -> RelayResult<T>
    where
        F: FnOnce(&Connection) -> RelayResult<T>,
    {
        let slot = self.cursor.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[slot].lock().unwrap_or_else(|e| e.into_inner());
        f(&conn)
    }
}

//! Connection pool managing read/write connections.

pub mod pragmas;
pub mod read_pool;
pub mod write_connection;

use std::path::{Path, PathBuf};

use relay_core::errors::RelayResult;

pub use read_pool::ReadPool;
pub use write_connection::WriteConnection;

/// Manages the single write connection and the optional read pool.
pub struct ConnectionPool {
    pub writer: WriteConnection,
    /// `None` for in-memory databases, whose separate connections would
    /// each see an isolated database.
    pub readers: Option<ReadPool>,
    pub db_path: Option<PathBuf>,
}

impl ConnectionPool {
    /// Open the writer first so the file exists (and is in WAL mode)
    /// before read-only connections attach.
    pub fn open(path: &Path, read_pool_size: usize) -> RelayResult<Self> {
        let writer = WriteConnection::open(path)?;
        let readers = ReadPool::open(path, read_pool_size)?;
        Ok(Self {
            writer,
            readers: Some(readers),
            db_path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory pool (for testing). All access goes through the writer.
    pub fn open_in_memory() -> RelayResult<Self> {
        Ok(Self {
            writer: WriteConnection::open_in_memory()?,
            readers: None,
            db_path: None,
        })
    }
}

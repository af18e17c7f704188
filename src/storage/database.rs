use rusqlite::{Connection, Result as SqlResult};
use std::path::Path;
use std::sync::Mutex;

use super::{StoreError, StoreResult};

/// Base database connection wrapper.
///
/// The connection sits behind a mutex so the store can be shared between
/// request handlers and the sweep task; every statement runs under the lock.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn new<P: AsRef<Path>>(path: P) -> SqlResult<Self> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> SqlResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` against the locked connection.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> SqlResult<T>,
    ) -> StoreResult<T> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(f(&conn)?)
    }
}

use std::path::PathBuf;

use parking_lot::Mutex;
use rusqlite::Connection;

use crate::error::Result;
use crate::schema;

#[derive(Debug, Clone)]
pub struct SqliteConfig {
    pub path: PathBuf,
}

impl SqliteConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// A single-writer SQLite connection behind a `parking_lot::Mutex`, the same
/// shape used for the rest of the notifier/queue manager's shared state.
/// `rusqlite` is synchronous; callers on the async path should wrap calls
/// in `spawn_blocking` for anything non-trivial.
pub struct SqlitePool {
    conn: Mutex<Connection>,
}

impl SqlitePool {
    pub fn new(config: SqliteConfig) -> Result<Self> {
        let conn = Connection::open(&config.path)?;
        schema::apply_migrations(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::apply_migrations(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock();
        f(&conn)
    }

    pub fn with_connection_mut<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock();
        f(&mut conn)
    }
}

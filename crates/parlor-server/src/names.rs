//! Fire-and-forget persistence of every display name that ever joined.
//!
//! The chat flow never waits on, or branches on, the outcome of a write:
//! [`NameSink::record`] returns immediately and failures are logged and
//! swallowed. Each distinct name is stored once (`INSERT OR IGNORE`).

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{Connection, params};
use thiserror::Error;
use tracing::warn;

/// Errors opening or writing the store.
#[derive(Debug, Error)]
pub enum NameStoreError {
    /// Underlying SQLite failure.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// Name-persistence seam consumed by the router.
pub trait NameSink: Send + Sync {
    /// Record a joined name. Must not block the caller; failures stay
    /// inside the implementation.
    fn record(&self, name: &str);
}

/// SQLite-backed [`NameSink`].
pub struct SqliteNameStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteNameStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: &Path) -> Result<Self, NameStoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// An in-memory store, for tests.
    pub fn open_in_memory() -> Result<Self, NameStoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, NameStoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS names (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT UNIQUE,
                joined_at INTEGER
            )",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Synchronous write path; [`NameSink::record`] wraps this off-task.
    pub fn record_blocking(&self, name: &str) -> Result<(), NameStoreError> {
        let conn = self.conn.lock();
        let _ = conn.execute(
            "INSERT OR IGNORE INTO names (name, joined_at) VALUES (?1, ?2)",
            params![name, chrono::Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }

    /// Every recorded name, oldest first.
    pub fn recorded_names(&self) -> Result<Vec<String>, NameStoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT name FROM names ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut names = Vec::new();
        for row in rows {
            names.push(row?);
        }
        Ok(names)
    }
}

impl NameSink for SqliteNameStore {
    fn record(&self, name: &str) {
        let conn = Arc::clone(&self.conn);
        let name = name.to_owned();
        let _ = tokio::task::spawn_blocking(move || {
            let store = SqliteNameStore { conn };
            if let Err(e) = store.record_blocking(&name) {
                warn!(error = %e, %name, "failed to record joined name");
            }
        });
    }
}

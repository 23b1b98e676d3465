use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::Connection;
use tracing::debug;

use crate::db::init_db;
use crate::error::{Result, StoreError};

/// Plain string key/value storage.
///
/// Implementations must be safe to share between concurrently running job
/// cycles and must serialize conflicting writes to the same key.
pub trait KvStore: Send + Sync {
    /// Fetch the value for `key`. A missing key is [`StoreError::NotFound`].
    fn get(&self, key: &str) -> Result<String>;

    /// Insert or overwrite `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Deleting a missing key is not an error.
    fn del(&self, key: &str) -> Result<()>;
}

/// SQLite-backed [`KvStore`].
///
/// Wraps a single connection in a `Mutex`, which is also what serializes
/// concurrent writers.
pub struct SqliteKvStore {
    db: Mutex<Connection>,
}

impl SqliteKvStore {
    /// Wrap an already-open connection, creating the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    /// Open (or create) the database file at `path` in WAL mode.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::new(conn)
    }

    /// Private in-memory database, handy for tests and dry runs.
    pub fn in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        // A panic while holding the lock cannot leave a half-applied statement
        // behind, so the connection is still usable.
        self.db.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KvStore for SqliteKvStore {
    fn get(&self, key: &str) -> Result<String> {
        let db = self.conn();
        match db.query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
            row.get::<_, String>(0)
        }) {
            Ok(v) => Ok(v),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(StoreError::NotFound {
                key: key.to_string(),
            }),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let db = self.conn();
        db.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                            updated_at = excluded.updated_at",
            rusqlite::params![key, value, now],
        )?;
        debug!(%key, bytes = value.len(), "kv value stored");
        Ok(())
    }

    fn del(&self, key: &str) -> Result<()> {
        let db = self.conn();
        let n = db.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        debug!(%key, deleted = n, "kv key removed");
        Ok(())
    }
}

/// Process-local [`KvStore`]; nothing survives a restart.
#[derive(Default)]
pub struct MemoryKvStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<String> {
        self.values()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                key: key.to_string(),
            })
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn del(&self, key: &str) -> Result<()> {
        self.values().remove(key);
        Ok(())
    }
}

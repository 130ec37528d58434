//! SQLite-backed store.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use tracing::debug;

use super::schema::{SCHEMA_CREATE_ENTRIES, SCHEMA_CREATE_METADATA, STORE_SCHEMA_VERSION};
use super::{KeyValueStore, Namespace, StoreError};

/// A store in a single SQLite database file
pub struct SqliteStore {
    conn: Mutex<Connection>,
    /// Database path (None for in-memory stores)
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open a store database, creating it if it does not exist
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            debug!("Store database {} not found, creating", path.display());
            return Self::create(path);
        }

        let conn = Connection::open(path)?;
        Self::configure_connection(&conn)?;
        Self::create_schema(&conn)?;

        let store = Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        };

        match store.get_metadata("schema_version")? {
            Some(version) if version == STORE_SCHEMA_VERSION => {}
            Some(version) => {
                return Err(StoreError::SchemaVersionMismatch {
                    expected: STORE_SCHEMA_VERSION.to_string(),
                    found: version,
                });
            }
            None => store.set_metadata("schema_version", STORE_SCHEMA_VERSION)?,
        }

        Ok(store)
    }

    /// Create a new store database with schema
    pub fn create(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::configure_connection(&conn)?;
        Self::create_schema(&conn)?;

        let store = Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        };
        store.set_metadata("schema_version", STORE_SCHEMA_VERSION)?;

        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::configure_connection(&conn)?;
        Self::create_schema(&conn)?;

        let store = Self {
            conn: Mutex::new(conn),
            path: None,
        };
        store.set_metadata("schema_version", STORE_SCHEMA_VERSION)?;

        Ok(store)
    }

    fn create_schema(conn: &Connection) -> SqliteResult<()> {
        conn.execute(SCHEMA_CREATE_ENTRIES, [])?;
        conn.execute(SCHEMA_CREATE_METADATA, [])?;
        Ok(())
    }

    /// Configure connection for many small writes from several processes
    fn configure_connection(conn: &Connection) -> SqliteResult<()> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "temp_store", "MEMORY")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(())
    }

    /// Database path, if on disk
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // =========================================================================
    // Metadata Operations
    // =========================================================================

    /// Get a metadata value
    pub fn get_metadata(&self, key: &str) -> Result<Option<String>, StoreError> {
        let result = self
            .conn
            .lock()
            .query_row(
                "SELECT value FROM store_metadata WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(result)
    }

    /// Set a metadata value
    pub fn set_metadata(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO store_metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Schema version recorded in the database
    pub fn schema_version(&self) -> Result<Option<String>, StoreError> {
        self.get_metadata("schema_version")
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, namespace: Namespace, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .lock()
            .query_row(
                "SELECT value FROM entries WHERE namespace = ?1 AND key = ?2",
                params![namespace.as_str(), key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put(&self, namespace: Namespace, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO entries (namespace, key, value) VALUES (?1, ?2, ?3)",
            params![namespace.as_str(), key, value],
        )?;
        Ok(())
    }

    fn remove(&self, namespace: Namespace, key: &str) -> Result<bool, StoreError> {
        let deleted = self.conn.lock().execute(
            "DELETE FROM entries WHERE namespace = ?1 AND key = ?2",
            params![namespace.as_str(), key],
        )?;
        Ok(deleted > 0)
    }

    fn clear(&self, namespace: Namespace) -> Result<usize, StoreError> {
        let deleted = self.conn.lock().execute(
            "DELETE FROM entries WHERE namespace = ?1",
            [namespace.as_str()],
        )?;
        Ok(deleted)
    }

    fn entries(&self, namespace: Namespace) -> Result<Vec<(String, String)>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT key, value FROM entries WHERE namespace = ?1 ORDER BY key")?;
        let entries = stmt
            .query_map([namespace.as_str()], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(entries)
    }

    fn len(&self, namespace: Namespace) -> Result<usize, StoreError> {
        let count: i64 = self.conn.lock().query_row(
            "SELECT COUNT(*) FROM entries WHERE namespace = ?1",
            [namespace.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

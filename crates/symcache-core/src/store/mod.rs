//! Persistent key-value storage.
//!
//! The engine persists encoded descriptors and resolved resource identifiers
//! through a small string-to-string store with two namespaces. Every write is
//! atomic with respect to readers: a reader sees either the old value or the
//! new one, never a torn entry.

mod memory;
pub mod schema;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch { expected: String, found: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Independent key spaces inside one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    /// Encoded symbol descriptors plus epoch bookkeeping
    Symbols,
    /// Resolved string-resource identifiers by normalized label
    Resources,
}

impl Namespace {
    /// Both namespaces
    pub const ALL: [Namespace; 2] = [Namespace::Symbols, Namespace::Resources];

    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Symbols => "symbols",
            Namespace::Resources => "resources",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Namespace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "symbols" => Ok(Namespace::Symbols),
            "resources" => Ok(Namespace::Resources),
            other => Err(format!("unknown namespace '{}'", other)),
        }
    }
}

/// Durable string-to-string map, partitioned by namespace.
///
/// Implementations must be safe to call from many threads at once.
pub trait KeyValueStore: Send + Sync {
    /// Read one value
    fn get(&self, namespace: Namespace, key: &str) -> Result<Option<String>, StoreError>;

    /// Insert or overwrite one value
    fn put(&self, namespace: Namespace, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete one value, reporting whether it existed
    fn remove(&self, namespace: Namespace, key: &str) -> Result<bool, StoreError>;

    /// Delete every value in a namespace, returning how many were removed
    fn clear(&self, namespace: Namespace) -> Result<usize, StoreError>;

    /// All entries of a namespace, ordered by key
    fn entries(&self, namespace: Namespace) -> Result<Vec<(String, String)>, StoreError>;

    /// All keys of a namespace, ordered
    fn keys(&self, namespace: Namespace) -> Result<Vec<String>, StoreError> {
        Ok(self
            .entries(namespace)?
            .into_iter()
            .map(|(key, _)| key)
            .collect())
    }

    /// Number of entries in a namespace
    fn len(&self, namespace: Namespace) -> Result<usize, StoreError> {
        Ok(self.entries(namespace)?.len())
    }
}

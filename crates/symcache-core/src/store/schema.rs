//! SQLite Schema Definitions for the Descriptor Store
//!
//! One table holds every namespace; `(namespace, key)` is the primary key so
//! `INSERT OR REPLACE` swaps a value atomically for concurrent readers.

/// Schema version for store databases
pub const STORE_SCHEMA_VERSION: &str = "1.0";

/// SQL to create the entries table
pub const SCHEMA_CREATE_ENTRIES: &str = r#"
CREATE TABLE IF NOT EXISTS entries (
    -- Namespace name ("symbols" or "resources")
    namespace TEXT NOT NULL,

    -- Logical key, or a reserved '@' bookkeeping key
    key TEXT NOT NULL,

    -- Encoded descriptor, descriptor array, field map or resource id
    value TEXT NOT NULL,

    PRIMARY KEY (namespace, key)
) WITHOUT ROWID
"#;

/// SQL to create the metadata table
///
/// Stores store-level metadata like the schema version.
pub const SCHEMA_CREATE_METADATA: &str = r#"
CREATE TABLE IF NOT EXISTS store_metadata (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
)
"#;

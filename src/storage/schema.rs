//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the geo-sweep database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Every object id ever reported, with the record as first seen
CREATE TABLE IF NOT EXISTS objects (
    id TEXT PRIMARY KEY,
    payload BLOB NOT NULL,
    first_seen_at TEXT NOT NULL
);

-- Small keyed values such as the cached partition
CREATE TABLE IF NOT EXISTS cache (
    key TEXT PRIMARY KEY,
    value BLOB NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// Cache key under which the partition is stored
pub const PARTITION_KEY: &str = "partition";

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

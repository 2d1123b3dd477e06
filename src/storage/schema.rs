//! Database schema definitions
//!
//! All SQL schema definitions for the discograph database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track ingestion runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Normalized entity records; the source reference is the entity id
CREATE TABLE IF NOT EXISTS entities (
    reference TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    name TEXT NOT NULL,
    country TEXT,
    genre TEXT,
    formed_year INTEGER,
    real_name TEXT,
    birthplace TEXT,
    release_year INTEGER,
    label_name TEXT,
    stubs TEXT NOT NULL DEFAULT '[]',
    visited_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_entities_kind ON entities(kind);

-- Relations between entities; the same pair may carry several role entries
CREATE TABLE IF NOT EXISTS relations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    subject_ref TEXT NOT NULL,
    object_ref TEXT NOT NULL,
    role TEXT NOT NULL,
    status TEXT NOT NULL,
    spans TEXT NOT NULL DEFAULT '[]',
    UNIQUE(subject_ref, object_ref, role)
);

CREATE INDEX IF NOT EXISTS idx_relations_subject ON relations(subject_ref);
CREATE INDEX IF NOT EXISTS idx_relations_object ON relations(object_ref);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// Gets the current schema version
///
/// This can be used for future migrations if the schema changes.
pub fn get_schema_version() -> u32 {
    1
}

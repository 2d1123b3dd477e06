//! Storage port and error types
//!
//! The coordinator consumes storage only through this trait. Implementations
//! need not be internally thread-safe: the coordinator's single write lock
//! guarantees one caller at a time.

use crate::model::{EntityKind, EntityRecord, RelationDescriptor};
use crate::storage::{RunRecord, RunStatus};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
///
/// Transient failures may be retried by the caller; definitive failures mean
/// the write was rejected and retrying would reproduce the rejection.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Transient storage failure: {0}")]
    Transient(String),

    #[error("Write rejected: {0}")]
    Definitive(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Whether the caller may retry the whole commit.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transient(_) => true,
            Self::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Per-kind visited map: reference -> last-visited timestamp
pub type VisitedMap = HashMap<EntityKind, HashMap<String, DateTime<Utc>>>;

/// Trait for storage backend implementations
pub trait Storage: Send {
    // ===== Run Management =====

    /// Creates a new run, returning its id
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Updates the status of a run
    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Marks a run as completed with a finish timestamp
    fn complete_run(&mut self, run_id: i64) -> StorageResult<()>;

    // ===== Entity / Relation Writes =====

    /// Inserts or replaces an entity record keyed by its reference
    fn upsert_entity(&mut self, record: &EntityRecord) -> StorageResult<()>;

    /// Inserts or replaces a relation keyed by (subject, object, role)
    fn upsert_relation(&mut self, descriptor: &RelationDescriptor) -> StorageResult<()>;

    // ===== Reads =====

    /// Loads the visited ledger: per kind, reference -> last visited
    fn list_visited(&self) -> StorageResult<VisitedMap>;

    /// Loads all stored entity records
    fn load_entities(&self) -> StorageResult<Vec<EntityRecord>>;

    /// Loads all stored relations
    fn load_relations(&self) -> StorageResult<Vec<RelationDescriptor>>;

    // ===== Statistics =====

    fn count_entities(&self) -> StorageResult<u64>;

    fn count_relations(&self) -> StorageResult<u64>;
}

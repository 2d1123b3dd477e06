//! Storage module for persisting ingested entities
//!
//! This module defines the abstract storage port the coordinator writes
//! through, plus the SQLite production backend:
//! - Entity and relation upserts
//! - Visited-ledger loading for at-most-once processing
//! - Run tracking

mod schema;
mod sqlite;
mod traits;

pub use schema::initialize_schema;
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult, VisitedMap};

use crate::DiscographError;
use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: impl AsRef<Path>) -> Result<SqliteStorage, DiscographError> {
    SqliteStorage::new(path.as_ref())
}

/// Represents one ingestion run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of an ingestion run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

//! Discograph: a concurrent music-archive ingestion pipeline
//!
//! This crate crawls markup-based archive pages describing bands, artists,
//! labels, and releases, normalizes their free-text fields into typed
//! records, and assembles a deduplicated undirected relationship graph
//! between the entities for export.

pub mod config;
pub mod crawler;
pub mod graph;
pub mod model;
pub mod output;
pub mod storage;

use thiserror::Error;

/// Main error type for discograph operations
#[derive(Debug, Error)]
pub enum DiscographError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Graph export error: {0}")]
    GraphExport(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Invalid seed reference: {0}")]
    InvalidSeed(String),
}

/// Result type alias for discograph operations
pub type Result<T> = std::result::Result<T, DiscographError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlCoordinator, RunSummary};
pub use graph::{assemble_graph, Graph, GraphNode};
pub use model::{Bound, EntityKind, EntityRecord, RelationDescriptor, TimeSpan};

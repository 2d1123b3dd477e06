use serde::Deserialize;

/// Main configuration structure for discograph
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub source: SourceConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub seed: Vec<SeedEntry>,
}

/// Crawler behavior configuration
///
/// Retry counts, timeouts, and delays are operational policy and live here
/// rather than as constants in the pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of concurrent worker tasks (bounded 1..=8)
    #[serde(rename = "worker-count")]
    pub worker_count: u32,

    /// Maximum fetch attempts per work item before dead-lettering
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Per-request fetch timeout in seconds
    #[serde(rename = "fetch-timeout-secs")]
    pub fetch_timeout_secs: u64,

    /// How many times a blocked (403/429) response is retried in-place
    #[serde(rename = "blocked-retry-count", default = "default_blocked_retries")]
    pub blocked_retry_count: u32,

    /// Delay between blocked-response retries, in milliseconds
    #[serde(rename = "blocked-retry-delay-ms", default = "default_blocked_delay")]
    pub blocked_retry_delay_ms: u64,
}

fn default_blocked_retries() -> u32 {
    2
}

fn default_blocked_delay() -> u64 {
    500
}

/// Archive source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Base URL all entity references are joined onto
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// User agent string sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Directory where dead-letter files are written
    #[serde(rename = "dead-letter-dir")]
    pub dead_letter_dir: String,

    /// Path the assembled graph is exported to as JSON
    #[serde(rename = "graph-path")]
    pub graph_path: String,

    /// Whether entities with no relations appear in the export
    #[serde(rename = "include-isolated", default)]
    pub include_isolated: bool,
}

/// Seed entry naming entity references to start the crawl from
#[derive(Debug, Clone, Deserialize)]
pub struct SeedEntry {
    /// Entity kind for these references (band, artist, label, release)
    pub kind: String,

    /// Site-relative references, e.g. "bands/wyrm/42"
    pub references: Vec<String>,
}

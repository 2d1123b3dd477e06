//! Concurrent ingestion pipeline
//!
//! - `queue`: shared FIFO of entity references the worker pool races on
//! - `fetcher`: the fetch port and its HTTP implementation
//! - `extractor`: synchronous markup-to-record extraction
//! - `coordinator`: worker pool, ledgers, and the single-writer commit path

pub mod coordinator;
pub mod extractor;
pub mod fetcher;
pub mod queue;

pub use coordinator::{CrawlCoordinator, RunSummary};
pub use extractor::{extract_entity, ExtractError, Extraction};
pub use fetcher::{build_http_client, Fetch, FetchError, FetchedDocument, HttpFetcher};
pub use queue::{WorkItem, WorkQueue};

use crate::config::Config;
use crate::storage::open_storage;
use crate::DiscographError;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Wires the HTTP fetcher and SQLite storage to a coordinator and runs a
/// full ingestion pass. Ctrl-C requests a cooperative stop: in-flight items
/// finish, queued items are left behind.
pub async fn run_crawl(
    config: Config,
    config_hash: &str,
    fresh: bool,
) -> Result<RunSummary, DiscographError> {
    let fetcher = Arc::new(HttpFetcher::new(&config.source, &config.crawler)?);
    let storage = open_storage(&config.output.database_path)?;

    let mut coordinator =
        CrawlCoordinator::new(config, Box::new(storage), fetcher, config_hash, fresh)?;

    let stop = coordinator.stop_handle();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping after in-flight items");
            stop.store(true, Ordering::Relaxed);
        }
    });

    let summary = coordinator.run().await;
    signal_task.abort();
    summary
}

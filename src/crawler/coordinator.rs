//! Crawl coordinator - worker pool orchestration
//!
//! The coordinator owns every piece of shared crawl state: the work queue,
//! the visited and attempt ledgers, the run classification ledgers, the
//! cooperative stop flag, the progress counter, and the single write lock
//! guarding the storage port. Workers are plain tasks racing on the queue;
//! all per-item failures are converted into ledger entries at the worker
//! boundary so nothing ever escapes and takes the pool down.

use crate::config::Config;
use crate::crawler::extractor::{extract_entity, ExtractError, Extraction};
use crate::crawler::fetcher::Fetch;
use crate::crawler::queue::{WorkItem, WorkQueue};
use crate::model::{EntityStub, ItemState, Outcome};
use crate::storage::{Storage, StorageError};
use crate::DiscographError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::Mutex as AsyncMutex;

/// Final report of one ingestion run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// References fetched, extracted, and committed this run
    pub added: Vec<String>,

    /// References bypassed because they were already visited
    pub skipped: Vec<String>,

    /// References dead-lettered after exhausted attempts, unusable
    /// structure, or a rejected commit
    pub unrecoverable: Vec<String>,

    /// Total work items processed (all classifications)
    pub processed: u64,
}

/// Run classification ledgers, appended by workers
#[derive(Debug, Default)]
struct RunLedgers {
    added: Vec<String>,
    skipped: Vec<String>,
    unrecoverable: Vec<String>,
}

impl RunLedgers {
    fn record(&mut self, outcome: Outcome, reference: String) {
        match outcome {
            Outcome::Added => self.added.push(reference),
            Outcome::Skipped => self.skipped.push(reference),
            Outcome::Unrecoverable => self.unrecoverable.push(reference),
        }
    }
}

/// State shared by the coordinator and its workers
struct Shared {
    config: Config,
    fetcher: Arc<dyn Fetch>,

    /// The storage port behind the single global write lock. Commits are
    /// totally ordered by this lock; the port itself need not be
    /// internally thread-safe.
    storage: AsyncMutex<Box<dyn Storage>>,

    queue: WorkQueue,

    /// reference -> last-visited. Read by all workers before processing;
    /// written only while the storage lock is held.
    visited: RwLock<HashMap<String, DateTime<Utc>>>,

    /// reference -> recoverable-failure count
    attempts: Mutex<HashMap<String, u32>>,

    ledgers: Mutex<RunLedgers>,
    progress: AtomicU64,
    stop: Arc<AtomicBool>,
}

/// Outcome of one commit attempt
enum CommitKind {
    Added,
    /// Another worker committed this reference first; nothing was written
    AlreadyVisited,
}

/// Coordinates a bounded worker pool over the work queue
pub struct CrawlCoordinator {
    shared: Arc<Shared>,
    run_id: i64,
}

impl CrawlCoordinator {
    /// Creates a coordinator over the given ports.
    ///
    /// Loads the visited ledger from storage (unless `fresh`), seeds the
    /// queue from the config, and opens a new run. A failure here is fatal
    /// to the whole run; nothing later is.
    pub fn new(
        config: Config,
        mut storage: Box<dyn Storage>,
        fetcher: Arc<dyn Fetch>,
        config_hash: &str,
        fresh: bool,
    ) -> Result<Self, DiscographError> {
        let run_id = storage.create_run(config_hash)?;

        let visited = if fresh {
            tracing::info!("Fresh run: ignoring previously visited entities");
            HashMap::new()
        } else {
            let mut flat = HashMap::new();
            for (kind, entries) in storage.list_visited()? {
                tracing::debug!("Loaded {} visited {} references", entries.len(), kind);
                flat.extend(entries);
            }
            tracing::info!("Visited ledger holds {} references", flat.len());
            flat
        };

        let seeds: Vec<WorkItem> = config
            .seed
            .iter()
            .flat_map(|entry| entry.references.iter())
            .map(WorkItem::new)
            .collect();
        tracing::info!("Seeded queue with {} work items", seeds.len());

        let shared = Arc::new(Shared {
            config,
            fetcher,
            storage: AsyncMutex::new(storage),
            queue: WorkQueue::seeded(seeds),
            visited: RwLock::new(visited),
            attempts: Mutex::new(HashMap::new()),
            ledgers: Mutex::new(RunLedgers::default()),
            progress: AtomicU64::new(0),
            stop: Arc::new(AtomicBool::new(false)),
        });

        Ok(Self { shared, run_id })
    }

    /// Handle the operator uses to request a cooperative stop. Workers
    /// observe it between work items; in-flight items always finish.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.shared.stop.clone()
    }

    /// Runs the worker pool until the queue drains or a stop is observed,
    /// then reports the three ledgers as the run summary.
    pub async fn run(&mut self) -> Result<RunSummary, DiscographError> {
        let worker_count = self.shared.config.crawler.worker_count.clamp(1, 8) as usize;
        tracing::info!(
            "Starting run {} with {} workers over {} queued items",
            self.run_id,
            worker_count,
            self.shared.queue.len()
        );
        let start_time = std::time::Instant::now();

        let mut handles = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let shared = self.shared.clone();
            handles.push(tokio::spawn(worker_loop(shared, worker_id)));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                // A panicking worker is a pipeline bug, but the run still
                // completes and reports whatever the other workers did.
                tracing::error!("Worker task failed: {}", e);
            }
        }

        {
            let mut storage = self.shared.storage.lock().await;
            storage.complete_run(self.run_id)?;
        }

        let processed = self.shared.progress.load(Ordering::Relaxed);
        let ledgers = {
            let mut guard = self.shared.ledgers.lock().unwrap();
            std::mem::take(&mut *guard)
        };

        let summary = RunSummary {
            processed,
            added: ledgers.added,
            skipped: ledgers.skipped,
            unrecoverable: ledgers.unrecoverable,
        };

        tracing::info!(
            "Run {} finished in {:?}: {} added, {} skipped, {} unrecoverable",
            self.run_id,
            start_time.elapsed(),
            summary.added.len(),
            summary.skipped.len(),
            summary.unrecoverable.len()
        );

        Ok(summary)
    }
}

/// One worker: pull, process, repeat. Exits when the queue is empty or a
/// stop has been requested.
async fn worker_loop(shared: Arc<Shared>, worker_id: usize) {
    tracing::debug!("Worker {} starting", worker_id);

    loop {
        if shared.stop.load(Ordering::Relaxed) {
            tracing::debug!("Worker {} observed stop signal", worker_id);
            break;
        }

        let Some(item) = shared.queue.try_pop() else {
            break;
        };

        process_item(&shared, item).await;
    }

    tracing::debug!("Worker {} exiting", worker_id);
}

/// Drives one work item through its state machine. All failures become
/// ledger entries; this function never returns an error.
async fn process_item(shared: &Shared, item: WorkItem) {
    let reference = item.reference.clone();
    let mut state = ItemState::Queued;

    // Already-visited short circuit: no fetch, no extract
    if shared.visited.read().unwrap().contains_key(&reference) {
        state.advance(ItemState::Done);
        finish(shared, Outcome::Skipped, reference);
        return;
    }

    state = state.advance(ItemState::Fetching);
    tracing::debug!("Fetching {}", reference);

    let document = match shared.fetcher.fetch(&reference).await {
        Ok(doc) => doc,
        Err(e) if e.is_transient() => {
            state = state.advance(ItemState::FetchFailed);
            handle_transient_failure(shared, state, item, &e.to_string());
            return;
        }
        Err(e) => {
            tracing::warn!("Fatal fetch failure for {}: {}", reference, e);
            state.advance(ItemState::FetchFailed).advance(ItemState::Done);
            finish(shared, Outcome::Unrecoverable, reference);
            return;
        }
    };

    let extraction = match extract_entity(&document.body, &reference) {
        Ok(extraction) => extraction,
        Err(e @ ExtractError::MissingAnchor(_)) | Err(e @ ExtractError::UnknownKind(_)) => {
            // Retrying would reproduce the same document; dead-letter now
            tracing::warn!("Structural failure for {}: {}", reference, e);
            state.advance(ItemState::FetchFailed).advance(ItemState::Done);
            finish(shared, Outcome::Unrecoverable, reference);
            return;
        }
    };
    state = state.advance(ItemState::Extracted);

    // Resolve inline sub-entities within this unit of work
    let (sub_extractions, leftover_stubs) =
        resolve_pending_stubs(shared, extraction.pending_stubs.clone()).await;

    match commit(shared, extraction, sub_extractions, leftover_stubs).await {
        Ok(CommitKind::Added) => {
            state.advance(ItemState::Committed).advance(ItemState::Done);
            shared.progress.fetch_add(1, Ordering::Relaxed);
            finish(shared, Outcome::Added, reference);
        }
        Ok(CommitKind::AlreadyVisited) => {
            // Lost the commit race; nothing was written for this item
            state.advance(ItemState::Committed).advance(ItemState::Done);
            finish(shared, Outcome::Skipped, reference);
        }
        Err(_) => {
            // Already logged with the record dump inside commit()
            state.advance(ItemState::CommitFailed).advance(ItemState::Done);
            finish(shared, Outcome::Unrecoverable, reference);
        }
    }
}

/// Bumps the attempt counter and either re-enqueues or dead-letters.
fn handle_transient_failure(shared: &Shared, state: ItemState, item: WorkItem, error: &str) {
    let attempts = {
        let mut ledger = shared.attempts.lock().unwrap();
        let counter = ledger.entry(item.reference.clone()).or_insert(0);
        *counter += 1;
        *counter
    };

    let max_attempts = shared.config.crawler.max_attempts;
    if attempts < max_attempts {
        tracing::debug!(
            "Transient failure for {} (attempt {}/{}), re-enqueueing: {}",
            item.reference,
            attempts,
            max_attempts,
            error
        );
        state.advance(ItemState::Queued);
        shared.queue.push(item);
    } else {
        tracing::warn!(
            "Giving up on {} after {} attempts: {}",
            item.reference,
            attempts,
            error
        );
        state.advance(ItemState::Done);
        finish(shared, Outcome::Unrecoverable, item.reference);
    }
}

/// Fetches and extracts inline sub-entities that are not yet visited.
///
/// A stub that is already visited, or that fails to fetch or extract, stays
/// a stub on the parent record; a failing sub-entity never fails the parent
/// item. Sub-entities do not recurse further: their own discovered stubs are
/// recorded, not fetched.
async fn resolve_pending_stubs(
    shared: &Shared,
    pending: Vec<EntityStub>,
) -> (Vec<Extraction>, Vec<EntityStub>) {
    let mut resolved = Vec::new();
    let mut leftover = Vec::new();

    for stub in pending {
        if shared.visited.read().unwrap().contains_key(&stub.reference) {
            tracing::trace!("Sub-entity {} already visited", stub.reference);
            leftover.push(stub);
            continue;
        }

        let document = match shared.fetcher.fetch(&stub.reference).await {
            Ok(doc) => doc,
            Err(e) => {
                tracing::debug!("Sub-entity fetch failed for {}: {}", stub.reference, e);
                leftover.push(stub);
                continue;
            }
        };

        match extract_entity(&document.body, &stub.reference) {
            Ok(mut extraction) => {
                // One level deep only
                extraction.record.stubs = std::mem::take(&mut extraction.pending_stubs);
                resolved.push(extraction);
            }
            Err(e) => {
                tracing::debug!("Sub-entity extraction failed for {}: {}", stub.reference, e);
                leftover.push(stub);
            }
        }
    }

    (resolved, leftover)
}

/// Applies one item's records through the storage port under the single
/// write lock, re-checking the visited ledger under that lock so two racing
/// workers can never both classify the same reference as added.
async fn commit(
    shared: &Shared,
    mut extraction: Extraction,
    sub_extractions: Vec<Extraction>,
    leftover_stubs: Vec<EntityStub>,
) -> Result<CommitKind, StorageError> {
    extraction.record.stubs = leftover_stubs;
    extraction.record.visited_at = Utc::now();

    let mut storage = shared.storage.lock().await;

    if shared
        .visited
        .read()
        .unwrap()
        .contains_key(&extraction.record.reference)
    {
        return Ok(CommitKind::AlreadyVisited);
    }

    let sub_extractions: Vec<Extraction> = {
        let visited = shared.visited.read().unwrap();
        sub_extractions
            .into_iter()
            .filter(|sub| !visited.contains_key(&sub.record.reference))
            .collect()
    };

    let result = match apply_commit(storage.as_mut(), &extraction, &sub_extractions) {
        Err(e) if e.is_transient() => {
            tracing::debug!("Transient commit failure, retrying once: {}", e);
            apply_commit(storage.as_mut(), &extraction, &sub_extractions)
        }
        other => other,
    };

    if let Err(e) = result {
        // Data for this item is presumed lost for the run; dump the full
        // record so it can be recovered manually.
        tracing::error!(
            "Commit failed for {}: {}. Record dump: {:?}; relations: {:?}",
            extraction.record.reference,
            e,
            extraction.record,
            extraction.relations
        );
        return Err(e);
    }

    // Mark visited while still holding the write lock
    let now = Utc::now();
    let mut visited = shared.visited.write().unwrap();
    visited.insert(extraction.record.reference.clone(), now);
    for sub in &sub_extractions {
        visited.insert(sub.record.reference.clone(), now);
    }

    Ok(CommitKind::Added)
}

/// One commit pass: parent record, its relations, then the inline
/// sub-entities and theirs.
fn apply_commit(
    storage: &mut dyn Storage,
    extraction: &Extraction,
    sub_extractions: &[Extraction],
) -> Result<(), StorageError> {
    storage.upsert_entity(&extraction.record)?;
    for relation in &extraction.relations {
        storage.upsert_relation(relation)?;
    }

    for sub in sub_extractions {
        storage.upsert_entity(&sub.record)?;
        for relation in &sub.relations {
            storage.upsert_relation(relation)?;
        }
    }

    Ok(())
}

/// Records the final classification for one reference.
fn finish(shared: &Shared, outcome: Outcome, reference: String) {
    tracing::debug!("{} classified {}", reference, outcome);
    shared.ledgers.lock().unwrap().record(outcome, reference);
}

//! Ingest statistics and run summary reporting

use crate::crawler::RunSummary;
use crate::model::EntityKind;
use crate::storage::Storage;
use crate::DiscographError;
use std::collections::HashMap;

/// Aggregate counts over the stored archive
#[derive(Debug, Clone)]
pub struct IngestStatistics {
    /// Total entities committed across all runs
    pub total_entities: u64,

    /// Entity counts per kind
    pub entities_by_kind: HashMap<EntityKind, u64>,

    /// Total relations committed across all runs
    pub total_relations: u64,
}

/// Loads aggregate statistics from storage
pub fn load_statistics(storage: &dyn Storage) -> Result<IngestStatistics, DiscographError> {
    let total_entities = storage.count_entities()?;
    let total_relations = storage.count_relations()?;

    let mut entities_by_kind = HashMap::new();
    for record in storage.load_entities()? {
        *entities_by_kind.entry(record.kind).or_insert(0) += 1;
    }

    Ok(IngestStatistics {
        total_entities,
        entities_by_kind,
        total_relations,
    })
}

/// Prints aggregate statistics to stdout
pub fn print_statistics(stats: &IngestStatistics) {
    println!("=== Archive Statistics ===\n");
    println!("Total entities: {}", stats.total_entities);

    let mut by_kind: Vec<_> = stats.entities_by_kind.iter().collect();
    by_kind.sort_by(|a, b| b.1.cmp(a.1));
    for (kind, count) in by_kind {
        println!("  {}: {}", kind, count);
    }

    println!("Total relations: {}", stats.total_relations);
}

/// Prints the final report of one ingestion run to stdout
pub fn print_run_summary(summary: &RunSummary) {
    println!("=== Run Summary ===\n");
    println!("Processed: {}", summary.processed);
    println!("  Added:         {}", summary.added.len());
    println!("  Skipped:       {}", summary.skipped.len());
    println!("  Unrecoverable: {}", summary.unrecoverable.len());

    if !summary.unrecoverable.is_empty() {
        println!("\nUnrecoverable references:");
        for reference in &summary.unrecoverable {
            println!("  - {}", reference);
        }
    }
}

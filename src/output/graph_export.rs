//! Graph export to JSON

use crate::graph::{assemble_graph, Graph};
use crate::storage::Storage;
use crate::DiscographError;
use std::fs;
use std::path::Path;

/// Assembles the relationship graph from storage and writes it as pretty
/// JSON to `path`.
pub fn export_graph(
    storage: &dyn Storage,
    path: &Path,
    include_isolated: bool,
) -> Result<Graph, DiscographError> {
    let entities = storage.load_entities()?;
    let relations = storage.load_relations()?;
    let graph = assemble_graph(&entities, &relations, include_isolated);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(&graph)?;
    fs::write(path, json)?;

    tracing::info!(
        "Exported graph with {} nodes and {} edges to {}",
        graph.node_count(),
        graph.edge_count(),
        path.display()
    );
    Ok(graph)
}

//! Relationship graph assembly
//!
//! Builds an undirected graph over the stored entities from the directed
//! relation descriptors. Each undirected edge is stored exactly once, on the
//! first endpoint that saw it: before adding `a -> b`, both `a`'s and `b`'s
//! adjacency lists are checked, so a relation recorded from both sides (a
//! band listing an artist and the artist listing the band) still yields a
//! single edge.

use crate::model::{EntityKind, EntityRecord, RelationDescriptor};
use serde::Serialize;
use std::collections::BTreeMap;

/// One node of the assembled graph
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GraphNode {
    pub name: String,
    pub kind: EntityKind,

    /// References this node carries edges to. Each undirected edge appears
    /// in exactly one endpoint's list.
    pub neighbors: Vec<String>,
}

/// Deduplicated undirected relationship graph, keyed by entity reference
///
/// `BTreeMap` keeps node order stable across runs so exports diff cleanly.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Graph {
    pub nodes: BTreeMap<String, GraphNode>,
}

impl Graph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total undirected edges. Each edge lives in exactly one adjacency
    /// list, so this is a plain sum.
    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|n| n.neighbors.len()).sum()
    }

    /// Whether an edge exists between the two references, in either
    /// storage direction.
    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        let forward = self
            .nodes
            .get(a)
            .is_some_and(|n| n.neighbors.iter().any(|r| r == b));
        let backward = self
            .nodes
            .get(b)
            .is_some_and(|n| n.neighbors.iter().any(|r| r == a));
        forward || backward
    }
}

/// Assembles the undirected graph from stored entities and relations.
///
/// Relations referring to entities that were never committed (dead-lettered
/// or still unqueued) are dropped. Nodes with no surviving edges are kept
/// only when `include_isolated` is set.
pub fn assemble_graph(
    entities: &[EntityRecord],
    relations: &[RelationDescriptor],
    include_isolated: bool,
) -> Graph {
    let mut nodes: BTreeMap<String, GraphNode> = entities
        .iter()
        .map(|e| {
            (
                e.reference.clone(),
                GraphNode {
                    name: e.name.clone(),
                    kind: e.kind,
                    neighbors: Vec::new(),
                },
            )
        })
        .collect();

    let mut dropped = 0usize;
    for relation in relations {
        if relation.subject_ref == relation.object_ref {
            continue; // self edges carry no graph information
        }
        if !nodes.contains_key(&relation.subject_ref) || !nodes.contains_key(&relation.object_ref) {
            dropped += 1;
            continue;
        }

        let already_present = edge_exists(&nodes, &relation.subject_ref, &relation.object_ref);
        if !already_present {
            nodes
                .get_mut(&relation.subject_ref)
                .expect("checked above")
                .neighbors
                .push(relation.object_ref.clone());
        }
    }

    if dropped > 0 {
        tracing::debug!("Dropped {} relations referencing uncommitted entities", dropped);
    }

    if !include_isolated {
        retain_connected(&mut nodes);
    }

    for node in nodes.values_mut() {
        node.neighbors.sort();
    }

    Graph { nodes }
}

fn edge_exists(nodes: &BTreeMap<String, GraphNode>, a: &str, b: &str) -> bool {
    let forward = nodes
        .get(a)
        .is_some_and(|n| n.neighbors.iter().any(|r| r == b));
    let backward = nodes
        .get(b)
        .is_some_and(|n| n.neighbors.iter().any(|r| r == a));
    forward || backward
}

/// Removes nodes that neither carry an edge nor are carried by one.
fn retain_connected(nodes: &mut BTreeMap<String, GraphNode>) {
    let mut connected: std::collections::HashSet<String> = std::collections::HashSet::new();
    for (reference, node) in nodes.iter() {
        if !node.neighbors.is_empty() {
            connected.insert(reference.clone());
        }
        for neighbor in &node.neighbors {
            connected.insert(neighbor.clone());
        }
    }
    nodes.retain(|reference, _| connected.contains(reference));
}

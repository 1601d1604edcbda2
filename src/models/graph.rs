//! Graph models produced from the roster table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Diagnostic;

/// A roster entry as a graph node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Unique id from the identifying column.
    pub id: String,
    /// Display label (label column, or the id).
    pub label: String,
    /// Every column of the row, keyed by header name.
    pub attributes: BTreeMap<String, String>,
    /// Ids of neighbours reached through an edge (sorted).
    pub connections: Vec<String>,
    /// Peer tokens as declared in the relationship column (deduplicated).
    pub declared_connections: Vec<String>,
}

/// An undirected edge; `source < target` always holds.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
}

impl GraphEdge {
    /// Builds the canonical edge for an unordered pair.
    pub fn canonical(a: &str, b: &str) -> Self {
        let (source, target) = if a <= b { (a, b) } else { (b, a) };
        Self {
            source: source.to_string(),
            target: target.to_string(),
        }
    }

    /// Whether the edge touches `id`.
    pub fn touches(&self, id: &str) -> bool {
        self.source == id || self.target == id
    }
}

/// Summary statistics for a built graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub isolated_node_count: usize,
    pub unresolved_connection_count: usize,
    pub connected_component_count: usize,
}

/// The graph handed to the rest of the application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    /// Nodes in table order.
    pub nodes: Vec<GraphNode>,
    /// Edges sorted by canonical key.
    pub edges: Vec<GraphEdge>,
    pub stats: GraphStats,
    pub diagnostics: Vec<Diagnostic>,
}

impl Graph {
    /// Returns the node with the given id.
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Index of the node with the given id.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    /// Node ids in table order.
    pub fn node_ids(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

//! Graph construction from the extracted roster table.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::artifact::ParsedArtifact;
use crate::config::TableConfig;
use crate::error::AppError;
use crate::models::{Diagnostic, Graph, GraphEdge, GraphNode, GraphStats};

/// Delimiters accepted between peer ids in the relationship column.
const CONNECTION_DELIMITERS: [char; 3] = ['|', ',', ';'];

/// Builds an undirected, deduplicated graph from a [`ParsedArtifact`].
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    id_columns: Vec<String>,
    relationship_column: String,
    label_columns: Vec<String>,
}

/// Node data collected before edges are resolved.
struct PendingNode {
    id: String,
    label: String,
    attributes: BTreeMap<String, String>,
    declared: Vec<String>,
}

impl GraphBuilder {
    pub fn from_config(config: &TableConfig) -> Self {
        Self {
            id_columns: config.id_columns.clone(),
            relationship_column: config.relationship_column.clone(),
            label_columns: config.label_columns.clone(),
        }
    }

    /// Builds the graph.
    ///
    /// Self references, unresolved references and rows without an id are
    /// reported as diagnostics; the graph stays usable even with no edges.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::MissingIdColumn`] if the header has none of the
    /// identifying column names.
    pub fn build(&self, artifact: &ParsedArtifact) -> Result<Graph, AppError> {
        let id_column = artifact
            .first_column(&self.id_columns)
            .ok_or_else(|| AppError::MissingIdColumn(self.id_columns.join(", ")))?;
        let relationship_column = artifact.column(&self.relationship_column);
        let label_column = artifact.first_column(&self.label_columns);

        let mut diagnostics = Vec::new();
        let mut pending: Vec<PendingNode> = Vec::new();
        let mut known: HashSet<String> = HashSet::new();

        for (i, row) in artifact.rows.iter().enumerate() {
            let id = row.get(id_column).unwrap_or_default().trim();
            if id.is_empty() {
                diagnostics.push(Diagnostic::MissingId { row: i + 1 });
                continue;
            }
            if !known.insert(id.to_string()) {
                diagnostics.push(Diagnostic::DuplicateNode {
                    row: i + 1,
                    id: id.to_string(),
                });
                continue;
            }

            let label = label_column
                .and_then(|c| row.get(c))
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .unwrap_or(id);
            let declared = relationship_column
                .and_then(|c| row.get(c))
                .map(parse_connections)
                .unwrap_or_default();

            pending.push(PendingNode {
                id: id.to_string(),
                label: label.to_string(),
                attributes: row
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                declared,
            });
        }

        let mut edges: BTreeSet<GraphEdge> = BTreeSet::new();
        let mut adjacency: HashMap<&str, BTreeSet<&str>> = pending
            .iter()
            .map(|n| (n.id.as_str(), BTreeSet::new()))
            .collect();
        let mut unresolved = 0;

        for node in &pending {
            for peer in &node.declared {
                if peer == &node.id {
                    diagnostics.push(Diagnostic::SelfReference {
                        id: node.id.clone(),
                    });
                    continue;
                }
                let Some(&peer) = adjacency.get_key_value(peer.as_str()).map(|(key, _)| key) else {
                    unresolved += 1;
                    diagnostics.push(Diagnostic::UnresolvedReference {
                        source: node.id.clone(),
                        target: peer.clone(),
                    });
                    continue;
                };
                if edges.insert(GraphEdge::canonical(&node.id, peer)) {
                    adjacency.entry(node.id.as_str()).or_default().insert(peer);
                    adjacency.entry(peer).or_default().insert(node.id.as_str());
                }
            }
        }

        let components = count_components(&pending, &adjacency);
        let nodes: Vec<GraphNode> = pending
            .iter()
            .map(|n| GraphNode {
                id: n.id.clone(),
                label: n.label.clone(),
                attributes: n.attributes.clone(),
                connections: adjacency
                    .get(n.id.as_str())
                    .map(|peers| peers.iter().map(|p| p.to_string()).collect())
                    .unwrap_or_default(),
                declared_connections: n.declared.clone(),
            })
            .collect();

        let stats = GraphStats {
            node_count: nodes.len(),
            edge_count: edges.len(),
            isolated_node_count: nodes.iter().filter(|n| n.connections.is_empty()).count(),
            unresolved_connection_count: unresolved,
            connected_component_count: components,
        };

        if !diagnostics.is_empty() {
            tracing::warn!(count = diagnostics.len(), "Graph built with diagnostics");
        }
        tracing::debug!(
            nodes = stats.node_count,
            edges = stats.edge_count,
            components = stats.connected_component_count,
            "Built graph"
        );

        Ok(Graph {
            nodes,
            edges: edges.into_iter().collect(),
            stats,
            diagnostics,
        })
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::from_config(&TableConfig::default())
    }
}

/// Splits a relationship cell into distinct peer tokens, in declaration order.
pub fn parse_connections(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.split(CONNECTION_DELIMITERS)
        .map(str::trim)
        .filter(|token| !token.is_empty() && seen.insert(*token))
        .map(str::to_string)
        .collect()
}

/// Counts connected components with an iterative depth-first search.
fn count_components(nodes: &[PendingNode], adjacency: &HashMap<&str, BTreeSet<&str>>) -> usize {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut components = 0;

    for node in nodes {
        if visited.contains(node.id.as_str()) {
            continue;
        }
        components += 1;
        let mut stack = vec![node.id.as_str()];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            if let Some(peers) = adjacency.get(current) {
                stack.extend(peers.iter().filter(|p| !visited.contains(*p)));
            }
        }
    }
    components
}

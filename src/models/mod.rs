//! Data models for the produced graph and its diagnostics.

mod diagnostic;
mod graph;

pub use diagnostic::{Diagnostic, RowRepair};
pub use graph::{Graph, GraphEdge, GraphNode, GraphStats};

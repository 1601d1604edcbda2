//! Roster graph construction.
//!
//! Turns a [`ParsedArtifact`](crate::artifact::ParsedArtifact) into a
//! [`Graph`](crate::models::Graph): one node per distinct id, one edge per
//! unordered pair of connected ids, and non-fatal diagnostics for everything
//! that could not be resolved.
//!
//! # Usage
//!
//! ```
//! use rostergraph::artifact::ArtifactExtractor;
//! use rostergraph::graph::GraphBuilder;
//!
//! let extraction = ArtifactExtractor::default()
//!     .extract("id,connections\n1,2|3\n2,1\n3,")
//!     .unwrap();
//! let graph = GraphBuilder::default().build(&extraction.artifact).unwrap();
//!
//! assert_eq!(graph.nodes.len(), 3);
//! assert_eq!(graph.edges.len(), 2);
//! ```

mod builder;

pub use builder::{parse_connections, GraphBuilder};

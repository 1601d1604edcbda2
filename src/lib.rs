//! Rostergraph - agent roster graphs from streamed model output.
//!
//! Decodes a model's event stream, separates reasoning from the answer,
//! extracts the roster table it contains, builds a deduplicated graph and
//! lays it out for direct manipulation.

pub mod artifact;
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod interaction;
pub mod layout;
pub mod models;
pub mod pipeline;
pub mod reasoning;
pub mod stream;

//! Roster table extraction from model output.
//!
//! - `record` - pest grammar for one quote-aware comma-separated line
//! - `table` - `Record`, `ParsedArtifact` and `Extraction`
//! - `extract` - header detection, row collection and alignment

mod extract;
mod record;
mod table;

pub use extract::ArtifactExtractor;
pub use record::{split_record, Field};
pub use table::{Extraction, ParsedArtifact, Record};

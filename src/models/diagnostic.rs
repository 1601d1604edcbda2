//! Non-fatal anomalies found while extracting the table or building the graph.

use serde::{Deserialize, Serialize};

/// How a ragged row was brought to the header's width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowRepair {
    /// Missing trailing values were filled with empty strings.
    Padded,
    /// Overflow values were merged into the last column.
    Merged,
}

/// A row- or reference-level anomaly. Never aborts extraction or building.
///
/// `line` values are 1-based line numbers inside the table block, the header
/// being line 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Row had a different number of fields than the header.
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
        repair: RowRepair,
    },
    /// Row repeated the header and was dropped.
    RepeatedHeader { line: usize },
    /// Row reused an id that was already kept and was dropped.
    DuplicateId { line: usize, id: String },
    /// Row had an empty identifying column and produced no node.
    MissingId { row: usize },
    /// Row's trimmed id matched a node already built; no second node is made.
    DuplicateNode { row: usize, id: String },
    /// Row listed itself as a connection.
    SelfReference { id: String },
    /// Row listed a connection to an id that no row defines.
    UnresolvedReference { source: String, target: String },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::RaggedRow {
                line,
                expected,
                found,
                repair,
            } => {
                let action = match repair {
                    RowRepair::Padded => "padded",
                    RowRepair::Merged => "merged overflow into last column",
                };
                write!(
                    f,
                    "Line {}: expected {} fields, found {} ({})",
                    line, expected, found, action
                )
            }
            Diagnostic::RepeatedHeader { line } => {
                write!(f, "Line {}: repeated header ignored", line)
            }
            Diagnostic::DuplicateId { line, id } => {
                write!(f, "Line {}: duplicate id '{}' ignored", line, id)
            }
            Diagnostic::MissingId { row } => write!(f, "Row {} is missing an id", row),
            Diagnostic::DuplicateNode { row, id } => {
                write!(f, "Row {}: duplicate node '{}' ignored", row, id)
            }
            Diagnostic::SelfReference { id } => {
                write!(f, "Self-connection ignored for '{}'", id)
            }
            Diagnostic::UnresolvedReference { source, target } => {
                write!(f, "Unresolved connection ignored: '{}' -> '{}'", source, target)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let diag = Diagnostic::UnresolvedReference {
            source: "a1".into(),
            target: "zz".into(),
        };
        assert_eq!(diag.to_string(), "Unresolved connection ignored: 'a1' -> 'zz'");
    }

    #[test]
    fn test_serialize_tagged() {
        let diag = Diagnostic::SelfReference { id: "7".into() };
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "self_reference", "id": "7"}));
    }
}

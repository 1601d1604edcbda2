//! Quote-aware splitting of one comma-separated line.

use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "artifact/record.pest"]
struct RecordParser;

/// One field of a parsed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Unquoted, unescaped and trimmed value.
    pub value: String,
    /// Byte range of the raw field in the line.
    pub start: usize,
    pub end: usize,
}

/// Splits a line into fields, honoring double-quoted fields.
///
/// # Example
///
/// ```
/// use rostergraph::artifact::split_record;
///
/// let values: Vec<String> = split_record(r#"a1, "Hi, ""you""", b"#)
///     .into_iter()
///     .map(|f| f.value)
///     .collect();
/// assert_eq!(values, vec!["a1", r#"Hi, "you""#, "b"]);
/// ```
pub fn split_record(line: &str) -> Vec<Field> {
    let pairs = match RecordParser::parse(Rule::record, line) {
        Ok(pairs) => pairs,
        Err(e) => {
            // Unreachable with the current grammar, which accepts any line
            tracing::debug!(error = %e, "Record grammar rejected line");
            return split_plain(line);
        }
    };

    let mut fields = Vec::new();
    for pair in pairs.flatten() {
        let span = pair.as_span();
        let value = match pair.as_rule() {
            Rule::bare_field => pair.as_str().trim().to_string(),
            Rule::quoted_field => pair
                .clone()
                .into_inner()
                .find(|inner| inner.as_rule() == Rule::quoted)
                .map(|inner| inner.as_str().replace("\"\"", "\"").trim().to_string())
                .unwrap_or_default(),
            _ => continue,
        };
        fields.push(Field {
            value,
            start: span.start(),
            end: span.end(),
        });
    }
    fields
}

fn split_plain(line: &str) -> Vec<Field> {
    let mut fields = Vec::new();
    let mut start = 0;
    for part in line.split(',') {
        fields.push(Field {
            value: part.trim().to_string(),
            start,
            end: start + part.len(),
        });
        start += part.len() + 1;
    }
    fields
}

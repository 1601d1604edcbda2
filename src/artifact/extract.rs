//! Locating and parsing the roster table inside free-form model output.

use std::collections::HashSet;

use super::record::{split_record, Field};
use super::table::{Extraction, ParsedArtifact, Record};
use crate::config::TableConfig;
use crate::models::{Diagnostic, RowRepair};

const FENCE: &str = "```";

/// Finds the single comma-separated table in model output.
///
/// Extraction is a pure function of its input: the same text always yields
/// the same [`Extraction`], so callers can re-run it over a growing buffer.
#[derive(Debug, Clone)]
pub struct ArtifactExtractor {
    sentinels: Vec<String>,
    id_columns: Vec<String>,
    max_header_words: usize,
}

impl ArtifactExtractor {
    pub fn from_config(config: &TableConfig) -> Self {
        Self {
            sentinels: config.sentinel_columns(),
            id_columns: config.id_columns.iter().map(|c| c.to_lowercase()).collect(),
            max_header_words: config.max_header_words.max(1),
        }
    }

    /// Extracts the table, or `None` when no header line exists yet.
    ///
    /// Fenced blocks are searched first; the whole text is the fallback.
    pub fn extract(&self, text: &str) -> Option<Extraction> {
        fenced_blocks(text)
            .into_iter()
            .chain(std::iter::once(text.trim()))
            .find_map(|region| self.extract_region(region))
    }

    fn extract_region(&self, region: &str) -> Option<Extraction> {
        let lines: Vec<&str> = region.lines().collect();
        let (header_at, header_fields) = lines
            .iter()
            .enumerate()
            .find_map(|(i, line)| self.header_fields(line).map(|fields| (i, fields)))?;

        let headers = unique_headers(&header_fields);
        let header_keys: Vec<String> = header_fields.iter().map(|h| h.to_lowercase()).collect();
        let id_index = self
            .id_columns
            .iter()
            .find_map(|id| header_keys.iter().position(|h| h == id));

        let mut rows = Vec::new();
        let mut diagnostics = Vec::new();
        let mut seen_ids = HashSet::new();

        for (offset, raw) in lines[header_at + 1..].iter().enumerate() {
            let line = raw.trim();
            if line.is_empty() || !line.contains(',') {
                break;
            }
            // Header is line 1 of the block
            let line_no = offset + 2;
            let fields = split_record(line);

            if is_header_repeat(&fields, &header_keys) {
                diagnostics.push(Diagnostic::RepeatedHeader { line: line_no });
                continue;
            }

            let values = align(line, &fields, headers.len(), line_no, &mut diagnostics);
            let record = match Record::new(&headers, values) {
                Ok(record) => record,
                Err(e) => {
                    tracing::debug!(error = %e, line = line_no, "Dropping unaligned row");
                    continue;
                }
            };
            if record.is_blank() {
                continue;
            }

            if let Some(idx) = id_index {
                let id = record.values().nth(idx).unwrap_or_default();
                if !id.is_empty() && !seen_ids.insert(id.to_string()) {
                    diagnostics.push(Diagnostic::DuplicateId {
                        line: line_no,
                        id: id.to_string(),
                    });
                    continue;
                }
            }

            rows.push(record);
        }

        Some(Extraction {
            artifact: ParsedArtifact { headers, rows },
            diagnostics,
        })
    }

    /// Normalized header names if `line` is a table header.
    fn header_fields(&self, line: &str) -> Option<Vec<String>> {
        let line = line.trim();
        if !line.contains(',') || looks_like_prose(line) {
            return None;
        }

        let fields: Vec<String> = split_record(line)
            .iter()
            .map(|f| normalize_header(&f.value))
            .collect();

        if fields
            .iter()
            .any(|f| f.split_whitespace().count() > self.max_header_words)
        {
            return None;
        }

        let is_header = fields
            .iter()
            .any(|f| self.sentinels.contains(&f.to_lowercase()));
        is_header.then_some(fields)
    }
}

impl Default for ArtifactExtractor {
    fn default() -> Self {
        Self::from_config(&TableConfig::default())
    }
}

/// Interiors of fenced blocks in order; an unclosed fence runs to the end.
fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut open_at: Option<usize> = None;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();
        if !line.trim_start().starts_with(FENCE) {
            continue;
        }
        match open_at.take() {
            Some(body_start) => blocks.push(&text[body_start..line_start]),
            None => open_at = Some(offset),
        }
    }
    if let Some(body_start) = open_at {
        blocks.push(&text[body_start..]);
    }
    blocks
}

/// Numbered or bulleted prose, questions and lead-in sentences.
fn looks_like_prose(line: &str) -> bool {
    if line.ends_with('?') || line.ends_with(':') {
        return true;
    }
    if line.starts_with("- ") || line.starts_with("* ") || line.starts_with("• ") {
        return true;
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    digits > 0 && matches!(line[digits..].chars().next(), Some('.') | Some(')'))
}

fn normalize_header(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '`' | '*'))
        .trim()
        .to_string()
}

/// Fills empty names and suffixes duplicates so every header is unique.
fn unique_headers(fields: &[String]) -> Vec<String> {
    let mut headers: Vec<String> = Vec::with_capacity(fields.len());
    for (i, field) in fields.iter().enumerate() {
        let base = if field.is_empty() {
            format!("column_{}", i + 1)
        } else {
            field.clone()
        };
        let mut name = base.clone();
        let mut n = 2;
        while headers.iter().any(|h| h.eq_ignore_ascii_case(&name)) {
            name = format!("{}_{}", base, n);
            n += 1;
        }
        headers.push(name);
    }
    headers
}

fn is_header_repeat(fields: &[Field], header_keys: &[String]) -> bool {
    fields.len() == header_keys.len()
        && fields
            .iter()
            .zip(header_keys)
            .all(|(f, h)| normalize_header(&f.value).eq_ignore_ascii_case(h))
}

/// Pads short rows and merges overflow into the last column.
fn align(
    line: &str,
    fields: &[Field],
    width: usize,
    line_no: usize,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<String> {
    let found = fields.len();
    if found == width || width == 0 {
        return fields.iter().map(|f| f.value.clone()).collect();
    }

    let repair = if found < width {
        RowRepair::Padded
    } else {
        RowRepair::Merged
    };
    diagnostics.push(Diagnostic::RaggedRow {
        line: line_no,
        expected: width,
        found,
        repair,
    });

    let mut values: Vec<String> = fields.iter().take(width).map(|f| f.value.clone()).collect();
    match repair {
        RowRepair::Padded => values.resize(width, String::new()),
        RowRepair::Merged => {
            // Re-join the raw overflow text to recover unescaped commas
            let start = fields[width - 1].start;
            let end = fields[found - 1].end;
            values[width - 1] = line[start..end].trim().to_string();
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Option<Extraction> {
        ArtifactExtractor::default().extract(text)
    }

    fn ids(extraction: &Extraction, column: &str) -> Vec<String> {
        extraction
            .artifact
            .rows
            .iter()
            .map(|r| r.get(column).unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_plain_table() {
        let x = extract("agent_id,connections,system_prompt\n1,2,Hi\n2,1,Yo").unwrap();
        assert_eq!(x.artifact.headers, vec!["agent_id", "connections", "system_prompt"]);
        assert_eq!(ids(&x, "agent_id"), vec!["1", "2"]);
        assert!(x.diagnostics.is_empty());
    }

    #[test]
    fn test_no_header_is_none() {
        assert!(extract("Let me think about the population first.").is_none());
        assert!(extract("a,b,c\n1,2,3").is_none());
    }

    #[test]
    fn test_fenced_block_with_preamble() {
        let text = "Sure! Here is the roster, as requested.\n\n```csv\nagent_id,name\nA1,Ada\nA2,Bo\n```\n\nLet me know if you need more.";
        let x = extract(text).unwrap();
        assert_eq!(ids(&x, "name"), vec!["Ada", "Bo"]);
    }

    #[test]
    fn test_unterminated_fence_while_streaming() {
        let x = extract("```\nid,connections\n1,2\n2,").unwrap();
        assert_eq!(ids(&x, "id"), vec!["1", "2"]);
    }

    #[test]
    fn test_fence_without_table_falls_back() {
        let text = "```python\nprint('hi')\n```\nid,connections\n1,";
        let x = extract(text).unwrap();
        assert_eq!(ids(&x, "id"), vec!["1"]);
    }

    #[test]
    fn test_header_only_is_pending() {
        let x = extract("agent_id,connections,system_prompt\n").unwrap();
        assert!(x.artifact.is_pending());
        assert_eq!(x.artifact.headers.len(), 3);
    }

    #[test]
    fn test_rejects_numbered_prose_and_questions() {
        let text = "1. agent_id, connections\nWhat about agent_id, connections?\nid,connections\n7,";
        let x = extract(text).unwrap();
        assert_eq!(x.artifact.headers, vec!["id", "connections"]);
        assert_eq!(ids(&x, "id"), vec!["7"]);
    }

    #[test]
    fn test_rejects_sentence_mentioning_columns() {
        let text = "Each row has agent_id, connections and a system prompt for the agent\nagent_id,connections\nx,";
        let x = extract(text).unwrap();
        assert_eq!(x.artifact.headers, vec!["agent_id", "connections"]);
    }

    #[test]
    fn test_quoted_header_names() {
        let x = extract("\"agent_id\",\"connections\"\n1,").unwrap();
        assert_eq!(x.artifact.headers, vec!["agent_id", "connections"]);
    }

    #[test]
    fn test_repeated_header_dropped() {
        let x = extract("id,connections\nid,connections\n1,2\n2,1").unwrap();
        assert_eq!(ids(&x, "id"), vec!["1", "2"]);
        assert_eq!(x.diagnostics, vec![Diagnostic::RepeatedHeader { line: 2 }]);
    }

    #[test]
    fn test_repeated_header_case_insensitive() {
        let x = extract("Agent_ID,Connections\nagent_id, CONNECTIONS\n1,").unwrap();
        assert_eq!(x.artifact.rows.len(), 1);
    }

    #[test]
    fn test_duplicate_id_dropped() {
        let x = extract("id,name\n1,Ada\n1,Impostor\n2,Bo").unwrap();
        assert_eq!(ids(&x, "name"), vec!["Ada", "Bo"]);
        assert_eq!(
            x.diagnostics,
            vec![Diagnostic::DuplicateId {
                line: 3,
                id: "1".into()
            }]
        );
    }

    #[test]
    fn test_short_row_padded() {
        let x = extract("id,connections,system_prompt\n1,2").unwrap();
        let row = &x.artifact.rows[0];
        assert_eq!(row.get("system_prompt"), Some(""));
        assert_eq!(
            x.diagnostics,
            vec![Diagnostic::RaggedRow {
                line: 2,
                expected: 3,
                found: 2,
                repair: RowRepair::Padded
            }]
        );
    }

    #[test]
    fn test_long_row_merged_into_last_column() {
        let x = extract("id,connections,system_prompt\n1,2|3,You are calm, kind, and curious").unwrap();
        let row = &x.artifact.rows[0];
        assert_eq!(row.get("connections"), Some("2|3"));
        assert_eq!(row.get("system_prompt"), Some("You are calm, kind, and curious"));
        assert!(matches!(
            x.diagnostics[0],
            Diagnostic::RaggedRow {
                repair: RowRepair::Merged,
                found: 5,
                ..
            }
        ));
    }

    #[test]
    fn test_quoted_values() {
        let x = extract("id,system_prompt\n1,\"You say \"\"hi\"\", then leave\"").unwrap();
        assert_eq!(
            x.artifact.rows[0].get("system_prompt"),
            Some("You say \"hi\", then leave")
        );
        assert!(x.diagnostics.is_empty());
    }

    #[test]
    fn test_block_ends_at_blank_or_prose_line() {
        let x = extract("id,connections\n1,2\n2,1\nThat is all.\n3,1").unwrap();
        assert_eq!(ids(&x, "id"), vec!["1", "2"]);
        let y = extract("id,connections\n1,2\n\n3,1").unwrap();
        assert_eq!(ids(&y, "id"), vec!["1"]);
    }

    #[test]
    fn test_blank_rows_skipped() {
        let x = extract("id,connections\n,\n1,").unwrap();
        assert_eq!(ids(&x, "id"), vec!["1"]);
    }

    #[test]
    fn test_duplicate_header_names_made_unique() {
        let x = extract("id,name,name\n1,a,b").unwrap();
        assert_eq!(x.artifact.headers, vec!["id", "name", "name_2"]);
    }

    #[test]
    fn test_idempotent() {
        let text = "<noise>\n```\nagent_id,connections\n1,2\n2,1|9\n```";
        assert_eq!(extract(text), extract(text));
    }

    #[test]
    fn test_fenced_blocks() {
        let blocks = fenced_blocks("a\n```csv\nx,y\n```\nb\n```\nopen");
        assert_eq!(blocks, vec!["x,y\n", "open"]);
    }
}

//! Table types produced by the extractor.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::AppError;
use crate::models::Diagnostic;

/// One table row: an ordered mapping from header name to value.
///
/// A record always has exactly one value per header; construction fails
/// otherwise, so alignment has to happen before a record exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    /// Creates a record from values aligned with `headers`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidRecord`] if the counts differ.
    pub fn new(headers: &[String], values: Vec<String>) -> Result<Self, AppError> {
        if headers.len() != values.len() {
            return Err(AppError::InvalidRecord {
                expected: headers.len(),
                found: values.len(),
            });
        }
        Ok(Self {
            fields: headers.iter().cloned().zip(values).collect(),
        })
    }

    /// Gets a value by column name (case-insensitive).
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, value)| value.as_str())
    }

    /// Iterates `(column, value)` pairs in header order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Values in header order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(_, v)| v.as_str())
    }

    /// Returns the number of columns in this record.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no columns.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether every value is empty.
    pub fn is_blank(&self) -> bool {
        self.fields.iter().all(|(_, v)| v.is_empty())
    }
}

impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// The single table found in model output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedArtifact {
    /// Unique column names in header order.
    pub headers: Vec<String>,
    /// Rows aligned to `headers`.
    pub rows: Vec<Record>,
}

impl ParsedArtifact {
    /// A header without rows yet: the table is still streaming in.
    pub fn is_pending(&self) -> bool {
        self.rows.is_empty()
    }

    /// Resolves a column name case-insensitively to its header spelling.
    pub fn column(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.eq_ignore_ascii_case(name))
            .map(String::as_str)
    }

    /// First of `candidates` present in the header.
    pub fn first_column<'a, I>(&self, candidates: I) -> Option<&str>
    where
        I: IntoIterator<Item = &'a String>,
    {
        candidates.into_iter().find_map(|c| self.column(c))
    }
}

/// Extraction result: the table plus the row anomalies met on the way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Extraction {
    pub artifact: ParsedArtifact,
    pub diagnostics: Vec<Diagnostic>,
}

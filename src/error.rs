//! Application error types.

use thiserror::Error;

/// Application-level errors for rostergraph.
///
/// Row-level anomalies are not errors: they are reported as
/// [`Diagnostic`](crate::models::Diagnostic) values alongside the result.
#[derive(Error, Debug)]
pub enum AppError {
    // Stream errors
    #[error("Stream transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Model stream reported an error: {0}")]
    Protocol(String),

    #[error("Stream read timed out after {0} seconds")]
    Timeout(u64),

    // Table errors
    #[error("Record has {found} values but the header has {expected} columns")]
    InvalidRecord { expected: usize, found: usize },

    #[error("Artifact has no identifying column (expected one of: {0})")]
    MissingIdColumn(String),

    // Output errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl AppError {
    /// Whether this error ends the stream (as opposed to being skippable).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Transport(_) | AppError::Protocol(_) | AppError::Timeout(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_is_fatal() {
        assert!(AppError::Protocol("rate limited".into()).is_fatal());
        assert!(!AppError::MissingIdColumn("agent_id, id".into()).is_fatal());
    }

    #[test]
    fn test_invalid_record_message() {
        let err = AppError::InvalidRecord {
            expected: 3,
            found: 2,
        };
        assert_eq!(
            err.to_string(),
            "Record has 2 values but the header has 3 columns"
        );
    }
}

//! Separation of model reasoning from the final answer.

use serde::Serialize;

use crate::config::ReasoningConfig;

/// Accumulated text split into its reasoning and final parts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReasoningSplit {
    pub reasoning: String,
    #[serde(rename = "final")]
    pub final_text: String,
}

/// Splits text on a paired start/end marker.
///
/// Only the last closing marker bounds the answer: models may repeat or nest
/// the opening marker, and stray markers before the close are stripped from
/// the reasoning.
#[derive(Debug, Clone)]
pub struct ReasoningSplitter {
    open: String,
    close: String,
}

impl ReasoningSplitter {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }

    pub fn from_config(config: &ReasoningConfig) -> Self {
        Self::new(config.open_marker.clone(), config.close_marker.clone())
    }

    /// Whether the text contains an opening marker.
    pub fn has_open_marker(&self, text: &str) -> bool {
        !self.open.is_empty() && text.contains(self.open.as_str())
    }

    /// Splits `text`.
    ///
    /// Without a closing marker, `assume_unterminated` decides whether the
    /// whole text is (still open) reasoning or already the final answer.
    pub fn split(&self, text: &str, assume_unterminated: bool) -> ReasoningSplit {
        let close_at = if self.close.is_empty() {
            None
        } else {
            text.rfind(self.close.as_str())
        };

        match close_at {
            Some(pos) => ReasoningSplit {
                reasoning: self.strip_markers(&text[..pos]),
                final_text: text[pos + self.close.len()..].trim().to_string(),
            },
            None if assume_unterminated => ReasoningSplit {
                reasoning: self.strip_markers(text),
                final_text: String::new(),
            },
            None => ReasoningSplit {
                reasoning: String::new(),
                final_text: text.trim().to_string(),
            },
        }
    }

    fn strip_markers(&self, text: &str) -> String {
        let mut stripped = text.to_string();
        for marker in [&self.open, &self.close] {
            if !marker.is_empty() {
                stripped = stripped.replace(marker.as_str(), "");
            }
        }
        stripped.trim().to_string()
    }
}

impl Default for ReasoningSplitter {
    fn default() -> Self {
        Self::from_config(&ReasoningConfig::default())
    }
}

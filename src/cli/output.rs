//! Result rendering for stdout.

use serde::Serialize;

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON (default).
    #[default]
    Json,
    /// TOON (Token-Oriented Object Notation) - compact, for feeding back to a model.
    Toon,
}

/// Serializes `value` in the requested format.
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> color_eyre::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Toon => serde_toon::to_string(value)
            .map_err(|e| color_eyre::eyre::eyre!("TOON serialization error: {}", e)),
    }
}

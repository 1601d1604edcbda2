//! Extract subcommand - one-shot derivation over a text file.

use std::path::PathBuf;

use clap::Parser;

use super::output::{render, OutputFormat};
use crate::config::Config;
use crate::pipeline::Session;

/// Extract the roster graph from accumulated model output.
#[derive(Parser)]
pub struct ExtractCommand {
    /// File holding the accumulated model output.
    pub input: PathBuf,

    /// Treat the text as a stream still in progress.
    #[arg(long)]
    pub in_flight: bool,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

impl ExtractCommand {
    /// Run the extract command.
    pub fn run(self, config: &Config) -> color_eyre::Result<()> {
        let text = std::fs::read_to_string(&self.input)?;

        let mut session = Session::new(config);
        session.ingest(&text);
        if !self.in_flight {
            session.mark_complete();
        }

        tracing::info!(
            input = %self.input.display(),
            status = ?session.status(),
            "Extracted"
        );
        println!("{}", render(&session.snapshot(), self.format)?);
        Ok(())
    }
}

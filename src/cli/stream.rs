//! Stream subcommand - incremental decoding of an event-stream capture.

use std::path::PathBuf;

use clap::Parser;

use super::output::{render, OutputFormat};
use crate::config::Config;
use crate::pipeline::Session;
use crate::stream::read_chunks;

/// Decode a model event stream and print the final snapshot.
#[derive(Parser)]
pub struct StreamCommand {
    /// Event-stream capture. Reads stdin when omitted.
    pub input: Option<PathBuf>,

    /// Deadline for the whole read, in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

impl StreamCommand {
    /// Run the stream command.
    ///
    /// On a failed read the partial snapshot (marked incomplete) is still
    /// printed before the error is returned.
    pub async fn run(self, mut config: Config) -> color_eyre::Result<()> {
        if self.timeout.is_some() {
            config.stream.timeout_secs = self.timeout;
        }
        let capacity = config.stream.read_buffer_size;
        let mut session = Session::new(&config);
        tracing::info!(session = %session.id(), "Reading model stream");

        let mut last_status = session.status();
        let on_update = |s: &Session| {
            if s.status() != last_status {
                tracing::info!(status = ?s.status(), received = s.text().len(), "Artifact status changed");
                last_status = s.status();
            }
        };

        let result = match &self.input {
            Some(path) => {
                let file = tokio::fs::File::open(path).await?;
                session.run(read_chunks(file, capacity), on_update).await
            }
            None => {
                session
                    .run(read_chunks(tokio::io::stdin(), capacity), on_update)
                    .await
            }
        };

        println!("{}", render(&session.snapshot(), self.format)?);
        result?;
        Ok(())
    }
}

//! CLI module for rostergraph.
//!
//! Subcommands:
//! - `extract`: Split, extract and build the graph from accumulated text
//! - `stream`: Decode an event-stream capture incrementally
//! - `layout`: Run the layout engine and print projected nodes

mod extract;
mod layout;
mod output;
mod stream;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;

pub use extract::ExtractCommand;
pub use layout::LayoutCommand;
pub use output::{render, OutputFormat};
pub use stream::StreamCommand;

/// Rostergraph - agent roster graphs from streamed model output
#[derive(Parser)]
#[command(name = "rostergraph")]
#[command(about = "Turn streamed model output into an agent roster graph")]
#[command(version)]
pub struct App {
    /// Run in verbose mode
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project config file to use instead of `.rostergraph.toml`
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Extract the roster graph from a file of accumulated model output
    Extract(ExtractCommand),

    /// Decode a model event stream from a file or stdin
    Stream(StreamCommand),

    /// Lay out the roster graph and print projected node positions
    Layout(LayoutCommand),
}

impl App {
    /// Run the CLI application.
    pub async fn run(self) -> color_eyre::Result<()> {
        let config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };

        match self.command {
            Command::Extract(cmd) => cmd.run(&config),
            Command::Stream(cmd) => cmd.run(config).await,
            Command::Layout(cmd) => cmd.run(&config),
        }
    }
}

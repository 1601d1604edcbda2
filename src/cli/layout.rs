//! Layout subcommand - run the layout engine headless.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::eyre;

use super::output::{render, OutputFormat};
use crate::config::Config;
use crate::interaction::Engine;
use crate::layout::{LayoutKind, Viewport};
use crate::pipeline::Session;

/// Lay out the roster graph and print projected node positions.
#[derive(Parser)]
pub struct LayoutCommand {
    /// File holding the accumulated model output.
    pub input: PathBuf,

    /// Layout strategy (defaults to `layout.mode` from config).
    #[arg(long, value_enum)]
    pub mode: Option<LayoutKind>,

    /// Viewport width in pixels.
    #[arg(long, default_value_t = 800.0)]
    pub width: f32,

    /// Viewport height in pixels.
    #[arg(long, default_value_t = 600.0)]
    pub height: f32,

    /// Frames to simulate before projecting.
    #[arg(long, default_value_t = 60)]
    pub frames: usize,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

impl LayoutCommand {
    /// Run the layout command.
    pub fn run(self, config: &Config) -> color_eyre::Result<()> {
        let text = std::fs::read_to_string(&self.input)?;
        let mut session = Session::new(config);
        session.ingest(&text);
        session.mark_complete();

        let graph = session.graph().ok_or_else(|| {
            eyre!(
                "No roster table with an id column found in {}",
                self.input.display()
            )
        })?;

        let mut engine = Engine::from_config(config, Viewport::new(self.width, self.height));
        if let Some(mode) = self.mode {
            engine.set_mode(mode);
        }
        engine.set_graph(graph);
        for _ in 0..self.frames {
            engine.tick();
        }

        tracing::info!(
            mode = ?engine.kind(),
            nodes = engine.node_count(),
            frames = self.frames,
            at_rest = engine.is_at_rest(),
            "Layout computed"
        );
        println!("{}", render(&engine.frame(), self.format)?);
        Ok(())
    }
}

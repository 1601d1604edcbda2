//! Configuration with layered resolution using figment.
//!
//! Resolution order (highest priority last):
//! 1. Built-in defaults
//! 2. User config: `~/.config/rostergraph/config.toml` (XDG) or platform config dir
//! 3. Project config: `.rostergraph.toml`
//! 4. Environment variables: `ROSTERGRAPH_*`, nested keys separated by `__`
//!    (e.g. `ROSTERGRAPH_LAYOUT__SPRING_STIFFNESS=0.1`)
//!
//! Every value has a default, so an empty environment yields a usable config.
//! The numeric layout and interaction values are tuned for a browser-sized
//! viewport measured in pixels.
//!
//! ```toml
//! [reasoning]
//! open_marker = "<think>"
//! close_marker = "</think>"
//!
//! [table]
//! id_columns = ["agent_id", "id"]
//! relationship_column = "connections"
//!
//! [layout]
//! mode = "sphere"
//! spring_stiffness = 0.08
//! damping = 0.82
//!
//! [interaction]
//! click_threshold = 5.0
//! ```

use std::ops::Deref;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::layout::LayoutKind;

/// Boxed wrapper for figment::Error to reduce Result size on the stack.
#[derive(Debug)]
pub struct ConfigError(Box<figment::Error>);

impl Deref for ConfigError {
    type Target = figment::Error;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self(Box::new(err))
    }
}

/// Project config file name, looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = ".rostergraph.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "ROSTERGRAPH_";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub stream: StreamConfig,
    pub reasoning: ReasoningConfig,
    pub table: TableConfig,
    pub layout: LayoutConfig,
    pub interaction: InteractionConfig,
}

/// Event-stream framing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Prefix marking a payload line inside an event.
    pub data_prefix: String,
    /// Payload that signals the end of the stream.
    pub done_sentinel: String,
    /// Optional deadline for reading the whole stream.
    pub timeout_secs: Option<u64>,
    /// Read buffer size when pulling chunks from a reader.
    pub read_buffer_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            data_prefix: "data:".to_string(),
            done_sentinel: "[DONE]".to_string(),
            timeout_secs: None,
            read_buffer_size: 8 * 1024,
        }
    }
}

/// Reasoning marker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    pub open_marker: String,
    pub close_marker: String,
    /// Treat in-flight text as reasoning even before an opening marker shows up.
    pub assume_unmarked: bool,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            open_marker: "<think>".to_string(),
            close_marker: "</think>".to_string(),
            assume_unmarked: true,
        }
    }
}

/// Column naming for the roster table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Accepted names for the identifying column, in priority order.
    pub id_columns: Vec<String>,
    /// Column listing peer ids.
    pub relationship_column: String,
    /// Free-text column (e.g. the agent's system prompt).
    pub text_column: String,
    /// Batch/run identifier column.
    pub batch_column: String,
    /// Columns tried, in order, for a node's display label.
    pub label_columns: Vec<String>,
    /// Header fields with more words than this mark the line as prose.
    pub max_header_words: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            id_columns: vec!["agent_id".to_string(), "id".to_string()],
            relationship_column: "connections".to_string(),
            text_column: "system_prompt".to_string(),
            batch_column: "batch_id".to_string(),
            label_columns: vec![
                "name".to_string(),
                "label".to_string(),
                "display_name".to_string(),
            ],
            max_header_words: 3,
        }
    }
}

impl TableConfig {
    /// Column names whose presence marks a line as the table header.
    pub fn sentinel_columns(&self) -> Vec<String> {
        let mut names: Vec<String> = self.id_columns.iter().map(|c| c.to_lowercase()).collect();
        for extra in [
            &self.relationship_column,
            &self.text_column,
            &self.batch_column,
        ] {
            let lowered = extra.to_lowercase();
            if !lowered.is_empty() && !names.contains(&lowered) {
                names.push(lowered);
            }
        }
        names
    }
}

/// Layout physics and projection constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Strategy used for new sessions.
    pub mode: LayoutKind,
    /// Visual node radius in pixels.
    pub node_radius: f32,
    /// Extra space kept between the ring and the viewport edge.
    pub ring_margin: f32,
    /// Linear spring constant pulling nodes home.
    pub spring_stiffness: f32,
    /// Velocity multiplier applied every step.
    pub damping: f32,
    /// Speeds below this snap to zero.
    pub rest_epsilon: f32,
    /// Sphere diameter as a fraction of the smaller viewport side.
    pub sphere_fill: f32,
    /// Camera distance as a multiple of the sphere radius.
    pub camera_distance_factor: f32,
    /// Lower bound for the perspective denominator.
    pub denominator_floor: f32,
    /// Radius scale for the farthest nodes.
    pub min_depth_scale: f32,
    /// Radius scale for the nearest nodes.
    pub max_depth_scale: f32,
    /// Label opacity for the farthest nodes.
    pub min_label_opacity: f32,
    /// Angular velocity multiplier applied every idle frame.
    pub angular_damping: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            mode: LayoutKind::Sphere,
            node_radius: 14.0,
            ring_margin: 12.0,
            spring_stiffness: 0.08,
            damping: 0.82,
            rest_epsilon: 0.01,
            sphere_fill: 0.7,
            camera_distance_factor: 2.5,
            denominator_floor: 40.0,
            min_depth_scale: 0.55,
            max_depth_scale: 1.25,
            min_label_opacity: 0.25,
            angular_damping: 0.94,
        }
    }
}

/// Pointer handling constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Gestures moving less than this many pixels count as clicks.
    pub click_threshold: f32,
    /// Extra pixels around a node's radius that still grab it.
    pub grab_margin: f32,
    /// Radians of camera rotation per pixel of drag.
    pub rotate_sensitivity: f32,
    /// Zoom change per unit of wheel delta.
    pub zoom_sensitivity: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            click_threshold: 5.0,
            grab_margin: 6.0,
            rotate_sensitivity: 0.005,
            zoom_sensitivity: 0.001,
            min_zoom: 0.4,
            max_zoom: 3.0,
        }
    }
}

impl Config {
    /// Load config with layered resolution (defaults → user → project → env).
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment(Path::new(PROJECT_CONFIG_FILE))
            .extract()
            .map_err(ConfigError::from)
    }

    /// Load config using an explicit project file instead of `.rostergraph.toml`.
    pub fn load_from(project_file: &Path) -> Result<Self, ConfigError> {
        Self::figment(project_file)
            .extract()
            .map_err(ConfigError::from)
    }

    fn figment(project_file: &Path) -> Figment {
        Figment::new()
            // Layer 1: User config (lowest priority)
            .merge(Toml::file(Self::user_config_path()))
            // Layer 2: Project config
            .merge(Toml::file(project_file))
            // Layer 3: Environment variables (highest priority)
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// User config path: ~/.config/rostergraph/config.toml (XDG) or platform config dir.
    fn user_config_path() -> PathBuf {
        // Prefer XDG config location (~/.config) on all platforms
        if let Some(home) = dirs::home_dir() {
            let xdg_path = home.join(".config").join("rostergraph").join("config.toml");
            if xdg_path.exists() {
                return xdg_path;
            }
        }
        // Fall back to platform-specific config dir
        dirs::config_dir()
            .map(|p| p.join("rostergraph").join("config.toml"))
            .unwrap_or_default()
    }
}

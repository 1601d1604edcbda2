//! Projection, picking and pointer gestures.
//!
//! The [`Engine`] ties a layout strategy to a graph and turns pointer
//! events into selection changes or layout manipulation. A gesture whose
//! accumulated movement stays below `interaction.click_threshold` is a
//! click and selects (or clears); anything longer is a drag and never
//! touches the selection.

mod engine;
mod picking;

pub use engine::{Engine, Frame, FrameNode};
pub use picking::{pick, GestureOutcome, PickState, PointerEvent};

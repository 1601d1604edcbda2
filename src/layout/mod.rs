//! Spatial layout strategies.
//!
//! Two interchangeable strategies implement [`LayoutStrategy`]:
//!
//! - `ring` - 2-D ring of home positions with spring-damper relaxation
//! - `sphere` - 3-D golden-angle spiral over a sphere with a rotating camera
//!
//! A strategy owns the per-node layout state. It is initialized for a node
//! count, advanced once per frame with [`LayoutStrategy::step`] and read back
//! in screen space with [`LayoutStrategy::project`].

mod ring;
mod sphere;

pub use ring::{RingLayout, RingNode};
pub use sphere::{fibonacci_point, SphereLayout};

use bevy_math::Vec2;
use serde::{Deserialize, Serialize};

use crate::config::{InteractionConfig, LayoutConfig};

/// Which layout strategy a session uses.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    /// 2-D ring with springs.
    Ring,
    /// 3-D even sphere distribution.
    #[default]
    Sphere,
}

/// Screen area the graph is drawn into, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn min_side(&self) -> f32 {
        self.width.min(self.height)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

/// A node as it should be drawn this frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProjectedNode {
    /// Index into the graph's node list.
    pub index: usize,
    pub x: f32,
    pub y: f32,
    /// Apparent radius in pixels.
    pub radius: f32,
    /// 0 = farthest, 1 = nearest.
    pub depth: f32,
    pub label_opacity: f32,
}

impl ProjectedNode {
    pub fn screen(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// A layout algorithm that can be swapped per session.
pub trait LayoutStrategy {
    fn kind(&self) -> LayoutKind;

    /// Resets all layout state for `node_count` nodes.
    fn init(&mut self, node_count: usize, viewport: Viewport);

    /// Re-homes for a new viewport, keeping positions and velocities.
    fn resize(&mut self, viewport: Viewport);

    /// Permutes per-node state for the same node set in a new order.
    /// `order[new]` is the node's previous index.
    fn reorder(&mut self, order: &[usize]);

    /// Advances the simulation by one frame.
    fn step(&mut self);

    /// Screen-space positions for every node, in node order.
    fn project(&self) -> Vec<ProjectedNode>;

    /// Applies a pointer drag. `grabbed` is the node captured at pointer-down.
    fn drag(&mut self, grabbed: Option<usize>, pointer: Vec2, delta: Vec2);

    /// Ends a drag.
    fn release(&mut self, grabbed: Option<usize>);

    /// Applies a wheel delta (positive zooms out).
    fn zoom(&mut self, wheel_delta: f32);

    /// Whether nothing moves without further input.
    fn is_at_rest(&self) -> bool;
}

/// Creates the strategy for `kind`.
pub fn create_strategy(
    kind: LayoutKind,
    layout: &LayoutConfig,
    interaction: &InteractionConfig,
) -> Box<dyn LayoutStrategy> {
    match kind {
        LayoutKind::Ring => Box::new(RingLayout::new(layout.clone(), interaction.clone())),
        LayoutKind::Sphere => Box::new(SphereLayout::new(layout.clone(), interaction.clone())),
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Multiplicative zoom from a wheel delta, clamped to the configured range.
fn apply_zoom(zoom: f32, wheel_delta: f32, interaction: &InteractionConfig) -> f32 {
    let next = zoom * (-wheel_delta * interaction.zoom_sensitivity).exp();
    next.clamp(interaction.min_zoom, interaction.max_zoom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_clamped() {
        let interaction = InteractionConfig::default();
        assert!(apply_zoom(1.0, -100.0, &interaction) > 1.0);
        assert!(apply_zoom(1.0, 100.0, &interaction) < 1.0);
        assert_eq!(apply_zoom(1.0, 1e6, &interaction), interaction.min_zoom);
        assert_eq!(apply_zoom(1.0, -1e6, &interaction), interaction.max_zoom);
    }

    #[test]
    fn test_create_strategy_kind() {
        let layout = LayoutConfig::default();
        let interaction = InteractionConfig::default();
        for kind in [LayoutKind::Ring, LayoutKind::Sphere] {
            assert_eq!(create_strategy(kind, &layout, &interaction).kind(), kind);
        }
    }
}

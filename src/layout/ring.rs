//! 2-D ring layout with spring-damper relaxation.

use std::f32::consts::{FRAC_PI_2, TAU};

use bevy_math::Vec2;

use super::{apply_zoom, LayoutKind, LayoutStrategy, ProjectedNode, Viewport};
use crate::config::{InteractionConfig, LayoutConfig};

/// Physics state of one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingNode {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Resting spot on the ring.
    pub home: Vec2,
}

/// Nodes evenly spaced on a circle, each pulled home by a linear spring.
///
/// World coordinates are viewport pixels before zoom and pan.
#[derive(Debug, Clone)]
pub struct RingLayout {
    config: LayoutConfig,
    interaction: InteractionConfig,
    viewport: Viewport,
    nodes: Vec<RingNode>,
    /// Node under direct manipulation; excluded from physics.
    pinned: Option<usize>,
    /// Screen offset from the pointer to the pinned node's centre, fixed at grab.
    grab_offset: Vec2,
    zoom: f32,
    pan: Vec2,
}

impl RingLayout {
    pub fn new(config: LayoutConfig, interaction: InteractionConfig) -> Self {
        Self {
            config,
            interaction,
            viewport: Viewport::default(),
            nodes: Vec::new(),
            pinned: None,
            grab_offset: Vec2::ZERO,
            zoom: 1.0,
            pan: Vec2::ZERO,
        }
    }

    pub fn nodes(&self) -> &[RingNode] {
        &self.nodes
    }

    /// Ring radius that keeps every node inside the viewport.
    fn ring_radius(&self, viewport: Viewport) -> f32 {
        if self.nodes.len() <= 1 {
            return 0.0;
        }
        (viewport.min_side() / 2.0 - self.config.node_radius - self.config.ring_margin).max(0.0)
    }

    fn home(&self, index: usize, viewport: Viewport) -> Vec2 {
        let count = self.nodes.len().max(1) as f32;
        // Start at 12 o'clock
        let angle = TAU * index as f32 / count - FRAC_PI_2;
        viewport.center() + Vec2::new(angle.cos(), angle.sin()) * self.ring_radius(viewport)
    }

    fn rehome(&mut self, viewport: Viewport) {
        for i in 0..self.nodes.len() {
            self.nodes[i].home = self.home(i, viewport);
        }
    }

    /// Screen point to world point (inverse of zoom and pan).
    fn to_world(&self, screen: Vec2) -> Vec2 {
        let center = self.viewport.center();
        center + (screen - self.pan - center) / self.zoom
    }

    fn to_screen(&self, world: Vec2) -> Vec2 {
        let center = self.viewport.center();
        center + (world - center) * self.zoom + self.pan
    }

    /// Whether the next step would leave `node` where it is.
    fn is_settled(&self, node: &RingNode) -> bool {
        let pull = (node.home - node.position) * self.config.spring_stiffness * self.config.damping;
        node.velocity == Vec2::ZERO && pull.length() < self.config.rest_epsilon
    }

    /// Keeps a node drawn at `screen` fully inside the viewport.
    fn clamp_to_viewport(&self, screen: Vec2) -> Vec2 {
        let r = self.config.node_radius * self.zoom;
        let clamp_axis = |value: f32, extent: f32| {
            if extent <= 2.0 * r {
                extent / 2.0
            } else {
                value.clamp(r, extent - r)
            }
        };
        Vec2::new(
            clamp_axis(screen.x, self.viewport.width),
            clamp_axis(screen.y, self.viewport.height),
        )
    }
}

impl LayoutStrategy for RingLayout {
    fn kind(&self) -> LayoutKind {
        LayoutKind::Ring
    }

    fn init(&mut self, node_count: usize, viewport: Viewport) {
        self.viewport = viewport;
        self.pinned = None;
        self.grab_offset = Vec2::ZERO;
        self.nodes = vec![
            RingNode {
                position: Vec2::ZERO,
                velocity: Vec2::ZERO,
                home: Vec2::ZERO,
            };
            node_count
        ];
        self.rehome(viewport);
        for node in &mut self.nodes {
            node.position = node.home;
        }
    }

    fn resize(&mut self, viewport: Viewport) {
        let old_center = self.viewport.center();
        let old_radius = self.ring_radius(self.viewport);
        let new_radius = self.ring_radius(viewport);
        let scale = if old_radius > 0.0 {
            new_radius / old_radius
        } else {
            1.0
        };

        self.viewport = viewport;
        self.rehome(viewport);
        let new_center = viewport.center();
        for node in &mut self.nodes {
            node.position = new_center + (node.position - old_center) * scale;
        }
    }

    fn reorder(&mut self, order: &[usize]) {
        let nodes: Vec<RingNode> = order
            .iter()
            .filter_map(|&old| self.nodes.get(old).copied())
            .collect();
        if nodes.len() != self.nodes.len() {
            return;
        }
        self.nodes = nodes;
        self.pinned = self.pinned.and_then(|old| order.iter().position(|&o| o == old));
        self.rehome(self.viewport);
    }

    fn step(&mut self) {
        let stiffness = self.config.spring_stiffness;
        let damping = self.config.damping;
        let epsilon = self.config.rest_epsilon;

        for (i, node) in self.nodes.iter_mut().enumerate() {
            if self.pinned == Some(i) {
                continue;
            }
            let force = (node.home - node.position) * stiffness;
            node.velocity = (node.velocity + force) * damping;
            if node.velocity.length() < epsilon {
                node.velocity = Vec2::ZERO;
            }
            node.position += node.velocity;
        }
    }

    fn project(&self) -> Vec<ProjectedNode> {
        let radius = self.config.node_radius * self.zoom;
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| {
                let screen = self.to_screen(node.position);
                ProjectedNode {
                    index,
                    x: screen.x,
                    y: screen.y,
                    radius,
                    depth: 1.0,
                    label_opacity: 1.0,
                }
            })
            .collect()
    }

    fn drag(&mut self, grabbed: Option<usize>, pointer: Vec2, delta: Vec2) {
        match grabbed.filter(|&i| i < self.nodes.len()) {
            Some(index) => {
                if self.pinned != Some(index) {
                    let grabbed_at = pointer - delta;
                    self.grab_offset = self.to_screen(self.nodes[index].position) - grabbed_at;
                    self.pinned = Some(index);
                }
                let target = self.to_world(self.clamp_to_viewport(pointer + self.grab_offset));
                let node = &mut self.nodes[index];
                node.position = target;
                node.velocity = Vec2::ZERO;
            }
            None => self.pan += delta,
        }
    }

    fn release(&mut self, _grabbed: Option<usize>) {
        self.pinned = None;
        self.grab_offset = Vec2::ZERO;
    }

    fn zoom(&mut self, wheel_delta: f32) {
        self.zoom = apply_zoom(self.zoom, wheel_delta, &self.interaction);
    }

    fn is_at_rest(&self) -> bool {
        self.pinned.is_none() && self.nodes.iter().all(|n| self.is_settled(n))
    }
}

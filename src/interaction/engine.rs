//! The per-session view engine.

use std::collections::HashMap;

use bevy_math::Vec2;
use serde::Serialize;

use super::picking::{is_click, pick, GestureOutcome, PickState, PointerEvent};
use crate::config::{Config, InteractionConfig, LayoutConfig};
use crate::layout::{create_strategy, LayoutKind, LayoutStrategy, ProjectedNode, Viewport};
use crate::models::Graph;

// =============================================================================
// Frame Output
// =============================================================================

/// One node ready to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameNode {
    pub id: String,
    pub label: String,
    #[serde(flatten)]
    pub projection: ProjectedNode,
    pub selected: bool,
    pub hovered: bool,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub mode: LayoutKind,
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<FrameNode>,
    /// Edges as pairs of indices into `nodes`.
    pub edges: Vec<[usize; 2]>,
}

// =============================================================================
// Engine
// =============================================================================

/// Owns the graph view, the layout strategy, pointer state and viewport.
///
/// [`Engine::tick`] is the only per-frame writer of layout state; pointer
/// handlers take `&mut self` so no other writer can exist.
pub struct Engine {
    layout: LayoutConfig,
    interaction: InteractionConfig,
    viewport: Viewport,
    ids: Vec<String>,
    labels: Vec<String>,
    edges: Vec<[usize; 2]>,
    strategy: Box<dyn LayoutStrategy>,
    pick: PickState,
}

impl Engine {
    pub fn new(
        kind: LayoutKind,
        layout: &LayoutConfig,
        interaction: &InteractionConfig,
        viewport: Viewport,
    ) -> Self {
        let mut strategy = create_strategy(kind, layout, interaction);
        strategy.init(0, viewport);
        Self {
            layout: layout.clone(),
            interaction: interaction.clone(),
            viewport,
            ids: Vec::new(),
            labels: Vec::new(),
            edges: Vec::new(),
            strategy,
            pick: PickState::default(),
        }
    }

    pub fn from_config(config: &Config, viewport: Viewport) -> Self {
        Self::new(
            config.layout.mode,
            &config.layout,
            &config.interaction,
            viewport,
        )
    }

    pub fn kind(&self) -> LayoutKind {
        self.strategy.kind()
    }

    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Shows `graph`. Returns `true` if the layout was reinitialized.
    ///
    /// Layout state survives when the node id set is unchanged, so a stream
    /// that only adds attributes or edges does not reset positions. A
    /// reordered set keeps each node's state under its new index.
    /// Selection and hover follow their node id either way.
    pub fn set_graph(&mut self, graph: &Graph) -> bool {
        let index: HashMap<&str, usize> = graph
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect();

        self.labels = graph.nodes.iter().map(|n| n.label.clone()).collect();
        self.edges = graph
            .edges
            .iter()
            .filter_map(|e| Some([*index.get(e.source.as_str())?, *index.get(e.target.as_str())?]))
            .collect();

        let remap = |slot: Option<usize>, ids: &[String]| {
            slot.and_then(|i| ids.get(i))
                .and_then(|id| index.get(id.as_str()).copied())
        };
        self.pick.selected = remap(self.pick.selected, &self.ids);
        self.pick.hovered = remap(self.pick.hovered, &self.ids);

        let new_ids: Vec<String> = graph.nodes.iter().map(|n| n.id.clone()).collect();
        if new_ids == self.ids {
            return false;
        }

        if let Some(order) = self.reordering(&new_ids) {
            self.pick.grabbed = remap(self.pick.grabbed, &self.ids);
            self.strategy.reorder(&order);
            self.ids = new_ids;
            tracing::debug!(nodes = self.ids.len(), "Layout reordered");
            return false;
        }

        if self.pick.pressed {
            self.strategy.release(self.pick.grabbed);
            self.pick.end();
        }
        self.ids = new_ids;
        self.strategy.init(self.ids.len(), self.viewport);
        tracing::debug!(nodes = self.ids.len(), mode = ?self.kind(), "Layout reinitialized");
        true
    }

    /// Previous index of every id in `new_ids`, when both hold the same set.
    fn reordering(&self, new_ids: &[String]) -> Option<Vec<usize>> {
        if new_ids.len() != self.ids.len() {
            return None;
        }
        let old: HashMap<&str, usize> = self
            .ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();
        if old.len() != self.ids.len() {
            return None;
        }
        new_ids.iter().map(|id| old.get(id.as_str()).copied()).collect()
    }

    /// Switches layout strategy, reinitializing node positions.
    pub fn set_mode(&mut self, kind: LayoutKind) {
        if kind == self.kind() {
            return;
        }
        if self.pick.pressed {
            self.pick.end();
        }
        self.strategy = create_strategy(kind, &self.layout, &self.interaction);
        self.strategy.init(self.ids.len(), self.viewport);
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport = Viewport::new(width, height);
        self.strategy.resize(self.viewport);
    }

    /// Advances the layout by one frame.
    pub fn tick(&mut self) {
        self.strategy.step();
    }

    pub fn is_at_rest(&self) -> bool {
        self.strategy.is_at_rest()
    }

    /// Handles one pointer event. Returns the outcome when a gesture ends.
    pub fn pointer(&mut self, event: PointerEvent) -> Option<GestureOutcome> {
        match event {
            PointerEvent::Down { x, y } => {
                let pointer = Vec2::new(x, y);
                let grabbed = self.pick_at(pointer);
                self.pick.begin(pointer, grabbed);
                None
            }
            PointerEvent::Move { x, y } => {
                let pointer = Vec2::new(x, y);
                if self.pick.pressed {
                    self.drag_to(pointer);
                } else {
                    self.pick.hovered = self.pick_at(pointer);
                }
                None
            }
            PointerEvent::Up { x, y } => {
                if !self.pick.pressed {
                    return None;
                }
                let pointer = Vec2::new(x, y);
                if self.pick.last_pointer != Some(pointer) {
                    self.drag_to(pointer);
                }

                let grabbed = self.pick.grabbed;
                let outcome = if is_click(self.pick.accumulated, self.interaction.click_threshold) {
                    let node = grabbed.or_else(|| self.pick_at(pointer));
                    self.pick.selected = node;
                    GestureOutcome::Click { node }
                } else {
                    GestureOutcome::Drag
                };
                self.strategy.release(grabbed);
                self.pick.end();
                Some(outcome)
            }
            PointerEvent::Cancel | PointerEvent::Leave => {
                if matches!(event, PointerEvent::Leave) {
                    self.pick.hovered = None;
                }
                if !self.pick.pressed {
                    return None;
                }
                self.strategy.release(self.pick.grabbed);
                self.pick.end();
                Some(GestureOutcome::Cancelled)
            }
        }
    }

    /// Applies a wheel delta (positive zooms out).
    pub fn wheel(&mut self, delta: f32) {
        self.strategy.zoom(delta);
    }

    pub fn project(&self) -> Vec<ProjectedNode> {
        self.strategy.project()
    }

    pub fn frame(&self) -> Frame {
        let nodes = self
            .project()
            .into_iter()
            .filter_map(|projection| {
                let i = projection.index;
                Some(FrameNode {
                    id: self.ids.get(i)?.clone(),
                    label: self.labels.get(i)?.clone(),
                    projection,
                    selected: self.pick.selected == Some(i),
                    hovered: self.pick.hovered == Some(i),
                })
            })
            .collect();

        Frame {
            mode: self.kind(),
            width: self.viewport.width,
            height: self.viewport.height,
            nodes,
            edges: self.edges.clone(),
        }
    }

    pub fn pick_state(&self) -> &PickState {
        &self.pick
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.id_at(self.pick.selected)
    }

    pub fn hovered_id(&self) -> Option<&str> {
        self.id_at(self.pick.hovered)
    }

    fn id_at(&self, index: Option<usize>) -> Option<&str> {
        index.and_then(|i| self.ids.get(i)).map(String::as_str)
    }

    fn pick_at(&self, pointer: Vec2) -> Option<usize> {
        pick(&self.project(), pointer, self.interaction.grab_margin)
    }

    fn drag_to(&mut self, pointer: Vec2) {
        let delta = self.pick.advance(pointer);
        self.strategy.drag(self.pick.grabbed, pointer, delta);
    }
}

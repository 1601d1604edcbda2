//! Hit testing and pointer gesture state.

use bevy_math::Vec2;
use serde::Serialize;

use crate::layout::ProjectedNode;

/// A pointer event in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up { x: f32, y: f32 },
    /// The platform aborted the gesture (lost capture, touch cancel).
    Cancel,
    /// The pointer left the surface.
    Leave,
}

impl PointerEvent {
    pub fn position(&self) -> Option<Vec2> {
        match *self {
            PointerEvent::Down { x, y } | PointerEvent::Move { x, y } | PointerEvent::Up { x, y } => {
                Some(Vec2::new(x, y))
            }
            PointerEvent::Cancel | PointerEvent::Leave => None,
        }
    }
}

/// How a completed pointer gesture was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "gesture", rename_all = "snake_case")]
pub enum GestureOutcome {
    /// Movement stayed under the click threshold. `node` is the new selection.
    Click { node: Option<usize> },
    /// Movement crossed the threshold; selection is unchanged.
    Drag,
    /// Cancelled or left before release; selection is unchanged.
    Cancelled,
}

/// Transient pointer state. Indices refer to the engine's node order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PickState {
    pub hovered: Option<usize>,
    pub selected: Option<usize>,
    /// A button is down and a gesture is in progress.
    pub pressed: bool,
    /// Node captured at pointer-down; keeps receiving the drag even after
    /// the pointer leaves its hit area.
    pub grabbed: Option<usize>,
    /// Total path length of the current gesture in pixels.
    pub accumulated: f32,
    pub last_pointer: Option<Vec2>,
}

impl PickState {
    /// Whether the current gesture has moved far enough to count as a drag.
    pub fn is_dragging(&self, click_threshold: f32) -> bool {
        self.pressed && !is_click(self.accumulated, click_threshold)
    }

    pub(crate) fn begin(&mut self, pointer: Vec2, grabbed: Option<usize>) {
        self.pressed = true;
        self.grabbed = grabbed;
        self.accumulated = 0.0;
        self.last_pointer = Some(pointer);
    }

    /// Records a move and returns its delta.
    pub(crate) fn advance(&mut self, pointer: Vec2) -> Vec2 {
        let delta = self
            .last_pointer
            .map(|last| pointer - last)
            .unwrap_or(Vec2::ZERO);
        self.accumulated += delta.length();
        self.last_pointer = Some(pointer);
        delta
    }

    pub(crate) fn end(&mut self) {
        self.pressed = false;
        self.grabbed = None;
        self.accumulated = 0.0;
        self.last_pointer = None;
    }
}

/// A gesture is a click while `accumulated² < threshold²`.
pub(crate) fn is_click(accumulated: f32, click_threshold: f32) -> bool {
    accumulated * accumulated < click_threshold * click_threshold
}

/// Finds the node under `pointer`.
///
/// A node is eligible when the pointer lies within its radius plus
/// `grab_margin`. Among eligible nodes the one with the smallest screen
/// distance wins; on an exact tie the earlier node is kept.
pub fn pick(projected: &[ProjectedNode], pointer: Vec2, grab_margin: f32) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for node in projected {
        let distance = node.screen().distance(pointer);
        if distance > node.radius + grab_margin {
            continue;
        }
        if best.map_or(true, |(_, closest)| distance < closest) {
            best = Some((node.index, distance));
        }
    }
    best.map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(index: usize, x: f32, y: f32) -> ProjectedNode {
        ProjectedNode {
            index,
            x,
            y,
            radius: 10.0,
            depth: 1.0,
            label_opacity: 1.0,
        }
    }

    #[test]
    fn test_pick_closest_within_grab_radius() {
        let nodes = [node(0, 0.0, 0.0), node(1, 12.0, 0.0)];
        assert_eq!(pick(&nodes, Vec2::new(8.0, 0.0), 4.0), Some(1));
        assert_eq!(pick(&nodes, Vec2::new(3.0, 0.0), 4.0), Some(0));
    }

    #[test]
    fn test_pick_margin_extends_hit_area() {
        let nodes = [node(0, 0.0, 0.0)];
        assert_eq!(pick(&nodes, Vec2::new(13.0, 0.0), 0.0), None);
        assert_eq!(pick(&nodes, Vec2::new(13.0, 0.0), 4.0), Some(0));
    }

    #[test]
    fn test_pick_tie_prefers_first() {
        let nodes = [node(4, -5.0, 0.0), node(7, 5.0, 0.0)];
        assert_eq!(pick(&nodes, Vec2::ZERO, 0.0), Some(4));
    }

    #[test]
    fn test_pick_empty_space() {
        let nodes = [node(0, 100.0, 100.0)];
        assert_eq!(pick(&nodes, Vec2::ZERO, 6.0), None);
        assert_eq!(pick(&[], Vec2::ZERO, 6.0), None);
    }

    #[test]
    fn test_gesture_accumulates_path_length() {
        let mut state = PickState::default();
        state.begin(Vec2::ZERO, Some(2));
        assert_eq!(state.advance(Vec2::new(3.0, 4.0)), Vec2::new(3.0, 4.0));
        state.advance(Vec2::ZERO);
        assert_eq!(state.accumulated, 10.0);
        assert!(state.is_dragging(5.0));
        assert!(!state.is_dragging(10.5));

        state.end();
        assert_eq!(state, PickState::default());
    }

    #[test]
    fn test_click_threshold_is_strict() {
        assert!(is_click(0.0, 5.0));
        assert!(is_click(4.9, 5.0));
        assert!(!is_click(5.0, 5.0));
    }
}

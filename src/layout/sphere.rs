//! 3-D layout: nodes on a golden-angle spiral over a sphere, seen through a
//! rotating perspective camera.

use std::f32::consts::PI;

use bevy_math::{Quat, Vec2, Vec3};

use super::{apply_zoom, lerp, LayoutKind, LayoutStrategy, ProjectedNode, Viewport};
use crate::config::{InteractionConfig, LayoutConfig};

/// Pitch limit in radians, just short of the poles.
const PITCH_LIMIT: f32 = 1.5;

/// Angular speed below which rotation stops.
const ANGULAR_REST: f32 = 1e-4;

/// Point `i` of `n` on the unit sphere.
///
/// Latitude steps evenly in `y` while longitude advances by the golden angle,
/// so neighbouring indices land far apart and every band gets equal area.
/// Pure function of `(i, n)`.
pub fn fibonacci_point(i: usize, n: usize) -> Vec3 {
    let golden_angle = PI * (3.0 - 5.0_f32.sqrt());
    let n = n.max(1) as f32;
    let y = 1.0 - 2.0 * (i as f32 + 0.5) / n;
    let r = (1.0 - y * y).max(0.0).sqrt();
    let theta = i as f32 * golden_angle;
    Vec3::new(r * theta.cos(), y, r * theta.sin())
}

#[derive(Debug, Clone)]
pub struct SphereLayout {
    config: LayoutConfig,
    interaction: InteractionConfig,
    viewport: Viewport,
    base: Vec<Vec3>,
    yaw: f32,
    pitch: f32,
    yaw_velocity: f32,
    pitch_velocity: f32,
    zoom: f32,
    dragging: bool,
}

impl SphereLayout {
    pub fn new(config: LayoutConfig, interaction: InteractionConfig) -> Self {
        Self {
            config,
            interaction,
            viewport: Viewport::default(),
            base: Vec::new(),
            yaw: 0.0,
            pitch: 0.0,
            yaw_velocity: 0.0,
            pitch_velocity: 0.0,
            zoom: 1.0,
            dragging: false,
        }
    }

    /// Current camera angles as `(yaw, pitch)`.
    pub fn angles(&self) -> (f32, f32) {
        (self.yaw, self.pitch)
    }

    /// Sphere radius in pixels before zoom.
    fn base_radius(&self) -> f32 {
        self.viewport.min_side() * self.config.sphere_fill / 2.0
    }

    fn camera_distance(&self) -> f32 {
        self.base_radius() * self.config.camera_distance_factor
    }

    fn rotation(&self) -> Quat {
        Quat::from_rotation_x(self.pitch) * Quat::from_rotation_y(self.yaw)
    }

    fn rotate_by(&mut self, yaw: f32, pitch: f32) {
        self.yaw += yaw;
        self.pitch = (self.pitch + pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }
}

impl LayoutStrategy for SphereLayout {
    fn kind(&self) -> LayoutKind {
        LayoutKind::Sphere
    }

    fn init(&mut self, node_count: usize, viewport: Viewport) {
        self.viewport = viewport;
        self.base = (0..node_count)
            .map(|i| fibonacci_point(i, node_count))
            .collect();
        self.yaw_velocity = 0.0;
        self.pitch_velocity = 0.0;
        self.dragging = false;
    }

    fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn reorder(&mut self, order: &[usize]) {
        let base: Vec<Vec3> = order
            .iter()
            .filter_map(|&old| self.base.get(old).copied())
            .collect();
        if base.len() == self.base.len() {
            self.base = base;
        }
    }

    fn step(&mut self) {
        if self.dragging {
            return;
        }
        self.rotate_by(self.yaw_velocity, self.pitch_velocity);

        let damping = self.config.angular_damping;
        self.yaw_velocity *= damping;
        self.pitch_velocity *= damping;
        if self.yaw_velocity.abs() < ANGULAR_REST {
            self.yaw_velocity = 0.0;
        }
        if self.pitch_velocity.abs() < ANGULAR_REST {
            self.pitch_velocity = 0.0;
        }
    }

    /// Zoom scales the projected offset from the centre; the world radius is
    /// `base_radius` at every zoom level.
    fn project(&self) -> Vec<ProjectedNode> {
        let rotation = self.rotation();
        let radius = self.base_radius();
        let camera_distance = self.camera_distance();
        let center = self.viewport.center();
        let floor = self.config.denominator_floor;

        self.base
            .iter()
            .enumerate()
            .map(|(index, point)| {
                let world = rotation * (*point * radius);
                let factor = camera_distance / (camera_distance - world.z).max(floor);
                let screen = center + Vec2::new(world.x, world.y) * factor * self.zoom;
                let depth = if radius > 0.0 {
                    ((world.z / radius + 1.0) / 2.0).clamp(0.0, 1.0)
                } else {
                    1.0
                };
                let scale = lerp(self.config.min_depth_scale, self.config.max_depth_scale, depth);

                ProjectedNode {
                    index,
                    x: screen.x,
                    y: screen.y,
                    radius: self.config.node_radius * scale,
                    depth,
                    label_opacity: lerp(self.config.min_label_opacity, 1.0, depth),
                }
            })
            .collect()
    }

    /// Any drag orbits the camera; the grabbed node rides along with the sphere.
    fn drag(&mut self, _grabbed: Option<usize>, _pointer: Vec2, delta: Vec2) {
        self.dragging = true;
        let sensitivity = self.interaction.rotate_sensitivity;
        self.yaw_velocity = delta.x * sensitivity;
        self.pitch_velocity = delta.y * sensitivity;
        self.rotate_by(self.yaw_velocity, self.pitch_velocity);
    }

    fn release(&mut self, _grabbed: Option<usize>) {
        self.dragging = false;
    }

    fn zoom(&mut self, wheel_delta: f32) {
        self.zoom = apply_zoom(self.zoom, wheel_delta, &self.interaction);
    }

    fn is_at_rest(&self) -> bool {
        !self.dragging && self.yaw_velocity == 0.0 && self.pitch_velocity == 0.0
    }
}

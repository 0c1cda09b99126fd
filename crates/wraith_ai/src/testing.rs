//! Scripted service fakes
//!
//! Deterministic stand-ins for a host's path planner and obstacle scene,
//! used by the engine's own tests and by headless hosts. Enabled with the
//! `testing` feature.

use crate::services::{NavigationService, OcclusionQuery, PathStatus};
use wraith_math::{segment_aabb, Vec3, AABB};

/// Straight-line mover with scriptable failures
#[derive(Clone, Debug)]
pub struct ScriptedNavigation {
    position: Vec3,
    forward: Vec3,
    destination: Option<Vec3>,
    speed: f32,
    stopping_distance: f32,
    stopped: bool,
    frozen: bool,
    on_surface: bool,
    status_override: Option<PathStatus>,
    bounds: Option<AABB>,
    requests: Vec<Vec3>,
    repositions: Vec<Vec3>,
}

impl ScriptedNavigation {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            forward: Vec3::Z,
            destination: None,
            speed: 3.5,
            stopping_distance: 0.5,
            stopped: false,
            frozen: false,
            on_surface: true,
            status_override: None,
            bounds: None,
            requests: Vec::new(),
            repositions: Vec::new(),
        }
    }

    pub fn with_forward(mut self, forward: Vec3) -> Self {
        self.forward = forward.normalize_or_zero();
        self
    }

    /// Restrict the navigable surface to a box (tested on X and Z)
    pub fn with_bounds(mut self, bounds: AABB) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Never move, whatever the destination
    pub fn frozen(mut self) -> Self {
        self.frozen = true;
        self
    }

    pub fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
    }

    /// Force the reported path status; `None` restores normal reporting
    pub fn set_path_status(&mut self, status: Option<PathStatus>) {
        self.status_override = status;
    }

    pub fn set_on_surface(&mut self, on_surface: bool) {
        self.on_surface = on_surface;
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Move toward the destination for `dt` seconds
    pub fn step(&mut self, dt: f32) {
        if self.frozen || self.stopped {
            return;
        }
        let Some(destination) = self.destination else {
            return;
        };
        let offset = destination - self.position;
        let distance = offset.length();
        let usable = (distance - self.stopping_distance).max(0.0);
        let travel = (self.speed * dt).min(usable);
        if travel <= 0.0 {
            return;
        }
        let direction = offset.normalize_or_zero();
        self.position += direction * travel;
        let facing = direction.with_y(0.0).normalize_or_zero();
        if facing != Vec3::ZERO {
            self.forward = facing;
        }
    }

    pub fn destination(&self) -> Option<Vec3> {
        self.destination
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Number of destination requests received
    pub fn request_count(&self) -> usize {
        self.requests.len()
    }

    pub fn requests(&self) -> &[Vec3] {
        &self.requests
    }

    pub fn repositions(&self) -> &[Vec3] {
        &self.repositions
    }

    fn clamp_to_surface(&self, point: Vec3) -> Vec3 {
        match self.bounds {
            Some(bounds) => Vec3::new(
                point.x.clamp(bounds.min.x, bounds.max.x),
                point.y,
                point.z.clamp(bounds.min.z, bounds.max.z),
            ),
            None => point,
        }
    }
}

impl NavigationService for ScriptedNavigation {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn forward(&self) -> Vec3 {
        self.forward
    }

    fn set_forward(&mut self, forward: Vec3) {
        let forward = forward.normalize_or_zero();
        if forward != Vec3::ZERO {
            self.forward = forward;
        }
    }

    fn set_destination(&mut self, point: Vec3) -> bool {
        self.requests.push(point);
        self.destination = Some(self.clamp_to_surface(point));
        true
    }

    fn remaining_distance(&self) -> f32 {
        self.destination
            .map_or(0.0, |destination| self.position.distance(destination))
    }

    fn path_status(&self) -> PathStatus {
        self.status_override.unwrap_or(PathStatus::Complete)
    }

    fn stopping_distance(&self) -> f32 {
        self.stopping_distance
    }

    fn set_stopping_distance(&mut self, distance: f32) {
        self.stopping_distance = distance;
    }

    fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    fn set_stopped(&mut self, stopped: bool) {
        self.stopped = stopped;
    }

    fn reposition(&mut self, point: Vec3) -> bool {
        self.repositions.push(point);
        self.position = point;
        true
    }

    fn is_on_navigable_surface(&self) -> bool {
        self.on_surface
            && self
                .bounds
                .map_or(true, |bounds| bounds.contains_point_xz(self.position))
    }

    fn sample_nearest_navigable_point(&self, point: Vec3, radius: f32) -> Option<Vec3> {
        let nearest = self.clamp_to_surface(point);
        (nearest.distance(point) <= radius).then_some(nearest)
    }
}

/// Obstacle scene made of boxes
#[derive(Clone, Debug, Default)]
pub struct BoxOcclusion {
    boxes: Vec<AABB>,
}

impl BoxOcclusion {
    pub fn new(boxes: Vec<AABB>) -> Self {
        Self { boxes }
    }

    pub fn with_box(mut self, aabb: AABB) -> Self {
        self.boxes.push(aabb);
        self
    }
}

impl OcclusionQuery for BoxOcclusion {
    fn raycast_blocked(&self, from: Vec3, to: Vec3) -> bool {
        self.boxes.iter().any(|aabb| segment_aabb(from, to, aabb))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_step_stops_at_stopping_distance() {
        let mut nav = ScriptedNavigation::new(Vec3::ZERO);
        nav.set_speed(10.0);
        nav.set_destination(Vec3::new(5.0, 0.0, 0.0));
        nav.step(1.0);
        assert_relative_eq!(nav.remaining_distance(), 0.5, epsilon = 1e-5);
        assert_eq!(nav.forward(), Vec3::X);
    }

    #[test]
    fn test_bounds_clamp_samples() {
        let bounds = AABB::new(Vec3::new(-5.0, -1.0, -5.0), Vec3::new(5.0, 1.0, 5.0));
        let nav = ScriptedNavigation::new(Vec3::ZERO).with_bounds(bounds);

        assert_eq!(
            nav.sample_nearest_navigable_point(Vec3::new(6.0, 0.0, 0.0), 2.0),
            Some(Vec3::new(5.0, 0.0, 0.0))
        );
        assert_eq!(
            nav.sample_nearest_navigable_point(Vec3::new(9.0, 0.0, 0.0), 2.0),
            None
        );
    }

    #[test]
    fn test_box_occlusion() {
        let scene = BoxOcclusion::default().with_box(AABB::new(
            Vec3::new(-1.0, -1.0, 2.0),
            Vec3::new(1.0, 1.0, 3.0),
        ));
        assert!(scene.raycast_blocked(Vec3::ZERO, Vec3::new(0.0, 0.0, 5.0)));
        assert!(!scene.raycast_blocked(Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0)));
    }
}

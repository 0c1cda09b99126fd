//! Grid-backed navigation service
//!
//! Plans on the shared [`NavGrid`] and walks the resulting path at the
//! speed the engine asks for.

use crate::navmesh::{NavGrid, NavPath};
use std::sync::Arc;
use wraith_ai::{NavigationService, PathStatus};
use wraith_math::Vec3;

/// One agent's mover on the grid
#[derive(Clone, Debug)]
pub struct GridNavAgent {
    grid: Arc<NavGrid>,
    position: Vec3,
    forward: Vec3,
    speed: f32,
    stopping_distance: f32,
    stopped: bool,
    path: Option<NavPath>,
    next_waypoint: usize,
}

impl GridNavAgent {
    pub fn new(grid: Arc<NavGrid>, position: Vec3) -> Self {
        Self {
            grid,
            position,
            forward: Vec3::Z,
            speed: 0.0,
            stopping_distance: 0.0,
            stopped: false,
            path: None,
            next_waypoint: 0,
        }
    }

    /// Walk along the current path for `dt` seconds
    pub fn advance(&mut self, dt: f32) {
        if self.stopped || self.speed <= 0.0 {
            return;
        }
        let Some(path) = self.path.as_ref() else {
            return;
        };

        let mut budget = self.speed * dt;
        while budget > 0.0 {
            let remaining = path.remaining_from(self.position, self.next_waypoint);
            if remaining <= self.stopping_distance {
                break;
            }
            let Some(&waypoint) = path.waypoints.get(self.next_waypoint) else {
                break;
            };

            // Never walk past the stopping distance
            let allowed = budget.min(remaining - self.stopping_distance);
            let offset = waypoint - self.position;
            let distance = offset.length();
            let direction = offset.normalize_or_zero();
            if direction != Vec3::ZERO {
                self.forward = direction.with_y(0.0).normalize_or_zero();
            }

            if distance <= allowed {
                self.position = waypoint;
                self.next_waypoint += 1;
                budget -= distance;
            } else {
                self.position += direction * allowed;
                budget = 0.0;
            }
        }
    }
}

impl NavigationService for GridNavAgent {
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
        let path = self.grid.find_path(self.position, point);
        let accepted = path.status != PathStatus::Invalid;
        log::trace!("planned {:?} path to {point:?}", path.status);
        self.path = Some(path);
        self.next_waypoint = 0;
        accepted
    }

    fn remaining_distance(&self) -> f32 {
        match &self.path {
            Some(path) if path.status != PathStatus::Invalid => {
                path.remaining_from(self.position, self.next_waypoint)
            }
            Some(_) => f32::INFINITY,
            None => 0.0,
        }
    }

    fn path_status(&self) -> PathStatus {
        match &self.path {
            Some(path) => path.status,
            None => PathStatus::Complete,
        }
    }

    fn stopping_distance(&self) -> f32 {
        self.stopping_distance
    }

    fn set_stopping_distance(&mut self, distance: f32) {
        self.stopping_distance = distance.max(0.0);
    }

    fn set_speed(&mut self, speed: f32) {
        self.speed = speed.max(0.0);
    }

    fn set_stopped(&mut self, stopped: bool) {
        self.stopped = stopped;
    }

    fn reposition(&mut self, point: Vec3) -> bool {
        if !self.grid.is_walkable(point) {
            return false;
        }
        self.position = point;
        self.path = None;
        self.next_waypoint = 0;
        true
    }

    fn is_on_navigable_surface(&self) -> bool {
        self.grid.is_walkable(self.position)
    }

    fn sample_nearest_navigable_point(&self, point: Vec3, radius: f32) -> Option<Vec3> {
        self.grid.nearest_walkable(point, radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use wraith_math::AABB;

    fn agent_at(position: Vec3) -> GridNavAgent {
        let grid = Arc::new(NavGrid::new(Vec3::ZERO, 20.0, 20.0, 1.0));
        let mut agent = GridNavAgent::new(grid, position);
        agent.set_speed(2.0);
        agent.set_stopping_distance(0.5);
        agent
    }

    #[test]
    fn test_walks_to_stopping_distance() {
        let mut agent = agent_at(Vec3::new(0.5, 0.0, 0.5));
        assert!(agent.set_destination(Vec3::new(6.5, 0.0, 0.5)));
        assert_eq!(agent.path_status(), PathStatus::Complete);
        assert_relative_eq!(agent.remaining_distance(), 6.0);

        agent.advance(1.0);
        assert_relative_eq!(agent.position().x, 2.5, epsilon = 1e-4);
        assert_relative_eq!(agent.forward().x, 1.0, epsilon = 1e-4);

        for _ in 0..10 {
            agent.advance(1.0);
        }
        assert_relative_eq!(agent.remaining_distance(), 0.5, epsilon = 1e-4);
    }

    #[test]
    fn test_stopped_agent_holds_position() {
        let mut agent = agent_at(Vec3::new(0.5, 0.0, 0.5));
        agent.set_destination(Vec3::new(6.5, 0.0, 0.5));
        agent.set_stopped(true);
        agent.advance(1.0);
        assert_eq!(agent.position(), Vec3::new(0.5, 0.0, 0.5));
    }

    #[test]
    fn test_off_grid_start_is_invalid() {
        let mut agent = agent_at(Vec3::new(-5.0, 0.0, 0.5));
        assert!(!agent.is_on_navigable_surface());
        assert!(!agent.set_destination(Vec3::new(6.5, 0.0, 0.5)));
        assert_eq!(agent.path_status(), PathStatus::Invalid);

        let landing = agent
            .sample_nearest_navigable_point(Vec3::new(-0.3, 0.0, 0.5), 1.0)
            .unwrap();
        assert!(agent.reposition(landing));
        assert!(agent.is_on_navigable_surface());
    }

    #[test]
    fn test_reposition_rejects_blocked_cells() {
        let mut grid = NavGrid::new(Vec3::ZERO, 10.0, 10.0, 1.0);
        grid.block(&AABB::new(Vec3::new(4.0, -1.0, 4.0), Vec3::new(5.0, 2.0, 5.0)), 0.0);
        let mut agent = GridNavAgent::new(Arc::new(grid), Vec3::new(0.5, 0.0, 0.5));
        assert!(!agent.reposition(Vec3::new(4.5, 0.0, 4.5)));
        assert!(agent.reposition(Vec3::new(2.5, 0.0, 2.5)));
    }
}

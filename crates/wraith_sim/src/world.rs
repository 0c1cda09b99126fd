//! Static obstacles and the scripted target

use wraith_ai::{OcclusionQuery, Target};
use wraith_math::{segment_aabb, Vec3, AABB};

/// Box obstacles blocking both movement and sight
#[derive(Clone, Debug, Default)]
pub struct World {
    obstacles: Vec<AABB>,
}

impl World {
    pub fn new(obstacles: Vec<AABB>) -> Self {
        Self { obstacles }
    }
}

impl OcclusionQuery for World {
    fn raycast_blocked(&self, from: Vec3, to: Vec3) -> bool {
        self.obstacles.iter().any(|aabb| segment_aabb(from, to, aabb))
    }
}

/// Target walking a looped route, with a flashlight and hiding windows
#[derive(Clone, Debug)]
pub struct ScriptedTarget {
    route: Vec<Vec3>,
    speed: f32,
    light: bool,
    /// `(start, end)` times in seconds during which the target is hidden
    hidden: Vec<(f32, f32)>,
    position: Vec3,
    forward: Vec3,
    next: usize,
}

impl ScriptedTarget {
    pub fn new(route: Vec<Vec3>, speed: f32) -> Self {
        let position = route.first().copied().unwrap_or(Vec3::ZERO);
        let forward = match route.get(1) {
            Some(next) => (*next - position).with_y(0.0).normalize_or_zero(),
            None => Vec3::Z,
        };
        Self {
            next: 1.min(route.len().saturating_sub(1)),
            route,
            speed,
            light: false,
            hidden: Vec::new(),
            position,
            forward: if forward == Vec3::ZERO { Vec3::Z } else { forward },
        }
    }

    pub fn with_light(mut self, light: bool) -> Self {
        self.light = light;
        self
    }

    pub fn with_hidden_windows(mut self, windows: Vec<(f32, f32)>) -> Self {
        self.hidden = windows;
        self
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Whether the target is hiding at session time `clock`
    pub fn is_hidden(&self, clock: f32) -> bool {
        self.hidden
            .iter()
            .any(|&(start, end)| clock >= start && clock < end)
    }

    /// Walk along the route, looping back to the start
    pub fn advance(&mut self, dt: f32) {
        if self.route.len() < 2 {
            return;
        }
        let mut budget = self.speed * dt;
        // Bounded so a degenerate route cannot spin forever
        for _ in 0..self.route.len() * 2 {
            if budget <= 0.0 {
                break;
            }
            let waypoint = self.route[self.next];
            let offset = waypoint - self.position;
            let distance = offset.length();
            if distance > budget {
                let direction = offset.normalize_or_zero();
                self.position += direction * budget;
                self.forward = direction.with_y(0.0).normalize_or_zero();
                break;
            }
            self.position = waypoint;
            budget -= distance;
            self.next = (self.next + 1) % self.route.len();
        }
    }

    /// Snapshot handed to the engine
    pub fn snapshot(&self, clock: f32) -> Target {
        Target::new(self.position, self.forward)
            .with_light(self.light)
            .with_hidden(self.is_hidden(clock))
    }
}

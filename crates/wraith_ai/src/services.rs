//! Host-provided services
//!
//! The engine never owns a navigation mesh or a physics scene. The host
//! supplies a path planner per agent through [`NavigationService`] and a
//! line-of-sight test through [`OcclusionQuery`].

use serde::{Deserialize, Serialize};
use wraith_math::Vec3;

/// Health of the planner's current path
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathStatus {
    /// Path reaches the destination
    Complete,
    /// Path ends short of the destination
    Partial,
    /// No usable path
    Invalid,
    /// Path is still being computed
    Pending,
}

impl PathStatus {
    /// Whether the path needs to be re-requested
    pub fn needs_repair(self) -> bool {
        matches!(self, PathStatus::Partial | PathStatus::Invalid)
    }
}

/// Path planner and movement driver for a single agent.
///
/// The implementation moves the agent on its own; the engine only steers
/// it through destinations, speed and stop/resume.
pub trait NavigationService {
    /// Current agent position
    fn position(&self) -> Vec3;

    /// Current facing direction
    fn forward(&self) -> Vec3;

    /// Override the facing direction
    fn set_forward(&mut self, forward: Vec3);

    /// Request a path to `point`; returns whether the request was accepted
    fn set_destination(&mut self, point: Vec3) -> bool;

    /// Remaining distance along the current path
    fn remaining_distance(&self) -> f32;

    /// Current path health
    fn path_status(&self) -> PathStatus;

    /// Whether the planner is still computing the path
    fn is_path_pending(&self) -> bool {
        self.path_status() == PathStatus::Pending
    }

    /// Distance from the destination at which movement stops
    fn stopping_distance(&self) -> f32;

    fn set_stopping_distance(&mut self, distance: f32);

    /// Movement speed in units per second
    fn set_speed(&mut self, speed: f32);

    /// Halt or resume movement without discarding the path
    fn set_stopped(&mut self, stopped: bool);

    /// Teleport onto `point`; returns whether the point was accepted
    fn reposition(&mut self, point: Vec3) -> bool;

    /// Whether the agent currently stands on the navigable surface
    fn is_on_navigable_surface(&self) -> bool;

    /// Nearest navigable point within `radius` of `point`
    fn sample_nearest_navigable_point(&self, point: Vec3, radius: f32) -> Option<Vec3>;
}

/// Line-of-sight query against the host's obstacle geometry
pub trait OcclusionQuery {
    /// Whether an obstacle blocks the straight segment `from` to `to`
    fn raycast_blocked(&self, from: Vec3, to: Vec3) -> bool;
}

/// Open world with nothing blocking sight
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOcclusion;

impl OcclusionQuery for NoOcclusion {
    fn raycast_blocked(&self, _from: Vec3, _to: Vec3) -> bool {
        false
    }
}

/// The pursued target as seen by the engine on a given tick
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub position: Vec3,
    /// Facing direction, also the direction of any light it carries
    pub forward: Vec3,
    /// Whether the target's light source is on
    pub emitting_light: bool,
    /// Hidden targets cannot be seen, heard or captured
    pub hidden: bool,
}

impl Target {
    /// Visible target with its light off
    pub fn new(position: Vec3, forward: Vec3) -> Self {
        Self {
            position,
            forward: forward.normalize_or_zero(),
            emitting_light: false,
            hidden: false,
        }
    }

    pub fn with_light(mut self, on: bool) -> Self {
        self.emitting_light = on;
        self
    }

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Whether the position is usable at all
    pub fn is_valid(&self) -> bool {
        self.position.is_finite()
    }
}

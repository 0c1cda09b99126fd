//! Agent tuning configuration
//!
//! Difficulty-independent constants live here, grouped by the subsystem
//! that reads them. Everything deserializes with defaults so a scenario
//! file only has to name the values it overrides.

use crate::difficulty::{Difficulty, DifficultyProfile};
use crate::error::{AiError, Result};
use serde::{Deserialize, Serialize};
use wraith_math::Vec3;

/// Sensor tuning
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptionConfig {
    /// Seconds between sensor evaluations
    pub evaluation_interval: f32,
    /// Minimum dot product between the light direction and the direction
    /// from the light to the agent for the agent to count as lit
    pub light_dot_threshold: f32,
    /// Seconds of sustained light exposure before it counts as detection
    pub light_exposure_threshold: f32,
    /// Seconds without detection before belief confidence drops a level
    pub belief_decay_interval: f32,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            evaluation_interval: 0.1,
            light_dot_threshold: 0.5,
            light_exposure_threshold: 1.0,
            belief_decay_interval: 5.0,
        }
    }
}

/// Movement, stuck detection and recovery tuning
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Minimum change in destination before a new request is forwarded
    pub destination_threshold: f32,
    /// Arrival tolerance used when the stopping distance is smaller
    pub arrival_tolerance: f32,
    /// Stopping distance outside of a chase
    pub stopping_distance: f32,
    /// Seconds between stuck checks
    pub stuck_check_interval: f32,
    /// Displacement per check below which the agent counts as stalled
    pub min_movement: f32,
    /// Number of consecutive stalled checks before recovery
    pub stalled_checks: u32,
    /// Radius for alternate destination sampling
    pub alternate_radius: f32,
    /// Sampling attempts for an alternate destination
    pub alternate_attempts: u32,
    /// Search radius for a reposition target
    pub reposition_radius: f32,
    /// Seconds between path health checks
    pub path_repair_interval: f32,
    /// Speed multiplier applied after a recovery
    pub unstuck_boost: f32,
    /// Seconds the speed boost lasts
    pub unstuck_boost_duration: f32,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            destination_threshold: 0.5,
            arrival_tolerance: 1.0,
            stopping_distance: 0.5,
            stuck_check_interval: 1.0,
            min_movement: 0.5,
            stalled_checks: 3,
            alternate_radius: 2.0,
            alternate_attempts: 5,
            reposition_radius: 10.0,
            path_repair_interval: 2.0,
            unstuck_boost: 1.5,
            unstuck_boost_duration: 1.0,
        }
    }
}

/// Search planning and memory tuning
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Seconds a searched location stays in memory
    pub memory_duration: f32,
    /// Distance within which a new record refreshes an existing one
    pub merge_radius: f32,
    /// Seconds between memory prunes
    pub prune_interval: f32,
    /// Candidates within this distance of a remembered location are skipped
    pub exclusion_radius: f32,
    /// Radius around the search base where candidates are sampled
    pub search_radius: f32,
    /// Candidate points generated per search
    pub candidate_count: usize,
    /// Sampling attempts per search
    pub max_attempts: usize,
    /// Distance within which the search base snaps to a patrol waypoint
    pub waypoint_snap_radius: f32,
    /// Seconds spent looking around at each search point
    pub look_around_duration: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            memory_duration: 60.0,
            merge_radius: 1.0,
            prune_interval: 10.0,
            exclusion_radius: 3.0,
            search_radius: 8.0,
            candidate_count: 5,
            max_attempts: 20,
            waypoint_snap_radius: 5.0,
            look_around_duration: 2.0,
        }
    }
}

/// Peer coordination tuning
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinationConfig {
    /// Peers within this distance of a chasing agent are alerted
    pub radius: f32,
    /// Seconds between coordination passes
    pub interval: f32,
    /// Seconds between a defeat and the agent's removal
    pub defeat_removal_delay: f32,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            radius: 20.0,
            interval: 5.0,
            defeat_removal_delay: 3.0,
        }
    }
}

impl CoordinationConfig {
    pub fn validate(&self) -> Result<()> {
        check_positive("coordination.radius", self.radius)?;
        check_positive("coordination.interval", self.interval)?;
        check_non_negative("coordination.defeat_removal_delay", self.defeat_removal_delay)
    }
}

/// How a patrolling agent picks its next waypoint
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatrolStrategy {
    /// Mostly random, otherwise the farthest waypoint
    #[default]
    Wander,
    /// Waypoint nearest the target's current position
    Hunt,
}

/// Decision-layer tuning
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Seconds paused at each patrol waypoint
    pub waypoint_pause: f32,
    /// Random variation applied to the pause, as a fraction
    pub pause_jitter: f32,
    /// Chance of picking a random waypoint instead of the farthest
    pub random_waypoint_chance: f32,
    /// Waypoints within this distance of a peer's claim count as claimed
    pub claim_radius: f32,
    /// Seconds between chase destination refreshes
    pub chase_repath_interval: f32,
    /// Waypoint selection strategy
    pub patrol_strategy: PatrolStrategy,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            waypoint_pause: 2.0,
            pause_jitter: 0.2,
            random_waypoint_chance: 0.7,
            claim_radius: 1.0,
            chase_repath_interval: 0.2,
            patrol_strategy: PatrolStrategy::Wander,
        }
    }
}

/// Full configuration for one agent
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub profile: DifficultyProfile,
    pub perception: PerceptionConfig,
    pub navigation: NavigationConfig,
    pub search: SearchConfig,
    pub behavior: BehaviorConfig,
    /// Where the host should place the agent
    pub spawn: Vec3,
    /// Patrol waypoints in world space
    pub waypoints: Vec<Vec3>,
}

impl AgentConfig {
    /// Configuration using the preset profile for `difficulty`
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        Self {
            profile: difficulty.profile(),
            ..Default::default()
        }
    }

    pub fn with_spawn(mut self, spawn: Vec3) -> Self {
        self.spawn = spawn;
        self
    }

    /// Set patrol waypoints
    pub fn with_waypoints(mut self, waypoints: Vec<Vec3>) -> Self {
        self.waypoints = waypoints;
        self
    }

    /// Set the patrol strategy
    pub fn with_patrol_strategy(mut self, strategy: PatrolStrategy) -> Self {
        self.behavior.patrol_strategy = strategy;
        self
    }

    /// Check the configuration before an agent is built from it
    pub fn validate(&self) -> Result<()> {
        self.profile.validate()?;

        check_positive("perception.evaluation_interval", self.perception.evaluation_interval)?;
        check_positive(
            "perception.light_exposure_threshold",
            self.perception.light_exposure_threshold,
        )?;
        check_positive(
            "perception.belief_decay_interval",
            self.perception.belief_decay_interval,
        )?;
        if !(-1.0..=1.0).contains(&self.perception.light_dot_threshold) {
            return Err(AiError::InvalidConfig(format!(
                "perception.light_dot_threshold must be within [-1, 1], got {}",
                self.perception.light_dot_threshold
            )));
        }

        check_positive("navigation.stuck_check_interval", self.navigation.stuck_check_interval)?;
        check_positive("navigation.path_repair_interval", self.navigation.path_repair_interval)?;
        check_positive("navigation.alternate_radius", self.navigation.alternate_radius)?;
        check_positive("navigation.reposition_radius", self.navigation.reposition_radius)?;
        check_non_negative("navigation.min_movement", self.navigation.min_movement)?;
        check_non_negative("navigation.arrival_tolerance", self.navigation.arrival_tolerance)?;
        check_non_negative("navigation.stopping_distance", self.navigation.stopping_distance)?;
        if self.navigation.stalled_checks == 0 {
            return Err(AiError::InvalidConfig(
                "navigation.stalled_checks must be at least 1".to_string(),
            ));
        }
        if !self.navigation.unstuck_boost.is_finite() || self.navigation.unstuck_boost < 1.0 {
            return Err(AiError::InvalidConfig(format!(
                "navigation.unstuck_boost must be at least 1, got {}",
                self.navigation.unstuck_boost
            )));
        }

        check_positive("search.memory_duration", self.search.memory_duration)?;
        check_positive("search.prune_interval", self.search.prune_interval)?;
        check_positive("search.search_radius", self.search.search_radius)?;
        check_non_negative("search.look_around_duration", self.search.look_around_duration)?;

        check_non_negative("behavior.waypoint_pause", self.behavior.waypoint_pause)?;
        check_positive("behavior.chase_repath_interval", self.behavior.chase_repath_interval)?;
        if !(0.0..=1.0).contains(&self.behavior.random_waypoint_chance) {
            return Err(AiError::InvalidConfig(format!(
                "behavior.random_waypoint_chance must be within [0, 1], got {}",
                self.behavior.random_waypoint_chance
            )));
        }
        if !(0.0..1.0).contains(&self.behavior.pause_jitter) {
            return Err(AiError::InvalidConfig(format!(
                "behavior.pause_jitter must be within [0, 1), got {}",
                self.behavior.pause_jitter
            )));
        }

        if !self.spawn.is_finite() {
            return Err(AiError::InvalidConfig(format!(
                "spawn {:?} is not finite",
                self.spawn
            )));
        }
        if let Some(bad) = self.waypoints.iter().find(|w| !w.is_finite()) {
            return Err(AiError::InvalidConfig(format!(
                "waypoint {bad:?} is not finite"
            )));
        }

        Ok(())
    }
}

fn check_positive(field: &str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AiError::InvalidConfig(format!(
            "{field} must be positive, got {value}"
        )))
    }
}

fn check_non_negative(field: &str, value: f32) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(AiError::InvalidConfig(format!(
            "{field} must not be negative, got {value}"
        )))
    }
}

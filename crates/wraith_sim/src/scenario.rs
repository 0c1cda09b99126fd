//! Scenario Configuration
//!
//! Describes one headless run: the level grid, obstacles, antagonists and
//! the scripted target.
//!
//! # Configuration Sources (in priority order)
//!
//! 1. Environment variables: `WRAITH_DIFFICULTY`, `WRAITH_SEED`,
//!    `WRAITH_DURATION`
//! 2. Scenario file: `WRAITH_SCENARIO`, or the first positional argument
//! 3. The built-in demo scenario
//!
//! # Example Scenario File
//!
//! ```toml
//! name = "warehouse"
//! difficulty = "hard"   # easy, medium, hard
//! seed = 7
//! duration = 60.0       # seconds
//! tick_rate = 30.0      # ticks per second
//!
//! [grid]
//! origin = [0.0, 0.0, 0.0]
//! width = 40.0
//! depth = 40.0
//! cell_size = 1.0
//!
//! [[obstacles]]
//! min = [10.0, 0.0, 10.0]
//! max = [12.0, 3.0, 30.0]
//!
//! [[agents]]
//! spawn = [5.0, 0.0, 5.0]
//! waypoints = [[5.0, 0.0, 5.0], [35.0, 0.0, 5.0]]
//! strategy = "wander"   # wander, hunt
//!
//! [target]
//! route = [[20.0, 0.0, 35.0], [35.0, 0.0, 35.0]]
//! speed = 3.0
//! light = true
//! hidden = [[20.0, 25.0]]
//! ```

use crate::error::{Result, SimError};
use crate::navmesh::NavGrid;
use crate::world::{ScriptedTarget, World};
use serde::{Deserialize, Serialize};
use std::path::Path;
use wraith_ai::{AgentConfig, CoordinationConfig, Difficulty, PatrolStrategy};
use wraith_math::{Vec3, AABB};

/// Walkable area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Minimum corner of the grid
    pub origin: [f32; 3],
    pub width: f32,
    pub depth: f32,
    pub cell_size: f32,
    /// Extra distance kept free around obstacles
    pub clearance: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            origin: [0.0, 0.0, 0.0],
            width: 40.0,
            depth: 40.0,
            cell_size: 1.0,
            clearance: 0.0,
        }
    }
}

/// Solid box blocking movement and sight
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstacleConfig {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl ObstacleConfig {
    pub fn aabb(&self) -> AABB {
        AABB::new(Vec3::from_array(self.min), Vec3::from_array(self.max))
    }
}

/// One antagonist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSpawn {
    pub spawn: [f32; 3],
    pub waypoints: Vec<[f32; 3]>,
    /// Overrides the scenario difficulty for this agent
    pub difficulty: Option<Difficulty>,
    pub strategy: PatrolStrategy,
    /// Session time at which the agent is defeated
    pub defeat_at: Option<f32>,
}

impl Default for AgentSpawn {
    fn default() -> Self {
        Self {
            spawn: [0.0, 0.0, 0.0],
            waypoints: Vec::new(),
            difficulty: None,
            strategy: PatrolStrategy::default(),
            defeat_at: None,
        }
    }
}

/// The pursued target's script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Looped walking route
    pub route: Vec<[f32; 3]>,
    pub speed: f32,
    /// Whether the target carries a lit flashlight
    pub light: bool,
    /// `[start, end]` seconds during which the target hides
    pub hidden: Vec<[f32; 2]>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            route: vec![[20.0, 0.0, 20.0]],
            speed: 3.0,
            light: false,
            hidden: Vec::new(),
        }
    }
}

/// A noise that distracts every agent within `radius`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistractionConfig {
    /// Session time in seconds
    pub at: f32,
    pub point: [f32; 3],
    pub radius: f32,
}

/// Complete scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub name: String,
    pub difficulty: Difficulty,
    pub seed: u64,
    /// Seconds of simulated time
    pub duration: f32,
    /// Fixed ticks per second
    pub tick_rate: f32,
    pub grid: GridConfig,
    pub obstacles: Vec<ObstacleConfig>,
    pub agents: Vec<AgentSpawn>,
    pub target: TargetConfig,
    pub coordination: CoordinationConfig,
    pub distractions: Vec<DistractionConfig>,
    /// File the scenario was read from
    #[serde(skip)]
    pub source: Option<String>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            name: "scenario".to_string(),
            difficulty: Difficulty::default(),
            seed: 0,
            duration: 60.0,
            tick_rate: 30.0,
            grid: GridConfig::default(),
            obstacles: Vec::new(),
            agents: Vec::new(),
            target: TargetConfig::default(),
            coordination: CoordinationConfig::default(),
            distractions: Vec::new(),
            source: None,
        }
    }
}

impl ScenarioConfig {
    /// Three agents patrolling a walled 40 x 40 yard while the target
    /// circles it with a flashlight
    pub fn demo() -> Self {
        Self {
            name: "demo".to_string(),
            difficulty: Difficulty::Medium,
            seed: 7,
            duration: 60.0,
            tick_rate: 30.0,
            grid: GridConfig::default(),
            obstacles: vec![
                ObstacleConfig {
                    min: [12.0, 0.0, 8.0],
                    max: [14.0, 3.0, 26.0],
                },
                ObstacleConfig {
                    min: [24.0, 0.0, 14.0],
                    max: [32.0, 3.0, 16.0],
                },
            ],
            agents: vec![
                AgentSpawn {
                    spawn: [4.0, 0.0, 4.0],
                    waypoints: vec![
                        [4.0, 0.0, 4.0],
                        [4.0, 0.0, 34.0],
                        [20.0, 0.0, 4.0],
                    ],
                    ..AgentSpawn::default()
                },
                AgentSpawn {
                    spawn: [36.0, 0.0, 36.0],
                    waypoints: vec![
                        [36.0, 0.0, 36.0],
                        [36.0, 0.0, 6.0],
                        [20.0, 0.0, 30.0],
                    ],
                    ..AgentSpawn::default()
                },
                AgentSpawn {
                    spawn: [20.0, 0.0, 20.0],
                    waypoints: vec![[20.0, 0.0, 20.0], [30.0, 0.0, 24.0]],
                    strategy: PatrolStrategy::Hunt,
                    defeat_at: Some(45.0),
                    ..AgentSpawn::default()
                },
            ],
            target: TargetConfig {
                route: vec![
                    [8.0, 0.0, 36.0],
                    [30.0, 0.0, 36.0],
                    [34.0, 0.0, 20.0],
                    [18.0, 0.0, 4.0],
                ],
                speed: 3.0,
                light: true,
                hidden: vec![[20.0, 25.0]],
            },
            distractions: vec![DistractionConfig {
                at: 35.0,
                point: [20.0, 0.0, 10.0],
                radius: 15.0,
            }],
            ..Self::default()
        }
    }

    /// Load the scenario from all sources
    pub fn load() -> Result<Self> {
        let path = std::env::var("WRAITH_SCENARIO")
            .ok()
            .filter(|path| !path.is_empty())
            .or_else(|| {
                // First non-flag argument is the scenario path
                std::env::args().skip(1).find(|arg| !arg.starts_with("--"))
            });

        let mut config = match path {
            Some(path) => {
                let config = Self::from_file(&path)?;
                log::info!("Loaded scenario from {}", path);
                config
            }
            None => {
                log::info!("No scenario given, using the built-in demo");
                Self::demo()
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load a scenario from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        config.source = Some(path.display().to_string());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `WRAITH_*` overrides; unparsable values are ignored
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup("WRAITH_DIFFICULTY") {
            match value.parse() {
                Ok(difficulty) => {
                    self.difficulty = difficulty;
                    log::info!("Difficulty from env: {}", self.difficulty);
                }
                Err(e) => log::warn!("Ignoring WRAITH_DIFFICULTY={}: {}", value, e),
            }
        }

        if let Some(value) = lookup("WRAITH_SEED") {
            match value.parse() {
                Ok(seed) => self.seed = seed,
                Err(e) => log::warn!("Ignoring WRAITH_SEED={}: {}", value, e),
            }
        }

        if let Some(value) = lookup("WRAITH_DURATION") {
            match value.parse() {
                Ok(duration) => self.duration = duration,
                Err(e) => log::warn!("Ignoring WRAITH_DURATION={}: {}", value, e),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let positive = |name: &str, value: f32| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(SimError::InvalidScenario(format!(
                    "{} must be positive, got {}",
                    name, value
                )))
            }
        };
        positive("duration", self.duration)?;
        positive("tick_rate", self.tick_rate)?;
        positive("grid.width", self.grid.width)?;
        positive("grid.depth", self.grid.depth)?;
        positive("grid.cell_size", self.grid.cell_size)?;

        if self.agents.is_empty() {
            return Err(SimError::InvalidScenario("no agents".to_string()));
        }
        if self.target.route.is_empty() {
            return Err(SimError::InvalidScenario("target route is empty".to_string()));
        }
        self.coordination.validate()?;
        Ok(())
    }

    /// Seconds per tick
    pub fn dt(&self) -> f32 {
        1.0 / self.tick_rate
    }

    /// Engine configuration for one spawn entry
    pub fn agent_config(&self, spawn: &AgentSpawn) -> AgentConfig {
        AgentConfig::for_difficulty(spawn.difficulty.unwrap_or(self.difficulty))
            .with_spawn(Vec3::from_array(spawn.spawn))
            .with_waypoints(spawn.waypoints.iter().copied().map(Vec3::from_array).collect())
            .with_patrol_strategy(spawn.strategy)
    }

    pub fn build_grid(&self) -> NavGrid {
        let mut grid = NavGrid::new(
            Vec3::from_array(self.grid.origin),
            self.grid.width,
            self.grid.depth,
            self.grid.cell_size,
        );
        for obstacle in &self.obstacles {
            grid.block(&obstacle.aabb(), self.grid.clearance);
        }
        grid
    }

    pub fn build_world(&self) -> World {
        World::new(self.obstacles.iter().map(ObstacleConfig::aabb).collect())
    }

    pub fn build_target(&self) -> ScriptedTarget {
        ScriptedTarget::new(
            self.target.route.iter().copied().map(Vec3::from_array).collect(),
            self.target.speed,
        )
        .with_light(self.target.light)
        .with_hidden_windows(self.target.hidden.iter().map(|w| (w[0], w[1])).collect())
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        log::info!("Scenario: {}", self.name);
        log::info!("  Difficulty: {}, seed: {}", self.difficulty, self.seed);
        log::info!(
            "  Duration: {}s at {} ticks/s",
            self.duration,
            self.tick_rate
        );
        log::info!(
            "  Agents: {}, obstacles: {}",
            self.agents.len(),
            self.obstacles.len()
        );
        if let Some(source) = &self.source {
            log::info!("  Source: {}", source);
        }
    }
}

//! Fixed-step run loop

use crate::error::Result;
use crate::nav_agent::GridNavAgent;
use crate::scenario::{DistractionConfig, ScenarioConfig};
use crate::world::{ScriptedTarget, World};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use wraith_ai::{
    AgentEvent, AgentId, AntagonistBehavior, BehaviorState, Difficulty, Lifecycle,
    NavigationService, Session,
};
use wraith_event::EventChannel;
use wraith_math::Vec3;

/// Final state of one agent
#[derive(Debug, Clone, Serialize)]
pub struct AgentReport {
    pub id: AgentId,
    pub state: BehaviorState,
    pub lifecycle: Lifecycle,
    pub position: Vec3,
    pub belief: Option<Vec3>,
}

/// What happened during a run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub scenario: String,
    pub difficulty: Difficulty,
    pub seed: u64,
    /// Simulated seconds
    pub elapsed: f32,
    pub ticks: u64,
    pub captured_by: Option<AgentId>,
    /// Where the target ended up
    pub target: Vec3,
    pub agents: Vec<AgentReport>,
    /// Event counts by kind
    pub events: BTreeMap<&'static str, usize>,
}

/// A scenario wired to a live session
pub struct Simulation {
    scenario: ScenarioConfig,
    session: Session<GridNavAgent>,
    world: World,
    target: ScriptedTarget,
    feed: Arc<EventChannel<AgentEvent>>,
    tally: BTreeMap<&'static str, usize>,
    captured_by: Option<AgentId>,
    defeats: Vec<(f32, AgentId)>,
    distractions: Vec<DistractionConfig>,
    clock: f32,
    ticks: u64,
}

impl Simulation {
    pub fn new(scenario: ScenarioConfig) -> Result<Self> {
        scenario.validate()?;

        let grid = Arc::new(scenario.build_grid());
        log::info!(
            "Grid: {}x{} cells of {}, {} walkable",
            grid.cols(),
            grid.rows(),
            grid.cell_size(),
            grid.walkable_count()
        );

        let mut session = Session::new(scenario.coordination.clone(), scenario.seed)?;

        let feed = Arc::new(EventChannel::new());
        let sink = Arc::clone(&feed);
        session
            .events_mut()
            .subscribe(move |event: &AgentEvent| sink.send(*event));

        let mut defeats = Vec::new();
        for spawn in &scenario.agents {
            let config = scenario.agent_config(spawn);
            let nav = GridNavAgent::new(Arc::clone(&grid), config.spawn);
            let id = session.spawn(config, nav)?;
            if let Some(at) = spawn.defeat_at {
                defeats.push((at, id));
            }
        }

        let mut distractions = scenario.distractions.clone();
        distractions.sort_by(|a, b| a.at.total_cmp(&b.at));

        Ok(Self {
            world: scenario.build_world(),
            target: scenario.build_target(),
            scenario,
            session,
            feed,
            tally: BTreeMap::new(),
            captured_by: None,
            defeats,
            distractions,
            clock: 0.0,
            ticks: 0,
        })
    }

    /// Advance everything by one fixed step
    pub fn step(&mut self, dt: f32) {
        self.target.advance(dt);
        for agent in self.session.agents_mut() {
            agent.navigation_mut().advance(dt);
        }

        while self
            .distractions
            .first()
            .map_or(false, |d| d.at <= self.clock)
        {
            let distraction = self.distractions.remove(0);
            let point = Vec3::from_array(distraction.point);
            let affected = self.session.distract_near(point, distraction.radius);
            log::info!("Noise at {:?} distracted {} agent(s)", point, affected);
        }

        let clock = self.clock;
        let (due, pending): (Vec<_>, Vec<_>) =
            self.defeats.drain(..).partition(|(at, _)| *at <= clock);
        self.defeats = pending;
        for (_, id) in due {
            if let Err(e) = self.session.defeat(id) {
                log::warn!("Scripted defeat skipped: {}", e);
            }
        }
        self.record_events();

        let snapshot = self.target.snapshot(self.clock);
        self.session.tick(dt, Some(&snapshot), &self.world);

        self.record_events();

        self.clock += dt;
        self.ticks += 1;
    }

    fn record_events(&mut self) {
        for event in self.feed.drain() {
            match event {
                AgentEvent::Captured { agent, position } => {
                    log::info!("{} caught the target at {:?}", agent, position);
                    self.captured_by.get_or_insert(agent);
                }
                AgentEvent::TargetAcquired { agent, position } => {
                    log::info!("{} spotted the target at {:?}", agent, position)
                }
                other => log::debug!("{:?}", other),
            }
            *self.tally.entry(event_kind(&event)).or_insert(0) += 1;
        }
    }

    /// Run until the duration elapses or the target is caught
    pub fn run(mut self) -> RunSummary {
        let dt = self.scenario.dt();
        log::info!("Running {} for {}s", self.scenario.name, self.scenario.duration);

        while self.clock < self.scenario.duration {
            self.step(dt);
            if self.session.is_target_captured() {
                break;
            }
        }

        self.summary()
    }

    pub fn summary(&self) -> RunSummary {
        let agents = self
            .session
            .agents()
            .map(|agent| AgentReport {
                id: agent.id(),
                state: agent.state(),
                lifecycle: agent.lifecycle(),
                position: agent.navigation().position(),
                belief: agent.belief().last_known_position,
            })
            .collect();

        RunSummary {
            scenario: self.scenario.name.clone(),
            difficulty: self.scenario.difficulty,
            seed: self.scenario.seed,
            elapsed: self.clock,
            ticks: self.ticks,
            captured_by: self.captured_by,
            target: self.target.position(),
            agents,
            events: self.tally.clone(),
        }
    }
}

fn event_kind(event: &AgentEvent) -> &'static str {
    match event {
        AgentEvent::Registered { .. } => "registered",
        AgentEvent::StateEntered { .. } => "state_entered",
        AgentEvent::TargetAcquired { .. } => "target_acquired",
        AgentEvent::TargetLost { .. } => "target_lost",
        AgentEvent::ProximityWarning { .. } => "proximity_warning",
        AgentEvent::Recovered { .. } => "recovered",
        AgentEvent::AlertReceived { .. } => "alert_received",
        AgentEvent::Captured { .. } => "captured",
        AgentEvent::Defeated { .. } => "defeated",
        AgentEvent::Despawned { .. } => "despawned",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{AgentSpawn, TargetConfig};

    fn head_on() -> ScenarioConfig {
        ScenarioConfig {
            name: "head-on".to_string(),
            duration: 20.0,
            agents: vec![AgentSpawn {
                spawn: [5.5, 0.0, 5.5],
                ..AgentSpawn::default()
            }],
            target: TargetConfig {
                route: vec![[5.5, 0.0, 12.5], [5.5, 0.0, 1.5]],
                speed: 1.0,
                light: false,
                hidden: Vec::new(),
            },
            ..ScenarioConfig::default()
        }
    }

    #[test]
    fn test_target_walking_into_view_is_caught() {
        let summary = Simulation::new(head_on()).unwrap().run();
        assert!(summary.captured_by.is_some());
        assert!(summary.elapsed < 20.0);
        assert_eq!(summary.events.get("captured"), Some(&1));
        assert_eq!(summary.agents[0].lifecycle, Lifecycle::Captured);
    }

    #[test]
    fn test_same_seed_same_run() {
        let first = Simulation::new(ScenarioConfig::demo()).unwrap().run();
        let second = Simulation::new(ScenarioConfig::demo()).unwrap().run();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_scripted_defeat_removes_agent() {
        let mut scenario = head_on();
        scenario.target.route = vec![[35.5, 0.0, 35.5]];
        scenario.agents[0].defeat_at = Some(1.0);

        let mut simulation = Simulation::new(scenario).unwrap();
        for _ in 0..150 {
            simulation.step(0.1);
        }
        let summary = simulation.summary();
        assert!(summary.agents.is_empty());
        assert_eq!(summary.events.get("defeated"), Some(&1));
        assert_eq!(summary.events.get("despawned"), Some(&1));
    }

    #[test]
    fn test_invalid_scenario_is_rejected() {
        let scenario = ScenarioConfig {
            tick_rate: -1.0,
            ..head_on()
        };
        assert!(Simulation::new(scenario).is_err());
    }
}

//! Antagonist agent
//!
//! One pursuing agent: perception, decision and navigation wired together
//! around a host navigation service. Each tick runs perception, then the
//! state machine, then the navigation controller.

use crate::behavior::{BehaviorEnv, BehaviorState, BehaviorStateMachine, StateChange};
use crate::config::AgentConfig;
use crate::coordination::{Alert, PeerSnapshot};
use crate::difficulty::DifficultyProfile;
use crate::error::Result;
use crate::events::AgentEvent;
use crate::navigation::{NavigationController, NavigationStatus};
use crate::perception::{AgentPose, BeliefState, Confidence, PerceptionResult, PerceptionSystem};
use crate::search_memory::SearchMemory;
use crate::services::{NavigationService, OcclusionQuery, Target};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use wraith_math::Vec3;

/// Agent identifier, unique within a session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u32);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent-{}", self.0)
    }
}

/// Whether the agent still takes part in the game
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lifecycle {
    #[default]
    Active,
    /// Caught the target
    Captured,
    /// Defeated and awaiting removal
    Defeated,
}

/// Per-tick inputs shared by every agent in a session
#[derive(Clone, Copy)]
pub struct TickContext<'a> {
    pub dt: f32,
    /// Session time after this tick
    pub now: f64,
    pub target: Option<&'a Target>,
    pub occlusion: &'a dyn OcclusionQuery,
    /// Waypoints claimed by other patrolling agents
    pub claimed: &'a [Vec3],
}

impl<'a> TickContext<'a> {
    pub fn new(
        dt: f32,
        now: f64,
        target: Option<&'a Target>,
        occlusion: &'a dyn OcclusionQuery,
    ) -> Self {
        Self {
            dt,
            now,
            target,
            occlusion,
            claimed: &[],
        }
    }

    pub fn with_claimed(mut self, claimed: &'a [Vec3]) -> Self {
        self.claimed = claimed;
        self
    }
}

/// Capabilities every antagonist exposes to its host
pub trait AntagonistBehavior {
    fn id(&self) -> AgentId;

    fn state(&self) -> BehaviorState;

    fn belief(&self) -> &BeliefState;

    fn position(&self) -> Vec3;

    /// External stimulus (a door slam, a thrown object). With a point, the
    /// agent will investigate it once the distraction wears off.
    fn distract(&mut self, point: Option<Vec3>);

    /// Belief shared by a peer
    fn receive_alert(&mut self, alert: &Alert);

    /// Forget patrol progress
    fn reset_patrol(&mut self);

    fn is_active(&self) -> bool;
}

/// A pursuing agent driving a host navigation service
pub struct Agent<N: NavigationService> {
    id: AgentId,
    profile: DifficultyProfile,
    nav: N,
    perception: PerceptionSystem,
    controller: NavigationController,
    memory: SearchMemory,
    behavior: BehaviorStateMachine,
    rng: SmallRng,
    lifecycle: Lifecycle,
    target_visible: bool,
    warning_active: bool,
    last_target: Option<Vec3>,
    claimed: Vec<Vec3>,
    last_nav_status: NavigationStatus,
    outbox: Vec<AgentEvent>,
    now: f64,
}

impl<N: NavigationService> Agent<N> {
    /// Build an agent and run its initial patrol entry.
    ///
    /// The random stream is derived from `session_seed` and the id, so the
    /// same seed replays the same choices.
    pub fn new(id: AgentId, config: AgentConfig, nav: N, session_seed: u64) -> Result<Self> {
        config.validate()?;

        let AgentConfig {
            profile,
            perception,
            navigation,
            search,
            behavior,
            waypoints,
            ..
        } = config;
        let default_stopping = navigation.stopping_distance;
        let seed = session_seed ^ u64::from(id.0).wrapping_mul(0x9E37_79B9_7F4A_7C15);

        let mut agent = Self {
            id,
            perception: PerceptionSystem::new(&profile, perception),
            controller: NavigationController::new(navigation),
            memory: SearchMemory::from_config(&search),
            behavior: BehaviorStateMachine::new(
                profile.clone(),
                behavior,
                search,
                default_stopping,
                waypoints,
            ),
            profile,
            nav,
            rng: SmallRng::seed_from_u64(seed),
            lifecycle: Lifecycle::Active,
            target_visible: false,
            warning_active: false,
            last_target: None,
            claimed: Vec::new(),
            last_nav_status: NavigationStatus::default(),
            outbox: Vec::new(),
            now: 0.0,
        };

        agent.outbox.push(AgentEvent::Registered { agent: id });
        {
            let (behavior, mut env) = agent.split();
            behavior.begin(&mut env);
        }
        Ok(agent)
    }

    /// Advance the agent by one tick
    pub fn tick(&mut self, ctx: &TickContext<'_>) {
        if !self.is_active() {
            return;
        }
        self.now = ctx.now;
        self.memory.maybe_prune(ctx.now);
        self.claimed.clear();
        self.claimed.extend_from_slice(ctx.claimed);

        let target = ctx.target.filter(|t| t.is_valid());
        let live_target = target.filter(|t| !t.hidden);
        self.last_target = live_target.map(|t| t.position);

        let pose = AgentPose::new(self.nav.position(), self.nav.forward());
        let perception = self
            .perception
            .update(ctx.dt, ctx.now, pose, target, ctx.occlusion);
        self.track_visibility(perception);

        if self.check_proximity(pose.position, live_target) {
            return;
        }

        let hidden = target.map_or(false, |t| t.hidden);
        let change = {
            let dt = ctx.dt;
            let (behavior, mut env) = self.split();
            if hidden && behavior.state() == BehaviorState::Chasing {
                behavior.force(BehaviorState::Searching, &mut env)
            } else {
                behavior.tick(dt, perception, &mut env)
            }
        };
        if let Some(change) = change {
            self.on_state_change(change);
        }

        let status = self.controller.tick(ctx.dt, &mut self.nav, &mut self.rng);
        if let Some(action) = status.recovery {
            self.outbox.push(AgentEvent::Recovered {
                agent: self.id,
                action,
            });
        }
        self.last_nav_status = status;
    }

    /// Put the agent into its terminal defeated state
    pub fn defeat(&mut self) {
        if self.lifecycle == Lifecycle::Defeated {
            return;
        }
        self.lifecycle = Lifecycle::Defeated;
        self.controller.stop(&mut self.nav);
        self.outbox.push(AgentEvent::Defeated { agent: self.id });
        log::info!("{} defeated", self.id);
    }

    /// What the coordination bus should know about this agent
    pub fn snapshot(&self) -> PeerSnapshot {
        let belief = self.perception.belief();
        PeerSnapshot {
            position: self.nav.position(),
            state: self.behavior.state(),
            belief: belief.last_known_position,
            confidence: belief.confidence,
            patrol_claim: self.behavior.patrol_claim(),
            active: self.is_active(),
        }
    }

    /// Take the buffered events
    pub fn drain_events(&mut self) -> Vec<AgentEvent> {
        std::mem::take(&mut self.outbox)
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn profile(&self) -> &DifficultyProfile {
        &self.profile
    }

    /// Seconds spent in the current state
    pub fn elapsed_in_state(&self) -> f32 {
        self.behavior.elapsed()
    }

    pub fn last_perception(&self) -> PerceptionResult {
        self.perception.last_result()
    }

    pub fn last_navigation_status(&self) -> NavigationStatus {
        self.last_nav_status
    }

    pub fn behavior(&self) -> &BehaviorStateMachine {
        &self.behavior
    }

    pub fn perception(&self) -> &PerceptionSystem {
        &self.perception
    }

    pub fn controller(&self) -> &NavigationController {
        &self.controller
    }

    pub fn search_memory(&self) -> &SearchMemory {
        &self.memory
    }

    pub fn navigation(&self) -> &N {
        &self.nav
    }

    /// Host access to the navigation service, e.g. to advance movement
    pub fn navigation_mut(&mut self) -> &mut N {
        &mut self.nav
    }

    fn split(&mut self) -> (&mut BehaviorStateMachine, BehaviorEnv<'_, N, SmallRng>) {
        let belief = self.perception.belief().last_known_position;
        (
            &mut self.behavior,
            BehaviorEnv {
                nav: &mut self.nav,
                controller: &mut self.controller,
                memory: &mut self.memory,
                rng: &mut self.rng,
                belief,
                target_position: self.last_target,
                claimed: &self.claimed,
                now: self.now,
            },
        )
    }

    fn on_state_change(&mut self, change: StateChange) {
        log::debug!("{} {} -> {}", self.id, change.from, change.to);
        self.outbox.push(AgentEvent::StateEntered {
            agent: self.id,
            from: change.from,
            to: change.to,
        });
    }

    fn track_visibility(&mut self, perception: PerceptionResult) {
        if perception.visible == self.target_visible {
            return;
        }
        self.target_visible = perception.visible;

        let belief = self.perception.belief().last_known_position;
        let event = if perception.visible {
            AgentEvent::TargetAcquired {
                agent: self.id,
                position: belief.unwrap_or_else(|| self.nav.position()),
            }
        } else {
            AgentEvent::TargetLost {
                agent: self.id,
                last_known: belief,
            }
        };
        self.outbox.push(event);
    }

    /// Raise warning edges and capture; returns true once captured
    fn check_proximity(&mut self, position: Vec3, target: Option<&Target>) -> bool {
        let distance = target.map(|t| position.distance(t.position));
        let warn = distance.map_or(false, |d| d <= self.profile.warning_range);
        if warn != self.warning_active {
            self.warning_active = warn;
            self.outbox.push(AgentEvent::ProximityWarning {
                agent: self.id,
                active: warn,
            });
        }

        match (target, distance) {
            (Some(target), Some(d)) if d <= self.profile.kill_distance => {
                self.lifecycle = Lifecycle::Captured;
                self.controller.stop(&mut self.nav);
                self.outbox.push(AgentEvent::Captured {
                    agent: self.id,
                    position: target.position,
                });
                log::info!("{} captured the target at {:?}", self.id, target.position);
                true
            }
            _ => false,
        }
    }
}

impl<N: NavigationService> AntagonistBehavior for Agent<N> {
    fn id(&self) -> AgentId {
        self.id
    }

    fn state(&self) -> BehaviorState {
        self.behavior.state()
    }

    fn belief(&self) -> &BeliefState {
        self.perception.belief()
    }

    fn position(&self) -> Vec3 {
        self.nav.position()
    }

    fn distract(&mut self, point: Option<Vec3>) {
        if !self.is_active() {
            return;
        }
        if let Some(point) = point {
            self.perception.adopt_belief(point, Confidence::Heard, self.now);
        }
        if self.behavior.state() == BehaviorState::Distracted {
            self.behavior.restart_timer();
            return;
        }
        let change = {
            let (behavior, mut env) = self.split();
            behavior.force(BehaviorState::Distracted, &mut env)
        };
        if let Some(change) = change {
            self.on_state_change(change);
        }
    }

    fn receive_alert(&mut self, alert: &Alert) {
        if !self.is_active() {
            return;
        }
        let confidence = alert.confidence.max(Confidence::Heard);
        self.perception.adopt_belief(alert.position, confidence, self.now);
        self.outbox.push(AgentEvent::AlertReceived {
            agent: self.id,
            from: alert.from,
            position: alert.position,
        });

        let next = match self.behavior.state() {
            BehaviorState::Chasing | BehaviorState::Investigating => return,
            _ if self.perception.last_result().visible => BehaviorState::Chasing,
            _ => BehaviorState::Investigating,
        };
        let change = {
            let (behavior, mut env) = self.split();
            behavior.force(next, &mut env)
        };
        if let Some(change) = change {
            self.on_state_change(change);
        }
    }

    fn reset_patrol(&mut self) {
        if !self.is_active() {
            return;
        }
        let (behavior, mut env) = self.split();
        behavior.reset_patrol(&mut env);
    }

    fn is_active(&self) -> bool {
        self.lifecycle == Lifecycle::Active
    }
}

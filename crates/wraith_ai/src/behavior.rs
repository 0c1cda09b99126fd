//! Behavior state machine
//!
//! Five states driven by perception output and per-state timers. The
//! transition table is a pure function ([`evaluate_transition`]); the
//! [`BehaviorStateMachine`] runs entry actions and per-state activities
//! (patrol pauses, search sweeps, chase refreshes) on top of it.

use crate::config::{BehaviorConfig, PatrolStrategy, SearchConfig};
use crate::difficulty::DifficultyProfile;
use crate::navigation::NavigationController;
use crate::patrol::{PatrolContext, PatrolRoute};
use crate::perception::PerceptionResult;
use crate::schedule::{Interval, Timer};
use crate::search::SearchPlan;
use crate::search_memory::SearchMemory;
use crate::services::NavigationService;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use wraith_math::{consts::TAU, Vec3};

/// Behavior state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BehaviorState {
    #[default]
    Patrolling,
    Investigating,
    Chasing,
    Searching,
    Distracted,
}

impl fmt::Display for BehaviorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BehaviorState::Patrolling => "patrolling",
            BehaviorState::Investigating => "investigating",
            BehaviorState::Chasing => "chasing",
            BehaviorState::Searching => "searching",
            BehaviorState::Distracted => "distracted",
        };
        f.write_str(name)
    }
}

/// Everything the transition table looks at
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TransitionInputs {
    pub perception: PerceptionResult,
    /// Within arrival distance of the belief position
    pub arrived_at_belief: bool,
    /// Seconds spent in the current state
    pub elapsed: f32,
}

/// Outcome of the transition table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Stay,
    /// Stay, restarting the state timer
    ResetTimer,
    Enter(BehaviorState),
}

/// The transition table. Rows are checked top to bottom; the first match wins.
pub fn evaluate_transition(
    state: BehaviorState,
    inputs: &TransitionInputs,
    profile: &DifficultyProfile,
) -> Transition {
    let seen = inputs.perception.visible;
    match state {
        BehaviorState::Patrolling => {
            if seen {
                Transition::Enter(BehaviorState::Chasing)
            } else if inputs.perception.audible || inputs.perception.lit_by_target {
                Transition::Enter(BehaviorState::Investigating)
            } else {
                Transition::Stay
            }
        }
        BehaviorState::Investigating => {
            if seen {
                Transition::Enter(BehaviorState::Chasing)
            } else if inputs.arrived_at_belief {
                Transition::Enter(BehaviorState::Searching)
            } else {
                Transition::Stay
            }
        }
        BehaviorState::Chasing => {
            if seen {
                Transition::ResetTimer
            } else if inputs.elapsed > profile.chase_duration {
                Transition::Enter(BehaviorState::Searching)
            } else {
                Transition::Stay
            }
        }
        BehaviorState::Searching => {
            if seen {
                Transition::Enter(BehaviorState::Chasing)
            } else if inputs.elapsed > profile.search_duration {
                Transition::Enter(BehaviorState::Patrolling)
            } else {
                Transition::Stay
            }
        }
        BehaviorState::Distracted => {
            if inputs.elapsed > profile.distraction_duration {
                Transition::Enter(BehaviorState::Investigating)
            } else {
                Transition::Stay
            }
        }
    }
}

/// A state change performed by the machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateChange {
    pub from: BehaviorState,
    pub to: BehaviorState,
}

/// Collaborators borrowed for one step of the machine
pub struct BehaviorEnv<'a, N: ?Sized, R> {
    pub nav: &'a mut N,
    pub controller: &'a mut NavigationController,
    pub memory: &'a mut SearchMemory,
    pub rng: &'a mut R,
    /// Current belief position
    pub belief: Option<Vec3>,
    /// Live target position when the target is valid and not hidden
    pub target_position: Option<Vec3>,
    /// Waypoints claimed by other patrolling agents
    pub claimed: &'a [Vec3],
    /// Session time
    pub now: f64,
}

/// What the agent is doing inside its current state
#[derive(Clone, Debug, PartialEq)]
enum Activity {
    Idle,
    Moving,
    Pausing(Timer),
    LookingAround { timer: Timer, origin: Vec3 },
}

/// Decision core for one agent
#[derive(Clone, Debug)]
pub struct BehaviorStateMachine {
    state: BehaviorState,
    previous: Option<BehaviorState>,
    elapsed: f32,
    profile: DifficultyProfile,
    config: BehaviorConfig,
    search: SearchConfig,
    default_stopping_distance: f32,
    route: PatrolRoute,
    plan: SearchPlan,
    activity: Activity,
    chase_refresh: Interval,
}

impl BehaviorStateMachine {
    pub fn new(
        profile: DifficultyProfile,
        config: BehaviorConfig,
        search: SearchConfig,
        default_stopping_distance: f32,
        waypoints: Vec<Vec3>,
    ) -> Self {
        Self {
            state: BehaviorState::Patrolling,
            previous: None,
            elapsed: 0.0,
            chase_refresh: Interval::new(config.chase_repath_interval),
            profile,
            config,
            search,
            default_stopping_distance,
            route: PatrolRoute::new(waypoints),
            plan: SearchPlan::default(),
            activity: Activity::Idle,
        }
    }

    pub fn state(&self) -> BehaviorState {
        self.state
    }

    pub fn previous(&self) -> Option<BehaviorState> {
        self.previous
    }

    /// Seconds spent in the current state
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn route(&self) -> &PatrolRoute {
        &self.route
    }

    pub fn plan(&self) -> &SearchPlan {
        &self.plan
    }

    /// Waypoint currently claimed by this agent while patrolling
    pub fn patrol_claim(&self) -> Option<Vec3> {
        match self.state {
            BehaviorState::Patrolling => self.route.current_waypoint(),
            _ => None,
        }
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.activity, Activity::Pausing(_))
    }

    pub fn is_looking_around(&self) -> bool {
        matches!(self.activity, Activity::LookingAround { .. })
    }

    /// Run the initial state's entry actions
    pub fn begin<N: NavigationService + ?Sized, R: Rng>(&mut self, env: &mut BehaviorEnv<'_, N, R>) {
        self.elapsed = 0.0;
        self.run_entry(env);
    }

    /// One decision step: evaluate the table, then either enter the new
    /// state or continue the current state's activity.
    pub fn tick<N: NavigationService + ?Sized, R: Rng>(
        &mut self,
        dt: f32,
        perception: PerceptionResult,
        env: &mut BehaviorEnv<'_, N, R>,
    ) -> Option<StateChange> {
        self.elapsed += dt;

        let inputs = TransitionInputs {
            perception,
            arrived_at_belief: self.arrived_at_belief(env),
            elapsed: self.elapsed,
        };

        match evaluate_transition(self.state, &inputs, &self.profile) {
            Transition::Stay => {
                self.run_activity(dt, env);
                None
            }
            Transition::ResetTimer => {
                self.elapsed = 0.0;
                self.run_activity(dt, env);
                None
            }
            Transition::Enter(next) => Some(self.enter(next, env)),
        }
    }

    /// Switch state from outside the table (alerts, distraction, hiding).
    /// Entering the current state again is a no-op.
    pub fn force<N: NavigationService + ?Sized, R: Rng>(
        &mut self,
        next: BehaviorState,
        env: &mut BehaviorEnv<'_, N, R>,
    ) -> Option<StateChange> {
        if next == self.state {
            return None;
        }
        Some(self.enter(next, env))
    }

    /// Restart the current state's timer
    pub fn restart_timer(&mut self) {
        self.elapsed = 0.0;
    }

    /// Forget patrol progress; a patrolling agent re-plans immediately
    pub fn reset_patrol<N: NavigationService + ?Sized, R: Rng>(
        &mut self,
        env: &mut BehaviorEnv<'_, N, R>,
    ) {
        self.route.reset();
        if self.state == BehaviorState::Patrolling {
            self.advance_patrol(env);
        }
    }

    fn enter<N: NavigationService + ?Sized, R: Rng>(
        &mut self,
        next: BehaviorState,
        env: &mut BehaviorEnv<'_, N, R>,
    ) -> StateChange {
        let from = self.state;
        self.previous = Some(from);
        self.state = next;
        self.elapsed = 0.0;

        if from == BehaviorState::Distracted {
            env.controller.resume(env.nav);
        }

        self.run_entry(env);
        StateChange { from, to: next }
    }

    fn run_entry<N: NavigationService + ?Sized, R: Rng>(&mut self, env: &mut BehaviorEnv<'_, N, R>) {
        self.activity = Activity::Idle;

        let stopping = match self.state {
            BehaviorState::Chasing => self.profile.chase_stopping_distance,
            _ => self.default_stopping_distance,
        };
        env.controller.set_stopping_distance(env.nav, stopping);

        match self.state {
            BehaviorState::Patrolling => {
                env.controller.set_base_speed(env.nav, self.profile.walk_speed);
                self.plan.clear();
                self.advance_patrol(env);
            }
            BehaviorState::Investigating => {
                env.controller
                    .set_base_speed(env.nav, self.profile.investigate_speed);
                if let Some(belief) = env.belief {
                    env.controller.request_destination(env.nav, belief);
                    self.activity = Activity::Moving;
                }
            }
            BehaviorState::Chasing => {
                env.controller.set_base_speed(env.nav, self.profile.chase_speed);
                self.chase_refresh.restart();
                self.refresh_chase(env);
                self.activity = Activity::Moving;
            }
            BehaviorState::Searching => {
                env.controller.set_base_speed(env.nav, self.profile.walk_speed);
                let center = env.belief.unwrap_or_else(|| env.nav.position());
                self.plan = SearchPlan::generate(
                    center,
                    &self.route,
                    env.memory,
                    &*env.nav,
                    &self.search,
                    env.now,
                    env.rng,
                );
                if let Some(point) = self.plan.current() {
                    env.controller.request_destination(env.nav, point);
                    self.activity = Activity::Moving;
                }
            }
            BehaviorState::Distracted => {
                env.controller.stop(env.nav);
            }
        }
    }

    fn arrived_at_belief<N: NavigationService + ?Sized, R>(&self, env: &BehaviorEnv<'_, N, R>) -> bool {
        if self.state != BehaviorState::Investigating {
            return false;
        }
        match env.belief {
            Some(belief) => {
                env.nav.position().distance(belief) <= env.controller.arrival_radius(&*env.nav)
                    || env.controller.has_arrived(&*env.nav)
            }
            // Nothing to investigate; fall through to a local search
            None => true,
        }
    }

    fn run_activity<N: NavigationService + ?Sized, R: Rng>(
        &mut self,
        dt: f32,
        env: &mut BehaviorEnv<'_, N, R>,
    ) {
        match self.state {
            BehaviorState::Patrolling => self.run_patrol(dt, env),
            BehaviorState::Investigating => {
                if let Some(belief) = env.belief {
                    env.controller.request_destination(env.nav, belief);
                    self.activity = Activity::Moving;
                }
            }
            BehaviorState::Chasing => {
                if self.chase_refresh.tick(dt).is_some() {
                    self.refresh_chase(env);
                }
            }
            BehaviorState::Searching => self.run_search(dt, env),
            BehaviorState::Distracted => {}
        }
    }

    fn refresh_chase<N: NavigationService + ?Sized, R>(&mut self, env: &mut BehaviorEnv<'_, N, R>) {
        if let Some(destination) = env.target_position.or(env.belief) {
            env.controller.request_destination(env.nav, destination);
        }
    }

    fn advance_patrol<N: NavigationService + ?Sized, R: Rng>(
        &mut self,
        env: &mut BehaviorEnv<'_, N, R>,
    ) {
        let ctx = PatrolContext {
            agent_position: env.nav.position(),
            target_position: match self.config.patrol_strategy {
                PatrolStrategy::Hunt => env.target_position,
                PatrolStrategy::Wander => None,
            },
            claimed: env.claimed,
            claim_radius: self.config.claim_radius,
            random_chance: self.config.random_waypoint_chance,
            strategy: self.config.patrol_strategy,
        };

        match self.route.select_next(&ctx, env.rng) {
            Some(waypoint) => {
                env.controller.request_destination(env.nav, waypoint);
                self.activity = Activity::Moving;
            }
            None => {
                env.controller.clear_destination(env.nav);
                self.activity = Activity::Idle;
            }
        }
    }

    fn run_patrol<N: NavigationService + ?Sized, R: Rng>(
        &mut self,
        dt: f32,
        env: &mut BehaviorEnv<'_, N, R>,
    ) {
        match &mut self.activity {
            Activity::Moving => {
                if env.controller.has_arrived(&*env.nav) {
                    if let Some(waypoint) = self.route.current_waypoint() {
                        env.memory.record(waypoint, env.now);
                    }
                    let jitter = self.config.pause_jitter;
                    let factor = 1.0 + env.rng.gen_range(-jitter..=jitter);
                    self.activity = Activity::Pausing(Timer::new(self.config.waypoint_pause * factor));
                }
            }
            Activity::Pausing(timer) => {
                if timer.tick(dt) {
                    self.advance_patrol(env);
                }
            }
            Activity::Idle | Activity::LookingAround { .. } => {}
        }
    }

    fn run_search<N: NavigationService + ?Sized, R: Rng>(
        &mut self,
        dt: f32,
        env: &mut BehaviorEnv<'_, N, R>,
    ) {
        match &mut self.activity {
            Activity::Moving => {
                if env.controller.has_arrived(&*env.nav) {
                    if let Some(point) = self.plan.current() {
                        env.memory.record(point, env.now);
                    }
                    self.activity = Activity::LookingAround {
                        timer: Timer::new(self.search.look_around_duration),
                        origin: env.nav.forward(),
                    };
                }
            }
            Activity::LookingAround { timer, origin } => {
                let done = timer.tick(dt);
                env.nav.set_forward(origin.rotate_y(TAU * timer.progress()));
                if done {
                    self.activity = match self.plan.advance() {
                        Some(next) => {
                            env.controller.request_destination(env.nav, next);
                            Activity::Moving
                        }
                        None => Activity::Idle,
                    };
                }
            }
            Activity::Idle | Activity::Pausing(_) => {}
        }
    }
}

//! Navigation control
//!
//! Wraps a host [`NavigationService`] and owns everything the decision
//! layer should not care about: destination throttling, arrival checks,
//! stuck detection, path repair and the speed multiplier applied after a
//! recovery. It is the only code that sets the agent's speed.

use crate::config::NavigationConfig;
use crate::schedule::{Interval, Timer};
use crate::services::{NavigationService, PathStatus};
use rand::Rng;
use serde::{Deserialize, Serialize};
use wraith_math::{consts::TAU, Vec3};

/// Corrective action taken by the controller
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum RecoveryAction {
    /// Detoured to a nearby navigable point
    AlternatePoint(Vec3),
    /// Teleported onto the navigable surface
    Reposition(Vec3),
    /// Re-requested the destination after a partial or invalid path
    PathRepaired(Vec3),
    /// No recovery was possible this time
    Exhausted,
}

/// What happened during one controller tick
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NavigationStatus {
    pub arrived: bool,
    /// A stuck condition was detected this tick
    pub stuck: bool,
    pub recovery: Option<RecoveryAction>,
}

/// Per-agent movement controller
#[derive(Clone, Debug)]
pub struct NavigationController {
    config: NavigationConfig,
    /// Destination the decision layer asked for
    intended: Option<Vec3>,
    /// Destination last handed to the planner
    forwarded: Option<Vec3>,
    /// Heading to an alternate point instead of `intended`
    detour: bool,
    forwarded_count: u64,
    base_speed: f32,
    boost: Option<Timer>,
    stopped: bool,
    stuck_check: Interval,
    last_sample: Option<Vec3>,
    stalled_checks: u32,
    recoveries_without_progress: u32,
    repair: Interval,
}

impl NavigationController {
    pub fn new(config: NavigationConfig) -> Self {
        Self {
            stuck_check: Interval::delayed(config.stuck_check_interval),
            repair: Interval::delayed(config.path_repair_interval),
            config,
            intended: None,
            forwarded: None,
            detour: false,
            forwarded_count: 0,
            base_speed: 0.0,
            boost: None,
            stopped: false,
            last_sample: None,
            stalled_checks: 0,
            recoveries_without_progress: 0,
        }
    }

    /// Ask for a destination. The planner is only called when the point
    /// differs from the last forwarded one by more than the threshold.
    ///
    /// Returns whether a new request reached the planner.
    pub fn request_destination<N: NavigationService + ?Sized>(
        &mut self,
        nav: &mut N,
        point: Vec3,
    ) -> bool {
        if !point.is_finite() {
            return false;
        }
        self.intended = Some(point);
        if self.detour {
            return false;
        }
        if let Some(previous) = self.forwarded {
            if previous.distance(point) <= self.config.destination_threshold {
                return false;
            }
        }
        self.forward_to(nav, point)
    }

    /// Request a destination bypassing the change threshold
    pub fn force_destination<N: NavigationService + ?Sized>(
        &mut self,
        nav: &mut N,
        point: Vec3,
    ) -> bool {
        if !point.is_finite() {
            return false;
        }
        self.intended = Some(point);
        self.detour = false;
        self.forward_to(nav, point)
    }

    /// Drop the destination and hold position
    pub fn clear_destination<N: NavigationService + ?Sized>(&mut self, nav: &mut N) {
        self.intended = None;
        self.forwarded = None;
        self.detour = false;
        nav.set_destination(nav.position());
    }

    /// Halt movement, keeping the destination
    pub fn stop<N: NavigationService + ?Sized>(&mut self, nav: &mut N) {
        self.stopped = true;
        nav.set_stopped(true);
    }

    pub fn resume<N: NavigationService + ?Sized>(&mut self, nav: &mut N) {
        self.stopped = false;
        nav.set_stopped(false);
    }

    /// Set the state-dependent speed; any active boost stays applied on top
    pub fn set_base_speed<N: NavigationService + ?Sized>(&mut self, nav: &mut N, speed: f32) {
        self.base_speed = speed.max(0.0);
        self.apply_speed(nav);
    }

    pub fn set_stopping_distance<N: NavigationService + ?Sized>(
        &mut self,
        nav: &mut N,
        distance: f32,
    ) {
        nav.set_stopping_distance(distance.max(0.0));
    }

    /// Speed currently handed to the planner
    pub fn effective_speed(&self) -> f32 {
        match self.boost {
            Some(_) => self.base_speed * self.config.unstuck_boost,
            None => self.base_speed,
        }
    }

    pub fn intended_destination(&self) -> Option<Vec3> {
        self.intended
    }

    /// Number of requests that reached the planner
    pub fn forwarded_count(&self) -> u64 {
        self.forwarded_count
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn is_boosted(&self) -> bool {
        self.boost.is_some()
    }

    /// Distance from the destination that counts as arrived
    pub fn arrival_radius<N: NavigationService + ?Sized>(&self, nav: &N) -> f32 {
        nav.stopping_distance().max(self.config.arrival_tolerance)
    }

    /// Whether the agent has reached the destination the decision layer asked for
    pub fn has_arrived<N: NavigationService + ?Sized>(&self, nav: &N) -> bool {
        self.intended.is_some() && !self.detour && self.path_reached(nav)
    }

    /// Advance timers, check arrival, stuck state and path health
    pub fn tick<N: NavigationService + ?Sized, R: Rng>(
        &mut self,
        dt: f32,
        nav: &mut N,
        rng: &mut R,
    ) -> NavigationStatus {
        let mut status = NavigationStatus::default();

        if let Some(timer) = self.boost.as_mut() {
            if timer.tick(dt) {
                self.boost = None;
                self.apply_speed(nav);
            }
        }

        if self.detour && self.path_reached(nav) {
            self.detour = false;
            if let Some(intended) = self.intended {
                log::debug!("detour complete, resuming toward {intended:?}");
                self.forward_to(nav, intended);
            }
        }

        if self.repair.tick(dt).is_some() {
            if let Some(intended) = self.intended {
                if !self.detour && nav.path_status().needs_repair() {
                    log::debug!("repairing {:?} path to {intended:?}", nav.path_status());
                    self.forward_to(nav, intended);
                    status.recovery = Some(RecoveryAction::PathRepaired(intended));
                }
            }
        }

        if self.stuck_check.tick(dt).is_some() {
            if let Some(action) = self.check_stuck(nav, rng) {
                status.stuck = true;
                status.recovery = Some(action);
            }
        }

        status.arrived = self.has_arrived(nav);
        status
    }

    fn path_reached<N: NavigationService + ?Sized>(&self, nav: &N) -> bool {
        matches!(nav.path_status(), PathStatus::Complete | PathStatus::Partial)
            && nav.remaining_distance() <= self.arrival_radius(nav)
    }

    fn forward_to<N: NavigationService + ?Sized>(&mut self, nav: &mut N, point: Vec3) -> bool {
        if nav.set_destination(point) {
            self.forwarded = Some(point);
            self.forwarded_count += 1;
            log::trace!("destination forwarded: {point:?}");
            true
        } else {
            log::trace!("planner rejected destination {point:?}");
            false
        }
    }

    fn apply_speed<N: NavigationService + ?Sized>(&self, nav: &mut N) {
        nav.set_speed(self.effective_speed());
    }

    fn start_boost<N: NavigationService + ?Sized>(&mut self, nav: &mut N) {
        self.boost = Some(Timer::new(self.config.unstuck_boost_duration));
        self.apply_speed(nav);
    }

    fn reset_stall(&mut self, position: Vec3) {
        self.last_sample = Some(position);
        self.stalled_checks = 0;
    }

    fn check_stuck<N: NavigationService + ?Sized, R: Rng>(
        &mut self,
        nav: &mut N,
        rng: &mut R,
    ) -> Option<RecoveryAction> {
        let position = nav.position();

        if !nav.is_on_navigable_surface() {
            log::warn!("agent left the navigable surface at {position:?}");
            let action = self.reposition(nav);
            self.reset_stall(nav.position());
            return Some(action);
        }

        // Idle, halted or arrived agents are not expected to move
        if self.stopped || self.intended.is_none() || self.has_arrived(nav) {
            self.reset_stall(position);
            return None;
        }

        let Some(previous) = self.last_sample.replace(position) else {
            return None;
        };
        if previous.distance(position) >= self.config.min_movement {
            self.stalled_checks = 0;
            self.recoveries_without_progress = 0;
            return None;
        }

        self.stalled_checks += 1;
        if self.stalled_checks < self.config.stalled_checks {
            return None;
        }
        self.stalled_checks = 0;

        let action = if self.recoveries_without_progress % 2 == 0 {
            match self.try_alternate(nav, rng) {
                Some(action) => action,
                None => self.reposition(nav),
            }
        } else {
            self.reposition(nav)
        };
        self.recoveries_without_progress += 1;
        self.last_sample = Some(nav.position());
        Some(action)
    }

    fn try_alternate<N: NavigationService + ?Sized, R: Rng>(
        &mut self,
        nav: &mut N,
        rng: &mut R,
    ) -> Option<RecoveryAction> {
        let origin = nav.position();
        let radius = self.config.alternate_radius;

        for _ in 0..self.config.alternate_attempts {
            let angle = rng.gen_range(0.0..TAU);
            let distance = rng.gen_range(radius * 0.5..=radius);
            let candidate = origin + Vec3::new(angle.cos(), 0.0, angle.sin()) * distance;

            let Some(point) = nav.sample_nearest_navigable_point(candidate, radius) else {
                continue;
            };
            if point.distance(origin) < self.config.min_movement {
                continue;
            }
            if nav.set_destination(point) {
                log::debug!("stuck at {origin:?}, detouring to {point:?}");
                self.forwarded = Some(point);
                self.forwarded_count += 1;
                self.detour = self.intended.is_some();
                self.start_boost(nav);
                return Some(RecoveryAction::AlternatePoint(point));
            }
        }
        None
    }

    fn reposition<N: NavigationService + ?Sized>(&mut self, nav: &mut N) -> RecoveryAction {
        let origin = nav.position();
        let toward = self
            .intended
            .map(|target| (target - origin).with_y(0.0).normalize_or_zero())
            .unwrap_or(Vec3::ZERO);
        let probes = [origin + toward * self.config.alternate_radius, origin];

        for probe in probes {
            let Some(point) =
                nav.sample_nearest_navigable_point(probe, self.config.reposition_radius)
            else {
                continue;
            };
            if nav.reposition(point) {
                log::warn!("repositioned agent from {origin:?} to {point:?}");
                self.detour = false;
                self.forwarded = None;
                if let Some(intended) = self.intended {
                    self.forward_to(nav, intended);
                }
                self.start_boost(nav);
                return RecoveryAction::Reposition(point);
            }
        }

        log::warn!("navigation recovery exhausted at {origin:?}");
        RecoveryAction::Exhausted
    }
}

impl Default for NavigationController {
    fn default() -> Self {
        Self::new(NavigationConfig::default())
    }
}

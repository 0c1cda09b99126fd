//! Perception and belief tracking
//!
//! Sight, hearing and light-exposure sensing against a single target,
//! evaluated on a throttle. Positive detections feed the agent's
//! [`BeliefState`], which is only ever written from here.

use crate::config::PerceptionConfig;
use crate::difficulty::DifficultyProfile;
use crate::schedule::Interval;
use crate::services::{OcclusionQuery, Target};
use serde::{Deserialize, Serialize};
use wraith_math::{decay_toward_zero, Vec3};

/// How the belief position was obtained, weakest first
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Confidence {
    #[default]
    None,
    Heard,
    Seen,
    LitBySource,
}

impl Confidence {
    /// One level weaker
    pub fn degraded(self) -> Self {
        match self {
            Confidence::LitBySource => Confidence::Seen,
            Confidence::Seen => Confidence::Heard,
            Confidence::Heard | Confidence::None => Confidence::None,
        }
    }
}

/// Where the agent thinks the target is
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BeliefState {
    /// Last position the target was detected at
    pub last_known_position: Option<Vec3>,
    pub confidence: Confidence,
    /// Session time of the update
    pub timestamp: f64,
}

impl BeliefState {
    pub fn is_known(&self) -> bool {
        self.last_known_position.is_some()
    }
}

/// Agent position and facing used for one evaluation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentPose {
    pub position: Vec3,
    pub forward: Vec3,
}

impl AgentPose {
    pub fn new(position: Vec3, forward: Vec3) -> Self {
        Self { position, forward }
    }
}

/// Outcome of a sensor evaluation
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PerceptionResult {
    /// Target in range, inside the view cone and not occluded
    pub visible: bool,
    /// Target within hearing range
    pub audible: bool,
    /// Sustained exposure to the target's light
    pub lit_by_target: bool,
}

impl PerceptionResult {
    pub const NONE: Self = Self {
        visible: false,
        audible: false,
        lit_by_target: false,
    };

    /// Whether anything was detected
    pub fn any(&self) -> bool {
        self.visible || self.audible || self.lit_by_target
    }
}

/// Throttled sensor suite for one agent
#[derive(Clone, Debug)]
pub struct PerceptionSystem {
    detection_range: f32,
    half_fov: f32,
    hearing_range: f32,
    config: PerceptionConfig,
    throttle: Interval,
    light_exposure: f32,
    last_result: PerceptionResult,
    belief: BeliefState,
    since_detection: f32,
}

impl PerceptionSystem {
    pub fn new(profile: &DifficultyProfile, config: PerceptionConfig) -> Self {
        Self {
            detection_range: profile.detection_range,
            half_fov: profile.half_fov_radians(),
            hearing_range: profile.hearing_range,
            throttle: Interval::new(config.evaluation_interval),
            config,
            light_exposure: 0.0,
            last_result: PerceptionResult::NONE,
            belief: BeliefState::default(),
            since_detection: 0.0,
        }
    }

    /// Whether the target is in range, inside the view cone and unoccluded
    pub fn can_see(&self, pose: AgentPose, target: &Target, occlusion: &dyn OcclusionQuery) -> bool {
        let to_target = target.position - pose.position;
        if to_target.length() > self.detection_range {
            return false;
        }
        if pose.forward.angle_between(to_target) > self.half_fov {
            return false;
        }
        !occlusion.raycast_blocked(pose.position, target.position)
    }

    /// Whether the target is within hearing range
    pub fn can_hear(&self, pose: AgentPose, target: &Target) -> bool {
        pose.position.distance(target.position) <= self.hearing_range
    }

    /// Whether the target's light shines along the agent's line to it this
    /// instant. Line of sight is not required.
    pub fn is_in_light(&self, pose: AgentPose, target: &Target) -> bool {
        if !target.emitting_light {
            return false;
        }
        let to_target = target.position - pose.position;
        if to_target.length() > self.detection_range {
            return false;
        }
        let facing = to_target
            .normalize_or_zero()
            .dot(target.forward.normalize_or_zero());
        facing > self.config.light_dot_threshold
    }

    /// Run one evaluation covering `elapsed` seconds of light exposure.
    ///
    /// A missing, invalid or hidden target yields a negative result and
    /// lets the exposure accumulator drain.
    pub fn evaluate(
        &mut self,
        elapsed: f32,
        now: f64,
        pose: AgentPose,
        target: Option<&Target>,
        occlusion: &dyn OcclusionQuery,
    ) -> PerceptionResult {
        let target = match target {
            Some(target) if target.is_valid() && !target.hidden => target,
            _ => {
                self.light_exposure = decay_toward_zero(self.light_exposure, elapsed);
                self.last_result = PerceptionResult::NONE;
                return self.last_result;
            }
        };

        let visible = self.can_see(pose, target, occlusion);
        let audible = self.can_hear(pose, target);

        if self.is_in_light(pose, target) {
            self.light_exposure += elapsed;
        } else {
            self.light_exposure = decay_toward_zero(self.light_exposure, elapsed);
        }
        let lit_by_target = self.light_exposure >= self.config.light_exposure_threshold;

        let confidence = if visible {
            Confidence::Seen
        } else if lit_by_target {
            Confidence::LitBySource
        } else if audible {
            Confidence::Heard
        } else {
            Confidence::None
        };
        if confidence != Confidence::None {
            self.record_detection(target.position, confidence, now);
        }

        self.last_result = PerceptionResult {
            visible,
            audible,
            lit_by_target,
        };
        self.last_result
    }

    /// Per-tick entry point: evaluates when the throttle fires, otherwise
    /// returns the previous result. Belief confidence decays every tick.
    pub fn update(
        &mut self,
        dt: f32,
        now: f64,
        pose: AgentPose,
        target: Option<&Target>,
        occlusion: &dyn OcclusionQuery,
    ) -> PerceptionResult {
        self.decay_belief(dt);
        match self.throttle.tick(dt) {
            Some(elapsed) => self.evaluate(elapsed, now, pose, target, occlusion),
            None => self.last_result,
        }
    }

    /// Replace the belief with information from outside the sensors
    /// (peer alerts, distractions)
    pub fn adopt_belief(&mut self, position: Vec3, confidence: Confidence, now: f64) {
        self.record_detection(position, confidence, now);
    }

    /// Forget the last result so the next tick re-evaluates immediately
    pub fn invalidate(&mut self) {
        self.last_result = PerceptionResult::NONE;
        self.throttle.reset();
    }

    pub fn belief(&self) -> &BeliefState {
        &self.belief
    }

    pub fn last_result(&self) -> PerceptionResult {
        self.last_result
    }

    /// Accumulated seconds of light exposure
    pub fn light_exposure(&self) -> f32 {
        self.light_exposure
    }

    fn record_detection(&mut self, position: Vec3, confidence: Confidence, now: f64) {
        self.belief = BeliefState {
            last_known_position: Some(position),
            confidence,
            timestamp: now,
        };
        self.since_detection = 0.0;
    }

    fn decay_belief(&mut self, dt: f32) {
        if self.belief.confidence == Confidence::None {
            return;
        }
        self.since_detection += dt;
        while self.since_detection >= self.config.belief_decay_interval
            && self.belief.confidence != Confidence::None
        {
            self.since_detection -= self.config.belief_decay_interval;
            self.belief.confidence = self.belief.confidence.degraded();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::NoOcclusion;
    use approx::assert_relative_eq;

    struct Wall;

    impl OcclusionQuery for Wall {
        fn raycast_blocked(&self, _from: Vec3, _to: Vec3) -> bool {
            true
        }
    }

    fn system() -> PerceptionSystem {
        let profile = DifficultyProfile {
            detection_range: 10.0,
            field_of_view: 120.0,
            hearing_range: 3.0,
            ..Default::default()
        };
        PerceptionSystem::new(&profile, PerceptionConfig::default())
    }

    fn pose() -> AgentPose {
        AgentPose::new(Vec3::ZERO, Vec3::Z)
    }

    #[test]
    fn test_sees_target_ahead() {
        let mut perception = system();
        let target = Target::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);

        let result = perception.evaluate(0.1, 1.0, pose(), Some(&target), &NoOcclusion);
        assert!(result.visible);
        assert_eq!(perception.belief().confidence, Confidence::Seen);
        assert_eq!(perception.belief().last_known_position, Some(target.position));
        assert_eq!(perception.belief().timestamp, 1.0);
    }

    #[test]
    fn test_cannot_see_behind() {
        let mut perception = system();
        let target = Target::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);

        let result = perception.evaluate(0.1, 0.0, pose(), Some(&target), &NoOcclusion);
        assert!(!result.visible);
        assert!(!result.audible);
        assert!(!perception.belief().is_known());
    }

    #[test]
    fn test_range_and_occlusion() {
        let mut perception = system();
        let far = Target::new(Vec3::new(0.0, 0.0, 11.0), Vec3::NEG_Z);
        assert!(!perception.evaluate(0.1, 0.0, pose(), Some(&far), &NoOcclusion).visible);

        let near = Target::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        assert!(!perception.evaluate(0.1, 0.0, pose(), Some(&near), &Wall).visible);
    }

    #[test]
    fn test_hearing_ignores_facing() {
        let mut perception = system();
        let target = Target::new(Vec3::new(0.0, 0.0, -2.0), Vec3::Z);

        let result = perception.evaluate(0.1, 2.0, pose(), Some(&target), &Wall);
        assert!(result.audible);
        assert!(!result.visible);
        assert_eq!(perception.belief().confidence, Confidence::Heard);
    }

    #[test]
    fn test_hidden_or_missing_target_is_negative() {
        let mut perception = system();
        let hidden = Target::new(Vec3::new(0.0, 0.0, 1.0), Vec3::NEG_Z).with_hidden(true);

        let result = perception.evaluate(0.1, 0.0, pose(), Some(&hidden), &NoOcclusion);
        assert_eq!(result, PerceptionResult::NONE);

        let result = perception.evaluate(0.1, 0.0, pose(), None, &NoOcclusion);
        assert!(!result.any());
        assert!(!perception.belief().is_known());
    }

    #[test]
    fn test_light_exposure_needs_to_be_sustained() {
        let mut perception = system();
        // Behind the agent, out of hearing range, light shining along the
        // agent's line to it
        let target = Target::new(Vec3::new(0.0, 0.0, -6.0), Vec3::NEG_Z).with_light(true);

        let mut now = 0.0;
        for _ in 0..8 {
            now += 0.1;
            let result = perception.evaluate(0.1, now, pose(), Some(&target), &NoOcclusion);
            assert!(!result.lit_by_target);
        }
        assert!(!perception.belief().is_known());

        for _ in 0..5 {
            now += 0.1;
            perception.evaluate(0.1, now, pose(), Some(&target), &NoOcclusion);
        }
        assert!(perception.last_result().lit_by_target);
        assert_eq!(perception.belief().confidence, Confidence::LitBySource);
    }

    #[test]
    fn test_light_exposure_drains() {
        let mut perception = system();
        let lit = Target::new(Vec3::new(0.0, 0.0, -6.0), Vec3::NEG_Z).with_light(true);
        let dark = lit.with_light(false);

        perception.evaluate(0.5, 0.0, pose(), Some(&lit), &NoOcclusion);
        assert_relative_eq!(perception.light_exposure(), 0.5);
        perception.evaluate(0.3, 0.0, pose(), Some(&dark), &NoOcclusion);
        assert_relative_eq!(perception.light_exposure(), 0.2, epsilon = 1e-6);
        perception.evaluate(1.0, 0.0, pose(), Some(&dark), &NoOcclusion);
        assert_eq!(perception.light_exposure(), 0.0);
    }

    #[test]
    fn test_light_pointed_back_at_agent_does_not_count() {
        let perception = system();
        let target = Target::new(Vec3::new(0.0, 0.0, 6.0), Vec3::NEG_Z).with_light(true);
        assert!(!perception.is_in_light(pose(), &target));

        let along = Target::new(Vec3::new(0.0, 0.0, 6.0), Vec3::Z).with_light(true);
        assert!(perception.is_in_light(pose(), &along));
    }

    #[test]
    fn test_light_ignores_walls_but_not_range() {
        let mut perception = system();
        let behind_wall = Target::new(Vec3::new(0.0, 0.0, 6.0), Vec3::Z).with_light(true);
        for _ in 0..12 {
            perception.evaluate(0.1, 0.0, pose(), Some(&behind_wall), &Wall);
        }
        assert!(perception.last_result().lit_by_target);
        assert!(!perception.last_result().visible);

        let far = Target::new(Vec3::new(0.0, 0.0, 12.0), Vec3::Z).with_light(true);
        assert!(!perception.is_in_light(pose(), &far));
    }

    #[test]
    fn test_update_is_throttled() {
        let mut perception = system();
        let target = Target::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);

        assert!(perception.update(0.02, 0.02, pose(), Some(&target), &NoOcclusion).visible);

        // Between evaluations the previous result is held
        let gone = Target::new(Vec3::new(0.0, 0.0, -50.0), Vec3::Z);
        assert!(perception.update(0.02, 0.04, pose(), Some(&gone), &NoOcclusion).visible);

        perception.invalidate();
        assert!(!perception.update(0.02, 0.06, pose(), Some(&gone), &NoOcclusion).visible);
    }

    #[test]
    fn test_belief_decays_one_level_per_interval() {
        let mut perception = system();
        perception.adopt_belief(Vec3::X, Confidence::LitBySource, 0.0);

        let far = Target::new(Vec3::new(0.0, 0.0, -50.0), Vec3::Z);
        for _ in 0..52 {
            perception.update(0.1, 0.0, pose(), Some(&far), &NoOcclusion);
        }
        assert_eq!(perception.belief().confidence, Confidence::Seen);
        assert_eq!(perception.belief().last_known_position, Some(Vec3::X));

        for _ in 0..110 {
            perception.update(0.1, 0.0, pose(), Some(&far), &NoOcclusion);
        }
        assert_eq!(perception.belief().confidence, Confidence::None);
    }
}

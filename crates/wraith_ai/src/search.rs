//! Search planning
//!
//! Turns a belief position into an ordered list of points to sweep,
//! skipping places the agent searched recently.

use crate::config::SearchConfig;
use crate::patrol::PatrolRoute;
use crate::search_memory::SearchMemory;
use crate::services::NavigationService;
use rand::Rng;
use std::collections::VecDeque;
use wraith_math::{consts::TAU, Vec3};

/// Points still to be visited during a search
#[derive(Clone, Debug, Default)]
pub struct SearchPlan {
    points: VecDeque<Vec3>,
}

impl SearchPlan {
    /// Build a plan around `belief`.
    ///
    /// The belief itself is visited first. Candidates are then sampled
    /// around a base point (the belief, snapped to a nearby patrol waypoint
    /// when there is one) and projected onto the navigable surface. Every
    /// accepted point is recorded in `memory` straight away so later plans
    /// steer elsewhere.
    pub fn generate<N: NavigationService + ?Sized, R: Rng>(
        belief: Vec3,
        route: &PatrolRoute,
        memory: &mut SearchMemory,
        nav: &N,
        config: &SearchConfig,
        now: f64,
        rng: &mut R,
    ) -> Self {
        let mut points = VecDeque::with_capacity(config.candidate_count + 1);
        points.push_back(belief);

        let base = route
            .nearest_within(belief, config.waypoint_snap_radius)
            .unwrap_or(belief);

        let mut accepted = 0;
        for _ in 0..config.max_attempts {
            if accepted >= config.candidate_count {
                break;
            }

            let angle = rng.gen_range(0.0..TAU);
            let distance = config.search_radius * rng.gen::<f32>().sqrt();
            let probe = base + Vec3::new(angle.cos(), 0.0, angle.sin()) * distance;

            let Some(point) = nav.sample_nearest_navigable_point(probe, config.search_radius)
            else {
                continue;
            };
            // Snapping can drag a fresh probe back onto a searched spot
            if memory.is_recently_searched(point, config.exclusion_radius, now) {
                continue;
            }

            memory.record(point, now);
            points.push_back(point);
            accepted += 1;
        }

        log::debug!(
            "search plan around {base:?}: {} point(s), {accepted} sampled",
            points.len()
        );
        Self { points }
    }

    /// Next point to visit
    pub fn current(&self) -> Option<Vec3> {
        self.points.front().copied()
    }

    /// Drop the current point and return the one after it
    pub fn advance(&mut self) -> Option<Vec3> {
        self.points.pop_front();
        self.current()
    }

    pub fn remaining(&self) -> usize {
        self.points.len()
    }

    pub fn is_finished(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn points(&self) -> impl Iterator<Item = &Vec3> {
        self.points.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedNavigation;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use wraith_math::AABB;

    #[test]
    fn test_belief_first_then_candidates() {
        let nav = ScriptedNavigation::new(Vec3::ZERO);
        let mut memory = SearchMemory::default();
        let mut rng = SmallRng::seed_from_u64(11);
        let config = SearchConfig::default();
        let belief = Vec3::new(20.0, 0.0, 20.0);

        let plan = SearchPlan::generate(
            belief,
            &PatrolRoute::default(),
            &mut memory,
            &nav,
            &config,
            0.0,
            &mut rng,
        );

        assert_eq!(plan.current(), Some(belief));
        assert!(plan.remaining() > 1);
        assert!(plan.remaining() <= config.candidate_count + 1);
        for point in plan.points().skip(1) {
            assert!(point.distance(belief) <= config.search_radius + 1e-3);
            assert!(memory.is_recently_searched(*point, 0.01, 0.0));
        }
    }

    #[test]
    fn test_candidates_avoid_recent_searches() {
        let nav = ScriptedNavigation::new(Vec3::ZERO);
        let mut memory = SearchMemory::default();
        let mut rng = SmallRng::seed_from_u64(12);
        let config = SearchConfig::default();
        let belief = Vec3::ZERO;
        let searched = Vec3::new(4.0, 0.0, 0.0);
        memory.record(searched, 0.0);

        for _ in 0..20 {
            let plan = SearchPlan::generate(
                belief,
                &PatrolRoute::default(),
                &mut memory,
                &nav,
                &config,
                1.0,
                &mut rng,
            );
            for point in plan.points().skip(1) {
                assert!(point.distance(searched) > config.exclusion_radius);
            }
            memory.clear();
            memory.record(searched, 0.0);
        }
    }

    #[test]
    fn test_snapped_candidates_avoid_recent_searches() {
        // Narrow corridor along X: most probes snap back toward the middle
        let corridor = AABB::new(Vec3::new(-20.0, -1.0, -0.2), Vec3::new(20.0, 1.0, 0.2));
        let nav = ScriptedNavigation::new(Vec3::ZERO).with_bounds(corridor);
        let config = SearchConfig::default();

        for seed in 0..50 {
            let mut memory = SearchMemory::default();
            memory.record(Vec3::ZERO, 0.0);
            let mut rng = SmallRng::seed_from_u64(seed);

            let plan = SearchPlan::generate(
                Vec3::ZERO,
                &PatrolRoute::default(),
                &mut memory,
                &nav,
                &config,
                1.0,
                &mut rng,
            );
            for point in plan.points().skip(1) {
                assert!(
                    point.distance(Vec3::ZERO) > config.exclusion_radius,
                    "seed {seed}: {point:?} is inside the searched radius"
                );
            }
        }
    }

    #[test]
    fn test_base_snaps_to_waypoint() {
        let nav = ScriptedNavigation::new(Vec3::ZERO);
        let mut memory = SearchMemory::default();
        let mut rng = SmallRng::seed_from_u64(13);
        let config = SearchConfig {
            search_radius: 1.0,
            exclusion_radius: 0.0,
            ..Default::default()
        };
        let waypoint = Vec3::new(4.0, 0.0, 0.0);
        let route = PatrolRoute::new(vec![waypoint]);

        let plan = SearchPlan::generate(
            Vec3::ZERO,
            &route,
            &mut memory,
            &nav,
            &config,
            0.0,
            &mut rng,
        );
        for point in plan.points().skip(1) {
            assert!(point.distance(waypoint) <= 1.0 + 1e-3);
        }
    }

    #[test]
    fn test_advance() {
        let nav = ScriptedNavigation::new(Vec3::ZERO);
        let mut memory = SearchMemory::default();
        let mut rng = SmallRng::seed_from_u64(14);
        let mut plan = SearchPlan::generate(
            Vec3::X,
            &PatrolRoute::default(),
            &mut memory,
            &nav,
            &SearchConfig::default(),
            0.0,
            &mut rng,
        );
        let total = plan.remaining();
        plan.advance();
        assert_eq!(plan.remaining(), total - 1);
        while !plan.is_finished() {
            plan.advance();
        }
        assert_eq!(plan.current(), None);
    }
}

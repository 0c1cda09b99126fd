//! Patrol route and waypoint selection

use crate::config::PatrolStrategy;
use rand::seq::SliceRandom;
use rand::Rng;
use wraith_math::Vec3;

/// Inputs for choosing the next waypoint
#[derive(Clone, Copy, Debug)]
pub struct PatrolContext<'a> {
    pub agent_position: Vec3,
    /// Live target position, used by [`PatrolStrategy::Hunt`]
    pub target_position: Option<Vec3>,
    /// Waypoints currently claimed by other patrolling agents
    pub claimed: &'a [Vec3],
    pub claim_radius: f32,
    /// Chance of a uniformly random pick under [`PatrolStrategy::Wander`]
    pub random_chance: f32,
    pub strategy: PatrolStrategy,
}

/// Ordered set of patrol waypoints with the agent's progress through them
#[derive(Clone, Debug, Default)]
pub struct PatrolRoute {
    waypoints: Vec<Vec3>,
    current: Option<usize>,
}

impl PatrolRoute {
    pub fn new(waypoints: Vec<Vec3>) -> Self {
        Self {
            waypoints,
            current: None,
        }
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn waypoints(&self) -> &[Vec3] {
        &self.waypoints
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Waypoint the agent is heading to, if one has been chosen
    pub fn current_waypoint(&self) -> Option<Vec3> {
        self.current.map(|index| self.waypoints[index])
    }

    /// Forget progress so the next selection starts fresh
    pub fn reset(&mut self) {
        self.current = None;
    }

    /// Waypoint within `radius` of `point`, nearest first
    pub fn nearest_within(&self, point: Vec3, radius: f32) -> Option<Vec3> {
        self.waypoints
            .iter()
            .copied()
            .filter(|w| w.distance(point) <= radius)
            .min_by(|a, b| a.distance(point).total_cmp(&b.distance(point)))
    }

    /// Choose and commit to the next waypoint.
    ///
    /// The waypoint just visited is never picked twice in a row when there
    /// is an alternative, and waypoints claimed by peers are avoided while
    /// unclaimed ones remain.
    pub fn select_next<R: Rng>(&mut self, ctx: &PatrolContext<'_>, rng: &mut R) -> Option<Vec3> {
        let index = self.choose(ctx, rng)?;
        self.current = Some(index);
        Some(self.waypoints[index])
    }

    fn choose<R: Rng>(&self, ctx: &PatrolContext<'_>, rng: &mut R) -> Option<usize> {
        match self.waypoints.len() {
            0 => return None,
            1 => return Some(0),
            _ => {}
        }

        let fresh: Vec<usize> = (0..self.waypoints.len())
            .filter(|&i| Some(i) != self.current)
            .collect();

        let claim_sq = ctx.claim_radius * ctx.claim_radius;
        let unclaimed: Vec<usize> = fresh
            .iter()
            .copied()
            .filter(|&i| {
                !ctx
                    .claimed
                    .iter()
                    .any(|c| c.distance_squared(self.waypoints[i]) <= claim_sq)
            })
            .collect();
        let candidates = if unclaimed.is_empty() { fresh } else { unclaimed };

        let by_distance = |from: Vec3| {
            move |a: &usize, b: &usize| {
                self.waypoints[*a]
                    .distance_squared(from)
                    .total_cmp(&self.waypoints[*b].distance_squared(from))
            }
        };

        match (ctx.strategy, ctx.target_position) {
            (PatrolStrategy::Hunt, Some(target)) => {
                candidates.iter().copied().min_by(by_distance(target))
            }
            _ => {
                if rng.gen::<f32>() < ctx.random_chance {
                    candidates.choose(rng).copied()
                } else {
                    candidates
                        .iter()
                        .copied()
                        .max_by(by_distance(ctx.agent_position))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn square() -> PatrolRoute {
        PatrolRoute::new(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 10.0),
            Vec3::new(0.0, 0.0, 10.0),
        ])
    }

    fn context(claimed: &[Vec3]) -> PatrolContext<'_> {
        PatrolContext {
            agent_position: Vec3::ZERO,
            target_position: None,
            claimed,
            claim_radius: 1.0,
            random_chance: 0.7,
            strategy: PatrolStrategy::Wander,
        }
    }

    #[test]
    fn test_never_repeats_previous() {
        let mut route = square();
        let mut rng = SmallRng::seed_from_u64(1);
        let mut previous = route.select_next(&context(&[]), &mut rng);
        for _ in 0..200 {
            let next = route.select_next(&context(&[]), &mut rng);
            assert_ne!(next, previous);
            previous = next;
        }
    }

    #[test]
    fn test_single_and_empty_routes() {
        let mut rng = SmallRng::seed_from_u64(2);
        let mut single = PatrolRoute::new(vec![Vec3::X]);
        assert_eq!(single.select_next(&context(&[]), &mut rng), Some(Vec3::X));
        assert_eq!(single.select_next(&context(&[]), &mut rng), Some(Vec3::X));

        let mut empty = PatrolRoute::default();
        assert_eq!(empty.select_next(&context(&[]), &mut rng), None);
    }

    #[test]
    fn test_avoids_claimed_waypoints() {
        let mut route = square();
        let mut rng = SmallRng::seed_from_u64(3);
        let claimed = [
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 10.0),
            Vec3::new(0.0, 0.0, 10.0),
        ];
        for _ in 0..50 {
            route.reset();
            assert_eq!(route.select_next(&context(&claimed), &mut rng), Some(Vec3::ZERO));
        }
    }

    #[test]
    fn test_all_claimed_falls_back() {
        let mut route = square();
        let mut rng = SmallRng::seed_from_u64(4);
        let claimed = route.waypoints().to_vec();
        assert!(route.select_next(&context(&claimed), &mut rng).is_some());
    }

    #[test]
    fn test_farthest_when_not_random() {
        let mut route = square();
        let mut rng = SmallRng::seed_from_u64(5);
        let ctx = PatrolContext {
            random_chance: 0.0,
            ..context(&[])
        };
        assert_eq!(
            route.select_next(&ctx, &mut rng),
            Some(Vec3::new(10.0, 0.0, 10.0))
        );
    }

    #[test]
    fn test_hunt_picks_nearest_to_target() {
        let mut route = square();
        let mut rng = SmallRng::seed_from_u64(6);
        let ctx = PatrolContext {
            target_position: Some(Vec3::new(9.0, 0.0, 1.0)),
            strategy: PatrolStrategy::Hunt,
            ..context(&[])
        };
        assert_eq!(
            route.select_next(&ctx, &mut rng),
            Some(Vec3::new(10.0, 0.0, 0.0))
        );
    }

    #[test]
    fn test_nearest_within() {
        let route = square();
        assert_eq!(
            route.nearest_within(Vec3::new(9.0, 0.0, 9.0), 5.0),
            Some(Vec3::new(10.0, 0.0, 10.0))
        );
        assert_eq!(route.nearest_within(Vec3::new(5.0, 0.0, 5.0), 5.0), None);
    }
}

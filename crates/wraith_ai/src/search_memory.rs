//! Recently searched locations
//!
//! Keeps searches from revisiting the same spots. Entries expire after the
//! memory duration and are pruned on a coarse interval.

use crate::config::SearchConfig;
use wraith_math::Vec3;

/// A location the agent has searched or patrolled through
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchedLocation {
    pub position: Vec3,
    /// Session time of the most recent visit
    pub timestamp: f64,
}

/// Time-decaying record of searched locations
#[derive(Clone, Debug)]
pub struct SearchMemory {
    entries: Vec<SearchedLocation>,
    memory_duration: f64,
    merge_radius: f32,
    prune_interval: f64,
    last_prune: f64,
}

impl SearchMemory {
    pub fn new(memory_duration: f32, merge_radius: f32, prune_interval: f32) -> Self {
        Self {
            entries: Vec::new(),
            memory_duration: f64::from(memory_duration),
            merge_radius,
            prune_interval: f64::from(prune_interval),
            last_prune: 0.0,
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(
            config.memory_duration,
            config.merge_radius,
            config.prune_interval,
        )
    }

    /// Record a visit; a visit close to an existing entry refreshes it
    pub fn record(&mut self, point: Vec3, now: f64) {
        let merge_sq = self.merge_radius * self.merge_radius;
        let nearest = self
            .entries
            .iter_mut()
            .filter(|entry| entry.position.distance_squared(point) <= merge_sq)
            .min_by(|a, b| {
                a.position
                    .distance_squared(point)
                    .total_cmp(&b.position.distance_squared(point))
            });

        match nearest {
            Some(entry) => entry.timestamp = now,
            None => self.entries.push(SearchedLocation {
                position: point,
                timestamp: now,
            }),
        }
    }

    /// Whether any unexpired entry lies within `radius` of `point`
    pub fn is_recently_searched(&self, point: Vec3, radius: f32, now: f64) -> bool {
        let radius_sq = radius * radius;
        self.entries.iter().any(|entry| {
            !self.is_expired(entry, now) && entry.position.distance_squared(point) <= radius_sq
        })
    }

    pub fn is_expired(&self, entry: &SearchedLocation, now: f64) -> bool {
        now - entry.timestamp > self.memory_duration
    }

    /// Remove expired entries; returns how many were dropped
    pub fn prune(&mut self, now: f64) -> usize {
        let before = self.entries.len();
        let duration = self.memory_duration;
        self.entries.retain(|entry| now - entry.timestamp <= duration);
        self.last_prune = now;
        before - self.entries.len()
    }

    /// Prune if the prune interval has passed since the last prune
    pub fn maybe_prune(&mut self, now: f64) -> usize {
        if now - self.last_prune >= self.prune_interval {
            self.prune(now)
        } else {
            0
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SearchedLocation> {
        self.entries.iter()
    }
}

impl Default for SearchMemory {
    fn default() -> Self {
        Self::from_config(&SearchConfig::default())
    }
}

//! Tick-driven timers
//!
//! Every delayed or periodic behavior in the engine is an explicit value
//! advanced by the owner's tick: a one-shot [`Timer`], a repeating
//! [`Interval`], or a [`Schedule`] of deferred actions.

/// One-shot countdown
#[derive(Clone, Debug, PartialEq)]
pub struct Timer {
    duration: f32,
    elapsed: f32,
}

impl Timer {
    pub fn new(duration: f32) -> Self {
        Self {
            duration: duration.max(0.0),
            elapsed: 0.0,
        }
    }

    /// Advance; returns true once the timer has run out
    pub fn tick(&mut self, dt: f32) -> bool {
        self.elapsed = (self.elapsed + dt).min(self.duration);
        self.is_finished()
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Fraction completed in [0, 1]
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            self.elapsed / self.duration
        }
    }

    pub fn remaining(&self) -> f32 {
        self.duration - self.elapsed
    }
}

/// Repeating throttle.
///
/// Fires on the first tick after creation or reset, then whenever the
/// accumulated time reaches the period. Each firing reports the time that
/// passed since the previous one.
#[derive(Clone, Debug, PartialEq)]
pub struct Interval {
    period: f32,
    accumulated: f32,
    primed: bool,
}

impl Interval {
    /// Interval that fires on its first tick
    pub fn new(period: f32) -> Self {
        Self {
            period,
            accumulated: 0.0,
            primed: true,
        }
    }

    /// Interval that waits a full period before its first firing
    pub fn delayed(period: f32) -> Self {
        Self {
            primed: false,
            ..Self::new(period)
        }
    }

    pub fn period(&self) -> f32 {
        self.period
    }

    /// Advance; returns the time since the last firing when it fires
    pub fn tick(&mut self, dt: f32) -> Option<f32> {
        self.accumulated += dt;
        if self.primed || self.accumulated >= self.period {
            self.primed = false;
            let elapsed = self.accumulated;
            self.accumulated = 0.0;
            Some(elapsed)
        } else {
            None
        }
    }

    /// Make the next tick fire
    pub fn reset(&mut self) {
        self.accumulated = 0.0;
        self.primed = true;
    }

    /// Restart the wait for a full period
    pub fn restart(&mut self) {
        self.accumulated = 0.0;
        self.primed = false;
    }
}

struct Scheduled<A> {
    remaining: f32,
    action: A,
}

/// Deferred actions released once their delay has elapsed
pub struct Schedule<A> {
    pending: Vec<Scheduled<A>>,
}

impl<A> Schedule<A> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Queue `action` to be released after `delay` seconds
    pub fn after(&mut self, delay: f32, action: A) {
        self.pending.push(Scheduled {
            remaining: delay.max(0.0),
            action,
        });
    }

    /// Advance all delays and return the actions that came due, soonest first
    pub fn advance(&mut self, dt: f32) -> Vec<A> {
        for entry in &mut self.pending {
            entry.remaining -= dt;
        }

        let (mut due, waiting): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|entry| entry.remaining <= 0.0);
        self.pending = waiting;

        due.sort_by(|a, b| a.remaining.total_cmp(&b.remaining));
        due.into_iter().map(|entry| entry.action).collect()
    }

    /// Drop every queued action matching `predicate`
    pub fn cancel_where(&mut self, predicate: impl Fn(&A) -> bool) {
        self.pending.retain(|entry| !predicate(&entry.action));
    }

    /// Whether an action matching `predicate` is queued
    pub fn contains(&self, predicate: impl Fn(&A) -> bool) -> bool {
        self.pending.iter().any(|entry| predicate(&entry.action))
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<A> Default for Schedule<A> {
    fn default() -> Self {
        Self::new()
    }
}

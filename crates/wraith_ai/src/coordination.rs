//! Peer coordination
//!
//! The bus keeps a snapshot of every registered agent. On a fixed interval
//! it pairs chasing agents with nearby peers that are not chasing and emits
//! alert directives. The session applies them, so no agent ever holds a
//! reference to another.

use crate::agent::AgentId;
use crate::behavior::BehaviorState;
use crate::config::CoordinationConfig;
use crate::error::{AiError, Result};
use crate::perception::Confidence;
use crate::schedule::Interval;
use std::collections::BTreeMap;
use wraith_math::Vec3;

/// What the bus knows about one agent
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PeerSnapshot {
    pub position: Vec3,
    pub state: BehaviorState,
    pub belief: Option<Vec3>,
    pub confidence: Confidence,
    /// Waypoint the agent is patrolling toward
    pub patrol_claim: Option<Vec3>,
    /// Captured and defeated agents take no part in coordination
    pub active: bool,
}

/// Belief shared by a chasing peer
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Alert {
    pub from: AgentId,
    pub position: Vec3,
    pub confidence: Confidence,
}

/// An alert addressed to one agent
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AlertDirective {
    pub recipient: AgentId,
    pub alert: Alert,
}

/// Registry of agent snapshots and the alert pass over them
#[derive(Clone, Debug)]
pub struct CoordinationBus {
    config: CoordinationConfig,
    peers: BTreeMap<AgentId, PeerSnapshot>,
    pass: Interval,
    next_id: u32,
}

impl CoordinationBus {
    pub fn new(config: CoordinationConfig) -> Self {
        Self {
            pass: Interval::delayed(config.interval),
            config,
            peers: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Hand out a fresh agent id
    pub fn allocate_id(&mut self) -> AgentId {
        let id = AgentId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn register(&mut self, id: AgentId, snapshot: PeerSnapshot) -> Result<()> {
        if self.peers.contains_key(&id) {
            return Err(AiError::AlreadyRegistered(id));
        }
        self.peers.insert(id, snapshot);
        Ok(())
    }

    /// Returns whether the agent was registered
    pub fn unregister(&mut self, id: AgentId) -> bool {
        self.peers.remove(&id).is_some()
    }

    pub fn is_registered(&self, id: AgentId) -> bool {
        self.peers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn snapshot(&self, id: AgentId) -> Option<&PeerSnapshot> {
        self.peers.get(&id)
    }

    /// Refresh an agent's snapshot. Unregistered ids are ignored.
    pub fn publish(&mut self, id: AgentId, snapshot: PeerSnapshot) -> bool {
        match self.peers.get_mut(&id) {
            Some(entry) => {
                *entry = snapshot;
                true
            }
            None => {
                log::trace!("ignoring snapshot from unregistered {id}");
                false
            }
        }
    }

    /// Waypoints other active, patrolling agents are heading to
    pub fn claimed_waypoints(&self, except: AgentId) -> Vec<Vec3> {
        self.peers
            .iter()
            .filter(|(id, peer)| {
                **id != except && peer.active && peer.state == BehaviorState::Patrolling
            })
            .filter_map(|(_, peer)| peer.patrol_claim)
            .collect()
    }

    /// Advance the pass timer; returns directives when a pass runs
    pub fn tick(&mut self, dt: f32) -> Vec<AlertDirective> {
        match self.pass.tick(dt) {
            Some(_) => self.coordinate(),
            None => Vec::new(),
        }
    }

    /// Alert every active, non-chasing agent within range of a chasing
    /// agent with that agent's belief. When several chasers are in range
    /// the nearest one is used.
    pub fn coordinate(&self) -> Vec<AlertDirective> {
        let radius_sq = self.config.radius * self.config.radius;
        let chasers: Vec<(AgentId, &PeerSnapshot, Vec3)> = self
            .peers
            .iter()
            .filter(|(_, peer)| peer.active && peer.state == BehaviorState::Chasing)
            .filter_map(|(id, peer)| peer.belief.map(|belief| (*id, peer, belief)))
            .collect();

        if chasers.is_empty() {
            return Vec::new();
        }

        let mut directives = Vec::new();
        for (id, peer) in &self.peers {
            if !peer.active || peer.state == BehaviorState::Chasing {
                continue;
            }

            let nearest = chasers
                .iter()
                .filter(|(_, chaser, _)| {
                    chaser.position.distance_squared(peer.position) <= radius_sq
                })
                .min_by(|(_, a, _), (_, b, _)| {
                    a.position
                        .distance_squared(peer.position)
                        .total_cmp(&b.position.distance_squared(peer.position))
                });

            if let Some((from, chaser, belief)) = nearest {
                log::debug!("{from} alerting {id} of target at {belief:?}");
                directives.push(AlertDirective {
                    recipient: *id,
                    alert: Alert {
                        from: *from,
                        position: *belief,
                        confidence: chaser.confidence,
                    },
                });
            }
        }
        directives
    }
}

impl Default for CoordinationBus {
    fn default() -> Self {
        Self::new(CoordinationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(position: Vec3, state: BehaviorState) -> PeerSnapshot {
        PeerSnapshot {
            position,
            state,
            belief: None,
            confidence: Confidence::None,
            patrol_claim: None,
            active: true,
        }
    }

    fn chaser(position: Vec3, belief: Vec3) -> PeerSnapshot {
        PeerSnapshot {
            belief: Some(belief),
            confidence: Confidence::Seen,
            ..peer(position, BehaviorState::Chasing)
        }
    }

    #[test]
    fn test_register_and_unregister() {
        let mut bus = CoordinationBus::default();
        let id = bus.allocate_id();
        assert_ne!(id, bus.allocate_id());

        bus.register(id, peer(Vec3::ZERO, BehaviorState::Patrolling))
            .unwrap();
        assert!(matches!(
            bus.register(id, peer(Vec3::ZERO, BehaviorState::Patrolling)),
            Err(AiError::AlreadyRegistered(_))
        ));
        assert!(bus.unregister(id));
        assert!(!bus.unregister(id));
        assert!(bus.is_empty());
    }

    #[test]
    fn test_alerts_nearby_peers_only() {
        let mut bus = CoordinationBus::default();
        let belief = Vec3::new(3.0, 0.0, 3.0);
        bus.register(AgentId(1), chaser(Vec3::ZERO, belief)).unwrap();
        bus.register(AgentId(2), peer(Vec3::new(10.0, 0.0, 0.0), BehaviorState::Patrolling))
            .unwrap();
        bus.register(AgentId(3), peer(Vec3::new(50.0, 0.0, 0.0), BehaviorState::Searching))
            .unwrap();

        let directives = bus.coordinate();
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].recipient, AgentId(2));
        assert_eq!(directives[0].alert.from, AgentId(1));
        assert_eq!(directives[0].alert.position, belief);
        assert_eq!(directives[0].alert.confidence, Confidence::Seen);
    }

    #[test]
    fn test_nearest_chaser_wins() {
        let mut bus = CoordinationBus::default();
        bus.register(AgentId(1), chaser(Vec3::new(15.0, 0.0, 0.0), Vec3::X))
            .unwrap();
        bus.register(AgentId(2), chaser(Vec3::new(2.0, 0.0, 0.0), Vec3::Z))
            .unwrap();
        bus.register(AgentId(3), peer(Vec3::ZERO, BehaviorState::Investigating))
            .unwrap();

        let directives = bus.coordinate();
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].alert.from, AgentId(2));
    }

    #[test]
    fn test_inactive_and_unregistered_are_ignored() {
        let mut bus = CoordinationBus::default();
        bus.register(AgentId(1), chaser(Vec3::ZERO, Vec3::X)).unwrap();
        let inactive = PeerSnapshot {
            active: false,
            ..peer(Vec3::X, BehaviorState::Patrolling)
        };
        bus.register(AgentId(2), inactive).unwrap();

        assert!(!bus.publish(AgentId(9), peer(Vec3::X, BehaviorState::Patrolling)));
        assert!(bus.coordinate().is_empty());
    }

    #[test]
    fn test_pass_runs_on_interval() {
        let mut bus = CoordinationBus::default();
        bus.register(AgentId(1), chaser(Vec3::ZERO, Vec3::X)).unwrap();
        bus.register(AgentId(2), peer(Vec3::X, BehaviorState::Patrolling))
            .unwrap();

        assert!(bus.tick(4.0).is_empty());
        assert_eq!(bus.tick(1.0).len(), 1);
        assert!(bus.tick(1.0).is_empty());
    }

    #[test]
    fn test_claimed_waypoints() {
        let mut bus = CoordinationBus::default();
        let claim = Vec3::new(5.0, 0.0, 5.0);
        let patrolling = PeerSnapshot {
            patrol_claim: Some(claim),
            ..peer(Vec3::ZERO, BehaviorState::Patrolling)
        };
        bus.register(AgentId(1), patrolling).unwrap();
        bus.register(AgentId(2), peer(Vec3::ZERO, BehaviorState::Patrolling))
            .unwrap();

        assert_eq!(bus.claimed_waypoints(AgentId(2)), vec![claim]);
        assert!(bus.claimed_waypoints(AgentId(1)).is_empty());
    }
}

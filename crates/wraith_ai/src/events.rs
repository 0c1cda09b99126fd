//! Outward events
//!
//! Agents buffer these in an outbox; the session drains them every tick
//! into its event bus for presentation, audio and UI layers.

use crate::agent::AgentId;
use crate::behavior::BehaviorState;
use crate::navigation::RecoveryAction;
use serde::{Deserialize, Serialize};
use wraith_math::Vec3;

/// Something an agent did or noticed
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum AgentEvent {
    /// Agent joined the session
    Registered { agent: AgentId },
    /// Agent entered a new behavior state
    StateEntered {
        agent: AgentId,
        from: BehaviorState,
        to: BehaviorState,
    },
    /// Target came into view
    TargetAcquired { agent: AgentId, position: Vec3 },
    /// Target went out of view
    TargetLost {
        agent: AgentId,
        last_known: Option<Vec3>,
    },
    /// Target entered or left the warning range
    ProximityWarning { agent: AgentId, active: bool },
    /// Navigation recovered from a stuck or broken path
    Recovered {
        agent: AgentId,
        action: RecoveryAction,
    },
    /// A peer shared its belief
    AlertReceived {
        agent: AgentId,
        from: AgentId,
        position: Vec3,
    },
    /// Target caught
    Captured { agent: AgentId, position: Vec3 },
    /// Agent was defeated and will be removed
    Defeated { agent: AgentId },
    /// Agent left the session
    Despawned { agent: AgentId },
}

impl AgentEvent {
    /// Agent the event is about
    pub fn agent(&self) -> AgentId {
        match *self {
            AgentEvent::Registered { agent }
            | AgentEvent::StateEntered { agent, .. }
            | AgentEvent::TargetAcquired { agent, .. }
            | AgentEvent::TargetLost { agent, .. }
            | AgentEvent::ProximityWarning { agent, .. }
            | AgentEvent::Recovered { agent, .. }
            | AgentEvent::AlertReceived { agent, .. }
            | AgentEvent::Captured { agent, .. }
            | AgentEvent::Defeated { agent }
            | AgentEvent::Despawned { agent } => agent,
        }
    }

    /// Terminal events end the agent's participation in the game
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AgentEvent::Captured { .. } | AgentEvent::Defeated { .. } | AgentEvent::Despawned { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_accessor() {
        let id = AgentId(4);
        let events = [
            AgentEvent::Registered { agent: id },
            AgentEvent::StateEntered {
                agent: id,
                from: BehaviorState::Patrolling,
                to: BehaviorState::Chasing,
            },
            AgentEvent::Captured {
                agent: id,
                position: Vec3::ZERO,
            },
        ];
        assert!(events.iter().all(|e| e.agent() == id));
        assert!(!events[1].is_terminal());
        assert!(events[2].is_terminal());
    }
}

//! Session: the set of agents sharing one target
//!
//! Owns the agents, the coordination bus and the event bus. One
//! [`Session::tick`] advances every agent, runs coordination, applies
//! deferred removals and dispatches the resulting events.

use crate::agent::{Agent, AgentId, AntagonistBehavior, Lifecycle, TickContext};
use crate::config::{AgentConfig, CoordinationConfig};
use crate::coordination::CoordinationBus;
use crate::error::{AiError, Result};
use crate::events::AgentEvent;
use crate::schedule::Schedule;
use crate::services::{NavigationService, OcclusionQuery, Target};
use std::collections::BTreeMap;
use wraith_event::EventBus;
use wraith_math::Vec3;

/// Agents, coordination and event delivery for one game session
pub struct Session<N: NavigationService> {
    agents: BTreeMap<AgentId, Agent<N>>,
    bus: CoordinationBus,
    events: EventBus,
    removals: Schedule<AgentId>,
    config: CoordinationConfig,
    seed: u64,
    clock: f64,
}

impl<N: NavigationService> Session<N> {
    pub fn new(config: CoordinationConfig, seed: u64) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            agents: BTreeMap::new(),
            bus: CoordinationBus::new(config.clone()),
            events: EventBus::new(),
            removals: Schedule::new(),
            config,
            seed,
            clock: 0.0,
        })
    }

    /// Create an agent driving `nav` and register it for coordination
    pub fn spawn(&mut self, config: AgentConfig, nav: N) -> Result<AgentId> {
        let id = self.bus.allocate_id();
        let agent = Agent::new(id, config, nav, self.seed)?;
        self.bus.register(id, agent.snapshot())?;
        log::info!("{id} registered at {:?}", agent.position());
        self.agents.insert(id, agent);
        Ok(id)
    }

    /// Remove an agent immediately, dropping anything scheduled for it
    pub fn despawn(&mut self, id: AgentId) -> Result<()> {
        if !self.agents.contains_key(&id) {
            return Err(AiError::AgentNotFound(id));
        }
        self.removals.cancel_where(|pending| *pending == id);
        self.remove(id);
        self.dispatch_events();
        Ok(())
    }

    /// Defeat an agent; it is removed after the configured delay
    pub fn defeat(&mut self, id: AgentId) -> Result<()> {
        let agent = self.agents.get_mut(&id).ok_or(AiError::AgentNotFound(id))?;
        if agent.lifecycle() == Lifecycle::Defeated {
            return Ok(());
        }
        agent.defeat();
        self.bus.publish(id, agent.snapshot());
        self.removals.after(self.config.defeat_removal_delay, id);
        self.dispatch_events();
        Ok(())
    }

    /// Distract one agent
    pub fn distract(&mut self, id: AgentId, point: Option<Vec3>) -> Result<()> {
        let agent = self.agents.get_mut(&id).ok_or(AiError::AgentNotFound(id))?;
        agent.distract(point);
        self.bus.publish(id, agent.snapshot());
        Ok(())
    }

    /// Distract every active agent within `radius` of `point`, pointing
    /// them at it. Returns how many were affected.
    pub fn distract_near(&mut self, point: Vec3, radius: f32) -> usize {
        let mut affected = 0;
        for (id, agent) in self.agents.iter_mut() {
            if agent.is_active() && agent.position().distance(point) <= radius {
                agent.distract(Some(point));
                self.bus.publish(*id, agent.snapshot());
                affected += 1;
            }
        }
        affected
    }

    pub fn reset_patrol(&mut self, id: AgentId) -> Result<()> {
        let agent = self.agents.get_mut(&id).ok_or(AiError::AgentNotFound(id))?;
        agent.reset_patrol();
        Ok(())
    }

    /// Advance the whole session by `dt` seconds
    pub fn tick(&mut self, dt: f32, target: Option<&Target>, occlusion: &dyn OcclusionQuery) {
        self.clock += f64::from(dt);
        let now = self.clock;

        for (id, agent) in self.agents.iter_mut() {
            let claimed = self.bus.claimed_waypoints(*id);
            let ctx = TickContext::new(dt, now, target, occlusion).with_claimed(&claimed);
            agent.tick(&ctx);
            self.bus.publish(*id, agent.snapshot());
        }

        for directive in self.bus.tick(dt) {
            if let Some(agent) = self.agents.get_mut(&directive.recipient) {
                agent.receive_alert(&directive.alert);
                self.bus.publish(directive.recipient, agent.snapshot());
            }
        }

        for id in self.removals.advance(dt) {
            self.remove(id);
        }

        self.dispatch_events();
    }

    /// Publish buffered agent events and deliver them to subscribers
    pub fn dispatch_events(&mut self) -> usize {
        for agent in self.agents.values_mut() {
            for event in agent.drain_events() {
                self.events.publish(event);
            }
        }
        self.events.process()
    }

    /// Event bus for subscribing to [`AgentEvent`]s
    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent<N>> {
        self.agents.get(&id)
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent<N>> {
        self.agents.get_mut(&id)
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent<N>> {
        self.agents.values()
    }

    pub fn agents_mut(&mut self) -> impl Iterator<Item = &mut Agent<N>> {
        self.agents.values_mut()
    }

    pub fn ids(&self) -> Vec<AgentId> {
        self.agents.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn coordination(&self) -> &CoordinationBus {
        &self.bus
    }

    /// Session time in seconds
    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Whether any agent has caught the target
    pub fn is_target_captured(&self) -> bool {
        self.agents
            .values()
            .any(|agent| agent.lifecycle() == Lifecycle::Captured)
    }

    fn remove(&mut self, id: AgentId) {
        let Some(mut agent) = self.agents.remove(&id) else {
            return;
        };
        for event in agent.drain_events() {
            self.events.publish(event);
        }
        self.events.publish(AgentEvent::Despawned { agent: id });
        self.bus.unregister(id);
        log::info!("{id} unregistered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::difficulty::Difficulty;
    use crate::services::NoOcclusion;
    use crate::testing::ScriptedNavigation;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn session() -> Session<ScriptedNavigation> {
        Session::new(CoordinationConfig::default(), 1).unwrap()
    }

    fn config() -> AgentConfig {
        AgentConfig::for_difficulty(Difficulty::Medium)
    }

    #[test]
    fn test_spawn_assigns_unique_ids() {
        let mut session = session();
        let a = session
            .spawn(config(), ScriptedNavigation::new(Vec3::ZERO))
            .unwrap();
        let b = session
            .spawn(config(), ScriptedNavigation::new(Vec3::X))
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(session.len(), 2);
        assert!(session.coordination().is_registered(a));
    }

    #[test]
    fn test_unknown_agent_errors() {
        let mut session = session();
        assert!(matches!(
            session.despawn(AgentId(99)),
            Err(AiError::AgentNotFound(_))
        ));
        assert!(session.defeat(AgentId(99)).is_err());
        assert!(session.distract(AgentId(99), None).is_err());
    }

    #[test]
    fn test_events_reach_subscribers() {
        let mut session = session();
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        session
            .events_mut()
            .subscribe(move |event: &AgentEvent| sink.lock().push(*event));

        let id = session
            .spawn(config(), ScriptedNavigation::new(Vec3::ZERO))
            .unwrap();
        session.tick(0.1, None, &NoOcclusion);

        assert!(received
            .lock()
            .contains(&AgentEvent::Registered { agent: id }));
    }

    #[test]
    fn test_defeat_removes_after_delay() {
        let mut session = session();
        let id = session
            .spawn(config(), ScriptedNavigation::new(Vec3::ZERO))
            .unwrap();
        session.defeat(id).unwrap();
        assert!(session.agent(id).is_some());

        for _ in 0..25 {
            session.tick(0.1, None, &NoOcclusion);
        }
        assert!(session.agent(id).is_some());

        for _ in 0..10 {
            session.tick(0.1, None, &NoOcclusion);
        }
        assert!(session.agent(id).is_none());
        assert!(!session.coordination().is_registered(id));
    }

    #[test]
    fn test_despawn_is_immediate() {
        let mut session = session();
        let id = session
            .spawn(config(), ScriptedNavigation::new(Vec3::ZERO))
            .unwrap();
        session.defeat(id).unwrap();
        session.despawn(id).unwrap();
        assert!(session.is_empty());

        // The pending removal was dropped with the agent
        for _ in 0..40 {
            session.tick(0.1, None, &NoOcclusion);
        }
        assert!(session.is_empty());
    }

    #[test]
    fn test_distract_near() {
        let mut session = session();
        let near = session
            .spawn(config(), ScriptedNavigation::new(Vec3::ZERO))
            .unwrap();
        let far = session
            .spawn(config(), ScriptedNavigation::new(Vec3::new(50.0, 0.0, 0.0)))
            .unwrap();

        assert_eq!(session.distract_near(Vec3::new(2.0, 0.0, 0.0), 5.0), 1);
        assert_eq!(
            session.agent(near).unwrap().state(),
            crate::behavior::BehaviorState::Distracted
        );
        assert_eq!(
            session.agent(far).unwrap().state(),
            crate::behavior::BehaviorState::Patrolling
        );
    }
}

//! End-to-end behavior of a session driven by scripted services

use parking_lot::Mutex;
use std::sync::Arc;
use wraith_ai::prelude::*;
use wraith_ai::testing::{BoxOcclusion, ScriptedNavigation};
use wraith_math::{Vec3, AABB};

const DT: f32 = 0.1;

fn narrow_config() -> AgentConfig {
    let mut config = AgentConfig::for_difficulty(Difficulty::Medium);
    config.profile.detection_range = 10.0;
    config.profile.field_of_view = 120.0;
    config.profile.hearing_range = 2.0;
    config
}

fn session() -> Session<ScriptedNavigation> {
    Session::new(CoordinationConfig::default(), 11).unwrap()
}

fn record_events(session: &mut Session<ScriptedNavigation>) -> Arc<Mutex<Vec<AgentEvent>>> {
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    session
        .events_mut()
        .subscribe(move |event: &AgentEvent| sink.lock().push(*event));
    received
}

#[test]
fn target_in_view_starts_a_chase() {
    let mut session = session();
    let id = session
        .spawn(narrow_config(), ScriptedNavigation::new(Vec3::ZERO))
        .unwrap();

    let target = Target::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
    session.tick(DT, Some(&target), &NoOcclusion);

    assert_eq!(session.agent(id).unwrap().state(), BehaviorState::Chasing);
}

#[test]
fn target_behind_is_not_noticed() {
    let mut session = session();
    let id = session
        .spawn(narrow_config(), ScriptedNavigation::new(Vec3::ZERO))
        .unwrap();

    let target = Target::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
    for _ in 0..10 {
        session.tick(DT, Some(&target), &NoOcclusion);
    }

    let agent = session.agent(id).unwrap();
    assert_eq!(agent.state(), BehaviorState::Patrolling);
    assert!(!agent.belief().is_known());
}

#[test]
fn walls_block_sight() {
    let mut session = session();
    let id = session
        .spawn(narrow_config(), ScriptedNavigation::new(Vec3::ZERO))
        .unwrap();

    let wall = BoxOcclusion::new(vec![AABB::new(
        Vec3::new(-2.0, -1.0, 2.0),
        Vec3::new(2.0, 3.0, 3.0),
    )]);
    let target = Target::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
    session.tick(DT, Some(&target), &wall);

    assert_eq!(session.agent(id).unwrap().state(), BehaviorState::Patrolling);
}

#[test]
fn chasing_agent_alerts_nearby_peer() {
    let mut session = session();
    let spotter = session
        .spawn(narrow_config(), ScriptedNavigation::new(Vec3::ZERO))
        .unwrap();
    let peer = session
        .spawn(
            narrow_config(),
            ScriptedNavigation::new(Vec3::new(15.0, 0.0, 0.0)),
        )
        .unwrap();
    let events = record_events(&mut session);

    let target = Target::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
    session.tick(DT, Some(&target), &NoOcclusion);
    assert_eq!(session.agent(spotter).unwrap().state(), BehaviorState::Chasing);
    assert_eq!(session.agent(peer).unwrap().state(), BehaviorState::Patrolling);

    // One full coordination interval
    for _ in 0..55 {
        session.tick(DT, Some(&target), &NoOcclusion);
    }

    let spotter_belief = session.agent(spotter).unwrap().belief().last_known_position;
    let peer_agent = session.agent(peer).unwrap();
    assert_eq!(peer_agent.belief().last_known_position, spotter_belief);
    assert_ne!(peer_agent.state(), BehaviorState::Patrolling);
    assert!(events.lock().iter().any(|event| matches!(
        event,
        AgentEvent::AlertReceived { agent, from, .. } if *agent == peer && *from == spotter
    )));
}

#[test]
fn distant_peer_is_not_alerted() {
    let mut session = session();
    session
        .spawn(narrow_config(), ScriptedNavigation::new(Vec3::ZERO))
        .unwrap();
    let far = session
        .spawn(
            narrow_config(),
            ScriptedNavigation::new(Vec3::new(60.0, 0.0, 0.0)),
        )
        .unwrap();

    let target = Target::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
    for _ in 0..60 {
        session.tick(DT, Some(&target), &NoOcclusion);
    }

    assert_eq!(session.agent(far).unwrap().state(), BehaviorState::Patrolling);
}

#[test]
fn stuck_agent_recovers_and_keeps_running() {
    let mut session = session();
    let config = narrow_config().with_waypoints(vec![
        Vec3::new(20.0, 0.0, 0.0),
        Vec3::new(-20.0, 0.0, 0.0),
    ]);
    let id = session
        .spawn(config, ScriptedNavigation::new(Vec3::ZERO).frozen())
        .unwrap();
    let events = record_events(&mut session);

    for _ in 0..150 {
        session.tick(DT, None, &NoOcclusion);
    }

    let recoveries = events
        .lock()
        .iter()
        .filter(|event| matches!(event, AgentEvent::Recovered { .. }))
        .count();
    assert!(recoveries >= 1);
    assert!(session.agent(id).unwrap().is_active());
}

#[test]
fn defeated_agent_is_removed_after_delay() {
    let mut session = session();
    let id = session
        .spawn(narrow_config(), ScriptedNavigation::new(Vec3::ZERO))
        .unwrap();
    let events = record_events(&mut session);

    session.defeat(id).unwrap();
    // Defeating twice schedules one removal
    session.defeat(id).unwrap();

    for _ in 0..35 {
        session.tick(DT, None, &NoOcclusion);
    }

    assert!(session.agent(id).is_none());
    let events = events.lock();
    assert_eq!(
        events
            .iter()
            .filter(|event| matches!(event, AgentEvent::Defeated { .. }))
            .count(),
        1
    );
    assert!(events.contains(&AgentEvent::Despawned { agent: id }));
}

#[test]
fn agent_without_waypoints_waits_in_place() {
    let mut session = session();
    let id = session
        .spawn(narrow_config(), ScriptedNavigation::new(Vec3::ZERO))
        .unwrap();

    for _ in 0..20 {
        for agent in session.agents_mut() {
            agent.navigation_mut().step(DT);
        }
        session.tick(DT, None, &NoOcclusion);
    }

    let agent = session.agent(id).unwrap();
    assert_eq!(agent.state(), BehaviorState::Patrolling);
    assert_eq!(agent.position(), Vec3::ZERO);
}

#[test]
fn capture_ends_the_hunt() {
    let mut session = session();
    let id = session
        .spawn(narrow_config(), ScriptedNavigation::new(Vec3::ZERO))
        .unwrap();
    let events = record_events(&mut session);

    let target = Target::new(Vec3::new(0.0, 0.0, 4.0), Vec3::NEG_Z);
    for _ in 0..40 {
        for agent in session.agents_mut() {
            agent.navigation_mut().step(DT);
        }
        session.tick(DT, Some(&target), &NoOcclusion);
        if session.is_target_captured() {
            break;
        }
    }

    assert!(session.is_target_captured());
    assert_eq!(session.agent(id).unwrap().lifecycle(), Lifecycle::Captured);
    assert_eq!(
        events
            .lock()
            .iter()
            .filter(|event| matches!(event, AgentEvent::Captured { .. }))
            .count(),
        1
    );
}

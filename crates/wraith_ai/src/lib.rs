//! Wraith AI - Pursuing antagonist agents
//!
//! Drives one or more antagonists that patrol a level, notice a single
//! target, chase it, lose it, search for it and share what they know with
//! nearby peers.
//!
//! # Features
//!
//! - Difficulty presets for speeds, senses and timings
//! - Throttled sight, hearing and light-exposure perception
//! - Five-state behavior machine (patrol, investigate, chase, search,
//!   distracted)
//! - Stuck detection and recovery on top of a host navigation service
//! - Search-point planning with a short-term memory of searched spots
//! - Peer alerts through a coordination bus
//!
//! The host supplies navigation and occlusion through the
//! [`NavigationService`] and [`OcclusionQuery`] traits and drives
//! everything from [`Session::tick`].
//!
//! # Example
//!
//! ```ignore
//! use wraith_ai::prelude::*;
//!
//! let mut session = Session::new(CoordinationConfig::default(), 7)?;
//! let id = session.spawn(AgentConfig::for_difficulty(Difficulty::Hard), nav)?;
//! session.tick(dt, Some(&Target::new(player_pos, player_forward)), &world);
//! ```

pub mod agent;
pub mod behavior;
pub mod config;
pub mod coordination;
pub mod difficulty;
pub mod error;
pub mod events;
pub mod navigation;
pub mod patrol;
pub mod perception;
pub mod schedule;
pub mod search;
pub mod search_memory;
pub mod services;
pub mod session;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub mod prelude {
    pub use crate::agent::{Agent, AgentId, AntagonistBehavior, Lifecycle, TickContext};
    pub use crate::behavior::{BehaviorState, BehaviorStateMachine, StateChange};
    pub use crate::config::{
        AgentConfig, BehaviorConfig, CoordinationConfig, NavigationConfig, PatrolStrategy,
        PerceptionConfig, SearchConfig,
    };
    pub use crate::coordination::{Alert, AlertDirective, CoordinationBus, PeerSnapshot};
    pub use crate::difficulty::{Difficulty, DifficultyProfile};
    pub use crate::error::AiError;
    pub use crate::events::AgentEvent;
    pub use crate::navigation::{NavigationController, NavigationStatus, RecoveryAction};
    pub use crate::perception::{BeliefState, Confidence, PerceptionResult, PerceptionSystem};
    pub use crate::services::{NavigationService, NoOcclusion, OcclusionQuery, PathStatus, Target};
    pub use crate::session::Session;
}

pub use prelude::*;

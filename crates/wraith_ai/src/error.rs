//! Error types for the antagonist engine
//!
//! Only construction and configuration can fail. The per-tick path never
//! returns an error; it degrades to "agent does nothing productive".

use crate::agent::AgentId;
use thiserror::Error;

/// Antagonist engine errors
#[derive(Debug, Error)]
pub enum AiError {
    /// Difficulty name not recognised
    #[error("Unknown difficulty: {0}")]
    UnknownDifficulty(String),

    /// Difficulty level outside the fixed Easy/Medium/Hard set
    #[error("Difficulty level out of range: {0} (expected 0, 1 or 2)")]
    DifficultyLevelOutOfRange(i64),

    /// A profile parameter is non-finite or outside its valid range
    #[error("Invalid difficulty profile: {field} = {value}")]
    InvalidProfile { field: &'static str, value: f32 },

    /// Invalid tuning configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Agent id registered twice on the coordination bus
    #[error("Agent already registered: {0}")]
    AlreadyRegistered(AgentId),

    /// Agent id unknown to the session
    #[error("Agent not found: {0}")]
    AgentNotFound(AgentId),
}

/// Result type for antagonist engine operations
pub type Result<T> = std::result::Result<T, AiError>;

//! Scenario loading errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("failed to read scenario: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse scenario: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid scenario: {0}")]
    InvalidScenario(String),

    #[error(transparent)]
    Ai(#[from] wraith_ai::AiError),
}

pub type Result<T> = std::result::Result<T, SimError>;

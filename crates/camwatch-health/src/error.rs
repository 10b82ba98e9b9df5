//! Health monitor error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HealthError {
    #[error("config error: {0}")]
    Config(#[from] camwatch_core::ConfigError),

    #[error("state error: {0}")]
    State(#[from] camwatch_state::StateError),

    #[error("probe error: {0}")]
    Probe(String),

    #[error("remediation error: {0}")]
    Remediation(String),
}

pub type HealthResult<T> = Result<T, HealthError>;

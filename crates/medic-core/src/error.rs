//! Error types for problem checks.

use medic_state::StateError;
use thiserror::Error;

/// Errors raised while looking up, configuring, or running checks.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("unknown problem check: {0}")]
    NotFound(String),

    #[error("problem check already registered: {0}")]
    DuplicateCheck(String),

    #[error("invalid check data `{key}`: {reason}")]
    InvalidData { key: String, reason: String },

    #[error("problem check {identifier} failed: {source}")]
    Execution {
        identifier: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("locale error: {0}")]
    Locale(String),

    #[error("tracker store error: {0}")]
    State(#[from] StateError),
}

pub type CheckResult<T> = Result<T, CheckError>;

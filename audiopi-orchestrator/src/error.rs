//! Error types for the orchestration engine

use std::time::Duration;

use audiopi_state::{EntityId, ErrorKind, StateError};
use audiopi_supervisor::SupervisorError;
use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, OrchestrationError>;

/// Why an intent was not acknowledged
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// Rejected by a registry
    #[error(transparent)]
    State(#[from] StateError),

    #[error("{entity} did not {action} within {timeout:?}")]
    Timeout {
        entity: EntityId,
        action: &'static str,
        timeout: Duration,
    },

    #[error("{0}")]
    ProcessFailure(String),

    #[error("Invalid intent: {0}")]
    Validation(String),

    #[error("Invalid engine configuration: {0}")]
    Configuration(String),

    #[error("engine stopped")]
    Stopped,
}

impl OrchestrationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrchestrationError::State(err) => err.kind(),
            OrchestrationError::Timeout { .. } => ErrorKind::Timeout,
            OrchestrationError::ProcessFailure(_) | OrchestrationError::Stopped => {
                ErrorKind::ProcessFailure
            }
            OrchestrationError::Validation(_) | OrchestrationError::Configuration(_) => {
                ErrorKind::Validation
            }
        }
    }
}

impl From<SupervisorError> for OrchestrationError {
    fn from(err: SupervisorError) -> Self {
        OrchestrationError::ProcessFailure(err.to_string())
    }
}

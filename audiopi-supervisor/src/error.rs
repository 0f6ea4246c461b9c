//! Error types for the supervisor

use audiopi_state::{EntityId, ErrorKind};
use thiserror::Error;

use crate::state::ProcessState;

/// Result type for supervisor operations
pub type Result<T> = std::result::Result<T, SupervisorError>;

/// Failure reported by a [`ProcessBackend`](crate::ProcessBackend)
#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Control(#[from] system_control::ControlError),

    #[error("Failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(String),
}

/// Errors that can occur while supervising processes
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("No process registered for {0}")]
    NotRegistered(EntityId),

    #[error("Invalid transition for {entity}: {from} -> {to}")]
    InvalidTransition {
        entity: EntityId,
        from: ProcessState,
        to: ProcessState,
    },

    #[error("Failed to start {entity}: {source}")]
    StartFailed {
        entity: EntityId,
        #[source]
        source: BackendError,
    },

    #[error("Failed to stop {entity}: {source}")]
    StopFailed {
        entity: EntityId,
        #[source]
        source: BackendError,
    },

    #[error("Invalid restart policy: {0}")]
    InvalidPolicy(String),

    #[error("Supervisor task failed: {0}")]
    TaskFailed(String),
}

impl SupervisorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SupervisorError::NotRegistered(_) => ErrorKind::NotFound,
            SupervisorError::InvalidTransition { .. } => ErrorKind::Conflict,
            SupervisorError::InvalidPolicy(_) => ErrorKind::Validation,
            SupervisorError::StartFailed { .. }
            | SupervisorError::StopFailed { .. }
            | SupervisorError::TaskFailed(_) => ErrorKind::ProcessFailure,
        }
    }
}

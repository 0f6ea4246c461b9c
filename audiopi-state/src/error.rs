//! Error types for audiopi-state and the shared error taxonomy

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::{GroupId, SourceId, ZoneId};

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, StateError>;

/// Error classification every layer maps onto, and the `errorKind` callers see
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// A referenced source, zone or group is absent
    NotFound,
    /// An invariant would be violated
    #[serde(rename = "ConflictError")]
    Conflict,
    /// A bounded wait was exceeded
    Timeout,
    /// An OS process failed to start, stop or stay healthy
    ProcessFailure,
    /// Malformed request
    #[serde(rename = "ValidationError")]
    Validation,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Conflict => "ConflictError",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::ProcessFailure => "ProcessFailure",
            ErrorKind::Validation => "ValidationError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by the registries
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("Source not found: {0}")]
    SourceNotFound(SourceId),

    #[error("Zone not found: {0}")]
    ZoneNotFound(ZoneId),

    #[error("Group not found: {0}")]
    GroupNotFound(GroupId),

    #[error("Cannot activate {requested}: {active} is already active")]
    Conflict { requested: SourceId, active: SourceId },

    #[error("Invalid request: {0}")]
    Validation(String),
}

impl StateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StateError::SourceNotFound(_)
            | StateError::ZoneNotFound(_)
            | StateError::GroupNotFound(_) => ErrorKind::NotFound,
            StateError::Conflict { .. } => ErrorKind::Conflict,
            StateError::Validation(_) => ErrorKind::Validation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_names() {
        assert_eq!(serde_json::to_string(&ErrorKind::Conflict).unwrap(), "\"ConflictError\"");
        assert_eq!(serde_json::to_string(&ErrorKind::Validation).unwrap(), "\"ValidationError\"");
        assert_eq!(ErrorKind::NotFound.to_string(), "NotFound");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(StateError::ZoneNotFound("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(
            StateError::Conflict {
                requested: "spotify".into(),
                active: "airplay".into()
            }
            .kind(),
            ErrorKind::Conflict
        );
    }
}

//! Error types for the control API

use std::path::PathBuf;

use thiserror::Error;
use warp::http::StatusCode;

use audiopi_orchestrator::OrchestrationError;
use audiopi_state::{ErrorKind, StateError};
use system_control::ControlError;

/// Errors raised while starting or running the server itself
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("No available port found in range {start}-{end}")]
    NoAvailablePort { start: u16, end: u16 },

    #[error("Invalid port range {start}-{end}")]
    InvalidPortRange { start: u16, end: u16 },

    #[error("Server failed to start")]
    StartFailed,

    #[error("Failed to access settings file {path}: {source}")]
    SettingsIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed settings file {path}: {source}")]
    SettingsFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A failed request, as reported in the `errorKind`/`errorMessage` envelope
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn status(&self) -> StatusCode {
        status_for(self.kind)
    }
}

/// HTTP status for each error kind
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::ProcessFailure => StatusCode::BAD_GATEWAY,
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
    }
}

impl From<OrchestrationError> for ApiError {
    fn from(err: OrchestrationError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

impl From<StateError> for ApiError {
    fn from(err: StateError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

impl From<ControlError> for ApiError {
    fn from(err: ControlError) -> Self {
        let kind = match err {
            ControlError::Timeout { .. } => ErrorKind::Timeout,
            _ => ErrorKind::ProcessFailure,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<ServerError> for ApiError {
    fn from(err: ServerError) -> Self {
        Self::new(ErrorKind::ProcessFailure, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::Duration;

    #[rstest]
    #[case(ErrorKind::NotFound, 404)]
    #[case(ErrorKind::Conflict, 409)]
    #[case(ErrorKind::Timeout, 504)]
    #[case(ErrorKind::ProcessFailure, 502)]
    #[case(ErrorKind::Validation, 400)]
    fn test_status_mapping(#[case] kind: ErrorKind, #[case] status: u16) {
        assert_eq!(status_for(kind).as_u16(), status);
    }

    #[test]
    fn test_control_timeout_maps_to_timeout() {
        let err: ApiError = ControlError::Timeout {
            command: "/usr/bin/nmcli dev wifi list".into(),
            timeout: Duration::from_secs(30),
        }
        .into();
        assert_eq!(err.kind, ErrorKind::Timeout);

        let err: ApiError = ControlError::CommandFailed {
            command: "/usr/bin/systemctl start raspotify".into(),
            code: 5,
            stderr: "Unit raspotify.service not found.".into(),
        }
        .into();
        assert_eq!(err.kind, ErrorKind::ProcessFailure);
        assert!(err.message.contains("raspotify"));
    }
}

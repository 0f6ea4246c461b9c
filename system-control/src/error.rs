//! Error types for the OS control client

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while driving an OS tool
#[derive(Debug, Error)]
pub enum ControlError {
    /// The program could not be spawned at all
    #[error("Failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran but exited non-zero
    #[error("`{command}` exited with code {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    /// The program did not finish in time
    #[error("`{command}` timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    /// Output did not have the expected shape
    #[error("Failed to parse output of `{command}`: {message}")]
    Parse { command: String, message: String },
}

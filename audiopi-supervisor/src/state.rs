//! Per-process lifecycle

use serde::Serialize;
use std::fmt;

use audiopi_state::EntityId;

use crate::error::{Result, SupervisorError};

/// Lifecycle state of one managed process
///
/// ```text
/// Stopped ─► Starting ─► Running ─► Stopping ─► Stopped
///               ▲           │
///               │           ▼
///               └──────── Crashed ─► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Crashed,
    Failed,
}

impl ProcessState {
    /// Whether `self -> next` is a legal move
    pub fn can_transition_to(self, next: ProcessState) -> bool {
        use ProcessState::*;
        matches!(
            (self, next),
            (Stopped, Starting)
                | (Failed, Starting)
                | (Starting, Running)
                | (Starting, Crashed)
                | (Starting, Failed)
                | (Running, Stopping)
                | (Running, Crashed)
                | (Crashed, Starting)
                | (Crashed, Failed)
                | (Crashed, Stopping)
                | (Failed, Stopping)
                | (Stopping, Stopped)
                | (Stopping, Failed)
        )
    }

    /// Checked transition
    pub fn transition(self, next: ProcessState, entity: &EntityId) -> Result<ProcessState> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(SupervisorError::InvalidTransition {
                entity: entity.clone(),
                from: self,
                to: next,
            })
        }
    }

    /// A process exists, or is being brought back
    pub fn is_live(self) -> bool {
        matches!(
            self,
            ProcessState::Starting | ProcessState::Running | ProcessState::Crashed
        )
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessState::Stopped => "stopped",
            ProcessState::Starting => "starting",
            ProcessState::Running => "running",
            ProcessState::Stopping => "stopping",
            ProcessState::Crashed => "crashed",
            ProcessState::Failed => "failed",
        };
        f.write_str(s)
    }
}

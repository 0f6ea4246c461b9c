//! Intents and acknowledgements

use serde::{Deserialize, Serialize};

use audiopi_state::{CorrelationId, GroupId, SourceId, ZoneId};

use crate::error::{OrchestrationError, Result};

/// A requested state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    /// Make `source` the Active source, stopping whichever source was
    ActivateSource { source: SourceId },
    DeactivateSource { source: SourceId },
    /// Out of range levels are clamped to 0..=100
    SetVolume { zone: ZoneId, level: i64 },
    SetMute { zone: ZoneId, muted: bool },
    JoinGroup { zone: ZoneId, group: GroupId },
    LeaveGroup { zone: ZoneId },
    SetGroupVolume { group: GroupId, level: i64 },
    /// A playback client announced itself
    RegisterZone {
        zone: ZoneId,
        #[serde(default)]
        name: String,
    },
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Intent::ActivateSource { .. } => "activate_source",
            Intent::DeactivateSource { .. } => "deactivate_source",
            Intent::SetVolume { .. } => "set_volume",
            Intent::SetMute { .. } => "set_mute",
            Intent::JoinGroup { .. } => "join_group",
            Intent::LeaveGroup { .. } => "leave_group",
            Intent::SetGroupVolume { .. } => "set_group_volume",
            Intent::RegisterZone { .. } => "register_zone",
        }
    }

    /// Reject blank identifiers before anything is looked up
    pub fn validate(&self) -> Result<()> {
        let blank = |field: &str, value: &str| {
            if value.trim().is_empty() {
                Err(OrchestrationError::Validation(format!(
                    "{}: `{}` must not be empty",
                    self.name(),
                    field
                )))
            } else {
                Ok(())
            }
        };
        match self {
            Intent::ActivateSource { source } | Intent::DeactivateSource { source } => {
                blank("source", source.as_str())
            }
            Intent::SetVolume { zone, .. }
            | Intent::SetMute { zone, .. }
            | Intent::LeaveGroup { zone }
            | Intent::RegisterZone { zone, .. } => blank("zone", zone.as_str()),
            Intent::JoinGroup { zone, group } => {
                blank("zone", zone.as_str())?;
                blank("group", group.as_str())
            }
            Intent::SetGroupVolume { group, .. } => blank("group", group.as_str()),
        }
    }
}

/// An intent plus the id its events will carry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentRequest {
    /// Generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,
    #[serde(flatten)]
    pub intent: Intent,
}

impl IntentRequest {
    pub fn new(intent: Intent) -> Self {
        Self {
            correlation_id: None,
            intent,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }
}

impl From<Intent> for IntentRequest {
    fn from(intent: Intent) -> Self {
        IntentRequest::new(intent)
    }
}

/// Successful outcome of an intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub correlation_id: CorrelationId,
    /// Number of events the intent committed; 0 for a repeated no-op
    pub events: u64,
}

//! Committed state changes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CorrelationId, GroupId, SourceId, ZoneHealth, ZoneId};

/// Emitted once for every committed change to source or zone state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrchestrationEvent {
    SourceActivated {
        source: SourceId,
    },
    SourceDeactivated {
        source: SourceId,
    },
    SourceFailed {
        source: SourceId,
        error: Option<String>,
    },
    ZoneVolumeChanged {
        zone: ZoneId,
        old: u8,
        new: u8,
    },
    ZoneMuteChanged {
        zone: ZoneId,
        muted: bool,
    },
    ZoneRegistered {
        zone: ZoneId,
        name: String,
    },
    GroupMembershipChanged {
        zone: ZoneId,
        from: Option<GroupId>,
        to: Option<GroupId>,
    },
    GroupDissolved {
        group: GroupId,
    },
    ZoneHealthChanged {
        zone: ZoneId,
        old: ZoneHealth,
        new: ZoneHealth,
    },
}

impl OrchestrationEvent {
    /// Wire name, identical to the serde tag
    pub fn name(&self) -> &'static str {
        match self {
            OrchestrationEvent::SourceActivated { .. } => "source_activated",
            OrchestrationEvent::SourceDeactivated { .. } => "source_deactivated",
            OrchestrationEvent::SourceFailed { .. } => "source_failed",
            OrchestrationEvent::ZoneVolumeChanged { .. } => "zone_volume_changed",
            OrchestrationEvent::ZoneMuteChanged { .. } => "zone_mute_changed",
            OrchestrationEvent::ZoneRegistered { .. } => "zone_registered",
            OrchestrationEvent::GroupMembershipChanged { .. } => "group_membership_changed",
            OrchestrationEvent::GroupDissolved { .. } => "group_dissolved",
            OrchestrationEvent::ZoneHealthChanged { .. } => "zone_health_changed",
        }
    }
}

/// An event as stored in the log and sent to subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Monotonic, starting at 1
    pub seq: u64,
    pub at: DateTime<Utc>,
    pub correlation_id: Option<CorrelationId>,
    #[serde(flatten)]
    pub event: OrchestrationEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_name_matches_tag() {
        let event = OrchestrationEvent::GroupMembershipChanged {
            zone: ZoneId::new("kitchen"),
            from: None,
            to: Some(GroupId::new("g1")),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.name());
        assert_eq!(json["to"], "g1");
        assert!(json["from"].is_null());
    }

    #[test]
    fn test_envelope_flattens_event() {
        let envelope = EventEnvelope {
            seq: 7,
            at: Utc::now(),
            correlation_id: None,
            event: OrchestrationEvent::ZoneVolumeChanged {
                zone: ZoneId::new("kitchen"),
                old: 50,
                new: 100,
            },
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["seq"], 7);
        assert_eq!(json["type"], "zone_volume_changed");
        assert_eq!(json["new"], 100);

        let back: EventEnvelope = serde_json::from_value(json).unwrap();
        assert_eq!(back, envelope);
    }
}

//! Point-in-time view over both registries

use serde::Serialize;

use crate::model::{Source, SyncGroup, Zone};
use crate::sources::SourceRegistry;
use crate::zones::ZoneRegistry;

/// Everything a client needs to rebuild its view after an event gap
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateSnapshot {
    pub sources: Vec<Source>,
    pub zones: Vec<Zone>,
    pub groups: Vec<SyncGroup>,
    /// Sequence number of the latest event reflected in this snapshot
    pub last_seq: u64,
}

impl StateSnapshot {
    /// Capture both registries.
    ///
    /// `last_seq` is read first, so replaying events after it from the
    /// bus never skips a change the snapshot missed.
    pub fn capture(sources: &SourceRegistry, zones: &ZoneRegistry) -> Self {
        let last_seq = sources.bus().last_seq();
        let source_map = sources.snapshot();
        let zone_state = zones.snapshot();
        Self {
            sources: source_map.values().cloned().collect(),
            zones: zone_state.zones.values().cloned().collect(),
            groups: zone_state.groups.values().cloned().collect(),
            last_seq,
        }
    }

    /// The non-mixable Active source, if any
    pub fn active_source(&self) -> Option<&Source> {
        self.sources.iter().find(|s| s.is_active() && !s.mixable)
    }

    pub fn zones_in_group<'a>(&'a self, group: &'a SyncGroup) -> impl Iterator<Item = &'a Zone> + 'a {
        self.zones.iter().filter(move |z| group.contains(&z.id))
    }
}

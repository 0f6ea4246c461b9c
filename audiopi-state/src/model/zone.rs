//! Playback zones and sync groups

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::{GroupId, ZoneId};

/// Volume assigned to zones that register without one
pub const DEFAULT_VOLUME: u8 = 50;

/// Reachability of a zone's playback client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneHealth {
    Online,
    Offline,
    /// Client crashed and is being restarted
    Degraded,
}

impl fmt::Display for ZoneHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ZoneHealth::Online => "online",
            ZoneHealth::Offline => "offline",
            ZoneHealth::Degraded => "degraded",
        };
        f.write_str(s)
    }
}

/// An addressable playback endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    /// 0..=100
    pub volume: u8,
    pub muted: bool,
    pub group: Option<GroupId>,
    pub health: ZoneHealth,
}

impl Zone {
    /// A zone with default volume, unmuted, ungrouped
    pub fn new(id: impl Into<ZoneId>, name: impl Into<String>, health: ZoneHealth) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            volume: DEFAULT_VOLUME,
            muted: false,
            group: None,
            health,
        }
    }

    pub fn with_volume(mut self, volume: u8) -> Self {
        self.volume = volume.min(100);
        self
    }
}

/// Zones playing the same stream in sync. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncGroup {
    pub id: GroupId,
    pub members: BTreeSet<ZoneId>,
}

impl SyncGroup {
    pub fn contains(&self, zone: &ZoneId) -> bool {
        self.members.contains(zone)
    }
}

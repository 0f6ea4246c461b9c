//! Audio sources

use serde::{Deserialize, Serialize};
use std::fmt;

use super::SourceId;

/// Input technology behind a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    Airplay,
    Spotify,
    Dlna,
    Bluetooth,
    LineIn,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceKind::Airplay => "airplay",
            SourceKind::Spotify => "spotify",
            SourceKind::Dlna => "dlna",
            SourceKind::Bluetooth => "bluetooth",
            SourceKind::LineIn => "line-in",
        };
        f.write_str(s)
    }
}

/// Lifecycle of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceState {
    Idle,
    Starting,
    Active,
    Stopping,
    Failed,
}

impl SourceState {
    /// Starting and Stopping only exist while an intent is in flight
    pub fn is_transitional(&self) -> bool {
        matches!(self, SourceState::Starting | SourceState::Stopping)
    }
}

impl fmt::Display for SourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceState::Idle => "idle",
            SourceState::Starting => "starting",
            SourceState::Active => "active",
            SourceState::Stopping => "stopping",
            SourceState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A configured audio input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    pub kind: SourceKind,
    pub name: String,
    pub state: SourceState,
    pub last_error: Option<String>,
    /// Mixable sources may be Active alongside any other source
    pub mixable: bool,
}

impl Source {
    /// An Idle, non-mixable source
    pub fn new(id: impl Into<SourceId>, kind: SourceKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            state: SourceState::Idle,
            last_error: None,
            mixable: false,
        }
    }

    pub fn with_mixable(mut self, mixable: bool) -> Self {
        self.mixable = mixable;
        self
    }

    pub fn is_active(&self) -> bool {
        self.state == SourceState::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serde_is_kebab_case() {
        assert_eq!(serde_json::to_string(&SourceKind::LineIn).unwrap(), "\"line-in\"");
        let kind: SourceKind = serde_json::from_str("\"airplay\"").unwrap();
        assert_eq!(kind, SourceKind::Airplay);
        assert_eq!(SourceKind::LineIn.to_string(), "line-in");
    }

    #[test]
    fn test_new_source_is_idle() {
        let source = Source::new("spotify", SourceKind::Spotify, "Spotify Connect");
        assert_eq!(source.state, SourceState::Idle);
        assert!(!source.mixable);
        assert!(source.last_error.is_none());
    }
}

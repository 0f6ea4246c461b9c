//! audiopi state
//!
//! The data the orchestration daemon coordinates: audio sources, playback
//! zones and sync groups, plus the event bus every committed change is
//! published on.
//!
//! # Architecture
//!
//! ```text
//! Orchestration Engine ──writes──► SourceRegistry ─┐
//!                      ──writes──► ZoneRegistry  ──┼─► EventBus ─► subscribers
//!                                                  │   (ring buffer + broadcast)
//! Control API ◄──snapshots─────────────────────────┘
//! ```
//!
//! The engine is the only writer. Registries keep their maps behind an
//! `Arc` that is swapped on every commit, so readers always see a
//! consistent view without waiting on writers.
//!
//! # Example
//!
//! ```rust
//! use audiopi_state::{EventBus, Source, SourceKind, SourceRegistry, SourceState};
//!
//! let bus = EventBus::default();
//! let sources = SourceRegistry::new(
//!     vec![Source::new("airplay", SourceKind::Airplay, "AirPlay")],
//!     bus.clone(),
//! );
//!
//! sources.set_state(&"airplay".into(), SourceState::Active, None, None).unwrap();
//! assert_eq!(bus.since(0).events.len(), 1);
//! ```

pub mod bus;
pub mod error;
pub mod logging;
pub mod model;
pub mod snapshot;
pub mod sources;
pub mod zones;

pub use bus::{EventBus, EventPage, DEFAULT_EVENT_CAPACITY};
pub use error::{ErrorKind, Result, StateError};
pub use model::{
    CorrelationId, EntityId, EventEnvelope, GroupId, OrchestrationEvent, Source, SourceId,
    SourceKind, SourceState, SyncGroup, Zone, ZoneHealth, ZoneId, DEFAULT_VOLUME,
};
pub use snapshot::StateSnapshot;
pub use sources::SourceRegistry;
pub use zones::{ZoneRegistry, ZoneState};

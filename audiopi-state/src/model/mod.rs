//! Data model

mod event;
mod ids;
mod source;
mod zone;

pub use event::{EventEnvelope, OrchestrationEvent};
pub use ids::{CorrelationId, EntityId, GroupId, SourceId, ZoneId};
pub use source::{Source, SourceKind, SourceState};
pub use zone::{SyncGroup, Zone, ZoneHealth, DEFAULT_VOLUME};

//! Source Registry
//!
//! Holds every configured source and enforces that at most one non-mixable
//! source is Active. The map is copy-on-write: writers build a new map and
//! swap the `Arc`, readers clone the `Arc` and never block on a writer.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::bus::EventBus;
use crate::error::{Result, StateError};
use crate::model::{CorrelationId, OrchestrationEvent, Source, SourceId, SourceState};

type SourceMap = BTreeMap<SourceId, Source>;

/// Registry of audio sources
#[derive(Debug)]
pub struct SourceRegistry {
    sources: RwLock<Arc<SourceMap>>,
    bus: EventBus,
}

impl SourceRegistry {
    /// Create a registry from the statically configured sources
    pub fn new(sources: impl IntoIterator<Item = Source>, bus: EventBus) -> Self {
        let map = sources
            .into_iter()
            .map(|source| (source.id.clone(), source))
            .collect();
        Self {
            sources: RwLock::new(Arc::new(map)),
            bus,
        }
    }

    /// Consistent view of every source
    pub fn snapshot(&self) -> Arc<BTreeMap<SourceId, Source>> {
        Arc::clone(&self.sources.read())
    }

    /// All sources, sorted by id
    pub fn list_sources(&self) -> Vec<Source> {
        self.snapshot().values().cloned().collect()
    }

    pub fn get_source(&self, id: &SourceId) -> Result<Source> {
        self.snapshot()
            .get(id)
            .cloned()
            .ok_or_else(|| StateError::SourceNotFound(id.clone()))
    }

    /// The non-mixable source currently Active, if any
    pub fn active_source(&self) -> Option<Source> {
        self.snapshot()
            .values()
            .find(|s| s.is_active() && !s.mixable)
            .cloned()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Move a source to `new_state`.
    ///
    /// Returns whether an event was emitted. Entering Active fails with
    /// [`StateError::Conflict`] while another non-mixable source is Active.
    /// Starting and Stopping are recorded silently; re-entering the current
    /// state is a successful no-op.
    pub fn set_state(
        &self,
        id: &SourceId,
        new_state: SourceState,
        error: Option<String>,
        correlation_id: Option<CorrelationId>,
    ) -> Result<bool> {
        let mut guard = self.sources.write();
        let current = guard
            .get(id)
            .ok_or_else(|| StateError::SourceNotFound(id.clone()))?;

        if current.state == new_state {
            return Ok(false);
        }

        if new_state == SourceState::Active && !current.mixable {
            if let Some(active) = guard
                .values()
                .find(|s| s.id != *id && s.is_active() && !s.mixable)
            {
                return Err(StateError::Conflict {
                    requested: id.clone(),
                    active: active.id.clone(),
                });
            }
        }

        let old_state = current.state;
        let event = match (old_state, new_state) {
            (_, SourceState::Active) => Some(OrchestrationEvent::SourceActivated {
                source: id.clone(),
            }),
            (SourceState::Active | SourceState::Stopping, SourceState::Idle) => {
                Some(OrchestrationEvent::SourceDeactivated { source: id.clone() })
            }
            (_, SourceState::Failed) => Some(OrchestrationEvent::SourceFailed {
                source: id.clone(),
                error: error.clone(),
            }),
            _ => None,
        };

        let mut next = (**guard).clone();
        if let Some(source) = next.get_mut(id) {
            source.state = new_state;
            match new_state {
                SourceState::Active | SourceState::Starting => source.last_error = None,
                SourceState::Failed => source.last_error = error,
                _ => {}
            }
        }
        *guard = Arc::new(next);

        tracing::debug!(source = %id, from = %old_state, to = %new_state, "source state changed");

        // Published under the write lock so event order matches commit order
        Ok(match event {
            Some(event) => {
                self.bus.publish(event, correlation_id);
                true
            }
            None => false,
        })
    }
}

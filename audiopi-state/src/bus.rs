//! Event bus with a bounded replay log
//!
//! Every committed change is stamped with the next sequence number, kept in
//! a ring buffer for `since` replays and broadcast to live subscribers.
//! Sequencing, buffering and broadcasting happen under one lock, so the
//! broadcast order always equals `seq` order.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::model::{CorrelationId, EventEnvelope, OrchestrationEvent};

/// Default number of events retained for replay
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Result of a replay request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventPage {
    /// Buffered events with `seq > cursor`, oldest first
    pub events: Vec<EventEnvelope>,
    /// Events after the cursor were already evicted
    pub truncated: bool,
    /// Cursor to pass on the next request
    pub next: u64,
}

struct EventLog {
    buffer: VecDeque<EventEnvelope>,
    capacity: usize,
    last_seq: u64,
}

impl EventLog {
    fn page(&self, cursor: u64) -> EventPage {
        let events: Vec<EventEnvelope> = self
            .buffer
            .iter()
            .filter(|envelope| envelope.seq > cursor)
            .cloned()
            .collect();
        // The oldest retained event must directly follow the cursor,
        // otherwise something in between was evicted.
        let oldest = self.buffer.front().map(|e| e.seq);
        let truncated = match oldest {
            Some(oldest) => cursor < self.last_seq && oldest > cursor + 1,
            None => cursor < self.last_seq,
        };
        EventPage {
            events,
            truncated,
            next: self.last_seq.max(cursor),
        }
    }
}

/// Publishes [`OrchestrationEvent`]s. Cheap to clone.
#[derive(Clone)]
pub struct EventBus {
    log: Arc<Mutex<EventLog>>,
    sender: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a bus retaining up to `capacity` events (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            log: Arc::new(Mutex::new(EventLog {
                buffer: VecDeque::with_capacity(capacity),
                capacity,
                last_seq: 0,
            })),
            sender,
        }
    }

    /// Stamp, record and broadcast an event
    pub fn publish(
        &self,
        event: OrchestrationEvent,
        correlation_id: Option<CorrelationId>,
    ) -> EventEnvelope {
        let mut log = self.log.lock();
        log.last_seq += 1;
        let envelope = EventEnvelope {
            seq: log.last_seq,
            at: Utc::now(),
            correlation_id,
            event,
        };
        if log.buffer.len() == log.capacity {
            log.buffer.pop_front();
        }
        log.buffer.push_back(envelope.clone());

        tracing::debug!(seq = envelope.seq, event = envelope.event.name(), "event published");

        // No receivers is fine
        let _ = self.sender.send(envelope.clone());
        envelope
    }

    /// Live events from now on
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    /// Buffered events after `cursor`
    pub fn since(&self, cursor: u64) -> EventPage {
        self.log.lock().page(cursor)
    }

    /// Replay after `cursor` and subscribe in one step, so nothing published
    /// in between is lost or duplicated.
    pub fn subscribe_since(&self, cursor: u64) -> (EventPage, broadcast::Receiver<EventEnvelope>) {
        let log = self.log.lock();
        let page = log.page(cursor);
        let receiver = self.sender.subscribe();
        (page, receiver)
    }

    /// Sequence number of the latest event, 0 before the first
    pub fn last_seq(&self) -> u64 {
        self.log.lock().last_seq
    }

    pub fn capacity(&self) -> usize {
        self.log.lock().capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let log = self.log.lock();
        f.debug_struct("EventBus")
            .field("capacity", &log.capacity)
            .field("buffered", &log.buffer.len())
            .field("last_seq", &log.last_seq)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceId;

    fn activated(id: &str) -> OrchestrationEvent {
        OrchestrationEvent::SourceActivated {
            source: SourceId::new(id),
        }
    }

    #[test]
    fn test_seq_starts_at_one() {
        let bus = EventBus::new(8);
        assert_eq!(bus.last_seq(), 0);
        assert_eq!(bus.publish(activated("a"), None).seq, 1);
        assert_eq!(bus.publish(activated("b"), None).seq, 2);
    }

    #[test]
    fn test_since_returns_events_after_cursor() {
        let bus = EventBus::new(8);
        for id in ["a", "b", "c"] {
            bus.publish(activated(id), None);
        }

        let page = bus.since(1);
        assert_eq!(page.events.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![2, 3]);
        assert!(!page.truncated);
        assert_eq!(page.next, 3);

        let page = bus.since(3);
        assert!(page.events.is_empty());
        assert!(!page.truncated);
        assert_eq!(page.next, 3);
    }

    #[test]
    fn test_since_reports_truncation() {
        let bus = EventBus::new(2);
        for id in ["a", "b", "c", "d"] {
            bus.publish(activated(id), None);
        }

        let page = bus.since(0);
        assert!(page.truncated);
        assert_eq!(page.events.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![3, 4]);

        // cursor right before the oldest retained event is not a gap
        assert!(!bus.since(2).truncated);
    }

    #[test]
    fn test_cursor_ahead_of_log() {
        let bus = EventBus::new(4);
        bus.publish(activated("a"), None);
        let page = bus.since(10);
        assert!(page.events.is_empty());
        assert!(!page.truncated);
        assert_eq!(page.next, 10);
    }

    #[tokio::test]
    async fn test_subscribers_only_see_new_events() {
        let bus = EventBus::new(8);
        bus.publish(activated("old"), None);

        let mut rx = bus.subscribe();
        bus.publish(activated("new"), None);

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.seq, 2);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_subscribe_since_has_no_overlap() {
        let bus = EventBus::new(8);
        bus.publish(activated("a"), None);
        bus.publish(activated("b"), None);

        let (page, mut rx) = bus.subscribe_since(0);
        bus.publish(activated("c"), None);

        assert_eq!(page.events.len(), 2);
        assert_eq!(rx.recv().await.unwrap().seq, 3);
    }
}

//! # Event Log Adapter
//!
//! In-memory implementation of the [`EventSink`] port. Each published event
//! gets a correlation id, and watchers can replay or filter the log.

use crate::events::MarketEvent;
use crate::ports::outbound::EventSink;
use std::sync::RwLock;
use uuid::Uuid;

/// One logged event with its correlation id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggedEvent {
    /// Correlation id assigned at publish time.
    pub event_id: Uuid,
    /// The event payload.
    pub payload: MarketEvent,
}

/// In-memory event log for observation in tests and demos.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    entries: RwLock<Vec<LoggedEvent>>,
}

impl InMemoryEventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every logged event, in publish order.
    #[must_use]
    pub fn events(&self) -> Vec<LoggedEvent> {
        self.entries.read().unwrap().clone()
    }

    /// Returns the payloads published under `topic`, in publish order.
    #[must_use]
    pub fn with_topic(&self, topic: &str) -> Vec<MarketEvent> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .filter(|entry| entry.payload.topic() == topic)
            .map(|entry| entry.payload.clone())
            .collect()
    }

    /// Number of logged events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Returns true if nothing has been published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }

    /// Drops all logged events.
    pub fn clear(&self) {
        self.entries.write().unwrap().clear();
    }
}

impl EventSink for InMemoryEventLog {
    fn publish(&self, event: MarketEvent) {
        self.entries.write().unwrap().push(LoggedEvent {
            event_id: Uuid::new_v4(),
            payload: event,
        });
    }
}

// =============================================================================
// TESTS
// =============================================================================

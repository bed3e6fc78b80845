//! Bounded in-memory event sink for tests and development.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::core::{EventSink, OrchestratorEvent};

/// Keeps the most recent `max_events` events, dropping the oldest first.
#[derive(Debug)]
pub struct InMemoryEventSink {
    events: Mutex<VecDeque<OrchestratorEvent>>,
    max_events: usize,
}

impl InMemoryEventSink {
    /// Create a sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(max_events.min(1024))),
            max_events,
        }
    }

    /// Snapshot of stored events, oldest first.
    pub fn events(&self) -> Vec<OrchestratorEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Wire names of stored events, oldest first.
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(OrchestratorEvent::name).collect()
    }

    /// Number of stored events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Drop every stored event.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Default for InMemoryEventSink {
    fn default() -> Self {
        Self::new(crate::core::DEFAULT_EVENT_BUFFER)
    }
}

impl EventSink for InMemoryEventSink {
    fn record(&self, event: &OrchestratorEvent) {
        if self.max_events == 0 {
            return;
        }
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event.clone());
    }
}

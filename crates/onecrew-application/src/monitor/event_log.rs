use std::collections::VecDeque;

use super::{ConnectionEvent, ConnectionEventType};

/// Append-only ring buffer of connection events.
///
/// Once `capacity` is reached the oldest entry is evicted on every push.
#[derive(Debug, Clone)]
pub struct EventLog {
    events: VecDeque<ConnectionEvent>,
    capacity: usize,
    total_recorded: u64,
    evicted: u64,
}

impl EventLog {
    /// Creates an empty log. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            total_recorded: 0,
            evicted: 0,
        }
    }

    pub fn push(&mut self, event: ConnectionEvent) {
        while self.events.len() >= self.capacity {
            self.events.pop_front();
            self.evicted += 1;
        }
        self.events.push_back(event);
        self.total_recorded += 1;
    }

    /// The most recent `n` events, oldest first.
    pub fn recent(&self, n: usize) -> Vec<ConnectionEvent> {
        let skip = self.events.len().saturating_sub(n);
        self.events.iter().skip(skip).cloned().collect()
    }

    /// All retained events of one type, oldest first.
    pub fn by_type(&self, event_type: ConnectionEventType) -> Vec<ConnectionEvent> {
        self.events
            .iter()
            .filter(|event| event.event_type == event_type)
            .cloned()
            .collect()
    }

    pub fn last(&self) -> Option<&ConnectionEvent> {
        self.events.back()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events ever pushed, including evicted ones.
    pub fn total_recorded(&self) -> u64 {
        self.total_recorded
    }

    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

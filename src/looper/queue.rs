//! Event queue: Pending deliveries sorted by due time.

use std::collections::VecDeque;

/// A queued delivery.
#[derive(Debug)]
pub(crate) struct Event<T> {
    /// Absolute due time in monotonic microseconds.
    pub when_us: i64,
    pub payload: T,
}

/// Queue ordered by ascending due time, FIFO among equal due times.
#[derive(Debug)]
pub(crate) struct EventQueue<T> {
    events: VecDeque<Event<T>>,
}

impl<T> EventQueue<T> {
    pub(crate) const fn new() -> Self {
        Self {
            events: VecDeque::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Insert before the first event due strictly later.
    ///
    /// Returns `true` if the event became the new head.
    pub(crate) fn insert(&mut self, when_us: i64, payload: T) -> bool {
        let at = self.events.partition_point(|e| e.when_us <= when_us);
        self.events.insert(at, Event { when_us, payload });
        at == 0
    }

    /// Due time of the head event.
    pub(crate) fn next_due(&self) -> Option<i64> {
        self.events.front().map(|e| e.when_us)
    }

    pub(crate) fn pop(&mut self) -> Option<Event<T>> {
        self.events.pop_front()
    }
}

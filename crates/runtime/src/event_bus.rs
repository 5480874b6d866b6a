use std::collections::VecDeque;

/// An event stamped with its emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamped<E> {
    pub seq: u64,
    pub event: E,
}

/// Bounded in-memory record of lifecycle events.
///
/// Long-lived components (the realtime channel in particular) emit here so
/// that conditions which are never raised as errors stay observable. Once
/// `capacity` is reached the oldest entry is discarded.
#[derive(Debug)]
pub struct EventBus<E> {
    next_seq: u64,
    capacity: usize,
    events: VecDeque<Stamped<E>>,
}

impl<E> EventBus<E> {
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            next_seq: 0,
            capacity: capacity.max(1),
            events: VecDeque::new(),
        }
    }

    pub fn emit(&mut self, event: E) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(Stamped { seq, event });
        seq
    }

    pub fn events(&self) -> impl Iterator<Item = &E> {
        self.events.iter().map(|s| &s.event)
    }

    pub fn last(&self) -> Option<&E> {
        self.events.back().map(|s| &s.event)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn drain(&mut self) -> Vec<Stamped<E>> {
        self.events.drain(..).collect()
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Bounded FIFO queues and the set that owns them.
//!
//! A [`Queue`] is the only shared resource between components. Each queue
//! has exactly one producer and one consumer, both of which hold a
//! [`QueueId`] rather than the queue itself. The [`QueueSet`] owns every
//! queue of a simulation.
//!
//! `push` onto a full queue and `pop`/`peek` of an empty queue are contract
//! violations and panic. Callers test [`Queue::is_full`] or
//! [`Queue::is_empty`] during their decide phase first.

use std::collections::VecDeque;
use std::fmt;

/// Handle for a [`Queue`] owned by a [`QueueSet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct QueueId(usize);

impl QueueId {
    #[must_use]
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

/// A fixed-capacity FIFO of values (normally packet handles).
pub struct Queue<T> {
    name: String,
    capacity: usize,
    items: VecDeque<T>,
}

impl<T> Queue<T>
where
    T: fmt::Debug,
{
    /// Create an empty queue.
    ///
    /// # Panics
    ///
    /// If `capacity` is zero.
    #[must_use]
    pub fn new(name: &str, capacity: usize) -> Self {
        assert!(capacity > 0, "{name}: queue capacity must be at least 1");
        Self {
            name: name.to_string(),
            capacity,
            items: VecDeque::with_capacity(capacity),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    /// Number of values that can be pushed before the queue is full.
    #[must_use]
    pub fn free_slots(&self) -> usize {
        self.capacity - self.items.len()
    }

    /// Append a value to the tail.
    ///
    /// # Panics
    ///
    /// If the queue is full.
    pub fn push(&mut self, value: T) {
        if self.is_full() {
            panic!("{}: push of {value:?} onto full queue", self.name);
        }
        self.items.push_back(value);
    }

    /// Remove and return the head.
    ///
    /// # Panics
    ///
    /// If the queue is empty.
    pub fn pop(&mut self) -> T {
        match self.items.pop_front() {
            Some(value) => value,
            None => panic!("{}: pop from empty queue", self.name),
        }
    }

    /// Return the head without removing it.
    ///
    /// # Panics
    ///
    /// If the queue is empty.
    #[must_use]
    pub fn peek(&self) -> &T {
        match self.items.front() {
            Some(value) => value,
            None => panic!("{}: peek at empty queue", self.name),
        }
    }

    /// Iterate from head to tail.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

/// Owner of all the queues in a simulation.
///
/// Queues are created once while wiring and never removed, so a [`QueueId`]
/// stays valid for the lifetime of the set.
pub struct QueueSet<T> {
    queues: Vec<Queue<T>>,
}

impl<T> Default for QueueSet<T> {
    fn default() -> Self {
        Self { queues: Vec::new() }
    }
}

impl<T> QueueSet<T>
where
    T: fmt::Debug,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new queue and return its handle.
    pub fn create(&mut self, name: &str, capacity: usize) -> QueueId {
        let id = QueueId(self.queues.len());
        self.queues.push(Queue::new(name, capacity));
        id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queues.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: QueueId) -> &Queue<T> {
        &self.queues[id.0]
    }

    pub fn get_mut(&mut self, id: QueueId) -> &mut Queue<T> {
        &mut self.queues[id.0]
    }

    /// Move the head of `from` to the tail of `to`.
    pub fn transfer(&mut self, from: QueueId, to: QueueId) {
        let value = self.get_mut(from).pop();
        self.get_mut(to).push(value);
    }

    /// Total number of values held across all queues.
    #[must_use]
    pub fn occupancy(&self) -> usize {
        self.queues.iter().map(Queue::len).sum()
    }
}

/// Access to the queues held within a simulation state.
///
/// Components are generic over the state they are registered with and only
/// require that it exposes its queues.
pub trait Queued<T> {
    fn queues(&self) -> &QueueSet<T>;
    fn queues_mut(&mut self) -> &mut QueueSet<T>;
}

impl<T> Queued<T> for QueueSet<T> {
    fn queues(&self) -> &QueueSet<T> {
        self
    }

    fn queues_mut(&mut self) -> &mut QueueSet<T> {
        self
    }
}

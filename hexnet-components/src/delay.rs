// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! A fixed-latency link between two queues.
//!
//! # Queues
//!
//!  - One input queue: `input`
//!  - One output queue: `output`
//!
//! # Function
//!
//! Values are pulled from `input` into an internal shift register and emerge
//! on `output` `depth` periods later. A depth of 0 behaves like a depth of 1
//! because crossing the register always takes one decide/commit cycle.
//!
//! When the output is full, values that are ready wait at the head of the
//! register. Nothing is dropped. Once the register is full the link stops
//! pulling from its input, so backpressure propagates upstream.
//!
//! The depth can be changed between cycles with [`Delay::set_depth`]. Values
//! already in flight keep the latency they were admitted with.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use hexnet_engine::engine::Engine;
use hexnet_engine::queue::{QueueId, Queued};
use hexnet_engine::traits::Clocked;
use hexnet_engine::types::{SimError, Tick};
use hexnet_track::entity::Entity;
use hexnet_track::trace;

/// What the link will do in its next commit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Transfer {
    /// Pull the head of the input queue into the register.
    pub admit: bool,

    /// Number of values to push to the output queue.
    pub emit: usize,
}

struct InFlight<T> {
    value: T,
    remaining: usize,
}

pub struct Delay<T> {
    pub entity: Rc<Entity>,
    depth: usize,
    input: QueueId,
    output: QueueId,
    in_flight: VecDeque<InFlight<T>>,
}

impl<T> Delay<T> {
    #[must_use]
    pub fn new(
        parent: &Rc<Entity>,
        name: &str,
        depth: usize,
        input: QueueId,
        output: QueueId,
    ) -> Self {
        Self {
            entity: Rc::new(Entity::new(parent, name)),
            depth,
            input,
            output,
            in_flight: VecDeque::new(),
        }
    }

    /// Create a delay and register it with the `engine` to run every
    /// `period` ticks.
    pub fn new_and_register<S>(
        engine: &mut Engine<S>,
        period: u64,
        parent: &Rc<Entity>,
        name: &str,
        depth: usize,
        input: QueueId,
        output: QueueId,
    ) -> Result<Rc<RefCell<Self>>, SimError>
    where
        Self: Clocked<S> + 'static,
        S: 'static,
    {
        let delay = Rc::new(RefCell::new(Self::new(parent, name, depth, input, output)));
        engine.register(period, &delay)?;
        Ok(delay)
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Change the depth applied to values admitted from now on.
    pub fn set_depth(&mut self, depth: usize) {
        trace!(self.entity ; "depth {} -> {}", self.depth, depth);
        self.depth = depth;
    }

    /// Number of values held in the register.
    #[must_use]
    pub fn num_in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn capacity(&self) -> usize {
        self.depth.max(1)
    }

    /// Number of leading values that will have no cycles remaining once
    /// this cycle has aged them.
    fn num_ready(&self) -> usize {
        self.in_flight
            .iter()
            .take_while(|entry| entry.remaining <= 1)
            .count()
    }
}

impl<T, S> Clocked<S> for Delay<T>
where
    T: fmt::Debug,
    S: Queued<T>,
{
    type Decision = Transfer;

    fn decide(&self, _now: Tick, state: &S) -> Transfer {
        let queues = state.queues();
        let free = queues.get(self.output).free_slots();

        let mut emit = self.num_ready().min(free);
        let admit = !queues.get(self.input).is_empty()
            && self.in_flight.len() - emit < self.capacity();

        // A value admitted with at most one cycle to wait leaves in the same
        // commit, provided nothing ahead of it is held back.
        if admit && emit == self.in_flight.len() && self.depth <= 1 && emit < free {
            emit += 1;
        }

        Transfer { admit, emit }
    }

    fn commit(&mut self, now: Tick, transfer: Transfer, state: &mut S) {
        let queues = state.queues_mut();

        if transfer.admit {
            let value = queues.get_mut(self.input).pop();
            trace!(self.entity ; "{}: admit {:?}", now, value);
            self.in_flight.push_back(InFlight {
                value,
                remaining: self.depth,
            });
        }

        for entry in &mut self.in_flight {
            entry.remaining = entry.remaining.saturating_sub(1);
        }

        for _ in 0..transfer.emit {
            match self.in_flight.pop_front() {
                Some(entry) => {
                    trace!(self.entity ; "{}: emit {:?}", now, entry.value);
                    queues.get_mut(self.output).push(entry.value);
                }
                None => panic!("{}: emit from empty register", self.entity),
            }
        }
    }
}

impl<T> fmt::Display for Delay<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.entity.fmt(f)
    }
}

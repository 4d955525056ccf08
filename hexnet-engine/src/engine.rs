// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! The engine owns the simulation state and advances time.
//!
//! Every registration has a period and fires on ticks that are a multiple of
//! it. A call to [`Engine::step`] runs the decide phase of every due
//! registration (in registration order), then the commit phase of the same
//! registrations (in the same order), then advances the tick. Because decide
//! only ever sees a shared reference to the state, every decision of a tick
//! is computed from the state committed by the previous tick and the outcome
//! does not depend on the order in which components were registered.
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use hexnet_engine::engine::Engine;
//! use hexnet_engine::traits::Clocked;
//! use hexnet_engine::types::Tick;
//!
//! struct Counter(u64);
//!
//! impl Clocked<u64> for Counter {
//!     type Decision = u64;
//!     fn decide(&self, _now: Tick, state: &u64) -> u64 {
//!         *state + 1
//!     }
//!     fn commit(&mut self, _now: Tick, next: u64, state: &mut u64) {
//!         self.0 += 1;
//!         *state = next;
//!     }
//! }
//!
//! let mut engine = Engine::default_with_state(0u64);
//! let counter = Rc::new(RefCell::new(Counter(0)));
//! engine.register(2, &counter).unwrap();
//! engine.run_for(10);
//! assert_eq!(*engine.state(), 5);
//! assert_eq!(counter.borrow().0, 5);
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use hexnet_track::entity::{Entity, toplevel};
use hexnet_track::tracker::stdout_tracker;
use hexnet_track::{Tracker, debug, set_time};

use crate::sim_error;
use crate::traits::{Actions, Clocked, CommitAction, DecideAction, Schedulable, Staged};
use crate::types::{SimError, SimResult, Tick};

struct Registration<S> {
    period: u64,
    action: Box<dyn Schedulable<S>>,
}

impl<S> Registration<S> {
    fn is_due(&self, now: Tick) -> bool {
        now % self.period == 0
    }
}

pub struct Engine<S> {
    top: Rc<Entity>,
    tick: Tick,
    registrations: Vec<Registration<S>>,
    state: S,
}

impl<S> Engine<S> {
    #[must_use]
    pub fn new(tracker: &Tracker, state: S) -> Self {
        Self {
            top: toplevel(tracker, "top"),
            tick: 0,
            registrations: Vec::new(),
            state,
        }
    }

    /// Create an engine that logs warnings and errors to `stdout`.
    #[must_use]
    pub fn default_with_state(state: S) -> Self {
        Self::new(&stdout_tracker(log::Level::Warn), state)
    }

    /// The top-level [`Entity`] from which all others are built.
    #[must_use]
    pub fn top(&self) -> &Rc<Entity> {
        &self.top
    }

    #[must_use]
    pub fn current_tick(&self) -> Tick {
        self.tick
    }

    #[must_use]
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Mutable access to the state between steps (for example to seed queues
    /// or reset statistics).
    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    #[must_use]
    pub fn num_registrations(&self) -> usize {
        self.registrations.len()
    }

    fn add(&mut self, period: u64, action: Box<dyn Schedulable<S>>) -> SimResult {
        if period == 0 {
            return sim_error!("registration period must be at least 1");
        }
        self.registrations.push(Registration { period, action });
        Ok(())
    }

    /// Register a [`Clocked`] component to be run every `period` ticks.
    ///
    /// The engine keeps a shared handle so the caller can still inspect (or
    /// reconfigure) the component between steps.
    pub fn register<C>(&mut self, period: u64, component: &Rc<RefCell<C>>) -> SimResult
    where
        C: Clocked<S> + 'static,
        S: 'static,
    {
        self.add(period, Box::new(Staged::new(component.clone())))
    }

    /// Register a pair of free-standing actions to be run every `period`
    /// ticks. Either may be omitted.
    pub fn register_actions(
        &mut self,
        period: u64,
        decide: Option<DecideAction<S>>,
        commit: Option<CommitAction<S>>,
    ) -> SimResult
    where
        S: 'static,
    {
        self.add(period, Box::new(Actions { decide, commit }))
    }

    /// Run one full decide/commit cycle and advance the tick.
    pub fn step(&mut self) {
        let now = self.tick;
        set_time!(self.top ; now);

        for registration in self.registrations.iter_mut().filter(|r| r.is_due(now)) {
            registration.action.decide(now, &self.state);
        }
        for registration in self.registrations.iter_mut().filter(|r| r.is_due(now)) {
            registration.action.commit(now, &mut self.state);
        }

        self.tick += 1;
    }

    /// Run `ticks` steps.
    pub fn run_for(&mut self, ticks: u64) {
        debug!(self.top ; "run {} ticks from {}", ticks, self.tick);
        for _ in 0..ticks {
            self.step();
        }
    }

    /// Run until `predicate` holds on the state, checking before every step,
    /// for at most `max_ticks` steps.
    pub fn run_until<F>(&mut self, max_ticks: u64, mut predicate: F) -> Result<Tick, SimError>
    where
        F: FnMut(&S) -> bool,
    {
        let start = self.tick;
        while !predicate(&self.state) {
            if self.tick - start >= max_ticks {
                return sim_error!(format!(
                    "condition not reached within {max_ticks} ticks"
                ));
            }
            self.step();
        }
        Ok(self.tick)
    }
}

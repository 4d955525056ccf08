// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Perform arbitration between a number of queues.
//!
//! # Queues
//!
//! This component has `N` inputs and one output:
//!  - N input queues: `inputs[i]` for `i in [0, N-1]`
//!  - One output queue: `output`
//!
//! # Function
//!
//! Each time it runs the arbiter asks its [`Arbitrate`] policy to choose one
//! of the non-empty inputs, provided the output has space. The chosen value
//! is moved from that input to the output during commit. At most one value
//! moves per period.

use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use hexnet_engine::engine::Engine;
use hexnet_engine::queue::{QueueId, Queued};
use hexnet_engine::sim_error;
use hexnet_engine::traits::Clocked;
use hexnet_engine::types::{SimError, Tick};
use hexnet_track::entity::Entity;
use hexnet_track::trace;

pub mod policy;

/// Trait required for arbitration policies to implement.
///
/// Selection happens during the decide phase so must not change the
/// policy. The policy is told about the grant during commit.
pub trait Arbitrate {
    /// Given which inputs have a value waiting, return the index of the input
    /// to grant, if any.
    fn arbitrate(&self, entity: &Rc<Entity>, requests: &[bool]) -> Option<usize>;

    /// Record that `index` was granted.
    fn granted(&mut self, index: usize);
}

pub struct Arbiter<T, P> {
    pub entity: Rc<Entity>,
    inputs: Vec<QueueId>,
    output: QueueId,
    policy: P,
    num_granted: usize,
    _value: PhantomData<T>,
}

impl<T, P> Arbiter<T, P>
where
    P: Arbitrate,
{
    pub fn new(
        parent: &Rc<Entity>,
        name: &str,
        inputs: Vec<QueueId>,
        output: QueueId,
        policy: P,
    ) -> Result<Self, SimError> {
        let entity = Rc::new(Entity::new(parent, name));
        if inputs.is_empty() {
            return sim_error!(format!("{entity}: an arbiter needs at least one input"));
        }
        Ok(Self {
            entity,
            inputs,
            output,
            policy,
            num_granted: 0,
            _value: PhantomData,
        })
    }

    /// Create an arbiter and register it with the `engine` to run every
    /// `period` ticks.
    pub fn new_and_register<S>(
        engine: &mut Engine<S>,
        period: u64,
        parent: &Rc<Entity>,
        name: &str,
        inputs: Vec<QueueId>,
        output: QueueId,
        policy: P,
    ) -> Result<Rc<RefCell<Self>>, SimError>
    where
        Self: Clocked<S> + 'static,
        S: 'static,
    {
        let arbiter = Rc::new(RefCell::new(Self::new(
            parent, name, inputs, output, policy,
        )?));
        engine.register(period, &arbiter)?;
        Ok(arbiter)
    }

    #[must_use]
    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// Total number of values moved to the output so far.
    #[must_use]
    pub fn num_granted(&self) -> usize {
        self.num_granted
    }

    #[must_use]
    pub fn policy(&self) -> &P {
        &self.policy
    }
}

impl<T, P, S> Clocked<S> for Arbiter<T, P>
where
    T: fmt::Debug,
    P: Arbitrate,
    S: Queued<T>,
{
    type Decision = Option<usize>;

    fn decide(&self, _now: Tick, state: &S) -> Option<usize> {
        let queues = state.queues();
        if queues.get(self.output).is_full() {
            return None;
        }

        let requests: Vec<bool> = self
            .inputs
            .iter()
            .map(|input| !queues.get(*input).is_empty())
            .collect();
        self.policy.arbitrate(&self.entity, &requests)
    }

    fn commit(&mut self, now: Tick, grant: Option<usize>, state: &mut S) {
        let Some(index) = grant else {
            return;
        };

        trace!(self.entity ; "{}: grant input {}", now, index);
        state.queues_mut().transfer(self.inputs[index], self.output);
        self.policy.granted(index);
        self.num_granted += 1;
    }
}

impl<T, P> fmt::Display for Arbiter<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.entity.fmt(f)
    }
}

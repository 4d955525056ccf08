// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Set of traits used by the engine and the components it drives.

use std::cell::RefCell;
use std::rc::Rc;

use crate::types::Tick;

/// A component driven through the two-phase decide/commit cycle.
///
/// `decide` sees the simulation state as committed by the previous tick and
/// returns a decision without mutating anything. `commit` receives that
/// decision by value, in the same tick, and is the only place the component
/// may change itself or the shared state.
pub trait Clocked<S> {
    /// What `decide` hands to `commit`.
    type Decision;

    fn decide(&self, now: Tick, state: &S) -> Self::Decision;

    fn commit(&mut self, now: Tick, decision: Self::Decision, state: &mut S);
}

/// Object-safe view of a registration used by the
/// [`Engine`](crate::engine::Engine).
pub trait Schedulable<S> {
    fn decide(&mut self, now: Tick, state: &S);

    fn commit(&mut self, now: Tick, state: &mut S);
}

/// Holds the decision of a [`Clocked`] component between its two phases.
pub(crate) struct Staged<C, S>
where
    C: Clocked<S>,
{
    component: Rc<RefCell<C>>,
    pending: Option<C::Decision>,
}

impl<C, S> Staged<C, S>
where
    C: Clocked<S>,
{
    pub(crate) fn new(component: Rc<RefCell<C>>) -> Self {
        Self {
            component,
            pending: None,
        }
    }
}

impl<C, S> Schedulable<S> for Staged<C, S>
where
    C: Clocked<S>,
{
    fn decide(&mut self, now: Tick, state: &S) {
        self.pending = Some(self.component.borrow().decide(now, state));
    }

    fn commit(&mut self, now: Tick, state: &mut S) {
        if let Some(decision) = self.pending.take() {
            self.component.borrow_mut().commit(now, decision, state);
        }
    }
}

pub type DecideAction<S> = Box<dyn FnMut(Tick, &S)>;
pub type CommitAction<S> = Box<dyn FnMut(Tick, &mut S)>;

/// A pair of free-standing actions registered directly with the engine.
pub(crate) struct Actions<S> {
    pub(crate) decide: Option<DecideAction<S>>,
    pub(crate) commit: Option<CommitAction<S>>,
}

impl<S> Schedulable<S> for Actions<S> {
    fn decide(&mut self, now: Tick, state: &S) {
        if let Some(decide) = self.decide.as_mut() {
            decide(now, state);
        }
    }

    fn commit(&mut self, now: Tick, state: &mut S) {
        if let Some(commit) = self.commit.as_mut() {
            commit(now, state);
        }
    }
}

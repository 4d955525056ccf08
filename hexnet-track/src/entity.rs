// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Named simulation entities.
//!
//! Every router, arbiter, link and traffic source owns an [`Entity`]. The
//! entity carries the [`Tracker`] used by the logging macros and the [`Id`]
//! those macros filter on. Names are hierarchical, for example
//! `top::system::node_1_2::router`, so a filter regex can select one chip or
//! one kind of component across the whole system.
//!
//! Creating an entity emits a creation event naming its parent and dropping
//! it emits the matching destruction event.

use std::fmt;
use std::rc::Rc;

use crate::{Id, NO_ID, Tracker};

static JOIN: &str = "::";

/// A named part of the simulation.
pub struct Entity {
    /// Unique identifier used in every event the entity emits.
    pub id: Id,

    /// [`Tracker`] used to handle trace/log events.
    pub tracker: Tracker,

    parent_id: Id,
    full_name: String,
}

impl Entity {
    /// Create the entity `name` within `parent`.
    #[must_use]
    pub fn new(parent: &Entity, name: &str) -> Self {
        let full_name = format!("{}{JOIN}{name}", parent.full_name);
        Self::register(&parent.tracker, parent.id, full_name)
    }

    fn register(tracker: &Tracker, parent_id: Id, full_name: String) -> Self {
        let id = tracker.unique_id();
        tracker.add_entity(id, &full_name);
        if tracker.is_entity_enabled(id, log::Level::Trace) {
            tracker.create(parent_id, id, 0, 0, &full_name);
        }
        Self {
            id,
            tracker: tracker.clone(),
            parent_id,
            full_name,
        }
    }

    /// The last component of the hierarchical name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self.full_name.rsplit_once(JOIN) {
            Some((_, name)) => name,
            None => &self.full_name,
        }
    }

    /// The hierarchical name, starting from the top level.
    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// The [`Id`] of the enclosing entity, [`NO_ID`] for the top level.
    #[must_use]
    pub fn parent_id(&self) -> Id {
        self.parent_id
    }
}

impl Drop for Entity {
    fn drop(&mut self) {
        if self.tracker.is_entity_enabled(self.id, log::Level::Trace) {
            self.tracker.destroy(self.parent_id, self.id);
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.full_name, self.id)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name)
    }
}

/// Create the top-level entity that every other entity descends from.
pub fn toplevel(tracker: &Tracker, name: &str) -> Rc<Entity> {
    Rc::new(Entity::register(tracker, NO_ID, name.to_string()))
}

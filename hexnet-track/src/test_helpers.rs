// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! This module provides helper functions for testing tracking output
//!
//! The aim of this module is to provide commonly-used functions that enable the
//! testing of the output that should appear from tracking macros.

use std::cell::{Cell, RefCell};

use regex::Regex;

use crate::{Id, Track};

/// A tracker that keeps track events in memory.
pub struct TestTracker {
    events: RefCell<Vec<String>>,
    unique_id: Cell<u64>,
    level: log::Level,
}

impl TestTracker {
    /// Create a new [`Tracker`](crate::Tracker) for the tests that records
    /// everything.
    #[must_use]
    pub fn new(initial_id: u64) -> Self {
        Self::with_level(initial_id, log::Level::Trace)
    }

    /// Create a new [`Tracker`](crate::Tracker) for the tests that only
    /// records events at or above `level`.
    #[must_use]
    pub fn with_level(initial_id: u64, level: log::Level) -> Self {
        Self {
            events: RefCell::new(Vec::new()),
            unique_id: Cell::new(initial_id),
            level,
        }
    }

    fn add_event(&self, event: String) {
        println!("{event}");
        self.events.borrow_mut().push(event);
    }

    /// Return a copy of all the events seen since the last clear.
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }
}

impl Track for TestTracker {
    fn unique_id(&self) -> Id {
        let id = self.unique_id.get();
        self.unique_id.set(id + 1);
        Id(id)
    }

    fn is_entity_enabled(&self, _id: Id, level: log::Level) -> bool {
        level <= self.level
    }

    fn add_entity(&self, _id: Id, _entity_name: &str) {
        // Do nothing
    }

    fn enter(&self, id: Id, item: Id) {
        self.add_event(format!("{id}: {item} entered"));
    }

    fn exit(&self, id: Id, item: Id) {
        self.add_event(format!("{id}: {item} exited"));
    }

    fn create(&self, created_by: Id, id: Id, num_bytes: usize, req_type: i8, name: &str) {
        self.add_event(format!(
            "{created_by}: created {id}, {name}, {req_type}, {num_bytes} bytes"
        ));
    }

    fn destroy(&self, destroyed_by: Id, id: Id) {
        self.add_event(format!("{destroyed_by}: destroyed {id}"));
    }

    fn log(&self, id: Id, level: log::Level, msg: std::fmt::Arguments) {
        self.add_event(format!("{id}:{level}: {msg}"));
    }

    fn time(&self, set_by: Id, tick: u64) {
        self.add_event(format!("{set_by}: set tick {tick}"));
    }

    fn shutdown(&self) {
        // Do nothing
    }
}

/// Initialise a [`TestTracker`] for a test.
///
/// Returns both the concrete [`TestTracker`] (for checking events) and the
/// same object as a [`Tracker`](crate::Tracker).
///
/// # Examples
///
/// ```
/// use hexnet_track::test_helpers;
///
/// let (test_tracker, tracker) = hexnet_track::test_init!(10);
/// let _top = hexnet_track::entity::toplevel(&tracker, "top");
/// test_helpers::check_and_clear(&test_tracker, &["0: created 10, top, 0, 0 bytes"]);
/// ```
#[macro_export]
macro_rules! test_init {
    ($start_id:expr) => {{
        let test_tracker = std::rc::Rc::new($crate::test_helpers::TestTracker::new($start_id));
        let tracker: $crate::Tracker = test_tracker.clone();
        (test_tracker, tracker)
    }};
}

/// Check and clear the _trace_ and _log_ output
///
/// This function asserts that the events seen since the start or the last
/// time this function was called match the `expected` regular expressions,
/// in order. It then clears the events recorded so far.
pub fn check_and_clear(tracker: &TestTracker, expected: &[&str]) {
    let mut events = tracker.events.borrow_mut();

    println!("Checking {:?} matches {:?}", expected, *events);
    assert_eq!(expected.len(), events.len());

    for (i, (log_expect, actual)) in expected.iter().zip(events.iter()).enumerate() {
        let re = Regex::new(log_expect).unwrap();
        println!("Checking {i}: {log_expect:?} matches {actual:?}");
        assert!(re.is_match(actual));
    }

    events.clear();
}

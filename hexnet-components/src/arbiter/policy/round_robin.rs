// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Round Robin policy

use std::rc::Rc;

use hexnet_track::entity::Entity;
use hexnet_track::trace;

use crate::arbiter::Arbitrate;

/// Grant the first requesting input after the one last granted.
///
/// No requesting input can be passed over by more than `N-1` consecutive
/// grants.
#[derive(Default)]
pub struct RoundRobin {
    last_granted: Option<usize>,
}

impl RoundRobin {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The input that was granted most recently.
    #[must_use]
    pub fn last_granted(&self) -> Option<usize> {
        self.last_granted
    }
}

impl Arbitrate for RoundRobin {
    fn arbitrate(&self, entity: &Rc<Entity>, requests: &[bool]) -> Option<usize> {
        let num_inputs = requests.len();
        let start = match self.last_granted {
            Some(last) => (last + 1) % num_inputs,
            None => 0,
        };

        let selected = (0..num_inputs)
            .map(|i| (start + i) % num_inputs)
            .find(|index| requests[*index]);

        trace!(entity ; "rr: start {} selected {:?}", start, selected);
        selected
    }

    fn granted(&mut self, index: usize) {
        self.last_granted = Some(index);
    }
}

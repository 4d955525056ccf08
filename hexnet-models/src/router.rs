// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Congestion-aware router of a single chip.
//!
//! # Queues
//!
//!  - One input queue: `input`
//!  - Seven output queues: `outputs[d]` for each [`Direction`] `d` (six
//!    neighbours plus [`Direction::Local`])
//!
//! # Function
//!
//! Only the packet at the head of the input is considered. Its output is
//! chosen from its pre-computed route:
//!
//!  - At its destination it leaves by `Local`.
//!  - At its inflection point it turns to the inflection direction.
//!  - On the second leg of a detour it turns one step clockwise, back onto
//!    its original heading.
//!  - Otherwise it carries straight on.
//!
//! While the chosen output is full the packet waits and the router counts
//! the cycles it has waited. Once `first_timeout` is reached with emergency
//! routing enabled the packet is sent round the blocked link instead: one
//! direction clockwise (the first leg) and then, from the next router, back
//! across to rejoin the route (the second leg). A packet that cannot make
//! progress is dropped:
//!
//!  - immediately at `first_timeout` when emergency routing is disabled,
//!  - after `first_timeout` when it cannot even start its second leg,
//!  - after `first_timeout + final_timeout` in every other case.
//!
//! Dropped packets are handed to the [`RouterObserver`] and then released
//! from the packet arena.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use hexnet_engine::engine::Engine;
use hexnet_engine::queue::{QueueId, Queued};
use hexnet_engine::traits::Clocked;
use hexnet_engine::types::{SimError, Tick};
use hexnet_track::entity::Entity;
use hexnet_track::{Identified, destroy, exit, trace};

use crate::packet::{EmergencyState, Packet, PacketId, PacketStore};
use crate::topology::{Coord, Direction, NUM_SLOTS};

/// Hooks called by a [`Router`] as it commits.
///
/// Both are called with the packet as it leaves the router and must not
/// drive the engine.
pub trait RouterObserver<S> {
    fn on_forward(&mut self, _position: Coord, _packet: &Packet, _now: Tick, _state: &mut S) {}

    fn on_drop(&mut self, _position: Coord, _packet: &Packet, _now: Tick, _state: &mut S) {}
}

impl<S> RouterObserver<S> for () {}

/// Emergency routing settings of a router.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmergencyRouting {
    pub enabled: bool,

    /// Cycles a packet may wait before it is detoured (or dropped).
    pub first_timeout: u64,

    /// Further cycles a packet may wait before it is dropped.
    pub final_timeout: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Forward,
    Drop,
    Stall,
}

/// What a router will do with the head of its input in the next commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Route {
    pub direction: Direction,
    pub emergency_state: EmergencyState,
    pub verdict: Verdict,
}

pub struct Router<O> {
    pub entity: Rc<Entity>,
    position: Coord,
    input: QueueId,
    outputs: [QueueId; NUM_SLOTS],
    emergency: EmergencyRouting,
    time_elapsed: u64,
    observer: O,
    num_forwarded: u64,
    num_dropped: u64,
}

impl<O> Router<O> {
    #[must_use]
    pub fn new(
        parent: &Rc<Entity>,
        name: &str,
        position: Coord,
        input: QueueId,
        outputs: [QueueId; NUM_SLOTS],
        emergency: EmergencyRouting,
        observer: O,
    ) -> Self {
        Self {
            entity: Rc::new(Entity::new(parent, name)),
            position,
            input,
            outputs,
            emergency,
            time_elapsed: 0,
            observer,
            num_forwarded: 0,
            num_dropped: 0,
        }
    }

    /// Create a router and register it with the `engine` to run every
    /// `period` ticks.
    #[expect(clippy::too_many_arguments)]
    pub fn new_and_register<S>(
        engine: &mut Engine<S>,
        period: u64,
        parent: &Rc<Entity>,
        name: &str,
        position: Coord,
        input: QueueId,
        outputs: [QueueId; NUM_SLOTS],
        emergency: EmergencyRouting,
        observer: O,
    ) -> Result<Rc<RefCell<Self>>, SimError>
    where
        Self: Clocked<S> + 'static,
        S: 'static,
    {
        let router = Rc::new(RefCell::new(Self::new(
            parent, name, position, input, outputs, emergency, observer,
        )));
        engine.register(period, &router)?;
        Ok(router)
    }

    #[must_use]
    pub fn position(&self) -> Coord {
        self.position
    }

    /// Cycles the current head-of-line packet has waited.
    #[must_use]
    pub fn time_elapsed(&self) -> u64 {
        self.time_elapsed
    }

    #[must_use]
    pub fn num_forwarded(&self) -> u64 {
        self.num_forwarded
    }

    #[must_use]
    pub fn num_dropped(&self) -> u64 {
        self.num_dropped
    }

    #[must_use]
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// The output the packet would take if it were routed normally.
    fn normal_direction(&self, packet: &Packet) -> Direction {
        if self.position == packet.destination {
            Direction::Local
        } else if self.position == packet.inflection {
            packet.inflection_direction
        } else if packet.emergency_state == EmergencyState::SecondLeg {
            packet.direction.rotate_cw()
        } else {
            packet.direction
        }
    }

    /// The output and emergency state the packet leaves with if forwarded.
    fn select_output(&self, packet: &Packet) -> (Direction, EmergencyState) {
        let candidate = self.normal_direction(packet);
        if candidate == Direction::Local {
            return (Direction::Local, EmergencyState::Normal);
        }

        match packet.emergency_state {
            EmergencyState::Normal | EmergencyState::SecondLeg => {
                if self.emergency.enabled && self.time_elapsed >= self.emergency.first_timeout {
                    (candidate.rotate_cw(), EmergencyState::FirstLeg)
                } else {
                    (candidate, EmergencyState::Normal)
                }
            }
            EmergencyState::FirstLeg => (
                packet.direction.opposite().rotate_cw(),
                EmergencyState::SecondLeg,
            ),
        }
    }

    fn has_timed_out(&self, packet: &Packet) -> bool {
        let first = self.emergency.first_timeout;
        let on_first_leg = packet.emergency_state == EmergencyState::FirstLeg;

        (!self.emergency.enabled && !on_first_leg && self.time_elapsed >= first)
            || (on_first_leg && self.time_elapsed > first)
            || self.time_elapsed >= first + self.emergency.final_timeout
    }
}

impl<O, S> Clocked<S> for Router<O>
where
    O: RouterObserver<S>,
    S: Queued<PacketId> + PacketStore,
{
    type Decision = Option<Route>;

    fn decide(&self, _now: Tick, state: &S) -> Option<Route> {
        let queues = state.queues();
        let input = queues.get(self.input);
        if input.is_empty() {
            return None;
        }

        let packet = state.packets().get(*input.peek());
        let (direction, emergency_state) = self.select_output(packet);

        let verdict = if !queues.get(self.outputs[direction.index()]).is_full() {
            Verdict::Forward
        } else if self.has_timed_out(packet) {
            Verdict::Drop
        } else {
            Verdict::Stall
        };

        Some(Route {
            direction,
            emergency_state,
            verdict,
        })
    }

    fn commit(&mut self, now: Tick, route: Option<Route>, state: &mut S) {
        let Some(route) = route else {
            return;
        };

        if route.verdict == Verdict::Stall {
            self.time_elapsed += 1;
            return;
        }

        let id = state.queues_mut().get_mut(self.input).pop();
        self.time_elapsed = 0;

        if route.verdict == Verdict::Forward {
            let packet = {
                let packet = state.packets_mut().get_mut(id);
                packet.direction = route.direction;
                packet.emergency_state = route.emergency_state;
                if route.direction != Direction::Local {
                    packet.num_hops += 1;
                    if route.emergency_state != EmergencyState::Normal {
                        packet.num_emergency_hops += 1;
                    }
                }
                *packet
            };

            trace!(self.entity ; "{}: {} -> {} ({})",
                now, packet, route.direction, route.emergency_state);
            state
                .queues_mut()
                .get_mut(self.outputs[route.direction.index()])
                .push(id);
            exit!(self.entity ; packet.id());
            self.num_forwarded += 1;
            self.observer.on_forward(self.position, &packet, now, state);
        } else {
            let packet = *state.packets().get(id);
            trace!(self.entity ; "{}: drop {}", now, packet);
            self.num_dropped += 1;
            self.observer.on_drop(self.position, &packet, now, state);
            state.packets_mut().remove(id);
            destroy!(self.entity ; packet.id());
        }
    }
}

impl<O> fmt::Display for Router<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.entity.fmt(f)
    }
}

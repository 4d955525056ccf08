// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use std::cell::RefCell;
use std::rc::Rc;

use hexnet_engine::engine::Engine;
use hexnet_engine::queue::{QueueId, Queued};
use hexnet_engine::test_helpers::start_test;
use hexnet_engine::types::Tick;
use hexnet_models::network::Network;
use hexnet_models::packet::{EmergencyState, Packet, PacketId, PacketStore};
use hexnet_models::router::{EmergencyRouting, Router, RouterObserver};
use hexnet_models::topology::{Coord, Direction, NUM_SLOTS};
use hexnet_track::Id;

const SIZE: Coord = Coord::new(5, 5);
const HERE: Coord = Coord::new(2, 2);
const FIRST_TIMEOUT: u64 = 3;
const FINAL_TIMEOUT: u64 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Event {
    Forward(Direction, EmergencyState),
    Drop,
}

#[derive(Clone, Default)]
struct Recorder {
    events: Rc<RefCell<Vec<Event>>>,
}

impl RouterObserver<Network> for Recorder {
    fn on_forward(&mut self, position: Coord, packet: &Packet, _now: Tick, _state: &mut Network) {
        assert_eq!(position, HERE);
        self.events
            .borrow_mut()
            .push(Event::Forward(packet.direction, packet.emergency_state));
    }

    fn on_drop(&mut self, position: Coord, packet: &Packet, _now: Tick, state: &mut Network) {
        assert_eq!(position, HERE);
        // The packet is still held while the observer runs
        assert!(state.packets().iter().any(|p| p == packet));
        self.events.borrow_mut().push(Event::Drop);
    }
}

struct Harness {
    engine: Engine<Network>,
    input: QueueId,
    outputs: [QueueId; NUM_SLOTS],
    router: Rc<RefCell<Router<Recorder>>>,
    events: Rc<RefCell<Vec<Event>>>,
}

fn build(file: &str, enabled: bool) -> Harness {
    let mut engine = start_test(file, Network::new(SIZE, false, false));
    let queues = engine.state_mut().queues_mut();
    let input = queues.create("input", 4);
    let outputs: [QueueId; NUM_SLOTS] =
        std::array::from_fn(|i| queues.create(&format!("out{i}"), 1));

    let recorder = Recorder::default();
    let events = recorder.events.clone();
    let top = engine.top().clone();
    let router = Router::new_and_register(
        &mut engine,
        1,
        &top,
        "router",
        HERE,
        input,
        outputs,
        EmergencyRouting {
            enabled,
            first_timeout: FIRST_TIMEOUT,
            final_timeout: FINAL_TIMEOUT,
        },
        recorder,
    )
    .unwrap();

    Harness {
        engine,
        input,
        outputs,
        router,
        events,
    }
}

/// A packet travelling `direction` that is neither at its inflection point
/// nor at its destination.
fn travelling(direction: Direction, state: EmergencyState) -> Packet {
    let mut p = Packet::dimension_order(Id(10), Coord::new(0, 0), Coord::new(4, 0), SIZE, 0);
    p.inflection = Coord::new(0, 4);
    p.inflection_direction = Direction::North;
    p.direction = direction;
    p.emergency_state = state;
    p
}

impl Harness {
    fn inject(&mut self, packet: Packet) -> PacketId {
        let id = self.engine.state_mut().packets_mut().insert(packet);
        self.engine
            .state_mut()
            .queues_mut()
            .get_mut(self.input)
            .push(id);
        id
    }

    fn block(&mut self, direction: Direction) {
        let filler = travelling(Direction::East, EmergencyState::Normal);
        let id = self.engine.state_mut().packets_mut().insert(filler);
        let queue = self.outputs[direction.index()];
        self.engine.state_mut().queues_mut().get_mut(queue).push(id);
    }

    fn head_of(&self, direction: Direction) -> Option<Packet> {
        let queue = self.engine.state().queues().get(self.outputs[direction.index()]);
        if queue.is_empty() {
            None
        } else {
            Some(*self.engine.state().packets().get(*queue.peek()))
        }
    }

    fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }
}

#[test]
fn idle() {
    let mut h = build(file!(), true);
    h.engine.run_for(20);
    assert!(h.events().is_empty());
    assert_eq!(h.router.borrow().time_elapsed(), 0);
    assert_eq!(h.engine.state().queues().occupancy(), 0);
}

#[test]
fn forwards_straight_on() {
    let mut h = build(file!(), true);
    h.inject(travelling(Direction::East, EmergencyState::Normal));
    h.engine.step();

    let p = h.head_of(Direction::East).unwrap();
    assert_eq!(p.num_hops, 1);
    assert_eq!(p.num_emergency_hops, 0);
    assert_eq!(
        h.events(),
        vec![Event::Forward(Direction::East, EmergencyState::Normal)]
    );
    assert!(h.engine.state().queues().get(h.input).is_empty());
}

#[test]
fn forwards_several_in_order() {
    let mut h = build(file!(), true);
    for d in [Direction::East, Direction::North, Direction::SouthWest] {
        h.inject(travelling(d, EmergencyState::Normal));
    }
    h.engine.run_for(3);
    assert_eq!(
        h.events(),
        vec![
            Event::Forward(Direction::East, EmergencyState::Normal),
            Event::Forward(Direction::North, EmergencyState::Normal),
            Event::Forward(Direction::SouthWest, EmergencyState::Normal),
        ]
    );
}

#[test]
fn turns_at_inflection() {
    let mut h = build(file!(), true);
    let mut p = travelling(Direction::East, EmergencyState::Normal);
    p.inflection = HERE;
    p.inflection_direction = Direction::NorthEast;
    h.inject(p);
    h.engine.step();
    assert!(h.head_of(Direction::NorthEast).is_some());
}

#[test]
fn arrival_is_local_in_any_state() {
    for state in [
        EmergencyState::Normal,
        EmergencyState::FirstLeg,
        EmergencyState::SecondLeg,
    ] {
        let mut h = build(file!(), true);
        let mut p = travelling(Direction::East, state);
        p.destination = HERE;
        h.inject(p);
        h.engine.step();

        let arrived = h.head_of(Direction::Local).unwrap();
        assert_eq!(arrived.emergency_state, EmergencyState::Normal);
        assert_eq!(arrived.direction, Direction::Local);
        assert_eq!(arrived.num_hops, 0);
    }
}

#[test]
fn arrival_is_never_detoured() {
    let mut h = build(file!(), true);
    h.block(Direction::Local);
    let mut p = travelling(Direction::East, EmergencyState::Normal);
    p.destination = HERE;
    h.inject(p);

    // Waits for the full timeout then drops rather than leaving the chip
    h.engine.run_for(FIRST_TIMEOUT + FINAL_TIMEOUT);
    assert!(h.events().is_empty());
    h.engine.step();
    assert_eq!(h.events(), vec![Event::Drop]);
}

#[test]
fn drop_without_emergency_routing() {
    let mut h = build(file!(), false);
    h.block(Direction::East);
    let id = h.inject(travelling(Direction::East, EmergencyState::Normal));

    h.engine.run_for(FIRST_TIMEOUT);
    assert!(h.events().is_empty());
    assert_eq!(h.router.borrow().time_elapsed(), FIRST_TIMEOUT);

    h.engine.step();
    assert_eq!(h.events(), vec![Event::Drop]);
    assert!(!h.engine.state().packets().contains(id));
    assert_eq!(h.router.borrow().time_elapsed(), 0);
    assert_eq!(h.router.borrow().num_dropped(), 1);
}

#[test]
fn emergency_first_leg() {
    let mut h = build(file!(), true);
    h.block(Direction::East);
    h.inject(travelling(Direction::East, EmergencyState::Normal));

    h.engine.run_for(FIRST_TIMEOUT);
    assert!(h.events().is_empty());

    h.engine.step();
    assert_eq!(
        h.events(),
        vec![Event::Forward(Direction::South, EmergencyState::FirstLeg)]
    );
    let p = h.head_of(Direction::South).unwrap();
    assert_eq!(p.num_emergency_hops, 1);
    assert_eq!(h.router.borrow().time_elapsed(), 0);
}

#[test]
fn emergency_drop_after_final_timeout() {
    let mut h = build(file!(), true);
    h.block(Direction::East);
    h.block(Direction::South);
    h.inject(travelling(Direction::East, EmergencyState::Normal));

    h.engine.run_for(FIRST_TIMEOUT + FINAL_TIMEOUT);
    assert!(h.events().is_empty());
    h.engine.step();
    assert_eq!(h.events(), vec![Event::Drop]);
}

#[test]
fn second_leg_after_first() {
    let mut h = build(file!(), true);
    // Arrived here going south on the first leg of a detour round an east link
    h.inject(travelling(Direction::South, EmergencyState::FirstLeg));
    h.engine.step();
    assert_eq!(
        h.events(),
        vec![Event::Forward(Direction::NorthEast, EmergencyState::SecondLeg)]
    );
}

#[test]
fn blocked_arrival_on_first_leg_dropped_after_first_timeout() {
    // Arrival ends the detour but the first leg drop rule still applies
    let mut h = build(file!(), true);
    h.block(Direction::Local);
    let mut packet = travelling(Direction::South, EmergencyState::FirstLeg);
    packet.destination = HERE;
    h.inject(packet);

    h.engine.run_for(FIRST_TIMEOUT + 1);
    assert!(h.events().is_empty());
    assert_eq!(h.router.borrow().time_elapsed(), FIRST_TIMEOUT + 1);
    h.engine.step();
    assert_eq!(h.events(), vec![Event::Drop]);
    assert_eq!(h.router.borrow().time_elapsed(), 0);
}

#[test]
fn blocked_second_leg_dropped_after_first_timeout() {
    let mut h = build(file!(), true);
    h.block(Direction::NorthEast);
    h.inject(travelling(Direction::South, EmergencyState::FirstLeg));

    h.engine.run_for(FIRST_TIMEOUT + 1);
    assert!(h.events().is_empty());
    h.engine.step();
    assert_eq!(h.events(), vec![Event::Drop]);
}

#[test]
fn second_leg_rejoins_route() {
    let mut h = build(file!(), true);
    h.inject(travelling(Direction::NorthEast, EmergencyState::SecondLeg));
    h.engine.step();
    assert_eq!(
        h.events(),
        vec![Event::Forward(Direction::East, EmergencyState::Normal)]
    );
}

#[test]
fn second_leg_can_detour_again() {
    let mut h = build(file!(), true);
    h.block(Direction::East);
    h.inject(travelling(Direction::NorthEast, EmergencyState::SecondLeg));
    h.engine.run_for(FIRST_TIMEOUT + 1);
    assert_eq!(
        h.events(),
        vec![Event::Forward(Direction::South, EmergencyState::FirstLeg)]
    );
}

#[test]
fn elapsed_resets_after_forward() {
    let mut h = build(file!(), false);
    h.block(Direction::East);
    h.inject(travelling(Direction::East, EmergencyState::Normal));
    h.inject(travelling(Direction::East, EmergencyState::Normal));

    h.engine.run_for(2);
    assert_eq!(h.router.borrow().time_elapsed(), 2);

    // Free the output so the first packet goes
    let east = h.outputs[Direction::East.index()];
    let filler = h.engine.state_mut().queues_mut().get_mut(east).pop();
    h.engine.state_mut().packets_mut().remove(filler);
    h.engine.step();
    assert_eq!(h.router.borrow().time_elapsed(), 0);
    assert_eq!(h.router.borrow().num_forwarded(), 1);

    // The second packet starts waiting from zero and is not dropped early
    h.engine.run_for(FIRST_TIMEOUT);
    assert_eq!(h.router.borrow().time_elapsed(), FIRST_TIMEOUT);
    assert_eq!(h.router.borrow().num_dropped(), 0);
    h.engine.step();
    assert_eq!(h.router.borrow().num_dropped(), 1);
}

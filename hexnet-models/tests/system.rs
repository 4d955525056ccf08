// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use hexnet_engine::engine::Engine;
use hexnet_engine::queue::Queued;
use hexnet_engine::test_helpers::create_tracker;
use hexnet_models::config::{SystemConfig, SystemSizeConfig, TemporalKind};
use hexnet_models::network::Network;
use hexnet_models::packet::{Packet, PacketStore};
use hexnet_models::stats::StatsStore;
use hexnet_models::system::System;
use hexnet_models::topology::{COMPASS, Coord, Direction, neighbour};
use hexnet_track::{Id, test_init};

fn config(width: u32, height: u32) -> SystemConfig {
    let mut config = SystemConfig::default();
    config.system_size = SystemSizeConfig { width, height };
    config.seed = 42;
    config
}

/// A system in which the generators never send.
fn quiet(width: u32, height: u32) -> SystemConfig {
    let mut config = config(width, height);
    config.packet_generator.temporal.bernoulli_prob = 0.0;
    config
}

fn build(file: &str, config: &SystemConfig) -> (Engine<Network>, System) {
    System::create(&create_tracker(file), config).unwrap()
}

fn check_conservation(engine: &Engine<Network>) {
    let totals = engine.state().stats().totals();
    assert_eq!(
        totals.accepted,
        totals.arrived + totals.dropped + engine.state().num_in_flight() as u64,
        "{totals:?}"
    );
}

#[test]
fn registrations() {
    let (engine, system) = build(file!(), &config(4, 4));
    assert_eq!(system.nodes().len(), 16);
    assert_eq!(system.links().len(), 16 * 6);
    // Six arbiters, a router, a generator, the consumer delay and the
    // consumer for every node plus one delay per link
    assert_eq!(engine.num_registrations(), 16 * 10 + 16 * 6);
}

#[test]
fn invalid_config_rejected() {
    let mut config = config(4, 4);
    config.router.period = 0;
    assert!(System::create(&create_tracker(file!()), &config).is_err());
}

#[test]
fn packet_crosses_system() {
    let (mut engine, system) = build(file!(), &quiet(4, 4));
    let source = Coord::new(0, 0);
    let destination = Coord::new(2, 0);

    let packet = Packet::dimension_order(Id(1), source, destination, system.size(), 0);
    assert_eq!(packet.direction, Direction::East);
    let state = engine.state_mut();
    let id = state.packets_mut().insert(packet);
    state
        .queues_mut()
        .get_mut(system.node(source).router_input())
        .push(id);

    engine
        .run_until(100, |state| state.stats().totals().arrived == 1)
        .unwrap();

    let totals = engine.state().stats().totals();
    assert_eq!(totals.dropped, 0);
    assert_eq!(
        engine.state().stats().node_counters(destination.index(system.size())).arrived,
        1
    );
    assert_eq!(engine.state().num_in_flight(), 0);
    assert_eq!(system.node(Coord::new(1, 0)).router().borrow().num_forwarded(), 1);
}

#[test]
fn crossing_packet_is_tracked() {
    let (test_tracker, tracker) = test_init!(1000);
    let (mut engine, system) = System::create(&tracker, &quiet(4, 4)).unwrap();
    let source = Coord::new(0, 0);
    let destination = Coord::new(2, 0);

    let packet = Packet::dimension_order(Id(1), source, destination, system.size(), 0);
    let state = engine.state_mut();
    let id = state.packets_mut().insert(packet);
    state
        .queues_mut()
        .get_mut(system.node(source).router_input())
        .push(id);

    engine
        .run_until(100, |state| state.stats().totals().arrived == 1)
        .unwrap();

    let events = test_tracker.events();
    let exited = |position: Coord| {
        let router = system.node(position).router().borrow().entity.id;
        format!("{router}: 1 exited")
    };
    for position in [source, Coord::new(1, 0), destination] {
        let expected = exited(position);
        assert!(events.contains(&expected), "missing {expected:?}");
    }
    let consumer = system.node(destination).consumer().borrow().entity.id;
    assert!(events.contains(&format!("{consumer}: 1 entered")));
    assert!(events.contains(&format!("{consumer}: destroyed 1")));
}

#[test]
fn links_join_neighbours() {
    let (mut engine, system) = build(file!(), &quiet(3, 3));
    let size = system.size();

    // A packet placed on each output of the centre chip must turn up on the
    // matching input of the neighbour
    let centre = system.node(Coord::new(1, 1));
    for d in COMPASS {
        let packet = Packet::dimension_order(Id(1), Coord::new(1, 1), Coord::new(1, 1), size, 0);
        let state = engine.state_mut();
        let id = state.packets_mut().insert(packet);
        state.queues_mut().get_mut(centre.output(d)).push(id);
    }
    engine.step();

    for d in COMPASS {
        let far = system.node(neighbour(Coord::new(1, 1), d, size));
        let queues = engine.state().queues();
        assert!(queues.get(centre.output(d)).is_empty(), "{d}");
        assert_eq!(queues.get(far.input(d.opposite())).len(), 1, "{d}");
    }
    assert_eq!(engine.state().num_in_flight(), 6);
}

#[test]
fn conserves_packets() {
    let (mut engine, _system) = build(file!(), &config(4, 4));
    for _ in 0..20 {
        engine.run_for(100);
        check_conservation(&engine);
    }
    let totals = engine.state().stats().totals();
    assert!(totals.accepted > 0);
    assert!(totals.arrived > 0);
}

#[test]
fn same_seed_same_results() {
    let run = |seed| {
        let mut config = config(4, 4);
        config.seed = seed;
        config.packet_generator.temporal.bernoulli_prob = 0.3;
        let (mut engine, _system) = build(file!(), &config);
        engine.run_for(500);
        engine.state().stats().totals()
    };
    assert_eq!(run(7), run(7));
}

#[test]
fn blocked_consumers_drop() {
    let mut config = config(3, 3);
    config.packet_generator.temporal.bernoulli_prob = 1.0;
    config.packet_consumer.temporal.bernoulli_prob = 0.0;
    config.router.first_timeout = 4;
    config.router.final_timeout = 4;
    let (mut engine, _system) = build(file!(), &config);

    engine.run_for(500);
    let totals = engine.state().stats().totals();
    assert_eq!(totals.arrived, 0);
    assert!(totals.dropped > 0);
    check_conservation(&engine);
}

#[test]
fn sampling_resets_counters() {
    let (mut engine, _system) = build(file!(), &config(4, 4));
    engine.run_for(200);
    assert!(engine.state().stats().totals().offered > 0);

    let now = engine.current_tick();
    engine.state_mut().stats_mut().start_sample(now);
    assert_eq!(engine.state().stats().totals().offered, 0);
    engine.run_for(200);
    engine.state_mut().stats_mut().stop_sample();

    let stats = engine.state().stats();
    assert!(stats.totals().arrived > 0);
    assert!(stats.mean_latency().is_some());
    assert!(stats.mean_hops().unwrap() <= 4.0);
}

#[test]
fn update_reconfigures() {
    let mut config = quiet(3, 3);
    let (mut engine, mut system) = build(file!(), &config);

    config.node_to_node_links.packet_delay = 3;
    config.packet_consumer.delay = 2;
    config.packet_generator.temporal.dist = TemporalKind::Periodic;
    config.packet_generator.temporal.periodic_interval = 5;
    system.update(&config).unwrap();

    assert!(system.links().iter().all(|l| l.borrow().depth() == 3));
    for node in system.nodes() {
        assert_eq!(node.consumer_delay().borrow().depth(), 2);
    }
    assert_eq!(system.config(), &config);

    engine.run_for(10);
    assert_eq!(engine.state().stats().totals().offered, 9 * 2);

    config.packet_consumer.temporal.bernoulli_prob = 2.0;
    assert!(system.update(&config).is_err());
}

// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! A single chip of the system.
//!
//! # Queues
//!
//!  - Six input queues: `input(d)` fed by the link from the neighbour in
//!    direction `d`
//!  - Six output queues: `output(d)` drained by the link to the neighbour in
//!    direction `d`
//!
//! # Structure
//!
//! The six inputs and the local generator are merged by a tree of round-robin
//! arbiters into the single router input. The router either sends a packet
//! on to an output queue or, when it has arrived, through the consumer delay
//! to the consumer:
//!
//! ```txt
//!       |\
//!    E--| |--,
//!   NE--| |  |   |\
//!       |/   '---| |--,
//!       |\   ,---| |  |
//!    N--| |--'   |/   |   |\
//!    W--| |           '---| |                +--------+--> output(E..S)
//!       |/                | |--> router_in --| router |
//!       |\           |\   | |                +--------+--> delay --> consumer
//!   SW--| |--,   ,---| |--'
//!    S--| |  '---| |
//!       |/   ,---| |
//!            |   |/
//!  generator-'
//!
//!     `--v--'    `--v--'   `--v--'
//!      lvl2       lvl1      root
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use hexnet_components::arbiter::Arbiter;
use hexnet_components::arbiter::policy::RoundRobin;
use hexnet_components::delay::Delay;
use hexnet_engine::engine::Engine;
use hexnet_engine::queue::{QueueId, Queued};
use hexnet_engine::types::SimError;
use hexnet_track::entity::Entity;
use hexnet_track::debug;

use crate::config::SystemConfig;
use crate::network::Network;
use crate::packet::PacketId;
use crate::router::Router;
use crate::stats::StatsObserver;
use crate::topology::{COMPASS, Coord, Direction, NUM_SLOTS};
use crate::traffic::{PacketConsumer, PacketGenerator};

pub type NodeArbiter = Arbiter<PacketId, RoundRobin>;
pub type NodeRouter = Router<StatsObserver>;

pub struct Node {
    pub entity: Rc<Entity>,
    position: Coord,
    inputs: [QueueId; 6],
    outputs: [QueueId; 6],
    router_input: QueueId,
    consumer_input: QueueId,
    arbiters: Vec<Rc<RefCell<NodeArbiter>>>,
    router: Rc<RefCell<NodeRouter>>,
    generator: Rc<RefCell<PacketGenerator>>,
    consumer_delay: Rc<RefCell<Delay<PacketId>>>,
    consumer: Rc<RefCell<PacketConsumer>>,
}

/// Create a queue named after its owner.
fn create_queue(
    engine: &mut Engine<Network>,
    owner: &Rc<Entity>,
    name: &str,
    capacity: usize,
) -> QueueId {
    engine
        .state_mut()
        .queues_mut()
        .create(&format!("{owner}::{name}"), capacity)
}

impl Node {
    /// Create all the queues and components of the chip at `position` and
    /// register them with the `engine`.
    pub fn new_and_register(
        engine: &mut Engine<Network>,
        parent: &Rc<Entity>,
        position: Coord,
        config: &SystemConfig,
    ) -> Result<Self, SimError> {
        let entity = Rc::new(Entity::new(
            parent,
            &format!("node_{}_{}", position.x, position.y),
        ));
        let system_size = config.system_size.size();
        let index = position.index(system_size);

        let links = &config.node_to_node_links;
        let inputs = COMPASS.map(|d| {
            create_queue(engine, &entity, &format!("in_{d}"), links.input_buffer_length)
        });
        let outputs = COMPASS.map(|d| {
            create_queue(engine, &entity, &format!("out_{d}"), links.output_buffer_length)
        });

        let generator_cfg = &config.packet_generator;
        let consumer_cfg = &config.packet_consumer;
        let generator_queue = create_queue(engine, &entity, "gen", generator_cfg.buffer_length);
        let consumer_input = create_queue(
            engine,
            &entity,
            "con_pre_delay",
            consumer_cfg.pre_delay_buffer_length,
        );
        let consumer_queue = create_queue(
            engine,
            &entity,
            "con_post_delay",
            consumer_cfg.post_delay_buffer_length,
        );

        let tree = &config.arbiter_tree;
        let e_ne = create_queue(engine, &entity, "arb_e_ne", tree.lvl2.buffer_length);
        let n_w = create_queue(engine, &entity, "arb_n_w", tree.lvl2.buffer_length);
        let sw_s = create_queue(engine, &entity, "arb_sw_s", tree.lvl2.buffer_length);
        let e_ne_n_w = create_queue(engine, &entity, "arb_e_ne_n_w", tree.lvl1.buffer_length);
        let sw_s_l = create_queue(engine, &entity, "arb_sw_s_l", tree.lvl1.buffer_length);
        let router_input = create_queue(engine, &entity, "router_in", tree.root.buffer_length);

        let input = |d: Direction| inputs[d.index()];
        let merges = [
            (
                "arb_e_ne",
                tree.lvl2.period,
                vec![input(Direction::East), input(Direction::NorthEast)],
                e_ne,
            ),
            (
                "arb_n_w",
                tree.lvl2.period,
                vec![input(Direction::North), input(Direction::West)],
                n_w,
            ),
            (
                "arb_sw_s",
                tree.lvl2.period,
                vec![input(Direction::SouthWest), input(Direction::South)],
                sw_s,
            ),
            ("arb_e_ne_n_w", tree.lvl1.period, vec![e_ne, n_w], e_ne_n_w),
            ("arb_sw_s_l", tree.lvl1.period, vec![sw_s, generator_queue], sw_s_l),
            ("arb_root", tree.root.period, vec![e_ne_n_w, sw_s_l], router_input),
        ];
        let mut arbiters: Vec<Rc<RefCell<NodeArbiter>>> = Vec::with_capacity(merges.len());
        for (name, period, sources, output) in merges {
            arbiters.push(Arbiter::new_and_register(
                engine,
                period,
                &entity,
                name,
                sources,
                output,
                RoundRobin::new(),
            )?);
        }

        let mut router_outputs = [consumer_input; NUM_SLOTS];
        router_outputs[..6].copy_from_slice(&outputs);
        let router = Router::new_and_register(
            engine,
            config.router.period,
            &entity,
            "router",
            position,
            router_input,
            router_outputs,
            config.router.emergency_routing(),
            StatsObserver::new(index),
        )?;

        let seed = config.seed ^ (2 * index as u64);
        let generator = PacketGenerator::new_and_register(
            engine,
            generator_cfg.period,
            &entity,
            "generator",
            position,
            system_size,
            generator_queue,
            generator_cfg.settings(),
            seed,
        )?;

        let consumer_delay = Delay::new_and_register(
            engine,
            1,
            &entity,
            "con_delay",
            consumer_cfg.delay,
            consumer_input,
            consumer_queue,
        )?;
        let consumer = PacketConsumer::new_and_register(
            engine,
            consumer_cfg.period,
            &entity,
            "consumer",
            index,
            consumer_queue,
            consumer_cfg.temporal.distribution(),
            seed ^ 1,
        )?;

        debug!(entity ; "created at {}", position);

        Ok(Self {
            entity,
            position,
            inputs,
            outputs,
            router_input,
            consumer_input,
            arbiters,
            router,
            generator,
            consumer_delay,
            consumer,
        })
    }

    #[must_use]
    pub fn position(&self) -> Coord {
        self.position
    }

    /// The queue fed by the link from the neighbour in `direction`.
    ///
    /// # Panics
    ///
    /// If `direction` is [`Direction::Local`].
    #[must_use]
    pub fn input(&self, direction: Direction) -> QueueId {
        self.inputs[direction.index()]
    }

    /// The queue drained by the link to the neighbour in `direction`.
    ///
    /// # Panics
    ///
    /// If `direction` is [`Direction::Local`].
    #[must_use]
    pub fn output(&self, direction: Direction) -> QueueId {
        self.outputs[direction.index()]
    }

    #[must_use]
    pub fn router_input(&self) -> QueueId {
        self.router_input
    }

    /// The queue the router sends arrived packets to.
    #[must_use]
    pub fn consumer_input(&self) -> QueueId {
        self.consumer_input
    }

    #[must_use]
    pub fn arbiters(&self) -> &[Rc<RefCell<NodeArbiter>>] {
        &self.arbiters
    }

    #[must_use]
    pub fn router(&self) -> &Rc<RefCell<NodeRouter>> {
        &self.router
    }

    #[must_use]
    pub fn generator(&self) -> &Rc<RefCell<PacketGenerator>> {
        &self.generator
    }

    #[must_use]
    pub fn consumer_delay(&self) -> &Rc<RefCell<Delay<PacketId>>> {
        &self.consumer_delay
    }

    #[must_use]
    pub fn consumer(&self) -> &Rc<RefCell<PacketConsumer>> {
        &self.consumer
    }
}

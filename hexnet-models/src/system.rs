// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! A complete hexagonal torus of chips.
//!
//! Every chip is a [`Node`]. For each chip and each of the six directions a
//! [`Delay`] carries packets from the chip's output queue to the input queue
//! of the neighbour on the opposite side:
//!
//! ```txt
//!   node(p).output(d) --> delay --> node(neighbour(p, d)).input(opposite(d))
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use hexnet_components::delay::Delay;
use hexnet_engine::engine::Engine;
use hexnet_engine::types::{SimError, SimResult};
use hexnet_track::entity::Entity;
use hexnet_track::{Tracker, info};

use crate::config::SystemConfig;
use crate::network::Network;
use crate::node::Node;
use crate::packet::PacketId;
use crate::topology::{COMPASS, Coord, neighbour};

pub struct System {
    pub entity: Rc<Entity>,
    config: SystemConfig,
    nodes: Vec<Node>,
    links: Vec<Rc<RefCell<Delay<PacketId>>>>,
}

impl System {
    /// Create an engine holding an empty [`Network`] and build the system
    /// described by `config` within it.
    pub fn create(
        tracker: &Tracker,
        config: &SystemConfig,
    ) -> Result<(Engine<Network>, System), SimError> {
        config.validate()?;
        let mut engine = Engine::new(tracker, Network::for_config(config));
        let system = System::build(&mut engine, config)?;
        Ok((engine, system))
    }

    /// Build every node and link of the system and register them with the
    /// `engine`.
    pub fn build(engine: &mut Engine<Network>, config: &SystemConfig) -> Result<Self, SimError> {
        config.validate()?;
        let entity = Rc::new(Entity::new(engine.top(), "system"));
        let size = config.system_size.size();

        let mut nodes = Vec::with_capacity(config.system_size.num_nodes());
        for index in 0..config.system_size.num_nodes() {
            let position = Coord::from_index(index, size);
            nodes.push(Node::new_and_register(engine, &entity, position, config)?);
        }

        let mut links = Vec::with_capacity(nodes.len() * COMPASS.len());
        for node in &nodes {
            for d in COMPASS {
                let far = &nodes[neighbour(node.position(), d, size).index(size)];
                links.push(Delay::new_and_register(
                    engine,
                    1,
                    &node.entity,
                    &format!("link_{d}"),
                    config.node_to_node_links.packet_delay,
                    node.output(d),
                    far.input(d.opposite()),
                )?);
            }
        }

        info!(entity ; "built {}x{} system", size.x, size.y);
        Ok(Self {
            entity,
            config: config.clone(),
            nodes,
            links,
        })
    }

    /// Apply the settings of `config` that can change while running: the
    /// link and consumer delays and the temporal distributions of the
    /// generators and consumers.
    pub fn update(&mut self, config: &SystemConfig) -> SimResult {
        config.validate()?;

        for link in &self.links {
            link.borrow_mut()
                .set_depth(config.node_to_node_links.packet_delay);
        }

        let generator_temporal = config.packet_generator.temporal.distribution();
        let consumer_temporal = config.packet_consumer.temporal.distribution();
        for node in &self.nodes {
            node.generator().borrow_mut().set_temporal(generator_temporal)?;
            node.consumer().borrow_mut().set_temporal(consumer_temporal)?;
            node.consumer_delay()
                .borrow_mut()
                .set_depth(config.packet_consumer.delay);
        }

        info!(self.entity ; "updated configuration");
        self.config = config.clone();
        Ok(())
    }

    #[must_use]
    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    #[must_use]
    pub fn size(&self) -> Coord {
        self.config.system_size.size()
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[must_use]
    pub fn node(&self, position: Coord) -> &Node {
        &self.nodes[position.index(self.size())]
    }

    #[must_use]
    pub fn links(&self) -> &[Rc<RefCell<Delay<PacketId>>>] {
        &self.links
    }
}

// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Packet generators and consumers.
//!
//! # Queues
//!
//!  - A [`PacketGenerator`] has one output queue into which new packets are
//!    offered.
//!  - A [`PacketConsumer`] has one input queue from which arrived packets are
//!    removed.
//!
//! # Function
//!
//! Each time it runs a component acts according to its
//! [`TemporalDistribution`]. A generator that acts offers one packet: if its
//! queue has space the packet enters the network, otherwise the offer is
//! refused. Both outcomes are counted. Destinations are picked according to
//! the [`SpatialDistribution`].
//!
//! Random choices are made in commit for the following run so that decide
//! only reads state. Every component owns its RNG so a run is reproducible
//! from its seed.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use hexnet_engine::engine::Engine;
use hexnet_engine::queue::{QueueId, Queued};
use hexnet_engine::sim_error;
use hexnet_engine::traits::Clocked;
use hexnet_engine::types::{SimError, SimResult, Tick};
use hexnet_track::entity::Entity;
use hexnet_track::{Identified, create, create_id, destroy, enter, trace};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use crate::packet::{Packet, PacketId, PacketStore};
use crate::stats::StatsStore;
use crate::topology::Coord;

/// When a generator or consumer acts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TemporalDistribution {
    /// Act with the given probability each run.
    Bernoulli(f64),

    /// Act on the first run and then every `interval` runs.
    Periodic(u64),
}

impl TemporalDistribution {
    pub fn validate(&self) -> SimResult {
        match *self {
            TemporalDistribution::Bernoulli(p) if !(0.0..=1.0).contains(&p) => {
                sim_error!(format!("bernoulli probability {p} is not in [0, 1]"))
            }
            TemporalDistribution::Periodic(0) => {
                sim_error!("periodic interval must be at least 1")
            }
            _ => Ok(()),
        }
    }
}

/// Where a generator sends its packets.
#[derive(clap::ValueEnum, Clone, Copy, Default, Debug, Serialize, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpatialDistribution {
    /// A chip chosen uniformly at random.
    #[default]
    Uniform,

    /// Every chip in turn, in raster order starting after the source.
    Cyclic,
}

struct Trigger {
    distribution: TemporalDistribution,
    rng: Xoshiro256PlusPlus,
    runs: u64,
}

impl Trigger {
    fn new(distribution: TemporalDistribution, seed: u64) -> Self {
        Self {
            distribution,
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
            runs: 0,
        }
    }

    /// Whether the next run acts.
    fn roll(&mut self) -> bool {
        let run = self.runs;
        self.runs += 1;
        match self.distribution {
            TemporalDistribution::Bernoulli(p) => self.rng.gen_bool(p),
            TemporalDistribution::Periodic(interval) => run % interval == 0,
        }
    }
}

/// Settings shared by all generators of a system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeneratorSettings {
    pub temporal: TemporalDistribution,
    pub spatial: SpatialDistribution,
    pub allow_local: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Generate {
    Idle,
    Offer { accept: bool },
}

pub struct PacketGenerator {
    pub entity: Rc<Entity>,
    position: Coord,
    system_size: Coord,
    output: QueueId,
    spatial: SpatialDistribution,
    allow_local: bool,
    trigger: Trigger,
    fire: bool,
    destination: Coord,
}

impl PacketGenerator {
    pub fn new(
        parent: &Rc<Entity>,
        name: &str,
        position: Coord,
        system_size: Coord,
        output: QueueId,
        settings: GeneratorSettings,
        seed: u64,
    ) -> Result<Self, SimError> {
        let entity = Rc::new(Entity::new(parent, name));
        settings.temporal.validate()?;
        if !settings.allow_local && system_size.x * system_size.y == 1 {
            return sim_error!(format!(
                "{entity}: no destinations in a single chip system without local traffic"
            ));
        }

        let mut trigger = Trigger::new(settings.temporal, seed);
        let fire = trigger.roll();
        let mut generator = Self {
            entity,
            position,
            system_size,
            output,
            spatial: settings.spatial,
            allow_local: settings.allow_local,
            trigger,
            fire,
            destination: position,
        };
        generator.destination = generator.next_destination();
        Ok(generator)
    }

    /// Create a generator and register it with the `engine` to run every
    /// `period` ticks.
    #[expect(clippy::too_many_arguments)]
    pub fn new_and_register<S>(
        engine: &mut Engine<S>,
        period: u64,
        parent: &Rc<Entity>,
        name: &str,
        position: Coord,
        system_size: Coord,
        output: QueueId,
        settings: GeneratorSettings,
        seed: u64,
    ) -> Result<Rc<RefCell<Self>>, SimError>
    where
        Self: Clocked<S>,
        S: 'static,
    {
        let generator = Rc::new(RefCell::new(Self::new(
            parent,
            name,
            position,
            system_size,
            output,
            settings,
            seed,
        )?));
        engine.register(period, &generator)?;
        Ok(generator)
    }

    /// Destination of the next packet.
    #[must_use]
    pub fn destination(&self) -> Coord {
        self.destination
    }

    /// Change when the generator acts from its next run on.
    pub fn set_temporal(&mut self, temporal: TemporalDistribution) -> SimResult {
        temporal.validate()?;
        self.trigger.distribution = temporal;
        self.fire = self.trigger.roll();
        Ok(())
    }

    fn num_nodes(&self) -> usize {
        (self.system_size.x * self.system_size.y) as usize
    }

    fn next_destination(&mut self) -> Coord {
        let num_nodes = self.num_nodes();
        let source = self.position.index(self.system_size);
        let index = match self.spatial {
            SpatialDistribution::Uniform => {
                if self.allow_local {
                    self.trigger.rng.gen_range(0..num_nodes)
                } else {
                    let index = self.trigger.rng.gen_range(0..num_nodes - 1);
                    if index >= source { index + 1 } else { index }
                }
            }
            SpatialDistribution::Cyclic => {
                let next = (self.destination.index(self.system_size) + 1) % num_nodes;
                if next == source && !self.allow_local {
                    (next + 1) % num_nodes
                } else {
                    next
                }
            }
        };
        Coord::from_index(index, self.system_size)
    }
}

impl<S> Clocked<S> for PacketGenerator
where
    S: Queued<PacketId> + PacketStore + StatsStore,
{
    type Decision = Generate;

    fn decide(&self, _now: Tick, state: &S) -> Generate {
        if !self.fire {
            return Generate::Idle;
        }
        Generate::Offer {
            accept: !state.queues().get(self.output).is_full(),
        }
    }

    fn commit(&mut self, now: Tick, decision: Generate, state: &mut S) {
        if let Generate::Offer { accept } = decision {
            let node = self.position.index(self.system_size);
            state.stats_mut().record_offer(node, accept);

            if accept {
                let packet = Packet::dimension_order(
                    create_id!(self.entity),
                    self.position,
                    self.destination,
                    self.system_size,
                    now,
                );
                create!(self.entity ; packet, 0, 0);
                trace!(self.entity ; "{}: send {}", now, packet);

                let id = state.packets_mut().insert(packet);
                state.queues_mut().get_mut(self.output).push(id);
                self.destination = self.next_destination();
            } else {
                trace!(self.entity ; "{}: offer refused", now);
            }
        }
        self.fire = self.trigger.roll();
    }
}

impl fmt::Display for PacketGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.entity.fmt(f)
    }
}

pub struct PacketConsumer {
    pub entity: Rc<Entity>,
    node: usize,
    input: QueueId,
    trigger: Trigger,
    fire: bool,
    num_consumed: u64,
}

impl PacketConsumer {
    pub fn new(
        parent: &Rc<Entity>,
        name: &str,
        node: usize,
        input: QueueId,
        temporal: TemporalDistribution,
        seed: u64,
    ) -> Result<Self, SimError> {
        temporal.validate()?;
        let mut trigger = Trigger::new(temporal, seed);
        let fire = trigger.roll();
        Ok(Self {
            entity: Rc::new(Entity::new(parent, name)),
            node,
            input,
            trigger,
            fire,
            num_consumed: 0,
        })
    }

    /// Create a consumer and register it with the `engine` to run every
    /// `period` ticks.
    #[expect(clippy::too_many_arguments)]
    pub fn new_and_register<S>(
        engine: &mut Engine<S>,
        period: u64,
        parent: &Rc<Entity>,
        name: &str,
        node: usize,
        input: QueueId,
        temporal: TemporalDistribution,
        seed: u64,
    ) -> Result<Rc<RefCell<Self>>, SimError>
    where
        Self: Clocked<S>,
        S: 'static,
    {
        let consumer = Rc::new(RefCell::new(Self::new(
            parent, name, node, input, temporal, seed,
        )?));
        engine.register(period, &consumer)?;
        Ok(consumer)
    }

    #[must_use]
    pub fn num_consumed(&self) -> u64 {
        self.num_consumed
    }

    /// Change when the consumer acts from its next run on.
    pub fn set_temporal(&mut self, temporal: TemporalDistribution) -> SimResult {
        temporal.validate()?;
        self.trigger.distribution = temporal;
        self.fire = self.trigger.roll();
        Ok(())
    }
}

impl<S> Clocked<S> for PacketConsumer
where
    S: Queued<PacketId> + PacketStore + StatsStore,
{
    /// Whether to take the head of the input.
    type Decision = bool;

    fn decide(&self, _now: Tick, state: &S) -> bool {
        self.fire && !state.queues().get(self.input).is_empty()
    }

    fn commit(&mut self, now: Tick, consume: bool, state: &mut S) {
        if consume {
            let id = state.queues_mut().get_mut(self.input).pop();
            let packet = state.packets_mut().remove(id);
            trace!(self.entity ; "{}: arrived {}", now, packet);
            enter!(self.entity ; packet.id());
            destroy!(self.entity ; packet.id());
            state.stats_mut().record_arrival(self.node, &packet, now);
            self.num_consumed += 1;
        }
        self.fire = self.trigger.roll();
    }
}

impl fmt::Display for PacketConsumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.entity.fmt(f)
    }
}

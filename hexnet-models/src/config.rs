// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Configuration of a complete system.
//!
//! Every structure can be deserialized from a partial description: missing
//! fields take their default values.

use hexnet_engine::sim_error;
use hexnet_engine::types::SimResult;
use serde::{Deserialize, Serialize};

use crate::router::EmergencyRouting;
use crate::topology::Coord;
use crate::traffic::{GeneratorSettings, SpatialDistribution, TemporalDistribution};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SystemSizeConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for SystemSizeConfig {
    fn default() -> Self {
        Self {
            width: 8,
            height: 8,
        }
    }
}

impl SystemSizeConfig {
    #[must_use]
    pub fn size(&self) -> Coord {
        Coord::new(self.width as i32, self.height as i32)
    }

    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LinkConfig {
    pub input_buffer_length: usize,
    pub output_buffer_length: usize,

    /// Cycles taken to cross a link between neighbouring chips.
    pub packet_delay: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            input_buffer_length: 4,
            output_buffer_length: 1,
            packet_delay: 1,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Default, Debug, Serialize, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemporalKind {
    #[default]
    Bernoulli,
    Periodic,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TemporalConfig {
    pub dist: TemporalKind,
    pub bernoulli_prob: f64,
    pub periodic_interval: u64,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            dist: TemporalKind::Bernoulli,
            bernoulli_prob: 1.0,
            periodic_interval: 1,
        }
    }
}

impl TemporalConfig {
    #[must_use]
    pub fn distribution(&self) -> TemporalDistribution {
        match self.dist {
            TemporalKind::Bernoulli => TemporalDistribution::Bernoulli(self.bernoulli_prob),
            TemporalKind::Periodic => TemporalDistribution::Periodic(self.periodic_interval),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SpatialConfig {
    pub dist: SpatialDistribution,

    /// Whether a generator may send packets to its own chip.
    pub allow_local: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneratorConfig {
    pub period: u64,
    pub buffer_length: usize,
    pub temporal: TemporalConfig,
    pub spatial: SpatialConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            period: 1,
            buffer_length: 4,
            temporal: TemporalConfig {
                bernoulli_prob: 0.1,
                ..TemporalConfig::default()
            },
            spatial: SpatialConfig::default(),
        }
    }
}

impl GeneratorConfig {
    #[must_use]
    pub fn settings(&self) -> GeneratorSettings {
        GeneratorSettings {
            temporal: self.temporal.distribution(),
            spatial: self.spatial.dist,
            allow_local: self.spatial.allow_local,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConsumerConfig {
    pub period: u64,
    pub pre_delay_buffer_length: usize,
    pub post_delay_buffer_length: usize,

    /// Cycles between a packet leaving the router and reaching the consumer.
    pub delay: usize,
    pub temporal: TemporalConfig,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            period: 1,
            pre_delay_buffer_length: 2,
            post_delay_buffer_length: 2,
            delay: 1,
            temporal: TemporalConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ArbiterLevelConfig {
    pub period: u64,
    pub buffer_length: usize,
}

impl Default for ArbiterLevelConfig {
    fn default() -> Self {
        Self {
            period: 1,
            buffer_length: 1,
        }
    }
}

/// The three levels of arbiters that merge the inputs of a chip.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ArbiterTreeConfig {
    pub root: ArbiterLevelConfig,
    pub lvl1: ArbiterLevelConfig,
    pub lvl2: ArbiterLevelConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RouterConfig {
    pub period: u64,
    pub use_emergency_routing: bool,
    pub first_timeout: u64,
    pub final_timeout: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            period: 1,
            use_emergency_routing: true,
            first_timeout: 16,
            final_timeout: 16,
        }
    }
}

impl RouterConfig {
    #[must_use]
    pub fn emergency_routing(&self) -> EmergencyRouting {
        EmergencyRouting {
            enabled: self.use_emergency_routing,
            first_timeout: self.first_timeout,
            final_timeout: self.final_timeout,
        }
    }
}

/// Which counters are written as columns of a counter table.
///
/// A table with no column enabled is not written at all.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CounterColumns {
    pub packets_offered: bool,
    pub packets_accepted: bool,
    pub packets_arrived: bool,
    pub packets_dropped: bool,
}

impl Default for CounterColumns {
    fn default() -> Self {
        Self {
            packets_offered: true,
            packets_accepted: true,
            packets_arrived: true,
            packets_dropped: true,
        }
    }
}

impl CounterColumns {
    /// Every column disabled.
    #[must_use]
    pub fn none() -> Self {
        Self {
            packets_offered: false,
            packets_accepted: false,
            packets_arrived: false,
            packets_dropped: false,
        }
    }

    /// The flags in column order: offered, accepted, arrived, dropped.
    #[must_use]
    pub fn enabled(&self) -> [bool; 4] {
        [
            self.packets_offered,
            self.packets_accepted,
            self.packets_arrived,
            self.packets_dropped,
        ]
    }

    #[must_use]
    pub fn any(&self) -> bool {
        self.enabled().contains(&true)
    }
}

/// What is measured and written while sampling.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StatsConfig {
    /// Columns of the table of totals over the whole system.
    pub global_counters: CounterColumns,

    /// Columns of the table with one row per chip.
    pub per_node_counters: CounterColumns,

    /// Keep a record of every packet delivered.
    pub log_delivered_packets: bool,

    /// Keep a record of every packet dropped.
    pub log_dropped_packets: bool,
}

impl StatsConfig {
    /// Whether any per-packet records are kept.
    #[must_use]
    pub fn packet_details(&self) -> bool {
        self.log_delivered_packets || self.log_dropped_packets
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SystemConfig {
    pub system_size: SystemSizeConfig,
    pub node_to_node_links: LinkConfig,
    pub packet_generator: GeneratorConfig,
    pub packet_consumer: ConsumerConfig,
    pub arbiter_tree: ArbiterTreeConfig,
    pub router: RouterConfig,
    pub stats: StatsConfig,

    /// Seed from which every random stream of the system is derived.
    pub seed: u64,
}

fn check_at_least_one(name: &str, value: u64) -> SimResult {
    if value == 0 {
        return sim_error!(format!("{name} must be at least 1"));
    }
    Ok(())
}

impl SystemConfig {
    /// Check that a system can be built from this configuration.
    pub fn validate(&self) -> SimResult {
        let size = &self.system_size;
        check_at_least_one("system_size.width", u64::from(size.width))?;
        check_at_least_one("system_size.height", u64::from(size.height))?;
        if i32::try_from(size.num_nodes()).is_err() {
            return sim_error!(format!("system of {}x{} is too large", size.width, size.height));
        }

        let links = &self.node_to_node_links;
        check_at_least_one(
            "node_to_node_links.input_buffer_length",
            links.input_buffer_length as u64,
        )?;
        check_at_least_one(
            "node_to_node_links.output_buffer_length",
            links.output_buffer_length as u64,
        )?;

        let generator = &self.packet_generator;
        check_at_least_one("packet_generator.period", generator.period)?;
        check_at_least_one("packet_generator.buffer_length", generator.buffer_length as u64)?;
        generator.temporal.distribution().validate()?;
        if !generator.spatial.allow_local && size.num_nodes() == 1 {
            return sim_error!("a single chip system needs packet_generator.spatial.allow_local");
        }

        let consumer = &self.packet_consumer;
        check_at_least_one("packet_consumer.period", consumer.period)?;
        check_at_least_one(
            "packet_consumer.pre_delay_buffer_length",
            consumer.pre_delay_buffer_length as u64,
        )?;
        check_at_least_one(
            "packet_consumer.post_delay_buffer_length",
            consumer.post_delay_buffer_length as u64,
        )?;
        consumer.temporal.distribution().validate()?;

        let tree = &self.arbiter_tree;
        for (name, level) in [("root", &tree.root), ("lvl1", &tree.lvl1), ("lvl2", &tree.lvl2)] {
            check_at_least_one(&format!("arbiter_tree.{name}.period"), level.period)?;
            check_at_least_one(
                &format!("arbiter_tree.{name}.buffer_length"),
                level.buffer_length as u64,
            )?;
        }

        check_at_least_one("router.period", self.router.period)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use hexnet_engine::types::SimError;

    use super::*;

    #[test]
    fn default_is_valid() {
        assert_eq!(SystemConfig::default().validate(), Ok(()));
    }

    #[test]
    fn zero_sizes_rejected() {
        let mut config = SystemConfig::default();
        config.system_size.width = 0;
        assert_eq!(
            config.validate(),
            Err(SimError("system_size.width must be at least 1".to_string()))
        );

        let mut config = SystemConfig::default();
        config.arbiter_tree.lvl1.buffer_length = 0;
        assert_eq!(
            config.validate(),
            Err(SimError(
                "arbiter_tree.lvl1.buffer_length must be at least 1".to_string()
            ))
        );
    }

    #[test]
    fn bad_distributions_rejected() {
        let mut config = SystemConfig::default();
        config.packet_consumer.temporal.bernoulli_prob = 1.5;
        assert!(config.validate().is_err());

        let mut config = SystemConfig::default();
        config.packet_generator.temporal.dist = TemporalKind::Periodic;
        config.packet_generator.temporal.periodic_interval = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn single_chip_needs_local_traffic() {
        let mut config = SystemConfig::default();
        config.system_size = SystemSizeConfig {
            width: 1,
            height: 1,
        };
        assert!(config.validate().is_err());
        config.packet_generator.spatial.allow_local = true;
        assert_eq!(config.validate(), Ok(()));
    }
}

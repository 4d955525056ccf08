// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! The state shared by every component of a system.

use hexnet_engine::queue::{QueueSet, Queued};

use crate::config::SystemConfig;
use crate::packet::{PacketArena, PacketId, PacketStore};
use crate::stats::{NetworkStats, StatsStore};
use crate::topology::Coord;

/// Queues, packets in flight and statistics of a system.
pub struct Network {
    queues: QueueSet<PacketId>,
    packets: PacketArena,
    stats: NetworkStats,
}

impl Network {
    #[must_use]
    pub fn new(system_size: Coord, record_delivered: bool, record_dropped: bool) -> Self {
        Self {
            queues: QueueSet::new(),
            packets: PacketArena::new(),
            stats: NetworkStats::new(system_size, record_delivered, record_dropped),
        }
    }

    /// An empty network sized for `config`.
    #[must_use]
    pub fn for_config(config: &SystemConfig) -> Self {
        Self::new(
            config.system_size.size(),
            config.stats.log_delivered_packets,
            config.stats.log_dropped_packets,
        )
    }

    /// Number of packets that have been generated but neither delivered nor
    /// dropped.
    #[must_use]
    pub fn num_in_flight(&self) -> usize {
        self.packets.len()
    }
}

impl Queued<PacketId> for Network {
    fn queues(&self) -> &QueueSet<PacketId> {
        &self.queues
    }

    fn queues_mut(&mut self) -> &mut QueueSet<PacketId> {
        &mut self.queues
    }
}

impl PacketStore for Network {
    fn packets(&self) -> &PacketArena {
        &self.packets
    }

    fn packets_mut(&mut self) -> &mut PacketArena {
        &mut self.packets
    }
}

impl StatsStore for Network {
    fn stats(&self) -> &NetworkStats {
        &self.stats
    }

    fn stats_mut(&mut self) -> &mut NetworkStats {
        &mut self.stats
    }
}

// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Network statistics.
//!
//! Per-node counters are always updated and are cleared at the start of each
//! sample. Per-packet records are only kept while a sample is running and
//! only for the outcomes (delivered or dropped) that have been requested.
//!
//! The results are written as tab-separated tables with a header row. Every
//! row starts with the sample number.

use std::io::{self, Write};

use hexnet_engine::types::Tick;

use crate::config::CounterColumns;
use crate::packet::Packet;
use crate::router::RouterObserver;
use crate::topology::Coord;

/// Counts of packet events at one node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NodeCounters {
    /// Packets the generator tried to send.
    pub offered: u64,

    /// Packets the generator managed to send.
    pub accepted: u64,

    /// Packets consumed at this node.
    pub arrived: u64,

    /// Packets dropped by the router of this node.
    pub dropped: u64,
}

impl NodeCounters {
    fn add(&mut self, other: &NodeCounters) {
        self.offered += other.offered;
        self.accepted += other.accepted;
        self.arrived += other.arrived;
        self.dropped += other.dropped;
    }
}

/// The fate of one packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PacketRecord {
    pub delivered: bool,
    pub source: Coord,
    pub destination: Coord,

    /// Tick the packet was sent relative to the start of the sample.
    pub sent_time: i64,
    pub latency: Tick,
    pub num_hops: u32,
    pub num_emergency_hops: u32,
}

pub struct NetworkStats {
    system_size: Coord,
    counters: Vec<NodeCounters>,
    sampling: bool,
    sample_start: Tick,
    record_delivered: bool,
    record_dropped: bool,
    records: Vec<PacketRecord>,
    num_delivered: u64,
    total_latency: Tick,
    total_hops: u64,
}

impl NetworkStats {
    #[must_use]
    pub fn new(system_size: Coord, record_delivered: bool, record_dropped: bool) -> Self {
        let num_nodes = (system_size.x * system_size.y) as usize;
        Self {
            system_size,
            counters: vec![NodeCounters::default(); num_nodes],
            sampling: false,
            sample_start: 0,
            record_delivered,
            record_dropped,
            records: Vec::new(),
            num_delivered: 0,
            total_latency: 0,
            total_hops: 0,
        }
    }

    /// Clear everything and start recording packet details.
    pub fn start_sample(&mut self, now: Tick) {
        self.counters.fill(NodeCounters::default());
        self.records.clear();
        self.num_delivered = 0;
        self.total_latency = 0;
        self.total_hops = 0;
        self.sample_start = now;
        self.sampling = true;
    }

    pub fn stop_sample(&mut self) {
        self.sampling = false;
    }

    #[must_use]
    pub fn is_sampling(&self) -> bool {
        self.sampling
    }

    #[must_use]
    pub fn sample_start(&self) -> Tick {
        self.sample_start
    }

    pub fn record_offer(&mut self, node: usize, accepted: bool) {
        let counters = &mut self.counters[node];
        counters.offered += 1;
        if accepted {
            counters.accepted += 1;
        }
    }

    pub fn record_arrival(&mut self, node: usize, packet: &Packet, now: Tick) {
        self.counters[node].arrived += 1;
        if !self.sampling {
            return;
        }

        self.num_delivered += 1;
        self.total_latency += now - packet.sent_tick;
        self.total_hops += u64::from(packet.num_hops);
        if self.record_delivered {
            self.records.push(self.record(true, packet, now));
        }
    }

    pub fn record_drop(&mut self, node: usize, packet: &Packet, now: Tick) {
        self.counters[node].dropped += 1;
        if self.sampling && self.record_dropped {
            self.records.push(self.record(false, packet, now));
        }
    }

    fn record(&self, delivered: bool, packet: &Packet, now: Tick) -> PacketRecord {
        PacketRecord {
            delivered,
            source: packet.source,
            destination: packet.destination,
            sent_time: packet.sent_tick as i64 - self.sample_start as i64,
            latency: now - packet.sent_tick,
            num_hops: packet.num_hops,
            num_emergency_hops: packet.num_emergency_hops,
        }
    }

    #[must_use]
    pub fn node_counters(&self, node: usize) -> &NodeCounters {
        &self.counters[node]
    }

    /// Counters summed over every node.
    #[must_use]
    pub fn totals(&self) -> NodeCounters {
        let mut totals = NodeCounters::default();
        for counters in &self.counters {
            totals.add(counters);
        }
        totals
    }

    #[must_use]
    pub fn records(&self) -> &[PacketRecord] {
        &self.records
    }

    /// Mean latency of the packets delivered during the current sample.
    #[must_use]
    pub fn mean_latency(&self) -> Option<f64> {
        (self.num_delivered > 0).then(|| self.total_latency as f64 / self.num_delivered as f64)
    }

    /// Mean number of hops of the packets delivered during the current sample.
    #[must_use]
    pub fn mean_hops(&self) -> Option<f64> {
        (self.num_delivered > 0).then(|| self.total_hops as f64 / self.num_delivered as f64)
    }

    pub fn write_global_header(w: &mut impl Write, columns: &CounterColumns) -> io::Result<()> {
        write!(w, "sample")?;
        write_counter_names(w, columns)
    }

    pub fn write_global_row(
        &self,
        w: &mut impl Write,
        sample: usize,
        columns: &CounterColumns,
    ) -> io::Result<()> {
        write!(w, "{sample}")?;
        write_counter_values(w, &self.totals(), columns)
    }

    pub fn write_per_node_header(w: &mut impl Write, columns: &CounterColumns) -> io::Result<()> {
        write!(w, "sample\tnode_x\tnode_y")?;
        write_counter_names(w, columns)
    }

    pub fn write_per_node_rows(
        &self,
        w: &mut impl Write,
        sample: usize,
        columns: &CounterColumns,
    ) -> io::Result<()> {
        for (index, counters) in self.counters.iter().enumerate() {
            let position = Coord::from_index(index, self.system_size);
            write!(w, "{sample}\t{}\t{}", position.x, position.y)?;
            write_counter_values(w, counters, columns)?;
        }
        Ok(())
    }

    pub fn write_packet_details_header(w: &mut impl Write) -> io::Result<()> {
        writeln!(
            w,
            "sample\tdelivered\tsource_x\tsource_y\tdest_x\tdest_y\t\
             sent_time\tlatency\tnum_hops\temg_hops"
        )
    }

    pub fn write_packet_details_rows(&self, w: &mut impl Write, sample: usize) -> io::Result<()> {
        for r in &self.records {
            writeln!(
                w,
                "{sample}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                u8::from(r.delivered),
                r.source.x,
                r.source.y,
                r.destination.x,
                r.destination.y,
                r.sent_time,
                r.latency,
                r.num_hops,
                r.num_emergency_hops
            )?;
        }
        Ok(())
    }
}

const COUNTER_NAMES: [&str; 4] = [
    "packets_offered",
    "packets_accepted",
    "packets_arrived",
    "packets_dropped",
];

/// Finish a header row with the names of the enabled counters.
fn write_counter_names(w: &mut impl Write, columns: &CounterColumns) -> io::Result<()> {
    for (name, enabled) in COUNTER_NAMES.iter().zip(columns.enabled()) {
        if enabled {
            write!(w, "\t{name}")?;
        }
    }
    writeln!(w)
}

/// Finish a row with the values of the enabled counters.
fn write_counter_values(
    w: &mut impl Write,
    counters: &NodeCounters,
    columns: &CounterColumns,
) -> io::Result<()> {
    let values = [
        counters.offered,
        counters.accepted,
        counters.arrived,
        counters.dropped,
    ];
    for (value, enabled) in values.iter().zip(columns.enabled()) {
        if enabled {
            write!(w, "\t{value}")?;
        }
    }
    writeln!(w)
}

/// Access to the statistics held within a simulation state.
pub trait StatsStore {
    fn stats(&self) -> &NetworkStats;
    fn stats_mut(&mut self) -> &mut NetworkStats;
}

impl StatsStore for NetworkStats {
    fn stats(&self) -> &NetworkStats {
        self
    }

    fn stats_mut(&mut self) -> &mut NetworkStats {
        self
    }
}

/// Router observer that counts the packets dropped at one node.
pub struct StatsObserver {
    node: usize,
}

impl StatsObserver {
    #[must_use]
    pub fn new(node: usize) -> Self {
        Self { node }
    }
}

impl<S> RouterObserver<S> for StatsObserver
where
    S: StatsStore,
{
    fn on_drop(&mut self, _position: Coord, packet: &Packet, now: Tick, state: &mut S) {
        state.stats_mut().record_drop(self.node, packet, now);
    }
}

// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Warm-up, sampling and the result files.
//!
//! The network runs for the warm-up period and then for each sample in turn.
//! Statistics are cleared at the start of every sample and written out at
//! its end, one block of rows per sample. Samples are numbered from 1.
//!
//!  - `global_counters.dat`: totals over the whole network.
//!  - `per_node_counters.dat`: one row per chip.
//!  - `packet_details.dat`: one row per recorded packet.
//!
//! The counter tables only hold the columns enabled in the
//! [`StatsConfig`] and a table with no columns is not created. Packet
//! details are only written when delivered or dropped packets are being
//! recorded.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use hexnet_engine::engine::Engine;
use hexnet_engine::types::SimError;
use hexnet_models::network::Network;
use hexnet_models::config::{CounterColumns, StatsConfig};
use hexnet_models::stats::{NetworkStats, NodeCounters, StatsStore};
use hexnet_models::system::System;
use hexnet_track::{info, warn};
use indicatif::ProgressBar;

use crate::config::ExperimentConfig;

pub const GLOBAL_COUNTERS_FILE: &str = "global_counters.dat";
pub const PER_NODE_COUNTERS_FILE: &str = "per_node_counters.dat";
pub const PACKET_DETAILS_FILE: &str = "packet_details.dat";

/// Ticks run between updates of the progress bar.
const PROGRESS_TICKS: u64 = 1_000;

fn io_error(path: &Path, e: &io::Error) -> SimError {
    SimError(format!("{}: {e}", path.display()))
}

struct ResultFile {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl ResultFile {
    fn create(dir: &Path, name: &str) -> Result<Self, SimError> {
        let path = dir.join(name);
        let file = File::create(&path).map_err(|e| io_error(&path, &e))?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    fn write<F>(&mut self, f: F) -> Result<(), SimError>
    where
        F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
    {
        f(&mut self.writer).map_err(|e| io_error(&self.path, &e))
    }

    fn flush(&mut self) -> Result<(), SimError> {
        self.writer.flush().map_err(|e| io_error(&self.path, &e))
    }
}

/// A counter table and the columns it holds.
struct CounterTable {
    file: ResultFile,
    columns: CounterColumns,
}

impl CounterTable {
    /// Open the table when at least one of its columns is enabled.
    fn create<F>(
        dir: &Path,
        name: &str,
        columns: CounterColumns,
        write_header: F,
    ) -> Result<Option<Self>, SimError>
    where
        F: FnOnce(&mut BufWriter<File>, &CounterColumns) -> io::Result<()>,
    {
        if !columns.any() {
            return Ok(None);
        }
        let mut file = ResultFile::create(dir, name)?;
        file.write(|w| write_header(w, &columns))?;
        Ok(Some(Self { file, columns }))
    }
}

/// The open result files of a run.
pub struct ResultsWriter {
    global: Option<CounterTable>,
    per_node: Option<CounterTable>,
    packet_details: Option<ResultFile>,
}

impl ResultsWriter {
    /// Create the results directory and the files `stats` asks for, each
    /// starting with its header row.
    pub fn create(dir: &Path, stats: &StatsConfig) -> Result<Self, SimError> {
        fs::create_dir_all(dir).map_err(|e| io_error(dir, &e))?;

        let global = CounterTable::create(
            dir,
            GLOBAL_COUNTERS_FILE,
            stats.global_counters,
            |w, columns| NetworkStats::write_global_header(w, columns),
        )?;
        let per_node = CounterTable::create(
            dir,
            PER_NODE_COUNTERS_FILE,
            stats.per_node_counters,
            |w, columns| NetworkStats::write_per_node_header(w, columns),
        )?;

        let packet_details = if stats.packet_details() {
            let mut file = ResultFile::create(dir, PACKET_DETAILS_FILE)?;
            file.write(|w| NetworkStats::write_packet_details_header(w))?;
            Some(file)
        } else {
            None
        };

        Ok(Self {
            global,
            per_node,
            packet_details,
        })
    }

    /// Append the rows of `sample` (numbered from 1) to every open file.
    pub fn write_sample(&mut self, stats: &NetworkStats, sample: usize) -> Result<(), SimError> {
        if let Some(table) = &mut self.global {
            let columns = table.columns;
            table
                .file
                .write(|w| stats.write_global_row(w, sample, &columns))?;
        }
        if let Some(table) = &mut self.per_node {
            let columns = table.columns;
            table
                .file
                .write(|w| stats.write_per_node_rows(w, sample, &columns))?;
        }
        if let Some(file) = &mut self.packet_details {
            file.write(|w| stats.write_packet_details_rows(w, sample))?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<(), SimError> {
        for table in [&mut self.global, &mut self.per_node].into_iter().flatten() {
            table.file.flush()?;
        }
        if let Some(file) = &mut self.packet_details {
            file.flush()?;
        }
        Ok(())
    }
}

/// The headline results of one sample.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleSummary {
    /// Sample number, counting from 1.
    pub sample: usize,
    pub counters: NodeCounters,
    pub mean_latency: Option<f64>,
    pub mean_hops: Option<f64>,
}

fn advance(engine: &mut Engine<Network>, ticks: u64, progress: &ProgressBar) {
    let mut remaining = ticks;
    while remaining > 0 {
        let chunk = remaining.min(PROGRESS_TICKS);
        engine.run_for(chunk);
        progress.inc(chunk);
        remaining -= chunk;
    }
}

/// Run the warm-up and every sample of `config`, writing each sample to
/// `results` as it completes.
pub fn run_experiment(
    engine: &mut Engine<Network>,
    system: &System,
    config: &ExperimentConfig,
    results: &mut ResultsWriter,
    progress: &ProgressBar,
) -> Result<Vec<SampleSummary>, SimError> {
    config.validate()?;

    info!(system.entity ; "warm up for {} ticks", config.warmup_duration);
    advance(engine, config.warmup_duration, progress);

    let mut summaries = Vec::with_capacity(config.num_samples);
    for sample in 1..=config.num_samples {
        let now = engine.current_tick();
        engine.state_mut().stats_mut().start_sample(now);
        advance(engine, config.sample_duration, progress);
        engine.state_mut().stats_mut().stop_sample();

        let stats = engine.state().stats();
        results.write_sample(stats, sample)?;

        let summary = SampleSummary {
            sample,
            counters: stats.totals(),
            mean_latency: stats.mean_latency(),
            mean_hops: stats.mean_hops(),
        };
        let c = &summary.counters;
        if c.arrived == 0 {
            warn!(system.entity ; "sample {}: no packets arrived", sample);
        }
        info!(system.entity ; "sample {}: offered {}, accepted {}, arrived {}, dropped {}, \
            mean latency {:.2}, mean hops {:.2}",
            sample,
            c.offered,
            c.accepted,
            c.arrived,
            c.dropped,
            summary.mean_latency.unwrap_or(0.0),
            summary.mean_hops.unwrap_or(0.0)
        );
        summaries.push(summary);
    }

    Ok(summaries)
}

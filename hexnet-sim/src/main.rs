// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Simulate a hexagonal torus of chips under synthetic traffic.
//!
//! See `lib.rs` for details.
use std::path::PathBuf;

use clap::Parser;
use hexnet_engine::types::SimError;
use hexnet_models::system::System;
use hexnet_sim::config::SimConfig;
use hexnet_sim::experiment::{ResultsWriter, run_experiment};
use hexnet_track::builder::{TrackerConfig, setup_tracker};
use hexnet_track::{error, info};
use indicatif::ProgressBar;

/// Command-line arguments.
///
/// Every option overrides the value from the configuration file and the
/// environment.
#[derive(Parser)]
#[command(about = "Hexagonal torus network simulator")]
struct Cli {
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Level of log message to display.
    #[arg(long)]
    log_level: Option<log::Level>,

    /// Set a regular expression for which entites should have logging level
    /// set to `--log-level`. Others will have level set to `Error`.
    #[arg(long)]
    log_filter_regex: Option<String>,

    /// Write log messages to this file rather than `stdout`.
    #[arg(long)]
    log_file: Option<String>,

    /// Ticks to run before sampling starts.
    #[arg(long)]
    warmup_ticks: Option<u64>,

    /// Ticks in each sample.
    #[arg(long)]
    sample_ticks: Option<u64>,

    /// Number of samples to record.
    #[arg(long)]
    num_samples: Option<usize>,

    /// Directory the result files are written to.
    #[arg(long)]
    results_dir: Option<PathBuf>,

    /// Show a progress bar of the ticks simulated.
    #[arg(long)]
    progress: bool,

    /// Seed for the random number generators.
    #[arg(long)]
    seed: Option<u64>,
}

impl Cli {
    fn apply(&self, config: &mut SimConfig) {
        if let Some(level) = self.log_level {
            config.log.level = level;
        }
        if let Some(regex) = &self.log_filter_regex {
            config.log.filter_regex.clone_from(regex);
        }
        if let Some(file) = &self.log_file {
            config.log.file = Some(file.clone());
        }
        if let Some(ticks) = self.warmup_ticks {
            config.experiment.warmup_duration = ticks;
        }
        if let Some(ticks) = self.sample_ticks {
            config.experiment.sample_duration = ticks;
        }
        if let Some(num_samples) = self.num_samples {
            config.experiment.num_samples = num_samples;
        }
        if let Some(dir) = &self.results_dir {
            config.experiment.results_dir.clone_from(dir);
        }
        if let Some(seed) = self.seed {
            config.system.seed = seed;
        }
    }
}

fn main() -> Result<(), SimError> {
    let args = Cli::parse();
    let mut config = SimConfig::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    let tracker = setup_tracker(&TrackerConfig {
        enable: true,
        level: config.log.level,
        filter_regex: &config.log.filter_regex,
        file: config.log.file.as_deref(),
    })
    .map_err(|e| SimError(e.to_string()))?;

    let (mut engine, system) = System::create(&tracker, &config.system)?;
    let size = system.size();
    info!(system.entity ; "{}x{} chips, seed {}, {} component registrations",
        size.x, size.y, config.system.seed, engine.num_registrations());

    let experiment = &config.experiment;
    let mut results = ResultsWriter::create(&experiment.results_dir, &config.system.stats)?;

    let progress_bar = if args.progress {
        ProgressBar::new(experiment.total_ticks())
    } else {
        ProgressBar::hidden()
    };

    let outcome = run_experiment(&mut engine, &system, experiment, &mut results, &progress_bar)
        .and_then(|summaries| results.finish().map(|()| summaries));
    let summaries = match outcome {
        Ok(summaries) => summaries,
        Err(e) => {
            error!(system.entity ; "{}", e);
            tracker.shutdown();
            return Err(e);
        }
    };
    progress_bar.finish();

    info!(system.entity ; "{} samples written to {}",
        summaries.len(), experiment.results_dir.display());
    tracker.shutdown();
    Ok(())
}

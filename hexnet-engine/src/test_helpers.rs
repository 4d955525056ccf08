// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use std::fs;
use std::io::BufWriter;
use std::path::Path;
use std::rc::Rc;

use hexnet_track::tracker::{EntityManager, TextTracker};
use hexnet_track::{Tracker, Writer};

use crate::engine::Engine;

/// Create a tracker that writes the log of a test to `traces/<test>.log`.
#[must_use]
pub fn create_tracker(full_filepath: &str) -> Tracker {
    // Place all log files in one folder
    const FOLDER: &str = "traces";

    // Create that folder if it doesn't exist yet
    fs::create_dir_all(FOLDER).unwrap();

    let filename_only = Path::new(full_filepath)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap();

    let writer: Writer = Box::new(BufWriter::new(
        fs::File::create(format!("{FOLDER}/{filename_only}.log")).unwrap(),
    ));

    let entity_manager = EntityManager::new(log::Level::Debug);
    let tracker: Tracker = Rc::new(TextTracker::new(entity_manager, writer));
    tracker
}

#[must_use]
pub fn start_test<S>(full_filepath: &str, state: S) -> Engine<S> {
    Engine::new(&create_tracker(full_filepath), state)
}

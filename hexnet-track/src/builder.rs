// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Library functions to build trackers as defined by the user.

use std::fs;
use std::io::{self, BufWriter};
use std::rc::Rc;

use crate::tracker::{EntityManager, TextTracker, TrackConfigError, dev_null_tracker};
use crate::{Tracker, Writer};

/// Configuration options for the text tracker.
pub struct TrackerConfig<'a> {
    /// Enable this tracker.
    pub enable: bool,

    /// Set the level at which this tracker should be enabled.
    pub level: log::Level,

    /// A regular expression to match which entities should have this level
    /// applied. All others will only emit errors.
    pub filter_regex: &'a str,

    /// If required, the name of the file to which the tracker will write.
    /// Writes to `stdout` when `None` or `-`.
    pub file: Option<&'a str>,
}

impl Default for TrackerConfig<'_> {
    fn default() -> Self {
        Self {
            enable: true,
            level: log::Level::Warn,
            filter_regex: "",
            file: None,
        }
    }
}

fn entity_manager_for(config: &TrackerConfig) -> Result<EntityManager, TrackConfigError> {
    let default_level = if config.filter_regex.is_empty() {
        config.level
    } else {
        log::Level::Error
    };

    let mut entity_manager = EntityManager::new(default_level);
    if !config.filter_regex.is_empty() {
        entity_manager.add_entity_level_filter(config.filter_regex, config.level)?;
    }
    Ok(entity_manager)
}

/// Set up the text tracker according to the user configuration.
///
/// A disabled tracker is replaced by one that discards all events.
pub fn setup_tracker(config: &TrackerConfig) -> Result<Tracker, TrackConfigError> {
    if !config.enable {
        return Ok(dev_null_tracker());
    }

    let entity_manager = entity_manager_for(config)?;
    let writer: Writer = match config.file {
        None | Some("-") => Box::new(BufWriter::new(io::stdout())),
        Some(path) => match fs::File::create(path) {
            Ok(file) => Box::new(BufWriter::new(file)),
            Err(e) => {
                return Err(TrackConfigError(format!(
                    "Failed to create log file {path}: {e}"
                )));
            }
        },
    };
    Ok(Rc::new(TextTracker::new(entity_manager, writer)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::toplevel;
    use crate::{info, trace};

    #[test]
    fn file_tracker_filters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        let path_str = path.to_str().unwrap();

        let config = TrackerConfig {
            enable: true,
            level: log::Level::Info,
            filter_regex: "",
            file: Some(path_str),
        };
        let tracker = setup_tracker(&config).unwrap();
        let top = toplevel(&tracker, "top");
        info!(top ; "hello {}", 1);
        trace!(top ; "hidden");
        tracker.shutdown();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, format!("{}:INFO: hello 1\n", top.id));
    }

    #[test]
    fn disabled_is_silent() {
        let config = TrackerConfig {
            enable: false,
            ..Default::default()
        };
        let tracker = setup_tracker(&config).unwrap();
        assert!(!tracker.is_entity_enabled(crate::ROOT, log::Level::Error));
    }

    #[test]
    fn bad_filter() {
        let config = TrackerConfig {
            filter_regex: "[",
            ..Default::default()
        };
        assert!(setup_tracker(&config).is_err());
    }
}

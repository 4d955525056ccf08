// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Ensure that all versions of each macro can be used

use std::rc::Rc;

use hexnet_track::entity::{Entity, toplevel};
use hexnet_track::{
    Id, create, create_id, debug, destroy, enter, error, exit, info, set_time, test_helpers,
    test_init, trace, warn,
};

macro_rules! build_with_entity {
    ($name:ident, $macro:ident, $slvl:expr) => (
        #[test]
        fn $name() {
            let (test_tracker, tracker) = test_init!(100);

            let top = toplevel(&tracker, "top");
            test_helpers::check_and_clear(&test_tracker, &["0: created 100, top, 0, 0 bytes"]);
            assert_eq!(top.id, Id(100));

            $macro!(top ; "Loc with no args");
            test_helpers::check_and_clear(
                &test_tracker,
                &[concat!("100:", $slvl, ": Loc with no args")],
            );

            $macro!(top ; "Loc with {} argument", 1);
            test_helpers::check_and_clear(
                &test_tracker,
                &[concat!("100:", $slvl, ": Loc with 1 argument")],
            );

            $macro!(top ; "Loc with {}, {} arguments", 1, 1 + 1);
            test_helpers::check_and_clear(
                &test_tracker,
                &[concat!("100:", $slvl, ": Loc with 1, 2 arguments")],
            );

            drop(top);
            test_helpers::check_and_clear(&test_tracker, &["0: destroyed 100"]);
        }
    );
}

build_with_entity!(trace_with_entity, trace, "TRACE");
build_with_entity!(info_with_entity, info, "INFO");
build_with_entity!(debug_with_entity, debug, "DEBUG");
build_with_entity!(warn_with_entity, warn, "WARN");
build_with_entity!(error_with_entity, error, "ERROR");

#[test]
fn hierarchy() {
    let (test_tracker, tracker) = test_init!(10);

    let top = toplevel(&tracker, "top");
    let node = Rc::new(Entity::new(&top, "node_0_0"));
    let router = Entity::new(&node, "router");
    test_helpers::check_and_clear(
        &test_tracker,
        &[
            "0: created 10, top, 0, 0 bytes",
            "10: created 11, top::node_0_0, 0, 0 bytes",
            "11: created 12, top::node_0_0::router, 0, 0 bytes",
        ],
    );
    assert_eq!(router.full_name(), "top::node_0_0::router");
    assert_eq!(format!("{router}"), "top::node_0_0::router");

    drop(router);
    test_helpers::check_and_clear(&test_tracker, &["11: destroyed 12"]);
}

#[test]
fn object_events() {
    let (test_tracker, tracker) = test_init!(10);

    let top = toplevel(&tracker, "top");
    test_helpers::check_and_clear(&test_tracker, &["0: created 10, top, 0, 0 bytes"]);

    let packet = create_id!(top);
    assert_eq!(packet, Id(11));

    create!(top ; packet, 0, 0);
    enter!(top ; packet);
    exit!(top ; packet);
    destroy!(top ; packet);
    set_time!(top ; 42);
    test_helpers::check_and_clear(
        &test_tracker,
        &[
            "10: created 11, 11, 0, 0 bytes",
            "10: 11 entered",
            "10: 11 exited",
            "10: destroyed 11",
            "10: set tick 42",
        ],
    );
}

#[test]
fn level_filtering() {
    let test_tracker = Rc::new(test_helpers::TestTracker::with_level(
        10,
        hexnet_track::log::Level::Info,
    ));
    let tracker: hexnet_track::Tracker = test_tracker.clone();

    let top = toplevel(&tracker, "top");
    trace!(top ; "not seen");
    debug!(top ; "not seen");
    info!(top ; "seen");
    test_helpers::check_and_clear(&test_tracker, &["10:INFO: seen"]);
}

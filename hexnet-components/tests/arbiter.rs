// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use std::cell::RefCell;
use std::rc::Rc;

use hexnet_components::arbiter::Arbiter;
use hexnet_components::arbiter::policy::RoundRobin;
use hexnet_engine::engine::Engine;
use hexnet_engine::queue::{QueueId, QueueSet};
use hexnet_engine::test_helpers::start_test;
use hexnet_engine::types::{SimError, Tick};

const CAPACITY: usize = 4;
const PERIOD: u64 = 3;
const NUM_INPUTS: usize = 3;

type Harness = (
    Engine<QueueSet<u32>>,
    Vec<QueueId>,
    QueueId,
    Rc<RefCell<Arbiter<u32, RoundRobin>>>,
);

fn build(file: &str, num_inputs: usize) -> Harness {
    let mut engine = start_test(file, QueueSet::new());
    let queues = engine.state_mut();
    let inputs: Vec<QueueId> = (0..num_inputs)
        .map(|i| queues.create(&format!("in{i}"), CAPACITY))
        .collect();
    let output = queues.create("out", CAPACITY);

    let top = engine.top().clone();
    let arbiter = Arbiter::new_and_register(
        &mut engine,
        PERIOD,
        &top,
        "arb",
        inputs.clone(),
        output,
        RoundRobin::new(),
    )
    .unwrap();
    (engine, inputs, output, arbiter)
}

#[test]
fn single_input_drains() {
    let (mut engine, inputs, output, arbiter) = build(file!(), NUM_INPUTS);
    for value in 0..CAPACITY as u32 {
        engine.state_mut().get_mut(inputs[0]).push(value);
    }

    let num_steps = (CAPACITY as u64 - 1) * PERIOD + 1;
    for step in 1..=num_steps {
        engine.step();
        assert_eq!(engine.state().get(output).is_full(), step == num_steps);
    }
    assert!(engine.state().get(inputs[0]).is_empty());
    assert_eq!(arbiter.borrow().num_granted(), CAPACITY);

    let out = engine.state_mut().get_mut(output);
    let values: Vec<u32> = (0..CAPACITY).map(|_| out.pop()).collect();
    assert_eq!(values, vec![0, 1, 2, 3]);
}

#[test]
fn round_robin_order() {
    let (mut engine, inputs, output, _arbiter) = build(file!(), NUM_INPUTS);
    for (tag, input) in inputs.iter().enumerate() {
        for _ in 0..2 {
            engine.state_mut().get_mut(*input).push(tag as u32);
        }
    }

    engine.run_for((NUM_INPUTS as u64 - 1) * PERIOD + 1);

    let out = engine.state_mut().get_mut(output);
    assert_eq!(out.len(), NUM_INPUTS);
    let order: Vec<u32> = (0..NUM_INPUTS).map(|_| out.pop()).collect();
    assert_eq!(order, vec![0, 1, 2]);
}

#[test]
fn output_backpressure() {
    let (mut engine, inputs, output, arbiter) = build(file!(), NUM_INPUTS);
    for filler in 100..100 + CAPACITY as u32 {
        engine.state_mut().get_mut(output).push(filler);
    }
    engine.state_mut().get_mut(inputs[0]).push(0);

    engine.run_for(PERIOD + 1);
    assert!(!engine.state().get(inputs[0]).is_empty());
    assert_eq!(arbiter.borrow().num_granted(), 0);

    assert_eq!(engine.state_mut().get_mut(output).pop(), 100);
    engine.run_for(PERIOD + 1);
    assert!(engine.state().get(inputs[0]).is_empty());
    assert!(engine.state().get(output).is_full());
    assert_eq!(arbiter.borrow().policy().last_granted(), Some(0));
}

#[test]
fn no_input_starves() {
    let (mut engine, inputs, output, _arbiter) = build(file!(), NUM_INPUTS);

    // Keep every input topped up and drain the output into a log
    let granted: Rc<RefCell<Vec<u32>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = granted.clone();
    let feed_inputs = inputs.clone();
    engine
        .register_actions(
            1,
            None,
            Some(Box::new(move |_now: Tick, queues: &mut QueueSet<u32>| {
                if !queues.get(output).is_empty() {
                    sink.borrow_mut().push(queues.get_mut(output).pop());
                }
                for (tag, input) in feed_inputs.iter().enumerate() {
                    if !queues.get(*input).is_full() {
                        queues.get_mut(*input).push(tag as u32);
                    }
                }
            })),
        )
        .unwrap();

    engine.run_for(PERIOD * 30);

    let granted = granted.borrow();
    assert!(granted.len() >= 27);
    for window in granted.windows(NUM_INPUTS) {
        let mut seen = window.to_vec();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2]);
    }
}

#[test]
fn zero_inputs_rejected() {
    let mut engine = start_test(file!(), QueueSet::<u32>::new());
    let output = engine.state_mut().create("out", CAPACITY);
    let top = engine.top().clone();
    let result =
        Arbiter::<u32, RoundRobin>::new(&top, "arb", Vec::new(), output, RoundRobin::new());
    assert_eq!(
        result.err(),
        Some(SimError(
            "top::arb: an arbiter needs at least one input".to_string()
        ))
    );
}

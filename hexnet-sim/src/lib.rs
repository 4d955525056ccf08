// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Run a hexagonal torus network and record its statistics.
//!
//! A run builds the [`System`](hexnet_models::system::System) described by
//! its [`SimConfig`](config::SimConfig), warms it up and then records a
//! number of samples into tab-separated result files.

pub mod config;
pub mod experiment;

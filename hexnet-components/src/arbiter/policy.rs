// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Arbitration policies.

mod round_robin;

pub use round_robin::RoundRobin;

// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Models of a SpiNNaker-style chip network.
//!
//! The [system](crate::system) is a hexagonal torus of
//! [nodes](crate::node). Each node merges its six link inputs and its local
//! [generator](crate::traffic) through a tree of arbiters into a
//! congestion-aware [router](crate::router), whose outputs feed the links to
//! the neighbouring nodes and the local consumer. Packets carry their own
//! [dimension-order route](crate::packet) computed with the
//! [topology](crate::topology) helpers.
//!
//! All components share one [`Network`](crate::network::Network) state
//! which also gathers [statistics](crate::stats).

pub mod config;
pub mod network;
pub mod node;
pub mod packet;
pub mod router;
pub mod stats;
pub mod system;
pub mod topology;
pub mod traffic;

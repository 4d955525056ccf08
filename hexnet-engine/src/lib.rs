// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

#![doc(test(attr(warn(unused))))]

//! `hexnet` - cycle-accurate packet-level network simulation
//!
//! This library provides the core of the [hexnet engine](crate::engine): a
//! two-phase scheduler which drives [`Clocked`](crate::traits::Clocked)
//! components, the bounded [queues](crate::queue) they communicate through
//! and the [arena](crate::arena) that owns in-flight packets.
//!
//! Components such as delay lines and arbiters are provided by
//! `hexnet-components`. Routers and network models are provided by
//! `hexnet-models`.

pub mod arena;
pub mod engine;
pub mod queue;
pub mod test_helpers;
pub mod traits;
pub mod types;

// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Library of components that move values between
//! [queues](hexnet_engine::queue).
//!
//! Every component implements [`Clocked`](hexnet_engine::traits::Clocked):
//! it inspects its queues during decide and moves values during commit. Each
//! queue must have exactly one producer and one consumer.
//!
//! The components are generic over the value type `T` carried by the queues
//! and over the simulation state `S`, which only needs to implement
//! [`Queued<T>`](hexnet_engine::queue::Queued).

pub mod arbiter;
pub mod delay;

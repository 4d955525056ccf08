// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Packets and their dimension-order routes.
//!
//! A packet carries everything a router needs to forward it without a
//! routing table: its destination, the chip at which it turns (the
//! inflection point) and the direction it takes from there. Between the
//! source and the inflection point, and between the inflection point and
//! the destination, it travels in a straight line.

use std::fmt;

use hexnet_engine::arena::{Arena, ArenaId};
use hexnet_engine::types::Tick;
use hexnet_track::{Id, Identified};

use crate::topology::{Coord, CubeCoord, Direction, neighbour, shortest_vector};

/// Progress of a packet through an emergency detour.
///
/// A blocked packet is sent one direction clockwise of its intended route
/// (the first leg) and the next router sends it back onto the original
/// route (the second leg). This makes two sides of a triangle around the
/// blocked link.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EmergencyState {
    #[default]
    Normal,
    FirstLeg,
    SecondLeg,
}

impl fmt::Display for EmergencyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EmergencyState::Normal => "normal",
            EmergencyState::FirstLeg => "first-leg",
            EmergencyState::SecondLeg => "second-leg",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Packet {
    id: Id,

    pub source: Coord,
    pub destination: Coord,
    pub inflection: Coord,
    pub inflection_direction: Direction,

    /// The direction the packet was last sent in.
    pub direction: Direction,
    pub emergency_state: EmergencyState,

    /// Tick at which the packet entered the network.
    pub sent_tick: Tick,
    pub num_hops: u32,
    pub num_emergency_hops: u32,
}

impl Packet {
    /// Create a packet that is dimension-order routed from `source` to
    /// `destination` on a torus of `system_size`.
    ///
    /// The shortest path uses at most two axes. The packet travels along the
    /// first (in the order x, y, z) until the inflection point and along the
    /// second from there. Where the path uses a single axis (or none) the
    /// inflection point is the destination itself.
    #[must_use]
    pub fn dimension_order(
        id: Id,
        source: Coord,
        destination: Coord,
        system_size: Coord,
        now: Tick,
    ) -> Self {
        let v = shortest_vector(source, destination, system_size);
        let mut legs = [
            (v.x, Direction::East, Direction::West),
            (v.y, Direction::North, Direction::South),
            (v.z, Direction::SouthWest, Direction::NorthEast),
        ]
        .into_iter()
        .filter(|(hops, _, _)| *hops != 0)
        .map(|(hops, positive, negative)| {
            let direction = if hops > 0 { positive } else { negative };
            (hops.unsigned_abs(), direction)
        });

        let (direction, inflection, inflection_direction) = match (legs.next(), legs.next()) {
            (None, _) => (Direction::Local, destination, Direction::Local),
            (Some((_, first)), None) => (first, destination, Direction::Local),
            (Some((hops, first)), Some((_, second))) => {
                let mut inflection = source;
                for _ in 0..hops {
                    inflection = neighbour(inflection, first, system_size);
                }
                (first, inflection, second)
            }
        };

        Self {
            id,
            source,
            destination,
            inflection,
            inflection_direction,
            direction,
            emergency_state: EmergencyState::Normal,
            sent_tick: now,
            num_hops: 0,
            num_emergency_hops: 0,
        }
    }

    /// Hops remaining along the shortest path from `position`.
    #[must_use]
    pub fn distance_from(&self, position: Coord, system_size: Coord) -> i32 {
        shortest_vector(position, self.destination, system_size).magnitude()
    }

    /// The displacement of the complete route.
    #[must_use]
    pub fn route_vector(&self, system_size: Coord) -> CubeCoord {
        shortest_vector(self.source, self.destination, system_size)
    }
}

impl Identified for Packet {
    fn id(&self) -> Id {
        self.id
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "packet {} {}->{} via {} {}",
            self.id, self.source, self.destination, self.inflection, self.emergency_state
        )
    }
}

/// Handle of a packet held in a [`PacketArena`].
pub type PacketId = ArenaId;

/// Owner of every packet in flight.
pub type PacketArena = Arena<Packet>;

/// Access to the packets held within a simulation state.
pub trait PacketStore {
    fn packets(&self) -> &PacketArena;
    fn packets_mut(&mut self) -> &mut PacketArena;
}

impl PacketStore for PacketArena {
    fn packets(&self) -> &PacketArena {
        self
    }

    fn packets_mut(&mut self) -> &mut PacketArena {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_route() {
        let p = Packet::dimension_order(
            Id(3),
            Coord::new(0, 0),
            Coord::new(0, 2),
            Coord::new(5, 5),
            7,
        );
        assert_eq!(p.direction, Direction::North);
        assert_eq!(p.inflection, p.destination);
        assert_eq!(p.inflection_direction, Direction::Local);
        assert_eq!(p.sent_tick, 7);
        assert_eq!(p.id(), Id(3));
    }

    #[test]
    fn local_route() {
        let here = Coord::new(2, 2);
        let p = Packet::dimension_order(Id(1), here, here, Coord::new(5, 5), 0);
        assert_eq!(p.direction, Direction::Local);
        assert_eq!(p.inflection_direction, Direction::Local);
        assert_eq!(p.inflection, here);
        assert_eq!(p.distance_from(here, Coord::new(5, 5)), 0);
    }

    #[test]
    fn wrapped_inflection() {
        // West 1 then south-west 1 (through the x wrap)
        let size = Coord::new(5, 5);
        let p = Packet::dimension_order(Id(1), Coord::new(0, 0), Coord::new(3, 4), size, 0);
        assert_eq!(p.route_vector(size), CubeCoord::new(-1, 0, 1));
        assert_eq!(p.direction, Direction::West);
        assert_eq!(p.inflection, Coord::new(4, 0));
        assert_eq!(p.inflection_direction, Direction::SouthWest);
    }
}

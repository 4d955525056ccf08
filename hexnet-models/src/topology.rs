// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Coordinates and directions of a hexagonal torus.
//!
//! Chips sit on a `width × height` grid. Each chip has six neighbours:
//!
//! ```txt
//!          N     NE
//!           \   /
//!            \ /
//!     W ----- * ----- E
//!            / \
//!           /   \
//!         SW     S
//! ```
//!
//! where moving NE is the same as moving E then N. Displacements are held in
//! a redundant three-axis [`CubeCoord`] where `x` counts steps E, `y` counts
//! steps N and `z` counts steps SW. Because one step along each of the three
//! axes returns to the start, adding the same value to every component does
//! not change the displacement. [`canonicalize`] picks the representative
//! that uses the fewest hops.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Position of a chip, or the size of a system.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Raster index of this position in a system of `size`.
    #[must_use]
    pub fn index(&self, size: Coord) -> usize {
        (self.y * size.x + self.x) as usize
    }

    /// Inverse of [`Coord::index`].
    #[must_use]
    pub fn from_index(index: usize, size: Coord) -> Self {
        let width = size.x as usize;
        Self::new((index % width) as i32, (index / width) as i32)
    }

    /// Wrap this position onto a torus of `size`.
    #[must_use]
    pub fn wrap(&self, size: Coord) -> Self {
        Self::new(self.x.rem_euclid(size.x), self.y.rem_euclid(size.y))
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A displacement in the three-axis representation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CubeCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl CubeCoord {
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Number of hops needed to travel this displacement.
    ///
    /// Only meaningful for canonical values.
    #[must_use]
    pub fn magnitude(&self) -> i32 {
        self.x.abs() + self.y.abs() + self.z.abs()
    }

    /// Number of non-zero components.
    #[must_use]
    pub fn num_axes(&self) -> usize {
        [self.x, self.y, self.z].iter().filter(|c| **c != 0).count()
    }

    /// The equivalent two-axis displacement.
    #[must_use]
    pub fn to_coord(&self) -> Coord {
        Coord::new(self.x - self.z, self.y - self.z)
    }
}

impl From<Coord> for CubeCoord {
    fn from(coord: Coord) -> Self {
        Self::new(coord.x, coord.y, 0)
    }
}

impl fmt::Display for CubeCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Directions a packet can leave a router by.
///
/// The discriminants are the router output slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    East = 0,
    NorthEast = 1,
    North = 2,
    West = 3,
    SouthWest = 4,
    South = 5,

    /// The packet has arrived.
    Local = 6,
}

/// The six directions between chips in slot order.
pub const COMPASS: [Direction; 6] = [
    Direction::East,
    Direction::NorthEast,
    Direction::North,
    Direction::West,
    Direction::SouthWest,
    Direction::South,
];

/// Number of router output slots (the compass plus local).
pub const NUM_SLOTS: usize = 7;

impl Direction {
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0..=5 => Some(COMPASS[index]),
            6 => Some(Direction::Local),
            _ => None,
        }
    }

    /// Rotate 60° counter-clockwise. `Local` is unchanged.
    #[must_use]
    pub fn rotate_ccw(self) -> Self {
        match self {
            Direction::Local => Direction::Local,
            d => COMPASS[(d.index() + 1) % 6],
        }
    }

    /// Rotate 60° clockwise. `Local` is unchanged.
    #[must_use]
    pub fn rotate_cw(self) -> Self {
        match self {
            Direction::Local => Direction::Local,
            d => COMPASS[(d.index() + 5) % 6],
        }
    }

    /// Rotate 180°. `Local` is unchanged.
    #[must_use]
    pub fn opposite(self) -> Self {
        self.rotate_cw().rotate_cw().rotate_cw()
    }

    /// The displacement of one hop in this direction.
    #[must_use]
    pub fn unit_vector(self) -> Coord {
        match self {
            Direction::East => Coord::new(1, 0),
            Direction::NorthEast => Coord::new(1, 1),
            Direction::North => Coord::new(0, 1),
            Direction::West => Coord::new(-1, 0),
            Direction::SouthWest => Coord::new(-1, -1),
            Direction::South => Coord::new(0, -1),
            Direction::Local => Coord::new(0, 0),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::East => "E",
            Direction::NorthEast => "NE",
            Direction::North => "N",
            Direction::West => "W",
            Direction::SouthWest => "SW",
            Direction::South => "S",
            Direction::Local => "L",
        };
        f.write_str(name)
    }
}

/// Return the representative of `coord` with at least one zero component.
///
/// The median component is subtracted from all three which leaves the other
/// two with opposite signs (or zero).
#[must_use]
pub fn canonicalize(coord: CubeCoord) -> CubeCoord {
    let mut sorted = [coord.x, coord.y, coord.z];
    sorted.sort_unstable();
    let median = sorted[1];
    CubeCoord::new(coord.x - median, coord.y - median, coord.z - median)
}

/// The chip one hop from `position` in `direction` on a torus of `size`.
#[must_use]
pub fn neighbour(position: Coord, direction: Direction, size: Coord) -> Coord {
    let step = direction.unit_vector();
    Coord::new(position.x + step.x, position.y + step.y).wrap(size)
}

/// The canonical displacement of fewest hops from `from` to `to` on a torus
/// of `size`.
///
/// Each of the four combinations of wrapping or not in x and y is tried.
/// Ties are broken in favour of the displacement that uses fewer axes and
/// then of the earlier candidate.
#[must_use]
pub fn shortest_vector(from: Coord, to: Coord, size: Coord) -> CubeCoord {
    let dx = (to.x - from.x).rem_euclid(size.x);
    let dy = (to.y - from.y).rem_euclid(size.y);

    let candidates = [
        Coord::new(dx, dy),
        Coord::new(dx - size.x, dy),
        Coord::new(dx, dy - size.y),
        Coord::new(dx - size.x, dy - size.y),
    ];

    candidates
        .into_iter()
        .map(|c| canonicalize(CubeCoord::from(c)))
        .min_by_key(|v| (v.magnitude(), v.num_axes()))
        .unwrap_or_default()
}

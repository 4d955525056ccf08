// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Id

/// IDs that should be unique across the simulation
///
/// Each tracked object within the application is given a unique ID. There
/// are two reserved values: [NO_ID](crate::NO_ID) and [ROOT](crate::ROOT).
#[derive(Copy, Clone, Default, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Id(pub u64);

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Debug for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The `Identified` trait provides the ID used when tracking an object.
pub trait Identified {
    /// Return the unique ID for an object. This is used in logging.
    fn id(&self) -> Id;
}

impl Identified for Id {
    fn id(&self) -> Id {
        *self
    }
}

impl Identified for usize {
    fn id(&self) -> Id {
        Id(*self as u64)
    }
}

impl Identified for u64 {
    fn id(&self) -> Id {
        Id(*self)
    }
}

// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! An arena of values addressed by generational handles.
//!
//! Packets live here while they are in flight. Queues only carry the
//! [`ArenaId`] so moving a packet between queues never copies it. Slots are
//! reused once freed; the generation stored in each handle detects use of a
//! handle after its value has been removed.

use std::fmt;

/// Handle to a value held in an [`Arena`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArenaId {
    index: u32,
    generation: u32,
}

impl fmt::Debug for ArenaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.index, self.generation)
    }
}

impl fmt::Display for ArenaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Owner of in-flight values.
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }
}

impl<T> Arena<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value and return its handle.
    pub fn insert(&mut self, value: T) -> ArenaId {
        self.live += 1;
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.value = Some(value);
                ArenaId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    value: Some(value),
                });
                ArenaId {
                    index,
                    generation: 0,
                }
            }
        }
    }

    /// Remove a value, releasing its slot for reuse.
    ///
    /// # Panics
    ///
    /// If `id` has already been removed.
    pub fn remove(&mut self, id: ArenaId) -> T {
        let slot = self.live_slot_mut(id);
        let value = match slot.value.take() {
            Some(value) => value,
            None => panic!("arena: access to released {id:?}"),
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        value
    }

    /// Whether `id` refers to a value that is still held.
    #[must_use]
    pub fn contains(&self, id: ArenaId) -> bool {
        self.slots
            .get(id.index as usize)
            .is_some_and(|slot| slot.generation == id.generation && slot.value.is_some())
    }

    /// # Panics
    ///
    /// If `id` has been removed.
    #[must_use]
    pub fn get(&self, id: ArenaId) -> &T {
        match self.slots.get(id.index as usize) {
            Some(Slot {
                generation,
                value: Some(value),
            }) if *generation == id.generation => value,
            _ => panic!("arena: access to released {id:?}"),
        }
    }

    /// # Panics
    ///
    /// If `id` has been removed.
    pub fn get_mut(&mut self, id: ArenaId) -> &mut T {
        match self.live_slot_mut(id).value.as_mut() {
            Some(value) => value,
            None => panic!("arena: access to released {id:?}"),
        }
    }

    fn live_slot_mut(&mut self, id: ArenaId) -> &mut Slot<T> {
        match self.slots.get_mut(id.index as usize) {
            Some(slot) if slot.generation == id.generation => slot,
            _ => panic!("arena: access to released {id:?}"),
        }
    }

    /// Number of values currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterate over all values currently held.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(|slot| slot.value.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_remove() {
        let mut arena = Arena::new();
        let a = arena.insert("a");
        let b = arena.insert("b");
        assert_eq!(arena.len(), 2);
        assert_eq!(*arena.get(a), "a");
        assert_eq!(arena.remove(b), "b");
        assert!(!arena.contains(b));
        assert!(arena.contains(a));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn slots_are_reused() {
        let mut arena = Arena::new();
        let a = arena.insert(1);
        arena.remove(a);
        let b = arena.insert(2);
        assert_ne!(a, b);
        assert_eq!(*arena.get(b), 2);
        assert_eq!(arena.iter().count(), 1);
    }

    #[test]
    #[should_panic(expected = "access to released")]
    fn stale_handle() {
        let mut arena = Arena::new();
        let a = arena.insert(1);
        arena.remove(a);
        arena.insert(2);
        let _ = arena.get(a);
    }

    #[test]
    #[should_panic(expected = "access to released")]
    fn double_remove() {
        let mut arena = Arena::new();
        let a = arena.insert(1);
        arena.remove(a);
        arena.remove(a);
    }
}

//! Generational arena for game objects.
//!
//! The object world hands out [`ObjectId`] handles instead of references:
//! level cells, physics metadata, reservations, and timers all refer to
//! objects through handles, and a handle outliving its object resolves to
//! `None` instead of dangling. Exactly one level cell owns each live id
//! through its `here` slot; everything else is a non-owning observer.

use std::fmt;

/// Generational handle to an object stored in an [`ObjectArena`].
///
/// A handle is valid until its object is removed; afterwards lookups
/// return `None`, even if the slot has been reused (the generation
/// differs).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectId {
    index: u32,
    generation: u32,
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// A slot in the arena: either occupied by a value or free.
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Generational slot map owning all game objects of a level.
pub struct ObjectArena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> ObjectArena<T> {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the arena holds no live objects.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a value and return its handle.
    pub fn insert(&mut self, value: T) -> ObjectId {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.value.is_none());
            slot.value = Some(value);
            ObjectId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = u32::try_from(self.slots.len()).expect("arena slot count overflow");
            self.slots.push(Slot {
                generation: 0,
                value: Some(value),
            });
            ObjectId {
                index,
                generation: 0,
            }
        }
    }

    /// Look up a handle.
    pub fn get(&self, id: ObjectId) -> Option<&T> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    /// Look up a handle mutably.
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut T> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    /// Whether the handle refers to a live object.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }

    /// Iterate over all live objects with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                (
                    ObjectId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    value,
                )
            })
        })
    }

    /// Remove an object, invalidating its handle.
    ///
    /// Returns the value, or `None` if the handle was already stale.
    pub fn remove(&mut self, id: ObjectId) -> Option<T> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        Some(value)
    }
}

impl<T> Default for ObjectArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let mut arena = ObjectArena::new();
        let id = arena.insert("rock");
        assert_eq!(arena.get(id), Some(&"rock"));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn remove_invalidates_handle() {
        let mut arena = ObjectArena::new();
        let id = arena.insert(7u32);
        assert_eq!(arena.remove(id), Some(7));
        assert!(!arena.contains(id));
        assert_eq!(arena.remove(id), None);
        assert!(arena.is_empty());
    }

    #[test]
    fn reused_slot_gets_fresh_generation() {
        let mut arena = ObjectArena::new();
        let a = arena.insert(1u32);
        arena.remove(a);
        let b = arena.insert(2u32);
        // Same slot, different generation: the stale handle stays dead.
        assert_ne!(a, b);
        assert_eq!(arena.get(a), None);
        assert_eq!(arena.get(b), Some(&2));
    }

    #[test]
    fn get_mut_mutates_in_place() {
        let mut arena = ObjectArena::new();
        let id = arena.insert(0u32);
        *arena.get_mut(id).unwrap() = 9;
        assert_eq!(arena.get(id), Some(&9));
    }
}

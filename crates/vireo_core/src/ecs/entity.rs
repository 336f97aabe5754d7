//! # Entity Management
//!
//! Entities are plain integer keys into component arrays. They carry no data
//! of their own; everything an entity "is" lives in the components it owns.
//!
//! Identifiers are recycled through a LIFO free stack: the most recently
//! destroyed identifier is the next one handed out.

use std::fmt;

/// Unique identifier for an entity.
///
/// A live identifier is always smaller than the manager's `max_entities`.
/// [`EntityId::INVALID`] (the maximum `u32`) is never issued.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct EntityId(u32);

impl EntityId {
    /// Sentinel returned when no entity could be produced.
    pub const INVALID: Self = Self(u32::MAX);

    /// Wraps a raw identifier.
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw integer value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns the identifier as a table index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Checks if this is anything other than [`EntityId::INVALID`].
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != u32::MAX
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "#{}", self.0)
        } else {
            f.write_str("#invalid")
        }
    }
}

/// Issues and recycles entity identifiers from a fixed range.
///
/// All memory is allocated in [`EntityAllocator::new`]; allocating and
/// freeing never touch the heap afterwards.
#[derive(Debug)]
pub struct EntityAllocator {
    /// Free identifiers. The top of the stack is reused first.
    free: Vec<EntityId>,
    /// Liveness flag per identifier.
    alive: Box<[bool]>,
    /// Number of live identifiers.
    alive_count: usize,
}

impl EntityAllocator {
    /// Creates an allocator for identifiers `0..capacity`.
    ///
    /// The first allocations return `0, 1, 2, ...` in order.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` does not fit below [`EntityId::INVALID`].
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(
            capacity < u32::MAX as usize,
            "entity capacity must be below the invalid sentinel"
        );

        let mut allocator = Self {
            free: Vec::with_capacity(capacity),
            alive: vec![false; capacity].into_boxed_slice(),
            alive_count: 0,
        };
        allocator.reset();
        allocator
    }

    /// Total number of identifiers this allocator manages.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.alive.len()
    }

    /// Number of identifiers currently handed out.
    #[inline]
    #[must_use]
    pub const fn alive_count(&self) -> usize {
        self.alive_count
    }

    /// Number of identifiers still available.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Pops the next free identifier, or `None` when the budget is exhausted.
    #[inline]
    pub fn allocate(&mut self) -> Option<EntityId> {
        let id = self.free.pop()?;
        self.alive[id.index()] = true;
        self.alive_count += 1;
        Some(id)
    }

    /// Returns an identifier to the free stack.
    ///
    /// Returns `false` if the identifier is out of range or not alive, which
    /// makes double frees harmless.
    #[inline]
    pub fn free(&mut self, id: EntityId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        self.alive[id.index()] = false;
        self.alive_count -= 1;
        self.free.push(id);
        true
    }

    /// Checks if an identifier is currently handed out.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.alive.get(id.index()).copied().unwrap_or(false)
    }

    /// Marks every identifier free again and rebuilds the stack to the full range.
    #[allow(clippy::cast_possible_truncation)]
    pub fn reset(&mut self) {
        let capacity = self.capacity();
        self.alive.fill(false);
        self.alive_count = 0;
        self.free.clear();
        // Reversed so that `pop` yields the lowest identifier first.
        self.free
            .extend((0..capacity).rev().map(|raw| EntityId::new(raw as u32)));
    }

    /// Iterates over live identifiers in ascending order.
    #[allow(clippy::cast_possible_truncation)]
    pub fn iter_alive(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter(|(_, alive)| **alive)
            .map(|(raw, _)| EntityId::new(raw as u32))
    }
}

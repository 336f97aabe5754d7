//! # Component Storage
//!
//! Sparse-set storage for a single component type.
//!
//! The storage keeps three parallel tables:
//! - `data`: the components, densely packed (no holes)
//! - `dense_to_entity`: the owning entity of each dense slot
//! - `entity_to_dense`: entity id -> dense slot, or [`ABSENT`]
//!
//! Insertion appends, removal moves the last element into the freed slot.
//! Both are O(1) and neither reallocates: all tables are sized for
//! `max_entities` at creation.
//!
//! ## Removing while iterating
//!
//! Removal swaps the last element into the removed slot. A forward scan that
//! removes the element at `i` will then either skip the element moved into
//! `i` or, if it keeps going, see it twice. This is a hard contract: code that
//! deletes while scanning must walk the dense array **backward**
//! (see `EntityManager::remove_components_where`) or collect the doomed
//! entities first and remove them after the scan.

use std::any::Any;

use bytemuck::Pod;

use super::component::Component;
use super::entity::EntityId;

/// Sparse-table sentinel for "no component".
pub const ABSENT: u32 = u32::MAX;

/// Packed array of one component type plus its entity index.
///
/// Membership changes (insert/remove) go through `EntityManager`, which keeps
/// its own type-erased lookup table in sync. Systems get `&mut` access to the
/// component values only.
///
/// # Example
///
/// ```rust,ignore
/// let transforms = manager.component_array_mut::<Transform>().unwrap();
/// for transform in transforms.data_mut() {
///     transform.mark_dirty();
/// }
/// ```
#[derive(Debug)]
pub struct ComponentArray<T> {
    /// Dense component values.
    data: Vec<T>,
    /// Dense slot -> owning entity.
    dense_to_entity: Vec<EntityId>,
    /// Entity id -> dense slot.
    entity_to_dense: Box<[u32]>,
}

/// What a removal took out of the array.
#[derive(Debug)]
pub(crate) struct RemovedSlot<T> {
    /// The removed component.
    pub value: T,
    /// Entity that owned it.
    pub entity: EntityId,
    /// Entity whose component now occupies the freed slot, if any.
    pub moved: Option<EntityId>,
}

impl<T> ComponentArray<T> {
    /// Creates an empty array able to hold one component per entity id in
    /// `0..max_entities`.
    #[must_use]
    pub fn new(max_entities: usize) -> Self {
        Self {
            data: Vec::with_capacity(max_entities),
            dense_to_entity: Vec::with_capacity(max_entities),
            entity_to_dense: vec![ABSENT; max_entities].into_boxed_slice(),
        }
    }

    /// Maximum number of entities this array can index.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entity_to_dense.len()
    }

    /// Number of live components.
    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.data.len()
    }

    /// Checks if the array holds no components.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Checks if `dense_index` addresses a live slot.
    #[inline]
    #[must_use]
    pub fn has_slot(&self, dense_index: usize) -> bool {
        dense_index < self.data.len()
    }

    /// Checks if `entity` owns a component in this array.
    #[inline]
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.dense_index_of(entity).is_some()
    }

    /// Dense slot of `entity`'s component.
    #[inline]
    #[must_use]
    pub fn dense_index_of(&self, entity: EntityId) -> Option<usize> {
        match self.entity_to_dense.get(entity.index()) {
            Some(&slot) if slot != ABSENT => Some(slot as usize),
            _ => None,
        }
    }

    /// Dense component values. `data()[i]` belongs to `index()[i]`.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Mutable dense component values.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Owning entity of every dense slot.
    #[inline]
    #[must_use]
    pub fn index(&self) -> &[EntityId] {
        &self.dense_to_entity
    }

    /// Component owned by `entity`.
    #[inline]
    #[must_use]
    pub fn get(&self, entity: EntityId) -> Option<&T> {
        let slot = self.dense_index_of(entity)?;
        Some(&self.data[slot])
    }

    /// Mutable component owned by `entity`.
    #[inline]
    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        let slot = self.dense_index_of(entity)?;
        Some(&mut self.data[slot])
    }

    /// Iterates `(entity, component)` in dense order.
    ///
    /// The order is unspecified but stable until the next insert or removal.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.dense_to_entity.iter().copied().zip(self.data.iter())
    }

    /// Iterates `(entity, component)` mutably in dense order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.dense_to_entity.iter().copied().zip(self.data.iter_mut())
    }

    /// Verifies that the sparse and dense tables mirror each other.
    ///
    /// Holds when every dense slot `i` satisfies
    /// `entity_to_dense[dense_to_entity[i]] == i` and no other sparse entry is
    /// set.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        if self.dense_to_entity.len() != self.data.len() {
            return false;
        }
        let linked = self
            .dense_to_entity
            .iter()
            .enumerate()
            .all(|(slot, entity)| self.dense_index_of(*entity) == Some(slot));
        let occupied = self.entity_to_dense.iter().filter(|&&s| s != ABSENT).count();
        linked && occupied == self.data.len()
    }

    /// Appends a component for `entity`.
    ///
    /// Returns the new dense slot, or `None` if the entity is out of range or
    /// already owns a component here.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn insert(&mut self, entity: EntityId, value: T) -> Option<usize> {
        let slot = self.entity_to_dense.get_mut(entity.index())?;
        if *slot != ABSENT {
            return None;
        }

        let dense = self.data.len();
        *slot = dense as u32;
        self.data.push(value);
        self.dense_to_entity.push(entity);
        Some(dense)
    }

    /// Removes the component in `dense_index`, moving the last one into it.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn remove(&mut self, dense_index: usize) -> Option<RemovedSlot<T>> {
        if dense_index >= self.data.len() {
            return None;
        }

        let last = self.data.len() - 1;
        let value = self.data.swap_remove(dense_index);
        let entity = self.dense_to_entity.swap_remove(dense_index);
        self.entity_to_dense[entity.index()] = ABSENT;

        let moved = (dense_index != last).then(|| {
            let moved = self.dense_to_entity[dense_index];
            self.entity_to_dense[moved.index()] = dense_index as u32;
            moved
        });

        Some(RemovedSlot {
            value,
            entity,
            moved,
        })
    }

    /// Drops every component and resets the sparse table.
    pub(crate) fn clear(&mut self) {
        for entity in &self.dense_to_entity {
            self.entity_to_dense[entity.index()] = ABSENT;
        }
        self.data.clear();
        self.dense_to_entity.clear();
    }
}

impl<T: Pod> ComponentArray<T> {
    /// Dense component values as raw bytes, ready for a GPU buffer upload.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }
}

/// Outcome of a type-erased removal.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ErasedRemoval {
    /// Entity whose component was dropped.
    pub entity: EntityId,
    /// Entity whose component now occupies the freed slot, if any.
    pub moved: Option<EntityId>,
}

/// Type-erased view of a `ComponentArray<T>` used by the manager for
/// whole-entity operations (destroy, clear) without knowing `T`.
pub(crate) trait ErasedComponentArray: Send + Sync {
    /// Drops the component in `dense_index`.
    fn remove_dense(&mut self, dense_index: usize) -> Option<ErasedRemoval>;
    /// Drops every component.
    fn clear_all(&mut self);
    /// Number of live components.
    fn len(&self) -> usize;
    /// Name of the stored component type.
    fn component_name(&self) -> &'static str;
    /// Upcast for downcasting to the concrete array.
    fn as_any(&self) -> &dyn Any;
    /// Mutable upcast for downcasting to the concrete array.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedComponentArray for ComponentArray<T> {
    fn remove_dense(&mut self, dense_index: usize) -> Option<ErasedRemoval> {
        self.remove(dense_index).map(|removed| ErasedRemoval {
            entity: removed.entity,
            moved: removed.moved,
        })
    }

    fn clear_all(&mut self) {
        self.clear();
    }

    fn len(&self) -> usize {
        self.count()
    }

    fn component_name(&self) -> &'static str {
        T::type_name()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u32) -> EntityId {
        EntityId::new(raw)
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut array: ComponentArray<f32> = ComponentArray::new(16);
        assert_eq!(array.insert(id(4), 1.5), Some(0));
        assert_eq!(array.insert(id(9), 2.5), Some(1));

        assert_eq!(array.count(), 2);
        assert_eq!(array.get(id(9)), Some(&2.5));
        assert_eq!(array.index(), &[id(4), id(9)]);
        assert!(array.get(id(5)).is_none());
        assert!(array.is_consistent());
    }

    #[test]
    fn test_insert_rejects_duplicates_and_out_of_range() {
        let mut array: ComponentArray<u8> = ComponentArray::new(4);
        assert!(array.insert(id(1), 1).is_some());
        assert!(array.insert(id(1), 2).is_none());
        assert!(array.insert(id(4), 3).is_none());
        assert_eq!(array.get(id(1)), Some(&1));
        assert_eq!(array.count(), 1);
    }

    #[test]
    fn test_remove_swaps_last_into_hole() {
        let mut array: ComponentArray<u32> = ComponentArray::new(8);
        for raw in 0..4 {
            array.insert(id(raw), raw * 10);
        }

        let removed = array.remove(1).unwrap();
        assert_eq!(removed.value, 10);
        assert_eq!(removed.entity, id(1));
        assert_eq!(removed.moved, Some(id(3)));

        assert_eq!(array.data(), &[0, 30, 20]);
        assert_eq!(array.dense_index_of(id(3)), Some(1));
        assert!(!array.contains(id(1)));
        assert!(array.is_consistent());
    }

    #[test]
    fn test_remove_last_moves_nothing() {
        let mut array: ComponentArray<u32> = ComponentArray::new(4);
        array.insert(id(0), 1);
        array.insert(id(1), 2);

        let removed = array.remove(1).unwrap();
        assert!(removed.moved.is_none());
        assert!(array.remove(5).is_none());
        assert!(array.is_consistent());
    }

    #[test]
    fn test_clear_resets_sparse_table() {
        let mut array: ComponentArray<u32> = ComponentArray::new(4);
        array.insert(id(2), 1);
        array.insert(id(3), 2);
        array.clear();

        assert!(array.is_empty());
        assert!(!array.contains(id(2)));
        assert!(array.is_consistent());
        assert_eq!(array.insert(id(3), 7), Some(0));
    }

    #[test]
    fn test_as_bytes_covers_dense_slice() {
        let mut array: ComponentArray<[f32; 2]> = ComponentArray::new(4);
        array.insert(id(0), [1.0, 2.0]);
        array.insert(id(1), [3.0, 4.0]);
        assert_eq!(array.as_bytes().len(), 16);
    }
}

//! # Type Registry
//!
//! Assigns every distinct component type and every distinct system type a
//! small, stable integer the first time it is seen.
//!
//! This is the only module holding process-wide mutable state. Indices come
//! from atomic counters and the `TypeId -> index` tables are guarded by
//! read-write locks, so first use from several threads is race-free. Each
//! thread keeps its own copy of the entries it has already looked up, so
//! steady-state lookups take no lock. Indices live for the whole process and
//! are never persisted.

use std::any::{type_name, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::thread::LocalKey;

use parking_lot::RwLock;

/// Index of a component type inside every `EntityManager`.
///
/// Used to address the manager's component-array table and its flat
/// `entity x type` lookup table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeIndex(usize);

impl ComponentTypeIndex {
    /// Returns the raw index.
    #[inline]
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for ComponentTypeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component#{}", self.0)
    }
}

/// Identifies a concrete system type.
///
/// Two registrations of the same concrete type share an id, which is how
/// duplicate registration inside a stage is detected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemTypeId(usize);

impl SystemTypeId {
    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for SystemTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "system#{}", self.0)
    }
}

/// A monotonically increasing counter plus the table of indices it has issued.
struct TypeTable {
    indices: RwLock<HashMap<TypeId, usize>>,
    next: AtomicUsize,
}

impl TypeTable {
    fn new() -> Self {
        Self {
            indices: RwLock::new(HashMap::new()),
            next: AtomicUsize::new(0),
        }
    }

    fn index_of(&self, type_id: TypeId, name: &'static str) -> usize {
        if let Some(&index) = self.indices.read().get(&type_id) {
            return index;
        }

        // Another thread may have inserted between the two locks; the entry
        // API keeps the first index it issued.
        let mut indices = self.indices.write();
        *indices.entry(type_id).or_insert_with(|| {
            let index = self.next.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(index, name, "assigned type index");
            index
        })
    }

    fn issued(&self) -> usize {
        self.next.load(Ordering::Relaxed)
    }
}

type LocalCache = RefCell<HashMap<TypeId, usize>>;

thread_local! {
    static COMPONENT_CACHE: LocalCache = RefCell::new(HashMap::new());
    static SYSTEM_CACHE: LocalCache = RefCell::new(HashMap::new());
}

/// Answers from this thread's cache, falling back to the shared table once
/// per type and thread.
fn cached_index(
    cache: &'static LocalKey<LocalCache>,
    table: &TypeTable,
    type_id: TypeId,
    name: &'static str,
) -> usize {
    if let Some(index) = cache.with(|cache| cache.borrow().get(&type_id).copied()) {
        return index;
    }
    let index = table.index_of(type_id, name);
    cache.with(|cache| cache.borrow_mut().insert(type_id, index));
    index
}

fn component_table() -> &'static TypeTable {
    static TABLE: OnceLock<TypeTable> = OnceLock::new();
    TABLE.get_or_init(TypeTable::new)
}

fn system_table() -> &'static TypeTable {
    static TABLE: OnceLock<TypeTable> = OnceLock::new();
    TABLE.get_or_init(TypeTable::new)
}

/// Returns the index of component type `T`, assigning one on first use.
#[must_use]
pub fn component_type_index<T: 'static>() -> ComponentTypeIndex {
    ComponentTypeIndex(cached_index(
        &COMPONENT_CACHE,
        component_table(),
        TypeId::of::<T>(),
        type_name::<T>(),
    ))
}

/// Returns the id of system type `S`, assigning one on first use.
#[must_use]
pub fn system_type_id<S: 'static>() -> SystemTypeId {
    SystemTypeId(cached_index(
        &SYSTEM_CACHE,
        system_table(),
        TypeId::of::<S>(),
        type_name::<S>(),
    ))
}

/// Number of component type indices issued so far in this process.
#[must_use]
pub fn registered_component_types() -> usize {
    component_table().issued()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Alpha;
    struct Beta;

    #[test]
    fn test_component_index_is_stable() {
        let first = component_type_index::<Alpha>();
        let again = component_type_index::<Alpha>();
        assert_eq!(first, again);
        assert_ne!(first, component_type_index::<Beta>());
    }

    #[test]
    fn test_system_ids_are_independent_of_component_indices() {
        let system = system_type_id::<Alpha>();
        assert_eq!(system, system_type_id::<Alpha>());
        assert_ne!(system, system_type_id::<Beta>());
    }

    #[test]
    fn test_repeat_lookup_served_from_thread_cache() {
        struct Delta;

        let index = component_type_index::<Delta>();
        let cached = COMPONENT_CACHE.with(|cache| cache.borrow().get(&TypeId::of::<Delta>()).copied());
        assert_eq!(cached, Some(index.get()));

        let shared = *component_table().indices.read().get(&TypeId::of::<Delta>()).unwrap();
        assert_eq!(shared, index.get());
        assert_eq!(component_type_index::<Delta>(), index);
    }

    #[test]
    fn test_concurrent_first_use_agrees() {
        struct Gamma;

        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(component_type_index::<Gamma>))
            .collect();
        let indices: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(indices.windows(2).all(|pair| pair[0] == pair[1]));
        assert!(registered_component_types() > indices[0].get());
    }
}

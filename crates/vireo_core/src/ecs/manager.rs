//! # Entity Manager
//!
//! The central owner of entities, component storage and the system registry.
//! All tables are sized once by [`EntityManager::initialize`]; nothing grows
//! afterwards.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ EntityManager                                                │
//! │                                                              │
//! │  allocator: LIFO free stack of EntityId                      │
//! │                                                              │
//! │  component_indices: [max_entities x max_component_types]     │
//! │    row = entity, column = ComponentTypeIndex                 │
//! │    cell = dense slot in that type's array, or ABSENT         │
//! │                                                              │
//! │  component_arrays: [max_component_types]                     │
//! │    Option<Box<dyn ErasedComponentArray>>                     │
//! │                                                              │
//! │  systems: [SystemStage::COUNT] x Vec<RegisteredSystem>       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The manager never runs systems itself. A driver takes a stage's systems
//! out with [`EntityManager::take_stage_systems`], updates them against the
//! manager, and puts them back with [`EntityManager::restore_stage_systems`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error, warn};

use crate::config::EcsConfig;
use crate::error::{EcsError, EcsResult};

use super::component::Component;
use super::entity::{EntityAllocator, EntityId};
use super::registry::{component_type_index, system_type_id, ComponentTypeIndex, SystemTypeId};
use super::storage::{ComponentArray, ErasedComponentArray, ABSENT};
use super::system::{CpuSystem, GpuSystem, RegisteredSystem, SystemEntry, SystemStage};

type ArraySlot = Option<Box<dyn ErasedComponentArray>>;

/// Owner of all entities, component arrays and registered systems.
///
/// # Example
///
/// ```rust,ignore
/// let mut manager = EntityManager::with_capacity(10_000, 32)?;
///
/// let id = manager.create_entity();
/// manager.add_component(id, Transform::from_position(Vec3::ZERO))?;
/// manager.register_cpu_system(TransformSystem::new())?;
/// ```
pub struct EntityManager {
    allocator: EntityAllocator,
    /// Width of the flat lookup table.
    max_component_types: usize,
    /// `entity x type -> dense slot` mirror of every array's sparse table.
    component_indices: Box<[u32]>,
    /// One array per component type index.
    component_arrays: Vec<ArraySlot>,
    /// Registered systems per stage, in registration order.
    systems: [Vec<RegisteredSystem>; SystemStage::COUNT],
    initialized: bool,
}

impl EntityManager {
    /// Creates a manager with no storage.
    ///
    /// Every entity operation fails until [`EntityManager::initialize`] runs.
    #[must_use]
    pub fn new() -> Self {
        Self {
            allocator: EntityAllocator::new(0),
            max_component_types: 0,
            component_indices: Box::default(),
            component_arrays: Vec::new(),
            systems: std::array::from_fn(|_| Vec::new()),
            initialized: false,
        }
    }

    /// Creates and initializes a manager in one step.
    ///
    /// # Errors
    ///
    /// See [`EntityManager::initialize`].
    pub fn with_capacity(max_entities: usize, max_component_types: usize) -> EcsResult<Self> {
        let mut manager = Self::new();
        manager.initialize(max_entities, max_component_types)?;
        Ok(manager)
    }

    /// Creates and initializes a manager from configuration.
    ///
    /// # Errors
    ///
    /// See [`EntityManager::initialize`].
    pub fn from_config(config: &EcsConfig) -> EcsResult<Self> {
        Self::with_capacity(config.max_entities, config.max_component_types)
    }

    /// Sizes every table. May only run once per manager.
    ///
    /// # Errors
    ///
    /// - [`EcsError::AlreadyInitialized`] on a second call
    /// - [`EcsError::InvalidCapacity`] if a capacity is zero, if
    ///   `max_entities` collides with the invalid-id sentinel, or if the
    ///   lookup table would overflow
    pub fn initialize(&mut self, max_entities: usize, max_component_types: usize) -> EcsResult<()> {
        if self.initialized {
            return Err(EcsError::AlreadyInitialized);
        }
        if max_entities == 0 || max_entities >= EntityId::INVALID.index() {
            return Err(EcsError::InvalidCapacity(format!(
                "max_entities must be in 1..{}, got {max_entities}",
                EntityId::INVALID.raw()
            )));
        }
        if max_component_types == 0 {
            return Err(EcsError::InvalidCapacity(
                "max_component_types must be greater than zero".to_owned(),
            ));
        }
        let cells = max_entities.checked_mul(max_component_types).ok_or_else(|| {
            EcsError::InvalidCapacity(format!(
                "{max_entities} entities x {max_component_types} component types overflows"
            ))
        })?;

        self.allocator = EntityAllocator::new(max_entities);
        self.max_component_types = max_component_types;
        self.component_indices = vec![ABSENT; cells].into_boxed_slice();
        self.component_arrays = (0..max_component_types).map(|_| None).collect();
        self.initialized = true;

        debug!(max_entities, max_component_types, "entity manager initialized");
        Ok(())
    }

    /// Checks if [`EntityManager::initialize`] has run.
    #[inline]
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Maximum number of simultaneously live entities.
    #[inline]
    #[must_use]
    pub fn max_entities(&self) -> usize {
        self.allocator.capacity()
    }

    /// Maximum number of component types.
    #[inline]
    #[must_use]
    pub const fn max_component_types(&self) -> usize {
        self.max_component_types
    }

    /// Number of live entities.
    #[inline]
    #[must_use]
    pub const fn alive_count(&self) -> usize {
        self.allocator.alive_count()
    }

    /// Checks if `id` is a live entity.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.allocator.is_alive(id)
    }

    /// Iterates over live entities in ascending id order.
    pub fn iter_alive(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.allocator.iter_alive()
    }

    // ── Entities ─────────────────────────────────────────────────────

    /// Creates an entity, or returns [`EntityId::INVALID`] when the entity
    /// budget is exhausted.
    pub fn create_entity(&mut self) -> EntityId {
        self.try_create_entity().unwrap_or(EntityId::INVALID)
    }

    /// Creates an entity.
    ///
    /// The new entity owns no components.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityBudgetExhausted`] when every id is in use.
    pub fn try_create_entity(&mut self) -> EcsResult<EntityId> {
        let Some(id) = self.allocator.allocate() else {
            let capacity = self.allocator.capacity();
            error!(capacity, "entity budget exhausted");
            return Err(EcsError::EntityBudgetExhausted { capacity });
        };

        let row = self.row_range(id);
        self.component_indices[row].fill(ABSENT);
        Ok(id)
    }

    /// Destroys an entity and every component it owns.
    ///
    /// The id becomes the next one handed out by [`EntityManager::create_entity`].
    ///
    /// # Errors
    ///
    /// [`EcsError::WrongEntityId`] if `id` is out of range, already destroyed
    /// or never created.
    pub fn destroy_entity(&mut self, id: EntityId) -> EcsResult<()> {
        if !self.allocator.is_alive(id) {
            warn!(entity = %id, "destroy of unknown entity");
            return Err(EcsError::WrongEntityId(id));
        }

        let stride = self.max_component_types;
        for column in 0..stride {
            let cell = id.index() * stride + column;
            let dense = self.component_indices[cell];
            if dense == ABSENT {
                continue;
            }

            let removal = self.component_arrays[column]
                .as_mut()
                .and_then(|array| array.remove_dense(dense as usize));
            match removal {
                Some(removal) if removal.entity == id => {
                    unlink(&mut self.component_indices, stride, column, id, dense, removal.moved);
                }
                _ => {
                    error!(entity = %id, column, dense, "component index out of sync");
                    self.component_indices[cell] = ABSENT;
                }
            }
        }

        self.allocator.free(id);
        Ok(())
    }

    /// Removes every entity and component, keeping capacities and systems.
    ///
    /// Used when a scenario is reloaded without rebuilding the manager.
    pub fn clear_all_entities(&mut self) {
        for array in self.component_arrays.iter_mut().flatten() {
            debug!(
                component = array.component_name(),
                count = array.len(),
                "clearing component array"
            );
            array.clear_all();
        }
        self.component_indices.fill(ABSENT);
        self.allocator.reset();
    }

    // ── Components ───────────────────────────────────────────────────

    /// Creates `T`'s array ahead of first use and returns its type index.
    ///
    /// # Errors
    ///
    /// [`EcsError::ComponentTypeBudgetExhausted`] if `T`'s index does not fit.
    pub fn register_component<T: Component>(&mut self) -> EcsResult<ComponentTypeIndex> {
        let column = self.column_of::<T>()?;
        self.array_or_create::<T>(column)?;
        Ok(component_type_index::<T>())
    }

    /// Attaches `value` to entity `id`.
    ///
    /// # Errors
    ///
    /// - [`EcsError::WrongEntityId`] if `id` is not alive
    /// - [`EcsError::ComponentTypeBudgetExhausted`] if `T` has no column
    /// - [`EcsError::ComponentAlreadyPresent`] if `id` already owns a `T`;
    ///   the stored component is left untouched
    pub fn add_component<T: Component>(&mut self, id: EntityId, value: T) -> EcsResult<()> {
        if !self.allocator.is_alive(id) {
            return Err(EcsError::WrongEntityId(id));
        }
        let column = self.column_of::<T>()?;
        let array = self.array_or_create::<T>(column)?;

        let Some(dense) = array.insert(id, value) else {
            warn!(entity = %id, component = T::type_name(), "component already present");
            return Err(EcsError::ComponentAlreadyPresent {
                entity: id,
                component: T::type_name(),
            });
        };

        #[allow(clippy::cast_possible_truncation)]
        let dense = dense as u32;
        self.component_indices[id.index() * self.max_component_types + column] = dense;
        Ok(())
    }

    /// Detaches and returns entity `id`'s `T`.
    ///
    /// # Errors
    ///
    /// - [`EcsError::WrongEntityId`] if `id` is not alive
    /// - [`EcsError::ComponentMissing`] if `id` owns no `T`
    pub fn remove_component<T: Component>(&mut self, id: EntityId) -> EcsResult<T> {
        if !self.allocator.is_alive(id) {
            return Err(EcsError::WrongEntityId(id));
        }
        let missing = EcsError::ComponentMissing {
            entity: id,
            component: T::type_name(),
        };
        let Ok(column) = self.column_of::<T>() else {
            return Err(missing);
        };

        let stride = self.max_component_types;
        let Some(array) = downcast_mut::<T>(&mut self.component_arrays[column]) else {
            return Err(missing);
        };
        let Some(dense) = array.dense_index_of(id) else {
            return Err(missing);
        };
        let Some(removed) = array.remove(dense) else {
            return Err(missing);
        };

        #[allow(clippy::cast_possible_truncation)]
        let dense = dense as u32;
        unlink(&mut self.component_indices, stride, column, id, dense, removed.moved);
        Ok(removed.value)
    }

    /// Removes every `T` for which `predicate` returns `true`.
    ///
    /// Walks the dense array backward, so the element swapped into a freed
    /// slot has always been visited already. Returns how many were removed.
    pub fn remove_components_where<T, F>(&mut self, mut predicate: F) -> usize
    where
        T: Component,
        F: FnMut(EntityId, &T) -> bool,
    {
        let Ok(column) = self.column_of::<T>() else {
            return 0;
        };
        let stride = self.max_component_types;
        let Some(array) = downcast_mut::<T>(&mut self.component_arrays[column]) else {
            return 0;
        };

        let mut removed = 0;
        for dense in (0..array.count()).rev() {
            let entity = array.index()[dense];
            if !predicate(entity, &array.data()[dense]) {
                continue;
            }
            if let Some(slot) = array.remove(dense) {
                #[allow(clippy::cast_possible_truncation)]
                let dense = dense as u32;
                unlink(&mut self.component_indices, stride, column, slot.entity, dense, slot.moved);
                removed += 1;
            }
        }
        removed
    }

    /// Entity `id`'s `T`.
    ///
    /// A missing component is treated as a fatal condition by the caller's
    /// contract and is logged at error level.
    ///
    /// # Errors
    ///
    /// [`EcsError::ComponentMissing`] if `id` owns no `T`.
    pub fn get_component<T: Component>(&self, id: EntityId) -> EcsResult<&T> {
        self.try_get_component::<T>(id).ok_or_else(|| {
            error!(entity = %id, component = T::type_name(), "required component missing");
            EcsError::ComponentMissing {
                entity: id,
                component: T::type_name(),
            }
        })
    }

    /// Mutable entity `id`'s `T`.
    ///
    /// # Errors
    ///
    /// [`EcsError::ComponentMissing`] if `id` owns no `T`.
    pub fn get_component_mut<T: Component>(&mut self, id: EntityId) -> EcsResult<&mut T> {
        match self.try_get_component_mut::<T>(id) {
            Some(component) => Ok(component),
            None => {
                error!(entity = %id, component = T::type_name(), "required component missing");
                Err(EcsError::ComponentMissing {
                    entity: id,
                    component: T::type_name(),
                })
            }
        }
    }

    /// Entity `id`'s `T`, if it owns one.
    #[must_use]
    pub fn try_get_component<T: Component>(&self, id: EntityId) -> Option<&T> {
        self.component_array::<T>()?.get(id)
    }

    /// Mutable entity `id`'s `T`, if it owns one.
    pub fn try_get_component_mut<T: Component>(&mut self, id: EntityId) -> Option<&mut T> {
        self.component_array_mut::<T>()?.get_mut(id)
    }

    /// Checks if entity `id` owns a `T`.
    #[must_use]
    pub fn has_component<T: Component>(&self, id: EntityId) -> bool {
        self.has_component_index(id, component_type_index::<T>())
    }

    /// Type-erased ownership check answered from the flat lookup table.
    #[must_use]
    pub fn has_component_index(&self, id: EntityId, index: ComponentTypeIndex) -> bool {
        if !self.allocator.is_alive(id) || index.get() >= self.max_component_types {
            return false;
        }
        self.component_indices[id.index() * self.max_component_types + index.get()] != ABSENT
    }

    /// The dense array of `T`, or `None` if no `T` was ever stored.
    ///
    /// This is how systems read component data in bulk.
    #[must_use]
    pub fn component_array<T: Component>(&self) -> Option<&ComponentArray<T>> {
        let column = component_type_index::<T>().get();
        self.component_arrays
            .get(column)?
            .as_ref()?
            .as_any()
            .downcast_ref::<ComponentArray<T>>()
    }

    /// Mutable dense array of `T`.
    ///
    /// Values may be edited in place; membership changes go through
    /// [`EntityManager::add_component`] and [`EntityManager::remove_component`].
    pub fn component_array_mut<T: Component>(&mut self) -> Option<&mut ComponentArray<T>> {
        let column = component_type_index::<T>().get();
        downcast_mut::<T>(self.component_arrays.get_mut(column)?)
    }

    /// Two distinct component arrays borrowed mutably at once.
    ///
    /// Returns `None` if `A` and `B` are the same type or either array does
    /// not exist yet.
    pub fn component_arrays_pair_mut<A: Component, B: Component>(
        &mut self,
    ) -> Option<(&mut ComponentArray<A>, &mut ComponentArray<B>)> {
        let a = component_type_index::<A>().get();
        let b = component_type_index::<B>().get();
        let len = self.component_arrays.len();
        if a == b || a >= len || b >= len {
            return None;
        }

        let (slot_a, slot_b) = if a < b {
            let (low, high) = self.component_arrays.split_at_mut(b);
            (&mut low[a], &mut high[0])
        } else {
            let (low, high) = self.component_arrays.split_at_mut(a);
            (&mut high[0], &mut low[b])
        };
        Some((downcast_mut::<A>(slot_a)?, downcast_mut::<B>(slot_b)?))
    }

    // ── Systems ──────────────────────────────────────────────────────

    /// Appends a system to its stage.
    ///
    /// # Errors
    ///
    /// [`EcsError::SystemAlreadyRegistered`] if a system of the same concrete
    /// type is already in that stage.
    pub fn register_system(&mut self, entry: SystemEntry) -> EcsResult<SystemTypeId> {
        let stage = entry.stage();
        let id = entry.id();
        let list = &mut self.systems[stage.index()];

        if list.iter().any(|registered| registered.id() == id) {
            warn!(system = entry.name(), %stage, "system already registered");
            return Err(EcsError::SystemAlreadyRegistered {
                name: entry.name(),
                stage,
            });
        }

        debug!(system = entry.name(), %stage, "system registered");
        let mut registered = RegisteredSystem::new(entry);
        registered.start();
        list.push(registered);
        Ok(id)
    }

    /// Registers a CPU system.
    ///
    /// # Errors
    ///
    /// See [`EntityManager::register_system`].
    pub fn register_cpu_system<S: CpuSystem + 'static>(&mut self, system: S) -> EcsResult<SystemTypeId> {
        self.register_system(SystemEntry::cpu(system))
    }

    /// Registers a GPU-recording system.
    ///
    /// # Errors
    ///
    /// See [`EntityManager::register_system`].
    pub fn register_gpu_system<S: GpuSystem + 'static>(&mut self, system: S) -> EcsResult<SystemTypeId> {
        self.register_system(SystemEntry::gpu(system))
    }

    /// Removes the registered system of type `S` and hands it back.
    ///
    /// # Errors
    ///
    /// [`EcsError::SystemNotRegistered`] if no `S` is registered.
    pub fn unregister_system<S: 'static>(&mut self) -> EcsResult<SystemEntry> {
        self.unregister_system_by_id(system_type_id::<S>())
    }

    /// Removes the registered system with `id` and hands it back.
    ///
    /// # Errors
    ///
    /// [`EcsError::SystemNotRegistered`] if no system has that id.
    pub fn unregister_system_by_id(&mut self, id: SystemTypeId) -> EcsResult<SystemEntry> {
        for list in &mut self.systems {
            if let Some(position) = list.iter().position(|registered| registered.id() == id) {
                let registered = list.remove(position);
                debug!(system = registered.name(), stage = %registered.stage(), "system unregistered");
                return Ok(registered.into_entry());
            }
        }
        Err(EcsError::SystemNotRegistered(id))
    }

    /// Ids of the systems in `stage`, in registration order.
    pub fn systems_in_stage(&self, stage: SystemStage) -> impl Iterator<Item = SystemTypeId> + '_ {
        self.systems[stage.index()].iter().map(RegisteredSystem::id)
    }

    /// Total number of registered systems.
    #[must_use]
    pub fn system_count(&self) -> usize {
        self.systems.iter().map(Vec::len).sum()
    }

    /// Moves `stage`'s systems out so they can borrow the manager mutably.
    ///
    /// Must be paired with [`EntityManager::restore_stage_systems`].
    pub fn take_stage_systems(&mut self, stage: SystemStage) -> Vec<RegisteredSystem> {
        std::mem::take(&mut self.systems[stage.index()])
    }

    /// Puts back systems taken with [`EntityManager::take_stage_systems`].
    ///
    /// Systems registered into the stage in the meantime are kept after the
    /// restored ones, unless their type was already present.
    pub fn restore_stage_systems(&mut self, stage: SystemStage, systems: Vec<RegisteredSystem>) {
        let added = std::mem::replace(&mut self.systems[stage.index()], systems);
        for registered in added {
            let list = &mut self.systems[stage.index()];
            if list.iter().any(|existing| existing.id() == registered.id()) {
                warn!(system = registered.name(), %stage, "dropping duplicate system registered mid-stage");
                continue;
            }
            list.push(registered);
        }
    }

    // ── Teardown ─────────────────────────────────────────────────────

    /// Shuts down every system in stage order, then releases all storage.
    ///
    /// A system that returns an error or panics is logged and skipped;
    /// teardown always completes. Calling this again is a no-op.
    ///
    /// # Errors
    ///
    /// The first shutdown failure, reported after teardown has finished.
    pub fn shutdown(&mut self) -> EcsResult<()> {
        let mut first_failure = None;

        for list in &mut self.systems {
            for registered in list.iter_mut() {
                let Some(entry) = registered.begin_shutdown() else {
                    continue;
                };
                let name = entry.name();
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| entry.shutdown()));
                let failure = match outcome {
                    Ok(Ok(())) => {
                        debug!(system = name, "system shut down");
                        continue;
                    }
                    Ok(Err(err)) => err,
                    Err(payload) => EcsError::SystemShutdownFailed {
                        name,
                        reason: panic_message(payload.as_ref()),
                    },
                };
                error!(system = name, error = %failure, "system shutdown failed");
                first_failure.get_or_insert(failure);
            }
            list.clear();
        }

        self.component_arrays.clear();
        self.component_indices = Box::default();
        self.allocator = EntityAllocator::new(0);
        self.max_component_types = 0;
        self.initialized = false;

        first_failure.map_or(Ok(()), Err)
    }

    // ── Internals ────────────────────────────────────────────────────

    fn row_range(&self, id: EntityId) -> std::ops::Range<usize> {
        let start = id.index() * self.max_component_types;
        start..start + self.max_component_types
    }

    fn column_of<T: Component>(&self) -> EcsResult<usize> {
        let index = component_type_index::<T>().get();
        if index >= self.max_component_types {
            error!(
                component = T::type_name(),
                index,
                capacity = self.max_component_types,
                "component type budget exhausted"
            );
            return Err(EcsError::ComponentTypeBudgetExhausted {
                index,
                capacity: self.max_component_types,
            });
        }
        Ok(index)
    }

    fn array_or_create<T: Component>(&mut self, column: usize) -> EcsResult<&mut ComponentArray<T>> {
        let max_entities = self.allocator.capacity();
        let slot = &mut self.component_arrays[column];
        if slot.is_none() {
            debug!(component = T::type_name(), column, "component array created");
            *slot = Some(Box::new(ComponentArray::<T>::new(max_entities)));
        }
        downcast_mut::<T>(slot).ok_or_else(|| {
            error!(component = T::type_name(), column, "component table slot holds another type");
            EcsError::ComponentTypeMismatch {
                index: column,
                component: T::type_name(),
            }
        })
    }
}

impl Default for EntityManager {
    fn default() -> Self {
        Self::new()
    }
}

fn downcast_mut<T: Component>(slot: &mut ArraySlot) -> Option<&mut ComponentArray<T>> {
    slot.as_mut()?.as_any_mut().downcast_mut::<ComponentArray<T>>()
}

/// Clears `entity`'s cell and points `moved`'s cell at the slot it now occupies.
fn unlink(
    indices: &mut [u32],
    stride: usize,
    column: usize,
    entity: EntityId,
    dense: u32,
    moved: Option<EntityId>,
) {
    indices[entity.index() * stride + column] = ABSENT;
    if let Some(moved) = moved {
        indices[moved.index() * stride + column] = dense;
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_owned()
    }
}

//! # Entity Component System
//!
//! Fixed-capacity ECS: entities are recycled integer ids, each component type
//! lives in its own sparse-set array, and systems run stage by stage.
//!
//! ## Design Philosophy
//!
//! - All storage is sized once by `EntityManager::initialize`
//! - Components are stored in dense arrays; systems walk them in bulk
//! - Entity ids are plain indices, reused most-recently-freed first
//! - Dynamic dispatch happens once per system per stage, never per entity

mod component;
mod entity;
mod manager;
pub mod registry;
mod storage;
mod system;

pub use component::Component;
pub use entity::{EntityAllocator, EntityId};
pub use manager::EntityManager;
pub use registry::{
    component_type_index, registered_component_types, system_type_id, ComponentTypeIndex,
    SystemTypeId,
};
pub use storage::{ComponentArray, ABSENT};
pub use system::{
    CommandBufferHandle, CpuSystem, GpuSystem, RegisteredSystem, System, SystemEntry, SystemKind,
    SystemStage, SystemState,
};

//! # VIREO Core
//!
//! Entity Component System kernel for the VIREO engine:
//! - Entity allocator with LIFO identifier reuse
//! - Sparse-set component arrays, one per component type
//! - Entity manager with a per-stage system registry
//!
//! ## Architecture Rules
//!
//! 1. **Sized once** - every table is allocated by `EntityManager::initialize`
//! 2. **Data-oriented design** - components live in dense arrays
//! 3. **Stage-ordered** - systems run in `SystemStage` order, then registration order
//!
//! ## Example
//!
//! ```rust,ignore
//! use vireo_core::{EntityManager, EcsConfig};
//!
//! let mut manager = EntityManager::from_config(&EcsConfig::default())?;
//! let id = manager.create_entity();
//! manager.add_component(id, Health(100))?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;

pub use config::EcsConfig;
pub use ecs::{
    CommandBufferHandle, Component, ComponentArray, ComponentTypeIndex, CpuSystem, EntityId,
    EntityManager, GpuSystem, System, SystemEntry, SystemStage, SystemTypeId,
};
pub use error::{EcsError, EcsResult};

//! # ECS Error Types
//!
//! All errors that can be reported by the entity manager and system registry.
//! Errors are returned, never thrown: callers decide which ones are fatal.

use thiserror::Error;

use crate::ecs::{EntityId, SystemStage, SystemTypeId};

/// Errors that can occur in the ECS core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// Entity id is out of range, destroyed, or was never created.
    #[error("wrong entity id: {0}")]
    WrongEntityId(EntityId),

    /// Every entity id is in use.
    #[error("entity budget exhausted: capacity {capacity}")]
    EntityBudgetExhausted {
        /// Configured maximum number of entities.
        capacity: usize,
    },

    /// A component type received an index beyond the configured table width.
    #[error("component type budget exhausted: index {index}, capacity {capacity}")]
    ComponentTypeBudgetExhausted {
        /// Index issued to the component type.
        index: usize,
        /// Configured maximum number of component types.
        capacity: usize,
    },

    /// The entity already owns a component of this type.
    #[error("entity {entity} already has component {component}")]
    ComponentAlreadyPresent {
        /// Target entity.
        entity: EntityId,
        /// Component type name.
        component: &'static str,
    },

    /// The entity does not own a component of this type.
    #[error("entity {entity} has no component {component}")]
    ComponentMissing {
        /// Target entity.
        entity: EntityId,
        /// Component type name.
        component: &'static str,
    },

    /// The storage registered under a type index holds another type.
    #[error("component table slot {index} does not hold {component}")]
    ComponentTypeMismatch {
        /// Slot that was inspected.
        index: usize,
        /// Component type that was expected.
        component: &'static str,
    },

    /// A raw stage value does not name a stage.
    #[error("invalid system stage: {0}")]
    SystemInvalidStage(u8),

    /// A stage name does not name a stage.
    #[error("unknown system stage name: {0}")]
    UnknownStageName(String),

    /// A system of the same concrete type is already in the stage.
    #[error("system {name} already registered in stage {stage}")]
    SystemAlreadyRegistered {
        /// System name.
        name: &'static str,
        /// Stage it was registered in.
        stage: SystemStage,
    },

    /// No registered system has this id.
    #[error("system not registered: {0}")]
    SystemNotRegistered(SystemTypeId),

    /// A system reported an error or panicked while shutting down.
    #[error("system {name} failed to shut down: {reason}")]
    SystemShutdownFailed {
        /// System name.
        name: &'static str,
        /// Failure description.
        reason: String,
    },

    /// `initialize` was called on a manager that already has storage.
    #[error("entity manager already initialized")]
    AlreadyInitialized,

    /// A capacity value is zero or too large.
    #[error("invalid capacity: {0}")]
    InvalidCapacity(String),

    /// Configuration text could not be parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;

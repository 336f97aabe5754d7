//! # ECS Configuration
//!
//! Capacities are read once at startup. Every table in the manager is sized
//! from these values and never grows afterwards.
//!
//! ```toml
//! max_entities = 10000
//! max_component_types = 32
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{EcsError, EcsResult};

/// Default entity budget.
pub const DEFAULT_MAX_ENTITIES: usize = 10_000;

/// Default component type budget.
pub const DEFAULT_MAX_COMPONENT_TYPES: usize = 32;

/// Capacities for an `EntityManager`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EcsConfig {
    /// Maximum number of simultaneously live entities.
    pub max_entities: usize,
    /// Maximum number of distinct component types.
    pub max_component_types: usize,
}

impl Default for EcsConfig {
    fn default() -> Self {
        Self {
            max_entities: DEFAULT_MAX_ENTITIES,
            max_component_types: DEFAULT_MAX_COMPONENT_TYPES,
        }
    }
}

impl EcsConfig {
    /// Parses a TOML document. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidConfig`] if the text is not valid TOML for this
    /// table or a value fails [`EcsConfig::validate`].
    pub fn from_toml_str(text: &str) -> EcsResult<Self> {
        let config: Self = toml::from_str(text).map_err(|err| EcsError::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that both capacities are usable.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidCapacity`] for a zero capacity or an entity budget
    /// that reaches the invalid-id sentinel.
    pub fn validate(&self) -> EcsResult<()> {
        if self.max_entities == 0 || self.max_entities >= u32::MAX as usize {
            return Err(EcsError::InvalidCapacity(format!(
                "max_entities out of range: {}",
                self.max_entities
            )));
        }
        if self.max_component_types == 0 {
            return Err(EcsError::InvalidCapacity(
                "max_component_types must be greater than zero".to_owned(),
            ));
        }
        Ok(())
    }
}

//! # Engine Configuration
//!
//! One TOML document configures the whole engine. Every table and key is
//! optional; missing values take their defaults.
//!
//! ```toml
//! [ecs]
//! max_entities = 10000
//! max_component_types = 32
//!
//! [physics]
//! gravity = [0.0, -9.81, 0.0]
//! integrator = "runge_kutta4"
//!
//! [frame]
//! fixed_dt = 0.016666668
//! max_substeps = 8
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vireo_core::{EcsConfig, EcsError};

use crate::game_loop::FrameConfig;
use crate::systems::PhysicsConfig;

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The text is not valid TOML for this schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The ECS section failed validation.
    #[error(transparent)]
    Ecs(#[from] EcsError),

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Complete engine configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Entity and component budgets.
    pub ecs: EcsConfig,
    /// Physics tunables.
    pub physics: PhysicsConfig,
    /// Frame driver settings.
    pub frame: FrameConfig,
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed text and the validation
    /// errors of [`EngineConfig::validate`].
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`EngineConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks every section.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Ecs`] for bad capacities, [`ConfigError::Invalid`] for
    /// bad physics or frame values.
    pub fn validate(&self) -> ConfigResult<()> {
        self.ecs.validate()?;

        if !(self.frame.fixed_dt.is_finite() && self.frame.fixed_dt > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "frame.fixed_dt must be positive, got {}",
                self.frame.fixed_dt
            )));
        }
        if self.frame.max_substeps == 0 {
            return Err(ConfigError::Invalid("frame.max_substeps must be at least 1".to_owned()));
        }
        if self.frame.max_frame_time.is_nan() || self.frame.max_frame_time <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "frame.max_frame_time must be positive, got {}",
                self.frame.max_frame_time
            )));
        }
        if !self.physics.gravity.is_finite() {
            return Err(ConfigError::Invalid("physics.gravity must be finite".to_owned()));
        }
        if self.physics.rest_velocity_epsilon < 0.0 || self.physics.separation_epsilon < 0.0 {
            return Err(ConfigError::Invalid("physics epsilons must not be negative".to_owned()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::systems::Integrator;

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_sections_parse() {
        let config = EngineConfig::from_toml_str(
            r#"
            [ecs]
            max_entities = 128

            [physics]
            gravity = [0.0, -1.0, 0.0]
            integrator = "runge_kutta4"

            [frame]
            fixed_dt = 0.01
            max_substeps = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.ecs.max_entities, 128);
        assert_eq!(config.physics.gravity, Vec3::new(0.0, -1.0, 0.0));
        assert_eq!(config.physics.integrator, Integrator::RungeKutta4);
        assert_eq!(config.frame.max_substeps, 2);
    }

    #[test]
    fn test_validation_errors() {
        assert!(matches!(
            EngineConfig::from_toml_str("[frame]\nfixed_dt = 0.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("[ecs]\nmax_entities = 0"),
            Err(ConfigError::Ecs(EcsError::InvalidCapacity(_)))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("[physics]\nintegrator = \"verlet\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::load("/nonexistent/vireo.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}

//! Reference systems.
//!
//! - `physics`: fixed-step rigid bodies with sphere and plane contacts
//! - `transform`: parent-first local/world matrix resolution

pub mod physics;
pub mod transform;

pub use physics::{Integrator, PhysicsConfig, PhysicsStats, PhysicsSystem};
pub use transform::TransformSystem;

//! # VIREO
//!
//! Reference components, systems and frame driver on top of `vireo_core`.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              VIREO ENGINE                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐   │
//! │  │   vireo_core    │     │   systems       │     │   game_loop     │   │
//! │  │                 │<────│                 │<────│                 │   │
//! │  │  • Entities     │     │  • Transform    │     │  • Stage order  │   │
//! │  │  • Components   │     │  • Physics      │     │  • Fixed step   │   │
//! │  │  • Systems      │     │                 │     │                 │   │
//! │  └─────────────────┘     └─────────────────┘     └─────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `components`: transform, rigid body and collider data
//! - `systems`: `TransformSystem` and `PhysicsSystem`
//! - `game_loop`: stage-ordered frame driver
//! - `config`: TOML engine configuration
//! - `scene`: entity builders

pub mod components;
pub mod config;
pub mod game_loop;
pub mod scene;
pub mod systems;

pub use vireo_core as core;

pub use components::{PlaneCollider, RigidBody, SphereCollider, Transform, TransformState};
pub use config::{ConfigError, ConfigResult, EngineConfig};
pub use game_loop::{FrameConfig, FrameDriver, FrameStats};
pub use systems::{Integrator, PhysicsConfig, PhysicsStats, PhysicsSystem, TransformSystem};

//! # Systems and Stages
//!
//! A system is a unit of per-frame logic bound to exactly one
//! [`SystemStage`]. The engine driver walks stages in [`SystemStage::ALL`]
//! order and, within a stage, systems in registration order.
//!
//! There are two flavors, kept as two narrow traits:
//! - [`CpuSystem`]: receives the manager and a delta time
//! - [`GpuSystem`]: additionally receives a [`CommandBufferHandle`] for work
//!   that must be recorded for the graphics device
//!
//! Systems never call each other. They communicate through component state
//! only, and must not keep references into component storage across calls.

use std::fmt;
use std::str::FromStr;

use crate::error::{EcsError, EcsResult};

use super::manager::EntityManager;
use super::registry::{system_type_id, SystemTypeId};

/// Per-frame update phase. Declaration order is execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum SystemStage {
    /// Input sampling, frame bookkeeping.
    EarlyUpdate = 0,
    /// Local/world matrix resolution.
    Transform = 1,
    /// Skeletal and property animation.
    Animation = 2,
    /// Fixed-step simulation.
    Physics = 3,
    /// Scenario scripting.
    SceneControl = 4,
    /// Time-of-day lighting.
    DayNight = 5,
    /// Gameplay rules.
    GameLogic = 6,
    /// Camera placement.
    Camera = 7,
    /// Debug and game UI.
    Gui = 8,
    /// Particle emission and simulation.
    Particle = 9,
    /// Draw recording.
    Render = 10,
    /// End-of-frame cleanup.
    LateUpdate = 11,
}

impl SystemStage {
    /// Number of stages.
    pub const COUNT: usize = 12;

    /// All stages in execution order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::EarlyUpdate,
        Self::Transform,
        Self::Animation,
        Self::Physics,
        Self::SceneControl,
        Self::DayNight,
        Self::GameLogic,
        Self::Camera,
        Self::Gui,
        Self::Particle,
        Self::Render,
        Self::LateUpdate,
    ];

    /// Position of this stage in the frame.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Stable display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::EarlyUpdate => "EarlyUpdate",
            Self::Transform => "Transform",
            Self::Animation => "Animation",
            Self::Physics => "Physics",
            Self::SceneControl => "SceneControl",
            Self::DayNight => "DayNight",
            Self::GameLogic => "GameLogic",
            Self::Camera => "Camera",
            Self::Gui => "Gui",
            Self::Particle => "Particle",
            Self::Render => "Render",
            Self::LateUpdate => "LateUpdate",
        }
    }
}

impl fmt::Display for SystemStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for SystemStage {
    type Error = EcsError;

    fn try_from(raw: u8) -> EcsResult<Self> {
        Self::ALL
            .get(raw as usize)
            .copied()
            .ok_or(EcsError::SystemInvalidStage(raw))
    }
}

impl FromStr for SystemStage {
    type Err = EcsError;

    fn from_str(name: &str) -> EcsResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|stage| stage.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| EcsError::UnknownStageName(name.to_owned()))
    }
}

/// Lifecycle of a registered system.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SystemState {
    /// Wrapped but not yet accepted by a stage list. Never updated.
    #[default]
    Uninitialized,
    /// Registered and eligible for updates.
    Running,
    /// `shutdown` has been called; never updated again.
    ShuttingDown,
}

/// Opaque command-recording token handed to [`GpuSystem`]s.
///
/// Its submission and fencing are owned by the rendering layer; the ECS
/// passes it through untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CommandBufferHandle(u64);

impl CommandBufferHandle {
    /// Wraps a raw handle value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw handle value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Behavior shared by both system flavors.
pub trait System {
    /// Name used in logs and errors.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Stage this system runs in. Must not change after construction.
    fn stage(&self) -> SystemStage;

    /// Releases resources. Called once during `EntityManager::shutdown`.
    ///
    /// # Errors
    ///
    /// Returns an error if teardown failed; the manager logs it and keeps
    /// shutting down the remaining systems.
    fn shutdown(&mut self) -> EcsResult<()> {
        Ok(())
    }
}

/// A system that only needs CPU-side state.
pub trait CpuSystem: System {
    /// Runs one update.
    fn on_update(&mut self, manager: &mut EntityManager, delta_time: f32);
}

/// A system that records work for the graphics device.
pub trait GpuSystem: System {
    /// Runs one update, recording into `commands`.
    fn on_update(
        &mut self,
        manager: &mut EntityManager,
        delta_time: f32,
        commands: CommandBufferHandle,
    );
}

/// The two system flavors behind one owner.
pub enum SystemKind {
    /// CPU-only system.
    Cpu(Box<dyn CpuSystem>),
    /// GPU-recording system.
    Gpu(Box<dyn GpuSystem>),
}

/// A boxed system tagged with the id of its concrete type.
pub struct SystemEntry {
    id: SystemTypeId,
    kind: SystemKind,
}

impl SystemEntry {
    /// Wraps a CPU system.
    pub fn cpu<S: CpuSystem + 'static>(system: S) -> Self {
        Self {
            id: system_type_id::<S>(),
            kind: SystemKind::Cpu(Box::new(system)),
        }
    }

    /// Wraps a GPU system.
    pub fn gpu<S: GpuSystem + 'static>(system: S) -> Self {
        Self {
            id: system_type_id::<S>(),
            kind: SystemKind::Gpu(Box::new(system)),
        }
    }

    /// Id of the concrete system type.
    #[must_use]
    pub const fn id(&self) -> SystemTypeId {
        self.id
    }

    /// System name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match &self.kind {
            SystemKind::Cpu(system) => system.name(),
            SystemKind::Gpu(system) => system.name(),
        }
    }

    /// Declared stage.
    #[must_use]
    pub fn stage(&self) -> SystemStage {
        match &self.kind {
            SystemKind::Cpu(system) => system.stage(),
            SystemKind::Gpu(system) => system.stage(),
        }
    }

    /// Borrows the boxed system.
    #[must_use]
    pub const fn kind(&self) -> &SystemKind {
        &self.kind
    }

    /// Mutably borrows the boxed system.
    pub fn kind_mut(&mut self) -> &mut SystemKind {
        &mut self.kind
    }

    /// Unwraps the boxed system.
    #[must_use]
    pub fn into_kind(self) -> SystemKind {
        self.kind
    }

    /// Dispatches one update to whichever flavor this is.
    ///
    /// CPU systems ignore `commands`.
    pub fn update(
        &mut self,
        manager: &mut EntityManager,
        delta_time: f32,
        commands: CommandBufferHandle,
    ) {
        match &mut self.kind {
            SystemKind::Cpu(system) => system.on_update(manager, delta_time),
            SystemKind::Gpu(system) => system.on_update(manager, delta_time, commands),
        }
    }

    pub(crate) fn shutdown(&mut self) -> EcsResult<()> {
        match &mut self.kind {
            SystemKind::Cpu(system) => system.shutdown(),
            SystemKind::Gpu(system) => system.shutdown(),
        }
    }
}

impl fmt::Debug for SystemEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemEntry")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("stage", &self.stage())
            .finish()
    }
}

/// A system as stored in a stage list.
#[derive(Debug)]
pub struct RegisteredSystem {
    entry: SystemEntry,
    stage: SystemStage,
    state: SystemState,
}

impl RegisteredSystem {
    pub(crate) fn new(entry: SystemEntry) -> Self {
        let stage = entry.stage();
        Self {
            entry,
            stage,
            state: SystemState::Uninitialized,
        }
    }

    /// Moves a freshly wrapped system to `Running`.
    pub(crate) fn start(&mut self) {
        if self.state == SystemState::Uninitialized {
            self.state = SystemState::Running;
        }
    }

    /// Id of the concrete system type.
    #[must_use]
    pub const fn id(&self) -> SystemTypeId {
        self.entry.id()
    }

    /// System name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.entry.name()
    }

    /// Stage recorded at registration.
    #[must_use]
    pub const fn stage(&self) -> SystemStage {
        self.stage
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SystemState {
        self.state
    }

    /// Runs one update if the system is still running.
    pub fn update(
        &mut self,
        manager: &mut EntityManager,
        delta_time: f32,
        commands: CommandBufferHandle,
    ) {
        if self.state == SystemState::Running {
            self.entry.update(manager, delta_time, commands);
        }
    }

    pub(crate) fn begin_shutdown(&mut self) -> Option<&mut SystemEntry> {
        if self.state == SystemState::ShuttingDown {
            return None;
        }
        self.state = SystemState::ShuttingDown;
        Some(&mut self.entry)
    }

    pub(crate) fn into_entry(self) -> SystemEntry {
        self.entry
    }
}

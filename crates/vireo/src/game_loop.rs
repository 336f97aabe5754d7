//! # VIREO Frame Driver
//!
//! Walks the stages once per frame:
//! ```text
//! Frame N:
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ EarlyUpdate → Transform → Animation                  (frame dt)    │
//! │                                                                     │
//! │ Physics                          (fixed dt, 0..=max_substeps times) │
//! │    └─ accumulator += frame dt; step while accumulator >= fixed dt   │
//! │                                                                     │
//! │ SceneControl → DayNight → GameLogic → Camera → Gui                 │
//! │ Particle → Render → LateUpdate                       (frame dt)    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Within a stage, systems run in registration order. Systems are moved out
//! of the manager for the duration of their stage so they can borrow it
//! mutably.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vireo_core::{CommandBufferHandle, EcsResult, EntityManager, SystemStage};

/// Default fixed physics step (60 Hz).
pub const DEFAULT_FIXED_DT: f32 = 1.0 / 60.0;

/// Default cap on physics steps per frame.
pub const DEFAULT_MAX_SUBSTEPS: u32 = 8;

/// Default frame duration above which a warning is logged (seconds).
pub const DEFAULT_MAX_FRAME_TIME: f32 = 0.033;

/// Configuration for the frame driver.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrameConfig {
    /// Physics step in seconds.
    pub fixed_dt: f32,
    /// Maximum physics steps per frame. Backlog beyond it is dropped.
    pub max_substeps: u32,
    /// Wall-clock frame budget in seconds.
    pub max_frame_time: f32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            fixed_dt: DEFAULT_FIXED_DT,
            max_substeps: DEFAULT_MAX_SUBSTEPS,
            max_frame_time: DEFAULT_MAX_FRAME_TIME,
        }
    }
}

/// What one frame did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frame number, starting at zero.
    pub frame: u64,
    /// System updates dispatched, physics steps counted individually.
    pub systems_run: u32,
    /// Fixed physics steps taken.
    pub physics_steps: u32,
    /// Wall-clock duration.
    pub elapsed: Duration,
}

/// Stage-ordered driver with a fixed-step physics stage.
#[derive(Debug)]
pub struct FrameDriver {
    config: FrameConfig,
    accumulator: f32,
    frame_count: u64,
}

impl FrameDriver {
    /// Creates a driver.
    #[must_use]
    pub fn new(config: FrameConfig) -> Self {
        Self {
            config,
            accumulator: 0.0,
            frame_count: 0,
        }
    }

    /// Driver configuration.
    #[must_use]
    pub const fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Frames completed so far.
    #[inline]
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Simulation time not yet consumed by physics steps.
    #[inline]
    #[must_use]
    pub const fn accumulator(&self) -> f32 {
        self.accumulator
    }

    /// Runs every stage once, with physics stepped from the accumulator.
    pub fn run_frame(
        &mut self,
        manager: &mut EntityManager,
        frame_dt: f32,
        commands: CommandBufferHandle,
    ) -> FrameStats {
        let start = Instant::now();
        let mut stats = FrameStats {
            frame: self.frame_count,
            ..FrameStats::default()
        };

        for stage in SystemStage::ALL {
            if stage == SystemStage::Physics {
                let (steps, runs) = self.run_physics(manager, frame_dt, commands);
                stats.physics_steps = steps;
                stats.systems_run += runs;
            } else {
                stats.systems_run += Self::run_stage(manager, stage, frame_dt, commands);
            }
        }

        stats.elapsed = start.elapsed();
        if stats.elapsed.as_secs_f32() > self.config.max_frame_time {
            warn!(
                frame = stats.frame,
                elapsed_ms = stats.elapsed.as_secs_f64() * 1000.0,
                budget_ms = f64::from(self.config.max_frame_time) * 1000.0,
                "frame exceeded budget"
            );
        }

        self.frame_count += 1;
        stats
    }

    /// Runs one stage's systems in registration order.
    ///
    /// Returns how many systems were updated.
    pub fn run_stage(
        manager: &mut EntityManager,
        stage: SystemStage,
        delta_time: f32,
        commands: CommandBufferHandle,
    ) -> u32 {
        let mut systems = manager.take_stage_systems(stage);
        for system in &mut systems {
            system.update(manager, delta_time, commands);
        }
        let runs = u32::try_from(systems.len()).unwrap_or(u32::MAX);
        manager.restore_stage_systems(stage, systems);
        runs
    }

    /// Runs the stage with raw value `stage`.
    ///
    /// # Errors
    ///
    /// [`vireo_core::EcsError::SystemInvalidStage`] if `stage` names no stage.
    pub fn run_stage_index(
        manager: &mut EntityManager,
        stage: u8,
        delta_time: f32,
        commands: CommandBufferHandle,
    ) -> EcsResult<u32> {
        let stage = SystemStage::try_from(stage).map_err(|err| {
            tracing::error!(error = %err, "dispatch of invalid stage");
            err
        })?;
        Ok(Self::run_stage(manager, stage, delta_time, commands))
    }

    fn run_physics(
        &mut self,
        manager: &mut EntityManager,
        frame_dt: f32,
        commands: CommandBufferHandle,
    ) -> (u32, u32) {
        let fixed_dt = self.config.fixed_dt;
        if frame_dt.is_finite() {
            self.accumulator += frame_dt.max(0.0);
        } else {
            warn!(frame_dt, "non-finite frame delta ignored by physics");
        }

        let mut steps = 0;
        let mut runs = 0;
        while self.accumulator >= fixed_dt && steps < self.config.max_substeps {
            runs += Self::run_stage(manager, SystemStage::Physics, fixed_dt, commands);
            self.accumulator -= fixed_dt;
            steps += 1;
        }

        if self.accumulator >= fixed_dt {
            debug!(
                backlog = self.accumulator,
                max_substeps = self.config.max_substeps,
                "dropping physics backlog"
            );
            self.accumulator %= fixed_dt;
        }
        (steps, runs)
    }
}

impl Default for FrameDriver {
    fn default() -> Self {
        Self::new(FrameConfig::default())
    }
}

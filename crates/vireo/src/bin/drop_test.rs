//! # Drop Test
//!
//! Headless scenario: a ring of spheres falls onto a ground plane and
//! settles. Positions are logged once per simulated second.
//!
//! ```bash
//! # Defaults
//! cargo run --bin drop_test
//!
//! # Custom configuration and more detail
//! RUST_LOG=debug cargo run --bin drop_test -- vireo.toml
//! ```

use std::process::ExitCode;

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use vireo::core::{CommandBufferHandle, EntityId, EntityManager};
use vireo::{scene, EngineConfig, FrameDriver, PhysicsSystem, RigidBody, Transform, TransformSystem};

/// Spheres in the scenario.
const SPHERE_COUNT: u32 = 16;

/// Simulated duration in seconds.
const DURATION_SECONDS: u32 = 5;

/// Seed for the placement jitter.
const SEED: u64 = 0x00D1_5EA5E;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "drop test failed");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    info!(?config, "configuration loaded");

    let mut manager = EntityManager::from_config(&config.ecs)?;
    manager.register_cpu_system(TransformSystem::new())?;
    manager.register_cpu_system(PhysicsSystem::new(config.physics))?;

    scene::spawn_plane(&mut manager, Vec3::Y, 0.0)?;
    let spheres = spawn_spheres(&mut manager)?;
    info!(spheres = spheres.len(), "scene ready");

    let mut driver = FrameDriver::new(config.frame);
    let frame_dt = config.frame.fixed_dt;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let frames_per_second = (1.0 / frame_dt).round().max(1.0) as u64;

    let commands = CommandBufferHandle::default();
    let mut physics_steps = 0_u64;
    for frame in 0..frames_per_second * u64::from(DURATION_SECONDS) {
        let stats = driver.run_frame(&mut manager, frame_dt, commands);
        physics_steps += u64::from(stats.physics_steps);

        if (frame + 1) % frames_per_second == 0 {
            log_heights(&manager, &spheres, (frame + 1) / frames_per_second);
        }
    }

    info!(frames = driver.frame_count(), physics_steps, "simulation finished");
    manager.shutdown()?;
    Ok(())
}

fn spawn_spheres(manager: &mut EntityManager) -> Result<Vec<EntityId>, Box<dyn std::error::Error>> {
    let mut rng = ChaCha8Rng::seed_from_u64(SEED);
    let mut spheres = Vec::new();

    for index in 0..SPHERE_COUNT {
        #[allow(clippy::cast_precision_loss)]
        let angle = index as f32 / SPHERE_COUNT as f32 * std::f32::consts::TAU;
        let jitter = Vec3::new(rng.gen_range(-0.2..0.2), rng.gen_range(0.0..2.0), rng.gen_range(-0.2..0.2));
        let position = Vec3::new(angle.cos() * 3.0, 4.0, angle.sin() * 3.0) + jitter;

        let body = RigidBody::new(rng.gen_range(0.5..2.0)).with_restitution(rng.gen_range(0.2..0.8));
        spheres.push(scene::spawn_sphere(manager, position, 0.5, body)?);
    }
    Ok(spheres)
}

fn log_heights(manager: &EntityManager, spheres: &[EntityId], second: u64) {
    let (lowest, highest) = spheres
        .iter()
        .filter_map(|&id| manager.try_get_component::<Transform>(id))
        .map(|transform| transform.position.y)
        .fold((f32::MAX, f32::MIN), |(low, high), y| (low.min(y), high.max(y)));

    let resting = spheres
        .iter()
        .filter_map(|&id| manager.try_get_component::<RigidBody>(id))
        .filter(|body| body.velocity == Vec3::ZERO)
        .count();

    info!(second, lowest, highest, resting, "sphere heights");
}

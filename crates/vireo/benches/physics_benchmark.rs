//! # Physics Step Benchmark
//!
//! Spheres resting on and bouncing off a ground plane, stepped at 60 Hz.
//!
//! Run with: `cargo bench --package vireo`

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec3;
use vireo::core::EntityManager;
use vireo::{scene, Integrator, PhysicsConfig, PhysicsSystem, RigidBody, TransformSystem};

const DT: f32 = 1.0 / 60.0;

fn sphere_field(count: u16) -> EntityManager {
    let mut manager =
        EntityManager::with_capacity(usize::from(count) + 1, 32).expect("benchmark capacities are valid");
    scene::spawn_plane(&mut manager, Vec3::Y, 0.0).expect("plane fits");
    for index in 0..count {
        let x = f32::from(index % 32) * 1.5;
        let z = f32::from(index / 32) * 1.5;
        scene::spawn_sphere(&mut manager, Vec3::new(x, 2.0, z), 0.5, RigidBody::new(1.0))
            .expect("sphere fits");
    }
    manager
}

/// Benchmark: one full physics step per integrator.
fn bench_physics_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("physics_step_256");

    for integrator in [Integrator::ExplicitEuler, Integrator::SemiImplicitEuler, Integrator::RungeKutta4] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{integrator:?}")),
            &integrator,
            |b, &integrator| {
                let mut manager = sphere_field(256);
                let mut physics = PhysicsSystem::new(PhysicsConfig {
                    integrator,
                    ..PhysicsConfig::default()
                });
                b.iter(|| black_box(physics.step(&mut manager, DT)));
            },
        );
    }

    group.finish();
}

/// Benchmark: transform resolution after every body moved.
fn bench_transform_resolve(c: &mut Criterion) {
    let mut manager = sphere_field(1024);
    let mut physics = PhysicsSystem::default();
    let mut transforms = TransformSystem::new();

    c.bench_function("transform_resolve_1K", |b| {
        b.iter(|| {
            physics.integrate(&mut manager, DT);
            black_box(transforms.resolve(&mut manager))
        });
    });
}

criterion_group!(benches, bench_physics_step, bench_transform_resolve);
criterion_main!(benches);

//! # ECS Performance Benchmark
//!
//! Measures the entity manager's hot operations at the default budget:
//! - entity create/destroy churn
//! - component insert/remove with swap-and-pop
//! - dense iteration over a full component array
//!
//! Run with: `cargo bench --package vireo_core`

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use vireo_core::{Component, EntityId, EntityManager};

const MAX_ENTITIES: usize = 10_000;
const MAX_COMPONENT_TYPES: usize = 32;

#[derive(Clone, Copy, Debug, Default)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
}
impl Component for Position {}

#[derive(Clone, Copy, Debug, Default)]
struct Velocity {
    x: f32,
    y: f32,
    z: f32,
}
impl Component for Velocity {}

fn populated(count: usize) -> (EntityManager, Vec<EntityId>) {
    let mut manager = EntityManager::with_capacity(MAX_ENTITIES, MAX_COMPONENT_TYPES)
        .expect("benchmark capacities are valid");
    let ids: Vec<_> = (0..count).map(|_| manager.create_entity()).collect();
    for &id in &ids {
        manager.add_component(id, Position::default()).expect("fresh entity");
        manager
            .add_component(id, Velocity { x: 0.1, y: 0.2, z: 0.3 })
            .expect("fresh entity");
    }
    (manager, ids)
}

/// Benchmark: create then destroy every entity.
fn bench_create_destroy(c: &mut Criterion) {
    let mut group = c.benchmark_group("create_destroy");

    for count in [1_000, MAX_ENTITIES] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut manager = EntityManager::with_capacity(MAX_ENTITIES, MAX_COMPONENT_TYPES)
                .expect("benchmark capacities are valid");
            let mut ids = Vec::with_capacity(count);
            b.iter(|| {
                ids.extend((0..count).map(|_| manager.create_entity()));
                for id in ids.drain(..) {
                    black_box(manager.destroy_entity(id)).ok();
                }
            });
        });
    }

    group.finish();
}

/// Benchmark: destroy entities owning two components in random order.
fn bench_destroy_with_components(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5EED);

    c.bench_function("destroy_random_order_10K", |b| {
        b.iter_batched(
            || {
                let (manager, mut ids) = populated(MAX_ENTITIES);
                ids.shuffle(&mut rng);
                (manager, ids)
            },
            |(mut manager, ids)| {
                for id in ids {
                    manager.destroy_entity(id).ok();
                }
                black_box(manager.alive_count())
            },
            criterion::BatchSize::LargeInput,
        );
    });
}

/// Benchmark: dense integration pass, the shape every system loop takes.
fn bench_dense_update(c: &mut Criterion) {
    let (mut manager, _) = populated(MAX_ENTITIES);

    c.bench_function("dense_update_10K", |b| {
        b.iter(|| {
            let (positions, velocities) = manager
                .component_arrays_pair_mut::<Position, Velocity>()
                .expect("both arrays exist");
            for (entity, position) in positions.iter_mut() {
                if let Some(velocity) = velocities.get(entity) {
                    position.x += velocity.x * 0.016;
                    position.y += velocity.y * 0.016;
                    position.z += velocity.z * 0.016;
                }
            }
            black_box(positions.count())
        });
    });
}

/// Benchmark: flat-table membership checks.
fn bench_has_component(c: &mut Criterion) {
    let (manager, ids) = populated(MAX_ENTITIES);

    c.bench_function("has_component_10K", |b| {
        b.iter(|| ids.iter().filter(|&&id| manager.has_component::<Velocity>(id)).count());
    });
}

criterion_group!(
    benches,
    bench_create_destroy,
    bench_destroy_with_components,
    bench_dense_update,
    bench_has_component,
);
criterion_main!(benches);

//! Entity builders for common scene objects.
//!
//! These go through the public `EntityManager` API only. A builder that fails
//! part-way destroys the entity it created.

use glam::Vec3;
use vireo_core::{EcsResult, EntityId, EntityManager};

use crate::components::{PlaneCollider, RigidBody, SphereCollider, Transform};

/// Spawns a sphere with a transform, a body and a collider.
///
/// The body's inertia is derived from `radius`.
///
/// # Errors
///
/// Entity or component budget errors from the manager.
pub fn spawn_sphere(
    manager: &mut EntityManager,
    position: Vec3,
    radius: f32,
    body: RigidBody,
) -> EcsResult<EntityId> {
    spawn_with(manager, |manager, id| {
        manager.add_component(id, Transform::from_position(position))?;
        manager.add_component(id, body.with_sphere_inertia(radius))?;
        manager.add_component(id, SphereCollider::new(radius))
    })
}

/// Spawns a static plane `dot(normal, p) == offset`.
///
/// # Errors
///
/// Entity or component budget errors from the manager.
pub fn spawn_plane(manager: &mut EntityManager, normal: Vec3, offset: f32) -> EcsResult<EntityId> {
    spawn_with(manager, |manager, id| {
        let plane = PlaneCollider::new(normal, offset);
        manager.add_component(id, Transform::from_position(plane.normal * offset))?;
        manager.add_component(id, RigidBody::new_static())?;
        manager.add_component(id, plane)
    })
}

/// Spawns an entity that only carries `transform`.
///
/// # Errors
///
/// Entity or component budget errors from the manager.
pub fn spawn_transform(manager: &mut EntityManager, transform: Transform) -> EcsResult<EntityId> {
    spawn_with(manager, |manager, id| manager.add_component(id, transform))
}

fn spawn_with<F>(manager: &mut EntityManager, build: F) -> EcsResult<EntityId>
where
    F: FnOnce(&mut EntityManager, EntityId) -> EcsResult<()>,
{
    let id = manager.try_create_entity()?;
    if let Err(err) = build(manager, id) {
        manager.destroy_entity(id)?;
        return Err(err);
    }
    Ok(id)
}

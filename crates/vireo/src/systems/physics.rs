//! # Physics System
//!
//! Fixed-step rigid-body simulation over dense component arrays.
//!
//! Each step runs two phases:
//! 1. **Integrate** every non-static [`RigidBody`] with the selected
//!    [`Integrator`], then clear its accumulators and dirty its [`Transform`]
//! 2. **Resolve collisions**: sphere against plane, then every unordered
//!    sphere pair once
//!
//! Collider data is copied into scratch buffers owned by the system before
//! transforms and bodies are borrowed mutably, so no allocation happens once
//! the buffers have grown to the scene size.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::trace;
use vireo_core::{ComponentArray, CpuSystem, EntityId, EntityManager, System, SystemStage};

use crate::components::{PlaneCollider, RigidBody, SphereCollider, Transform};

/// Default gravity (metres per second squared).
pub const DEFAULT_GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);

/// Speed below which a body touching a plane is put to rest.
pub const DEFAULT_REST_VELOCITY_EPSILON: f32 = 0.05;

/// Center distance below which a sphere pair has no usable normal.
pub const DEFAULT_SEPARATION_EPSILON: f32 = 1e-6;

/// Numerical scheme used to advance position and velocity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Integrator {
    /// Position from the old velocity, then velocity. Gains energy.
    ExplicitEuler,
    /// Velocity first, then position from the new velocity.
    #[default]
    SemiImplicitEuler,
    /// Classic fourth-order Runge-Kutta. Exact for constant acceleration.
    RungeKutta4,
}

impl Integrator {
    /// Advances `(position, velocity)` by `dt` under constant `acceleration`.
    #[must_use]
    pub fn step(self, position: Vec3, velocity: Vec3, acceleration: Vec3, dt: f32) -> (Vec3, Vec3) {
        match self {
            Self::ExplicitEuler => (position + velocity * dt, velocity + acceleration * dt),
            Self::SemiImplicitEuler => {
                let velocity = velocity + acceleration * dt;
                (position + velocity * dt, velocity)
            }
            Self::RungeKutta4 => {
                let half = dt * 0.5;
                let k1_x = velocity;
                let k2_x = velocity + acceleration * half;
                let k3_x = velocity + acceleration * half;
                let k4_x = velocity + acceleration * dt;
                let position = position + (k1_x + 2.0 * k2_x + 2.0 * k3_x + k4_x) * (dt / 6.0);
                // Every velocity stage sees the same acceleration.
                (position, velocity + acceleration * dt)
            }
        }
    }
}

/// Tunables for [`PhysicsSystem`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhysicsConfig {
    /// Gravity acceleration applied to bodies with `use_gravity`.
    pub gravity: Vec3,
    /// Integration scheme.
    pub integrator: Integrator,
    /// Contact speed below which velocity is zeroed.
    pub rest_velocity_epsilon: f32,
    /// Minimum center distance for sphere pair resolution.
    pub separation_epsilon: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
            integrator: Integrator::default(),
            rest_velocity_epsilon: DEFAULT_REST_VELOCITY_EPSILON,
            separation_epsilon: DEFAULT_SEPARATION_EPSILON,
        }
    }
}

/// Counters from the most recent step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PhysicsStats {
    /// Bodies advanced by the integrator.
    pub bodies_integrated: u32,
    /// Sphere-plane contacts resolved.
    pub sphere_plane_contacts: u32,
    /// Sphere-sphere contacts resolved.
    pub sphere_sphere_contacts: u32,
}

#[derive(Clone, Copy, Debug)]
struct SphereProxy {
    entity: EntityId,
    radius: f32,
}

/// Motion state of one side of a sphere pair.
#[derive(Clone, Copy, Debug)]
struct PairBody {
    position: Vec3,
    velocity: Vec3,
    inverse_mass: f32,
    restitution: f32,
}

/// Rigid-body integration and sphere/plane contact resolution.
#[derive(Debug, Default)]
pub struct PhysicsSystem {
    config: PhysicsConfig,
    stats: PhysicsStats,
    spheres: Vec<SphereProxy>,
    planes: Vec<PlaneCollider>,
}

impl PhysicsSystem {
    /// Creates a system with the given tunables.
    #[must_use]
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Current tunables.
    #[must_use]
    pub const fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Selected integrator.
    #[must_use]
    pub const fn integrator(&self) -> Integrator {
        self.config.integrator
    }

    /// Switches the integrator. Takes effect on the next step.
    pub fn set_integrator(&mut self, integrator: Integrator) {
        self.config.integrator = integrator;
    }

    /// Counters from the most recent step.
    #[must_use]
    pub const fn stats(&self) -> PhysicsStats {
        self.stats
    }

    /// Runs one fixed step: integration, then collision resolution.
    pub fn step(&mut self, manager: &mut EntityManager, dt: f32) -> PhysicsStats {
        self.stats = PhysicsStats::default();
        self.integrate(manager, dt);
        self.resolve_collisions(manager);
        trace!(
            bodies = self.stats.bodies_integrated,
            plane_contacts = self.stats.sphere_plane_contacts,
            sphere_contacts = self.stats.sphere_sphere_contacts,
            "physics step"
        );
        self.stats
    }

    /// Advances every non-static body and clears its accumulators.
    pub fn integrate(&mut self, manager: &mut EntityManager, dt: f32) {
        let Some((transforms, bodies)) = manager.component_arrays_pair_mut::<Transform, RigidBody>()
        else {
            return;
        };

        let config = self.config;
        for (entity, body) in bodies.iter_mut() {
            if body.is_static() || body.inverse_mass() == 0.0 {
                body.clear_accumulators();
                continue;
            }
            let Some(transform) = transforms.get_mut(entity) else {
                body.clear_accumulators();
                continue;
            };

            if body.use_gravity {
                body.apply_force(config.gravity * body.mass());
            }
            let acceleration = body.force() * body.inverse_mass();
            let (position, velocity) =
                config.integrator.step(transform.position, body.velocity, acceleration, dt);
            transform.position = position;
            body.velocity = velocity;

            let angular_acceleration = body.inverse_inertia() * body.torque();
            let (rotation, angular_velocity) = config.integrator.step(
                transform.rotation,
                body.angular_velocity,
                angular_acceleration,
                dt,
            );
            transform.rotation = rotation;
            body.angular_velocity = angular_velocity;

            body.clear_accumulators();
            transform.mark_dirty();
            self.stats.bodies_integrated += 1;
        }
    }

    /// Runs the sphere-plane pass, then the sphere-sphere pass.
    pub fn resolve_collisions(&mut self, manager: &mut EntityManager) {
        self.spheres.clear();
        self.planes.clear();
        if let Some(spheres) = manager.component_array::<SphereCollider>() {
            self.spheres.extend(
                spheres
                    .iter()
                    .map(|(entity, sphere)| SphereProxy { entity, radius: sphere.radius }),
            );
        }
        if let Some(planes) = manager.component_array::<PlaneCollider>() {
            self.planes.extend_from_slice(planes.data());
        }
        if self.spheres.is_empty() {
            return;
        }

        self.resolve_sphere_planes(manager);
        self.resolve_sphere_pairs(manager);
    }

    fn resolve_sphere_planes(&mut self, manager: &mut EntityManager) {
        let Some((transforms, bodies)) = manager.component_arrays_pair_mut::<Transform, RigidBody>()
        else {
            return;
        };

        let epsilon = self.config.rest_velocity_epsilon;
        for sphere in &self.spheres {
            let (Some(transform), Some(body)) =
                (transforms.get_mut(sphere.entity), bodies.get_mut(sphere.entity))
            else {
                continue;
            };
            if body.inverse_mass() == 0.0 {
                continue;
            }

            for plane in &self.planes {
                if plane.normal == Vec3::ZERO {
                    continue;
                }
                let distance = plane.signed_distance(transform.position);
                if distance >= sphere.radius {
                    continue;
                }

                transform.translate(plane.normal * (sphere.radius - distance));

                let approach = body.velocity.dot(plane.normal);
                if approach < 0.0 {
                    let reflected = body.velocity - 2.0 * approach * plane.normal;
                    body.velocity = reflected * body.restitution;
                }
                if body.velocity.length() < epsilon {
                    body.velocity = Vec3::ZERO;
                }
                self.stats.sphere_plane_contacts += 1;
            }
        }
    }

    fn resolve_sphere_pairs(&mut self, manager: &mut EntityManager) {
        let Some((transforms, bodies)) = manager.component_arrays_pair_mut::<Transform, RigidBody>()
        else {
            return;
        };

        for (i, first) in self.spheres.iter().enumerate() {
            for second in &self.spheres[i + 1..] {
                let (Some(a_transform), Some(b_transform)) =
                    (transforms.get(first.entity), transforms.get(second.entity))
                else {
                    continue;
                };
                let mut a = pair_body(bodies, first.entity, a_transform.position);
                let mut b = pair_body(bodies, second.entity, b_transform.position);

                let contact = resolve_sphere_pair(
                    &mut a,
                    &mut b,
                    first.radius + second.radius,
                    self.config.separation_epsilon,
                );
                if !contact {
                    continue;
                }
                self.stats.sphere_sphere_contacts += 1;

                for (entity, side) in [(first.entity, a), (second.entity, b)] {
                    if side.inverse_mass == 0.0 {
                        continue;
                    }
                    if let Some(transform) = transforms.get_mut(entity) {
                        transform.position = side.position;
                        transform.mark_dirty();
                    }
                    if let Some(body) = bodies.get_mut(entity) {
                        body.velocity = side.velocity;
                    }
                }
            }
        }
    }
}

/// Bodiless spheres take part as immovable, perfectly elastic obstacles.
fn pair_body(bodies: &ComponentArray<RigidBody>, entity: EntityId, position: Vec3) -> PairBody {
    let (velocity, inverse_mass, restitution) = bodies.get(entity).map_or((Vec3::ZERO, 0.0, 1.0), |body| {
        (body.velocity, body.inverse_mass(), body.restitution)
    });
    PairBody {
        position,
        velocity,
        inverse_mass,
        restitution,
    }
}

/// Separates two overlapping spheres and applies the contact impulse.
///
/// Returns `false` when the pair is apart, coincident or both static.
fn resolve_sphere_pair(a: &mut PairBody, b: &mut PairBody, radius_sum: f32, epsilon: f32) -> bool {
    let delta = b.position - a.position;
    let distance = delta.length();
    if distance >= radius_sum || distance <= epsilon {
        return false;
    }
    let inverse_mass_sum = a.inverse_mass + b.inverse_mass;
    if inverse_mass_sum <= 0.0 {
        return false;
    }

    let normal = delta / distance;
    let penetration = radius_sum - distance;
    a.position -= normal * (penetration * a.inverse_mass / inverse_mass_sum);
    b.position += normal * (penetration * b.inverse_mass / inverse_mass_sum);

    let approach = (b.velocity - a.velocity).dot(normal);
    if approach < 0.0 {
        let restitution = a.restitution.min(b.restitution);
        let impulse = -(1.0 + restitution) * approach / inverse_mass_sum;
        a.velocity -= normal * (impulse * a.inverse_mass);
        b.velocity += normal * (impulse * b.inverse_mass);
    }
    true
}

impl System for PhysicsSystem {
    fn name(&self) -> &'static str {
        "PhysicsSystem"
    }

    fn stage(&self) -> SystemStage {
        SystemStage::Physics
    }
}

impl CpuSystem for PhysicsSystem {
    fn on_update(&mut self, manager: &mut EntityManager, delta_time: f32) {
        self.step(manager, delta_time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn manager() -> EntityManager {
        EntityManager::with_capacity(64, 32).unwrap()
    }

    fn falling_body(manager: &mut EntityManager) -> EntityId {
        let id = manager.create_entity();
        manager.add_component(id, Transform::from_position(Vec3::ZERO)).unwrap();
        manager.add_component(id, RigidBody::new(2.0)).unwrap();
        id
    }

    fn drop_height(integrator: Integrator, steps: u32) -> f32 {
        let mut manager = manager();
        let id = falling_body(&mut manager);
        let mut physics = PhysicsSystem::new(PhysicsConfig {
            integrator,
            ..PhysicsConfig::default()
        });
        for _ in 0..steps {
            physics.step(&mut manager, DT);
        }
        manager.get_component::<Transform>(id).unwrap().position.y
    }

    #[test]
    fn test_rk4_matches_analytic_fall() {
        let steps = 60;
        #[allow(clippy::cast_precision_loss)]
        let t = steps as f32 * DT;
        let analytic = 0.5 * DEFAULT_GRAVITY.y * t * t;

        let y = drop_height(Integrator::RungeKutta4, steps);
        assert!((y - analytic).abs() < 1e-3, "rk4 {y} vs analytic {analytic}");
    }

    #[test]
    fn test_euler_variants_bracket_analytic_fall() {
        let steps = 60;
        #[allow(clippy::cast_precision_loss)]
        let t = steps as f32 * DT;
        let analytic = 0.5 * DEFAULT_GRAVITY.y * t * t;

        let explicit = drop_height(Integrator::ExplicitEuler, steps);
        let semi_implicit = drop_height(Integrator::SemiImplicitEuler, steps);
        assert!(explicit > analytic + 1e-2, "explicit {explicit} vs {analytic}");
        assert!(semi_implicit < analytic - 1e-2, "semi-implicit {semi_implicit} vs {analytic}");
    }

    #[test]
    fn test_force_accumulator_cleared_and_transform_dirtied() {
        let mut manager = manager();
        let id = falling_body(&mut manager);
        manager.get_component_mut::<RigidBody>(id).unwrap().apply_force(Vec3::X * 10.0);

        let mut physics = PhysicsSystem::default();
        let stats = physics.step(&mut manager, DT);

        assert_eq!(stats.bodies_integrated, 1);
        assert_eq!(manager.get_component::<RigidBody>(id).unwrap().force(), Vec3::ZERO);
        assert!(manager.get_component::<Transform>(id).unwrap().is_dirty());
    }

    #[test]
    fn test_static_body_is_not_integrated() {
        let mut manager = manager();
        let id = manager.create_entity();
        manager.add_component(id, Transform::from_position(Vec3::ONE)).unwrap();
        manager.add_component(id, RigidBody::new_static()).unwrap();

        let stats = PhysicsSystem::default().step(&mut manager, DT);
        assert_eq!(stats.bodies_integrated, 0);
        assert_eq!(manager.get_component::<Transform>(id).unwrap().position, Vec3::ONE);
    }

    #[test]
    fn test_torque_spins_body() {
        let mut manager = manager();
        let id = falling_body(&mut manager);
        {
            let body = manager.get_component_mut::<RigidBody>(id).unwrap();
            *body = body.with_gravity(false).with_sphere_inertia(1.0);
            body.apply_torque(Vec3::Y * 8.0);
        }

        PhysicsSystem::default().step(&mut manager, 0.5);

        let body = manager.get_component::<RigidBody>(id).unwrap();
        assert!(body.angular_velocity.y > 0.0);
        assert_eq!(body.torque(), Vec3::ZERO);
        assert!(manager.get_component::<Transform>(id).unwrap().rotation.y > 0.0);
    }

    #[test]
    fn test_sphere_pair_exchanges_velocities() {
        let mut a = PairBody {
            position: Vec3::new(-0.9, 0.0, 0.0),
            velocity: Vec3::X,
            inverse_mass: 1.0,
            restitution: 1.0,
        };
        let mut b = PairBody {
            position: Vec3::new(0.9, 0.0, 0.0),
            velocity: -Vec3::X,
            ..a
        };

        assert!(resolve_sphere_pair(&mut a, &mut b, 2.0, DEFAULT_SEPARATION_EPSILON));
        assert!(a.velocity.abs_diff_eq(-Vec3::X, 1e-6));
        assert!(b.velocity.abs_diff_eq(Vec3::X, 1e-6));
        assert!((b.position - a.position).length() >= 2.0 - 1e-5);
    }

    #[test]
    fn test_degenerate_pairs_are_skipped() {
        let body = PairBody {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            inverse_mass: 1.0,
            restitution: 1.0,
        };
        let (mut a, mut b) = (body, body);
        assert!(!resolve_sphere_pair(&mut a, &mut b, 2.0, DEFAULT_SEPARATION_EPSILON));

        let fixed = PairBody {
            inverse_mass: 0.0,
            ..body
        };
        let (mut a, mut b) = (fixed, PairBody { position: Vec3::X, ..fixed });
        assert!(!resolve_sphere_pair(&mut a, &mut b, 2.0, DEFAULT_SEPARATION_EPSILON));
    }
}

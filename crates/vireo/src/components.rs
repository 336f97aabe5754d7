//! # Engine Components
//!
//! Pure data consumed by the reference systems:
//! - [`Transform`]: position, Euler rotation and scale plus cached matrices
//! - [`RigidBody`]: linear and angular motion state
//! - [`SphereCollider`] / [`PlaneCollider`]: collision geometry
//!
//! Behavior lives in `TransformSystem` and `PhysicsSystem`.

use bytemuck::{Pod, Zeroable};
use glam::{EulerRot, Mat3, Mat4, Quat, Vec3};
use vireo_core::{Component, EntityId};

// ============================================================================
// TRANSFORM
// ============================================================================

/// Whether a transform's cached matrices are current.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransformState {
    /// Local and world matrices must be recomputed.
    #[default]
    Dirty,
    /// Both matrices reflect the current position, rotation and scale.
    Clean,
}

/// Placement of an entity, optionally relative to a parent entity.
///
/// The parent is a plain id looked up every pass; a transform never owns
/// another entity. Editing `position`, `rotation` or `scale` directly
/// requires a call to [`Transform::mark_dirty`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Translation relative to the parent.
    pub position: Vec3,
    /// Euler angles in degrees, composed Y then X then Z.
    pub rotation: Vec3,
    /// Per-axis scale.
    pub scale: Vec3,
    /// Parent entity, or [`EntityId::INVALID`] for a root.
    pub parent: EntityId,
    local: Mat4,
    world: Mat4,
    state: TransformState,
}

impl Component for Transform {}

impl Default for Transform {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::ZERO, Vec3::ONE)
    }
}

impl Transform {
    /// Creates a dirty root transform.
    #[must_use]
    pub fn new(position: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
            parent: EntityId::INVALID,
            local: Mat4::IDENTITY,
            world: Mat4::IDENTITY,
            state: TransformState::Dirty,
        }
    }

    /// Creates an unrotated, unscaled root transform.
    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self::new(position, Vec3::ZERO, Vec3::ONE)
    }

    /// Attaches this transform to `parent`.
    #[must_use]
    pub fn with_parent(mut self, parent: EntityId) -> Self {
        self.parent = parent;
        self.state = TransformState::Dirty;
        self
    }

    /// Checks if this transform has a parent reference.
    #[inline]
    #[must_use]
    pub fn has_parent(&self) -> bool {
        self.parent.is_valid()
    }

    /// Local matrix `T * R * S` from the current fields.
    #[must_use]
    pub fn compute_local_matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::YXZ,
            self.rotation.y.to_radians(),
            self.rotation.x.to_radians(),
            self.rotation.z.to_radians(),
        );
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.position)
    }

    /// Cached local matrix.
    #[inline]
    #[must_use]
    pub const fn local_matrix(&self) -> Mat4 {
        self.local
    }

    /// Cached world matrix. Only meaningful while the state is clean.
    #[inline]
    #[must_use]
    pub const fn world_matrix(&self) -> Mat4 {
        self.world
    }

    /// World-space translation taken from the cached world matrix.
    #[inline]
    #[must_use]
    pub fn world_position(&self) -> Vec3 {
        self.world.w_axis.truncate()
    }

    /// Current state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> TransformState {
        self.state
    }

    /// Checks if the cached matrices are stale.
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.state == TransformState::Dirty
    }

    /// Flags the cached matrices as stale.
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.state = TransformState::Dirty;
    }

    /// Moves by `delta` and flags the transform dirty.
    #[inline]
    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
        self.state = TransformState::Dirty;
    }

    pub(crate) fn refresh_local(&mut self) {
        self.local = self.compute_local_matrix();
    }

    pub(crate) fn set_world(&mut self, world: Mat4) {
        self.world = world;
    }

    pub(crate) fn mark_clean(&mut self) {
        self.state = TransformState::Clean;
    }
}

// ============================================================================
// RIGID BODY
// ============================================================================

/// Linear and angular motion state.
///
/// `inverse_mass` is zero exactly when the body is static or its mass is not
/// positive. Constructors and setters keep that in sync.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RigidBody {
    /// Linear velocity in units per second.
    pub velocity: Vec3,
    /// Angular velocity in degrees per second, per Euler axis.
    pub angular_velocity: Vec3,
    /// Fraction of approach speed kept after a contact (0 to 1).
    pub restitution: f32,
    /// Whether gravity is accumulated each step.
    pub use_gravity: bool,
    force_accum: Vec3,
    torque_accum: Vec3,
    mass: f32,
    inverse_mass: f32,
    inverse_inertia: Mat3,
    is_static: bool,
}

impl Component for RigidBody {}

impl Default for RigidBody {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl RigidBody {
    /// Default restitution for new bodies.
    pub const DEFAULT_RESTITUTION: f32 = 0.5;

    /// Creates a dynamic body affected by gravity.
    #[must_use]
    pub fn new(mass: f32) -> Self {
        let mut body = Self {
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            restitution: Self::DEFAULT_RESTITUTION,
            use_gravity: true,
            force_accum: Vec3::ZERO,
            torque_accum: Vec3::ZERO,
            mass,
            inverse_mass: 0.0,
            inverse_inertia: Mat3::ZERO,
            is_static: false,
        };
        body.update_inverse_mass();
        body
    }

    /// Creates an immovable body.
    #[must_use]
    pub fn new_static() -> Self {
        let mut body = Self::new(0.0);
        body.is_static = true;
        body.use_gravity = false;
        body.update_inverse_mass();
        body
    }

    /// Sets the restitution, clamped to `0..=1`.
    #[must_use]
    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution.clamp(0.0, 1.0);
        self
    }

    /// Sets the initial linear velocity.
    #[must_use]
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Enables or disables gravity.
    #[must_use]
    pub fn with_gravity(mut self, use_gravity: bool) -> Self {
        self.use_gravity = use_gravity;
        self
    }

    /// Derives the inverse inertia tensor of a solid sphere, `I = 2/5 m r^2`.
    ///
    /// Static bodies and degenerate radii get a zero tensor.
    #[must_use]
    pub fn with_sphere_inertia(mut self, radius: f32) -> Self {
        let inertia = 0.4 * self.mass * radius * radius;
        self.inverse_inertia = if self.inverse_mass > 0.0 && inertia > 0.0 {
            Mat3::from_diagonal(Vec3::splat(inertia.recip()))
        } else {
            Mat3::ZERO
        };
        self
    }

    /// Mass in kilograms.
    #[inline]
    #[must_use]
    pub const fn mass(&self) -> f32 {
        self.mass
    }

    /// Cached `1 / mass`, zero for static bodies.
    #[inline]
    #[must_use]
    pub const fn inverse_mass(&self) -> f32 {
        self.inverse_mass
    }

    /// Inverse inertia tensor.
    #[inline]
    #[must_use]
    pub const fn inverse_inertia(&self) -> Mat3 {
        self.inverse_inertia
    }

    /// Checks if the body never moves.
    #[inline]
    #[must_use]
    pub const fn is_static(&self) -> bool {
        self.is_static
    }

    /// Force accumulated since the last step.
    #[inline]
    #[must_use]
    pub const fn force(&self) -> Vec3 {
        self.force_accum
    }

    /// Torque accumulated since the last step.
    #[inline]
    #[must_use]
    pub const fn torque(&self) -> Vec3 {
        self.torque_accum
    }

    /// Changes the mass and refreshes the inverse mass.
    pub fn set_mass(&mut self, mass: f32) {
        self.mass = mass;
        self.update_inverse_mass();
    }

    /// Makes the body static or dynamic.
    pub fn set_static(&mut self, is_static: bool) {
        self.is_static = is_static;
        self.update_inverse_mass();
        if is_static {
            self.velocity = Vec3::ZERO;
            self.angular_velocity = Vec3::ZERO;
            self.inverse_inertia = Mat3::ZERO;
        }
    }

    /// Adds a force for the next step.
    #[inline]
    pub fn apply_force(&mut self, force: Vec3) {
        self.force_accum += force;
    }

    /// Adds a torque for the next step.
    #[inline]
    pub fn apply_torque(&mut self, torque: Vec3) {
        self.torque_accum += torque;
    }

    /// Zeroes both accumulators.
    #[inline]
    pub fn clear_accumulators(&mut self) {
        self.force_accum = Vec3::ZERO;
        self.torque_accum = Vec3::ZERO;
    }

    fn update_inverse_mass(&mut self) {
        self.inverse_mass = if self.is_static || self.mass <= 0.0 {
            0.0
        } else {
            self.mass.recip()
        };
    }
}

// ============================================================================
// COLLIDERS
// ============================================================================

/// Sphere centered on the entity's transform position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct SphereCollider {
    /// Radius in world units.
    pub radius: f32,
}

impl Component for SphereCollider {}

impl SphereCollider {
    /// Creates a sphere collider.
    #[inline]
    #[must_use]
    pub const fn new(radius: f32) -> Self {
        Self { radius }
    }
}

/// Infinite plane `dot(normal, p) == offset` in world space.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct PlaneCollider {
    /// Plane normal. Normalized on construction.
    pub normal: Vec3,
    /// Signed distance of the plane from the origin along `normal`.
    pub offset: f32,
}

impl Component for PlaneCollider {}

impl Default for PlaneCollider {
    fn default() -> Self {
        Self::ground()
    }
}

impl PlaneCollider {
    /// Creates a plane, normalizing `normal`.
    #[must_use]
    pub fn new(normal: Vec3, offset: f32) -> Self {
        Self {
            normal: normal.normalize_or_zero(),
            offset,
        }
    }

    /// The `y = 0` plane facing up.
    #[must_use]
    pub const fn ground() -> Self {
        Self {
            normal: Vec3::Y,
            offset: 0.0,
        }
    }

    /// Signed distance from the plane to `point`.
    #[inline]
    #[must_use]
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) - self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_body_has_zero_inverse_mass() {
        assert_eq!(RigidBody::new_static().inverse_mass(), 0.0);
        assert_eq!(RigidBody::new(0.0).inverse_mass(), 0.0);
        assert_eq!(RigidBody::new(-3.0).inverse_mass(), 0.0);
        assert_eq!(RigidBody::new(4.0).inverse_mass(), 0.25);

        let mut body = RigidBody::new(2.0);
        body.set_static(true);
        assert_eq!(body.inverse_mass(), 0.0);
        body.set_static(false);
        assert_eq!(body.inverse_mass(), 0.5);
    }

    #[test]
    fn test_sphere_inertia() {
        let body = RigidBody::new(5.0).with_sphere_inertia(1.0);
        let expected = 1.0 / (0.4 * 5.0);
        assert!((body.inverse_inertia().x_axis.x - expected).abs() < 1e-6);
        assert_eq!(RigidBody::new_static().with_sphere_inertia(1.0).inverse_inertia(), Mat3::ZERO);
    }

    #[test]
    fn test_local_matrix_composes_translation_rotation_scale() {
        let transform = Transform::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.0, 90.0, 0.0), Vec3::splat(2.0));
        let local = transform.compute_local_matrix();

        let moved = local.transform_point3(Vec3::X);
        assert!(moved.abs_diff_eq(Vec3::new(1.0, 2.0, 1.0), 1e-5));
    }

    #[test]
    fn test_plane_signed_distance() {
        let plane = PlaneCollider::new(Vec3::new(0.0, 2.0, 0.0), 1.0);
        assert_eq!(plane.normal, Vec3::Y);
        assert!((plane.signed_distance(Vec3::new(5.0, 3.0, 0.0)) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_collider_bytes() {
        assert_eq!(bytemuck::bytes_of(&PlaneCollider::ground()).len(), 16);
        assert_eq!(bytemuck::bytes_of(&SphereCollider::new(1.0)).len(), 4);
    }
}

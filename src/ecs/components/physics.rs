//! Physics components for ECS entities.

use glam::{Mat3, Mat4, Quat, Vec3};

use crate::physics::collider::PhysicsAabb;

/// Rigid body component.
///
/// Holds the state the collision core reads and writes. Derived fields
/// (`transform`, `inverse_inertia_tensor_world`) are refreshed by
/// [`RigidBody::calculate_derived_data`].
#[derive(Debug, Clone)]
pub struct RigidBody {
    pub position: Vec3,
    /// Orientation. Position correction adds to it without normalising.
    pub orientation: Quat,
    pub velocity: Vec3,
    /// Angular velocity in world space.
    pub rotation: Vec3,
    /// Zero means infinite mass.
    pub inverse_mass: f32,
    /// Inverse inertia tensor in body space.
    pub inverse_inertia_tensor: Mat3,
    /// Constant acceleration (usually gravity).
    pub acceleration: Vec3,
    /// Linear damping factor (default: 0.01).
    pub linear_damping: f32,
    /// Angular damping factor (default: 0.01).
    pub angular_damping: f32,
    pub force_accumulator: Vec3,
    pub torque_accumulator: Vec3,
    inverse_inertia_tensor_world: Mat3,
    transform: Mat4,
    last_frame_acceleration: Vec3,
    awake: bool,
}

impl RigidBody {
    /// Create a new dynamic rigid body with the given mass.
    ///
    /// The inertia tensor defaults to that of a unit solid sphere of the same
    /// mass; use [`RigidBody::with_inertia_tensor`] for anything else.
    pub fn new_dynamic(mass: f32) -> Self {
        let inverse_mass = if mass > 0.0 { 1.0 / mass } else { 0.0 };
        let mut body = Self {
            inverse_mass,
            linear_damping: 0.01,
            angular_damping: 0.01,
            ..Self::new_static()
        };
        if body.has_finite_mass() {
            body.inverse_inertia_tensor = sphere_inertia_tensor(mass, 1.0).inverse();
        }
        body.calculate_derived_data();
        body
    }

    /// Create a new immovable rigid body.
    pub fn new_static() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
            rotation: Vec3::ZERO,
            inverse_mass: 0.0,
            inverse_inertia_tensor: Mat3::ZERO,
            acceleration: Vec3::ZERO,
            linear_damping: 0.0,
            angular_damping: 0.0,
            force_accumulator: Vec3::ZERO,
            torque_accumulator: Vec3::ZERO,
            inverse_inertia_tensor_world: Mat3::ZERO,
            transform: Mat4::IDENTITY,
            last_frame_acceleration: Vec3::ZERO,
            awake: true,
        }
    }

    /// Set the body-space inertia tensor. Ignored for immovable bodies.
    pub fn with_inertia_tensor(mut self, inertia_tensor: Mat3) -> Self {
        if self.has_finite_mass() && inertia_tensor.determinant() != 0.0 {
            self.inverse_inertia_tensor = inertia_tensor.inverse();
            self.calculate_derived_data();
        }
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self.calculate_derived_data();
        self
    }

    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.orientation = orientation;
        self.calculate_derived_data();
        self
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_acceleration(mut self, acceleration: Vec3) -> Self {
        self.acceleration = acceleration;
        self
    }

    #[inline]
    pub fn has_finite_mass(&self) -> bool {
        self.inverse_mass > 0.0
    }

    /// Normalise the orientation and rebuild the transform and world-space
    /// inverse inertia tensor.
    pub fn calculate_derived_data(&mut self) {
        self.orientation = self.orientation.normalize();
        self.transform = Mat4::from_rotation_translation(self.orientation, self.position);
        let rotation = Mat3::from_quat(self.orientation);
        self.inverse_inertia_tensor_world =
            rotation * self.inverse_inertia_tensor * rotation.transpose();
    }

    /// Body-to-world transform as of the last derived-data refresh.
    #[inline]
    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    #[inline]
    pub fn inverse_inertia_tensor_world(&self) -> Mat3 {
        self.inverse_inertia_tensor_world
    }

    /// Acceleration applied during the last integration step.
    #[inline]
    pub fn last_frame_acceleration(&self) -> Vec3 {
        self.last_frame_acceleration
    }

    pub(crate) fn set_last_frame_acceleration(&mut self, acceleration: Vec3) {
        self.last_frame_acceleration = acceleration;
    }

    #[inline]
    pub fn is_awake(&self) -> bool {
        self.awake
    }

    /// Wake or put the body to sleep. Sleeping bodies lose their velocity.
    pub fn set_awake(&mut self, awake: bool) {
        self.awake = awake;
        if !awake {
            self.velocity = Vec3::ZERO;
            self.rotation = Vec3::ZERO;
        }
    }

    #[inline]
    pub fn add_velocity(&mut self, delta: Vec3) {
        self.velocity += delta;
    }

    #[inline]
    pub fn add_rotation(&mut self, delta: Vec3) {
        self.rotation += delta;
    }
}

impl Default for RigidBody {
    fn default() -> Self {
        Self::new_dynamic(1.0)
    }
}

/// Inertia tensor of a solid sphere.
pub fn sphere_inertia_tensor(mass: f32, radius: f32) -> Mat3 {
    Mat3::from_diagonal(Vec3::splat(0.4 * mass * radius * radius))
}

/// Inertia tensor of a solid box with the given half-extents.
pub fn box_inertia_tensor(mass: f32, half_extents: Vec3) -> Mat3 {
    let sq = (half_extents * 2.0) * (half_extents * 2.0);
    Mat3::from_diagonal(Vec3::new(sq.y + sq.z, sq.x + sq.z, sq.x + sq.y) * (mass / 12.0))
}

/// Which side of a plane collides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneKind {
    /// Two-sided plane: contacts push bodies away from whichever side they are on.
    Infinite,
    /// One-sided: everything behind the plane is solid.
    HalfSpace,
}

/// Collider shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ColliderShape {
    Sphere { radius: f32 },
    Box { half_extents: Vec3 },
    /// World-space plane `normal · p = offset`. The normal must be unit length.
    Plane {
        normal: Vec3,
        offset: f32,
        kind: PlaneKind,
    },
}

/// Collision detection component.
#[derive(Debug, Clone)]
pub struct Collider {
    pub shape: ColliderShape,
    /// Offset from the body origin, in body space.
    pub offset: Vec3,
    /// World transform of the shape, refreshed by `sync_colliders`.
    pub transform: Mat4,
    /// World bounds, refreshed by `sync_colliders`. `None` excludes the
    /// collider from the broad phase.
    pub aabb: Option<PhysicsAabb>,
}

impl Collider {
    pub fn new(shape: ColliderShape) -> Self {
        Self {
            shape,
            offset: Vec3::ZERO,
            transform: Mat4::IDENTITY,
            aabb: None,
        }
    }

    pub fn sphere(radius: f32) -> Self {
        Self::new(ColliderShape::Sphere { radius })
    }

    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::new(ColliderShape::Box { half_extents })
    }

    pub fn plane(normal: Vec3, offset: f32, kind: PlaneKind) -> Self {
        Self::new(ColliderShape::Plane {
            normal,
            offset,
            kind,
        })
    }

    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }
}

impl Default for Collider {
    fn default() -> Self {
        Self::sphere(0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_body_has_infinite_mass() {
        let body = RigidBody::new_static();
        assert!(!body.has_finite_mass());
        assert_eq!(body.inverse_inertia_tensor_world(), Mat3::ZERO);
    }

    #[test]
    fn test_world_inertia_follows_orientation() {
        let inertia = box_inertia_tensor(12.0, Vec3::new(1.0, 0.5, 0.5));
        let body = RigidBody::new_dynamic(12.0)
            .with_inertia_tensor(inertia)
            .with_orientation(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2));

        // A quarter turn about z swaps the x and y principal axes.
        let local = body.inverse_inertia_tensor;
        let world = body.inverse_inertia_tensor_world();
        let eps = 1e-5;
        assert!((world.x_axis.x - local.y_axis.y).abs() < eps);
        assert!((world.y_axis.y - local.x_axis.x).abs() < eps);
        assert!((world.z_axis.z - local.z_axis.z).abs() < eps);
    }

    #[test]
    fn test_sleeping_clears_velocity() {
        let mut body = RigidBody::new_dynamic(1.0).with_velocity(Vec3::X);
        body.add_rotation(Vec3::Y);
        body.set_awake(false);
        assert!(!body.is_awake());
        assert_eq!(body.velocity, Vec3::ZERO);
        assert_eq!(body.rotation, Vec3::ZERO);
    }

    #[test]
    fn test_derived_transform() {
        let body = RigidBody::new_dynamic(1.0).with_position(Vec3::new(1.0, 2.0, 3.0));
        let origin = body.transform().transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-6);
    }
}

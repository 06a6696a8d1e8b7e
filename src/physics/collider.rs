//! Collision primitives: world-space views of collider shapes and their bounds.

use glam::{Mat4, Vec3};

use crate::ecs::components::physics::{Collider, ColliderShape, PlaneKind, RigidBody};

/// Axis-aligned bounding box for broadphase collision detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsAabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl PhysicsAabb {
    /// Bounds covering all of space.
    pub const EVERYWHERE: Self = Self {
        min: Vec3::NEG_INFINITY,
        max: Vec3::INFINITY,
    };

    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Test whether two AABBs overlap. Touching faces count as overlap.
    #[inline]
    pub fn overlaps(&self, other: &PhysicsAabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
}

/// A sphere in world space.
#[derive(Debug, Clone, Copy)]
pub struct Sphere {
    pub body: hecs::Entity,
    pub center: Vec3,
    pub radius: f32,
}

/// A box in world space. `transform` must be a rigid transform (no scale).
#[derive(Debug, Clone, Copy)]
pub struct OrientedBox {
    pub body: hecs::Entity,
    pub transform: Mat4,
    pub half_extents: Vec3,
}

impl OrientedBox {
    /// Box axis `index` (0..=2) in world space; 3 gives the centre.
    #[inline]
    pub fn axis(&self, index: usize) -> Vec3 {
        self.transform.col(index).truncate()
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        self.transform.w_axis.truncate()
    }

    /// The eight corners in world space.
    pub fn corners(&self) -> [Vec3; 8] {
        const SIGNS: [[f32; 3]; 8] = [
            [1.0, 1.0, 1.0],
            [-1.0, 1.0, 1.0],
            [1.0, -1.0, 1.0],
            [-1.0, -1.0, 1.0],
            [1.0, 1.0, -1.0],
            [-1.0, 1.0, -1.0],
            [1.0, -1.0, -1.0],
            [-1.0, -1.0, -1.0],
        ];
        SIGNS.map(|s| {
            self.transform
                .transform_point3(Vec3::from_array(s) * self.half_extents)
        })
    }
}

/// A plane in world space: `normal · p = offset`.
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    pub body: hecs::Entity,
    pub normal: Vec3,
    pub offset: f32,
    pub kind: PlaneKind,
}

impl Plane {
    /// Signed distance from the plane to `point`.
    #[inline]
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) - self.offset
    }
}

/// A collider resolved to world space, ready for the narrow phase.
#[derive(Debug, Clone, Copy)]
pub enum Primitive {
    Sphere(Sphere),
    Box(OrientedBox),
    Plane(Plane),
}

impl Primitive {
    pub fn body(&self) -> hecs::Entity {
        match self {
            Primitive::Sphere(s) => s.body,
            Primitive::Box(b) => b.body,
            Primitive::Plane(p) => p.body,
        }
    }
}

impl Collider {
    /// Refresh the cached world transform and bounds from the owning body.
    pub fn update(&mut self, body: &RigidBody) {
        self.transform = if self.offset != Vec3::ZERO {
            body.transform() * Mat4::from_translation(self.offset)
        } else {
            body.transform()
        };
        self.aabb = self.shape.compute_aabb(self.transform);
    }

    /// World-space view of this collider, using the cached transform.
    pub fn primitive(&self, body: hecs::Entity) -> Primitive {
        match self.shape {
            ColliderShape::Sphere { radius } => Primitive::Sphere(Sphere {
                body,
                center: self.transform.w_axis.truncate(),
                radius,
            }),
            ColliderShape::Box { half_extents } => Primitive::Box(OrientedBox {
                body,
                transform: self.transform,
                half_extents,
            }),
            ColliderShape::Plane {
                normal,
                offset,
                kind,
            } => Primitive::Plane(Plane {
                body,
                normal,
                offset,
                kind,
            }),
        }
    }
}

impl ColliderShape {
    /// Compute the world-space AABB for this shape.
    ///
    /// Returns `None` for shapes with non-finite or negative dimensions.
    /// Planes are unbounded.
    pub fn compute_aabb(&self, transform: Mat4) -> Option<PhysicsAabb> {
        match self {
            ColliderShape::Sphere { radius } => {
                if !radius.is_finite() || *radius < 0.0 {
                    return None;
                }
                let center = transform.transform_point3(Vec3::ZERO);
                Some(PhysicsAabb::from_center_half_extents(
                    center,
                    Vec3::splat(*radius),
                ))
            }
            ColliderShape::Box { half_extents } => {
                if !half_extents.is_finite() || half_extents.min_element() < 0.0 {
                    return None;
                }
                Some(aabb_from_extents(*half_extents, transform))
            }
            ColliderShape::Plane { .. } => Some(PhysicsAabb::EVERYWHERE),
        }
    }
}

/// Compute world-space AABB from local half-extents and a transform matrix.
#[inline]
fn aabb_from_extents(half_extents: Vec3, mat: Mat4) -> PhysicsAabb {
    let center = mat.transform_point3(Vec3::ZERO);

    // Project the local box axes onto each world axis.
    let abs_col0 = mat.x_axis.truncate().abs();
    let abs_col1 = mat.y_axis.truncate().abs();
    let abs_col2 = mat.z_axis.truncate().abs();

    let extent = abs_col0 * half_extents.x + abs_col1 * half_extents.y + abs_col2 * half_extents.z;

    PhysicsAabb::from_center_half_extents(center, extent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn test_sphere_aabb() {
        let shape = ColliderShape::Sphere { radius: 1.0 };
        let aabb = shape
            .compute_aabb(Mat4::from_translation(Vec3::new(0.0, 5.0, 0.0)))
            .unwrap();

        let eps = 1e-5;
        assert!((aabb.min - Vec3::new(-1.0, 4.0, -1.0)).length() < eps);
        assert!((aabb.max - Vec3::new(1.0, 6.0, 1.0)).length() < eps);
        assert!((aabb.size() - Vec3::splat(2.0)).length() < eps);
    }

    #[test]
    fn test_rotated_box_aabb() {
        let shape = ColliderShape::Box {
            half_extents: Vec3::new(1.0, 2.0, 3.0),
        };
        let transform = Mat4::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let aabb = shape.compute_aabb(transform).unwrap();

        let eps = 1e-5;
        assert!((aabb.max - Vec3::new(2.0, 1.0, 3.0)).length() < eps);
        assert!((aabb.min + Vec3::new(2.0, 1.0, 3.0)).length() < eps);
    }

    #[test]
    fn test_invalid_shape_has_no_aabb() {
        let shape = ColliderShape::Sphere { radius: f32::NAN };
        assert!(shape.compute_aabb(Mat4::IDENTITY).is_none());
        let shape = ColliderShape::Box {
            half_extents: Vec3::new(1.0, -1.0, 1.0),
        };
        assert!(shape.compute_aabb(Mat4::IDENTITY).is_none());
    }

    #[test]
    fn test_plane_aabb_overlaps_everything() {
        let shape = ColliderShape::Plane {
            normal: Vec3::Y,
            offset: 0.0,
            kind: PlaneKind::HalfSpace,
        };
        let plane = shape.compute_aabb(Mat4::IDENTITY).unwrap();
        let far = PhysicsAabb::from_center_half_extents(Vec3::splat(1.0e6), Vec3::ONE);
        assert!(plane.overlaps(&far));
        assert!(far.overlaps(&plane));
    }

    #[test]
    fn test_aabb_overlap() {
        let a = PhysicsAabb {
            min: Vec3::new(-1.0, -1.0, -1.0),
            max: Vec3::new(1.0, 1.0, 1.0),
        };
        let b = PhysicsAabb {
            min: Vec3::new(0.5, 0.5, 0.5),
            max: Vec3::new(2.0, 2.0, 2.0),
        };
        let c = PhysicsAabb {
            min: Vec3::new(2.0, 2.0, 2.0),
            max: Vec3::new(3.0, 3.0, 3.0),
        };
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_collider_update_applies_offset() {
        let mut world = hecs::World::new();
        let entity = world.spawn(());
        let body = RigidBody::new_dynamic(1.0)
            .with_position(Vec3::new(0.0, 1.0, 0.0))
            .with_orientation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        let mut collider = Collider::sphere(0.5).with_offset(Vec3::X);
        collider.update(&body);

        // Body-space +X maps to world -Z after a quarter turn about Y.
        let Primitive::Sphere(sphere) = collider.primitive(entity) else {
            panic!("expected a sphere");
        };
        assert!((sphere.center - Vec3::new(0.0, 1.0, -1.0)).length() < 1e-5);
        assert_eq!(sphere.body, entity);
        assert!(collider.aabb.is_some());
    }

    #[test]
    fn test_box_corners() {
        let mut world = hecs::World::new();
        let entity = world.spawn(());
        let cuboid = OrientedBox {
            body: entity,
            transform: Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0)),
            half_extents: Vec3::new(1.0, 0.5, 0.25),
        };
        let corners = cuboid.corners();
        assert!((corners[0] - Vec3::new(1.0, 2.5, 0.25)).length() < 1e-6);
        assert!((corners[7] - Vec3::new(-1.0, 1.5, -0.25)).length() < 1e-6);
        assert!((cuboid.center() - Vec3::new(0.0, 2.0, 0.0)).length() < 1e-6);
    }
}

//! Stateless geometry helpers shared by the narrow-phase tests.

use glam::Vec3;

use super::collider::{OrientedBox, Plane};
use super::contact::Contact;

/// Axes shorter than this (squared) cannot separate anything and are skipped.
pub const AXIS_EPSILON: f32 = 1e-4;

/// Edge-edge closest-point systems with a smaller determinant are treated as
/// parallel.
const PARALLEL_EPSILON: f32 = 1e-4;

/// Half-length of the box's projection onto `axis`.
#[inline]
pub fn transform_to_axis(cuboid: &OrientedBox, axis: Vec3) -> f32 {
    cuboid.half_extents.x * axis.dot(cuboid.axis(0)).abs()
        + cuboid.half_extents.y * axis.dot(cuboid.axis(1)).abs()
        + cuboid.half_extents.z * axis.dot(cuboid.axis(2)).abs()
}

/// Overlap of the two boxes' projections onto `axis`. Negative when the
/// axis separates them.
#[inline]
pub fn penetration_on_axis(
    one: &OrientedBox,
    two: &OrientedBox,
    axis: Vec3,
    to_centre: Vec3,
) -> f32 {
    let one_project = transform_to_axis(one, axis);
    let two_project = transform_to_axis(two, axis);
    let distance = to_centre.dot(axis).abs();
    one_project + two_project - distance
}

/// Running minimum over the SAT candidate axes.
#[derive(Debug, Clone, Copy)]
pub struct SmallestPenetration {
    pub depth: f32,
    pub axis_index: Option<usize>,
}

impl Default for SmallestPenetration {
    fn default() -> Self {
        Self {
            depth: f32::MAX,
            axis_index: None,
        }
    }
}

/// Test one candidate separating axis. Returns `false` when the axis
/// separates the boxes; otherwise records the axis if it is the shallowest
/// so far. Degenerate axes pass without being recorded.
pub fn try_axis(
    one: &OrientedBox,
    two: &OrientedBox,
    axis: Vec3,
    to_centre: Vec3,
    index: usize,
    smallest: &mut SmallestPenetration,
) -> bool {
    if axis.length_squared() < AXIS_EPSILON {
        return true;
    }
    let axis = axis.normalize();

    let penetration = penetration_on_axis(one, two, axis, to_centre);
    if penetration < 0.0 {
        return false;
    }
    if penetration < smallest.depth {
        smallest.depth = penetration;
        smallest.axis_index = Some(index);
    }
    true
}

/// Whether any part of the box lies behind the plane.
pub fn box_and_half_space(cuboid: &OrientedBox, plane: &Plane) -> bool {
    let projected_radius = transform_to_axis(cuboid, plane.normal);
    let box_distance = plane.normal.dot(cuboid.center()) - projected_radius;
    box_distance <= plane.offset
}

/// Contact for a corner of `two` against face `axis_index` of `one`.
///
/// `to_centre` runs from `one`'s centre to `two`'s. The normal points from
/// `two` toward `one`.
pub fn point_face_contact(
    one: &OrientedBox,
    two: &OrientedBox,
    to_centre: Vec3,
    axis_index: usize,
    penetration: f32,
) -> Contact {
    let mut normal = one.axis(axis_index);
    if normal.dot(to_centre) > 0.0 {
        normal = -normal;
    }

    // Pick the corner of `two` deepest inside `one`.
    let mut vertex = two.half_extents;
    if two.axis(0).dot(normal) < 0.0 {
        vertex.x = -vertex.x;
    }
    if two.axis(1).dot(normal) < 0.0 {
        vertex.y = -vertex.y;
    }
    if two.axis(2).dot(normal) < 0.0 {
        vertex.z = -vertex.z;
    }

    Contact::new(
        one.body,
        Some(two.body),
        two.transform.transform_point3(vertex),
        normal,
        penetration,
    )
}

/// Midpoint of the closest points between two edges.
///
/// Each edge is given by a point on it, a direction, and its half-length.
/// When the edges are near-parallel, or the closest points fall outside
/// either edge, the result falls back to `p_one` if `use_one` is set and
/// `p_two` otherwise.
pub fn edge_contact_point(
    p_one: Vec3,
    d_one: Vec3,
    one_size: f32,
    p_two: Vec3,
    d_two: Vec3,
    two_size: f32,
    use_one: bool,
) -> Vec3 {
    let fallback = if use_one { p_one } else { p_two };

    let sm_one = d_one.length_squared();
    let sm_two = d_two.length_squared();
    let dp_one_two = d_two.dot(d_one);

    let to_st = p_one - p_two;
    let dp_sta_one = d_one.dot(to_st);
    let dp_sta_two = d_two.dot(to_st);

    let denom = sm_one * sm_two - dp_one_two * dp_one_two;
    if denom.abs() < PARALLEL_EPSILON {
        return fallback;
    }

    let mua = (dp_one_two * dp_sta_two - sm_two * dp_sta_one) / denom;
    let mub = (sm_one * dp_sta_two - dp_one_two * dp_sta_one) / denom;

    if mua.abs() > one_size || mub.abs() > two_size {
        return fallback;
    }

    let c_one = p_one + d_one * mua;
    let c_two = p_two + d_two * mub;
    (c_one + c_two) * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::physics::PlaneKind;
    use glam::{Mat4, Quat};

    fn cuboid(entity: hecs::Entity, center: Vec3, rotation: Quat, half: Vec3) -> OrientedBox {
        OrientedBox {
            body: entity,
            transform: Mat4::from_rotation_translation(rotation, center),
            half_extents: half,
        }
    }

    #[test]
    fn test_transform_to_axis_rotated() {
        let mut world = hecs::World::new();
        let e = world.spawn(());
        let b = cuboid(
            e,
            Vec3::ZERO,
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_4),
            Vec3::splat(0.5),
        );
        // A unit square turned 45 degrees projects to its half-diagonal.
        let half = transform_to_axis(&b, Vec3::X);
        assert!((half - 0.5 * 2f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn test_penetration_on_axis() {
        let mut world = hecs::World::new();
        let (e1, e2) = (world.spawn(()), world.spawn(()));
        let one = cuboid(e1, Vec3::ZERO, Quat::IDENTITY, Vec3::splat(0.5));
        let two = cuboid(e2, Vec3::new(0.9, 0.0, 0.0), Quat::IDENTITY, Vec3::splat(0.5));
        let to_centre = two.center() - one.center();

        assert!((penetration_on_axis(&one, &two, Vec3::X, to_centre) - 0.1).abs() < 1e-5);
        assert!((penetration_on_axis(&one, &two, Vec3::Y, to_centre) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_try_axis_skips_degenerate() {
        let mut world = hecs::World::new();
        let (e1, e2) = (world.spawn(()), world.spawn(()));
        let one = cuboid(e1, Vec3::ZERO, Quat::IDENTITY, Vec3::splat(0.5));
        let two = cuboid(e2, Vec3::new(5.0, 0.0, 0.0), Quat::IDENTITY, Vec3::splat(0.5));
        let to_centre = two.center() - one.center();
        let mut smallest = SmallestPenetration::default();

        assert!(try_axis(&one, &two, Vec3::ZERO, to_centre, 6, &mut smallest));
        assert!(smallest.axis_index.is_none());
        assert!(!try_axis(&one, &two, Vec3::X, to_centre, 0, &mut smallest));
        assert!(try_axis(&one, &two, Vec3::Y, to_centre, 1, &mut smallest));
        assert_eq!(smallest.axis_index, Some(1));
    }

    #[test]
    fn test_box_and_half_space() {
        let mut world = hecs::World::new();
        let e = world.spawn(());
        let plane = Plane {
            body: e,
            normal: Vec3::Y,
            offset: 0.0,
            kind: PlaneKind::HalfSpace,
        };
        let resting = cuboid(e, Vec3::new(0.0, 0.4, 0.0), Quat::IDENTITY, Vec3::splat(0.5));
        let above = cuboid(e, Vec3::new(0.0, 0.6, 0.0), Quat::IDENTITY, Vec3::splat(0.5));
        assert!(box_and_half_space(&resting, &plane));
        assert!(!box_and_half_space(&above, &plane));
    }

    #[test]
    fn test_edge_contact_point_crossing_edges() {
        // Edge along X at y = 0.1 and edge along Z at y = -0.1, crossing above the origin.
        let point = edge_contact_point(
            Vec3::new(0.3, 0.1, 0.0),
            Vec3::X,
            1.0,
            Vec3::new(0.0, -0.1, -0.2),
            Vec3::Z,
            1.0,
            true,
        );
        assert!(point.length() < 1e-5, "point = {point}");
    }

    #[test]
    fn test_edge_contact_point_fallbacks() {
        let p_one = Vec3::new(0.0, 1.0, 0.0);
        let p_two = Vec3::new(0.0, -1.0, 0.0);

        // Parallel edges.
        let parallel = edge_contact_point(p_one, Vec3::X, 1.0, p_two, Vec3::X, 1.0, false);
        assert_eq!(parallel, p_two);

        // Closest point lies beyond the first edge's half-length.
        let outside = edge_contact_point(
            Vec3::new(5.0, 0.1, 0.0),
            Vec3::X,
            1.0,
            Vec3::new(0.0, -0.1, 0.0),
            Vec3::Z,
            1.0,
            true,
        );
        assert_eq!(outside, Vec3::new(5.0, 0.1, 0.0));
    }
}

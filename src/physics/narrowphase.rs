//! Narrowphase collision detection: exact tests per shape pair.
//!
//! Every test writes its contacts straight into [`CollisionData`] and
//! returns how many it wrote. All of them return 0 without doing any
//! geometry once the sink is full.
//!
//! Supported pairs are sphere–sphere, sphere–plane, box–half-space,
//! box–sphere and box–box. Plane–plane and box against a two-sided plane
//! have no test and never produce contacts.

use glam::Vec3;

use crate::ecs::components::physics::PlaneKind;

use super::collider::{OrientedBox, Plane, Primitive, Sphere};
use super::contact::{CollisionData, Contact};
use super::intersection::{
    box_and_half_space as box_overlaps_half_space, edge_contact_point, point_face_contact,
    try_axis, SmallestPenetration,
};

/// Dispatch on the shape pair. Unsupported pairs are skipped.
pub fn detect_collision(one: &Primitive, two: &Primitive, data: &mut CollisionData) -> usize {
    match (one, two) {
        (Primitive::Sphere(a), Primitive::Sphere(b)) => sphere_and_sphere(a, b, data),
        (Primitive::Box(a), Primitive::Box(b)) => box_and_box(a, b, data),
        (Primitive::Sphere(s), Primitive::Plane(p))
        | (Primitive::Plane(p), Primitive::Sphere(s)) => {
            match p.kind {
                PlaneKind::Infinite => sphere_and_true_plane(s, p, data),
                PlaneKind::HalfSpace => sphere_and_half_space(s, p, data),
            }
        }
        (Primitive::Box(b), Primitive::Plane(p)) | (Primitive::Plane(p), Primitive::Box(b))
            if p.kind == PlaneKind::HalfSpace =>
        {
            box_and_half_space(b, p, data)
        }
        (Primitive::Box(b), Primitive::Sphere(s)) | (Primitive::Sphere(s), Primitive::Box(b)) => {
            box_and_sphere(b, s, data)
        }
        _ => {
            tracing::trace!(
                "no narrowphase test for {:?} / {:?}",
                one.body(),
                two.body()
            );
            0
        }
    }
}

/// Stores `contact` and reports whether it was accepted.
fn push(data: &mut CollisionData, contact: Contact) -> usize {
    usize::from(data.add_contact(contact).is_ok())
}

/// Sphere against sphere.
///
/// The contact point sits in the middle of the overlap along the centre line.
pub fn sphere_and_sphere(one: &Sphere, two: &Sphere, data: &mut CollisionData) -> usize {
    if !data.has_more_contacts() {
        return 0;
    }

    let midline = one.center - two.center;
    let size = midline.length();
    let radii = one.radius + two.radius;
    if size <= 0.0 || size >= radii {
        return 0;
    }

    let normal = midline / size;
    let penetration = radii - size;
    let point = one.center - normal * (one.radius - penetration * 0.5);

    push(
        data,
        Contact::new(one.body, Some(two.body), point, normal, penetration),
    )
}

/// Sphere against a two-sided plane. The normal faces the sphere's side.
pub fn sphere_and_true_plane(sphere: &Sphere, plane: &Plane, data: &mut CollisionData) -> usize {
    if !data.has_more_contacts() {
        return 0;
    }

    let centre_distance = plane.signed_distance(sphere.center);
    if centre_distance * centre_distance > sphere.radius * sphere.radius {
        return 0;
    }

    let normal = if centre_distance < 0.0 {
        -plane.normal
    } else {
        plane.normal
    };
    let penetration = sphere.radius - centre_distance.abs();
    let point = sphere.center - plane.normal * centre_distance;

    push(data, Contact::new(sphere.body, None, point, normal, penetration))
}

/// Sphere against a one-sided plane.
pub fn sphere_and_half_space(sphere: &Sphere, plane: &Plane, data: &mut CollisionData) -> usize {
    if !data.has_more_contacts() {
        return 0;
    }

    let centre_distance = plane.signed_distance(sphere.center);
    if centre_distance.abs() >= sphere.radius {
        return 0;
    }

    let ball_distance = centre_distance - sphere.radius;
    let point = sphere.center - plane.normal * (ball_distance + sphere.radius);

    push(
        data,
        Contact::new(sphere.body, None, point, plane.normal, -ball_distance),
    )
}

/// Box against a one-sided plane: one contact per corner behind the plane.
pub fn box_and_half_space(cuboid: &OrientedBox, plane: &Plane, data: &mut CollisionData) -> usize {
    if !data.has_more_contacts() {
        return 0;
    }
    if !box_overlaps_half_space(cuboid, plane) {
        return 0;
    }

    let mut used = 0;
    for vertex in cuboid.corners() {
        let distance = plane.signed_distance(vertex);
        if distance > 0.0 {
            continue;
        }
        let point = vertex - plane.normal * distance;
        used += push(
            data,
            Contact::new(cuboid.body, None, point, plane.normal, -distance),
        );
        if !data.has_more_contacts() {
            break;
        }
    }
    used
}

/// Box against sphere. Body A is the sphere, so the normal runs from the
/// box's closest point out to the sphere centre.
pub fn box_and_sphere(cuboid: &OrientedBox, sphere: &Sphere, data: &mut CollisionData) -> usize {
    if !data.has_more_contacts() {
        return 0;
    }

    let centre = sphere.center;
    let rel_centre = cuboid.transform.inverse().transform_point3(centre);
    let half = cuboid.half_extents;

    if rel_centre.x.abs() - sphere.radius > half.x
        || rel_centre.y.abs() - sphere.radius > half.y
        || rel_centre.z.abs() - sphere.radius > half.z
    {
        return 0;
    }

    let closest = rel_centre.clamp(-half, half);
    let dist_sq = (closest - rel_centre).length_squared();
    if dist_sq > sphere.radius * sphere.radius || dist_sq <= 0.0 {
        return 0;
    }

    let closest_world = cuboid.transform.transform_point3(closest);
    let normal = (centre - closest_world).normalize_or_zero();
    if normal == Vec3::ZERO {
        return 0;
    }

    push(
        data,
        Contact::new(
            sphere.body,
            Some(cuboid.body),
            closest_world,
            normal,
            sphere.radius - dist_sq.sqrt(),
        ),
    )
}

/// Box against box by the separating axis theorem.
///
/// Axes 0-2 are `one`'s faces, 3-5 `two`'s faces, 6-14 the edge-edge cross
/// products. A face axis yields a point-face contact, an edge axis an
/// edge-edge contact.
pub fn box_and_box(one: &OrientedBox, two: &OrientedBox, data: &mut CollisionData) -> usize {
    if !data.has_more_contacts() {
        return 0;
    }

    let to_centre = two.center() - one.center();
    let mut smallest = SmallestPenetration::default();

    for i in 0..3 {
        if !try_axis(one, two, one.axis(i), to_centre, i, &mut smallest) {
            return 0;
        }
    }
    for i in 0..3 {
        if !try_axis(one, two, two.axis(i), to_centre, i + 3, &mut smallest) {
            return 0;
        }
    }
    let best_single_axis = smallest.axis_index;

    for i in 0..3 {
        for j in 0..3 {
            let axis = one.axis(i).cross(two.axis(j));
            if !try_axis(one, two, axis, to_centre, 6 + i * 3 + j, &mut smallest) {
                return 0;
            }
        }
    }

    let Some(best) = smallest.axis_index else {
        return 0;
    };
    let penetration = smallest.depth;

    let contact = match best {
        0..=2 => point_face_contact(one, two, to_centre, best, penetration),
        3..=5 => point_face_contact(two, one, -to_centre, best - 3, penetration),
        _ => {
            let one_axis_index = (best - 6) / 3;
            let two_axis_index = (best - 6) % 3;
            let one_axis = one.axis(one_axis_index);
            let two_axis = two.axis(two_axis_index);
            let mut axis = one_axis.cross(two_axis).normalize();
            if axis.dot(to_centre) > 0.0 {
                axis = -axis;
            }

            // Find the witness edge on each box: zero along the edge's own
            // axis, the extreme facing the other box on the rest.
            let mut on_one_edge = one.half_extents.to_array();
            let mut on_two_edge = two.half_extents.to_array();
            for i in 0..3 {
                if i == one_axis_index {
                    on_one_edge[i] = 0.0;
                } else if one.axis(i).dot(axis) > 0.0 {
                    on_one_edge[i] = -on_one_edge[i];
                }

                if i == two_axis_index {
                    on_two_edge[i] = 0.0;
                } else if two.axis(i).dot(axis) < 0.0 {
                    on_two_edge[i] = -on_two_edge[i];
                }
            }
            let on_one_edge = one.transform.transform_point3(Vec3::from_array(on_one_edge));
            let on_two_edge = two.transform.transform_point3(Vec3::from_array(on_two_edge));

            let vertex = edge_contact_point(
                on_one_edge,
                one_axis,
                one.half_extents[one_axis_index],
                on_two_edge,
                two_axis,
                two.half_extents[two_axis_index],
                best_single_axis.is_some_and(|axis| axis > 2),
            );

            Contact::new(one.body, Some(two.body), vertex, axis, penetration)
        }
    };

    push(data, contact)
}

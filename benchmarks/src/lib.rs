//! Scene builders shared by the benchmarks.

use anyhow::Context;
use glam::{Quat, Vec3};
use ricochet::physics::rigid_body::sync_colliders;
use ricochet::{
    box_inertia_tensor, Collider, CollisionConfig, CollisionWorld, Contact, PlaneKind, RigidBody,
    RigidBodyPair,
};

/// Cheap deterministic scatter so runs are comparable.
fn scatter(i: usize, spread: f32) -> Vec3 {
    let h = (i as u32).wrapping_mul(2_654_435_761);
    let x = (h & 0xffff) as f32 / 65535.0;
    let z = ((h >> 16) & 0xffff) as f32 / 65535.0;
    Vec3::new((x - 0.5) * spread, 1.0 + (i % 7) as f32, (z - 0.5) * spread)
}

fn sphere(world: &mut hecs::World, position: Vec3, radius: f32) -> hecs::Entity {
    world.spawn((
        RigidBody::new_dynamic(1.0).with_position(position),
        Collider::sphere(radius),
    ))
}

fn cuboid(world: &mut hecs::World, position: Vec3, half: Vec3) -> hecs::Entity {
    world.spawn((
        RigidBody::new_dynamic(1.0)
            .with_inertia_tensor(box_inertia_tensor(1.0, half))
            .with_position(position)
            .with_orientation(Quat::from_rotation_y(position.x)),
        Collider::cuboid(half),
    ))
}

/// `n` unit-radius spheres packed into a 40 m square.
pub fn setup_sphere_world(n: usize) -> hecs::World {
    let mut world = hecs::World::new();
    for i in 0..n {
        sphere(&mut world, scatter(i, 40.0), 0.5);
    }
    sync_colliders(&mut world);
    world
}

/// Alternating spheres and boxes over a 40 m square.
pub fn setup_mixed_world(n: usize) -> hecs::World {
    let mut world = hecs::World::new();
    for i in 0..n {
        let position = scatter(i, 40.0);
        if i % 2 == 0 {
            sphere(&mut world, position, 0.5);
        } else {
            cuboid(&mut world, position, Vec3::splat(0.4));
        }
    }
    sync_colliders(&mut world);
    world
}

/// Spheres spread over the whole default grid region.
pub fn setup_sparse_world(n: usize) -> hecs::World {
    let mut world = hecs::World::new();
    for i in 0..n {
        sphere(&mut world, scatter(i, 98.0), 0.5);
    }
    sync_colliders(&mut world);
    world
}

/// `n` spheres resting slightly sunk into a floor, with their contacts.
pub fn setup_contacts(n: usize) -> anyhow::Result<(hecs::World, Vec<Contact>)> {
    let mut world = hecs::World::new();
    let mut contacts = Vec::with_capacity(n);
    for i in 0..n {
        let position = Vec3::new(i as f32 * 0.98, 0.45, 0.0);
        let body = world.spawn((
            RigidBody::new_dynamic(1.0)
                .with_position(position)
                .with_velocity(Vec3::new(0.0, -1.0, 0.0)),
        ));
        let mut contact = Contact::new(
            body,
            None,
            Vec3::new(position.x, 0.0, 0.0),
            Vec3::Y,
            0.05,
        );
        contact.restitution = 0.3;
        contacts.push(contact);
    }

    // Chain neighbours so the resolver has shared bodies to propagate through.
    for i in 1..n {
        let (Some(a), Some(b)) = (contacts[i - 1].bodies[0], contacts[i].bodies[0]) else {
            continue;
        };
        let pair = RigidBodyPair::new(&world, a, b)
            .with_context(|| format!("pairing contact bodies {} and {}", i - 1, i))?;
        let mut contact = Contact::new(
            pair.b(),
            Some(pair.a()),
            Vec3::new(i as f32 * 0.98 - 0.49, 0.45, 0.0),
            Vec3::X,
            0.02,
        );
        contact.restitution = 0.3;
        contacts.push(contact);
    }
    Ok((world, contacts))
}

/// A floor plus `n` falling bodies, ready to step.
pub fn setup_scene(n: usize) -> (hecs::World, CollisionWorld) {
    let mut world = setup_mixed_world(n);
    world.spawn((
        RigidBody::new_static(),
        Collider::plane(Vec3::Y, 0.0, PlaneKind::HalfSpace),
    ));
    sync_colliders(&mut world);
    (world, CollisionWorld::new(CollisionConfig::default()))
}

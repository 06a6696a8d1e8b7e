//! Rigid body integration functions.
//!
//! A minimal integrator that keeps bodies moving between collision steps.

use glam::Vec3;

use crate::ecs::components::physics::{Collider, RigidBody};
use crate::error::{CollisionError, Result};

use super::contact::add_scaled_rotation;

/// Apply gravity force to every awake body with finite mass.
pub fn apply_gravity(world: &mut hecs::World, gravity: Vec3) {
    for (_, rb) in world.query_mut::<&mut RigidBody>() {
        if rb.has_finite_mass() && rb.is_awake() {
            rb.force_accumulator += gravity / rb.inverse_mass;
        }
    }
}

/// Advance awake, movable bodies by `dt` with semi-implicit Euler.
///
/// Records the linear acceleration used as the body's last-frame
/// acceleration, then refreshes its derived data.
pub fn integrate_bodies(world: &mut hecs::World, dt: f32) {
    for (_, rb) in world.query_mut::<&mut RigidBody>() {
        if !rb.is_awake() || !rb.has_finite_mass() {
            continue;
        }

        let acceleration = rb.acceleration + rb.force_accumulator * rb.inverse_mass;
        rb.set_last_frame_acceleration(acceleration);
        let angular_acceleration = rb.inverse_inertia_tensor_world() * rb.torque_accumulator;

        rb.velocity += acceleration * dt;
        rb.rotation += angular_acceleration * dt;

        // Apply damping
        rb.velocity *= (1.0 - rb.linear_damping).max(0.0);
        rb.rotation *= (1.0 - rb.angular_damping).max(0.0);

        rb.position += rb.velocity * dt;
        rb.orientation = add_scaled_rotation(rb.orientation, rb.rotation * dt);

        rb.calculate_derived_data();
    }
}

/// Refresh derived data (transform, world inertia) on every body.
pub fn calculate_derived_data(world: &mut hecs::World) {
    for (_, rb) in world.query_mut::<&mut RigidBody>() {
        rb.calculate_derived_data();
    }
}

/// Refresh every collider's cached world transform and AABB from its body.
pub fn sync_colliders(world: &mut hecs::World) {
    for (_, (rb, collider)) in world.query_mut::<(&RigidBody, &mut Collider)>() {
        collider.update(rb);
    }
}

/// Clear force and torque accumulators on all rigid bodies.
pub fn clear_forces(world: &mut hecs::World) {
    for (_, rb) in world.query_mut::<&mut RigidBody>() {
        rb.force_accumulator = Vec3::ZERO;
        rb.torque_accumulator = Vec3::ZERO;
    }
}

/// Wake a sleeping body.
pub fn wake_body(world: &mut hecs::World, entity: hecs::Entity) -> Result<()> {
    let mut rb = world
        .get::<&mut RigidBody>(entity)
        .map_err(|_| CollisionError::MissingBody(entity))?;
    if !rb.is_awake() {
        rb.set_awake(true);
    }
    Ok(())
}

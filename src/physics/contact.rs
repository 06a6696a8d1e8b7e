//! Contact data structures for collision response.
//!
//! A [`Contact`] is created by the narrow phase and consumed by the resolver
//! within the same step. It holds entity handles, never the bodies
//! themselves, and must not outlive the step that produced it.

use glam::{Mat3, Quat, Vec3};

use crate::ecs::components::physics::RigidBody;
use crate::error::{CollisionError, Result};

/// Velocity and rotation changes applied to each body by one impulse.
#[derive(Debug, Clone, Copy, Default)]
pub struct VelocityChange {
    pub velocity: [Vec3; 2],
    pub rotation: [Vec3; 2],
}

/// Linear and angular displacement applied to each body by one correction.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionChange {
    pub linear: [Vec3; 2],
    pub angular: [Vec3; 2],
}

/// A single point of contact between one or two bodies.
///
/// The normal points from the second body toward the first. A missing second
/// body stands for immovable scenery.
#[derive(Debug, Clone, Copy)]
pub struct Contact {
    /// Contact point in world space.
    pub point: Vec3,
    /// Contact normal (from body B toward body A).
    pub normal: Vec3,
    /// Penetration depth. Positive when overlapping.
    pub penetration: f32,
    pub friction: f32,
    pub restitution: f32,
    pub bodies: [Option<hecs::Entity>; 2],
    pub(crate) contact_to_world: Mat3,
    pub(crate) relative_contact_position: [Vec3; 2],
    pub(crate) contact_velocity: Vec3,
    pub(crate) desired_delta_velocity: f32,
}

impl Contact {
    pub fn new(
        one: hecs::Entity,
        two: Option<hecs::Entity>,
        point: Vec3,
        normal: Vec3,
        penetration: f32,
    ) -> Self {
        Self {
            point,
            normal,
            penetration,
            friction: 0.0,
            restitution: 0.0,
            bodies: [Some(one), two],
            contact_to_world: Mat3::IDENTITY,
            relative_contact_position: [Vec3::ZERO; 2],
            contact_velocity: Vec3::ZERO,
            desired_delta_velocity: 0.0,
        }
    }

    /// Contact-space basis; the first column is the normal.
    #[inline]
    pub fn contact_to_world(&self) -> Mat3 {
        self.contact_to_world
    }

    #[inline]
    pub fn relative_contact_position(&self, index: usize) -> Vec3 {
        self.relative_contact_position[index]
    }

    /// Closing velocity in contact space.
    #[inline]
    pub fn contact_velocity(&self) -> Vec3 {
        self.contact_velocity
    }

    #[inline]
    pub fn desired_delta_velocity(&self) -> f32 {
        self.desired_delta_velocity
    }

    /// Swap the two bodies, reversing the normal.
    pub fn swap_bodies(&mut self) {
        self.normal = -self.normal;
        self.bodies.swap(0, 1);
    }

    /// Compute the contact basis, relative positions, closing velocity and
    /// desired velocity change. Must run before either `apply_*` method.
    pub fn calculate_internals(
        &mut self,
        world: &hecs::World,
        duration: f32,
        resting_velocity_limit: f32,
    ) {
        if self.bodies[0].is_none() {
            self.swap_bodies();
        }
        let states = read_bodies(world, &self.bodies);
        let Some(first) = states[0] else {
            return;
        };

        self.calculate_contact_basis();

        self.relative_contact_position[0] = self.point - first.position;
        self.contact_velocity = self.local_velocity(&first, 0, duration);
        if let Some(second) = states[1] {
            self.relative_contact_position[1] = self.point - second.position;
            self.contact_velocity -= self.local_velocity(&second, 1, duration);
        }

        self.calculate_desired_delta_velocity(world, duration, resting_velocity_limit);
    }

    /// Recompute the velocity change needed along the normal, with
    /// restitution dropped below the resting limit.
    pub fn calculate_desired_delta_velocity(
        &mut self,
        world: &hecs::World,
        duration: f32,
        resting_velocity_limit: f32,
    ) {
        let states = read_bodies(world, &self.bodies);

        let mut velocity_from_acc = 0.0;
        if let Some(first) = states[0].filter(|s| s.awake) {
            velocity_from_acc += (first.last_frame_acceleration * duration).dot(self.normal);
        }
        if let Some(second) = states[1].filter(|s| s.awake) {
            velocity_from_acc -= (second.last_frame_acceleration * duration).dot(self.normal);
        }

        let restitution = if self.contact_velocity.x.abs() < resting_velocity_limit {
            0.0
        } else {
            self.restitution
        };

        self.desired_delta_velocity = -self.contact_velocity.x
            - restitution * (self.contact_velocity.x - velocity_from_acc);
    }

    /// Wake a sleeping body that touches an awake one.
    pub fn match_awake_state(&self, world: &mut hecs::World) {
        let (Some(a), Some(b)) = (self.bodies[0], self.bodies[1]) else {
            return;
        };
        let awake_a = world.get::<&RigidBody>(a).map_or(false, |rb| rb.is_awake());
        let awake_b = world.get::<&RigidBody>(b).map_or(false, |rb| rb.is_awake());

        if awake_a != awake_b {
            let sleeper = if awake_a { b } else { a };
            if let Ok(mut rb) = world.get::<&mut RigidBody>(sleeper) {
                rb.set_awake(true);
            }
        }
    }

    /// Apply the impulse that removes the desired velocity change.
    pub fn apply_velocity_change(&mut self, world: &mut hecs::World) -> VelocityChange {
        let states = read_bodies(world, &self.bodies);

        let impulse_contact = if self.friction == 0.0 {
            self.frictionless_impulse(&states)
        } else {
            self.friction_impulse(&states)
        };
        let impulse = self.contact_to_world * impulse_contact;

        let mut change = VelocityChange::default();
        if let Some(first) = states[0] {
            let torque = self.relative_contact_position[0].cross(impulse);
            change.rotation[0] = first.inverse_inertia_world * torque;
            change.velocity[0] = impulse * first.inverse_mass;
        }
        if let Some(second) = states[1] {
            let torque = impulse.cross(self.relative_contact_position[1]);
            change.rotation[1] = second.inverse_inertia_world * torque;
            change.velocity[1] = impulse * -second.inverse_mass;
        }

        for (slot, entity) in self.bodies.iter().enumerate() {
            let Some(entity) = entity else { continue };
            if let Ok(mut rb) = world.get::<&mut RigidBody>(*entity) {
                rb.add_velocity(change.velocity[slot]);
                rb.add_rotation(change.rotation[slot]);
            }
        }

        change
    }

    /// Push the bodies apart by `penetration`, split between linear and
    /// angular motion in proportion to each body's inertia at the contact.
    ///
    /// The angular share of each body is limited to `angular_limit` times the
    /// lever arm perpendicular to the normal; the remainder becomes linear.
    pub fn apply_position_change(
        &mut self,
        world: &mut hecs::World,
        penetration: f32,
        angular_limit: f32,
    ) -> PositionChange {
        let states = read_bodies(world, &self.bodies);
        let normal = self.normal;

        let mut angular_inertia = [0.0f32; 2];
        let mut linear_inertia = [0.0f32; 2];
        let mut total_inertia = 0.0;
        for (slot, state) in states.iter().enumerate() {
            let Some(state) = state else { continue };
            let r = self.relative_contact_position[slot];
            let angular_inertia_world = (state.inverse_inertia_world * r.cross(normal)).cross(r);
            angular_inertia[slot] = angular_inertia_world.dot(normal);
            linear_inertia[slot] = state.inverse_mass;
            total_inertia += linear_inertia[slot] + angular_inertia[slot];
        }

        let mut change = PositionChange::default();
        if total_inertia <= 0.0 {
            return change;
        }

        for (slot, state) in states.iter().enumerate() {
            let (Some(state), Some(entity)) = (state, self.bodies[slot]) else {
                continue;
            };
            let sign = if slot == 0 { 1.0 } else { -1.0 };
            let mut angular_move = sign * penetration * (angular_inertia[slot] / total_inertia);
            let mut linear_move = sign * penetration * (linear_inertia[slot] / total_inertia);

            let r = self.relative_contact_position[slot];
            let projection = r - normal * r.dot(normal);
            let max_magnitude = angular_limit * projection.length();
            if angular_move.abs() > max_magnitude {
                let total_move = angular_move + linear_move;
                angular_move = angular_move.clamp(-max_magnitude, max_magnitude);
                linear_move = total_move - angular_move;
            }

            let angular_change = if angular_move == 0.0 || angular_inertia[slot] == 0.0 {
                Vec3::ZERO
            } else {
                let scale = angular_move / angular_inertia[slot];
                state.inverse_inertia_world * r.cross(normal) * scale
            };
            let linear_change = normal * linear_move;

            if let Ok(mut rb) = world.get::<&mut RigidBody>(entity) {
                rb.position += linear_change;
                rb.orientation = add_scaled_rotation(rb.orientation, angular_change);
                if !rb.is_awake() {
                    rb.calculate_derived_data();
                }
            }

            change.linear[slot] = linear_change;
            change.angular[slot] = angular_change;
        }

        change
    }

    /// Build an orthonormal basis whose x axis is the contact normal.
    fn calculate_contact_basis(&mut self) {
        let n = self.normal;
        let (tangent, bitangent) = if n.x.abs() > n.y.abs() {
            let s = 1.0 / (n.z * n.z + n.x * n.x).sqrt();
            let t = Vec3::new(n.z * s, 0.0, -n.x * s);
            (t, Vec3::new(n.y * t.z, n.z * t.x - n.x * t.z, -n.y * t.x))
        } else {
            let s = 1.0 / (n.z * n.z + n.y * n.y).sqrt();
            let t = Vec3::new(0.0, -n.z * s, n.y * s);
            (t, Vec3::new(n.y * t.z - n.z * t.y, -n.x * t.z, n.x * t.y))
        };
        self.contact_to_world = Mat3::from_cols(n, tangent, bitangent);
    }

    /// Velocity of the contact point on one body, in contact space.
    ///
    /// Includes the planar part of last frame's acceleration so friction can
    /// cancel it.
    fn local_velocity(&self, state: &BodyState, slot: usize, duration: f32) -> Vec3 {
        let world_to_contact = self.contact_to_world.transpose();
        let velocity =
            state.rotation.cross(self.relative_contact_position[slot]) + state.velocity;
        let mut acc_velocity = world_to_contact * (state.last_frame_acceleration * duration);
        acc_velocity.x = 0.0;
        world_to_contact * velocity + acc_velocity
    }

    fn frictionless_impulse(&self, states: &[Option<BodyState>; 2]) -> Vec3 {
        let mut delta_velocity = 0.0;
        for (slot, state) in states.iter().enumerate() {
            let Some(state) = state else { continue };
            let r = self.relative_contact_position[slot];
            let delta_vel_world = (state.inverse_inertia_world * r.cross(self.normal)).cross(r);
            delta_velocity += delta_vel_world.dot(self.normal) + state.inverse_mass;
        }
        if delta_velocity <= 0.0 {
            return Vec3::ZERO;
        }
        Vec3::new(self.desired_delta_velocity / delta_velocity, 0.0, 0.0)
    }

    /// Impulse that also removes tangential velocity, limited to the friction cone.
    fn friction_impulse(&self, states: &[Option<BodyState>; 2]) -> Vec3 {
        let mut inverse_mass = 0.0;
        let mut delta_vel_world = Mat3::ZERO;
        for (slot, state) in states.iter().enumerate() {
            let Some(state) = state else { continue };
            let impulse_to_torque = skew_symmetric(self.relative_contact_position[slot]);
            delta_vel_world -= impulse_to_torque * state.inverse_inertia_world * impulse_to_torque;
            inverse_mass += state.inverse_mass;
        }

        let mut delta_velocity =
            self.contact_to_world.transpose() * delta_vel_world * self.contact_to_world;
        delta_velocity += Mat3::from_diagonal(Vec3::splat(inverse_mass));
        if delta_velocity.determinant() == 0.0 {
            return self.frictionless_impulse(states);
        }

        let kill = Vec3::new(
            self.desired_delta_velocity,
            -self.contact_velocity.y,
            -self.contact_velocity.z,
        );
        let mut impulse = delta_velocity.inverse() * kill;

        let planar = (impulse.y * impulse.y + impulse.z * impulse.z).sqrt();
        if planar > 0.0 && planar > impulse.x * self.friction {
            // Dynamic friction: keep the direction, cap the magnitude.
            impulse.y /= planar;
            impulse.z /= planar;
            let normal_response = delta_velocity.x_axis.x
                + delta_velocity.y_axis.x * self.friction * impulse.y
                + delta_velocity.z_axis.x * self.friction * impulse.z;
            impulse.x = self.desired_delta_velocity / normal_response;
            impulse.y *= self.friction * impulse.x;
            impulse.z *= self.friction * impulse.x;
        }
        impulse
    }
}

/// Matrix `M` with `M * w == v.cross(w)`.
fn skew_symmetric(v: Vec3) -> Mat3 {
    Mat3::from_cols(
        Vec3::new(0.0, v.z, -v.y),
        Vec3::new(-v.z, 0.0, v.x),
        Vec3::new(v.y, -v.x, 0.0),
    )
}

/// First-order orientation update `q + ½ (0, v) q`. Not normalised.
pub(crate) fn add_scaled_rotation(orientation: Quat, rotation: Vec3) -> Quat {
    if rotation == Vec3::ZERO {
        return orientation;
    }
    let spin = Quat::from_xyzw(rotation.x, rotation.y, rotation.z, 0.0);
    orientation + spin * orientation * 0.5
}

/// Snapshot of the body state the contact math reads.
#[derive(Debug, Clone, Copy)]
struct BodyState {
    position: Vec3,
    velocity: Vec3,
    rotation: Vec3,
    inverse_mass: f32,
    inverse_inertia_world: Mat3,
    last_frame_acceleration: Vec3,
    awake: bool,
}

impl BodyState {
    /// Stand-in for a body that vanished mid-step.
    const IMMOVABLE: Self = Self {
        position: Vec3::ZERO,
        velocity: Vec3::ZERO,
        rotation: Vec3::ZERO,
        inverse_mass: 0.0,
        inverse_inertia_world: Mat3::ZERO,
        last_frame_acceleration: Vec3::ZERO,
        awake: false,
    };

    fn from_body(rb: &RigidBody) -> Self {
        Self {
            position: rb.position,
            velocity: rb.velocity,
            rotation: rb.rotation,
            inverse_mass: rb.inverse_mass,
            inverse_inertia_world: rb.inverse_inertia_tensor_world(),
            last_frame_acceleration: rb.last_frame_acceleration(),
            awake: rb.is_awake(),
        }
    }
}

fn read_bodies(world: &hecs::World, bodies: &[Option<hecs::Entity>; 2]) -> [Option<BodyState>; 2] {
    bodies.map(|entity| {
        entity.map(|entity| match world.get::<&RigidBody>(entity) {
            Ok(rb) => BodyState::from_body(&rb),
            Err(_) => {
                tracing::warn!("contact references missing body {:?}", entity);
                BodyState::IMMOVABLE
            }
        })
    })
}

/// Bounded collection of the contacts produced in one step.
///
/// `contacts().len() + contacts_left()` always equals `capacity()`.
#[derive(Debug, Clone)]
pub struct CollisionData {
    contacts: Vec<Contact>,
    capacity: usize,
    /// Friction stamped onto every new contact.
    pub friction: f32,
    /// Restitution stamped onto every new contact.
    pub restitution: f32,
}

impl CollisionData {
    pub fn new(capacity: usize) -> Self {
        Self {
            contacts: Vec::with_capacity(capacity),
            capacity,
            friction: 0.0,
            restitution: 0.0,
        }
    }

    pub fn with_material(mut self, friction: f32, restitution: f32) -> Self {
        self.friction = friction;
        self.restitution = restitution;
        self
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn contacts_left(&self) -> usize {
        self.capacity - self.contacts.len()
    }

    #[inline]
    pub fn has_more_contacts(&self) -> bool {
        self.contacts_left() > 0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn contacts_mut(&mut self) -> &mut [Contact] {
        &mut self.contacts
    }

    /// Store a contact, stamping it with this step's friction and restitution.
    ///
    /// Fails without storing anything once capacity is reached.
    pub fn add_contact(&mut self, mut contact: Contact) -> Result<()> {
        if !self.has_more_contacts() {
            return Err(CollisionError::ContactCapacityExhausted {
                capacity: self.capacity,
            });
        }
        contact.friction = self.friction;
        contact.restitution = self.restitution;
        self.contacts.push(contact);
        Ok(())
    }

    /// Drop all contacts, keeping the allocation.
    pub fn clear(&mut self) {
        self.contacts.clear();
    }
}

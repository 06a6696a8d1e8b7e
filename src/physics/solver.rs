//! Iterative contact resolver.
//!
//! Velocities are resolved first, then interpenetration. Each iteration
//! picks the worst contact, fixes it in isolation, and patches the cached
//! state of every other contact that shares a body with it.

use crate::physics::contact::Contact;

/// How many iterations a resolver loop may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationBudget {
    /// A fixed number of iterations per call.
    Fixed(usize),
    /// This many iterations for every contact being resolved.
    PerContact(usize),
}

impl IterationBudget {
    /// Iteration limit for a batch of `contacts` contacts.
    #[inline]
    pub fn iterations(self, contacts: usize) -> usize {
        match self {
            IterationBudget::Fixed(n) => n,
            IterationBudget::PerContact(k) => k.saturating_mul(contacts),
        }
    }

    fn is_empty(self) -> bool {
        matches!(self, IterationBudget::Fixed(0) | IterationBudget::PerContact(0))
    }
}

impl Default for IterationBudget {
    fn default() -> Self {
        IterationBudget::PerContact(4)
    }
}

/// Configuration for the contact resolver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolverConfig {
    /// Velocity loop budget. Default: 4 per contact.
    pub velocity_iterations: IterationBudget,
    /// Position loop budget. Default: 4 per contact.
    pub position_iterations: IterationBudget,
    /// Desired velocity changes at or below this are left alone. Default: 0.01.
    pub velocity_epsilon: f32,
    /// Penetrations at or below this are left alone. Default: 0.01.
    pub position_epsilon: f32,
    /// Closing speeds below this get no bounce. Default: 0.25.
    pub resting_velocity_limit: f32,
    /// Cap on rotation per position fix, as a fraction of the lever arm. Default: 0.2.
    pub angular_limit: f32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            velocity_iterations: IterationBudget::default(),
            position_iterations: IterationBudget::default(),
            velocity_epsilon: 0.01,
            position_epsilon: 0.01,
            resting_velocity_limit: 0.25,
            angular_limit: 0.2,
        }
    }
}

impl ResolverConfig {
    /// Whether the resolver can run with these settings.
    pub fn is_valid(&self) -> bool {
        !self.velocity_iterations.is_empty()
            && !self.position_iterations.is_empty()
            && self.velocity_epsilon >= 0.0
            && self.position_epsilon >= 0.0
            && self.resting_velocity_limit >= 0.0
            && self.angular_limit >= 0.0
    }
}

/// Worst-violation-first contact resolver.
#[derive(Debug, Clone, Default)]
pub struct ContactResolver {
    config: ResolverConfig,
    velocity_iterations_used: usize,
    position_iterations_used: usize,
}

impl ContactResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            config,
            velocity_iterations_used: 0,
            position_iterations_used: 0,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ResolverConfig) {
        self.config = config;
    }

    /// Velocity iterations taken by the last call to `resolve_contacts`.
    pub fn velocity_iterations_used(&self) -> usize {
        self.velocity_iterations_used
    }

    /// Position iterations taken by the last call to `resolve_contacts`.
    pub fn position_iterations_used(&self) -> usize {
        self.position_iterations_used
    }

    /// Resolve velocities, then penetrations, of a batch of contacts.
    ///
    /// Writes body velocity, rotation, position and orientation. Stops each
    /// loop at its budget even if violations remain.
    pub fn resolve_contacts(
        &mut self,
        contacts: &mut [Contact],
        world: &mut hecs::World,
        duration: f32,
    ) {
        self.velocity_iterations_used = 0;
        self.position_iterations_used = 0;

        if contacts.is_empty() {
            return;
        }
        if !self.config.is_valid() {
            tracing::warn!("invalid resolver configuration, skipping: {:?}", self.config);
            return;
        }

        self.prepare_contacts(contacts, world, duration);
        self.adjust_velocities(contacts, world, duration);
        self.adjust_positions(contacts, world);

        tracing::debug!(
            "resolved {} contacts in {} velocity / {} position iterations",
            contacts.len(),
            self.velocity_iterations_used,
            self.position_iterations_used
        );
    }

    fn prepare_contacts(&self, contacts: &mut [Contact], world: &hecs::World, duration: f32) {
        for contact in contacts.iter_mut() {
            contact.calculate_internals(world, duration, self.config.resting_velocity_limit);
        }
    }

    fn adjust_velocities(
        &mut self,
        contacts: &mut [Contact],
        world: &mut hecs::World,
        duration: f32,
    ) {
        let limit = self.config.velocity_iterations.iterations(contacts.len());

        while self.velocity_iterations_used < limit {
            let Some(index) = worst_contact(contacts, self.config.velocity_epsilon, |c| {
                c.desired_delta_velocity
            }) else {
                break;
            };

            contacts[index].match_awake_state(world);
            let change = contacts[index].apply_velocity_change(world);
            let moved = contacts[index].bodies;

            for contact in contacts.iter_mut() {
                let mut touched = false;
                for slot in 0..2 {
                    let Some(body) = contact.bodies[slot] else {
                        continue;
                    };
                    for (d, other) in moved.iter().enumerate() {
                        if *other != Some(body) {
                            continue;
                        }
                        let delta = change.velocity[d]
                            + change.rotation[d].cross(contact.relative_contact_position[slot]);
                        let sign = if slot == 0 { 1.0 } else { -1.0 };
                        contact.contact_velocity +=
                            contact.contact_to_world.transpose() * delta * sign;
                        touched = true;
                    }
                }
                if touched {
                    contact.calculate_desired_delta_velocity(
                        world,
                        duration,
                        self.config.resting_velocity_limit,
                    );
                }
            }

            self.velocity_iterations_used += 1;
        }
    }

    fn adjust_positions(&mut self, contacts: &mut [Contact], world: &mut hecs::World) {
        let limit = self.config.position_iterations.iterations(contacts.len());

        while self.position_iterations_used < limit {
            let Some(index) =
                worst_contact(contacts, self.config.position_epsilon, |c| c.penetration)
            else {
                break;
            };

            contacts[index].match_awake_state(world);
            let penetration = contacts[index].penetration;
            let change = contacts[index].apply_position_change(
                world,
                penetration,
                self.config.angular_limit,
            );
            let moved = contacts[index].bodies;

            for contact in contacts.iter_mut() {
                for slot in 0..2 {
                    let Some(body) = contact.bodies[slot] else {
                        continue;
                    };
                    for (d, other) in moved.iter().enumerate() {
                        if *other != Some(body) {
                            continue;
                        }
                        let delta = change.linear[d]
                            + change.angular[d].cross(contact.relative_contact_position[slot]);
                        let sign = if slot == 0 { -1.0 } else { 1.0 };
                        contact.penetration += delta.dot(contact.normal) * sign;
                    }
                }
            }

            self.position_iterations_used += 1;
        }
    }
}

/// Index of the contact with the largest `measure` strictly above `epsilon`.
fn worst_contact(
    contacts: &[Contact],
    epsilon: f32,
    measure: impl Fn(&Contact) -> f32,
) -> Option<usize> {
    let mut worst = epsilon;
    let mut index = None;
    for (i, contact) in contacts.iter().enumerate() {
        let value = measure(contact);
        if value > worst {
            worst = value;
            index = Some(i);
        }
    }
    index
}

//! Narrowphase driver: turns candidate pairs into contacts and resolves them.

use crate::ecs::components::physics::Collider;

use super::broadphase::RigidBodyPair;
use super::collider::Primitive;
use super::contact::CollisionData;
use super::narrowphase::detect_collision;
use super::solver::ContactResolver;

/// Owns the per-step contact buffer and the resolver that consumes it.
#[derive(Debug, Clone)]
pub struct CollisionDetector {
    data: CollisionData,
    resolver: ContactResolver,
}

impl CollisionDetector {
    pub fn new(data: CollisionData, resolver: ContactResolver) -> Self {
        Self { data, resolver }
    }

    /// Contacts gathered by the last step.
    pub fn data(&self) -> &CollisionData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut CollisionData {
        &mut self.data
    }

    pub fn resolver(&self) -> &ContactResolver {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut ContactResolver {
        &mut self.resolver
    }

    /// Run the narrowphase over `pairs`, then resolve the contacts found.
    ///
    /// Returns the number of contacts resolved.
    pub fn update(
        &mut self,
        world: &mut hecs::World,
        pairs: &[RigidBodyPair],
        duration: f32,
    ) -> usize {
        let found = self.detect(world, pairs);
        self.resolver
            .resolve_contacts(self.data.contacts_mut(), world, duration);

        tracing::debug!(
            "{} pairs, {} contacts, {} velocity / {} position iterations",
            pairs.len(),
            found,
            self.resolver.velocity_iterations_used(),
            self.resolver.position_iterations_used()
        );
        found
    }

    /// Clear the buffer and fill it with contacts for `pairs`, without
    /// resolving anything. Returns the number of contacts found.
    pub fn detect(&mut self, world: &hecs::World, pairs: &[RigidBodyPair]) -> usize {
        self.data.clear();

        for pair in pairs {
            if !self.data.has_more_contacts() {
                tracing::debug!(
                    "contact buffer full at {}, remaining pairs dropped",
                    self.data.capacity()
                );
                break;
            }
            let (Some(one), Some(two)) = (primitive(world, pair.a()), primitive(world, pair.b()))
            else {
                continue;
            };
            detect_collision(&one, &two, &mut self.data);
        }

        self.data.len()
    }
}

fn primitive(world: &hecs::World, entity: hecs::Entity) -> Option<Primitive> {
    match world.get::<&Collider>(entity) {
        Ok(collider) => Some(collider.primitive(entity)),
        Err(_) => {
            tracing::trace!("{:?} has no collider", entity);
            None
        }
    }
}

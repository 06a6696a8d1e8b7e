//! Error types for the collision pipeline.

use thiserror::Error;

/// Errors surfaced at the collision core's API boundary.
///
/// Geometric degeneracies and unsupported shape pairs are not errors; they
/// simply produce no contacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CollisionError {
    /// A pair referenced an entity that carries no `RigidBody`.
    #[error("entity {0:?} has no rigid body")]
    MissingBody(hecs::Entity),

    /// A pair referenced the same body twice.
    #[error("a body cannot be paired with itself ({0:?})")]
    SelfPair(hecs::Entity),

    /// The per-step contact sink is full.
    #[error("contact capacity of {capacity} exhausted")]
    ContactCapacityExhausted { capacity: usize },
}

pub type Result<T, E = CollisionError> = std::result::Result<T, E>;

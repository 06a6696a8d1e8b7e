//! Ricochet
//!
//! Collision detection and contact resolution for rigid bodies stored in a
//! `hecs` world.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! 1. **ecs** - `RigidBody` and `Collider` components
//! 2. **physics** - broadphase grid, narrowphase tests, contacts, resolver,
//!    and the fixed-timestep [`CollisionWorld`] that ties them together
//! 3. **error** - [`CollisionError`]
//!
//! The library logs through `tracing` and never installs a subscriber.

pub mod ecs;
pub mod error;
pub mod physics;

pub use ecs::prelude::*;

pub use error::{CollisionError, Result};

pub use physics::{
    CollisionConfig, CollisionData, CollisionDetector, CollisionWorld, Contact, ContactResolver,
    GridConfig, IterationBudget, ResolverConfig, RigidBodyPair, SpatialGrid,
};

// Re-export glam and hecs for convenience
pub use glam;
pub use hecs;

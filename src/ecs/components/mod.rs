//! ECS components (rigid bodies, colliders).

pub mod physics;

pub use physics::*;

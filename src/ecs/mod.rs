//! Entity Component System integration with hecs.
//!
//! Bodies are `hecs` entities; the entity handle is the body identity used
//! by contacts and broad-phase pairs.

pub mod components;

pub mod prelude {
    pub use super::components::physics::*;
}

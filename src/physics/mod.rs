//! Rigid body collision detection and contact resolution.
//!
//! # Architecture
//!
//! The pipeline runs in a fixed timestep loop:
//!
//! 1. Apply forces (gravity) and integrate bodies
//! 2. Refresh collider transforms and bounds
//! 3. Broadphase: uniform grid over the XZ plane emits candidate pairs
//! 4. Narrowphase: exact tests per shape pair fill the contact buffer
//! 5. Resolve contacts, velocities first and then interpenetration
//! 6. Clear force accumulators

pub mod broadphase;
pub mod collider;
pub mod contact;
pub mod detector;
pub mod intersection;
pub mod narrowphase;
pub mod rigid_body;
pub mod solver;

use glam::Vec3;

pub use self::broadphase::{GridConfig, RigidBodyPair, SpatialGrid};
pub use self::collider::{OrientedBox, PhysicsAabb, Plane, Primitive, Sphere};
pub use self::contact::{CollisionData, Contact, PositionChange, VelocityChange};
pub use self::detector::CollisionDetector;
pub use self::solver::{ContactResolver, IterationBudget, ResolverConfig};

/// Configuration for the collision pipeline.
#[derive(Debug, Clone)]
pub struct CollisionConfig {
    /// Gravity vector. Default: (0, -9.81, 0).
    pub gravity: Vec3,
    /// Fixed timestep for physics updates in seconds. Default: 1/60.
    pub fixed_timestep: f64,
    /// Maximum number of sub-steps per frame. Default: 4.
    pub max_substeps: u32,
    /// Contact buffer capacity per step. Default: 256.
    pub max_contacts: usize,
    /// Friction for every contact. Default: 0.0.
    pub friction: f32,
    /// Restitution for every contact. Default: 0.3.
    pub restitution: f32,
    pub grid: GridConfig,
    pub resolver: ResolverConfig,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            fixed_timestep: 1.0 / 60.0,
            max_substeps: 4,
            max_contacts: 256,
            friction: 0.0,
            restitution: 0.3,
            grid: GridConfig::default(),
            resolver: ResolverConfig::default(),
        }
    }
}

/// Drives the whole pipeline over a `hecs::World` of bodies.
#[derive(Debug)]
pub struct CollisionWorld {
    config: CollisionConfig,
    accumulator: f64,
    grid: SpatialGrid,
    detector: CollisionDetector,
    pairs: Vec<RigidBodyPair>,
}

impl CollisionWorld {
    pub fn new(config: CollisionConfig) -> Self {
        let grid = SpatialGrid::new(config.grid);
        let detector = CollisionDetector::new(
            CollisionData::new(config.max_contacts)
                .with_material(config.friction, config.restitution),
            ContactResolver::new(config.resolver),
        );
        Self {
            config,
            accumulator: 0.0,
            grid,
            detector,
            pairs: Vec::new(),
        }
    }

    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub fn detector(&self) -> &CollisionDetector {
        &self.detector
    }

    /// Candidate pairs from the last fixed step.
    pub fn pairs(&self) -> &[RigidBodyPair] {
        &self.pairs
    }

    /// Step the simulation forward by `delta_time` seconds.
    ///
    /// Uses a fixed timestep accumulator; returns the number of fixed steps
    /// taken.
    pub fn step(&mut self, world: &mut hecs::World, delta_time: f64) -> u32 {
        self.accumulator += delta_time;

        let mut substeps = 0u32;
        while self.accumulator >= self.config.fixed_timestep && substeps < self.config.max_substeps
        {
            self.fixed_step(world, self.config.fixed_timestep as f32);
            self.accumulator -= self.config.fixed_timestep;
            substeps += 1;
        }

        // Clamp accumulator to avoid spiral of death
        if self.accumulator > self.config.fixed_timestep * self.config.max_substeps as f64 {
            tracing::debug!("dropping {:.4}s of simulation backlog", self.accumulator);
            self.accumulator = 0.0;
        }

        substeps
    }

    /// Run one step of `dt` seconds regardless of the accumulator.
    pub fn fixed_step(&mut self, world: &mut hecs::World, dt: f32) {
        rigid_body::apply_gravity(world, self.config.gravity);
        rigid_body::integrate_bodies(world, dt);
        rigid_body::sync_colliders(world);

        self.pairs = self.grid.find_pairs(world);
        self.detector.update(world, &self.pairs, dt);

        rigid_body::calculate_derived_data(world);
        rigid_body::sync_colliders(world);
        rigid_body::clear_forces(world);
    }
}

//! Broadphase collision detection on a uniform grid over the XZ plane.

use std::collections::HashSet;

use glam::Vec2;

use crate::ecs::components::physics::{Collider, RigidBody};
use crate::error::{CollisionError, Result};

use super::collider::PhysicsAabb;

/// Two distinct bodies that may be touching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RigidBodyPair {
    a: hecs::Entity,
    b: hecs::Entity,
}

impl RigidBodyPair {
    /// Pair two bodies. Both must carry a [`RigidBody`] and be distinct.
    pub fn new(world: &hecs::World, a: hecs::Entity, b: hecs::Entity) -> Result<Self> {
        if a == b {
            return Err(CollisionError::SelfPair(a));
        }
        for entity in [a, b] {
            if world.get::<&RigidBody>(entity).is_err() {
                return Err(CollisionError::MissingBody(entity));
            }
        }
        Ok(Self { a, b })
    }

    #[inline]
    pub fn a(&self) -> hecs::Entity {
        self.a
    }

    #[inline]
    pub fn b(&self) -> hecs::Entity {
        self.b
    }
}

/// Upper bound on the number of cells a grid may allocate.
pub const MAX_GRID_CELLS: usize = 1 << 20;

/// Region and resolution of the broadphase grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridConfig {
    /// Lower corner of the covered region, as world (x, z). Default: (-50, -50).
    pub min_region: Vec2,
    /// Upper corner of the covered region, as world (x, z). Default: (50, 50).
    pub max_region: Vec2,
    /// Edge length of a square cell. Default: 4.0.
    pub cell_size: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            min_region: Vec2::splat(-50.0),
            max_region: Vec2::splat(50.0),
            cell_size: 4.0,
        }
    }
}

impl GridConfig {
    /// Grid columns (along x) and rows (along z), or `None` when the region
    /// is empty, the cell size is unusable, or the grid would exceed
    /// [`MAX_GRID_CELLS`].
    pub fn dimensions(&self) -> Option<(usize, usize)> {
        let extent = self.max_region - self.min_region;
        if !extent.is_finite() || extent.x <= 0.0 || extent.y <= 0.0 {
            return None;
        }
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return None;
        }
        let columns = (extent.x / self.cell_size).ceil();
        let rows = (extent.y / self.cell_size).ceil();
        if columns > MAX_GRID_CELLS as f32 || rows > MAX_GRID_CELLS as f32 {
            return None;
        }
        let (columns, rows) = ((columns as usize).max(1), (rows as usize).max(1));
        match columns.checked_mul(rows) {
            Some(cells) if cells <= MAX_GRID_CELLS => Some((columns, rows)),
            _ => None,
        }
    }

    /// Whether the world point (x, z) lies inside the region.
    #[inline]
    pub fn contains(&self, x: f32, z: f32) -> bool {
        x >= self.min_region.x
            && x <= self.max_region.x
            && z >= self.min_region.y
            && z <= self.max_region.y
    }
}

#[derive(Debug, Clone, Copy)]
struct GridEntry {
    entity: hecs::Entity,
    aabb: PhysicsAabb,
    movable: bool,
}

/// Uniform grid broadphase.
///
/// Bodies are bucketed by the x/z footprint of their collider AABB. Pairs
/// sharing a cell are emitted once per query if their AABBs overlap and at
/// least one of them can move. Cells and the seen-pair set are scratch
/// space reused between queries.
#[derive(Debug, Default)]
pub struct SpatialGrid {
    config: GridConfig,
    cells: Vec<Vec<GridEntry>>,
    seen: HashSet<(hecs::Entity, hecs::Entity)>,
}

impl SpatialGrid {
    pub fn new(config: GridConfig) -> Self {
        Self {
            config,
            cells: Vec::new(),
            seen: HashSet::new(),
        }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: GridConfig) {
        self.config = config;
    }

    /// Candidate pairs for this step, sorted by entity.
    ///
    /// Reads each body's cached collider AABB, so colliders must be synced
    /// first. Bodies without bounds or with their origin outside the region
    /// are left out.
    pub fn find_pairs(&mut self, world: &hecs::World) -> Vec<RigidBodyPair> {
        let Some((columns, rows)) = self.config.dimensions() else {
            tracing::warn!(
                "spatial grid has an empty region or bad cell size: {:?}",
                self.config
            );
            return Vec::new();
        };

        for cell in &mut self.cells {
            cell.clear();
        }
        self.cells.resize_with(columns * rows, Vec::new);
        self.seen.clear();

        for (entity, (collider, rb)) in world.query::<(&Collider, &RigidBody)>().iter() {
            let Some(aabb) = collider.aabb else {
                tracing::trace!("{:?} has no bounds, skipped by broadphase", entity);
                continue;
            };
            if !self.config.contains(rb.position.x, rb.position.z) {
                tracing::trace!("{:?} is outside the grid region", entity);
                continue;
            }

            let (min_col, min_row) = self.cell_of(aabb.min.x, aabb.min.z, columns, rows);
            let (max_col, max_row) = self.cell_of(aabb.max.x, aabb.max.z, columns, rows);
            let entry = GridEntry {
                entity,
                aabb,
                movable: rb.has_finite_mass(),
            };
            for row in min_row..=max_row {
                for col in min_col..=max_col {
                    self.cells[row * columns + col].push(entry);
                }
            }
        }

        let mut pairs = Vec::new();
        for cell in &self.cells {
            for (i, first) in cell.iter().enumerate() {
                for second in &cell[i + 1..] {
                    let key = if first.entity < second.entity {
                        (first.entity, second.entity)
                    } else {
                        (second.entity, first.entity)
                    };
                    if !self.seen.insert(key) {
                        continue;
                    }
                    if !first.movable && !second.movable {
                        continue;
                    }
                    if first.aabb.overlaps(&second.aabb) {
                        pairs.push(RigidBodyPair { a: key.0, b: key.1 });
                    }
                }
            }
        }

        pairs.sort_unstable_by_key(|pair| (pair.a, pair.b));
        pairs
    }

    /// Cell holding the world point (x, z), clamped into the grid.
    fn cell_of(&self, x: f32, z: f32, columns: usize, rows: usize) -> (usize, usize) {
        let col = ((x - self.config.min_region.x) / self.config.cell_size).floor() as i64;
        let row = ((z - self.config.min_region.y) / self.config.cell_size).floor() as i64;
        (
            col.clamp(0, columns as i64 - 1) as usize,
            row.clamp(0, rows as i64 - 1) as usize,
        )
    }
}

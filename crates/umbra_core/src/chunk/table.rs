//! # Chunk Table
//!
//! Structure-of-arrays storage for one homogeneous group of rows.
//!
//! ```text
//! count = 3, capacity = 8
//! entities:  [E0, E1, E2, -, -, -, -, -]
//! column A:  [A0, A1, A2, -, -, -, -, -]
//! column B:  [B0, B1, B2, -, -, -, -, -]
//! ```
//!
//! Removal swaps the last valid row into the vacated one, so row order is
//! not stable. Callers address rows through the entity indexer, never by
//! caching raw row indices across frames.

use super::column::{Columns, EntityColumns};
use crate::entity::{ArrayLocation, Entity, EntityIndexer};

/// Capacity floor for the first growth of a chunk.
pub const DEFAULT_CAPACITY_FLOOR: usize = 8;

/// Capacity multiplier applied when a chunk is full.
pub const DEFAULT_GROWTH_FACTOR: usize = 2;

/// How a chunk grows when full: `max(floor, capacity * factor)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GrowthPolicy {
    /// Minimum capacity after any growth.
    pub floor: usize,
    /// Multiplier applied to the current capacity.
    pub factor: usize,
}

impl GrowthPolicy {
    /// Creates a growth policy.
    ///
    /// # Panics
    ///
    /// Panics if `floor` is zero or `factor` is below 2.
    #[must_use]
    pub fn new(floor: usize, factor: usize) -> Self {
        assert!(floor > 0, "Capacity floor must be greater than zero");
        assert!(factor >= 2, "Growth factor must be at least 2");
        Self { floor, factor }
    }

    /// Capacity after growing from `current`.
    #[inline]
    #[must_use]
    pub fn next_capacity(self, current: usize) -> usize {
        self.floor.max(current.saturating_mul(self.factor))
    }
}

impl Default for GrowthPolicy {
    fn default() -> Self {
        Self {
            floor: DEFAULT_CAPACITY_FLOOR,
            factor: DEFAULT_GROWTH_FACTOR,
        }
    }
}

/// A growable structure-of-arrays table.
///
/// # Invariants
///
/// - Every column is exactly `capacity` long
/// - `count <= capacity`
#[derive(Debug)]
pub struct Chunk<C: Columns> {
    count: usize,
    capacity: usize,
    columns: C,
    growth: GrowthPolicy,
}

impl<C: Columns> Chunk<C> {
    /// Creates an empty chunk. No memory is allocated until the first push.
    #[must_use]
    pub fn new(columns: C, growth: GrowthPolicy) -> Self {
        let mut chunk = Self {
            count: 0,
            capacity: 0,
            columns,
            growth,
        };
        chunk.columns.set_capacity(0);
        chunk
    }

    /// Number of valid rows.
    #[inline]
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Allocated rows.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Checks if no row is valid.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Checks if the next push needs to grow.
    #[inline]
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.count == self.capacity
    }

    /// Growth policy.
    #[inline]
    #[must_use]
    pub const fn growth(&self) -> GrowthPolicy {
        self.growth
    }

    /// Column storage.
    #[inline]
    #[must_use]
    pub fn columns(&self) -> &C {
        &self.columns
    }

    /// Column storage, mutably.
    #[inline]
    pub fn columns_mut(&mut self) -> &mut C {
        &mut self.columns
    }

    /// Marks one more row valid and returns its index.
    ///
    /// The caller must have grown the chunk first and must populate the row.
    ///
    /// # Panics
    ///
    /// Panics if the chunk is full.
    pub fn push(&mut self) -> usize {
        assert!(
            self.count < self.capacity,
            "Push into full chunk (capacity {})",
            self.capacity
        );
        let row = self.count;
        self.count += 1;
        row
    }

    /// Grows if full, then pushes.
    pub fn push_row(&mut self) -> usize {
        if self.is_full() {
            self.grow();
        }
        self.push()
    }

    /// Resizes every column to `capacity`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is below the current count.
    pub fn set_capacity(&mut self, capacity: usize) {
        assert!(
            capacity >= self.count,
            "Capacity {capacity} below count {}",
            self.count
        );
        self.columns.set_capacity(capacity);
        self.capacity = capacity;
    }

    /// Grows per the growth policy.
    pub fn grow(&mut self) {
        let capacity = self.growth.next_capacity(self.capacity);
        tracing::trace!(from = self.capacity, to = capacity, "chunk grow");
        self.set_capacity(capacity);
    }

    /// Removes `row` by moving the last valid row into it.
    ///
    /// Returns the former index of the row that moved, or `None` if `row` was
    /// the last valid row.
    ///
    /// # Panics
    ///
    /// Panics if `row` is not a valid row.
    pub fn remove_at_swap_back(&mut self, row: usize) -> Option<usize> {
        assert!(row < self.count, "Row {row} out of range {}", self.count);
        let last = self.count - 1;
        self.columns.move_row(last, row);
        self.count = last;
        (row != last).then_some(last)
    }

    /// Invalidates every row, keeping the allocation.
    pub fn clear(&mut self) {
        while self.count > 0 {
            let last = self.count - 1;
            self.columns.move_row(last, last);
            self.count = last;
        }
    }

    /// Releases all storage.
    pub fn dispose(&mut self) {
        self.columns.release();
        self.count = 0;
        self.capacity = 0;
    }
}

impl<C: EntityColumns> Chunk<C> {
    /// Pushes a row owned by a newly created entity.
    ///
    /// Returns the entity and its row; the caller fills the remaining columns.
    pub fn push_entity(
        &mut self,
        indexer: &mut EntityIndexer<ArrayLocation>,
        chunk_index: u32,
    ) -> (Entity, usize) {
        let row = self.push_row();
        let entity = indexer.create_at(chunk_index, row as u32);
        self.columns.set_entity(row, entity);
        (entity, row)
    }

    /// Destroys `entity` and removes its row in one step.
    ///
    /// The entity that moved into the vacated row has its recorded array
    /// index fixed up before this returns. Returns that entity, if any.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is not valid or does not live in this chunk.
    pub fn remove_entity_swap_back(
        &mut self,
        indexer: &mut EntityIndexer<ArrayLocation>,
        entity: Entity,
    ) -> Option<Entity> {
        let location = indexer.get_item(entity);
        let row = location.array_index as usize;
        assert!(
            row < self.count && self.columns.entity(row) == entity,
            "Entity {entity:?} is not stored in this chunk"
        );

        indexer.destroy(entity);
        self.remove_at_swap_back(row)?;

        let moved = self.columns.entity(row);
        indexer.update_index(moved, row as u32);
        Some(moved)
    }
}

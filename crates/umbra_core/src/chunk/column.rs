//! Parallel column storage.
//!
//! A [`Column`] is always exactly `capacity` long. Rows at or beyond the
//! owning chunk's `count` hold default values.

use crate::entity::Entity;

/// One parallel array of a chunk.
#[derive(Clone, Debug, Default)]
pub struct Column<T> {
    data: Vec<T>,
}

impl<T: Clone + Default> Column<T> {
    /// Creates an empty column.
    #[must_use]
    pub const fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Allocated length.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Resizes to `capacity`, filling new rows with defaults.
    pub fn resize(&mut self, capacity: usize) {
        self.data.resize(capacity, T::default());
    }

    /// Returns a row.
    ///
    /// # Panics
    ///
    /// Panics if `row` is outside the allocated capacity.
    #[inline]
    #[must_use]
    pub fn get(&self, row: usize) -> &T {
        &self.data[row]
    }

    /// Returns a row mutably.
    ///
    /// # Panics
    ///
    /// Panics if `row` is outside the allocated capacity.
    #[inline]
    pub fn get_mut(&mut self, row: usize) -> &mut T {
        &mut self.data[row]
    }

    /// Overwrites a row.
    #[inline]
    pub fn set(&mut self, row: usize, value: T) {
        self.data[row] = value;
    }

    /// Moves row `from` into row `to` and resets `from` to its default.
    #[inline]
    pub fn move_row(&mut self, from: usize, to: usize) {
        if from != to {
            self.data.swap(from, to);
        }
        self.data[from] = T::default();
    }

    /// The first `count` rows.
    #[inline]
    #[must_use]
    pub fn head(&self, count: usize) -> &[T] {
        &self.data[..count]
    }

    /// Frees the backing allocation.
    pub fn release(&mut self) {
        self.data = Vec::new();
    }
}

/// A set of parallel columns that are resized and compacted in lockstep.
///
/// Every implementation must forward each call to all of its columns.
pub trait Columns {
    /// Resizes every column to `capacity`.
    fn set_capacity(&mut self, capacity: usize);

    /// Moves row `from` into row `to` in every column.
    fn move_row(&mut self, from: usize, to: usize);

    /// Frees every column.
    fn release(&mut self);
}

/// Columns whose rows are owned by entities.
pub trait EntityColumns: Columns {
    /// Entity owning `row`.
    fn entity(&self, row: usize) -> Entity;

    /// Records the entity owning `row`.
    fn set_entity(&mut self, row: usize, entity: Entity);
}

//! # Entity Handles
//!
//! Entities are lightweight identifiers consisting of:
//! - An index into the indexer's slot array
//! - A version counter for detecting stale references after slot reuse

mod indexer;

pub use indexer::{ArrayLocation, ChunkLocation, EntityIndexer, Location, REMOVED_CHUNK};

/// Opaque handle to a registered renderable object.
///
/// Two handles address the same logical slot iff their indices match. A
/// handle is stale once the slot's stored version no longer equals the
/// handle's version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Entity {
    index: u32,
    version: u32,
}

impl Entity {
    /// Null/invalid entity. Never reported valid by any indexer.
    pub const NULL: Self = Self {
        index: u32::MAX,
        version: u32::MAX,
    };

    /// Creates a handle from raw parts.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, version: u32) -> Self {
        Self { index, version }
    }

    /// Returns the slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Returns the version the slot had when this handle was issued.
    #[inline]
    #[must_use]
    pub const fn version(self) -> u32 {
        self.version
    }

    /// Checks if this is the null handle.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.index == u32::MAX && self.version == u32::MAX
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::NULL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_null() {
        assert!(Entity::default().is_null());
        assert!(!Entity::new(0, 1).is_null());
    }
}

//! # UMBRA Core
//!
//! Entity and chunk bookkeeping for the character and decal render passes:
//! - Generation-counted entity handles that detect use after destroy
//! - Structure-of-arrays chunks with O(1) swap-back removal
//! - Deterministic chunk re-sorting with handle remapping
//!
//! ## Architecture Rules
//!
//! 1. **Handles, not indices** - callers hold [`Entity`] values only
//! 2. **Lockstep columns** - every column of a chunk shares one capacity
//! 3. **Atomic compaction** - row removal and index fix-up are one call
//!
//! ## Example
//!
//! ```rust,ignore
//! use umbra_core::{Chunk, EntityIndexer, GrowthPolicy};
//!
//! let mut indexer = EntityIndexer::new();
//! let mut chunk = Chunk::new(MyColumns::default(), GrowthPolicy::default());
//! let (entity, row) = chunk.push_entity(&mut indexer, 0);
//! chunk.remove_entity_swap_back(&mut indexer, entity);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::perf)]

pub mod chunk;
pub mod entity;
pub mod sync;

pub use chunk::{
    Chunk, ChunkOrder, Column, Columns, CombinedChunk, EntityColumns, GrowthPolicy,
    DEFAULT_CAPACITY_FLOOR, DEFAULT_GROWTH_FACTOR,
};
pub use entity::{ArrayLocation, ChunkLocation, Entity, EntityIndexer, Location, REMOVED_CHUNK};
pub use sync::PendingJob;

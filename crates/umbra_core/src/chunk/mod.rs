//! # Chunked Storage
//!
//! Structure-of-arrays tables grouped by a batching key.
//!
//! ## Design Philosophy
//!
//! - Columns of one chunk always share one capacity
//! - Rows are removed by swap-back, O(1) at the cost of row order
//! - Entity fix-up happens inside the removal, never as a second step
//! - Chunk lists are reordered through [`ChunkOrder`], which also yields the
//!   indexer's remap table

mod column;
pub mod order;
mod table;

pub use column::{Column, Columns, EntityColumns};
pub use order::{ChunkOrder, CombinedChunk};
pub use table::{Chunk, GrowthPolicy, DEFAULT_CAPACITY_FLOOR, DEFAULT_GROWTH_FACTOR};

//! # Entity Indexer
//!
//! Generation-counted slot allocator mapping stable [`Entity`] handles to a
//! location inside chunked storage.
//!
//! ```text
//! Entity { index: 2, version: 3 }
//!            │
//!            ▼
//! slots: [S0, S1, S2, S3]      free: [1] (FIFO)
//!                 │
//!                 ▼
//!        { chunk_index: 4, array_index: 17, version: 3 }
//! ```
//!
//! A slot's version starts at 1, is bumped when the entity is destroyed and
//! bumped again when the slot is reused. Handles issued before a destroy can
//! therefore never validate again.

use std::collections::VecDeque;
use std::fmt;

use super::Entity;

/// Remap table entry for a chunk that was truncated by a sort pass.
pub const REMOVED_CHUNK: u32 = u32::MAX;

/// Location recorded for each live entity.
pub trait Location: Copy + fmt::Debug {
    /// Index of the chunk holding the entity's data.
    fn chunk_index(&self) -> u32;

    /// Rewrites the chunk index (used by chunk remapping).
    fn set_chunk_index(&mut self, chunk_index: u32);
}

/// Location of an entity that owns a whole chunk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ChunkLocation {
    /// Index of the owning chunk.
    pub chunk_index: u32,
}

impl Location for ChunkLocation {
    #[inline]
    fn chunk_index(&self) -> u32 {
        self.chunk_index
    }

    #[inline]
    fn set_chunk_index(&mut self, chunk_index: u32) {
        self.chunk_index = chunk_index;
    }
}

/// Location of an entity stored as one row of a shared chunk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ArrayLocation {
    /// Index of the chunk.
    pub chunk_index: u32,
    /// Row inside the chunk.
    pub array_index: u32,
}

impl Location for ArrayLocation {
    #[inline]
    fn chunk_index(&self) -> u32 {
        self.chunk_index
    }

    #[inline]
    fn set_chunk_index(&mut self, chunk_index: u32) {
        self.chunk_index = chunk_index;
    }
}

#[derive(Clone, Copy, Debug)]
struct EntitySlot<L> {
    location: L,
    version: u32,
    alive: bool,
}

/// Slot allocator with a FIFO free list.
///
/// # Thread Safety
///
/// NOT thread-safe. Owned by exactly one entity manager.
#[derive(Debug)]
pub struct EntityIndexer<L: Location> {
    slots: Vec<EntitySlot<L>>,
    free_indices: VecDeque<u32>,
    alive_count: usize,
}

impl<L: Location> Default for EntityIndexer<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: Location> EntityIndexer<L> {
    /// Creates an empty indexer.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty indexer with room for `capacity` slots.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_indices: VecDeque::with_capacity(capacity),
            alive_count: 0,
        }
    }

    /// Number of live entities.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.alive_count
    }

    /// Checks if no entity is live.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alive_count == 0
    }

    /// Number of slots ever allocated.
    #[inline]
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots waiting for reuse.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free_indices.len()
    }

    /// Checks if a handle still addresses its slot.
    #[inline]
    #[must_use]
    pub fn is_valid(&self, entity: Entity) -> bool {
        self.slots
            .get(entity.index() as usize)
            .is_some_and(|slot| slot.alive && slot.version == entity.version())
    }

    /// Allocates a handle recording `location`.
    ///
    /// Reuses the oldest freed slot when one exists.
    pub fn create(&mut self, location: L) -> Entity {
        self.alive_count += 1;

        if let Some(index) = self.free_indices.pop_front() {
            let slot = &mut self.slots[index as usize];
            slot.version = slot.version.wrapping_add(1);
            slot.location = location;
            slot.alive = true;
            return Entity::new(index, slot.version);
        }

        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        assert!(index != u32::MAX, "Entity indexer exhausted the u32 index space");
        self.slots.push(EntitySlot {
            location,
            version: 1,
            alive: true,
        });
        Entity::new(index, 1)
    }

    /// Destroys a handle. Outstanding copies become stale immediately.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is not valid.
    pub fn destroy(&mut self, entity: Entity) {
        assert!(
            self.is_valid(entity),
            "Destroying invalid entity {entity:?}"
        );

        let slot = &mut self.slots[entity.index() as usize];
        slot.version = slot.version.wrapping_add(1);
        slot.alive = false;
        self.free_indices.push_back(entity.index());
        self.alive_count -= 1;
    }

    /// Returns the location of a live entity.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is not valid.
    #[must_use]
    pub fn get_item(&self, entity: Entity) -> L {
        match self.try_get_item(entity) {
            Some(location) => location,
            None => panic!("Lookup of invalid entity {entity:?}"),
        }
    }

    /// Returns the location of `entity`, or `None` if the handle is stale.
    #[inline]
    #[must_use]
    pub fn try_get_item(&self, entity: Entity) -> Option<L> {
        if self.is_valid(entity) {
            Some(self.slots[entity.index() as usize].location)
        } else {
            None
        }
    }

    /// Rewrites every live entity's chunk index through `remap`.
    ///
    /// `remap[old_chunk_index]` is the chunk's new index.
    ///
    /// # Panics
    ///
    /// Panics if a live entity's chunk is missing from the table or was
    /// removed.
    pub fn remap_chunk_indices(&mut self, remap: &[u32]) {
        for slot in self.slots.iter_mut().filter(|slot| slot.alive) {
            let old = slot.location.chunk_index();
            let new = remap.get(old as usize).copied().unwrap_or(REMOVED_CHUNK);
            assert!(
                new != REMOVED_CHUNK,
                "Live entity still references removed chunk {old}"
            );
            slot.location.set_chunk_index(new);
        }
    }

    /// Iterates live entities with their locations.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, L)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.alive)
            .map(|(index, slot)| (Entity::new(index as u32, slot.version), slot.location))
    }

    /// Destroys every live entity. Versions keep counting.
    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.alive {
                slot.version = slot.version.wrapping_add(1);
                slot.alive = false;
                self.free_indices.push_back(index as u32);
            }
        }
        self.alive_count = 0;
    }
}

impl EntityIndexer<ChunkLocation> {
    /// Allocates a handle owning chunk `chunk_index`.
    pub fn create_in_chunk(&mut self, chunk_index: u32) -> Entity {
        self.create(ChunkLocation { chunk_index })
    }
}

impl EntityIndexer<ArrayLocation> {
    /// Allocates a handle stored at `array_index` of chunk `chunk_index`.
    pub fn create_at(&mut self, chunk_index: u32, array_index: u32) -> Entity {
        self.create(ArrayLocation {
            chunk_index,
            array_index,
        })
    }

    /// Records that a live entity's row moved to `new_array_index`.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is not valid.
    pub fn update_index(&mut self, entity: Entity, new_array_index: u32) {
        assert!(
            self.is_valid(entity),
            "Updating index of invalid entity {entity:?}"
        );
        self.slots[entity.index() as usize].location.array_index = new_array_index;
    }
}

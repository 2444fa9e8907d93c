//! # Chunk Ordering
//!
//! Periodic sort of a manager's chunk list for batching.
//!
//! 1. One [`CombinedChunk`] record per chunk (previous index, validity, key)
//! 2. Sort: invalid chunks last, valid chunks by key, ties keep prior order
//! 3. Early-out when nothing moved and everything is valid
//! 4. Otherwise a [`ChunkOrder`] reorders the parallel lists, hands back the
//!    invalid tail for disposal and carries the remap table for the indexer

use std::cmp::Ordering;

use crate::entity::REMOVED_CHUNK;

/// Sort record for one chunk.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CombinedChunk<K> {
    /// Index of the chunk before sorting.
    pub previous_index: u32,
    /// Whether the chunk still holds live data.
    pub valid: bool,
    /// Batching key. Must already include its identity tie-break.
    pub key: K,
}

/// Result of a sort pass that changed something.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkOrder {
    /// `order[new_index] == old_index` for every chunk, invalid ones last.
    order: Vec<u32>,
    /// `remap[old_index] == new_index`, or [`REMOVED_CHUNK`].
    remap: Vec<u32>,
    /// Number of chunks kept.
    kept: usize,
}

impl ChunkOrder {
    /// Sorts `records` and returns the resulting order.
    ///
    /// Returns `None` when the order is unchanged and every chunk is valid.
    #[must_use]
    pub fn sort<K, F>(records: &mut [CombinedChunk<K>], mut compare: F) -> Option<Self>
    where
        F: FnMut(&K, &K) -> Ordering,
    {
        records.sort_by(|a, b| match (a.valid, b.valid) {
            (true, true) => compare(&a.key, &b.key),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => Ordering::Equal,
        });

        let unchanged = records
            .iter()
            .enumerate()
            .all(|(position, record)| record.valid && record.previous_index as usize == position);
        if unchanged {
            return None;
        }

        let kept = records.iter().take_while(|record| record.valid).count();
        let order: Vec<u32> = records.iter().map(|record| record.previous_index).collect();
        let mut remap = vec![REMOVED_CHUNK; records.len()];
        for (position, &old) in order.iter().enumerate().take(kept) {
            remap[old as usize] = position as u32;
        }

        Some(Self { order, remap, kept })
    }

    /// Sorts records whose keys are totally ordered.
    #[must_use]
    pub fn sort_by_key<K: Ord>(records: &mut [CombinedChunk<K>]) -> Option<Self> {
        Self::sort(records, K::cmp)
    }

    /// Old index of each new position.
    #[must_use]
    pub fn order(&self) -> &[u32] {
        &self.order
    }

    /// New index of each old chunk, [`REMOVED_CHUNK`] for truncated ones.
    #[must_use]
    pub fn remap(&self) -> &[u32] {
        &self.remap
    }

    /// Number of chunks that survive the pass.
    #[must_use]
    pub fn kept(&self) -> usize {
        self.kept
    }

    /// Number of chunks truncated by the pass.
    #[must_use]
    pub fn removed(&self) -> usize {
        self.order.len() - self.kept
    }

    /// Reorders `items` to the sorted order and truncates the invalid tail.
    ///
    /// Returns the truncated items so the caller can dispose them.
    ///
    /// # Panics
    ///
    /// Panics if `items` does not have one entry per sorted record.
    pub fn apply<T>(&self, items: &mut Vec<T>) -> Vec<T> {
        assert_eq!(
            items.len(),
            self.order.len(),
            "Chunk list length does not match sort records"
        );

        let mut slots: Vec<Option<T>> = items.drain(..).map(Some).collect();
        let mut removed = Vec::with_capacity(self.removed());
        for (position, &old) in self.order.iter().enumerate() {
            if let Some(item) = slots[old as usize].take() {
                if position < self.kept {
                    items.push(item);
                } else {
                    removed.push(item);
                }
            }
        }
        removed
    }
}

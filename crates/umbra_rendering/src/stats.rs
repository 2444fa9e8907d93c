//! Manager statistics.

/// Bookkeeping counters for one entity manager.
///
/// Counters accumulate until [`ManagerStats::reset_counters`]. Gauges
/// (`entities`, `chunks`, `rows`) reflect the manager after its last call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManagerStats {
    /// Live entities.
    pub entities: u32,
    /// Chunks held.
    pub chunks: u32,
    /// Occupied rows across all chunks.
    pub rows: u32,
    /// Entities created.
    pub created: u32,
    /// Entities destroyed.
    pub destroyed: u32,
    /// Entities moved to another chunk by a key change.
    pub regrouped: u32,
    /// Sort passes that reordered or truncated.
    pub sorts_run: u32,
    /// Sort passes that early-outed.
    pub sorts_skipped: u32,
    /// Chunks truncated by sort passes.
    pub chunks_truncated: u32,
    /// Draw-call chunk rebuilds.
    pub rebuilds: u32,
    /// Draw-call chunk per-frame refreshes.
    pub refreshes: u32,
}

impl ManagerStats {
    /// Zeroes every counter, keeping gauges.
    pub fn reset_counters(&mut self) {
        *self = Self {
            entities: self.entities,
            chunks: self.chunks,
            rows: self.rows,
            ..Self::default()
        };
    }

    /// Fraction of sort passes that early-outed, 0 if none ran.
    #[must_use]
    pub fn sort_skip_ratio(&self) -> f32 {
        let total = self.sorts_run + self.sorts_skipped;
        if total > 0 {
            self.sorts_skipped as f32 / total as f32
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_keeps_gauges() {
        let mut stats = ManagerStats {
            entities: 3,
            chunks: 2,
            rows: 3,
            created: 5,
            rebuilds: 7,
            ..ManagerStats::default()
        };
        stats.reset_counters();
        assert_eq!(stats.entities, 3);
        assert_eq!(stats.chunks, 2);
        assert_eq!(stats.created, 0);
        assert_eq!(stats.rebuilds, 0);
    }

    #[test]
    fn test_sort_skip_ratio() {
        let stats = ManagerStats {
            sorts_run: 1,
            sorts_skipped: 3,
            ..ManagerStats::default()
        };
        assert!((stats.sort_skip_ratio() - 0.75).abs() < f32::EPSILON);
        assert!(ManagerStats::default().sort_skip_ratio().abs() < f32::EPSILON);
    }
}

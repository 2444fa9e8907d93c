//! Per-chunk visibility results.

use std::sync::Arc;

use umbra_core::PendingJob;

use super::{CullInput, VisibilityTest};

/// Visible rows of one chunk.
///
/// A scheduled job owns the next visible list until [`CulledChunk::complete`]
/// joins it. Rows must not be removed while a job is pending.
#[derive(Debug, Default)]
pub struct CulledChunk {
    visible_rows: Vec<u32>,
    job: Option<PendingJob<Vec<u32>>>,
}

fn visible_rows(inputs: &[CullInput], test: &dyn VisibilityTest, out: &mut Vec<u32>) {
    out.clear();
    out.extend(
        inputs
            .iter()
            .enumerate()
            .filter(|(_, input)| test.is_visible(input))
            .map(|(row, _)| row as u32),
    );
}

impl CulledChunk {
    /// Creates an empty result with nothing visible.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows that passed the last cull, ascending.
    #[must_use]
    pub fn visible_rows(&self) -> &[u32] {
        &self.visible_rows
    }

    /// Checks if `row` passed the last cull.
    #[must_use]
    pub fn is_visible(&self, row: u32) -> bool {
        self.visible_rows.binary_search(&row).is_ok()
    }

    /// Checks if a job is in flight.
    #[must_use]
    pub fn has_pending_job(&self) -> bool {
        self.job.is_some()
    }

    /// Culls `inputs` (one per row) on the calling thread.
    ///
    /// Returns whether the visible set changed.
    ///
    /// # Panics
    ///
    /// Panics if a job is pending.
    pub fn cull(&mut self, inputs: &[CullInput], test: &dyn VisibilityTest) -> bool {
        assert!(self.job.is_none(), "Culling chunk with a pending job");
        let mut next = Vec::with_capacity(inputs.len());
        visible_rows(inputs, test, &mut next);
        self.store(next)
    }

    /// Culls `inputs` on a background thread.
    ///
    /// # Panics
    ///
    /// Panics if a job is already pending.
    pub fn schedule(&mut self, inputs: Vec<CullInput>, test: Arc<dyn VisibilityTest>) {
        assert!(self.job.is_none(), "Scheduling cull over a pending job");
        self.job = Some(PendingJob::spawn("chunk-cull", move || {
            let mut next = Vec::with_capacity(inputs.len());
            visible_rows(&inputs, test.as_ref(), &mut next);
            next
        }));
    }

    /// Joins the pending job, if any.
    ///
    /// Returns whether the visible set changed. `false` if nothing was pending.
    pub fn complete(&mut self) -> bool {
        match self.job.take() {
            Some(job) => {
                let next = job.complete();
                self.store(next)
            }
            None => false,
        }
    }

    /// Applies a swap-back removal of `removed`.
    ///
    /// `moved_from` is the former index of the row that now lives at
    /// `removed`, if any.
    ///
    /// # Panics
    ///
    /// Panics if a job is pending.
    pub fn on_row_removed(&mut self, removed: u32, moved_from: Option<u32>) {
        assert!(self.job.is_none(), "Removing row under a pending cull");
        self.visible_rows.retain(|&row| row != removed);

        if let Some(from) = moved_from {
            if let Some(row) = self.visible_rows.iter_mut().find(|row| **row == from) {
                *row = removed;
            }
            self.visible_rows.sort_unstable();
        }
    }

    /// Joins any pending job and clears every row.
    pub fn dispose(&mut self) {
        if let Some(job) = self.job.take() {
            let _ = job.complete();
        }
        self.visible_rows = Vec::new();
    }

    fn store(&mut self, next: Vec<u32>) -> bool {
        let changed = next != self.visible_rows;
        self.visible_rows = next;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::culling::BoundingSphere;

    struct PositiveX;

    impl VisibilityTest for PositiveX {
        fn is_visible(&self, input: &CullInput) -> bool {
            input.sphere.center[0] >= 0.0
        }
    }

    fn inputs(xs: &[f32]) -> Vec<CullInput> {
        xs.iter()
            .map(|&x| CullInput {
                sphere: BoundingSphere::new([x, 0.0, 0.0], 1.0),
                draw_distance: f32::INFINITY,
                layer_mask: u32::MAX,
            })
            .collect()
    }

    #[test]
    fn test_cull_reports_changes() {
        let mut chunk = CulledChunk::new();
        assert!(chunk.cull(&inputs(&[1.0, -1.0, 2.0]), &PositiveX));
        assert_eq!(chunk.visible_rows(), &[0, 2]);
        assert!(!chunk.cull(&inputs(&[1.0, -1.0, 2.0]), &PositiveX));
        assert!(chunk.cull(&inputs(&[-1.0, -1.0, 2.0]), &PositiveX));
        assert_eq!(chunk.visible_rows(), &[2]);
    }

    #[test]
    fn test_scheduled_cull_matches_inline() {
        let mut chunk = CulledChunk::new();
        chunk.schedule(inputs(&[-3.0, 4.0]), Arc::new(PositiveX));
        assert!(chunk.has_pending_job());
        assert!(chunk.complete());
        assert!(!chunk.has_pending_job());
        assert_eq!(chunk.visible_rows(), &[1]);
        assert!(!chunk.complete());
    }

    #[test]
    fn test_row_removed_renames_moved_row() {
        let mut chunk = CulledChunk::new();
        chunk.cull(&inputs(&[1.0, 1.0, -1.0, 1.0]), &PositiveX);

        // Row 1 removed, row 3 swapped into it.
        chunk.on_row_removed(1, Some(3));
        assert_eq!(chunk.visible_rows(), &[0, 1]);
        assert!(chunk.is_visible(1));
        assert!(!chunk.is_visible(3));
    }

    #[test]
    fn test_remove_hidden_last_row() {
        let mut chunk = CulledChunk::new();
        chunk.cull(&inputs(&[1.0, -1.0]), &PositiveX);

        chunk.on_row_removed(1, None);
        assert_eq!(chunk.visible_rows(), &[0]);
    }

    #[test]
    #[should_panic(expected = "pending")]
    fn test_remove_under_pending_job_panics() {
        let mut chunk = CulledChunk::new();
        chunk.schedule(inputs(&[1.0]), Arc::new(PositiveX));
        chunk.on_row_removed(0, None);
    }

    #[test]
    fn test_dispose_joins_job() {
        let mut chunk = CulledChunk::new();
        chunk.schedule(inputs(&[1.0]), Arc::new(PositiveX));
        chunk.dispose();
        assert!(!chunk.has_pending_job());
        assert!(chunk.visible_rows().is_empty());
    }
}

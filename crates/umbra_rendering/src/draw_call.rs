//! # Draw-Call Chunks
//!
//! Cached, per-chunk draw parameters ready for submission.
//!
//! ```text
//! candidates (gather order):   [c0, c1, c2, c3]
//! draw_call_indices (sorted):  [2, 0, 3, 1]      <- by render queue, identity
//! draw call i  ==  candidate[draw_call_indices[i]]
//! ```
//!
//! The expensive part (material pass lookup, candidate selection, sorting)
//! only runs while the chunk is dirty. A clean chunk only rewrites the
//! per-frame values (transform, bounds, property block) of its candidates.

use crate::host::{Bounds, HostResources, MaterialId, Matrix4, MeshId, PropertyBlock};

/// One draw call handed to the sink.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawCall {
    /// Mesh to draw.
    pub mesh: MeshId,
    /// Material to draw with.
    pub material: MaterialId,
    /// Submesh of `mesh`.
    pub submesh_index: u32,
    /// Pass of `material`.
    pub pass_index: u32,
    /// Object-to-world transform.
    pub object_to_world: Matrix4,
    /// Per-draw shader values.
    pub property_block: PropertyBlock,
}

/// Receives ordered draw calls for GPU submission.
pub trait DrawCallSink {
    /// Submits one draw call.
    fn submit(&mut self, call: &DrawCall);
}

impl DrawCallSink for Vec<DrawCall> {
    fn submit(&mut self, call: &DrawCall) {
        self.push(*call);
    }
}

/// Values of a source row that change from frame to frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RowTransform {
    /// Object-to-world transform.
    pub object_to_world: Matrix4,
    /// World-space bounds.
    pub world_bounds: Bounds,
    /// Per-draw shader values.
    pub property_block: PropertyBlock,
}

/// A potential draw call emitted by a [`DrawCallSource`] during a rebuild.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawCandidate {
    /// Row of the source chunk this candidate reads per-frame values from.
    pub source_row: u32,
    /// Mesh to draw.
    pub mesh: MeshId,
    /// Material, or `None` if the host reference is missing.
    pub material: Option<MaterialId>,
    /// Submesh of `mesh`.
    pub submesh_index: u32,
    /// Identity hash used to break render-queue ties.
    pub identity: u64,
    /// Current per-frame values.
    pub transform: RowTransform,
}

/// Chunk data a draw-call chunk is built from.
pub trait DrawCallSource {
    /// Emits every potential draw call of the chunk.
    fn for_each_candidate(&self, resources: &dyn HostResources, emit: &mut dyn FnMut(DrawCandidate));

    /// Current per-frame values of `row`.
    fn refresh_row(&self, row: u32) -> RowTransform;
}

/// Which path [`DrawCallChunk::update`] took.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawUpdate {
    /// Full rebuild (chunk was dirty).
    Rebuilt,
    /// Only per-frame values were rewritten.
    Refreshed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct DrawSortKey {
    render_queue: i32,
    identity: u64,
}

/// Draw-parameter cache for one chunk.
#[derive(Debug)]
pub struct DrawCallChunk {
    dirty: bool,
    draw_call_indices: Vec<u32>,
    meshes: Vec<MeshId>,
    materials: Vec<MaterialId>,
    submesh_indices: Vec<u32>,
    pass_indices: Vec<u32>,
    object_to_world: Vec<Matrix4>,
    property_blocks: Vec<PropertyBlock>,
    world_bounds: Vec<Bounds>,
    source_rows: Vec<u32>,
    sort_keys: Vec<DrawSortKey>,
    bounds: Option<Bounds>,
    skipped: usize,
}

impl Default for DrawCallChunk {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawCallChunk {
    /// Creates an empty, dirty chunk.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dirty: true,
            draw_call_indices: Vec::new(),
            meshes: Vec::new(),
            materials: Vec::new(),
            submesh_indices: Vec::new(),
            pass_indices: Vec::new(),
            object_to_world: Vec::new(),
            property_blocks: Vec::new(),
            world_bounds: Vec::new(),
            source_rows: Vec::new(),
            sort_keys: Vec::new(),
            bounds: None,
            skipped: 0,
        }
    }

    /// Checks if the next update rebuilds.
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Forces a rebuild on the next update.
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Number of draw calls.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.draw_call_indices.len()
    }

    /// Checks if there is nothing to draw.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.draw_call_indices.is_empty()
    }

    /// Union of all draw calls' world bounds, `None` when empty.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// Candidates dropped by the last rebuild because their material lacks
    /// the pass.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Rebuilds if dirty, otherwise refreshes per-frame values.
    pub fn update(
        &mut self,
        source: &dyn DrawCallSource,
        resources: &dyn HostResources,
        pass_name: &str,
    ) -> DrawUpdate {
        if self.dirty {
            self.rebuild(source, resources, pass_name);
            DrawUpdate::Rebuilt
        } else {
            self.refresh_transforms_only(source);
            DrawUpdate::Refreshed
        }
    }

    /// Reselects candidates, resolves passes and re-sorts. Clears `dirty`.
    ///
    /// Candidates with a missing material draw with the fallback material.
    /// Candidates whose material lacks `pass_name` are skipped.
    pub fn rebuild(
        &mut self,
        source: &dyn DrawCallSource,
        resources: &dyn HostResources,
        pass_name: &str,
    ) {
        self.clear();

        source.for_each_candidate(resources, &mut |candidate| {
            let material = candidate.material.unwrap_or_else(|| {
                let fallback = resources.fallback_material();
                tracing::warn!(
                    identity = candidate.identity,
                    fallback = fallback.0,
                    "missing material, drawing with fallback"
                );
                fallback
            });

            let Some(pass_index) = resources.find_pass(material, pass_name) else {
                self.skipped += 1;
                return;
            };

            self.meshes.push(candidate.mesh);
            self.materials.push(material);
            self.submesh_indices.push(candidate.submesh_index);
            self.pass_indices.push(pass_index);
            self.object_to_world.push(candidate.transform.object_to_world);
            self.property_blocks.push(candidate.transform.property_block);
            self.world_bounds.push(candidate.transform.world_bounds);
            self.source_rows.push(candidate.source_row);
            self.sort_keys.push(DrawSortKey {
                render_queue: resources.render_queue(material),
                identity: candidate.identity,
            });
        });

        let count = self.meshes.len() as u32;
        self.draw_call_indices.extend(0..count);
        let keys = &self.sort_keys;
        self.draw_call_indices
            .sort_by_key(|&candidate| keys[candidate as usize]);

        self.recompute_bounds();
        self.dirty = false;
        tracing::trace!(
            draw_calls = self.draw_call_indices.len(),
            skipped = self.skipped,
            pass = pass_name,
            "draw-call chunk rebuilt"
        );
    }

    /// Rewrites transforms, bounds and property blocks from the source rows.
    ///
    /// Mesh, material, submesh and pass selection are left untouched.
    pub fn refresh_transforms_only(&mut self, source: &dyn DrawCallSource) {
        for (candidate, &row) in self.source_rows.iter().enumerate() {
            let transform = source.refresh_row(row);
            self.object_to_world[candidate] = transform.object_to_world;
            self.property_blocks[candidate] = transform.property_block;
            self.world_bounds[candidate] = transform.world_bounds;
        }
        self.recompute_bounds();
    }

    #[inline]
    fn slot(&self, i: usize) -> usize {
        self.draw_call_indices[i] as usize
    }

    /// Mesh of draw call `i`.
    #[must_use]
    pub fn mesh(&self, i: usize) -> MeshId {
        self.meshes[self.slot(i)]
    }

    /// Material of draw call `i`.
    #[must_use]
    pub fn material(&self, i: usize) -> MaterialId {
        self.materials[self.slot(i)]
    }

    /// Submesh index of draw call `i`.
    #[must_use]
    pub fn submesh_index(&self, i: usize) -> u32 {
        self.submesh_indices[self.slot(i)]
    }

    /// Pass index of draw call `i`.
    #[must_use]
    pub fn pass_index(&self, i: usize) -> u32 {
        self.pass_indices[self.slot(i)]
    }

    /// Object-to-world transform of draw call `i`.
    #[must_use]
    pub fn object_to_world(&self, i: usize) -> &Matrix4 {
        &self.object_to_world[self.slot(i)]
    }

    /// Property block of draw call `i`.
    #[must_use]
    pub fn property_block(&self, i: usize) -> &PropertyBlock {
        &self.property_blocks[self.slot(i)]
    }

    /// Draw call `i`, assembled.
    #[must_use]
    pub fn draw_call(&self, i: usize) -> DrawCall {
        let slot = self.slot(i);
        DrawCall {
            mesh: self.meshes[slot],
            material: self.materials[slot],
            submesh_index: self.submesh_indices[slot],
            pass_index: self.pass_indices[slot],
            object_to_world: self.object_to_world[slot],
            property_block: self.property_blocks[slot],
        }
    }

    /// Draw calls in submission order.
    pub fn iter(&self) -> impl Iterator<Item = DrawCall> + '_ {
        (0..self.len()).map(|i| self.draw_call(i))
    }

    /// Submits every draw call in order. Returns how many were submitted.
    pub fn submit(&self, sink: &mut dyn DrawCallSink) -> usize {
        for call in self.iter() {
            sink.submit(&call);
        }
        self.len()
    }

    /// Releases all arrays. The chunk is dirty afterwards.
    pub fn dispose(&mut self) {
        *self = Self::new();
    }

    fn clear(&mut self) {
        self.draw_call_indices.clear();
        self.meshes.clear();
        self.materials.clear();
        self.submesh_indices.clear();
        self.pass_indices.clear();
        self.object_to_world.clear();
        self.property_blocks.clear();
        self.world_bounds.clear();
        self.source_rows.clear();
        self.sort_keys.clear();
        self.bounds = None;
        self.skipped = 0;
    }

    fn recompute_bounds(&mut self) {
        self.bounds = self
            .world_bounds
            .iter()
            .copied()
            .reduce(|acc, bounds| acc.union(&bounds));
    }
}

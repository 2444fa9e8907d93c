//! # Decal Entity Manager
//!
//! Decals are grouped into one chunk per material, one row per decal.
//!
//! ```text
//! material_lookup: { Some(M) -> 0, Some(N) -> 1, None -> 2 }
//! chunks:          [ M: d0 d3 d4 | N: d1 | fallback: d2 ]
//!                       │
//!                       ├── culled:     visible rows [0, 2]
//!                       └── draw_calls: one per visible row
//! ```
//!
//! Per frame the host calls [`DecalEntityManager::cull`] (or the async pair),
//! then [`DecalEntityManager::build_draw_calls`] and
//! [`DecalEntityManager::submit`]. Decals become visible from the first cull
//! after they are created. [`DecalEntityManager::update`] keeps the chunk
//! list sorted by draw order and drops empty chunks.

mod chunk;

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use umbra_core::{ArrayLocation, ChunkOrder, CombinedChunk, Entity, EntityIndexer, GrowthPolicy};

pub use chunk::{DecalChunk, DecalColumns};
use chunk::DecalSource;

use crate::config::UmbraConfig;
use crate::culling::{CulledChunk, VisibilityTest};
use crate::draw_call::{DrawCallChunk, DrawCallSink, DrawUpdate};
use crate::events::{RenderableDesc, RenderableEvent, RenderableObserver};
use crate::host::{HostResources, MaterialId, Matrix4, ObjectId, IDENTITY};
use crate::stats::ManagerStats;

/// Host description of a decal projector.
#[derive(Clone, Debug, PartialEq)]
pub struct DecalDesc {
    /// Host identity.
    pub object: ObjectId,
    /// Projected material, `None` if missing on the host.
    pub material: Option<MaterialId>,
    /// Ordering among decal chunks, lower draws first.
    pub draw_order: f32,
    /// Projector-to-world transform.
    pub transform: Matrix4,
    /// Projector volume size.
    pub size: [f32; 3],
    /// Volume center offset in projector space.
    pub pivot: [f32; 3],
    /// Atlas UV scale.
    pub uv_scale: [f32; 2],
    /// Atlas UV bias.
    pub uv_bias: [f32; 2],
    /// Draw distance, non-positive for the configured default.
    pub draw_distance: f32,
    /// Opacity multiplier in 0..=1.
    pub fade_factor: f32,
    /// Rendering layers.
    pub layer_mask: u32,
}

impl DecalDesc {
    /// A unit decal at the origin with every optional value at its default.
    #[must_use]
    pub fn new(object: ObjectId, material: Option<MaterialId>) -> Self {
        Self {
            object,
            material,
            draw_order: 0.0,
            transform: IDENTITY,
            size: [1.0; 3],
            pivot: [0.0; 3],
            uv_scale: [1.0, 1.0],
            uv_bias: [0.0, 0.0],
            draw_distance: 0.0,
            fade_factor: 1.0,
            layer_mask: u32::MAX,
        }
    }
}

impl RenderableDesc for DecalDesc {
    fn object(&self) -> ObjectId {
        self.object
    }
}

/// Chunk sort key: draw order, then material.
#[derive(Clone, Copy, Debug, PartialEq)]
struct DecalSortKey {
    draw_order: f32,
    material: Option<MaterialId>,
}

impl DecalSortKey {
    fn compare(a: &Self, b: &Self) -> Ordering {
        a.draw_order
            .total_cmp(&b.draw_order)
            .then_with(|| a.material.cmp(&b.material))
    }
}

/// Bookkeeping for all decals.
#[derive(Debug)]
pub struct DecalEntityManager {
    pass: String,
    default_draw_distance: f32,
    growth: GrowthPolicy,
    indexer: EntityIndexer<ArrayLocation>,
    chunks: Vec<DecalChunk>,
    material_lookup: HashMap<Option<MaterialId>, u32>,
    entities: HashMap<ObjectId, Entity>,
    stats: ManagerStats,
}

impl DecalEntityManager {
    /// Creates an empty manager.
    ///
    /// `config` must be validated.
    #[must_use]
    pub fn new(config: &UmbraConfig) -> Self {
        Self {
            pass: config.decal.pass.clone(),
            default_draw_distance: config.decal.default_draw_distance,
            growth: config.chunks.policy(),
            indexer: EntityIndexer::new(),
            chunks: Vec::new(),
            material_lookup: HashMap::new(),
            entities: HashMap::new(),
            stats: ManagerStats::default(),
        }
    }

    /// Pass decals draw with.
    #[must_use]
    pub fn pass(&self) -> &str {
        &self.pass
    }

    /// Live decals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indexer.len()
    }

    /// Checks if no decal is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indexer.is_empty()
    }

    /// Checks if `entity` is live.
    #[must_use]
    pub fn is_valid(&self, entity: Entity) -> bool {
        self.indexer.is_valid(entity)
    }

    /// Entity registered for `object`.
    #[must_use]
    pub fn entity_for(&self, object: ObjectId) -> Option<Entity> {
        self.entities.get(&object).copied()
    }

    /// Location of `entity`.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is not valid.
    #[must_use]
    pub fn location(&self, entity: Entity) -> ArrayLocation {
        self.indexer.get_item(entity)
    }

    /// Chunks held, including empty ones not yet truncated.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Chunk `index`.
    #[must_use]
    pub fn entity_chunk(&self, index: usize) -> &DecalChunk {
        &self.chunks[index]
    }

    /// Index of the chunk grouping `material`.
    #[must_use]
    pub fn chunk_for_material(&self, material: Option<MaterialId>) -> Option<usize> {
        self.material_lookup.get(&material).map(|&index| index as usize)
    }

    /// Chunk holding `entity`'s data.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is not valid.
    #[must_use]
    pub fn chunk_of(&self, entity: Entity) -> &DecalChunk {
        &self.chunks[self.indexer.get_item(entity).chunk_index as usize]
    }

    /// Culling results of chunk `index`.
    #[must_use]
    pub fn culled_chunk(&self, index: usize) -> &CulledChunk {
        &self.chunks[index].culled
    }

    /// Draw calls of chunk `index`.
    #[must_use]
    pub fn draw_call_chunk(&self, index: usize) -> &DrawCallChunk {
        &self.chunks[index].draw_calls
    }

    /// Draw calls of chunk `index`, mutably.
    pub fn draw_call_chunk_mut(&mut self, index: usize) -> &mut DrawCallChunk {
        &mut self.chunks[index].draw_calls
    }

    /// Counters and gauges.
    #[must_use]
    pub fn stats(&self) -> &ManagerStats {
        &self.stats
    }

    /// Counters and gauges, for resetting.
    pub fn stats_mut(&mut self) -> &mut ManagerStats {
        &mut self.stats
    }

    /// Registers a decal in its material's chunk.
    ///
    /// # Panics
    ///
    /// Panics if `desc.object` is already registered.
    pub fn create(&mut self, desc: &DecalDesc) -> Entity {
        assert!(
            !self.entities.contains_key(&desc.object),
            "Decal {:?} is already registered",
            desc.object
        );

        let chunk_index = match self.material_lookup.get(&desc.material) {
            Some(&index) => index,
            None => {
                let index = self.chunks.len() as u32;
                self.chunks
                    .push(DecalChunk::new(desc.material, desc.draw_order, self.growth));
                self.material_lookup.insert(desc.material, index);
                index
            }
        };

        let chunk = &mut self.chunks[chunk_index as usize];
        let (entity, row) = chunk.entities.push_entity(&mut self.indexer, chunk_index);
        chunk
            .entities
            .columns_mut()
            .write(row, desc, self.default_draw_distance);
        chunk.draw_order = desc.draw_order;
        self.entities.insert(desc.object, entity);

        self.stats.created += 1;
        self.refresh_gauges();
        tracing::debug!(
            object = desc.object.0,
            ?entity,
            chunk = chunk_index,
            row,
            "decal created"
        );
        entity
    }

    /// Unregisters a decal, swap-removing its row.
    ///
    /// Joins the chunk's culling job first.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is not valid.
    pub fn destroy(&mut self, entity: Entity) {
        let location = self.indexer.get_item(entity);
        let chunk = &mut self.chunks[location.chunk_index as usize];
        chunk.complete_culling();

        let object = chunk.object(location.array_index as usize);
        let last = chunk.count() as u32 - 1;
        let moved = chunk
            .entities
            .remove_entity_swap_back(&mut self.indexer, entity);
        chunk
            .culled
            .on_row_removed(location.array_index, moved.map(|_| last));
        chunk.draw_calls.mark_dirty();
        self.entities.remove(&object);

        self.stats.destroyed += 1;
        self.refresh_gauges();
        tracing::debug!(
            ?entity,
            chunk = location.chunk_index,
            row = location.array_index,
            ?moved,
            "decal destroyed"
        );
    }

    /// Overwrites a decal's cached data.
    ///
    /// If the material changed the decal moves to the other material's chunk
    /// and the returned entity replaces `entity`.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is not valid.
    pub fn update_properties(&mut self, entity: Entity, desc: &DecalDesc) -> Entity {
        let location = self.indexer.get_item(entity);
        let chunk = &mut self.chunks[location.chunk_index as usize];

        if chunk.material != desc.material {
            let from = chunk.material;
            self.destroy(entity);
            let regrouped = self.create(desc);
            self.stats.regrouped += 1;
            tracing::debug!(
                object = desc.object.0,
                from = ?from,
                to = ?desc.material,
                "decal regrouped"
            );
            return regrouped;
        }

        chunk
            .entities
            .columns_mut()
            .write(location.array_index as usize, desc, self.default_draw_distance);
        chunk.draw_order = desc.draw_order;
        entity
    }

    /// Marks every draw-call chunk dirty.
    pub fn mark_all_dirty(&mut self) {
        for chunk in &mut self.chunks {
            chunk.draw_calls.mark_dirty();
        }
    }

    /// Culls every chunk on the calling thread.
    ///
    /// Returns how many chunks changed visibility.
    pub fn cull(&mut self, test: &dyn VisibilityTest) -> usize {
        let mut changed = 0;
        for chunk in &mut self.chunks {
            chunk.complete_culling();
            let inputs = chunk.entities.columns().cull_inputs.head(chunk.entities.count());
            if chunk.culled.cull(inputs, test) {
                chunk.draw_calls.mark_dirty();
                changed += 1;
            }
        }
        changed
    }

    /// Schedules a background cull per non-empty chunk.
    pub fn cull_async(&mut self, test: Arc<dyn VisibilityTest>) {
        for chunk in &mut self.chunks {
            chunk.complete_culling();
            if chunk.count() == 0 {
                continue;
            }
            let inputs = chunk.cull_inputs().to_vec();
            chunk.culled.schedule(inputs, Arc::clone(&test));
        }
    }

    /// Joins every scheduled cull.
    ///
    /// Returns how many chunks changed visibility.
    pub fn complete_culling(&mut self) -> usize {
        self.chunks
            .iter_mut()
            .map(|chunk| usize::from(chunk.complete_culling()))
            .sum()
    }

    /// Rebuilds dirty draw-call chunks, refreshes clean ones.
    pub fn build_draw_calls(&mut self, resources: &dyn HostResources) {
        for chunk in self.chunks.iter_mut().filter(|chunk| chunk.count() != 0) {
            let source = DecalSource {
                entities: &chunk.entities,
                visible_rows: chunk.culled.visible_rows(),
                material: chunk.material,
            };
            match chunk.draw_calls.update(&source, resources, &self.pass) {
                DrawUpdate::Rebuilt => self.stats.rebuilds += 1,
                DrawUpdate::Refreshed => self.stats.refreshes += 1,
            }
        }
    }

    /// Submits every visible decal in chunk order. Returns the draw count.
    pub fn submit(&self, sink: &mut dyn DrawCallSink) -> usize {
        self.chunks
            .iter()
            .filter(|chunk| chunk.count() != 0)
            .map(|chunk| chunk.draw_calls.submit(sink))
            .sum()
    }

    /// Sorts chunks by `(draw_order, material)` and truncates empty ones.
    ///
    /// Returns `false` on an early-out (already sorted, none empty).
    pub fn update(&mut self) -> bool {
        let mut records: Vec<CombinedChunk<DecalSortKey>> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(index, chunk)| CombinedChunk {
                previous_index: index as u32,
                valid: chunk.count() != 0,
                key: DecalSortKey {
                    draw_order: chunk.draw_order,
                    material: chunk.material,
                },
            })
            .collect();

        let Some(order) = ChunkOrder::sort(&mut records, DecalSortKey::compare) else {
            self.stats.sorts_skipped += 1;
            tracing::trace!(chunks = self.chunks.len(), "decal sort early-out");
            return false;
        };

        let mut removed = order.apply(&mut self.chunks);
        for chunk in &mut removed {
            chunk.dispose();
        }
        self.material_lookup = self
            .chunks
            .iter()
            .enumerate()
            .map(|(index, chunk)| (chunk.material, index as u32))
            .collect();
        self.indexer.remap_chunk_indices(order.remap());

        self.stats.sorts_run += 1;
        self.stats.chunks_truncated += removed.len() as u32;
        self.refresh_gauges();
        if !removed.is_empty() {
            tracing::debug!(truncated = removed.len(), kept = order.kept(), "decal chunks truncated");
        }
        true
    }

    /// Joins every job, releases every chunk and forgets every decal.
    pub fn dispose(&mut self) {
        for chunk in &mut self.chunks {
            chunk.dispose();
        }
        self.chunks = Vec::new();
        self.material_lookup.clear();
        self.entities.clear();
        self.indexer.clear();
        self.refresh_gauges();
    }

    fn refresh_gauges(&mut self) {
        self.stats.entities = self.indexer.len() as u32;
        self.stats.chunks = self.chunks.len() as u32;
        self.stats.rows = self.chunks.iter().map(|chunk| chunk.count() as u32).sum();
    }
}

impl RenderableObserver<DecalDesc> for DecalEntityManager {
    fn on_event(&mut self, event: &RenderableEvent<DecalDesc>) {
        match event {
            RenderableEvent::Added(desc) => match self.entity_for(desc.object) {
                Some(entity) => {
                    self.update_properties(entity, desc);
                }
                None => {
                    self.create(desc);
                }
            },
            RenderableEvent::Removed(object) => {
                if let Some(entity) = self.entity_for(*object) {
                    self.destroy(entity);
                }
            }
            RenderableEvent::PropertyChanged(desc) | RenderableEvent::MaterialChanged(desc) => {
                if let Some(entity) = self.entity_for(desc.object) {
                    self.update_properties(entity, desc);
                }
            }
            RenderableEvent::AllPropertiesChanged => self.mark_all_dirty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::culling::CullInput;
    use crate::host::translation;
    use crate::testing::FakeResources;

    struct Everything;

    impl VisibilityTest for Everything {
        fn is_visible(&self, _: &CullInput) -> bool {
            true
        }
    }

    fn decal(object: u64, material: u32) -> DecalDesc {
        DecalDesc::new(ObjectId(object), Some(MaterialId(material)))
    }

    fn manager() -> DecalEntityManager {
        DecalEntityManager::new(&UmbraConfig::default())
    }

    #[test]
    fn test_same_material_shares_chunk() {
        let mut manager = manager();
        let a = manager.create(&decal(1, 7));
        let b = manager.create(&decal(2, 7));
        let c = manager.create(&decal(3, 8));

        assert_eq!(manager.chunk_count(), 2);
        assert_eq!(manager.location(a).chunk_index, manager.location(b).chunk_index);
        assert_ne!(manager.location(a).chunk_index, manager.location(c).chunk_index);
        assert_eq!(manager.location(b).array_index, 1);
    }

    #[test]
    fn test_missing_material_groups_together() {
        let mut manager = manager();
        manager.create(&DecalDesc::new(ObjectId(1), None));
        manager.create(&DecalDesc::new(ObjectId(2), None));
        assert_eq!(manager.chunk_count(), 1);
        assert_eq!(manager.chunk_for_material(None), Some(0));
    }

    #[test]
    fn test_destroy_middle_fixes_moved_row() {
        let mut manager = manager();
        let e1 = manager.create(&decal(1, 7));
        let e2 = manager.create(&decal(2, 7));
        let e3 = manager.create(&decal(3, 7));

        manager.destroy(e2);

        assert!(!manager.is_valid(e2));
        assert_eq!(manager.location(e3).array_index, 1);
        assert_eq!(manager.location(e1).array_index, 0);
        let chunk = manager.chunk_of(e3);
        assert_eq!(chunk.count(), 2);
        assert_eq!(chunk.object(1), ObjectId(3));
        assert_eq!(chunk.entity(1), e3);
    }

    #[test]
    fn test_update_properties_in_place() {
        let mut manager = manager();
        let entity = manager.create(&decal(1, 7));

        let mut moved = decal(1, 7);
        moved.transform = translation([2.0, 0.0, 0.0]);
        moved.draw_order = 3.0;
        assert_eq!(manager.update_properties(entity, &moved), entity);

        let chunk = manager.chunk_of(entity);
        assert_eq!(chunk.entities().columns().world_bounds.get(0).center, [2.0, 0.0, 0.0]);
        assert!((chunk.draw_order() - 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_material_change_regroups() {
        let mut manager = manager();
        let a = manager.create(&decal(1, 7));
        let b = manager.create(&decal(2, 7));

        let b2 = manager.update_properties(b, &decal(2, 9));

        assert!(!manager.is_valid(b));
        assert!(manager.is_valid(b2));
        assert_eq!(manager.chunk_count(), 2);
        assert_eq!(manager.chunk_of(a).count(), 1);
        assert_eq!(manager.chunk_of(b2).material(), Some(MaterialId(9)));
        assert_eq!(manager.entity_for(ObjectId(2)), Some(b2));
        assert_eq!(manager.stats().regrouped, 1);
    }

    #[test]
    fn test_cull_then_draw() {
        let mut manager = manager();
        manager.create(&decal(1, 7));
        manager.create(&decal(2, 7));

        assert_eq!(manager.cull(&Everything), 1);
        manager.build_draw_calls(&FakeResources::default());

        let mut sink = Vec::new();
        assert_eq!(manager.submit(&mut sink), 2);
        assert!(sink.iter().all(|call| call.mesh == FakeResources::DECAL_MESH));
    }

    #[test]
    fn test_async_cull_matches_inline() {
        let mut manager = manager();
        manager.create(&decal(1, 7));
        manager.create(&decal(2, 8));

        manager.cull_async(Arc::new(Everything));
        assert_eq!(manager.complete_culling(), 2);
        assert_eq!(manager.culled_chunk(0).visible_rows(), &[0]);
        assert_eq!(manager.complete_culling(), 0);
    }

    #[test]
    fn test_destroy_joins_pending_cull() {
        let mut manager = manager();
        let a = manager.create(&decal(1, 7));
        manager.create(&decal(2, 7));

        manager.cull_async(Arc::new(Everything));
        manager.destroy(a);

        assert!(!manager.culled_chunk(0).has_pending_job());
        assert_eq!(manager.culled_chunk(0).visible_rows(), &[0]);
        assert!(manager.draw_call_chunk(0).is_dirty());
    }

    #[test]
    fn test_update_sorts_by_draw_order_and_drops_empty() {
        let mut manager = manager();
        let mut late = decal(1, 7);
        late.draw_order = 5.0;
        let late = manager.create(&late);
        let early = manager.create(&decal(2, 8));
        let gone = manager.create(&decal(3, 9));
        manager.destroy(gone);

        assert!(manager.update());
        assert_eq!(manager.chunk_count(), 2);
        assert_eq!(manager.entity_chunk(0).material(), Some(MaterialId(8)));
        assert_eq!(manager.chunk_of(early).material(), Some(MaterialId(8)));
        assert_eq!(manager.chunk_of(late).material(), Some(MaterialId(7)));
        assert_eq!(manager.chunk_for_material(Some(MaterialId(9))), None);
        assert_eq!(manager.chunk_for_material(Some(MaterialId(7))), Some(1));
        assert!(!manager.update());
    }
}

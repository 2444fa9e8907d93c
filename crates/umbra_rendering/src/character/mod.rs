//! # Character Entity Manager
//!
//! One chunk per character. Rows are the character's renderers, and every
//! configured pass gets its own draw-call chunk.
//!
//! ```text
//! chunks: [ Player#4 | Npc#9 | Npc#12 | (destroyed) ]
//!            │
//!            ├── renderers: [body, hair, cloth]
//!            └── draw_calls: [CharacterShadow, CharacterOutline]
//! ```
//!
//! Destroying a character only clears its chunk's object. The chunk keeps
//! its index until [`CharacterEntityManager::update`] sorts it to the tail
//! and truncates it.

mod chunk;

use std::collections::HashMap;

use umbra_core::{ChunkLocation, ChunkOrder, CombinedChunk, Entity, EntityIndexer, GrowthPolicy};

pub use chunk::{CharacterChunk, RendererColumns};
use chunk::RendererSource;

use crate::config::UmbraConfig;
use crate::draw_call::{DrawCallChunk, DrawCallSink, DrawUpdate};
use crate::events::{RenderableDesc, RenderableEvent, RenderableObserver};
use crate::host::{Bounds, HostResources, MaterialId, Matrix4, MeshId, ObjectId};
use crate::stats::ManagerStats;

/// Batching category of a character. Chunks sort in declaration order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CharacterType {
    /// Local player.
    #[default]
    Player,
    /// Party members and pets.
    Companion,
    /// Named non-player characters.
    Npc,
    /// Background crowd.
    Crowd,
}

/// One skinned renderer of a character.
#[derive(Clone, Debug, PartialEq)]
pub struct RendererDesc {
    /// Host renderer identity.
    pub renderer: ObjectId,
    /// Mesh drawn.
    pub mesh: MeshId,
    /// One material per submesh, `None` if missing on the host.
    pub materials: Vec<Option<MaterialId>>,
    /// Renderer-to-world transform.
    pub object_to_world: Matrix4,
    /// Mesh bounds in renderer space.
    pub local_bounds: Bounds,
}

/// Host description of a character.
#[derive(Clone, Debug, PartialEq)]
pub struct CharacterDesc {
    /// Host identity.
    pub object: ObjectId,
    /// Batching category.
    pub character_type: CharacterType,
    /// Main light direction for the character passes.
    pub light_direction: [f32; 3],
    /// Skinned renderers.
    pub renderers: Vec<RendererDesc>,
}

impl RenderableDesc for CharacterDesc {
    fn object(&self) -> ObjectId {
        self.object
    }
}

/// Bookkeeping for all characters.
#[derive(Debug)]
pub struct CharacterEntityManager {
    passes: Vec<String>,
    growth: GrowthPolicy,
    indexer: EntityIndexer<ChunkLocation>,
    chunks: Vec<CharacterChunk>,
    entities: HashMap<ObjectId, Entity>,
    stats: ManagerStats,
}

impl CharacterEntityManager {
    /// Creates an empty manager.
    ///
    /// `config` must be validated.
    #[must_use]
    pub fn new(config: &UmbraConfig) -> Self {
        Self {
            passes: config.character.passes.clone(),
            growth: config.chunks.policy(),
            indexer: EntityIndexer::new(),
            chunks: Vec::new(),
            entities: HashMap::new(),
            stats: ManagerStats::default(),
        }
    }

    /// Configured pass names, in draw-call chunk order.
    #[must_use]
    pub fn passes(&self) -> &[String] {
        &self.passes
    }

    /// Index of the pass named `name`.
    #[must_use]
    pub fn pass_index(&self, name: &str) -> Option<usize> {
        self.passes.iter().position(|pass| pass == name)
    }

    /// Live characters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indexer.len()
    }

    /// Checks if no character is live.
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

    /// Chunks held, including destroyed ones not yet truncated.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Chunk `index`.
    #[must_use]
    pub fn entity_chunk(&self, index: usize) -> &CharacterChunk {
        &self.chunks[index]
    }

    /// Chunk holding `entity`'s data.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is not valid.
    #[must_use]
    pub fn chunk_of(&self, entity: Entity) -> &CharacterChunk {
        &self.chunks[self.indexer.get_item(entity).chunk_index as usize]
    }

    /// Draw calls of chunk `index` for pass `pass`.
    #[must_use]
    pub fn draw_call_chunk(&self, index: usize, pass: usize) -> &DrawCallChunk {
        &self.chunks[index].draw_calls[pass]
    }

    /// Draw calls of chunk `index` for pass `pass`, mutably.
    pub fn draw_call_chunk_mut(&mut self, index: usize, pass: usize) -> &mut DrawCallChunk {
        &mut self.chunks[index].draw_calls[pass]
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

    /// Registers a character in a new chunk.
    ///
    /// # Panics
    ///
    /// Panics if `desc.object` is already registered.
    pub fn create(&mut self, desc: &CharacterDesc) -> Entity {
        assert!(
            !self.entities.contains_key(&desc.object),
            "Character {:?} is already registered",
            desc.object
        );

        let chunk_index = self.chunks.len() as u32;
        let entity = self.indexer.create_in_chunk(chunk_index);
        self.chunks
            .push(CharacterChunk::new(entity, desc, self.passes.len(), self.growth));
        self.entities.insert(desc.object, entity);

        self.stats.created += 1;
        self.refresh_gauges();
        tracing::debug!(
            object = desc.object.0,
            ?entity,
            chunk = chunk_index,
            renderers = desc.renderers.len(),
            "character created"
        );
        entity
    }

    /// Unregisters a character. Its chunk is truncated by the next update.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is not valid.
    pub fn destroy(&mut self, entity: Entity) {
        let location = self.indexer.get_item(entity);
        self.indexer.destroy(entity);

        let chunk = &mut self.chunks[location.chunk_index as usize];
        if let Some(object) = chunk.object.take() {
            self.entities.remove(&object);
        }

        self.stats.destroyed += 1;
        self.refresh_gauges();
        tracing::debug!(?entity, chunk = location.chunk_index, "character destroyed");
    }

    /// Overwrites light direction and renderer transforms in place.
    ///
    /// Draw calls stay clean. If the renderer set changed, falls back to
    /// [`Self::update_materials`].
    ///
    /// # Panics
    ///
    /// Panics if `entity` is not valid.
    pub fn update_properties(&mut self, entity: Entity, desc: &CharacterDesc) {
        let location = self.indexer.get_item(entity);
        let chunk = &mut self.chunks[location.chunk_index as usize];
        if !chunk.write_properties(desc) {
            tracing::debug!(?entity, "renderer layout changed, replacing rows");
            self.update_materials(entity, desc);
        }
    }

    /// Replaces the renderer rows and marks the chunk's draw calls dirty.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is not valid.
    pub fn update_materials(&mut self, entity: Entity, desc: &CharacterDesc) {
        let location = self.indexer.get_item(entity);
        let chunk = &mut self.chunks[location.chunk_index as usize];
        chunk.light_direction = desc.light_direction;
        chunk.character_type = desc.character_type;
        chunk.replace_renderers(&desc.renderers);
        self.refresh_gauges();
    }

    /// Marks every draw-call chunk dirty.
    pub fn mark_all_dirty(&mut self) {
        for chunk in &mut self.chunks {
            chunk.mark_dirty();
        }
    }

    /// Sorts chunks by `(character_type, object)` and truncates destroyed
    /// ones.
    ///
    /// Returns `false` on an early-out (already sorted, nothing destroyed).
    pub fn update(&mut self) -> bool {
        let mut records: Vec<CombinedChunk<(CharacterType, ObjectId)>> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(index, chunk)| CombinedChunk {
                previous_index: index as u32,
                valid: chunk.is_valid(),
                key: (chunk.character_type, chunk.object.unwrap_or_default()),
            })
            .collect();

        let Some(order) = ChunkOrder::sort_by_key(&mut records) else {
            self.stats.sorts_skipped += 1;
            tracing::trace!(chunks = self.chunks.len(), "character sort early-out");
            return false;
        };

        let mut removed = order.apply(&mut self.chunks);
        for chunk in &mut removed {
            chunk.dispose();
        }
        self.indexer.remap_chunk_indices(order.remap());

        self.stats.sorts_run += 1;
        self.stats.chunks_truncated += removed.len() as u32;
        self.refresh_gauges();
        if !removed.is_empty() {
            tracing::debug!(truncated = removed.len(), kept = order.kept(), "character chunks truncated");
        }
        true
    }

    /// Rebuilds dirty draw-call chunks, refreshes clean ones.
    pub fn build_draw_calls(&mut self, resources: &dyn HostResources) {
        for chunk in self.chunks.iter_mut().filter(|chunk| chunk.is_valid()) {
            let source = RendererSource {
                renderers: &chunk.renderers,
                light_direction: chunk.light_direction,
            };
            for (pass, draw_calls) in self.passes.iter().zip(chunk.draw_calls.iter_mut()) {
                match draw_calls.update(&source, resources, pass) {
                    DrawUpdate::Rebuilt => self.stats.rebuilds += 1,
                    DrawUpdate::Refreshed => self.stats.refreshes += 1,
                }
            }
        }
    }

    /// Submits pass `pass` of every live character. Returns the draw count.
    pub fn submit(&self, pass: usize, sink: &mut dyn DrawCallSink) -> usize {
        self.chunks
            .iter()
            .filter(|chunk| chunk.is_valid())
            .map(|chunk| chunk.draw_calls[pass].submit(sink))
            .sum()
    }

    /// Releases every chunk and forgets every character.
    pub fn dispose(&mut self) {
        for chunk in &mut self.chunks {
            chunk.dispose();
        }
        self.chunks = Vec::new();
        self.entities.clear();
        self.indexer.clear();
        self.refresh_gauges();
    }

    fn refresh_gauges(&mut self) {
        self.stats.entities = self.indexer.len() as u32;
        self.stats.chunks = self.chunks.len() as u32;
        self.stats.rows = self
            .chunks
            .iter()
            .map(|chunk| chunk.renderers.count() as u32)
            .sum();
    }
}

impl RenderableObserver<CharacterDesc> for CharacterEntityManager {
    fn on_event(&mut self, event: &RenderableEvent<CharacterDesc>) {
        match event {
            RenderableEvent::Added(desc) => match self.entity_for(desc.object) {
                Some(entity) => self.update_materials(entity, desc),
                None => {
                    self.create(desc);
                }
            },
            RenderableEvent::Removed(object) => {
                if let Some(entity) = self.entity_for(*object) {
                    self.destroy(entity);
                }
            }
            RenderableEvent::PropertyChanged(desc) => {
                if let Some(entity) = self.entity_for(desc.object) {
                    self.update_properties(entity, desc);
                }
            }
            RenderableEvent::MaterialChanged(desc) => {
                if let Some(entity) = self.entity_for(desc.object) {
                    self.update_materials(entity, desc);
                }
            }
            RenderableEvent::AllPropertiesChanged => self.mark_all_dirty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{translation, IDENTITY};

    fn renderer(id: u64, material: u32) -> RendererDesc {
        RendererDesc {
            renderer: ObjectId(id),
            mesh: MeshId(id as u32),
            materials: vec![Some(MaterialId(material))],
            object_to_world: IDENTITY,
            local_bounds: Bounds::new([0.0; 3], [1.0; 3]),
        }
    }

    fn character(object: u64, character_type: CharacterType) -> CharacterDesc {
        CharacterDesc {
            object: ObjectId(object),
            character_type,
            light_direction: [0.0, -1.0, 0.0],
            renderers: vec![renderer(object * 10, 1), renderer(object * 10 + 1, 1)],
        }
    }

    fn manager() -> CharacterEntityManager {
        CharacterEntityManager::new(&UmbraConfig::default())
    }

    #[test]
    fn test_create_one_chunk_per_character() {
        let mut manager = manager();
        let a = manager.create(&character(1, CharacterType::Npc));
        let b = manager.create(&character(2, CharacterType::Player));

        assert_eq!(manager.chunk_count(), 2);
        assert_eq!(manager.chunk_of(a).object(), Some(ObjectId(1)));
        assert_eq!(manager.chunk_of(b).renderers().count(), 2);
        assert_eq!(manager.entity_for(ObjectId(2)), Some(b));
    }

    #[test]
    fn test_renderer_rows_follow_growth_policy() {
        let mut manager = manager();
        let entity = manager.create(&character(1, CharacterType::Npc));
        assert_eq!(manager.chunk_of(entity).renderers().capacity(), 8);

        let mut wide = character(1, CharacterType::Npc);
        wide.renderers = (0..9).map(|id| renderer(100 + id, 1)).collect();
        manager.update_materials(entity, &wide);

        let renderers = manager.chunk_of(entity).renderers();
        assert_eq!(renderers.count(), 9);
        assert_eq!(renderers.capacity(), 16);
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn test_double_create_panics() {
        let mut manager = manager();
        manager.create(&character(1, CharacterType::Npc));
        manager.create(&character(1, CharacterType::Npc));
    }

    #[test]
    fn test_update_sorts_by_type() {
        let mut manager = manager();
        let npc = manager.create(&character(1, CharacterType::Npc));
        let player = manager.create(&character(2, CharacterType::Player));

        assert!(manager.update());
        assert_eq!(manager.entity_chunk(0).character_type(), CharacterType::Player);
        assert_eq!(manager.chunk_of(player).object(), Some(ObjectId(2)));
        assert_eq!(manager.chunk_of(npc).object(), Some(ObjectId(1)));
        assert!(!manager.update());
    }

    #[test]
    fn test_destroy_then_update_truncates() {
        let mut manager = manager();
        let a = manager.create(&character(1, CharacterType::Npc));
        let b = manager.create(&character(2, CharacterType::Npc));

        manager.destroy(a);
        assert_eq!(manager.chunk_count(), 2);
        assert!(manager.entity_chunk(0).object().is_none());

        assert!(manager.update());
        assert_eq!(manager.chunk_count(), 1);
        assert_eq!(manager.chunk_of(b).object(), Some(ObjectId(2)));
        assert_eq!(manager.stats().chunks_truncated, 1);
        assert_eq!(manager.entity_for(ObjectId(1)), None);
    }

    #[test]
    fn test_property_update_keeps_draw_calls_clean() {
        let mut manager = manager();
        let entity = manager.create(&character(1, CharacterType::Npc));
        manager.build_draw_calls(&crate::testing::FakeResources::default());
        assert!(!manager.draw_call_chunk(0, 0).is_dirty());

        let mut moved = character(1, CharacterType::Npc);
        moved.renderers[0].object_to_world = translation([3.0, 0.0, 0.0]);
        manager.update_properties(entity, &moved);

        assert!(!manager.draw_call_chunk(0, 0).is_dirty());
        manager.build_draw_calls(&crate::testing::FakeResources::default());
        assert_eq!(manager.stats().refreshes, 2);
    }

    #[test]
    fn test_material_update_marks_dirty() {
        let mut manager = manager();
        let entity = manager.create(&character(1, CharacterType::Npc));
        manager.build_draw_calls(&crate::testing::FakeResources::default());

        let mut changed = character(1, CharacterType::Npc);
        changed.renderers[1].materials = vec![Some(MaterialId(2)), None];
        manager.update_materials(entity, &changed);

        assert!(manager.draw_call_chunk(0, 0).is_dirty());
        assert!(manager.draw_call_chunk(0, 1).is_dirty());
    }

    #[test]
    fn test_events_drive_lifecycle() {
        let mut manager = manager();
        manager.on_event(&RenderableEvent::Added(character(5, CharacterType::Crowd)));
        let entity = manager.entity_for(ObjectId(5)).unwrap();

        manager.on_event(&RenderableEvent::Removed(ObjectId(5)));
        assert!(!manager.is_valid(entity));

        // Unknown objects are ignored.
        manager.on_event(&RenderableEvent::Removed(ObjectId(99)));
        manager.on_event(&RenderableEvent::PropertyChanged(character(99, CharacterType::Npc)));
        assert_eq!(manager.len(), 0);
    }
}

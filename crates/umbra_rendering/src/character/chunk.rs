//! Per-character chunk: one row per skinned renderer.

use umbra_core::{Chunk, Column, Columns, Entity, GrowthPolicy};

use super::{CharacterDesc, CharacterType, RendererDesc};
use crate::draw_call::{DrawCallChunk, DrawCallSource, DrawCandidate, RowTransform};
use crate::host::{Bounds, HostResources, MaterialId, Matrix4, MeshId, ObjectId, PropertyBlock};

/// Renderer rows of one character.
#[derive(Debug, Default)]
pub struct RendererColumns {
    /// Host renderer identity.
    pub renderers: Column<ObjectId>,
    /// Mesh drawn by the renderer.
    pub meshes: Column<MeshId>,
    /// One material per submesh.
    pub materials: Column<Vec<Option<MaterialId>>>,
    /// Renderer-to-world transform.
    pub object_to_world: Column<Matrix4>,
    /// Mesh bounds in renderer space.
    pub local_bounds: Column<Bounds>,
}

impl Columns for RendererColumns {
    fn set_capacity(&mut self, capacity: usize) {
        self.renderers.resize(capacity);
        self.meshes.resize(capacity);
        self.materials.resize(capacity);
        self.object_to_world.resize(capacity);
        self.local_bounds.resize(capacity);
    }

    fn move_row(&mut self, from: usize, to: usize) {
        self.renderers.move_row(from, to);
        self.meshes.move_row(from, to);
        self.materials.move_row(from, to);
        self.object_to_world.move_row(from, to);
        self.local_bounds.move_row(from, to);
    }

    fn release(&mut self) {
        self.renderers.release();
        self.meshes.release();
        self.materials.release();
        self.object_to_world.release();
        self.local_bounds.release();
    }
}

/// Everything one character contributes to a frame.
///
/// `object` becomes `None` when the character is destroyed; the chunk is
/// truncated by the next sort pass.
#[derive(Debug)]
pub struct CharacterChunk {
    pub(super) object: Option<ObjectId>,
    pub(super) entity: Entity,
    pub(super) character_type: CharacterType,
    pub(super) light_direction: [f32; 3],
    pub(super) renderers: Chunk<RendererColumns>,
    pub(super) draw_calls: Vec<DrawCallChunk>,
}

impl CharacterChunk {
    pub(super) fn new(entity: Entity, desc: &CharacterDesc, pass_count: usize, growth: GrowthPolicy) -> Self {
        let mut chunk = Self {
            object: Some(desc.object),
            entity,
            character_type: desc.character_type,
            light_direction: desc.light_direction,
            renderers: Chunk::new(RendererColumns::default(), growth),
            draw_calls: (0..pass_count).map(|_| DrawCallChunk::new()).collect(),
        };
        chunk.replace_renderers(&desc.renderers);
        chunk
    }

    /// Host object, `None` once destroyed.
    #[must_use]
    pub fn object(&self) -> Option<ObjectId> {
        self.object
    }

    /// Entity owning the chunk.
    #[must_use]
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Batching category.
    #[must_use]
    pub fn character_type(&self) -> CharacterType {
        self.character_type
    }

    /// Main light direction used by the character's passes.
    #[must_use]
    pub fn light_direction(&self) -> [f32; 3] {
        self.light_direction
    }

    /// Renderer rows.
    #[must_use]
    pub fn renderers(&self) -> &Chunk<RendererColumns> {
        &self.renderers
    }

    /// Draw calls of pass `pass`.
    #[must_use]
    pub fn draw_calls(&self, pass: usize) -> &DrawCallChunk {
        &self.draw_calls[pass]
    }

    pub(super) fn is_valid(&self) -> bool {
        self.object.is_some()
    }

    pub(super) fn replace_renderers(&mut self, renderers: &[RendererDesc]) {
        self.renderers.clear();
        while self.renderers.capacity() < renderers.len() {
            self.renderers.grow();
        }
        for desc in renderers {
            let row = self.renderers.push_row();
            let columns = self.renderers.columns_mut();
            columns.renderers.set(row, desc.renderer);
            columns.meshes.set(row, desc.mesh);
            columns.materials.set(row, desc.materials.clone());
            columns.object_to_world.set(row, desc.object_to_world);
            columns.local_bounds.set(row, desc.local_bounds);
        }
        self.mark_dirty();
    }

    /// Overwrites transforms in place. Returns `false` if the renderer layout
    /// no longer matches.
    pub(super) fn write_properties(&mut self, desc: &CharacterDesc) -> bool {
        let count = self.renderers.count();
        let columns = self.renderers.columns();
        let same_layout = desc.renderers.len() == count
            && desc
                .renderers
                .iter()
                .enumerate()
                .all(|(row, renderer)| *columns.renderers.get(row) == renderer.renderer);
        if !same_layout {
            return false;
        }

        self.light_direction = desc.light_direction;
        let columns = self.renderers.columns_mut();
        for (row, renderer) in desc.renderers.iter().enumerate() {
            columns.object_to_world.set(row, renderer.object_to_world);
            columns.local_bounds.set(row, renderer.local_bounds);
        }
        true
    }

    pub(super) fn mark_dirty(&mut self) {
        for draw_calls in &mut self.draw_calls {
            draw_calls.mark_dirty();
        }
    }

    pub(super) fn dispose(&mut self) {
        self.object = None;
        self.renderers.dispose();
        for draw_calls in &mut self.draw_calls {
            draw_calls.dispose();
        }
    }
}

/// Read-only view of a character's rows for draw-call building.
pub(super) struct RendererSource<'a> {
    pub(super) renderers: &'a Chunk<RendererColumns>,
    pub(super) light_direction: [f32; 3],
}

impl DrawCallSource for RendererSource<'_> {
    fn for_each_candidate(&self, _: &dyn HostResources, emit: &mut dyn FnMut(DrawCandidate)) {
        let columns = self.renderers.columns();
        for row in 0..self.renderers.count() {
            let transform = self.refresh_row(row as u32);
            for (submesh_index, material) in columns.materials.get(row).iter().enumerate() {
                emit(DrawCandidate {
                    source_row: row as u32,
                    mesh: *columns.meshes.get(row),
                    material: *material,
                    submesh_index: submesh_index as u32,
                    identity: columns.renderers.get(row).0,
                    transform,
                });
            }
        }
    }

    fn refresh_row(&self, row: u32) -> RowTransform {
        let columns = self.renderers.columns();
        let object_to_world = *columns.object_to_world.get(row as usize);
        let [x, y, z] = self.light_direction;
        RowTransform {
            object_to_world,
            world_bounds: columns.local_bounds.get(row as usize).transformed(&object_to_world),
            property_block: PropertyBlock {
                light_direction: [x, y, z, 0.0],
                ..PropertyBlock::default()
            },
        }
    }
}

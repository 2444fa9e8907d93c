//! Decal chunk: all decals sharing one material.

use umbra_core::{Chunk, Column, Columns, Entity, EntityColumns, GrowthPolicy};

use super::DecalDesc;
use crate::culling::{BoundingSphere, CullInput, CulledChunk};
use crate::draw_call::{DrawCallChunk, DrawCallSource, DrawCandidate, RowTransform};
use crate::host::{self, Bounds, HostResources, MaterialId, Matrix4, ObjectId, PropertyBlock};

/// Projector volume in decal space: the unit cube centered on the origin.
const UNIT_CUBE: Bounds = Bounds::new([0.0; 3], [0.5; 3]);

/// Cached per-decal rows.
#[derive(Debug, Default)]
pub struct DecalColumns {
    /// Owning entity.
    pub entities: Column<Entity>,
    /// Host identity.
    pub objects: Column<ObjectId>,
    /// Projector-volume-to-world transform.
    pub decal_to_world: Column<Matrix4>,
    /// World bounds of the projector volume.
    pub world_bounds: Column<Bounds>,
    /// Atlas scale (xy) and bias (zw).
    pub uv_scale_bias: Column<[f32; 4]>,
    /// Fade factor, 0 = invisible, 1 = opaque.
    pub fade_factor: Column<f32>,
    /// Inputs read by culling.
    pub cull_inputs: Column<CullInput>,
}

impl Columns for DecalColumns {
    fn set_capacity(&mut self, capacity: usize) {
        self.entities.resize(capacity);
        self.objects.resize(capacity);
        self.decal_to_world.resize(capacity);
        self.world_bounds.resize(capacity);
        self.uv_scale_bias.resize(capacity);
        self.fade_factor.resize(capacity);
        self.cull_inputs.resize(capacity);
    }

    fn move_row(&mut self, from: usize, to: usize) {
        self.entities.move_row(from, to);
        self.objects.move_row(from, to);
        self.decal_to_world.move_row(from, to);
        self.world_bounds.move_row(from, to);
        self.uv_scale_bias.move_row(from, to);
        self.fade_factor.move_row(from, to);
        self.cull_inputs.move_row(from, to);
    }

    fn release(&mut self) {
        self.entities.release();
        self.objects.release();
        self.decal_to_world.release();
        self.world_bounds.release();
        self.uv_scale_bias.release();
        self.fade_factor.release();
        self.cull_inputs.release();
    }
}

impl EntityColumns for DecalColumns {
    fn entity(&self, row: usize) -> Entity {
        *self.entities.get(row)
    }

    fn set_entity(&mut self, row: usize, entity: Entity) {
        self.entities.set(row, entity);
    }
}

impl DecalColumns {
    /// Writes the cached data of `desc` into `row`.
    pub(super) fn write(&mut self, row: usize, desc: &DecalDesc, default_draw_distance: f32) {
        let decal_to_world = host::mul(
            &host::mul(&desc.transform, &host::translation(desc.pivot)),
            &host::scale(desc.size),
        );
        let world_bounds = UNIT_CUBE.transformed(&decal_to_world);
        let [ex, ey, ez] = world_bounds.extents;
        let draw_distance = if desc.draw_distance > 0.0 {
            desc.draw_distance
        } else {
            default_draw_distance
        };

        self.objects.set(row, desc.object);
        self.decal_to_world.set(row, decal_to_world);
        self.world_bounds.set(row, world_bounds);
        self.uv_scale_bias.set(
            row,
            [desc.uv_scale[0], desc.uv_scale[1], desc.uv_bias[0], desc.uv_bias[1]],
        );
        self.fade_factor.set(row, desc.fade_factor.clamp(0.0, 1.0));
        self.cull_inputs.set(
            row,
            CullInput {
                sphere: BoundingSphere::new(
                    world_bounds.center,
                    (ex * ex + ey * ey + ez * ez).sqrt(),
                ),
                draw_distance,
                layer_mask: desc.layer_mask,
            },
        );
    }
}

/// All decals drawn with one material, plus their cached culling and draw
/// state.
#[derive(Debug)]
pub struct DecalChunk {
    pub(super) material: Option<MaterialId>,
    pub(super) draw_order: f32,
    pub(super) entities: Chunk<DecalColumns>,
    pub(super) culled: CulledChunk,
    pub(super) draw_calls: DrawCallChunk,
}

impl DecalChunk {
    pub(super) fn new(material: Option<MaterialId>, draw_order: f32, growth: GrowthPolicy) -> Self {
        Self {
            material,
            draw_order,
            entities: Chunk::new(DecalColumns::default(), growth),
            culled: CulledChunk::new(),
            draw_calls: DrawCallChunk::new(),
        }
    }

    /// Grouping material, `None` for decals without one.
    #[must_use]
    pub fn material(&self) -> Option<MaterialId> {
        self.material
    }

    /// Draw order of the most recently written decal.
    #[must_use]
    pub fn draw_order(&self) -> f32 {
        self.draw_order
    }

    /// Number of decals.
    #[must_use]
    pub fn count(&self) -> usize {
        self.entities.count()
    }

    /// Decal rows.
    #[must_use]
    pub fn entities(&self) -> &Chunk<DecalColumns> {
        &self.entities
    }

    /// Entity stored at `row`.
    #[must_use]
    pub fn entity(&self, row: usize) -> Entity {
        assert!(row < self.count(), "Row {row} out of range {}", self.count());
        *self.entities.columns().entities.get(row)
    }

    /// Host object stored at `row`.
    #[must_use]
    pub fn object(&self, row: usize) -> ObjectId {
        assert!(row < self.count(), "Row {row} out of range {}", self.count());
        *self.entities.columns().objects.get(row)
    }

    /// Culling results.
    #[must_use]
    pub fn culled(&self) -> &CulledChunk {
        &self.culled
    }

    /// Draw calls.
    #[must_use]
    pub fn draw_calls(&self) -> &DrawCallChunk {
        &self.draw_calls
    }

    pub(super) fn cull_inputs(&self) -> &[CullInput] {
        self.entities.columns().cull_inputs.head(self.entities.count())
    }

    /// Joins the culling job. Marks draw calls dirty if visibility changed.
    pub(super) fn complete_culling(&mut self) -> bool {
        let changed = self.culled.complete();
        if changed {
            self.draw_calls.mark_dirty();
        }
        changed
    }

    pub(super) fn dispose(&mut self) {
        self.culled.dispose();
        self.entities.dispose();
        self.draw_calls.dispose();
    }
}

/// Read-only view of a decal chunk's visible rows for draw-call building.
pub(super) struct DecalSource<'a> {
    pub(super) entities: &'a Chunk<DecalColumns>,
    pub(super) visible_rows: &'a [u32],
    pub(super) material: Option<MaterialId>,
}

impl DrawCallSource for DecalSource<'_> {
    fn for_each_candidate(&self, resources: &dyn HostResources, emit: &mut dyn FnMut(DrawCandidate)) {
        let mesh = resources.decal_mesh();
        let objects = &self.entities.columns().objects;
        for &row in self.visible_rows {
            emit(DrawCandidate {
                source_row: row,
                mesh,
                material: self.material,
                submesh_index: 0,
                identity: objects.get(row as usize).0,
                transform: self.refresh_row(row),
            });
        }
    }

    fn refresh_row(&self, row: u32) -> RowTransform {
        let columns = self.entities.columns();
        let row = row as usize;
        let fade = *columns.fade_factor.get(row);
        RowTransform {
            object_to_world: *columns.decal_to_world.get(row),
            world_bounds: *columns.world_bounds.get(row),
            property_block: PropertyBlock {
                uv_scale_bias: *columns.uv_scale_bias.get(row),
                fade: [fade, 0.0, 0.0, 0.0],
                ..PropertyBlock::default()
            },
        }
    }
}

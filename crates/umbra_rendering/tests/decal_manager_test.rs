//! # Decal Manager Tests
//!
//! 1. **Grouping**: material chunks, regrouping on material change
//! 2. **Culling**: frustum, draw distance and layer masks, inline and async
//! 3. **Maintenance**: draw-order sort, truncation, remap under churn
//!
//! Run with: cargo test --package umbra_rendering --test decal_manager_test

mod common;

use std::sync::Arc;

use common::{decal_at, Host, DECAL_MESH, FALLBACK};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use umbra_rendering::{
    CullingCamera, DecalDesc, DecalEntityManager, DrawCall, MaterialId, Matrix4, ObjectId,
    UmbraConfig,
};

/// Orthographic box x,y in [-10, 10], z in [0, 100], camera at the origin.
const VIEW_PROJECTION: Matrix4 = [
    [0.1, 0.0, 0.0, 0.0],
    [0.0, 0.1, 0.0, 0.0],
    [0.0, 0.0, 0.01, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

fn camera() -> CullingCamera {
    CullingCamera::new(&VIEW_PROJECTION, [0.0; 3])
}

fn manager() -> DecalEntityManager {
    DecalEntityManager::new(&UmbraConfig::default())
}

fn draws(manager: &DecalEntityManager) -> Vec<DrawCall> {
    let mut sink = Vec::new();
    manager.submit(&mut sink);
    sink
}

// ============================================================================
// GROUPING
// ============================================================================

#[test]
fn material_change_moves_decal_to_new_chunk() {
    let mut manager = manager();
    let m = MaterialId(1);
    let n = MaterialId(2);
    let first = manager.create(&DecalDesc::new(ObjectId(1), Some(m)));
    let second = manager.create(&DecalDesc::new(ObjectId(2), Some(m)));
    assert_eq!(manager.chunk_count(), 1);
    assert_eq!(manager.entity_chunk(0).count(), 2);

    let moved = manager.update_properties(second, &DecalDesc::new(ObjectId(2), Some(n)));

    assert_eq!(manager.chunk_count(), 2);
    let m_chunk = manager.chunk_for_material(Some(m)).unwrap();
    let n_chunk = manager.chunk_for_material(Some(n)).unwrap();
    assert_eq!(manager.entity_chunk(m_chunk).count(), 1);
    assert_eq!(manager.entity_chunk(n_chunk).count(), 1);
    assert_eq!(manager.location(moved).chunk_index as usize, n_chunk);
    assert_eq!(manager.location(first).chunk_index as usize, m_chunk);
    assert_eq!(manager.entity_chunk(n_chunk).object(0), ObjectId(2));
    assert!(!manager.is_valid(second));
}

#[test]
fn missing_material_draws_with_fallback() {
    let mut desc = decal_at(1, 0, [0.0, 0.0, 5.0]);
    desc.material = None;
    let mut manager = manager();
    manager.create(&desc);
    manager.cull(&camera());
    manager.build_draw_calls(&Host::default());

    let calls = draws(&manager);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].material, FALLBACK);
    assert_eq!(calls[0].mesh, DECAL_MESH);
    assert_eq!(manager.chunk_for_material(None), Some(0));
}

#[test]
fn material_without_pass_is_skipped() {
    let host = Host::default().without_pass(MaterialId(3), "DecalProjector");
    let mut manager = manager();
    manager.create(&decal_at(1, 3, [0.0, 0.0, 5.0]));
    manager.create(&decal_at(2, 4, [0.0, 0.0, 5.0]));
    manager.cull(&camera());
    manager.build_draw_calls(&host);

    let calls = draws(&manager);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].material, MaterialId(4));
}

// ============================================================================
// CULLING
// ============================================================================

#[test]
fn culling_uses_frustum_distance_and_layers() {
    let mut manager = manager();
    manager.create(&decal_at(1, 1, [0.0, 0.0, 20.0]));
    manager.create(&decal_at(2, 1, [50.0, 0.0, 20.0]));

    let mut near_only = decal_at(3, 1, [0.0, 0.0, 60.0]);
    near_only.draw_distance = 10.0;
    manager.create(&near_only);

    let mut other_layer = decal_at(4, 1, [0.0, 0.0, 20.0]);
    other_layer.layer_mask = 0b100;
    manager.create(&other_layer);

    manager.cull(&camera().with_layer_mask(0b011));
    assert_eq!(manager.culled_chunk(0).visible_rows(), &[0]);

    manager.cull(&camera());
    assert_eq!(manager.culled_chunk(0).visible_rows(), &[0, 3]);
}

#[test]
fn async_culling_feeds_draw_calls() {
    let mut manager = manager();
    for object in 0..20u64 {
        let x = if object % 2 == 0 { 0.0 } else { 100.0 };
        manager.create(&decal_at(object, 1, [x, 0.0, 10.0]));
    }

    manager.cull_async(Arc::new(camera()));
    assert_eq!(manager.complete_culling(), 1);
    manager.build_draw_calls(&Host::default());

    assert_eq!(draws(&manager).len(), 10);
}

#[test]
fn visibility_change_rebuilds_unchanged_refreshes() {
    let mut manager = manager();
    let entity = manager.create(&decal_at(1, 1, [0.0, 0.0, 10.0]));
    manager.cull(&camera());
    manager.build_draw_calls(&Host::default());
    assert_eq!(manager.stats().rebuilds, 1);

    // Moves within view: same visible set, refresh only.
    manager.update_properties(entity, &decal_at(1, 1, [1.0, 0.0, 10.0]));
    assert_eq!(manager.cull(&camera()), 0);
    manager.build_draw_calls(&Host::default());
    assert_eq!(manager.stats().refreshes, 1);
    assert_eq!(draws(&manager)[0].object_to_world[3], [1.0, 0.0, 10.0, 1.0]);

    // Moves out of view: rebuild with nothing to draw.
    manager.update_properties(entity, &decal_at(1, 1, [80.0, 0.0, 10.0]));
    assert_eq!(manager.cull(&camera()), 1);
    manager.build_draw_calls(&Host::default());
    assert_eq!(manager.stats().rebuilds, 2);
    assert!(draws(&manager).is_empty());
}

#[test]
fn destroy_during_async_cull() {
    let mut manager = manager();
    let doomed = manager.create(&decal_at(1, 1, [0.0, 0.0, 10.0]));
    manager.create(&decal_at(2, 1, [0.0, 0.0, 10.0]));
    manager.create(&decal_at(3, 1, [0.0, 0.0, 10.0]));

    manager.cull_async(Arc::new(camera()));
    manager.destroy(doomed);
    manager.build_draw_calls(&Host::default());

    let objects: Vec<ObjectId> = (0..manager.entity_chunk(0).count())
        .map(|row| manager.entity_chunk(0).object(row))
        .collect();
    assert_eq!(objects, vec![ObjectId(3), ObjectId(2)]);
    assert_eq!(manager.culled_chunk(0).visible_rows(), &[0, 1]);
    assert_eq!(draws(&manager).len(), 2);
}

// ============================================================================
// MAINTENANCE
// ============================================================================

#[test]
fn chunks_sort_by_draw_order_then_material() {
    let mut manager = manager();
    let mut back = DecalDesc::new(ObjectId(1), Some(MaterialId(5)));
    back.draw_order = 2.0;
    manager.create(&back);
    manager.create(&DecalDesc::new(ObjectId(2), Some(MaterialId(9))));
    manager.create(&DecalDesc::new(ObjectId(3), Some(MaterialId(7))));
    let mut front = DecalDesc::new(ObjectId(4), Some(MaterialId(8)));
    front.draw_order = -1.0;
    manager.create(&front);

    assert!(manager.update());
    let materials: Vec<Option<MaterialId>> = (0..manager.chunk_count())
        .map(|i| manager.entity_chunk(i).material())
        .collect();
    assert_eq!(
        materials,
        vec![
            Some(MaterialId(8)),
            Some(MaterialId(7)),
            Some(MaterialId(9)),
            Some(MaterialId(5)),
        ]
    );
    for (index, material) in materials.iter().enumerate() {
        assert_eq!(manager.chunk_for_material(*material), Some(index));
    }
    assert!(!manager.update());
}

#[test]
fn per_frame_counter_reset_keeps_gauges() {
    let mut manager = manager();
    manager.create(&decal_at(1, 1, [0.0, 0.0, 10.0]));
    manager.create(&decal_at(2, 2, [0.0, 0.0, 10.0]));
    manager.cull(&camera());
    manager.build_draw_calls(&Host::default());
    assert_eq!(manager.stats().rebuilds, 2);

    manager.stats_mut().reset_counters();
    assert_eq!(manager.stats().created, 0);
    assert_eq!(manager.stats().entities, 2);
    assert_eq!(manager.stats().chunks, 2);

    manager.cull(&camera());
    manager.build_draw_calls(&Host::default());
    assert_eq!(manager.stats().rebuilds, 0);
    assert_eq!(manager.stats().refreshes, 2);
}

#[test]
fn random_churn_keeps_locations_exact() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut manager = manager();
    let mut live: Vec<ObjectId> = Vec::new();

    for object in 1..=1_000u64 {
        let roll: f64 = rng.gen();
        if live.is_empty() || roll < 0.5 {
            let material = rng.gen_range(0..6);
            let mut desc = DecalDesc::new(ObjectId(object), Some(MaterialId(material)));
            desc.draw_order = material as f32 * 0.5;
            manager.create(&desc);
            live.push(ObjectId(object));
        } else if roll < 0.8 {
            let victim = live.swap_remove(rng.gen_range(0..live.len()));
            manager.destroy(manager.entity_for(victim).unwrap());
        } else {
            let target = live[rng.gen_range(0..live.len())];
            let material = rng.gen_range(0..6);
            let entity = manager.entity_for(target).unwrap();
            manager.update_properties(entity, &DecalDesc::new(target, Some(MaterialId(material))));
        }

        if object % 11 == 0 {
            manager.update();
            assert!((0..manager.chunk_count()).all(|i| manager.entity_chunk(i).count() > 0));
        }

        for &object in &live {
            let entity = manager.entity_for(object).unwrap();
            let location = manager.location(entity);
            let chunk = manager.entity_chunk(location.chunk_index as usize);
            assert_eq!(chunk.object(location.array_index as usize), object);
            assert_eq!(chunk.entity(location.array_index as usize), entity);
        }
    }
    assert_eq!(manager.len(), live.len());
}

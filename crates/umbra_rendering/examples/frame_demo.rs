//! # Frame Demo
//!
//! Drives one character manager and one decal manager through a few frames:
//!
//! ```text
//! publish events → update() → cull_async / complete → build → submit
//! ```
//!
//! Run with: cargo run --package umbra_rendering --example frame_demo

use std::sync::Arc;
use std::time::Instant;

use umbra_rendering::host::translation;
use umbra_rendering::{
    Bounds, CharacterDesc, CharacterType, CullingCamera, DecalDesc, DrawCall, HostResources,
    MaterialId, MeshId, ObjectId, RenderableEvent, RendererDesc, UmbraConfig, UmbraContext,
};

/// Every material has every pass; queue follows the material id.
struct DemoHost;

impl HostResources for DemoHost {
    fn find_pass(&self, _material: MaterialId, _pass_name: &str) -> Option<u32> {
        Some(0)
    }

    fn render_queue(&self, material: MaterialId) -> i32 {
        2000 + i32::try_from(material.0).unwrap_or(0)
    }

    fn fallback_material(&self) -> MaterialId {
        MaterialId(0)
    }

    fn decal_mesh(&self) -> MeshId {
        MeshId(1)
    }
}

fn character(object: u64, x: f32) -> CharacterDesc {
    CharacterDesc {
        object: ObjectId(object),
        character_type: if object == 1 { CharacterType::Player } else { CharacterType::Npc },
        light_direction: [0.3, -1.0, 0.2],
        renderers: (0..3)
            .map(|part| RendererDesc {
                renderer: ObjectId(object * 10 + part),
                mesh: MeshId(100 + part as u32),
                materials: vec![Some(MaterialId(10 + part as u32))],
                object_to_world: translation([x, 0.0, 20.0]),
                local_bounds: Bounds::new([0.0, 1.0, 0.0], [0.5, 1.0, 0.5]),
            })
            .collect(),
    }
}

fn decal(object: u64, x: f32, z: f32) -> DecalDesc {
    let mut desc = DecalDesc::new(ObjectId(object), Some(MaterialId(20 + (object % 3) as u32)));
    desc.transform = translation([x, 0.0, z]);
    desc.draw_distance = 60.0;
    desc
}

fn main() {
    println!("═══════════════════════════════════════════════════════════════");
    println!("   UMBRA - Character and Decal Frame Demo");
    println!("═══════════════════════════════════════════════════════════════");
    println!();

    let context = match UmbraContext::new(UmbraConfig::default()) {
        Ok(context) => context,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            return;
        }
    };

    let characters = context.characters.acquire(&[character(1, 0.0), character(2, 3.0)]);
    let decals = context.decals.acquire(&[]);
    for object in 0..200u64 {
        let x = (object % 20) as f32 - 10.0;
        let z = (object / 20) as f32 * 10.0 + 5.0;
        context.decals.publish(&RenderableEvent::Added(decal(1000 + object, x, z)));
    }

    let camera = CullingCamera::new(
        &[
            [0.1, 0.0, 0.0, 0.0],
            [0.0, 0.1, 0.0, 0.0],
            [0.0, 0.0, 0.01, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
        [0.0; 3],
    );
    let host = DemoHost;

    for frame in 0..3 {
        let start = Instant::now();
        if frame == 1 {
            context.characters.publish(&RenderableEvent::Removed(ObjectId(2)));
            let mut moved = decal(1000, -10.0, 5.0);
            moved.material = Some(MaterialId(29));
            context.decals.publish(&RenderableEvent::MaterialChanged(moved));
        }

        let mut sink: Vec<DrawCall> = Vec::new();
        let mut characters = characters.lock();
        characters.update();
        characters.build_draw_calls(&host);
        let character_draws = characters.submit(0, &mut sink);

        let mut decals = decals.lock();
        decals.update();
        decals.cull_async(Arc::new(camera));
        decals.complete_culling();
        decals.build_draw_calls(&host);
        let decal_draws = decals.submit(&mut sink);

        println!(
            "frame {frame}: {character_draws} character draws, {decal_draws} decal draws in {:?} \
             ({} decal rebuilds, {} refreshes)",
            start.elapsed(),
            decals.stats().rebuilds,
            decals.stats().refreshes,
        );
        decals.stats_mut().reset_counters();
        characters.stats_mut().reset_counters();
    }

    println!();
    println!("character gauges: {:?}", characters.lock().stats());
    println!("decal gauges:     {:?}", decals.lock().stats());
}

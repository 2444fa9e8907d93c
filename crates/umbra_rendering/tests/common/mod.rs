//! Host fakes shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};

use umbra_rendering::host::{translation, IDENTITY};
use umbra_rendering::{
    Bounds, CharacterDesc, CharacterType, DecalDesc, HostResources, MaterialId, MeshId, ObjectId,
    RendererDesc,
};

pub const DECAL_MESH: MeshId = MeshId(900);
pub const FALLBACK: MaterialId = MaterialId(999);

/// Scriptable host: every material has every pass unless removed.
#[derive(Debug, Default)]
pub struct Host {
    pub missing_passes: HashSet<(MaterialId, String)>,
    pub queues: HashMap<MaterialId, i32>,
}

impl Host {
    pub fn without_pass(mut self, material: MaterialId, pass: &str) -> Self {
        self.missing_passes.insert((material, pass.to_string()));
        self
    }

    pub fn with_queue(mut self, material: MaterialId, queue: i32) -> Self {
        self.queues.insert(material, queue);
        self
    }
}

impl HostResources for Host {
    fn find_pass(&self, material: MaterialId, pass_name: &str) -> Option<u32> {
        (!self.missing_passes.contains(&(material, pass_name.to_string()))).then_some(1)
    }

    fn render_queue(&self, material: MaterialId) -> i32 {
        self.queues.get(&material).copied().unwrap_or(2000)
    }

    fn fallback_material(&self) -> MaterialId {
        FALLBACK
    }

    fn decal_mesh(&self) -> MeshId {
        DECAL_MESH
    }
}

pub fn renderer(id: u64, materials: &[Option<MaterialId>]) -> RendererDesc {
    RendererDesc {
        renderer: ObjectId(id),
        mesh: MeshId(id as u32),
        materials: materials.to_vec(),
        object_to_world: IDENTITY,
        local_bounds: Bounds::new([0.0; 3], [0.5; 3]),
    }
}

pub fn character(object: u64, character_type: CharacterType) -> CharacterDesc {
    CharacterDesc {
        object: ObjectId(object),
        character_type,
        light_direction: [0.0, -1.0, 0.0],
        renderers: vec![
            renderer(object * 100, &[Some(MaterialId(1))]),
            renderer(object * 100 + 1, &[Some(MaterialId(2)), Some(MaterialId(1))]),
        ],
    }
}

pub fn decal_at(object: u64, material: u32, position: [f32; 3]) -> DecalDesc {
    let mut desc = DecalDesc::new(ObjectId(object), Some(MaterialId(material)));
    desc.transform = translation(position);
    desc
}

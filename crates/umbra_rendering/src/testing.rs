//! Host fakes shared by unit tests.

use std::collections::HashSet;

use crate::host::{HostResources, MaterialId, MeshId};

/// Every material has every pass, except the listed pairs.
#[derive(Debug, Default)]
pub(crate) struct FakeResources {
    pub(crate) missing: HashSet<(MaterialId, String)>,
}

impl FakeResources {
    pub(crate) const DECAL_MESH: MeshId = MeshId(0xDECA);
    pub(crate) const FALLBACK: MaterialId = MaterialId(u32::MAX);
}

impl HostResources for FakeResources {
    fn find_pass(&self, material: MaterialId, pass_name: &str) -> Option<u32> {
        (!self.missing.contains(&(material, pass_name.to_string()))).then_some(0)
    }

    fn render_queue(&self, material: MaterialId) -> i32 {
        2000 + (material.0 % 100) as i32
    }

    fn fallback_material(&self) -> MaterialId {
        Self::FALLBACK
    }

    fn decal_mesh(&self) -> MeshId {
        Self::DECAL_MESH
    }
}

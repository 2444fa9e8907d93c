//! # Culling
//!
//! Visibility tests over cached per-row culling inputs.
//!
//! A [`CullInput`] is written by the owning manager whenever a row changes.
//! Culling reads those inputs only, so it can run on a background thread
//! while the render thread keeps the chunk untouched.

mod culled;
mod frustum;

pub use culled::CulledChunk;
pub use frustum::{BoundingSphere, Frustum, Plane};

/// Cached per-row data a visibility test reads.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CullInput {
    /// World-space bounding sphere.
    pub sphere: BoundingSphere,
    /// Maximum distance from the camera at which the row is drawn.
    pub draw_distance: f32,
    /// Rendering layers the row belongs to.
    pub layer_mask: u32,
}

/// Decides whether a row is visible.
pub trait VisibilityTest: Send + Sync {
    /// Checks one row.
    fn is_visible(&self, input: &CullInput) -> bool;
}

impl VisibilityTest for Frustum {
    #[inline]
    fn is_visible(&self, input: &CullInput) -> bool {
        self.intersects_sphere(&input.sphere)
    }
}

/// Camera state for culling: frustum, distance and layer tests.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CullingCamera {
    /// View frustum.
    pub frustum: Frustum,
    /// Camera position in world space.
    pub position: [f32; 3],
    /// Layers the camera renders.
    pub layer_mask: u32,
}

impl CullingCamera {
    /// Builds a camera from its view-projection matrix and position.
    #[must_use]
    pub fn new(view_projection: &crate::host::Matrix4, position: [f32; 3]) -> Self {
        Self {
            frustum: Frustum::from_view_projection(view_projection),
            position,
            layer_mask: u32::MAX,
        }
    }

    /// Restricts the camera to `layer_mask`.
    #[must_use]
    pub fn with_layer_mask(mut self, layer_mask: u32) -> Self {
        self.layer_mask = layer_mask;
        self
    }
}

impl VisibilityTest for CullingCamera {
    fn is_visible(&self, input: &CullInput) -> bool {
        if input.layer_mask & self.layer_mask == 0 {
            return false;
        }

        let d: [f32; 3] = std::array::from_fn(|i| input.sphere.center[i] - self.position[i]);
        let distance_sq = d[0] * d[0] + d[1] * d[1] + d[2] * d[2];
        let reach = input.draw_distance + input.sphere.radius;
        if distance_sq > reach * reach {
            return false;
        }

        self.frustum.intersects_sphere(&input.sphere)
    }
}

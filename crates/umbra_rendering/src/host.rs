//! # Host Interface
//!
//! Everything the bookkeeping core needs from the engine that owns meshes,
//! materials and renderable objects. Handles are opaque host identifiers;
//! the core never dereferences them.

use bytemuck::{Pod, Zeroable};

/// Host instance identifier of a renderable object.
///
/// Doubles as the identity hash used to break sort ties deterministically.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

/// Host mesh handle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub u32);

/// Host material handle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub u32);

/// Column-major 4x4 matrix (`m[column][row]`, WGPU convention).
pub type Matrix4 = [[f32; 4]; 4];

/// Identity matrix.
pub const IDENTITY: Matrix4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Builds a translation matrix.
#[must_use]
pub fn translation(offset: [f32; 3]) -> Matrix4 {
    let mut m = IDENTITY;
    m[3] = [offset[0], offset[1], offset[2], 1.0];
    m
}

/// Builds a scale matrix.
#[must_use]
pub fn scale(factors: [f32; 3]) -> Matrix4 {
    let mut m = IDENTITY;
    m[0][0] = factors[0];
    m[1][1] = factors[1];
    m[2][2] = factors[2];
    m
}

/// Matrix product `a * b`.
#[must_use]
pub fn mul(a: &Matrix4, b: &Matrix4) -> Matrix4 {
    let mut out = [[0.0; 4]; 4];
    for (column, out_column) in out.iter_mut().enumerate() {
        for (row, value) in out_column.iter_mut().enumerate() {
            *value = (0..4).map(|k| a[k][row] * b[column][k]).sum::<f32>();
        }
    }
    out
}

/// Transforms a point (w = 1).
#[must_use]
pub fn transform_point(m: &Matrix4, p: [f32; 3]) -> [f32; 3] {
    let mut out = [0.0; 3];
    for (row, value) in out.iter_mut().enumerate() {
        *value = m[0][row] * p[0] + m[1][row] * p[1] + m[2][row] * p[2] + m[3][row];
    }
    out
}

/// Axis-aligned bounding box as center and half extents.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Bounds {
    /// Box center.
    pub center: [f32; 3],
    /// Half size along each axis.
    pub extents: [f32; 3],
}

impl Bounds {
    /// Creates bounds from center and half extents.
    #[must_use]
    pub const fn new(center: [f32; 3], extents: [f32; 3]) -> Self {
        Self { center, extents }
    }

    /// Minimum corner.
    #[must_use]
    pub fn min(&self) -> [f32; 3] {
        std::array::from_fn(|i| self.center[i] - self.extents[i])
    }

    /// Maximum corner.
    #[must_use]
    pub fn max(&self) -> [f32; 3] {
        std::array::from_fn(|i| self.center[i] + self.extents[i])
    }

    /// Smallest box containing both.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let (a_min, a_max) = (self.min(), self.max());
        let (b_min, b_max) = (other.min(), other.max());
        let min: [f32; 3] = std::array::from_fn(|i| a_min[i].min(b_min[i]));
        let max: [f32; 3] = std::array::from_fn(|i| a_max[i].max(b_max[i]));
        Self {
            center: std::array::from_fn(|i| (min[i] + max[i]) * 0.5),
            extents: std::array::from_fn(|i| (max[i] - min[i]) * 0.5),
        }
    }

    /// World-space box enclosing these local bounds under `m`.
    #[must_use]
    pub fn transformed(&self, m: &Matrix4) -> Self {
        let center = transform_point(m, self.center);
        let extents: [f32; 3] = std::array::from_fn(|row| {
            (0..3).map(|k| m[k][row].abs() * self.extents[k]).sum::<f32>()
        });
        Self { center, extents }
    }
}

/// Per-draw shader values that vary per frame.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PropertyBlock {
    /// Main light direction (xyz), w unused.
    pub light_direction: [f32; 4],
    /// Decal atlas scale (xy) and bias (zw).
    pub uv_scale_bias: [f32; 4],
    /// Fade factor (x), remaining lanes unused.
    pub fade: [f32; 4],
}

/// Host-side resource queries.
///
/// Implemented by the engine integration. All calls happen on the render
/// thread.
pub trait HostResources {
    /// Index of the pass named `pass_name` in `material`, if it has one.
    fn find_pass(&self, material: MaterialId, pass_name: &str) -> Option<u32>;

    /// Render queue / order value of `material`.
    fn render_queue(&self, material: MaterialId) -> i32;

    /// Material drawn in place of a missing one.
    fn fallback_material(&self) -> MaterialId;

    /// Unit cube mesh used to project decals.
    fn decal_mesh(&self) -> MeshId;
}

//! Frustum culling for view-dependent rendering.
//!
//! Extracts frustum planes from the view-projection matrix and tests
//! bounding spheres against them.

use bytemuck::{Pod, Zeroable};

use crate::host::Matrix4;

/// A plane in 3D space (Ax + By + Cz + D = 0).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Plane {
    /// Normal X component.
    pub a: f32,
    /// Normal Y component.
    pub b: f32,
    /// Normal Z component.
    pub c: f32,
    /// Distance from origin.
    pub d: f32,
}

impl Plane {
    /// Creates a new plane.
    #[must_use]
    pub const fn new(a: f32, b: f32, c: f32, d: f32) -> Self {
        Self { a, b, c, d }
    }

    /// Normalizes the plane.
    #[must_use]
    pub fn normalized(self) -> Self {
        let len = (self.a * self.a + self.b * self.b + self.c * self.c).sqrt();
        if len > 0.0 {
            Self {
                a: self.a / len,
                b: self.b / len,
                c: self.c / len,
                d: self.d / len,
            }
        } else {
            self
        }
    }

    /// Returns the signed distance from a point to the plane.
    #[inline]
    #[must_use]
    pub fn distance_to_point(&self, p: [f32; 3]) -> f32 {
        self.a * p[0] + self.b * p[1] + self.c * p[2] + self.d
    }
}

/// Bounding sphere in world space.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct BoundingSphere {
    /// Sphere center.
    pub center: [f32; 3],
    /// Sphere radius.
    pub radius: f32,
}

impl BoundingSphere {
    /// Creates a sphere.
    #[must_use]
    pub const fn new(center: [f32; 3], radius: f32) -> Self {
        Self { center, radius }
    }
}

/// View frustum for culling.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Frustum {
    /// Left, right, bottom, top, near, far planes.
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Left plane index.
    pub const LEFT: usize = 0;
    /// Right plane index.
    pub const RIGHT: usize = 1;
    /// Bottom plane index.
    pub const BOTTOM: usize = 2;
    /// Top plane index.
    pub const TOP: usize = 3;
    /// Near plane index.
    pub const NEAR: usize = 4;
    /// Far plane index.
    pub const FAR: usize = 5;

    /// Extracts frustum planes from a view-projection matrix.
    ///
    /// The matrix is column-major (`m[column][row]`), depth range 0..1.
    #[must_use]
    pub fn from_view_projection(m: &Matrix4) -> Self {
        let row = |r: usize| [m[0][r], m[1][r], m[2][r], m[3][r]];
        let plane = |x: [f32; 4], y: [f32; 4], sign: f32| {
            Plane::new(
                x[0] + sign * y[0],
                x[1] + sign * y[1],
                x[2] + sign * y[2],
                x[3] + sign * y[3],
            )
            .normalized()
        };
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        let mut planes = [Plane::default(); 6];
        planes[Self::LEFT] = plane(r3, r0, 1.0);
        planes[Self::RIGHT] = plane(r3, r0, -1.0);
        planes[Self::BOTTOM] = plane(r3, r1, 1.0);
        planes[Self::TOP] = plane(r3, r1, -1.0);
        planes[Self::NEAR] = plane(r2, [0.0; 4], 0.0);
        planes[Self::FAR] = plane(r3, r2, -1.0);

        Self { planes }
    }

    /// Checks if any part of `sphere` is inside all six planes.
    #[inline]
    #[must_use]
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.distance_to_point(sphere.center) >= -sphere.radius)
    }
}

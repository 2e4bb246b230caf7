//! CPU-side geometry and the waterfall placement asset.
//!
//! [`RawGeometry`] is the pre-upload form of every mesh in the crate; the CSG
//! cutout recomputes one of these per frame and uploads the result.
//! [`PlacementAsset`] bundles geometry with the position and orientation it
//! should be rendered at, which is how the waterfall mesh arrives from
//! modeling tools (STL for the shape, a transform recorded alongside it).

use crate::gpu::GpuContext;
use crate::mesh::{Mesh, Transform, Vertex3d};
use glam::{Quat, Vec3};
use std::path::Path;
use thiserror::Error;

/// Errors from loading a placement asset.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read asset: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse STL geometry: {0}")]
    Stl(String),
}

/// Geometry data before GPU upload.
#[derive(Clone, Debug)]
pub struct RawGeometry {
    /// Vertex positions, normals, and UVs.
    pub vertices: Vec<Vertex3d>,
    /// Triangle indices.
    pub indices: Vec<u32>,
}

impl RawGeometry {
    pub fn new(vertices: Vec<Vertex3d>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// A flat `size`×`size` plane on XZ, normal up, centered at the origin.
    ///
    /// UVs span [0, 1] across the plane so the water shader can tile its
    /// distortion map by scaling them; cut edges produced by the CSG pass
    /// keep the same mapping because UVs are derived from position there too.
    pub fn plane(size: f32) -> Self {
        let half = size * 0.5;
        let vertices = vec![
            Vertex3d::new([-half, 0.0, -half], [0.0, 1.0, 0.0], [0.0, 0.0]),
            Vertex3d::new([half, 0.0, -half], [0.0, 1.0, 0.0], [1.0, 0.0]),
            Vertex3d::new([half, 0.0, half], [0.0, 1.0, 0.0], [1.0, 1.0]),
            Vertex3d::new([-half, 0.0, half], [0.0, 1.0, 0.0], [0.0, 1.0]),
        ];
        let indices = vec![0, 1, 2, 2, 3, 0];
        Self { vertices, indices }
    }

    /// Axis-aligned bounding box as `(min, max)`.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);

        for v in &self.vertices {
            let p = Vec3::from(v.position);
            min = min.min(p);
            max = max.max(p);
        }

        (min, max)
    }

    /// Total surface area of all triangles.
    pub fn area(&self) -> f32 {
        let mut area = 0.0;
        for tri in self.indices.chunks(3) {
            if tri.len() < 3 {
                continue;
            }
            let p0 = Vec3::from(self.vertices[tri[0] as usize].position);
            let p1 = Vec3::from(self.vertices[tri[1] as usize].position);
            let p2 = Vec3::from(self.vertices[tri[2] as usize].position);
            area += (p1 - p0).cross(p2 - p0).length() * 0.5;
        }
        area
    }

    /// Translate all vertices by `offset`.
    pub fn translate(&mut self, offset: Vec3) {
        for v in &mut self.vertices {
            v.position[0] += offset.x;
            v.position[1] += offset.y;
            v.position[2] += offset.z;
        }
    }

    /// Rotate all vertices and normals by `rotation`.
    pub fn rotate(&mut self, rotation: Quat) {
        for v in &mut self.vertices {
            let pos = rotation * Vec3::from(v.position);
            v.position = pos.into();
            let normal = rotation * Vec3::from(v.normal);
            v.normal = normal.into();
        }
    }

    /// Recompute smooth vertex normals from face geometry.
    ///
    /// STL carries face normals only, so placement assets run this once at
    /// load time.
    pub fn recalculate_normals(&mut self) {
        for v in &mut self.vertices {
            v.normal = [0.0, 0.0, 0.0];
        }

        for tri in self.indices.chunks(3) {
            if tri.len() < 3 {
                continue;
            }
            let i0 = tri[0] as usize;
            let i1 = tri[1] as usize;
            let i2 = tri[2] as usize;

            let p0 = Vec3::from(self.vertices[i0].position);
            let p1 = Vec3::from(self.vertices[i1].position);
            let p2 = Vec3::from(self.vertices[i2].position);

            // Area-weighted accumulation; the cross product's length is 2x
            // the triangle area.
            let face_normal = (p1 - p0).cross(p2 - p0);
            for &i in &[i0, i1, i2] {
                self.vertices[i].normal[0] += face_normal.x;
                self.vertices[i].normal[1] += face_normal.y;
                self.vertices[i].normal[2] += face_normal.z;
            }
        }

        for v in &mut self.vertices {
            let n = Vec3::from(v.normal).normalize_or_zero();
            v.normal = n.into();
        }
    }

    /// Upload to the GPU as a [`Mesh`].
    pub fn upload(&self, gpu: &GpuContext) -> Mesh {
        Mesh::new(gpu, &self.vertices, &self.indices)
    }
}

/// Externally authored geometry plus the transform it should be rendered at.
///
/// Read once at setup; the waterfall renderer takes ownership of both parts.
#[derive(Clone, Debug)]
pub struct PlacementAsset {
    /// The asset's geometry, normals recomputed for smooth shading.
    pub geometry: RawGeometry,
    /// Where the asset sits in the world.
    pub transform: Transform,
}

impl PlacementAsset {
    /// Wrap already-built geometry with its placement.
    pub fn new(geometry: RawGeometry, transform: Transform) -> Self {
        Self {
            geometry,
            transform,
        }
    }

    /// Load STL geometry from a file and place it at `transform`.
    pub fn from_stl(path: impl AsRef<Path>, transform: Transform) -> Result<Self, AssetError> {
        let file = std::fs::File::open(path.as_ref())?;
        let mut reader = std::io::BufReader::new(file);
        Self::parse_stl(&mut reader, transform)
    }

    /// Load STL geometry from embedded bytes and place it at `transform`.
    pub fn from_stl_bytes(bytes: &[u8], transform: Transform) -> Result<Self, AssetError> {
        let mut cursor = std::io::Cursor::new(bytes);
        Self::parse_stl(&mut cursor, transform)
    }

    fn parse_stl<R: std::io::Read + std::io::Seek>(
        reader: &mut R,
        transform: Transform,
    ) -> Result<Self, AssetError> {
        let stl = stl_io::read_stl(reader).map_err(|e| AssetError::Stl(e.to_string()))?;

        let mut vertices = Vec::with_capacity(stl.faces.len() * 3);
        let mut indices = Vec::with_capacity(stl.faces.len() * 3);

        for (i, face) in stl.faces.iter().enumerate() {
            let normal: [f32; 3] = face.normal.into();

            for &vertex_idx in &face.vertices {
                let vertex = &stl.vertices[vertex_idx];
                let position: [f32; 3] = (*vertex).into();
                // STL has no UVs; project from XZ so the noise map scrolls
                // over the surface predictably.
                vertices.push(Vertex3d::new(
                    position,
                    normal,
                    [position[0], position[2]],
                ));
            }

            let base = (i * 3) as u32;
            indices.extend_from_slice(&[base, base + 1, base + 2]);
        }

        let mut geometry = RawGeometry::new(vertices, indices);
        geometry.recalculate_normals();

        Ok(Self {
            geometry,
            transform,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_cover_all_vertices() {
        let geom = RawGeometry::new(
            vec![
                Vertex3d::new([0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
                Vertex3d::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
                Vertex3d::new([-1.0, -1.0, -1.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
            ],
            vec![0, 1, 2],
        );

        let (min, max) = geom.bounds();
        assert_eq!(min, Vec3::new(-1.0, -1.0, -1.0));
        assert_eq!(max, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn plane_area_is_size_squared() {
        let plane = RawGeometry::plane(252.0);
        assert!((plane.area() - 252.0 * 252.0).abs() < 1.0);
    }

    #[test]
    fn translate_moves_bounds() {
        let mut plane = RawGeometry::plane(2.0);
        plane.translate(Vec3::new(10.0, 0.0, 5.0));
        let (min, max) = plane.bounds();
        assert_eq!(min, Vec3::new(9.0, 0.0, 4.0));
        assert_eq!(max, Vec3::new(11.0, 0.0, 6.0));
    }

    #[test]
    fn recalculated_plane_normals_point_up() {
        let mut plane = RawGeometry::plane(10.0);
        plane.recalculate_normals();
        for v in &plane.vertices {
            assert!((Vec3::from(v.normal) - Vec3::Y).length() < 1e-5);
        }
    }
}

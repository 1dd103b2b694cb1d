//! Indexed triangle set.
//!
//! Vertices are stored once and triangles reference them by index. Counter-
//! clockwise winding seen from outside defines the outward normal.

use crate::geometry::{BoundingBox3F, Point3F, Transform3D};
use crate::{CoordF, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A single triangle defined by three vertex indices.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triangle {
    /// Indices into the vertex array for the three corners.
    pub indices: [u32; 3],
}

impl Triangle {
    /// Create a new triangle from vertex indices.
    #[inline]
    pub const fn new(v0: u32, v1: u32, v2: u32) -> Self {
        Self {
            indices: [v0, v1, v2],
        }
    }

    /// Check if this triangle is degenerate (has duplicate vertices).
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.indices[0] == self.indices[1]
            || self.indices[1] == self.indices[2]
            || self.indices[2] == self.indices[0]
    }

    /// Directed edge `j`: corner `j` to corner `(j + 1) % 3`.
    #[inline]
    pub fn edge(&self, j: usize) -> (u32, u32) {
        (self.indices[j], self.indices[(j + 1) % 3])
    }
}

impl fmt::Debug for Triangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Triangle({}, {}, {})",
            self.indices[0], self.indices[1], self.indices[2]
        )
    }
}

impl From<[u32; 3]> for Triangle {
    #[inline]
    fn from(indices: [u32; 3]) -> Self {
        Self { indices }
    }
}

/// A 3D triangle mesh represented as an indexed triangle set.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    /// Vertex positions (in mm, floating-point).
    vertices: Vec<Point3F>,
    /// Triangle indices into the vertex array.
    indices: Vec<Triangle>,
}

impl TriangleMesh {
    /// Create a new empty mesh.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh from vertices and indices.
    pub fn from_parts(vertices: Vec<Point3F>, indices: Vec<Triangle>) -> Self {
        Self { vertices, indices }
    }

    /// Build an indexed mesh from unshared facets, welding bit-identical
    /// corners into one vertex. The first occurrence fixes the vertex order.
    pub fn from_facets(facets: &[[Point3F; 3]]) -> Self {
        let mut lookup: HashMap<[u64; 3], u32> = HashMap::with_capacity(facets.len());
        let mut mesh = Self::new();
        mesh.indices.reserve(facets.len());
        for facet in facets {
            let corners = facet.map(|p| {
                // -0.0 and 0.0 weld together
                let key = [p.x + 0.0, p.y + 0.0, p.z + 0.0].map(f64::to_bits);
                *lookup.entry(key).or_insert_with(|| {
                    mesh.vertices.push(p);
                    (mesh.vertices.len() - 1) as u32
                })
            });
            mesh.indices.push(Triangle::from(corners));
        }
        mesh
    }

    #[inline]
    pub fn vertices(&self) -> &[Point3F] {
        &self.vertices
    }

    #[inline]
    pub fn indices(&self) -> &[Triangle] {
        &self.indices
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    /// A mesh without triangles is empty, whatever its vertex list holds.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Add a vertex and return its index.
    pub fn add_vertex(&mut self, v: Point3F) -> u32 {
        let idx = self.vertices.len() as u32;
        self.vertices.push(v);
        idx
    }

    pub fn add_triangle(&mut self, tri: Triangle) {
        self.indices.push(tri);
    }

    /// Append the vertices and triangles of `other`, vertices are not shared.
    pub fn merge(&mut self, other: &TriangleMesh) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(
            other
                .indices
                .iter()
                .map(|tri| Triangle::from(tri.indices.map(|i| i + offset))),
        );
    }

    #[inline]
    pub fn vertex(&self, idx: u32) -> Point3F {
        self.vertices[idx as usize]
    }

    /// Get the three vertices of a triangle.
    #[inline]
    pub fn triangle_vertices(&self, tri_idx: usize) -> [Point3F; 3] {
        let [a, b, c] = self.indices[tri_idx].indices;
        [
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ]
    }

    pub fn bounding_box(&self) -> BoundingBox3F {
        BoundingBox3F::from_points(&self.vertices)
    }

    /// Unnormalized triangle normal `(b - a) x (c - a)`.
    pub fn triangle_normal_raw(&self, tri_idx: usize) -> Point3F {
        let [v0, v1, v2] = self.triangle_vertices(tri_idx);
        (v1 - v0).cross(&(v2 - v0))
    }

    /// Calculate the total surface area of the mesh.
    pub fn surface_area(&self) -> CoordF {
        (0..self.indices.len())
            .map(|i| self.triangle_normal_raw(i).length() / 2.0)
            .sum()
    }

    /// Signed enclosed volume; positive for outward-facing closed meshes.
    pub fn signed_volume(&self) -> CoordF {
        self.indices
            .iter()
            .map(|tri| {
                let [a, b, c] = tri.indices.map(|i| self.vertices[i as usize]);
                a.dot(&b.cross(&c)) / 6.0
            })
            .sum()
    }

    #[inline]
    pub fn volume(&self) -> CoordF {
        self.signed_volume().abs()
    }

    /// Translate the mesh by a vector.
    pub fn translate(&mut self, v: Point3F) {
        for vertex in &mut self.vertices {
            *vertex = *vertex + v;
        }
    }

    /// Transform every vertex. Mirroring transforms also flip the winding so
    /// normals keep pointing outward.
    pub fn transform(&mut self, trafo: &Transform3D) {
        for vertex in &mut self.vertices {
            *vertex = trafo.apply(*vertex);
        }
        if trafo.has_reflection() {
            self.flip_normals();
        }
    }

    /// Flip all triangle normals (reverse winding order).
    pub fn flip_normals(&mut self) {
        for tri in &mut self.indices {
            tri.indices.swap(0, 2);
        }
    }

    /// Remove degenerate triangles.
    pub fn remove_degenerate_triangles(&mut self) {
        self.indices.retain(|tri| !tri.is_degenerate());
    }

    /// Remove vertices not referenced by any triangle, keeping relative order.
    pub fn remove_unused_vertices(&mut self) {
        let mut remap: Vec<Option<u32>> = vec![None; self.vertices.len()];
        for tri in &self.indices {
            for &idx in &tri.indices {
                remap[idx as usize] = Some(0);
            }
        }

        let mut new_vertices = Vec::with_capacity(self.vertices.len());
        for (slot, v) in remap.iter_mut().zip(&self.vertices) {
            if slot.is_some() {
                *slot = Some(new_vertices.len() as u32);
                new_vertices.push(*v);
            }
        }

        for tri in &mut self.indices {
            for idx in &mut tri.indices {
                if let Some(new_idx) = remap[*idx as usize] {
                    *idx = new_idx;
                }
            }
        }
        self.vertices = new_vertices;
    }

    /// Validate the mesh (check for valid indices).
    pub fn validate(&self) -> Result<()> {
        let vertex_count = self.vertices.len() as u32;
        for (i, tri) in self.indices.iter().enumerate() {
            for &idx in &tri.indices {
                if idx >= vertex_count {
                    return Err(Error::Mesh(format!(
                        "Triangle {} has invalid vertex index {} (only {} vertices)",
                        i, idx, vertex_count
                    )));
                }
            }
        }
        Ok(())
    }

    /// Axis-aligned box with outward-facing triangles.
    pub fn make_box(min: Point3F, max: Point3F) -> Self {
        let vertices = vec![
            Point3F::new(min.x, min.y, min.z),
            Point3F::new(max.x, min.y, min.z),
            Point3F::new(max.x, max.y, min.z),
            Point3F::new(min.x, max.y, min.z),
            Point3F::new(min.x, min.y, max.z),
            Point3F::new(max.x, min.y, max.z),
            Point3F::new(max.x, max.y, max.z),
            Point3F::new(min.x, max.y, max.z),
        ];

        let indices = [
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [2, 3, 7],
            [2, 7, 6],
            [0, 4, 7],
            [0, 7, 3],
            [1, 2, 6],
            [1, 6, 5],
        ]
        .into_iter()
        .map(Triangle::from)
        .collect();

        Self::from_parts(vertices, indices)
    }

    /// Cube of edge `size` centered at the origin.
    pub fn cube(size: CoordF) -> Self {
        let half = size / 2.0;
        Self::make_box(
            Point3F::new(-half, -half, -half),
            Point3F::new(half, half, half),
        )
    }
}

impl fmt::Debug for TriangleMesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TriangleMesh({} vertices, {} triangles)",
            self.vertices.len(),
            self.indices.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_degenerate() {
        assert!(!Triangle::new(0, 1, 2).is_degenerate());
        assert!(Triangle::new(0, 0, 2).is_degenerate());
        assert!(Triangle::new(0, 1, 0).is_degenerate());
    }

    #[test]
    fn test_triangle_edges() {
        let tri = Triangle::new(4, 7, 9);
        assert_eq!(tri.edge(0), (4, 7));
        assert_eq!(tri.edge(1), (7, 9));
        assert_eq!(tri.edge(2), (9, 4));
    }

    #[test]
    fn test_mesh_cube() {
        let mesh = TriangleMesh::cube(10.0);
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.triangle_count(), 12);

        let bb = mesh.bounding_box();
        assert!((bb.min.x - (-5.0)).abs() < 1e-10);
        assert!((bb.max.z - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_cube_volume_is_positive() {
        let mesh = TriangleMesh::cube(10.0);
        assert!(
            (mesh.signed_volume() - 1000.0).abs() < 1e-9,
            "outward-facing cube should have positive volume, got {}",
            mesh.signed_volume()
        );
        assert!((mesh.surface_area() - 600.0).abs() < 1e-9);
    }

    #[test]
    fn test_flip_normals_negates_volume() {
        let mut mesh = TriangleMesh::cube(2.0);
        mesh.flip_normals();
        assert!((mesh.signed_volume() + 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_mirror_transform_keeps_orientation() {
        let mut mesh = TriangleMesh::cube(2.0);
        mesh.transform(&Transform3D::scaling(-1.0, 1.0, 1.0));
        assert!(
            mesh.signed_volume() > 0.0,
            "mirrored mesh should stay outward-facing"
        );
    }

    #[test]
    fn test_remove_unused_vertices() {
        let mut mesh = TriangleMesh::new();
        mesh.add_vertex(Point3F::new(9.0, 9.0, 9.0));
        let a = mesh.add_vertex(Point3F::new(0.0, 0.0, 0.0));
        let b = mesh.add_vertex(Point3F::new(1.0, 0.0, 0.0));
        let c = mesh.add_vertex(Point3F::new(0.0, 1.0, 0.0));
        mesh.add_triangle(Triangle::new(a, b, c));

        mesh.remove_unused_vertices();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.indices()[0], Triangle::new(0, 1, 2));
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_from_facets_welds_shared_corners() {
        let a = Point3F::new(0.0, 0.0, 0.0);
        let b = Point3F::new(1.0, 0.0, 0.0);
        let c = Point3F::new(1.0, 1.0, 0.0);
        let d = Point3F::new(-0.0, 1.0, 0.0);
        let mesh = TriangleMesh::from_facets(&[[a, b, c], [a, c, Point3F::new(0.0, 1.0, 0.0)], [a, c, d]]);
        assert_eq!(mesh.vertex_count(), 4, "shared and signed-zero corners should weld");
        assert_eq!(mesh.indices()[0], Triangle::new(0, 1, 2));
        assert_eq!(mesh.indices()[1], Triangle::new(0, 2, 3));
        assert_eq!(mesh.indices()[2], Triangle::new(0, 2, 3));
    }

    #[test]
    fn test_mesh_validate() {
        let mut mesh = TriangleMesh::cube(1.0);
        assert!(mesh.validate().is_ok());
        mesh.add_triangle(Triangle::new(0, 1, 100));
        assert!(mesh.validate().is_err());
    }

    #[test]
    fn test_merge_hollow_box() {
        let mut mesh = TriangleMesh::cube(10.0);
        let mut cavity = TriangleMesh::cube(4.0);
        cavity.flip_normals();
        mesh.merge(&cavity);
        assert_eq!(mesh.vertex_count(), 16);
        assert_eq!(mesh.triangle_count(), 24);
        assert!(mesh.validate().is_ok());
        assert!((mesh.volume() - (1000.0 - 64.0)).abs() < 1e-9);
    }
}

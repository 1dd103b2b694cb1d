//! Splitting a mesh in two at a horizontal plane.
//!
//! Facets above or below the plane are copied, facets crossing it are split
//! at the two crossings next to their lone vertex. Crossings and vertices on
//! the plane are placed on the XY grid used by the intersector, so the caps
//! built from the cross-section share their corners bit for bit with the
//! split facets and weld into watertight halves.

use super::chain::make_loops;
use super::intersection::{interpolate, lowest_vertex, slice_facet, xy, z_range, FacetEdgeType, IntersectionLine};
use super::regions::make_expolygons_simple;
use super::slicing_params::GapClosingParams;
use crate::geometry::{Point, Point3F};
use crate::mesh::topology::face_edge_ids;
use crate::mesh::TriangleMesh;
use crate::triangulation::triangulate_expolygons;
use crate::{unscale, CoordF, Result, SCALING_FACTOR};
use log::{debug, trace};

/// The two halves of a cut mesh. A half is `None` when it was not requested.
#[derive(Clone, Debug, Default)]
pub struct CutResult {
    pub upper: Option<TriangleMesh>,
    pub lower: Option<TriangleMesh>,
}

#[inline]
fn on_plane(p: Point, z: CoordF) -> Point3F {
    Point3F::new(unscale(p.x), unscale(p.y), z)
}

/// Working state of one cut.
struct Cutter<'a> {
    mesh: &'a TriangleMesh,
    z: CoordF,
    keep_upper: bool,
    keep_lower: bool,
    caps: bool,
    /// Vertices with X and Y scaled, as seen by the intersector.
    placed: Vec<Point3F>,
    /// Output positions, snapped to the grid on the plane.
    positions: Vec<Point3F>,
    upper: Vec<[Point3F; 3]>,
    lower: Vec<[Point3F; 3]>,
    upper_lines: Vec<IntersectionLine>,
    lower_lines: Vec<IntersectionLine>,
}

impl<'a> Cutter<'a> {
    fn new(mesh: &'a TriangleMesh, z: CoordF, keep_upper: bool, keep_lower: bool, caps: bool) -> Self {
        let placed: Vec<Point3F> = mesh
            .vertices()
            .iter()
            .map(|v| Point3F::new(v.x * SCALING_FACTOR, v.y * SCALING_FACTOR, v.z))
            .collect();
        let positions = placed
            .iter()
            .zip(mesh.vertices())
            .map(|(p, v)| if v.z == z { on_plane(xy(p), z) } else { *v })
            .collect();
        Self {
            mesh,
            z,
            keep_upper,
            keep_lower,
            caps,
            placed,
            positions,
            upper: Vec::new(),
            lower: Vec::new(),
            upper_lines: Vec::new(),
            lower_lines: Vec::new(),
        }
    }

    /// Crossing of the edge `i`-`j` with the plane, the same point the
    /// intersector produces for that edge.
    fn crossing(&self, i: u32, j: u32) -> Point3F {
        let (a, b) = if i < j { (i, j) } else { (j, i) };
        let (pa, pb) = (&self.placed[a as usize], &self.placed[b as usize]);
        if pa.z == self.z {
            return self.positions[a as usize];
        }
        if pb.z == self.z {
            return self.positions[b as usize];
        }
        let (t, p) = interpolate(pa, pb, self.z);
        if t <= 0.0 {
            self.positions[b as usize]
        } else if t >= 1.0 {
            self.positions[a as usize]
        } else {
            on_plane(p, self.z)
        }
    }

    fn route(&mut self, line: IntersectionLine) {
        let (to_upper, to_lower) = match line.edge_type {
            // Edge on the plane with the facet below it.
            FacetEdgeType::Top => (false, true),
            // Edge on the plane with the facet above it.
            FacetEdgeType::Bottom => (true, false),
            FacetEdgeType::Horizontal => (false, false),
            _ => (true, true),
        };
        if to_upper && self.keep_upper {
            self.upper_lines.push(line.clone());
        }
        if to_lower && self.keep_lower {
            self.lower_lines.push(line);
        }
    }

    fn push(&mut self, upper: bool, facets: &[[Point3F; 3]]) {
        if upper && self.keep_upper {
            self.upper.extend_from_slice(facets);
        } else if !upper && self.keep_lower {
            self.lower.extend_from_slice(facets);
        }
    }

    fn split(&mut self, indices: [u32; 3]) {
        let above = indices.map(|i| self.placed[i as usize].z > self.z);
        let lone = if above[0] == above[1] {
            2
        } else if above[1] == above[2] {
            0
        } else {
            1
        };
        let v0 = indices[lone];
        let v1 = indices[(lone + 1) % 3];
        let v2 = indices[(lone + 2) % 3];
        let v0v1 = self.crossing(v0, v1);
        let v2v0 = self.crossing(v2, v0);
        let pos = |i: u32| self.positions[i as usize];

        let triangle = [pos(v0), v0v1, v2v0];
        let quad = [[pos(v1), pos(v2), v0v1], [pos(v2), v2v0, v0v1]];
        self.push(above[lone], &[triangle]);
        self.push(!above[lone], &quad);
    }

    fn run(&mut self) {
        let mesh = self.mesh;
        let edge_ids = face_edge_ids(mesh);
        for (facet_idx, tri) in mesh.indices().iter().enumerate() {
            let vertices = tri.indices.map(|i| self.placed[i as usize]);
            let (min_z, max_z) = z_range(&vertices);

            if self.caps && min_z <= self.z && self.z <= max_z {
                let (_, line) = slice_facet(
                    self.z,
                    &vertices,
                    &tri.indices,
                    &edge_ids[facet_idx],
                    lowest_vertex(&vertices, min_z),
                    min_z == max_z,
                );
                if let Some(line) = line {
                    self.route(line);
                }
            }

            let facet = tri.indices.map(|i| self.positions[i as usize]);
            if min_z > self.z || (min_z == self.z && max_z > self.z) {
                self.push(true, &[facet]);
            } else if max_z < self.z || (max_z == self.z && min_z < self.z) {
                self.push(false, &[facet]);
            } else if min_z < self.z && self.z < max_z {
                self.split(tri.indices);
            }
            // Facets lying in the plane belong to neither half.
        }
    }

    /// Fill the cross-section bounded by `lines`, facing up or down.
    fn cap(&self, lines: &mut [IntersectionLine], facing_up: bool) -> Result<Vec<[Point3F; 3]>> {
        let loops = make_loops(lines, &GapClosingParams::default());
        let regions = make_expolygons_simple(&loops);
        let triangles = triangulate_expolygons(&regions)?;
        trace!(
            "cut: cap of {} loops, {} regions, {} triangles",
            loops.len(),
            regions.len(),
            triangles.len()
        );
        Ok(triangles
            .iter()
            .map(|t| {
                let [a, b, c] = t.map(|p| on_plane(p, self.z));
                if facing_up {
                    [a, b, c]
                } else {
                    [a, c, b]
                }
            })
            .collect())
    }
}

fn build_half(facets: &[[Point3F; 3]]) -> TriangleMesh {
    let mut mesh = TriangleMesh::from_facets(facets);
    mesh.remove_degenerate_triangles();
    mesh.remove_unused_vertices();
    mesh
}

/// Cut `mesh` at height `z` into the part above and the part below.
///
/// Only the requested halves are built. With `triangulate_caps` the cut
/// faces are closed, so a closed input gives two closed halves whose volumes
/// add up to the input volume. Facets lying in the plane are dropped from
/// both halves.
pub fn cut_mesh(mesh: &TriangleMesh, z: CoordF, upper: bool, lower: bool, triangulate_caps: bool) -> Result<CutResult> {
    if !upper && !lower {
        return Ok(CutResult::default());
    }
    let mut cutter = Cutter::new(mesh, z, upper, lower, triangulate_caps);
    cutter.run();

    if upper && triangulate_caps {
        let mut lines = std::mem::take(&mut cutter.upper_lines);
        let cap = cutter.cap(&mut lines, false)?;
        cutter.upper.extend(cap);
    }
    if lower && triangulate_caps {
        let mut lines = std::mem::take(&mut cutter.lower_lines);
        let cap = cutter.cap(&mut lines, true)?;
        cutter.lower.extend(cap);
    }

    let result = CutResult {
        upper: upper.then(|| build_half(&cutter.upper)),
        lower: lower.then(|| build_half(&cutter.lower)),
    };
    debug!(
        "cut_mesh: z {} on {} facets, upper {:?} facets, lower {:?} facets",
        z,
        mesh.triangle_count(),
        result.upper.as_ref().map(TriangleMesh::triangle_count),
        result.lower.as_ref().map(TriangleMesh::triangle_count)
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::topology::{face_neighbors, num_open_edges};

    fn hollow_cube() -> TriangleMesh {
        let mut mesh = TriangleMesh::cube(20.0);
        let mut cavity = TriangleMesh::cube(10.0);
        cavity.flip_normals();
        mesh.merge(&cavity);
        mesh
    }

    fn assert_closed(mesh: &TriangleMesh) {
        assert!(!mesh.is_empty());
        assert_eq!(num_open_edges(&face_neighbors(mesh)), 0);
    }

    #[test]
    fn test_cut_cube_into_closed_halves() {
        let mesh = TriangleMesh::cube(10.0);
        let result = cut_mesh(&mesh, 1.0, true, true, true).unwrap();
        let upper = result.upper.unwrap();
        let lower = result.lower.unwrap();
        assert_closed(&upper);
        assert_closed(&lower);
        assert!((upper.signed_volume() - 400.0).abs() < 1e-6);
        assert!((lower.signed_volume() - 600.0).abs() < 1e-6);
        assert!((upper.signed_volume() + lower.signed_volume() - mesh.signed_volume()).abs() < 1e-6);

        let bb = upper.bounding_box();
        assert!((bb.min.z - 1.0).abs() < 1e-12);
        assert!((bb.max.z - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_cut_hollow_cube_keeps_cavity() {
        let mesh = hollow_cube();
        let result = cut_mesh(&mesh, 0.0, true, true, true).unwrap();
        let upper = result.upper.unwrap();
        let lower = result.lower.unwrap();
        assert_closed(&upper);
        assert_closed(&lower);
        assert!((upper.signed_volume() - 3500.0).abs() < 1e-6);
        assert!((lower.signed_volume() - 3500.0).abs() < 1e-6);
    }

    #[test]
    fn test_cut_through_top_face() {
        let mesh = TriangleMesh::cube(10.0);
        let result = cut_mesh(&mesh, 5.0, true, true, true).unwrap();
        assert!(result.upper.unwrap().is_empty());
        let lower = result.lower.unwrap();
        assert_closed(&lower);
        assert!((lower.signed_volume() - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn test_plane_outside_mesh() {
        let mesh = TriangleMesh::cube(10.0);
        let result = cut_mesh(&mesh, 7.0, true, true, true).unwrap();
        assert!(result.upper.unwrap().is_empty());
        let lower = result.lower.unwrap();
        assert_eq!(lower.triangle_count(), mesh.triangle_count());
        assert!((lower.signed_volume() - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_without_caps_halves_stay_open() {
        let mesh = TriangleMesh::cube(10.0);
        let result = cut_mesh(&mesh, 1.0, true, true, false).unwrap();
        let upper = result.upper.unwrap();
        let lower = result.lower.unwrap();
        assert!(num_open_edges(&face_neighbors(&upper)) > 0);
        assert!(num_open_edges(&face_neighbors(&lower)) > 0);
    }

    #[test]
    fn test_only_requested_half_is_built() {
        let mesh = TriangleMesh::cube(10.0);
        let result = cut_mesh(&mesh, 1.0, false, true, true).unwrap();
        assert!(result.upper.is_none());
        assert_closed(&result.lower.unwrap());
    }

    #[test]
    fn test_unrequested_half_collects_nothing() {
        let mesh = hollow_cube();
        let mut cutter = Cutter::new(&mesh, 1.0, false, true, true);
        cutter.run();
        assert!(cutter.upper.is_empty());
        assert!(cutter.upper_lines.is_empty());
        assert!(!cutter.lower.is_empty());
        assert!(!cutter.lower_lines.is_empty());

        let both = cut_mesh(&mesh, 1.0, true, true, true).unwrap();
        let lower_only = cut_mesh(&mesh, 1.0, false, true, true).unwrap();
        assert_eq!(
            both.lower.unwrap().triangle_count(),
            lower_only.lower.unwrap().triangle_count()
        );
        let neither = cut_mesh(&mesh, 1.0, false, false, true).unwrap();
        assert!(neither.upper.is_none() && neither.lower.is_none());
    }

    #[test]
    fn test_cut_through_vertices() {
        // Square pyramid with its apex at z = 10, cut right through the
        // base corners of a second pyramid stacked under it.
        let mesh = TriangleMesh::from_parts(
            vec![
                Point3F::new(0.0, 0.0, 0.0),
                Point3F::new(10.0, 0.0, 0.0),
                Point3F::new(10.0, 10.0, 0.0),
                Point3F::new(0.0, 10.0, 0.0),
                Point3F::new(5.0, 5.0, 10.0),
                Point3F::new(5.0, 5.0, -10.0),
            ],
            vec![
                [0, 1, 4].into(),
                [1, 2, 4].into(),
                [2, 3, 4].into(),
                [3, 0, 4].into(),
                [1, 0, 5].into(),
                [2, 1, 5].into(),
                [3, 2, 5].into(),
                [0, 3, 5].into(),
            ],
        );
        assert_closed(&mesh);
        let result = cut_mesh(&mesh, 0.0, true, true, true).unwrap();
        let upper = result.upper.unwrap();
        let lower = result.lower.unwrap();
        assert_closed(&upper);
        assert_closed(&lower);
        let expected = 100.0 * 10.0 / 3.0;
        assert!((upper.signed_volume() - expected).abs() < 1e-6);
        assert!((lower.signed_volume() - expected).abs() < 1e-6);
    }
}

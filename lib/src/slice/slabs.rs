//! Slab projection: the outline of the up or down facing surface between two
//! consecutive planes.
//!
//! Top slab `j` holds the up facing surface with `zs[j] <= z < zs[j + 1]`,
//! the last one is open upwards. Bottom slab `j` holds the down facing
//! surface with `zs[j - 1] < z <= zs[j]`, the first one is open downwards.
//!
//! The outline of a slab is chained from the cross-section of its surface at
//! the near plane, the reversed cross-section at the far plane and the mesh
//! edges bounding the surface, clipped to the slab. Crossings with the far
//! plane get their edge ids shifted by the number of edge ids, so the two
//! crossings of one edge stay apart.

use super::chain::make_loops;
use super::dispatch::{check_sorted, facet_vertices, layer_range, transform_vertices, LayerLines, FACET_BATCH};
use super::intersection::{interpolate, lowest_vertex, slice_facet, xy, z_range, FacetEdgeType, IntersectionLine};
use super::slicing_params::GapClosingParams;
use crate::clipper::union_polygons;
use crate::geometry::{to_polygons, Point, Point3F, Polygons, Transform3D};
use crate::mesh::topology::{face_edge_ids_from_neighbors, face_neighbors_filtered, FaceEdgeIds, FaceNeighbors};
use crate::mesh::TriangleMesh;
use crate::{CoordF, Error, Result};
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Where a facet's normal points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FacetOrientation {
    Up,
    Down,
    Vertical,
    Degenerate,
}

/// Orientation of a placed facet. A mirroring placement flips the winding,
/// `mirrored` undoes that.
pub fn facet_orientation(vertices: &[Point3F; 3], mirrored: bool) -> FacetOrientation {
    let n = (vertices[1] - vertices[0]).cross(&(vertices[2] - vertices[0]));
    if n.z == 0.0 {
        if n.x == 0.0 && n.y == 0.0 {
            FacetOrientation::Degenerate
        } else {
            FacetOrientation::Vertical
        }
    } else if (n.z > 0.0) != mirrored {
        FacetOrientation::Up
    } else {
        FacetOrientation::Down
    }
}

/// Outlines of the top and bottom slabs, one entry per plane.
///
/// A direction that was not requested stays empty.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SlabSlices {
    pub top: Vec<Polygons>,
    pub bottom: Vec<Polygons>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Top,
    Bottom,
}

impl Direction {
    fn facets(self) -> FacetOrientation {
        match self {
            Direction::Top => FacetOrientation::Up,
            Direction::Bottom => FacetOrientation::Down,
        }
    }

    /// Slab holding the height `z`.
    fn slab_of(self, zs: &[CoordF], z: CoordF) -> Option<usize> {
        match self {
            Direction::Top => zs.partition_point(|&p| p <= z).checked_sub(1),
            Direction::Bottom => {
                let j = zs.partition_point(|&p| p < z);
                (j < zs.len()).then_some(j)
            }
        }
    }

    /// Type of an in-plane segment whose facet lies in the slab owning the
    /// plane itself.
    fn owned_edge_type(self) -> FacetEdgeType {
        match self {
            Direction::Top => FacetEdgeType::Bottom,
            Direction::Bottom => FacetEdgeType::Top,
        }
    }

    /// Does a facet with an edge at height `z` reach into the slab owning
    /// that height from this edge?
    fn reaches_owning_slab(self, vertices: &[Point3F; 3], z: CoordF) -> bool {
        let (min_z, max_z) = z_range(vertices);
        min_z == max_z
            || match self {
                Direction::Top => max_z > z,
                Direction::Bottom => min_z < z,
            }
    }

    /// Boundary edges keep the facet winding from above, which is counter-
    /// clockwise for up facing facets only.
    fn orient(self, line: IntersectionLine) -> IntersectionLine {
        match self {
            Direction::Top => line,
            Direction::Bottom => line.reversed(),
        }
    }
}

/// A point along a boundary edge.
#[derive(Clone, Copy, Debug)]
struct Stop {
    point: Point,
    z: CoordF,
    vertex: Option<u32>,
    plane: Option<usize>,
}

impl Stop {
    fn vertex(v: &Point3F, id: u32) -> Self {
        Self {
            point: xy(v),
            z: v.z,
            vertex: Some(id),
            plane: None,
        }
    }

    /// Crossing of an edge with plane `k`, computed exactly as the facet
    /// intersection does so both agree on the point.
    fn crossing<'p>(mut a: (&'p Point3F, u32), mut b: (&'p Point3F, u32), z: CoordF, k: usize) -> Self {
        if a.1 > b.1 {
            std::mem::swap(&mut a, &mut b);
        }
        let (t, point) = interpolate(a.0, b.0, z);
        if t <= 0.0 {
            Self::vertex(b.0, b.1)
        } else if t >= 1.0 {
            Self::vertex(a.0, a.1)
        } else {
            Self {
                point,
                z,
                vertex: None,
                plane: Some(k),
            }
        }
    }
}

/// Where a generated segment goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Bucket {
    AtPlane,
    Piece,
}

struct SlabContext<'a> {
    mesh: &'a TriangleMesh,
    vertices: &'a [Point3F],
    zs: &'a [CoordF],
    direction: Direction,
    neighbors: FaceNeighbors,
    edge_ids: FaceEdgeIds,
    num_edges: u32,
    mirrored: bool,
}

impl SlabContext<'_> {
    fn facet(&self, face: usize) -> [Point3F; 3] {
        facet_vertices(self.vertices, &self.mesh.indices()[face])
    }

    fn finish(&self, line: IntersectionLine) -> IntersectionLine {
        if self.mirrored {
            line.reversed()
        } else {
            line
        }
    }

    /// Is the facet across the in-plane edge of `line` horizontal?
    fn in_plane_neighbor_is_horizontal(&self, face: usize, line: &IntersectionLine) -> bool {
        let (Some(a), Some(b)) = (line.a_id, line.b_id) else {
            return false;
        };
        let tri = &self.mesh.indices()[face];
        (0..3)
            .find(|&j| {
                let (p, q) = tri.edge(j);
                (p == a && q == b) || (p == b && q == a)
            })
            .and_then(|j| self.neighbors[face][j])
            .is_some_and(|n| {
                let (min_z, max_z) = z_range(&self.facet(n as usize));
                min_z == max_z
            })
    }

    fn piece(&self, s0: &Stop, s1: &Stop, slab: usize, edge_id: u32, flags: u32) -> IntersectionLine {
        let edge_ref = |s: &Stop| {
            s.plane
                .map(|k| if k == slab { edge_id } else { edge_id + self.num_edges })
        };
        IntersectionLine {
            a: s0.point,
            b: s1.point,
            a_id: s0.vertex,
            b_id: s1.vertex,
            edge_a_id: edge_ref(s0),
            edge_b_id: edge_ref(s1),
            edge_type: FacetEdgeType::Slab,
            flags,
        }
    }

    fn facet_lines<F>(&self, face: usize, mut emit: F)
    where
        F: FnMut(Bucket, usize, IntersectionLine),
    {
        let zs = self.zs;
        let tri = &self.mesh.indices()[face];
        let v = self.facet(face);
        let (min_z, max_z) = z_range(&v);
        let horizontal = min_z == max_z;
        let lowest = lowest_vertex(&v, min_z);

        for k in layer_range(zs, min_z, max_z) {
            let (_, line) = slice_facet(zs[k], &v, &tri.indices, &self.edge_ids[face], lowest, horizontal);
            let Some(line) = line else {
                continue;
            };
            match line.edge_type {
                FacetEdgeType::General => {}
                FacetEdgeType::Top | FacetEdgeType::Bottom => {
                    // A horizontal neighbor on the plane shares the slab, the
                    // edge is inside the surface.
                    if line.edge_type == self.direction.owned_edge_type()
                        && self.in_plane_neighbor_is_horizontal(face, &line)
                    {
                        continue;
                    }
                }
                _ => continue,
            }
            emit(Bucket::AtPlane, k, self.finish(line));
        }

        for j in 0..3 {
            let Some(edge_id) = self.edge_ids[face][j] else {
                continue;
            };
            let neighbor = self.neighbors[face][j];
            let flags = if neighbor.is_none() {
                IntersectionLine::EDGE0_NO_NEIGHBOR << j
            } else {
                0
            };
            let (ip, iq) = tri.edge(j);
            let (p, q) = (&v[j], &v[(j + 1) % 3]);

            if p.z == q.z {
                let k = zs.partition_point(|&z| z < p.z);
                if k < zs.len() && zs[k] == p.z {
                    // Edges of sloped facets on a plane are in-plane segments.
                    if !horizontal {
                        continue;
                    }
                    if neighbor.is_some_and(|n| {
                        self.direction
                            .reaches_owning_slab(&self.facet(n as usize), p.z)
                    }) {
                        continue;
                    }
                    let mut line =
                        IntersectionLine::from_vertices(xy(p), ip, xy(q), iq, FacetEdgeType::TopBottom);
                    line.flags = flags;
                    emit(Bucket::Piece, k, self.finish(self.direction.orient(line)));
                } else if neighbor.is_none() {
                    if let Some(slab) = self.direction.slab_of(zs, p.z) {
                        let piece = self.piece(&Stop::vertex(p, ip), &Stop::vertex(q, iq), slab, edge_id, flags);
                        emit(Bucket::Piece, slab, self.finish(self.direction.orient(piece)));
                    }
                }
                continue;
            }
            if neighbor.is_some() {
                continue;
            }

            // Split the boundary edge at every plane strictly inside it.
            let (lo, hi) = (p.z.min(q.z), p.z.max(q.z));
            let planes = zs.partition_point(|&z| z <= lo)..zs.partition_point(|&z| z < hi);
            let mut stops = Vec::with_capacity(planes.len() + 2);
            stops.push(Stop::vertex(p, ip));
            let crossing = |k: usize| Stop::crossing((p, ip), (q, iq), zs[k], k);
            if p.z < q.z {
                stops.extend(planes.map(crossing));
            } else {
                stops.extend(planes.rev().map(crossing));
            }
            stops.push(Stop::vertex(q, iq));

            for w in stops.windows(2) {
                if let Some(slab) = self.direction.slab_of(zs, 0.5 * (w[0].z + w[1].z)) {
                    let piece = self.piece(&w[0], &w[1], slab, edge_id, flags);
                    emit(Bucket::Piece, slab, self.finish(self.direction.orient(piece)));
                }
            }
        }
    }

    /// Segments of one slab ready for chaining.
    fn slab_segments(&self, at_plane: &LayerLines, pieces: &LayerLines, j: usize) -> Vec<IntersectionLine> {
        let (near_excluded, far, far_excluded) = match self.direction {
            Direction::Top => (FacetEdgeType::Top, j.checked_add(1).filter(|&k| k < self.zs.len()), FacetEdgeType::Bottom),
            Direction::Bottom => (FacetEdgeType::Bottom, j.checked_sub(1), FacetEdgeType::Top),
        };
        let mut lines: Vec<IntersectionLine> = at_plane[j]
            .iter()
            .filter(|l| l.edge_type != near_excluded)
            .copied()
            .collect();
        lines.extend_from_slice(&pieces[j]);
        if let Some(k) = far {
            lines.extend(at_plane[k].iter().filter(|l| l.edge_type != far_excluded).map(|l| {
                let mut l = l.reversed();
                l.offset_edge_ids(self.num_edges);
                l
            }));
        }
        lines
    }
}

fn slice_slabs<C>(
    mesh: &TriangleMesh,
    vertices: &[Point3F],
    orientations: &[FacetOrientation],
    zs: &[CoordF],
    direction: Direction,
    mirrored: bool,
    cancel: &C,
) -> Result<Vec<Polygons>>
where
    C: Fn() -> bool + Sync,
{
    let facets = direction.facets();
    let neighbors = face_neighbors_filtered(mesh, |f| orientations[f] == facets);
    let (edge_ids, num_edges) = face_edge_ids_from_neighbors(mesh, &neighbors, true);
    let ctx = SlabContext {
        mesh,
        vertices,
        zs,
        direction,
        neighbors,
        edge_ids,
        num_edges,
        mirrored,
    };

    let faces: Vec<usize> = (0..orientations.len())
        .filter(|&f| orientations[f] == facets)
        .collect();
    let batches = faces
        .par_chunks(FACET_BATCH)
        .map(|batch| {
            if cancel() {
                return Err(Error::Cancelled);
            }
            let mut out = Vec::new();
            for &face in batch {
                ctx.facet_lines(face, |bucket, slab, line| out.push((bucket, slab, line)));
            }
            Ok(out)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut at_plane: LayerLines = vec![Vec::new(); zs.len()];
    let mut pieces: LayerLines = vec![Vec::new(); zs.len()];
    for (bucket, slab, line) in batches.into_iter().flatten() {
        match bucket {
            Bucket::AtPlane => at_plane[slab].push(line),
            Bucket::Piece => pieces[slab].push(line),
        }
    }

    let gap_closing = GapClosingParams::default();
    (0..zs.len())
        .into_par_iter()
        .map(|j| {
            if cancel() {
                return Err(Error::Cancelled);
            }
            let mut lines = ctx.slab_segments(&at_plane, &pieces, j);
            let loops = make_loops(&mut lines, &gap_closing);
            Ok(to_polygons(&union_polygons(&loops)))
        })
        .collect()
}

/// Outlines of the up facing (`top`) and down facing (`bottom`) surface of
/// `mesh` between consecutive planes of the sorted `zs`, see the module
/// documentation for the slab bounds.
pub fn slice_mesh_slabs<C>(
    mesh: &TriangleMesh,
    zs: &[CoordF],
    trafo: &Transform3D,
    top: bool,
    bottom: bool,
    cancel: C,
) -> Result<SlabSlices>
where
    C: Fn() -> bool + Sync,
{
    check_sorted(zs)?;
    let mut out = SlabSlices::default();
    if mesh.is_empty() || zs.is_empty() {
        if top {
            out.top = vec![Polygons::new(); zs.len()];
        }
        if bottom {
            out.bottom = vec![Polygons::new(); zs.len()];
        }
        return Ok(out);
    }

    let vertices = transform_vertices(mesh, trafo);
    let mirrored = trafo.has_reflection();
    let orientations: Vec<FacetOrientation> = mesh
        .indices()
        .par_iter()
        .map(|tri| facet_orientation(&facet_vertices(&vertices, tri), mirrored))
        .collect();

    if top {
        out.top = slice_slabs(mesh, &vertices, &orientations, zs, Direction::Top, mirrored, &cancel)?;
    }
    if bottom {
        out.bottom = slice_slabs(mesh, &vertices, &orientations, zs, Direction::Bottom, mirrored, &cancel)?;
    }
    debug!(
        "slice_mesh_slabs: {} facets, {} planes, {} top / {} bottom loops",
        mesh.triangle_count(),
        zs.len(),
        out.top.iter().map(Vec::len).sum::<usize>(),
        out.bottom.iter().map(Vec::len).sum::<usize>()
    );
    Ok(out)
}

/// Outline of the whole mesh seen from above, placed by `trafo`.
pub fn project_mesh<C>(mesh: &TriangleMesh, trafo: &Transform3D, cancel: C) -> Result<Polygons>
where
    C: Fn() -> bool + Sync,
{
    if mesh.is_empty() {
        return Ok(Polygons::new());
    }
    let (min_z, max_z) = mesh
        .vertices()
        .iter()
        .map(|v| trafo.apply(*v).z)
        .fold((CoordF::MAX, CoordF::MIN), |(lo, hi), z| (lo.min(z), hi.max(z)));

    // Two planes beyond the mesh: top slab 0 and bottom slab 1 hold all of it.
    let zs = [min_z - 1.0, max_z + 1.0];
    let slabs = slice_mesh_slabs(mesh, &zs, trafo, true, true, cancel)?;
    let mut loops = Polygons::new();
    loops.extend(slabs.top.into_iter().next().unwrap_or_default());
    loops.extend(slabs.bottom.into_iter().nth(1).unwrap_or_default());
    Ok(to_polygons(&union_polygons(&loops)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::total_signed_area;
    use crate::mesh::Triangle;
    use crate::SCALING_FACTOR;

    const MM2: f64 = SCALING_FACTOR * SCALING_FACTOR;

    /// Square pyramid: base 10 x 10 at z = 0, apex at z = 10.
    fn pyramid() -> TriangleMesh {
        TriangleMesh::from_parts(
            vec![
                Point3F::new(-5.0, -5.0, 0.0),
                Point3F::new(5.0, -5.0, 0.0),
                Point3F::new(5.0, 5.0, 0.0),
                Point3F::new(-5.0, 5.0, 0.0),
                Point3F::new(0.0, 0.0, 10.0),
            ],
            vec![
                Triangle::new(0, 2, 1),
                Triangle::new(0, 3, 2),
                Triangle::new(0, 1, 4),
                Triangle::new(1, 2, 4),
                Triangle::new(2, 3, 4),
                Triangle::new(3, 0, 4),
            ],
        )
    }

    fn area_mm2(polygons: &Polygons) -> f64 {
        total_signed_area(polygons) / MM2
    }

    #[test]
    fn test_facet_orientation() {
        let mesh = pyramid();
        let vertices = transform_vertices(&mesh, &Transform3D::identity());
        let orient = |f: usize, mirrored| facet_orientation(&facet_vertices(&vertices, &mesh.indices()[f]), mirrored);
        assert_eq!(orient(0, false), FacetOrientation::Down);
        assert_eq!(orient(2, false), FacetOrientation::Up);
        assert_eq!(orient(2, true), FacetOrientation::Down);

        let cube = TriangleMesh::cube(2.0);
        let vertices = transform_vertices(&cube, &Transform3D::identity());
        assert_eq!(
            facet_orientation(&facet_vertices(&vertices, &cube.indices()[4]), false),
            FacetOrientation::Vertical
        );
        let flat = [Point3F::new(0.0, 0.0, 0.0), Point3F::new(1.0, 1.0, 1.0), Point3F::new(2.0, 2.0, 2.0)];
        assert_eq!(facet_orientation(&flat, false), FacetOrientation::Degenerate);
    }

    #[test]
    fn test_edge_crossing_ignores_argument_order() {
        let p = Point3F::new(1.0, 2.0, 0.0);
        let q = Point3F::new(4.0, -3.0, 7.0);
        let forward = Stop::crossing((&p, 3), (&q, 8), 2.5, 1);
        let backward = Stop::crossing((&q, 8), (&p, 3), 2.5, 1);
        assert_eq!(forward.point, backward.point);
        assert_eq!(forward.plane, Some(1));
        assert!(forward.vertex.is_none());

        let on_vertex = Stop::crossing((&q, 8), (&p, 3), 7.0, 0);
        assert_eq!(on_vertex.vertex, Some(8));
    }

    #[test]
    fn test_pyramid_slabs() {
        let slabs = slice_mesh_slabs(&pyramid(), &[0.0, 5.0], &Transform3D::identity(), true, true, || false)
            .unwrap();
        assert_eq!(slabs.top.len(), 2);
        assert_eq!(slabs.bottom.len(), 2);

        // Sloped ring between the base and the half height cross-section.
        assert_eq!(slabs.top[0].len(), 2);
        assert!((area_mm2(&slabs.top[0]) - 75.0).abs() < 1e-6);
        assert!((area_mm2(&slabs.top[1]) - 25.0).abs() < 1e-6);
        assert!((area_mm2(&slabs.bottom[0]) - 100.0).abs() < 1e-6);
        assert!(slabs.bottom[1].is_empty());
    }

    #[test]
    fn test_cube_faces_on_planes() {
        let cube = TriangleMesh::cube(10.0);
        let slabs =
            slice_mesh_slabs(&cube, &[-5.0, 0.0, 5.0], &Transform3D::identity(), true, true, || false).unwrap();
        assert!(slabs.top[0].is_empty());
        assert!(slabs.top[1].is_empty());
        assert!((area_mm2(&slabs.top[2]) - 100.0).abs() < 1e-6);
        assert!((area_mm2(&slabs.bottom[0]) - 100.0).abs() < 1e-6);
        assert!(slabs.bottom[1].is_empty());
        assert!(slabs.bottom[2].is_empty());
    }

    #[test]
    fn test_cube_faces_between_planes() {
        let cube = TriangleMesh::cube(10.0);
        let slabs = slice_mesh_slabs(&cube, &[-2.0, 2.0], &Transform3D::identity(), true, false, || false).unwrap();
        assert!(slabs.bottom.is_empty());
        assert!(slabs.top[0].is_empty());
        assert!((area_mm2(&slabs.top[1]) - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_project_mesh() {
        let outline = project_mesh(&pyramid(), &Transform3D::identity(), || false).unwrap();
        assert_eq!(outline.len(), 1);
        assert!(outline[0].is_counter_clockwise());
        assert!((area_mm2(&outline) - 100.0).abs() < 1e-6);

        let mirrored = project_mesh(&pyramid(), &Transform3D::scaling(-1.0, 1.0, 1.0), || false).unwrap();
        assert_eq!(mirrored.len(), 1);
        assert!((area_mm2(&mirrored) - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_project_empty_mesh() {
        assert!(project_mesh(&TriangleMesh::new(), &Transform3D::identity(), || false)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_slabs_cancel() {
        let result = slice_mesh_slabs(&pyramid(), &[0.0, 5.0], &Transform3D::identity(), true, true, || true);
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}

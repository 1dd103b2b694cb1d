//! Facet / plane intersection.
//!
//! A triangle is classified against one horizontal plane. The result is an
//! oriented segment whose end points remember where they came from: either a
//! mesh vertex (`a_id` / `b_id`) or a crossing of a mesh edge (`edge_a_id` /
//! `edge_b_id`). Those references are what the chainer stitches on.
//!
//! Vertices handed in here are already transformed, with X and Y in scaled
//! units and Z left in mm, the same unit as the plane height.

use crate::geometry::{Point, Point3F};
use crate::Coord;
use serde::{Deserialize, Serialize};

/// Which geometric case produced a segment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FacetEdgeType {
    /// The plane crosses the facet through two different edges.
    #[default]
    General,
    /// Two vertices lie on the plane, the third one below.
    Top,
    /// Two vertices lie on the plane, the third one above.
    Bottom,
    /// All three vertices lie on the plane.
    Horizontal,
    /// A mesh boundary edge lying exactly on a plane, owned by one slab.
    TopBottom,
    /// Part of a mesh boundary edge running between two planes.
    Slab,
}

/// Outcome of classifying one facet against one plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FacetSliceType {
    /// No segment, the facet does not cross the plane.
    NoSlice,
    /// The segment bounds the cross-section at this plane.
    Slicing,
    /// The segment only matters when cutting the mesh in two.
    Cutting,
}

/// Oriented segment on a slicing plane.
///
/// For every end point exactly one of the vertex id and the edge id is set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntersectionLine {
    pub a: Point,
    pub b: Point,
    /// Mesh vertex of `a`, if `a` is a vertex.
    pub a_id: Option<u32>,
    /// Mesh vertex of `b`, if `b` is a vertex.
    pub b_id: Option<u32>,
    /// Mesh edge crossed at `a`.
    pub edge_a_id: Option<u32>,
    /// Mesh edge crossed at `b`.
    pub edge_b_id: Option<u32>,
    pub edge_type: FacetEdgeType,
    pub flags: u32,
}

impl IntersectionLine {
    /// Triangle edge added, because it has no neighbor.
    pub const EDGE0_NO_NEIGHBOR: u32 = 0x001;
    pub const EDGE1_NO_NEIGHBOR: u32 = 0x002;
    pub const EDGE2_NO_NEIGHBOR: u32 = 0x004;
    /// Triangle edge added, because it folds over another horizontal edge.
    pub const EDGE0_FOLD: u32 = 0x010;
    pub const EDGE1_FOLD: u32 = 0x020;
    pub const EDGE2_FOLD: u32 = 0x040;
    /// Never start a loop from this segment.
    pub const NO_SEED: u32 = 0x100;
    /// Already consumed by a loop or polyline.
    pub const SKIP: u32 = 0x200;

    /// A segment between two mesh vertices.
    pub fn from_vertices(a: Point, a_id: u32, b: Point, b_id: u32, edge_type: FacetEdgeType) -> Self {
        Self {
            a,
            b,
            a_id: Some(a_id),
            b_id: Some(b_id),
            edge_type,
            ..Default::default()
        }
    }

    /// A segment between two edge crossings.
    pub fn from_edges(a: Point, edge_a: u32, b: Point, edge_b: u32, edge_type: FacetEdgeType) -> Self {
        Self {
            a,
            b,
            edge_a_id: Some(edge_a),
            edge_b_id: Some(edge_b),
            edge_type,
            ..Default::default()
        }
    }

    #[inline]
    pub fn skip(&self) -> bool {
        (self.flags & Self::SKIP) != 0
    }

    #[inline]
    pub fn set_skip(&mut self) {
        self.flags |= Self::SKIP;
    }

    #[inline]
    pub fn is_seed_candidate(&self) -> bool {
        (self.flags & (Self::NO_SEED | Self::SKIP)) == 0
    }

    pub fn set_no_seed(&mut self, set: bool) {
        if set {
            self.flags |= Self::NO_SEED;
        } else {
            self.flags &= !Self::NO_SEED;
        }
    }

    pub fn reverse(&mut self) {
        std::mem::swap(&mut self.a, &mut self.b);
        std::mem::swap(&mut self.a_id, &mut self.b_id);
        std::mem::swap(&mut self.edge_a_id, &mut self.edge_b_id);
    }

    pub fn reversed(mut self) -> Self {
        self.reverse();
        self
    }

    /// Shift the edge references, used to keep edge ids of different
    /// planes apart when their segments are chained together.
    pub fn offset_edge_ids(&mut self, offset: u32) {
        self.edge_a_id = self.edge_a_id.map(|e| e + offset);
        self.edge_b_id = self.edge_b_id.map(|e| e + offset);
    }

    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.a == self.b
    }
}

/// Point on the plane plus its origin.
#[derive(Clone, Copy, Debug, Default)]
struct IntersectionPoint {
    point: Point,
    point_id: Option<u32>,
    edge_id: Option<u32>,
}

/// Planar position of a placed vertex.
#[inline]
pub(crate) fn xy(v: &Point3F) -> Point {
    Point::new(v.x as Coord, v.y as Coord)
}

/// Index of the vertex with the lowest Z, the first one wins ties.
#[inline]
pub fn lowest_vertex(vertices: &[Point3F; 3], min_z: f64) -> usize {
    if vertices[1].z == min_z {
        1
    } else if vertices[2].z == min_z {
        2
    } else {
        0
    }
}

/// Z extent of a triangle.
#[inline]
pub fn z_range(vertices: &[Point3F; 3]) -> (f64, f64) {
    let min_z = vertices[0].z.min(vertices[1].z).min(vertices[2].z);
    let max_z = vertices[0].z.max(vertices[1].z).max(vertices[2].z);
    (min_z, max_z)
}

/// Crossing of the segment `a`-`b` with the plane, rounded to the grid.
///
/// `t` runs from `b` (0) to `a` (1).
#[inline]
pub(crate) fn interpolate(a: &Point3F, b: &Point3F, slice_z: f64) -> (f64, Point) {
    let t = (slice_z - b.z) / (a.z - b.z);
    let x = (b.x + (a.x - b.x) * t + 0.5).floor() as Coord;
    let y = (b.y + (a.y - b.y) * t + 0.5).floor() as Coord;
    (t, Point::new(x, y))
}

/// Record a vertex on the plane unless it was the last one recorded.
fn push_vertex(
    points: &mut [IntersectionPoint; 3],
    num_points: &mut usize,
    point_on_layer: &mut Option<usize>,
    p: &Point3F,
    id: u32,
) {
    if point_on_layer.map_or(true, |i| points[i].point_id != Some(id)) && *num_points < 3 {
        *point_on_layer = Some(*num_points);
        points[*num_points] = IntersectionPoint {
            point: xy(p),
            point_id: Some(id),
            edge_id: None,
        };
        *num_points += 1;
    }
}

/// Slice one facet with the plane at `slice_z`.
///
/// Edges are walked starting from `idx_vertex_lowest`, which makes the
/// segment orientation independent of the vertex order: the solid lies to the
/// left of `a -> b` for an outward oriented facet. `edge_ids[k]` is the id of
/// the edge from corner `k` to corner `k + 1`. `horizontal` tells that the
/// whole facet lies in one plane.
pub fn slice_facet(
    slice_z: f64,
    vertices: &[Point3F; 3],
    indices: &[u32; 3],
    edge_ids: &[Option<u32>; 3],
    idx_vertex_lowest: usize,
    horizontal: bool,
) -> (FacetSliceType, Option<IntersectionLine>) {
    let mut points = [IntersectionPoint::default(); 3];
    let mut num_points = 0usize;
    let mut point_on_layer: Option<usize> = None;

    for j in 0..3 {
        let k = (idx_vertex_lowest + j) % 3;
        let l = (k + 1) % 3;
        let edge_id = edge_ids[k];
        let (mut a, mut b) = (&vertices[k], &vertices[l]);
        let (mut a_id, mut b_id) = (indices[k], indices[l]);

        // Edge lies in the plane.
        if a.z == slice_z && b.z == slice_z {
            let (v0, v1, v2) = (&vertices[0], &vertices[1], &vertices[2]);
            let (edge_type, result) = if horizontal {
                let normal = (v1.x - v0.x) * (v2.y - v1.y) - (v1.y - v0.y) * (v2.x - v1.x);
                if normal < 0.0 {
                    // Facing down.
                    std::mem::swap(&mut a, &mut b);
                    std::mem::swap(&mut a_id, &mut b_id);
                }
                (FacetEdgeType::Horizontal, FacetSliceType::Cutting)
            } else if v0.z < slice_z || v1.z < slice_z || v2.z < slice_z {
                // The upper edge of a facet belongs to its slice, the lower
                // one only to a cut.
                std::mem::swap(&mut a, &mut b);
                std::mem::swap(&mut a_id, &mut b_id);
                (FacetEdgeType::Top, FacetSliceType::Slicing)
            } else {
                (FacetEdgeType::Bottom, FacetSliceType::Cutting)
            };
            let line = IntersectionLine::from_vertices(xy(a), a_id, xy(b), b_id, edge_type);
            debug_assert!(!line.is_degenerate() || a_id == b_id);
            return (result, Some(line));
        }

        if a.z == slice_z {
            push_vertex(&mut points, &mut num_points, &mut point_on_layer, a, a_id);
        } else if b.z == slice_z {
            push_vertex(&mut points, &mut num_points, &mut point_on_layer, b, b_id);
        } else if (a.z < slice_z && b.z > slice_z) || (b.z < slice_z && a.z > slice_z) {
            // Order the edge by vertex id so both facets sharing it get the
            // same crossing point.
            if a_id > b_id {
                std::mem::swap(&mut a, &mut b);
                std::mem::swap(&mut a_id, &mut b_id);
            }
            let (t, crossing) = interpolate(a, b, slice_z);
            if t <= 0.0 {
                push_vertex(&mut points, &mut num_points, &mut point_on_layer, b, b_id);
            } else if t >= 1.0 {
                push_vertex(&mut points, &mut num_points, &mut point_on_layer, a, a_id);
            } else if num_points < 3 {
                points[num_points] = IntersectionPoint {
                    point: crossing,
                    point_id: None,
                    edge_id,
                };
                num_points += 1;
            }
        }
    }

    debug_assert!(num_points < 3, "facet crosses a plane more than twice");
    if num_points == 2 {
        let line = IntersectionLine {
            a: points[1].point,
            b: points[0].point,
            a_id: points[1].point_id,
            b_id: points[0].point_id,
            edge_a_id: points[1].edge_id,
            edge_b_id: points[0].edge_id,
            edge_type: FacetEdgeType::General,
            flags: 0,
        };
        return (FacetSliceType::Slicing, Some(line));
    }
    (FacetSliceType::NoSlice, None)
}

//! Polygon boolean operations and offsetting.
//!
//! Thin layer over geo-clipper. Rings are handed over in scaled integer units
//! with a clipper factor of 1.0, so vertices that survive a boolean operation
//! come back bit-exact.
//!
//! Used for:
//! - resolving sliced loops into contours with holes
//! - closing and extra offsets of sliced regions
//! - merging slab projections

use crate::geometry::{ExPolygon, ExPolygons, Point, Polygon};
use crate::{scale, CoordF};
use geo::{Coord as GeoCoord, LineString, MultiPolygon, Polygon as GeoPolygon};
use geo_clipper::{Clipper, EndType, JoinType};

/// Scaled clipper units are already integral.
const CLIPPER_FACTOR: f64 = 1.0;

/// Join type for offset corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetJoinType {
    /// Square corners
    Square,
    /// Round corners
    Round,
    /// Mitered corners, limited to three times the offset distance
    #[default]
    Miter,
}

impl From<OffsetJoinType> for JoinType {
    fn from(jt: OffsetJoinType) -> Self {
        match jt {
            OffsetJoinType::Square => JoinType::Square,
            // Arc tolerance in scaled units (5 um).
            OffsetJoinType::Round => JoinType::Round(scale(0.005) as f64),
            OffsetJoinType::Miter => JoinType::Miter(3.0),
        }
    }
}

fn ring_to_geo(points: &[Point]) -> LineString<f64> {
    LineString::new(
        points
            .iter()
            .map(|p| GeoCoord {
                x: p.x as f64,
                y: p.y as f64,
            })
            .collect(),
    )
}

fn ring_from_geo(ring: &LineString<f64>) -> Polygon {
    let mut polygon: Polygon = ring
        .coords()
        .map(|c| Point::new(c.x.round() as i64, c.y.round() as i64))
        .collect();
    // geo closes rings explicitly, our polygons are implicitly closed.
    polygon.remove_duplicate_points();
    polygon
}

/// A single loop kept in its own orientation, so nonzero filling sees
/// clockwise loops as negative winding.
fn loop_to_geo(polygon: &Polygon) -> GeoPolygon<f64> {
    GeoPolygon::new(ring_to_geo(polygon.points()), vec![])
}

/// Exterior counter-clockwise, holes clockwise.
fn expolygon_to_geo(expoly: &ExPolygon) -> GeoPolygon<f64> {
    let mut canonical = expoly.clone();
    canonical.make_canonical();
    GeoPolygon::new(
        ring_to_geo(canonical.contour.points()),
        canonical
            .holes
            .iter()
            .map(|h| ring_to_geo(h.points()))
            .collect(),
    )
}

fn expolygons_to_geo_multi(expolys: &[ExPolygon]) -> MultiPolygon<f64> {
    MultiPolygon::new(expolys.iter().map(expolygon_to_geo).collect())
}

fn geo_multi_to_expolygons(multi: &MultiPolygon<f64>) -> ExPolygons {
    multi
        .0
        .iter()
        .filter_map(|geo_poly| {
            let contour = ring_from_geo(geo_poly.exterior());
            if contour.len() < 3 {
                return None;
            }
            let holes = geo_poly
                .interiors()
                .iter()
                .map(ring_from_geo)
                .filter(|h| h.len() >= 3)
                .collect();
            let mut expoly = ExPolygon::with_holes(contour, holes);
            expoly.make_canonical();
            Some(expoly)
        })
        .collect()
}

fn empty() -> MultiPolygon<f64> {
    MultiPolygon::new(vec![])
}

// ============================================================================
// Boolean Operations
// ============================================================================

/// Nonzero union of loops, each taken with its own winding.
///
/// A clockwise loop nested in a counter-clockwise one cancels its winding
/// and becomes a hole.
pub fn union_polygons(loops: &[Polygon]) -> ExPolygons {
    if loops.is_empty() {
        return vec![];
    }
    let subject = MultiPolygon::new(loops.iter().map(loop_to_geo).collect());
    geo_multi_to_expolygons(&subject.union(&empty(), CLIPPER_FACTOR))
}

/// Even-odd fill of loops: a region is inside when an odd number of loops
/// encloses it, regardless of winding.
pub fn union_polygons_even_odd(loops: &[Polygon]) -> ExPolygons {
    loops
        .iter()
        .filter(|l| l.len() >= 3)
        .fold(Vec::new(), |acc, l| {
            let mut ccw = l.clone();
            ccw.make_counter_clockwise();
            xor(&acc, &[ExPolygon::new(ccw)])
        })
}

/// Compute the XOR of two sets of polygons.
pub fn xor(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() {
        return clip.to_vec();
    }
    if clip.is_empty() {
        return subject.to_vec();
    }
    let result = expolygons_to_geo_multi(subject)
        .xor(&expolygons_to_geo_multi(clip), CLIPPER_FACTOR);
    geo_multi_to_expolygons(&result)
}

// ============================================================================
// Offset Operations
// ============================================================================

/// Offset ExPolygons by `delta` mm (positive grows, negative shrinks).
pub fn offset_ex(expolys: &[ExPolygon], delta: CoordF, join_type: OffsetJoinType) -> ExPolygons {
    if expolys.is_empty() {
        return vec![];
    }
    if delta == 0.0 {
        return expolys.to_vec();
    }
    let result = expolygons_to_geo_multi(expolys).offset(
        scale(delta) as f64,
        join_type.into(),
        EndType::ClosedPolygon,
        CLIPPER_FACTOR,
    );
    geo_multi_to_expolygons(&result)
}

/// Two consecutive offsets; `offset2_ex(x, r, -r)` closes gaps narrower
/// than `2r` (morphological closing).
pub fn offset2_ex(
    expolys: &[ExPolygon],
    delta1: CoordF,
    delta2: CoordF,
    join_type: OffsetJoinType,
) -> ExPolygons {
    offset_ex(&offset_ex(expolys, delta1, join_type), delta2, join_type)
}

/// Compute the total area of a set of polygons (scaled units squared).
pub fn total_area(expolys: &[ExPolygon]) -> CoordF {
    expolys.iter().map(|p| p.area()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SCALING_FACTOR;

    const MM2: f64 = SCALING_FACTOR * SCALING_FACTOR;

    fn square_mm(x: f64, y: f64, size: f64) -> Polygon {
        Polygon::rectangle(Point::new_scale(x, y), Point::new_scale(x + size, y + size))
    }

    #[test]
    fn test_union_polygons_turns_cw_loop_into_hole() {
        let outer = square_mm(0.0, 0.0, 10.0);
        let inner = square_mm(3.0, 3.0, 4.0).reversed();
        let result = union_polygons(&[outer, inner]);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].holes.len(), 1, "clockwise loop should become a hole");
        assert!((total_area(&result) / MM2 - 84.0).abs() < 1e-9);
        assert!(result[0].contour.is_counter_clockwise());
        assert!(result[0].holes[0].is_clockwise());
    }

    #[test]
    fn test_union_polygons_nested_ccw_loops_merge() {
        let outer = square_mm(0.0, 0.0, 10.0);
        let inner = square_mm(3.0, 3.0, 4.0);
        let result = union_polygons(&[outer, inner]);
        assert_eq!(result.len(), 1);
        assert!(result[0].holes.is_empty());
        assert!((total_area(&result) / MM2 - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_even_odd_ignores_winding() {
        let outer = square_mm(0.0, 0.0, 10.0);
        let inner = square_mm(3.0, 3.0, 4.0);
        let result = union_polygons_even_odd(&[outer, inner]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].holes.len(), 1);
        assert!((total_area(&result) / MM2 - 84.0).abs() < 1e-9);
    }

    #[test]
    fn test_union_is_exact() {
        let result = union_polygons(&[square_mm(0.0, 0.0, 10.0), square_mm(5.0, 0.0, 10.0)]);
        assert_eq!(result.len(), 1);
        assert!((total_area(&result) / MM2 - 150.0).abs() < 1e-9);
        assert!(result[0]
            .contour
            .iter()
            .all(|p| p.x % 1_000_000 == 0 && p.y % 1_000_000 == 0));
    }

    #[test]
    fn test_offset_miter_grows_square() {
        let square = ExPolygon::new(square_mm(0.0, 0.0, 10.0));
        let grown = offset_ex(&[square], 1.0, OffsetJoinType::Miter);
        assert!((total_area(&grown) / MM2 - 144.0).abs() < 1e-3);
    }

    #[test]
    fn test_offset2_closes_narrow_gap() {
        // Two squares 0.2 mm apart merge under a 0.5 mm closing.
        let a = ExPolygon::new(square_mm(0.0, 0.0, 10.0));
        let b = ExPolygon::new(square_mm(10.2, 0.0, 10.0));
        let closed = offset2_ex(&[a, b], 0.5, -0.5, OffsetJoinType::Miter);
        assert_eq!(closed.len(), 1, "gap should be bridged");
    }

    #[test]
    fn test_offset_shrink_to_nothing() {
        let square = ExPolygon::new(square_mm(0.0, 0.0, 2.0));
        let shrunk = offset_ex(&[square], -2.0, OffsetJoinType::Square);
        assert!(shrunk.is_empty());
    }
}

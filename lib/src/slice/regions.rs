//! Region classification: closed loops of one plane into contours with holes.

use super::slicing_params::{MeshSlicingParamsEx, SlicingMode};
use crate::clipper::{offset2_ex, offset_ex, union_polygons, union_polygons_even_odd, OffsetJoinType};
use crate::geometry::{ExPolygon, ExPolygons, Polygon, Polygons};
use crate::{scale, CoordF};
use log::trace;

/// Orient the loops of one layer for `mode`.
///
/// `Positive` turns every loop counter-clockwise, so holes become solid.
/// `PositiveLargestContour` keeps only the loop with the largest area.
pub fn apply_mode(loops: &mut Polygons, mode: SlicingMode) {
    match mode {
        SlicingMode::Regular | SlicingMode::EvenOdd => {}
        SlicingMode::Positive => {
            for l in loops.iter_mut() {
                l.make_counter_clockwise();
            }
        }
        SlicingMode::PositiveLargestContour => {
            let largest = loops
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.area().total_cmp(&b.area()))
                .map(|(i, _)| i);
            if let Some(i) = largest {
                let mut contour = loops.swap_remove(i);
                contour.make_counter_clockwise();
                loops.clear();
                loops.push(contour);
            }
        }
    }
}

/// Union the loops with the fill rule of `mode`, then apply the closing
/// radius and the extra offset (both in mm).
///
/// The closing grows by `closing_radius` and shrinks back by the part of it
/// not covered by `extra_offset`. An extra offset larger than the closing
/// radius is applied as a single grow.
pub fn make_expolygons(
    loops: &[Polygon],
    mode: SlicingMode,
    closing_radius: CoordF,
    extra_offset: CoordF,
) -> ExPolygons {
    let (offset_out, offset_in) = if closing_radius >= extra_offset {
        (closing_radius, extra_offset - closing_radius)
    } else {
        (extra_offset, 0.0)
    };

    let union = match mode {
        SlicingMode::EvenOdd => union_polygons_even_odd(loops),
        _ => union_polygons(loops),
    };

    let join = OffsetJoinType::Miter;
    match (offset_out != 0.0, offset_in != 0.0) {
        (true, true) => offset2_ex(&union, offset_out, offset_in, join),
        (true, false) => offset_ex(&union, offset_out, join),
        (false, true) => offset_ex(&union, offset_in, join),
        (false, false) => union,
    }
}

/// Keep only the region with the largest contour.
pub fn keep_largest_contour(expolygons: &mut ExPolygons) {
    let largest = expolygons
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.contour.area().total_cmp(&b.contour.area()))
        .map(|(i, _)| i);
    if let Some(i) = largest {
        let kept = expolygons.swap_remove(i);
        expolygons.clear();
        expolygons.push(kept);
    }
}

/// Regions of one layer: fill rule union, closing and offset, largest
/// contour filter, simplification.
pub(crate) fn make_regions(loops: &[Polygon], params: &MeshSlicingParamsEx, mode: SlicingMode) -> ExPolygons {
    let mut expolygons = make_expolygons(loops, mode, params.closing_radius, params.extra_offset);
    if mode == SlicingMode::PositiveLargestContour {
        keep_largest_contour(&mut expolygons);
    }
    if params.resolution > 0.0 {
        let tolerance = scale(params.resolution) as CoordF;
        expolygons = expolygons
            .iter()
            .filter_map(|e| e.simplified(tolerance))
            .collect();
    }
    expolygons
}

/// Regions without any boolean operation.
///
/// Counter-clockwise loops become contours. Every clockwise loop becomes a
/// hole of the smallest contour containing its first point, or is dropped
/// if no contour contains it.
pub fn make_expolygons_simple(loops: &[Polygon]) -> ExPolygons {
    let mut expolygons: ExPolygons = Vec::new();
    let mut holes: Vec<&Polygon> = Vec::new();
    for l in loops {
        if l.signed_area_2x() >= 0 {
            expolygons.push(ExPolygon::new(l.clone()));
        } else {
            holes.push(l);
        }
    }

    let areas: Vec<CoordF> = expolygons.iter().map(|e| e.contour.area()).collect();
    let mut dropped = 0usize;
    for hole in holes {
        let Some(first) = hole.points().first() else {
            continue;
        };
        let owner = expolygons
            .iter()
            .enumerate()
            .filter(|(_, e)| e.contour.contains_point(first))
            .min_by(|(a, _), (b, _)| areas[*a].total_cmp(&areas[*b]))
            .map(|(i, _)| i);
        match owner {
            Some(i) => expolygons[i].holes.push(hole.clone()),
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        trace!("make_expolygons_simple: dropped {} holes outside any contour", dropped);
    }
    expolygons
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipper::total_area;
    use crate::geometry::Point;
    use crate::SCALING_FACTOR;

    const MM2: f64 = SCALING_FACTOR * SCALING_FACTOR;

    fn square_mm(x: f64, y: f64, size: f64) -> Polygon {
        Polygon::rectangle(Point::new_scale(x, y), Point::new_scale(x + size, y + size))
    }

    #[test]
    fn test_positive_mode_fills_holes() {
        let mut loops = vec![square_mm(0.0, 0.0, 10.0), square_mm(3.0, 3.0, 4.0).reversed()];
        apply_mode(&mut loops, SlicingMode::Positive);
        assert!(loops.iter().all(|l| l.is_counter_clockwise()));

        let regions = make_expolygons(&loops, SlicingMode::Positive, 0.0, 0.0);
        assert_eq!(regions.len(), 1);
        assert!(regions[0].holes.is_empty());
        assert!((total_area(&regions) / MM2 - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_largest_contour_mode() {
        let mut loops = vec![
            square_mm(0.0, 0.0, 2.0),
            square_mm(10.0, 0.0, 5.0).reversed(),
            square_mm(20.0, 0.0, 3.0),
        ];
        apply_mode(&mut loops, SlicingMode::PositiveLargestContour);
        assert_eq!(loops.len(), 1);
        assert!(loops[0].is_counter_clockwise());
        assert!((loops[0].area() / MM2 - 25.0).abs() < 1e-6);
    }

    #[test]
    fn test_regular_mode_subtracts_holes() {
        let loops = vec![square_mm(0.0, 0.0, 10.0), square_mm(3.0, 3.0, 4.0).reversed()];
        let regions = make_expolygons(&loops, SlicingMode::Regular, 0.0, 0.0);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].holes.len(), 1);
        assert!((total_area(&regions) / MM2 - 84.0).abs() < 1e-6);
    }

    #[test]
    fn test_even_odd_overlap() {
        let loops = vec![square_mm(0.0, 0.0, 10.0), square_mm(5.0, 5.0, 10.0)];
        let nonzero = make_expolygons(&loops, SlicingMode::Regular, 0.0, 0.0);
        let even_odd = make_expolygons(&loops, SlicingMode::EvenOdd, 0.0, 0.0);
        assert!((total_area(&nonzero) / MM2 - 175.0).abs() < 1e-6);
        assert!((total_area(&even_odd) / MM2 - 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_closing_bridges_narrow_slit() {
        let loops = vec![square_mm(0.0, 0.0, 10.0), square_mm(10.02, 0.0, 10.0)];
        assert_eq!(make_expolygons(&loops, SlicingMode::Regular, 0.0, 0.0).len(), 2);

        let closed = make_expolygons(&loops, SlicingMode::Regular, 0.05, 0.0);
        assert_eq!(closed.len(), 1);
        let area = total_area(&closed) / MM2;
        assert!(area > 200.0 && area < 200.5, "area {}", area);
    }

    #[test]
    fn test_extra_offset_grows_and_shrinks() {
        let loops = vec![square_mm(0.0, 0.0, 10.0)];
        let grown = make_expolygons(&loops, SlicingMode::Regular, 0.0, 0.5);
        assert!((total_area(&grown) / MM2 - 121.0).abs() < 1e-3);
        let shrunk = make_expolygons(&loops, SlicingMode::Regular, 0.0, -0.5);
        assert!((total_area(&shrunk) / MM2 - 81.0).abs() < 1e-3);
    }

    #[test]
    fn test_keep_largest_contour() {
        let mut regions: ExPolygons = vec![
            ExPolygon::new(square_mm(0.0, 0.0, 2.0)),
            ExPolygon::new(square_mm(10.0, 0.0, 6.0)),
            ExPolygon::new(square_mm(20.0, 0.0, 4.0)),
        ];
        keep_largest_contour(&mut regions);
        assert_eq!(regions.len(), 1);
        assert!((regions[0].area() / MM2 - 36.0).abs() < 1e-6);
    }

    #[test]
    fn test_simple_assigns_hole_to_smallest_container() {
        let loops = vec![
            square_mm(0.0, 0.0, 20.0),
            square_mm(5.0, 5.0, 10.0),
            square_mm(7.0, 7.0, 2.0).reversed(),
            // Outside every contour.
            square_mm(50.0, 50.0, 1.0).reversed(),
        ];
        let regions = make_expolygons_simple(&loops);
        assert_eq!(regions.len(), 2);
        assert!(regions[0].holes.is_empty());
        assert_eq!(regions[1].holes.len(), 1);
        assert!((regions[1].area() / MM2 - 96.0).abs() < 1e-6);
    }
}

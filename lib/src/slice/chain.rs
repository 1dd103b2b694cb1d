//! Segment chaining: turning the unordered segments of one plane into loops.
//!
//! Three passes, each working on what the previous one left over:
//! 1. follow mesh connectivity, a segment ending on edge `e` continues with
//!    the segment starting on `e`
//! 2. join the open polylines whose free ends carry the same vertex or edge
//!    reference, first keeping their direction, then allowing reversal
//! 3. bridge the remaining gaps by proximity, see [`GapClosingParams`]
//!
//! Whatever is still open after that is dropped.

use super::intersection::IntersectionLine;
use super::slicing_params::GapClosingParams;
use crate::geometry::closest_point::ClosestPointInRadius;
use crate::geometry::{Point, Polygon, Polygons};
use crate::scale;
use log::trace;

/// Where a free end of an open polyline sits on the mesh.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct IntersectionReference {
    pub point_id: Option<u32>,
    pub edge_id: Option<u32>,
}

/// Lookup key of a reference, vertices and edges never collide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum RefKey {
    Vertex(u32),
    Edge(u32),
}

impl IntersectionReference {
    fn new(point_id: Option<u32>, edge_id: Option<u32>) -> Self {
        Self { point_id, edge_id }
    }

    #[inline]
    fn key(&self) -> Option<RefKey> {
        match (self.point_id, self.edge_id) {
            (Some(p), _) => Some(RefKey::Vertex(p)),
            (None, Some(e)) => Some(RefKey::Edge(e)),
            (None, None) => None,
        }
    }

    /// Same vertex or same edge.
    #[inline]
    fn meets(&self, other: &IntersectionReference) -> bool {
        (self.edge_id.is_some() && self.edge_id == other.edge_id)
            || (self.point_id.is_some() && self.point_id == other.point_id)
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct OpenPolyline {
    pub start: IntersectionReference,
    pub end: IntersectionReference,
    pub points: Vec<Point>,
    /// Length in scaled units.
    pub length: f64,
    pub consumed: bool,
}

impl OpenPolyline {
    fn new(start: IntersectionReference, end: IntersectionReference, points: Vec<Point>) -> Self {
        let length = polyline_length(&points);
        Self {
            start,
            end,
            points,
            length,
            consumed: false,
        }
    }

    #[inline]
    fn is_closed(&self) -> bool {
        self.start.meets(&self.end)
    }
}

fn polyline_length(points: &[Point]) -> f64 {
    points.windows(2).map(|w| w[0].distance(&w[1])).sum()
}

/// Loop from a finished chain, orientation fixed CCW if requested.
fn finish_loop(points: Vec<Point>, orient_ccw: bool, loops: &mut Polygons) {
    if points.len() < 3 {
        return;
    }
    let mut polygon = Polygon::from_points(points);
    if orient_ccw && polygon.signed_area_2x() < 0 {
        polygon.reverse();
    }
    loops.push(polygon);
}

/// Pass 1: greedy chaining along shared edge and vertex references.
pub(crate) fn chain_lines_by_triangle_connectivity(
    lines: &mut [IntersectionLine],
    loops: &mut Polygons,
    open_polylines: &mut Vec<OpenPolyline>,
) {
    // Sorted lookups of the segment starts.
    let mut by_edge_a_id: Vec<(u32, usize)> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| !l.skip())
        .filter_map(|(i, l)| l.edge_a_id.map(|e| (e, i)))
        .collect();
    let mut by_a_id: Vec<(u32, usize)> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| !l.skip())
        .filter_map(|(i, l)| l.a_id.map(|a| (a, i)))
        .collect();
    by_edge_a_id.sort_unstable();
    by_a_id.sort_unstable();

    let find = |index: &[(u32, usize)], key: u32, lines: &[IntersectionLine]| -> Option<usize> {
        let first = index.partition_point(|&(k, _)| k < key);
        index[first..]
            .iter()
            .take_while(|&&(k, _)| k == key)
            .map(|&(_, i)| i)
            .find(|&i| !lines[i].skip())
    };

    let mut seed = 0usize;
    loop {
        // Take the first spare line and start a new loop.
        while seed < lines.len() && !lines[seed].is_seed_candidate() {
            seed += 1;
        }
        if seed == lines.len() {
            break;
        }
        let first = seed;
        seed += 1;
        lines[first].set_skip();

        let mut points = vec![lines[first].a];
        let mut last = first;
        loop {
            let next = {
                let view: &[IntersectionLine] = lines;
                let last_line = &view[last];
                last_line
                    .edge_b_id
                    .and_then(|e| find(&by_edge_a_id, e, view))
                    .or_else(|| last_line.b_id.and_then(|b| find(&by_a_id, b, view)))
            };
            match next {
                Some(next) => {
                    points.push(lines[next].a);
                    lines[next].set_skip();
                    last = next;
                }
                None => {
                    let (first_line, last_line) = (&lines[first], &lines[last]);
                    let closed = (first_line.edge_a_id.is_some()
                        && first_line.edge_a_id == last_line.edge_b_id)
                        || (first_line.a_id.is_some() && first_line.a_id == last_line.b_id);
                    if closed {
                        finish_loop(points, false, loops);
                    } else {
                        points.push(last_line.b);
                        open_polylines.push(OpenPolyline::new(
                            IntersectionReference::new(first_line.a_id, first_line.edge_a_id),
                            IntersectionReference::new(last_line.b_id, last_line.edge_b_id),
                            points,
                        ));
                    }
                    break;
                }
            }
        }
    }
}

/// Unconsumed polylines, longest first.
pub(crate) fn open_polylines_sorted(open_polylines: &mut [OpenPolyline], update_lengths: bool) -> Vec<usize> {
    let mut out: Vec<usize> = Vec::with_capacity(open_polylines.len());
    for (i, opl) in open_polylines.iter_mut().enumerate() {
        if !opl.consumed {
            if update_lengths {
                opl.length = polyline_length(&opl.points);
            }
            out.push(i);
        }
    }
    out.sort_by(|&a, &b| open_polylines[b].length.total_cmp(&open_polylines[a].length));
    out
}

/// One free end of an open polyline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PolylineEnd {
    polyline: usize,
    start: bool,
}

impl PolylineEnd {
    #[inline]
    fn reference<'a>(&self, open: &'a [OpenPolyline]) -> &'a IntersectionReference {
        let opl = &open[self.polyline];
        if self.start {
            &opl.start
        } else {
            &opl.end
        }
    }

    #[inline]
    fn key(&self, open: &[OpenPolyline]) -> Option<RefKey> {
        self.reference(open).key()
    }

    #[inline]
    fn point(&self, open: &[OpenPolyline]) -> Option<Point> {
        let points = &open[self.polyline].points;
        if self.start {
            points.first().copied()
        } else {
            points.last().copied()
        }
    }
}

/// Append `next` to `points`, walking it backwards if it attaches with its
/// end. The first point of `next` is dropped, or with `skip_duplicate_only`
/// only when it repeats the last point.
fn append_polyline(points: &mut Vec<Point>, next: &[Point], forward: bool, skip_duplicate_only: bool) {
    let tail: Vec<Point> = if forward {
        next.to_vec()
    } else {
        next.iter().rev().copied().collect()
    };
    let skip = !skip_duplicate_only || tail.first() == points.last();
    points.extend(tail.into_iter().skip(usize::from(skip)));
}

/// First entry of the sorted lookup with the given key.
fn lower_bound(by_id: &[PolylineEnd], open: &[OpenPolyline], key: RefKey) -> usize {
    by_id.partition_point(|e| e.key(open) < Some(key))
}

/// Position of a particular polyline end in the sorted lookup.
fn find_end(by_id: &[PolylineEnd], open: &[OpenPolyline], end: PolylineEnd) -> Option<usize> {
    let key = end.key(open)?;
    (lower_bound(by_id, open, key)..by_id.len())
        .take_while(|&i| by_id[i].key(open) == Some(key))
        .find(|&i| by_id[i] == end)
}

/// An end of a not yet consumed polyline carrying `key`.
fn find_unconsumed(by_id: &[PolylineEnd], open: &[OpenPolyline], key: RefKey) -> Option<PolylineEnd> {
    by_id[lower_bound(by_id, open, key)..]
        .iter()
        .take_while(|e| e.key(open) == Some(key))
        .find(|e| !open[e.polyline].consumed)
        .copied()
}

/// Pass 2: join polylines whose ends reference the same vertex or edge.
pub(crate) fn chain_open_polylines_exact(
    open_polylines: &mut [OpenPolyline],
    loops: &mut Polygons,
    try_connect_reversed: bool,
) {
    let mut by_id: Vec<PolylineEnd> = Vec::with_capacity(open_polylines.len() * 2);
    for (i, opl) in open_polylines.iter().enumerate() {
        if opl.consumed {
            continue;
        }
        if opl.start.key().is_some() {
            by_id.push(PolylineEnd { polyline: i, start: true });
        }
        if try_connect_reversed && opl.end.key().is_some() {
            by_id.push(PolylineEnd { polyline: i, start: false });
        }
    }
    {
        let open: &[OpenPolyline] = open_polylines;
        by_id.sort_by_key(|e| e.key(open));
    }

    for opl_idx in open_polylines_sorted(open_polylines, false) {
        if open_polylines[opl_idx].consumed {
            continue;
        }
        open_polylines[opl_idx].consumed = true;
        let end = PolylineEnd { polyline: opl_idx, start: false };

        loop {
            // A polyline starting where this one ends.
            let next = end
                .key(open_polylines)
                .and_then(|key| find_unconsumed(&by_id, open_polylines, key));
            let Some(next) = next else {
                open_polylines[opl_idx].consumed = false;
                break;
            };

            let next_points = std::mem::take(&mut open_polylines[next.polyline].points);
            let next_length = std::mem::replace(&mut open_polylines[next.polyline].length, 0.0);
            open_polylines[next.polyline].consumed = true;
            {
                let opl = &mut open_polylines[opl_idx];
                append_polyline(&mut opl.points, &next_points, next.start, false);
                opl.length += next_length;
            }

            let far = PolylineEnd {
                polyline: next.polyline,
                start: !next.start,
            };
            if try_connect_reversed {
                // Keep the lookup sorted: the far end of `next` becomes the end
                // of this polyline, and `next` inherits the old end reference.
                let it_end = find_end(&by_id, open_polylines, end);
                let it_far = find_end(&by_id, open_polylines, far);
                let far_ref = *far.reference(open_polylines);
                let old_end = open_polylines[opl_idx].end;
                open_polylines[opl_idx].end = far_ref;
                if far.start {
                    open_polylines[far.polyline].start = old_end;
                } else {
                    open_polylines[far.polyline].end = old_end;
                }
                if let (Some(i), Some(j)) = (it_end, it_far) {
                    by_id.swap(i, j);
                }
            } else {
                open_polylines[opl_idx].end = *far.reference(open_polylines);
            }

            if open_polylines[opl_idx].is_closed() {
                let mut points = std::mem::take(&mut open_polylines[opl_idx].points);
                // Drop the duplicate closing point.
                points.pop();
                finish_loop(points, try_connect_reversed, loops);
                break;
            }
        }
    }
}

/// Pass 3: bridge gaps shorter than `params.max_gap` by proximity.
pub(crate) fn chain_open_polylines_close_gaps(
    open_polylines: &mut [OpenPolyline],
    loops: &mut Polygons,
    params: &GapClosingParams,
    try_connect_reversed: bool,
) {
    let max_gap_scaled = scale(params.max_gap);
    if max_gap_scaled <= 0 {
        return;
    }
    let max_gap2 = max_gap_scaled as f64 * max_gap_scaled as f64;

    let sorted_by_length = open_polylines_sorted(open_polylines, true);

    let mut lookup: ClosestPointInRadius<PolylineEnd> = ClosestPointInRadius::new(max_gap_scaled);
    for &i in &sorted_by_length {
        let start = PolylineEnd { polyline: i, start: true };
        if let Some(p) = start.point(open_polylines) {
            lookup.insert(p, start);
        }
        if try_connect_reversed {
            let end = PolylineEnd { polyline: i, start: false };
            if let Some(p) = end.point(open_polylines) {
                lookup.insert(p, end);
            }
        }
    }

    for opl_idx in sorted_by_length {
        if open_polylines[opl_idx].consumed || open_polylines[opl_idx].points.is_empty() {
            continue;
        }
        let end = PolylineEnd { polyline: opl_idx, start: false };
        if try_connect_reversed {
            // The end point is about to move.
            if let Some(p) = end.point(open_polylines) {
                lookup.erase(&p, &end);
            }
        }
        open_polylines[opl_idx].consumed = true;
        let mut n_segments_joined = 1usize;

        loop {
            let (front, back) = {
                let points = &open_polylines[opl_idx].points;
                (points[0], points[points.len() - 1])
            };
            let next = lookup.find(&back, |e| !open_polylines[e.polyline].consumed);

            let closing_d2 = back.distance_squared(&front) as f64;
            let mut loop_closed = closing_d2 < max_gap2;
            if let Some((_, next_d2)) = next {
                if loop_closed && closing_d2 < next_d2 as f64 {
                    // Do not let a short dangling tail close on itself.
                    loop_closed = closing_d2.sqrt()
                        < params.closing_ratio * polyline_length(&open_polylines[opl_idx].points);
                }
            }

            if loop_closed {
                lookup.erase(&front, &PolylineEnd { polyline: opl_idx, start: true });
                let mut points = std::mem::take(&mut open_polylines[opl_idx].points);
                if closing_d2 == 0.0 {
                    points.pop();
                }
                finish_loop(points, try_connect_reversed && n_segments_joined > 1, loops);
                break;
            }

            let Some((next, _)) = next else {
                open_polylines[opl_idx].consumed = false;
                if try_connect_reversed {
                    lookup.insert(back, end);
                }
                break;
            };

            let next_points = std::mem::take(&mut open_polylines[next.polyline].points);
            open_polylines[next.polyline].consumed = true;
            append_polyline(&mut open_polylines[opl_idx].points, &next_points, next.start, true);
            n_segments_joined += 1;

            if let Some(p) = next_points.first() {
                lookup.erase(p, &PolylineEnd { polyline: next.polyline, start: true });
            }
            if try_connect_reversed {
                if let Some(p) = next_points.last() {
                    lookup.erase(p, &PolylineEnd { polyline: next.polyline, start: false });
                }
            }
        }
    }
}

/// Chain the segments of one plane into loops.
///
/// Segments get their skip flag set as they are consumed.
pub fn make_loops(lines: &mut [IntersectionLine], gap_closing: &GapClosingParams) -> Polygons {
    let mut loops = Polygons::new();
    let mut open_polylines = Vec::new();
    chain_lines_by_triangle_connectivity(lines, &mut loops, &mut open_polylines);

    if !open_polylines.is_empty() {
        chain_open_polylines_exact(&mut open_polylines, &mut loops, false);
        chain_open_polylines_exact(&mut open_polylines, &mut loops, true);
        chain_open_polylines_close_gaps(&mut open_polylines, &mut loops, gap_closing, false);
        chain_open_polylines_close_gaps(&mut open_polylines, &mut loops, gap_closing, true);

        let dropped = open_polylines
            .iter()
            .filter(|opl| !opl.consumed && !opl.points.is_empty())
            .count();
        if dropped > 0 {
            trace!(
                "make_loops: dropped {} open polylines of {} segments",
                dropped,
                lines.len()
            );
        }
    }
    loops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slice::intersection::FacetEdgeType;

    /// Closed square made of four segments joined by edge ids 0..4.
    fn square_lines(size: i64) -> Vec<IntersectionLine> {
        let p = [
            Point::new(0, 0),
            Point::new(size, 0),
            Point::new(size, size),
            Point::new(0, size),
        ];
        (0..4)
            .map(|i| {
                IntersectionLine::from_edges(
                    p[i],
                    i as u32,
                    p[(i + 1) % 4],
                    ((i + 1) % 4) as u32,
                    FacetEdgeType::General,
                )
            })
            .collect()
    }

    #[test]
    fn test_connectivity_closes_square() {
        let mut lines = square_lines(1000);
        // Chaining must not depend on the segment order.
        lines.swap(0, 2);
        let loops = make_loops(&mut lines, &GapClosingParams::default());
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].len(), 4);
        assert_eq!(loops[0].signed_area_2x(), 2 * 1000 * 1000);
        assert!(lines.iter().all(|l| l.skip()));
    }

    #[test]
    fn test_vertex_refs_close_loop() {
        let p = [Point::new(0, 0), Point::new(10, 0), Point::new(0, 10)];
        let mut lines: Vec<_> = (0..3)
            .map(|i| {
                IntersectionLine::from_vertices(
                    p[i],
                    i as u32,
                    p[(i + 1) % 3],
                    ((i + 1) % 3) as u32,
                    FacetEdgeType::Top,
                )
            })
            .collect();
        let loops = make_loops(&mut lines, &GapClosingParams::default());
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].len(), 3);
    }

    #[test]
    fn test_no_seed_lines_are_not_seeds() {
        let mut lines = square_lines(1000);
        for l in lines.iter_mut() {
            l.set_no_seed(true);
        }
        let loops = make_loops(&mut lines, &GapClosingParams::default());
        assert!(loops.is_empty());
    }

    #[test]
    fn test_exact_stitching_joins_three_pieces() {
        // Three polylines of a square ring, ends joined by shared edge refs.
        let e = |i| IntersectionReference::new(None, Some(i));
        let mut open = vec![
            OpenPolyline::new(e(0), e(1), vec![Point::new(0, 0), Point::new(100, 0)]),
            OpenPolyline::new(e(1), e(2), vec![Point::new(100, 0), Point::new(100, 100)]),
            OpenPolyline::new(
                e(2),
                e(0),
                vec![Point::new(100, 100), Point::new(0, 100), Point::new(0, 0)],
            ),
        ];
        let mut loops = Polygons::new();
        chain_open_polylines_exact(&mut open, &mut loops, false);
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].len(), 4);
        assert_eq!(loops[0].signed_area_2x(), 2 * 100 * 100);
        assert!(open.iter().all(|o| o.consumed));
    }

    #[test]
    fn test_exact_stitching_reversed_piece() {
        let e = |i| IntersectionReference::new(None, Some(i));
        let mut open = vec![
            OpenPolyline::new(
                e(0),
                e(1),
                vec![Point::new(0, 0), Point::new(100, 0), Point::new(100, 100)],
            ),
            // Walks the other half against the ring direction.
            OpenPolyline::new(
                e(0),
                e(1),
                vec![Point::new(0, 0), Point::new(0, 100), Point::new(100, 100)],
            ),
        ];
        let mut loops = Polygons::new();
        chain_open_polylines_exact(&mut open, &mut loops, false);
        assert!(loops.is_empty(), "same direction only");
        chain_open_polylines_exact(&mut open, &mut loops, true);
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].len(), 4);
        assert!(loops[0].signed_area_2x() > 0, "patched loops are CCW");
    }

    #[test]
    fn test_gap_closing_bridges_small_gap() {
        let mm = scale(1.0);
        // A square with a 0.5 mm gap at one corner, no shared references.
        let mut open = vec![OpenPolyline::new(
            IntersectionReference::new(None, Some(0)),
            IntersectionReference::new(None, Some(1)),
            vec![
                Point::new(mm / 2, 0),
                Point::new(10 * mm, 0),
                Point::new(10 * mm, 10 * mm),
                Point::new(0, 10 * mm),
                Point::new(0, 0),
            ],
        )];
        let mut loops = Polygons::new();
        chain_open_polylines_close_gaps(&mut open, &mut loops, &GapClosingParams::default(), false);
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].len(), 5);
    }

    #[test]
    fn test_gap_closing_respects_max_gap() {
        let mm = scale(1.0);
        let mut open = vec![
            OpenPolyline::new(
                IntersectionReference::new(None, Some(0)),
                IntersectionReference::new(None, Some(1)),
                vec![Point::new(0, 0), Point::new(10 * mm, 0)],
            ),
            // 2.5 mm away from the end of the first one.
            OpenPolyline::new(
                IntersectionReference::new(None, Some(2)),
                IntersectionReference::new(None, Some(3)),
                vec![Point::new(12 * mm + mm / 2, 0), Point::new(20 * mm, 5 * mm)],
            ),
        ];
        let mut loops = Polygons::new();
        let params = GapClosingParams::default();
        chain_open_polylines_close_gaps(&mut open, &mut loops, &params, false);
        chain_open_polylines_close_gaps(&mut open, &mut loops, &params, true);
        assert!(loops.is_empty());
        assert_eq!(open[0].points.len(), 2, "nothing was appended");
        assert_eq!(open[1].points.len(), 2);
    }

    #[test]
    fn test_gap_closing_joins_instead_of_closing_short_hook() {
        let mm = scale(1.0);
        let tenth = mm / 10;
        // A 4.5 mm hook whose ends are 1.5 mm apart: too short to close on
        // itself while another end lies within the gap.
        let hook = vec![
            Point::new(0, 0),
            Point::new(0, 15 * tenth),
            Point::new(15 * tenth, 15 * tenth),
            Point::new(15 * tenth, 0),
        ];
        let other = vec![
            Point::new(15 * tenth, -16 * tenth),
            Point::new(0, -16 * tenth),
            Point::new(0, -tenth),
        ];
        let r = |i| IntersectionReference::new(None, Some(i));
        let mut open = vec![
            OpenPolyline::new(r(0), r(1), hook),
            OpenPolyline::new(r(2), r(3), other),
        ];
        let mut loops = Polygons::new();
        chain_open_polylines_close_gaps(&mut open, &mut loops, &GapClosingParams::default(), false);
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].len(), 7);
    }

    #[test]
    fn test_disabled_gap_closing_leaves_polylines_open() {
        let mm = scale(1.0);
        let mut open = vec![OpenPolyline::new(
            IntersectionReference::new(None, Some(0)),
            IntersectionReference::new(None, Some(1)),
            vec![
                Point::new(mm / 2, 0),
                Point::new(10 * mm, 0),
                Point::new(10 * mm, 10 * mm),
                Point::new(0, 10 * mm),
                Point::new(0, 0),
            ],
        )];
        let mut loops = Polygons::new();
        chain_open_polylines_close_gaps(&mut open, &mut loops, &GapClosingParams::disabled(), true);
        assert!(loops.is_empty());
    }

    #[test]
    fn test_open_polylines_sorted_longest_first() {
        let r = IntersectionReference::default();
        let mut open = vec![
            OpenPolyline::new(r, r, vec![Point::new(0, 0), Point::new(10, 0)]),
            OpenPolyline::new(r, r, vec![Point::new(0, 0), Point::new(30, 0)]),
            OpenPolyline::new(r, r, vec![Point::new(0, 0), Point::new(20, 0)]),
        ];
        open[2].consumed = true;
        assert_eq!(open_polylines_sorted(&mut open, false), vec![1, 0]);
    }
}

//! Polygon triangulation utilities.
//!
//! Wrapper around earcutr for filling planar regions with triangles, used to
//! close the cut faces of a split mesh.

use crate::geometry::{ExPolygon, Point};
use crate::geometry::closest_point::ClosestPointInRadius;
use crate::{Coord, Error, Result};
use log::trace;

/// A triangle in the plane, counter-clockwise.
pub type Triangle2 = [Point; 3];

#[inline]
fn orient(a: &Point, b: &Point, c: &Point) -> i128 {
    a.ccw(b, c)
}

/// Triangulate a polygon with holes.
///
/// Every ring vertex ends up as a triangle corner, including collinear ones
/// that earcut skips, so the fill stays conforming with neighboring facets
/// that end on those vertices. Degenerate triangles are dropped and the rest
/// are counter-clockwise.
pub fn triangulate_expolygon(expoly: &ExPolygon) -> Result<Vec<Triangle2>> {
    if expoly.contour.len() < 3 {
        return Ok(Vec::new());
    }

    let rings: Vec<&[Point]> = std::iter::once(expoly.contour.points())
        .chain(expoly.holes.iter().filter(|h| h.len() >= 3).map(|h| h.points()))
        .collect();

    let total_points: usize = rings.iter().map(|r| r.len()).sum();
    let mut points = Vec::with_capacity(total_points);
    let mut vertices = Vec::with_capacity(total_points * 2);
    let mut hole_indices = Vec::with_capacity(rings.len() - 1);
    for (i, ring) in rings.iter().enumerate() {
        if i > 0 {
            hole_indices.push(points.len());
        }
        for p in ring.iter() {
            points.push(*p);
            vertices.push(p.x as f64);
            vertices.push(p.y as f64);
        }
    }

    let indices = earcutr::earcut(&vertices, &hole_indices, 2)
        .map_err(|e| Error::Triangulation(format!("{:?}", e)))?;

    let mut triangles: Vec<Triangle2> = indices
        .chunks_exact(3)
        .filter_map(|t| {
            let (a, b, c) = (points[t[0]], points[t[1]], points[t[2]]);
            match orient(&a, &b, &c) {
                0 => None,
                o if o > 0 => Some([a, b, c]),
                _ => Some([a, c, b]),
            }
        })
        .collect();

    split_t_junctions(&mut triangles, &points);
    Ok(triangles)
}

/// Triangulate a set of regions into one triangle list.
pub fn triangulate_expolygons(expolys: &[ExPolygon]) -> Result<Vec<Triangle2>> {
    let mut out = Vec::new();
    for expoly in expolys {
        out.extend(triangulate_expolygon(expoly)?);
    }
    Ok(out)
}

/// Split every triangle whose edge passes exactly through a ring vertex
/// that no triangle uses as a corner.
///
/// The missing vertices are bucketed on a grid sized to the triangles, so
/// each triangle only tests the vertices near its bounding box.
fn split_t_junctions(triangles: &mut Vec<Triangle2>, points: &[Point]) {
    let mut used: Vec<Point> = triangles.iter().flatten().copied().collect();
    used.sort_unstable();
    used.dedup();

    let mut missing: Vec<Point> = points.iter().filter(|p| used.binary_search(p).is_err()).copied().collect();
    if missing.is_empty() || triangles.is_empty() {
        return;
    }
    missing.sort_unstable();
    missing.dedup();

    let extent: i128 = triangles
        .iter()
        .map(|t| {
            let (min, max) = triangle_bounds(t);
            (max.x - min.x).max(max.y - min.y) as i128
        })
        .sum();
    let cell = (extent / triangles.len() as i128).clamp(1, Coord::MAX as i128) as Coord;
    let mut grid = ClosestPointInRadius::new(cell);
    for (i, p) in missing.iter().enumerate() {
        grid.insert(*p, i);
    }

    let mut n_split = 0usize;
    let mut pending = std::mem::take(triangles);
    while let Some(tri) = pending.pop() {
        let (min, max) = triangle_bounds(&tri);
        let mut hit: Option<(usize, usize)> = None;
        grid.for_each_in_box(&min, &max, |p, &i| {
            if hit.map_or(false, |(j, _)| j <= i) {
                return;
            }
            if let Some(k) = (0..3).find(|&k| p.lies_inside_segment(&tri[k], &tri[(k + 1) % 3])) {
                hit = Some((i, k));
            }
        });
        match hit {
            Some((i, k)) => {
                let p = missing[i];
                let (a, b, c) = (tri[k], tri[(k + 1) % 3], tri[(k + 2) % 3]);
                pending.push([a, p, c]);
                pending.push([p, b, c]);
                n_split += 1;
            }
            None => triangles.push(tri),
        }
    }

    if n_split > 0 {
        trace!("triangulation: split {} triangles at collinear vertices", n_split);
    }
}

fn triangle_bounds(tri: &Triangle2) -> (Point, Point) {
    let min = Point::new(tri[0].x.min(tri[1].x).min(tri[2].x), tri[0].y.min(tri[1].y).min(tri[2].y));
    let max = Point::new(tri[0].x.max(tri[1].x).max(tri[2].x), tri[0].y.max(tri[1].y).max(tri[2].y));
    (min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Polygon;

    fn area_2x(triangles: &[Triangle2]) -> i128 {
        triangles.iter().map(|t| orient(&t[0], &t[1], &t[2])).sum()
    }

    #[test]
    fn test_triangulate_square() {
        let square = Polygon::rectangle(Point::new(0, 0), Point::new(10, 10));
        let triangles = triangulate_expolygon(&ExPolygon::new(square)).unwrap();
        assert_eq!(triangles.len(), 2);
        assert_eq!(area_2x(&triangles), 200);
        assert!(triangles.iter().all(|t| orient(&t[0], &t[1], &t[2]) > 0));
    }

    #[test]
    fn test_triangulate_with_hole() {
        let outer = Polygon::rectangle(Point::new(0, 0), Point::new(10, 10));
        let hole = Polygon::rectangle(Point::new(3, 3), Point::new(7, 7)).reversed();
        let triangles = triangulate_expolygon(&ExPolygon::with_holes(outer, vec![hole])).unwrap();
        assert_eq!(area_2x(&triangles), 2 * 84);
    }

    #[test]
    fn test_collinear_vertices_are_kept() {
        // Square with a midpoint on every side.
        let ring = Polygon::from_points(vec![
            Point::new(0, 0),
            Point::new(5, 0),
            Point::new(10, 0),
            Point::new(10, 5),
            Point::new(10, 10),
            Point::new(5, 10),
            Point::new(0, 10),
            Point::new(0, 5),
        ]);
        let triangles = triangulate_expolygon(&ExPolygon::new(ring.clone())).unwrap();
        assert_eq!(area_2x(&triangles), 200);
        for p in ring.iter() {
            assert!(
                triangles.iter().flatten().any(|q| q == p),
                "ring vertex {:?} missing from triangulation",
                p
            );
        }
        assert!(triangles.iter().all(|t| orient(&t[0], &t[1], &t[2]) > 0));
    }

    #[test]
    fn test_long_collinear_runs_are_split() {
        // Rectangle with 200 vertices along its bottom and top edges.
        let mut points: Vec<Point> = (0..=200).map(|i| Point::new(i * 10, 0)).collect();
        points.extend((0..=200).rev().map(|i| Point::new(i * 10, 50)));
        let ring = Polygon::from_points(points);
        let triangles = triangulate_expolygon(&ExPolygon::new(ring.clone())).unwrap();
        assert_eq!(area_2x(&triangles), 2 * 2000 * 50);
        assert!(triangles.iter().all(|t| orient(&t[0], &t[1], &t[2]) > 0));
        for p in ring.iter() {
            assert!(triangles.iter().flatten().any(|q| q == p), "{:?} missing", p);
        }
    }

    #[test]
    fn test_degenerate_input() {
        let line = Polygon::from_points(vec![Point::new(0, 0), Point::new(1, 1)]);
        assert!(triangulate_expolygon(&ExPolygon::new(line)).unwrap().is_empty());
    }
}

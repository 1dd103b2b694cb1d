//! Polygon type for closed contours.
//!
//! A polygon is an implicitly closed ring of scaled points. Counter-clockwise
//! rings have positive area and describe outer contours, clockwise rings
//! describe holes.

use super::{BoundingBox, Point};
use crate::CoordF;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Deref, DerefMut};

/// A closed polygon defined by a sequence of points.
///
/// The polygon is implicitly closed - the last point connects back to the first.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    /// Create a new empty polygon.
    #[inline]
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Create a polygon from a vector of points.
    #[inline]
    pub fn from_points(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Axis-aligned rectangle, counter-clockwise.
    pub fn rectangle(min: Point, max: Point) -> Self {
        Self::from_points(vec![
            min,
            Point::new(max.x, min.y),
            max,
            Point::new(min.x, max.y),
        ])
    }

    /// Get the points of this polygon.
    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Twice the signed area, exact.
    pub fn signed_area_2x(&self) -> i128 {
        if self.points.len() < 3 {
            return 0;
        }
        let n = self.points.len();
        (0..n)
            .map(|i| self.points[i].cross(&self.points[(i + 1) % n]))
            .sum()
    }

    /// Calculate the signed area of the polygon.
    /// Positive for counter-clockwise (exterior), negative for clockwise (hole).
    /// Uses the shoelace formula.
    #[inline]
    pub fn signed_area(&self) -> CoordF {
        self.signed_area_2x() as CoordF / 2.0
    }

    /// Calculate the unsigned area of the polygon.
    #[inline]
    pub fn area(&self) -> CoordF {
        self.signed_area().abs()
    }

    /// Check if the polygon is counter-clockwise (positive area).
    #[inline]
    pub fn is_counter_clockwise(&self) -> bool {
        self.signed_area_2x() > 0
    }

    /// Check if the polygon is clockwise (negative area).
    #[inline]
    pub fn is_clockwise(&self) -> bool {
        self.signed_area_2x() < 0
    }

    /// Ensure the polygon is counter-clockwise by reversing if necessary.
    /// Returns true if the polygon was reversed.
    pub fn make_counter_clockwise(&mut self) -> bool {
        if self.is_clockwise() {
            self.reverse();
            true
        } else {
            false
        }
    }

    /// Ensure the polygon is clockwise by reversing if necessary.
    /// Returns true if the polygon was reversed.
    pub fn make_clockwise(&mut self) -> bool {
        if self.is_counter_clockwise() {
            self.reverse();
            true
        } else {
            false
        }
    }

    /// Reverse the order of points in the polygon.
    #[inline]
    pub fn reverse(&mut self) {
        self.points.reverse();
    }

    /// Return a reversed copy of the polygon.
    pub fn reversed(&self) -> Self {
        let mut result = self.clone();
        result.reverse();
        result
    }

    /// Calculate the perimeter (total edge length) of the polygon.
    pub fn perimeter(&self) -> CoordF {
        let n = self.points.len();
        if n < 2 {
            return 0.0;
        }
        (0..n)
            .map(|i| self.points[i].distance(&self.points[(i + 1) % n]))
            .sum()
    }

    /// Get the bounding box of the polygon.
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.points)
    }

    /// Check if a point is inside the polygon using the ray casting algorithm.
    pub fn contains_point(&self, p: &Point) -> bool {
        if self.points.len() < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = self.points.len() - 1;

        for i in 0..self.points.len() {
            let pi = &self.points[i];
            let pj = &self.points[j];

            if ((pi.y > p.y) != (pj.y > p.y))
                && (p.x as i128)
                    < (pj.x as i128 - pi.x as i128) * (p.y as i128 - pi.y as i128)
                        / (pj.y as i128 - pi.y as i128)
                        + pi.x as i128
            {
                inside = !inside;
            }
            j = i;
        }

        inside
    }

    /// Drop consecutive duplicate points, including a closing duplicate.
    pub fn remove_duplicate_points(&mut self) {
        self.points.dedup();
        while self.points.len() > 1 && self.points.first() == self.points.last() {
            self.points.pop();
        }
    }

    /// Simplify the ring with the Douglas-Peucker algorithm.
    ///
    /// `tolerance` is in scaled units. Rings that collapse below three points
    /// come back empty.
    pub fn simplify(&self, tolerance: CoordF) -> Self {
        if self.points.len() < 4 || tolerance <= 0.0 {
            return self.clone();
        }

        // Split at the point farthest from the first one so both halves are
        // open chains with fixed ends.
        let first = self.points[0];
        let split = (1..self.points.len())
            .max_by_key(|&i| first.distance_squared(&self.points[i]))
            .unwrap_or(1);

        let mut keep = vec![false; self.points.len() + 1];
        keep[0] = true;
        keep[split] = true;
        keep[self.points.len()] = true;

        let mut ring = self.points.clone();
        ring.push(first);
        douglas_peucker(&ring, 0, split, tolerance, &mut keep);
        douglas_peucker(&ring, split, ring.len() - 1, tolerance, &mut keep);

        let points: Vec<Point> = ring[..ring.len() - 1]
            .iter()
            .zip(keep.iter())
            .filter(|(_, &k)| k)
            .map(|(p, _)| *p)
            .collect();

        if points.len() < 3 {
            Self::new()
        } else {
            Self::from_points(points)
        }
    }

    /// Translate the polygon by a vector.
    pub fn translate(&mut self, v: Point) {
        for p in &mut self.points {
            *p = *p + v;
        }
    }
}

fn douglas_peucker(points: &[Point], first: usize, last: usize, tolerance: CoordF, keep: &mut [bool]) {
    if last <= first + 1 {
        return;
    }
    let (a, b) = (points[first], points[last]);
    let mut max_dist = 0.0;
    let mut index = first;
    for (i, p) in points.iter().enumerate().take(last).skip(first + 1) {
        let d = p.distance_to_segment(&a, &b);
        if d > max_dist {
            max_dist = d;
            index = i;
        }
    }
    if max_dist > tolerance {
        keep[index] = true;
        douglas_peucker(points, first, index, tolerance, keep);
        douglas_peucker(points, index, last, tolerance, keep);
    }
}

impl Deref for Polygon {
    type Target = [Point];

    fn deref(&self) -> &Self::Target {
        &self.points
    }
}

impl DerefMut for Polygon {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.points
    }
}

impl fmt::Debug for Polygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Polygon({} points, area={:.0})", self.points.len(), self.signed_area())
    }
}

impl From<Vec<Point>> for Polygon {
    fn from(points: Vec<Point>) -> Self {
        Self::from_points(points)
    }
}

impl FromIterator<Point> for Polygon {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self::from_points(iter.into_iter().collect())
    }
}

/// Type alias for a collection of polygons.
pub type Polygons = Vec<Polygon>;

/// Sum of signed areas.
pub fn total_signed_area(polygons: &[Polygon]) -> CoordF {
    polygons.iter().map(|p| p.signed_area()).sum()
}

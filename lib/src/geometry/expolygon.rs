//! ExPolygon type for polygons with holes.

use super::{BoundingBox, Point, Polygon};
use crate::CoordF;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A polygon with holes (exterior polygon + interior hole polygons).
///
/// The contour is the outer boundary (counter-clockwise, positive area).
/// The holes are interior boundaries (clockwise).
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExPolygon {
    /// The outer contour of the polygon.
    pub contour: Polygon,
    /// The holes (interior contours) of the polygon.
    pub holes: Vec<Polygon>,
}

impl ExPolygon {
    /// Create a new ExPolygon with only a contour and no holes.
    #[inline]
    pub fn new(contour: Polygon) -> Self {
        Self {
            contour,
            holes: Vec::new(),
        }
    }

    /// Create a new ExPolygon with a contour and holes.
    #[inline]
    pub fn with_holes(contour: Polygon, holes: Vec<Polygon>) -> Self {
        Self { contour, holes }
    }

    /// Check if the ExPolygon is empty (no contour points).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.contour.is_empty()
    }

    /// Net area: contour area minus hole areas.
    pub fn area(&self) -> CoordF {
        self.contour.area() - self.holes.iter().map(|h| h.area()).sum::<CoordF>()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.contour.bounding_box()
    }

    /// Inside the contour and outside every hole.
    pub fn contains_point(&self, p: &Point) -> bool {
        self.contour.contains_point(p) && !self.holes.iter().any(|h| h.contains_point(p))
    }

    /// Orient the contour counter-clockwise and the holes clockwise.
    pub fn make_canonical(&mut self) {
        self.contour.make_counter_clockwise();
        for hole in &mut self.holes {
            hole.make_clockwise();
        }
    }

    /// Simplify contour and holes, dropping rings that collapse.
    pub fn simplified(&self, tolerance: CoordF) -> Option<Self> {
        let contour = self.contour.simplify(tolerance);
        if contour.len() < 3 {
            return None;
        }
        let holes = self
            .holes
            .iter()
            .map(|h| h.simplify(tolerance))
            .filter(|h| h.len() >= 3)
            .collect();
        Some(Self::with_holes(contour, holes))
    }

    /// Contour followed by holes.
    pub fn to_polygons(&self) -> Vec<Polygon> {
        let mut out = Vec::with_capacity(1 + self.holes.len());
        out.push(self.contour.clone());
        out.extend(self.holes.iter().cloned());
        out
    }
}

impl fmt::Debug for ExPolygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ExPolygon(contour: {} points, holes: {}, area={:.0})",
            self.contour.len(),
            self.holes.len(),
            self.area()
        )
    }
}

impl From<Polygon> for ExPolygon {
    fn from(contour: Polygon) -> Self {
        Self::new(contour)
    }
}

/// Type alias for a collection of ExPolygons.
pub type ExPolygons = Vec<ExPolygon>;

/// Flatten ExPolygons into their rings.
pub fn to_polygons(expolygons: &[ExPolygon]) -> Vec<Polygon> {
    expolygons.iter().flat_map(|e| e.to_polygons()).collect()
}

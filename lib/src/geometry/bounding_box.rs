//! Axis-aligned bounding boxes in scaled 2D and unscaled 3D space.

use super::{Point, Point3F};
use crate::{Coord, CoordF};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 2D axis-aligned bounding box with scaled integer coordinates.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
    defined: bool,
}

impl BoundingBox {
    /// Create a new empty (undefined) bounding box.
    #[inline]
    pub fn new() -> Self {
        Self {
            min: Point::new(Coord::MAX, Coord::MAX),
            max: Point::new(Coord::MIN, Coord::MIN),
            defined: false,
        }
    }

    /// Create a bounding box from a slice of points.
    pub fn from_points(points: &[Point]) -> Self {
        let mut bb = Self::new();
        for p in points {
            bb.merge_point(*p);
        }
        bb
    }

    /// Check if the bounding box is defined (has been merged with at least one point).
    #[inline]
    pub fn is_defined(&self) -> bool {
        self.defined
    }

    /// Merge a point into the bounding box.
    pub fn merge_point(&mut self, p: Point) {
        if self.defined {
            self.min.x = self.min.x.min(p.x);
            self.min.y = self.min.y.min(p.y);
            self.max.x = self.max.x.max(p.x);
            self.max.y = self.max.y.max(p.y);
        } else {
            self.min = p;
            self.max = p;
            self.defined = true;
        }
    }

    /// Merge another bounding box into this one.
    pub fn merge(&mut self, other: &BoundingBox) {
        if other.defined {
            self.merge_point(other.min);
            self.merge_point(other.max);
        }
    }

    #[inline]
    pub fn width(&self) -> Coord {
        if self.defined {
            self.max.x - self.min.x
        } else {
            0
        }
    }

    #[inline]
    pub fn height(&self) -> Coord {
        if self.defined {
            self.max.y - self.min.y
        } else {
            0
        }
    }

    /// Inclusive containment test.
    #[inline]
    pub fn contains_point(&self, p: &Point) -> bool {
        self.defined && p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

impl fmt::Debug for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.defined {
            write!(f, "BoundingBox({:?} - {:?})", self.min, self.max)
        } else {
            write!(f, "BoundingBox(undefined)")
        }
    }
}

/// A 3D axis-aligned bounding box with floating-point coordinates (in mm).
#[derive(Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox3F {
    pub min: Point3F,
    pub max: Point3F,
    defined: bool,
}

impl BoundingBox3F {
    /// Create a new empty bounding box.
    #[inline]
    pub fn new() -> Self {
        Self {
            min: Point3F::new(CoordF::MAX, CoordF::MAX, CoordF::MAX),
            max: Point3F::new(CoordF::MIN, CoordF::MIN, CoordF::MIN),
            defined: false,
        }
    }

    /// Bounding box of a set of points.
    pub fn from_points(points: &[Point3F]) -> Self {
        let mut bb = Self::new();
        for p in points {
            bb.merge_point(*p);
        }
        bb
    }

    /// Check if the bounding box is defined.
    #[inline]
    pub fn is_defined(&self) -> bool {
        self.defined
    }

    /// Merge a point into the bounding box.
    pub fn merge_point(&mut self, p: Point3F) {
        if self.defined {
            self.min.x = self.min.x.min(p.x);
            self.min.y = self.min.y.min(p.y);
            self.min.z = self.min.z.min(p.z);
            self.max.x = self.max.x.max(p.x);
            self.max.y = self.max.y.max(p.y);
            self.max.z = self.max.z.max(p.z);
        } else {
            self.min = p;
            self.max = p;
            self.defined = true;
        }
    }

    /// Extent along each axis.
    pub fn size(&self) -> Point3F {
        if self.defined {
            self.max - self.min
        } else {
            Point3F::default()
        }
    }
}

impl fmt::Debug for BoundingBox3F {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.defined {
            write!(f, "BoundingBox3F({:?} - {:?})", self.min, self.max)
        } else {
            write!(f, "BoundingBox3F(undefined)")
        }
    }
}

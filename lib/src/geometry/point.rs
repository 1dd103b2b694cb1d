//! Point types for 2D and 3D geometry.
//!
//! 2D points use scaled integer coordinates, 3D points stay in unscaled
//! floating-point millimeters (mesh vertex space).

use crate::{scale, unscale, Coord, CoordF};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// A 2D point with scaled integer coordinates.
///
/// Points use integer coordinates scaled by `SCALING_FACTOR` to avoid
/// floating-point precision issues. 1 unit = 1 nanometer.
///
/// # Example
/// ```
/// use slicer::geometry::Point;
/// use slicer::scale;
///
/// let p = Point::new(scale(1.0), scale(2.0));
/// assert_eq!(p, Point::new_scale(1.0, 2.0));
/// ```
#[derive(
    Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Point {
    pub x: Coord,
    pub y: Coord,
}

impl Point {
    /// Create a new point with the given coordinates.
    #[inline]
    pub const fn new(x: Coord, y: Coord) -> Self {
        Self { x, y }
    }

    /// Create a new point from floating-point coordinates (in mm), scaling them.
    #[inline]
    pub fn new_scale(x: CoordF, y: CoordF) -> Self {
        Self {
            x: scale(x),
            y: scale(y),
        }
    }

    /// Create a point at the origin (0, 0).
    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0, y: 0 }
    }

    /// Squared distance to another point.
    /// Returns i128 to avoid overflow with large coordinates.
    #[inline]
    pub fn distance_squared(&self, other: &Point) -> i128 {
        let dx = (other.x - self.x) as i128;
        let dy = (other.y - self.y) as i128;
        dx * dx + dy * dy
    }

    /// Distance to another point (scaled units).
    #[inline]
    pub fn distance(&self, other: &Point) -> CoordF {
        (self.distance_squared(other) as CoordF).sqrt()
    }

    /// 2D pseudo-cross product.
    /// Positive if other is counter-clockwise from self.
    #[inline]
    pub fn cross(&self, other: &Point) -> i128 {
        (self.x as i128) * (other.y as i128) - (self.y as i128) * (other.x as i128)
    }

    /// Dot product.
    #[inline]
    pub fn dot(&self, other: &Point) -> i128 {
        (self.x as i128) * (other.x as i128) + (self.y as i128) * (other.y as i128)
    }

    /// Positive if p1 -> self -> p2 turns counter-clockwise.
    #[inline]
    pub fn ccw(&self, p1: &Point, p2: &Point) -> i128 {
        (*p1 - *self).cross(&(*p2 - *self))
    }

    /// Distance from this point to the segment a-b.
    pub fn distance_to_segment(&self, a: &Point, b: &Point) -> CoordF {
        let ab = *b - *a;
        let len2 = ab.dot(&ab);
        if len2 == 0 {
            return self.distance(a);
        }
        let t = ((*self - *a).dot(&ab) as CoordF / len2 as CoordF).clamp(0.0, 1.0);
        let px = a.x as CoordF + ab.x as CoordF * t;
        let py = a.y as CoordF + ab.y as CoordF * t;
        let dx = self.x as CoordF - px;
        let dy = self.y as CoordF - py;
        (dx * dx + dy * dy).sqrt()
    }

    /// True if this point lies strictly inside the segment a-b
    /// (exactly collinear, not coinciding with either end).
    pub fn lies_inside_segment(&self, a: &Point, b: &Point) -> bool {
        if self == a || self == b || self.ccw(a, b) != 0 {
            return false;
        }
        (*a - *self).dot(&(*b - *self)) < 0
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", unscale(self.x), unscale(self.y))
    }
}

impl Add for Point {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Point {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

impl Neg for Point {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl From<(Coord, Coord)> for Point {
    #[inline]
    fn from((x, y): (Coord, Coord)) -> Self {
        Self::new(x, y)
    }
}

/// A 3D point with floating-point coordinates.
#[derive(Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3F {
    pub x: CoordF,
    pub y: CoordF,
    pub z: CoordF,
}

impl Point3F {
    /// Create a new point.
    #[inline]
    pub const fn new(x: CoordF, y: CoordF, z: CoordF) -> Self {
        Self { x, y, z }
    }

    /// Squared distance to another point.
    #[inline]
    pub fn distance_squared(&self, other: &Point3F) -> CoordF {
        let d = *other - *self;
        d.dot(&d)
    }

    /// Length as a vector.
    #[inline]
    pub fn length(&self) -> CoordF {
        self.dot(self).sqrt()
    }

    /// Normalized copy; zero vectors stay zero.
    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0 {
            *self * (1.0 / len)
        } else {
            *self
        }
    }

    #[inline]
    pub fn dot(&self, other: &Point3F) -> CoordF {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[inline]
    pub fn cross(&self, other: &Point3F) -> Point3F {
        Point3F::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }
}

impl fmt::Debug for Point3F {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6}, {:.6})", self.x, self.y, self.z)
    }
}

impl fmt::Display for Point3F {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

impl Add for Point3F {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Point3F {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Neg for Point3F {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<CoordF> for Point3F {
    type Output = Self;

    #[inline]
    fn mul(self, scalar: CoordF) -> Self {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl From<(CoordF, CoordF, CoordF)> for Point3F {
    #[inline]
    fn from((x, y, z): (CoordF, CoordF, CoordF)) -> Self {
        Self { x, y, z }
    }
}

/// Type alias for a collection of 2D points.
pub type Points = Vec<Point>;

/// Type alias for a collection of 3D points.
pub type Points3F = Vec<Point3F>;

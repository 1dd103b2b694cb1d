//! Affine 3D transforms applied to mesh vertices before slicing.

use super::Point3F;
use crate::CoordF;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 3D affine transformation.
///
/// Stored as a row-major 3x3 linear part plus a translation column:
/// ```text
/// | m00 m01 m02 | tx |
/// | m10 m11 m12 | ty |
/// | m20 m21 m22 | tz |
/// ```
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform3D {
    pub linear: [[CoordF; 3]; 3],
    pub translation: [CoordF; 3],
}

impl Transform3D {
    /// Create an identity transform.
    pub const fn identity() -> Self {
        Self {
            linear: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            translation: [0.0, 0.0, 0.0],
        }
    }

    /// Create a translation transform.
    pub fn translation(tx: CoordF, ty: CoordF, tz: CoordF) -> Self {
        Self {
            translation: [tx, ty, tz],
            ..Self::identity()
        }
    }

    /// Create a scaling transform.
    pub fn scaling(sx: CoordF, sy: CoordF, sz: CoordF) -> Self {
        Self {
            linear: [[sx, 0.0, 0.0], [0.0, sy, 0.0], [0.0, 0.0, sz]],
            translation: [0.0; 3],
        }
    }

    /// Create a uniform scaling transform.
    #[inline]
    pub fn uniform_scaling(s: CoordF) -> Self {
        Self::scaling(s, s, s)
    }

    /// Counter-clockwise rotation around the Z axis (radians).
    pub fn rotation_z(angle: CoordF) -> Self {
        let (s, c) = angle.sin_cos();
        Self {
            linear: [[c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, 1.0]],
            translation: [0.0; 3],
        }
    }

    /// Compose transformations: the result first applies `self`, then `other`.
    pub fn then(&self, other: &Transform3D) -> Self {
        let mut linear = [[0.0; 3]; 3];
        let mut translation = other.translation;
        for i in 0..3 {
            for j in 0..3 {
                linear[i][j] = (0..3).map(|k| other.linear[i][k] * self.linear[k][j]).sum();
                translation[i] += other.linear[i][j] * self.translation[j];
            }
        }
        Self { linear, translation }
    }

    /// Apply this transform to a point.
    pub fn apply(&self, p: Point3F) -> Point3F {
        let row = |i: usize| {
            self.linear[i][0] * p.x
                + self.linear[i][1] * p.y
                + self.linear[i][2] * p.z
                + self.translation[i]
        };
        Point3F::new(row(0), row(1), row(2))
    }

    /// Check if this is approximately the identity transform.
    pub fn is_identity(&self, epsilon: CoordF) -> bool {
        let id = Self::identity();
        self.linear
            .iter()
            .flatten()
            .zip(id.linear.iter().flatten())
            .chain(self.translation.iter().zip(id.translation.iter()))
            .all(|(a, b)| (a - b).abs() <= epsilon)
    }

    /// Determinant of the linear part.
    pub fn determinant(&self) -> CoordF {
        let m = &self.linear;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// A mirroring transform flips the winding of every sliced loop.
    #[inline]
    pub fn has_reflection(&self) -> bool {
        self.determinant() < 0.0
    }
}

impl Default for Transform3D {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for Transform3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transform3D(")?;
        for (i, row) in self.linear.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(
                f,
                "[{:.4}, {:.4}, {:.4} | {:.4}]",
                row[0], row[1], row[2], self.translation[i]
            )?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn approx(a: Point3F, b: Point3F) -> bool {
        a.distance_squared(&b) < 1e-18
    }

    #[test]
    fn test_identity() {
        let t = Transform3D::identity();
        assert!(t.is_identity(1e-12));
        let p = Point3F::new(1.0, 2.0, 3.0);
        assert_eq!(t.apply(p), p);
    }

    #[test]
    fn test_translation_then_scaling() {
        let t = Transform3D::translation(1.0, 0.0, 0.0).then(&Transform3D::uniform_scaling(2.0));
        let p = t.apply(Point3F::new(1.0, 1.0, 1.0));
        assert!(approx(p, Point3F::new(4.0, 2.0, 2.0)), "got {:?}", p);
    }

    #[test]
    fn test_rotation_z() {
        let t = Transform3D::rotation_z(FRAC_PI_2);
        let p = t.apply(Point3F::new(1.0, 0.0, 0.0));
        assert!(approx(p, Point3F::new(0.0, 1.0, 0.0)), "got {:?}", p);
        assert!(!t.has_reflection());
    }

    #[test]
    fn test_reflection() {
        assert!(Transform3D::scaling(-1.0, 1.0, 1.0).has_reflection());
        assert!(!Transform3D::scaling(-1.0, -1.0, 1.0).has_reflection());
    }
}

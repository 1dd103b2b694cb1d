//! Geometry primitives for the slicer.
//!
//! - [`Point`] - 2D point with scaled integer coordinates
//! - [`Point3F`] - 3D point with floating-point coordinates (unscaled, mm)
//! - [`Polygon`] - Closed polygon (boundary)
//! - [`ExPolygon`] - Polygon with holes (exterior + interior contours)
//! - [`BoundingBox`] and [`BoundingBox3F`] - Axis-aligned bounding boxes
//! - [`Transform3D`] - Affine transform applied to mesh vertices
//!
//! ## Coordinate System
//!
//! Planar output uses scaled integer coordinates. Coordinates are scaled by
//! `SCALING_FACTOR` (1,000,000), so 1 unit = 1 nanometer.

mod bounding_box;
pub(crate) mod closest_point;
mod expolygon;
mod point;
mod polygon;
mod transform;

pub use bounding_box::{BoundingBox, BoundingBox3F};
pub use expolygon::{to_polygons, ExPolygon, ExPolygons};
pub use point::{Point, Point3F, Points, Points3F};
pub use polygon::{total_signed_area, Polygon, Polygons};
pub use transform::Transform3D;

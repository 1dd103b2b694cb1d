//! Layer data structure.
//!
//! A [`Layer`] is one horizontal slice of a mesh: the Z band it stands for
//! and the regions cut at its slice plane.

use crate::geometry::ExPolygons;
use crate::{scale, unscale, Coord, CoordF};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single horizontal slice of a model.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Layer index (0-based).
    id: usize,

    /// Z coordinate of the bottom of this layer (in scaled units).
    bottom_z: Coord,

    /// Z coordinate of the top of this layer (print_z, in scaled units).
    top_z: Coord,

    /// The plane the regions were sliced at (in scaled units).
    slice_z: Coord,

    /// Regions at the slice plane.
    slices: ExPolygons,
}

impl Layer {
    /// Create a new empty layer.
    pub fn new(id: usize, bottom_z: Coord, top_z: Coord, slice_z: Coord) -> Self {
        Self {
            id,
            bottom_z,
            top_z,
            slice_z,
            slices: Vec::new(),
        }
    }

    /// Create a new layer with floating-point coordinates (in mm).
    pub fn new_f(id: usize, bottom_z: CoordF, top_z: CoordF, slice_z: CoordF) -> Self {
        Self::new(id, scale(bottom_z), scale(top_z), scale(slice_z))
    }

    /// Builder method: set the regions.
    pub fn with_slices(mut self, slices: ExPolygons) -> Self {
        self.slices = slices;
        self
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    #[inline]
    pub fn bottom_z(&self) -> Coord {
        self.bottom_z
    }

    /// Top of the layer, where the nozzle sits when printing it.
    #[inline]
    pub fn print_z(&self) -> Coord {
        self.top_z
    }

    #[inline]
    pub fn height(&self) -> Coord {
        self.top_z - self.bottom_z
    }

    #[inline]
    pub fn slice_z(&self) -> Coord {
        self.slice_z
    }

    #[inline]
    pub fn print_z_mm(&self) -> CoordF {
        unscale(self.top_z)
    }

    #[inline]
    pub fn height_mm(&self) -> CoordF {
        unscale(self.height())
    }

    #[inline]
    pub fn slice_z_mm(&self) -> CoordF {
        unscale(self.slice_z)
    }

    /// Regions at the slice plane.
    #[inline]
    pub fn slices(&self) -> &ExPolygons {
        &self.slices
    }

    #[inline]
    pub fn is_first_layer(&self) -> bool {
        self.id == 0
    }

    /// Check if this layer has no geometry.
    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Total area of the regions (in scaled units squared).
    pub fn area(&self) -> CoordF {
        self.slices.iter().map(|s| s.area()).sum()
    }
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Layer(id={}, z={:.3}mm, height={:.3}mm, {} slices)",
            self.id,
            self.print_z_mm(),
            self.height_mm(),
            self.slices.len()
        )
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Layer {} at z={:.3}mm (height={:.3}mm)",
            self.id,
            self.print_z_mm(),
            self.height_mm()
        )
    }
}

/// Type alias for a collection of layers.
pub type Layers = Vec<Layer>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{ExPolygon, Point, Polygon};

    #[test]
    fn test_layer_new() {
        let layer = Layer::new_f(0, 0.0, 0.2, 0.1);
        assert_eq!(layer.id(), 0);
        assert!((layer.height_mm() - 0.2).abs() < 1e-6);
        assert!((layer.slice_z_mm() - 0.1).abs() < 1e-6);
        assert!(layer.is_first_layer());
        assert!(layer.is_empty());
    }

    #[test]
    fn test_layer_area() {
        let square = Polygon::rectangle(Point::new(0, 0), Point::new(1_000_000, 1_000_000));
        let layer = Layer::new_f(3, 0.6, 0.8, 0.7).with_slices(vec![ExPolygon::new(square)]);
        assert!(!layer.is_first_layer());
        assert!(!layer.is_empty());
        assert!((layer.area() - 1e12).abs() < 1.0);
    }

    #[test]
    fn test_layer_serde() {
        let square = Polygon::rectangle(Point::new(0, 0), Point::new(100, 100));
        let layer = Layer::new_f(1, 0.2, 0.4, 0.3).with_slices(vec![ExPolygon::new(square)]);
        let json = serde_json::to_string(&layer).unwrap();
        let back: Layer = serde_json::from_str(&json).unwrap();
        assert_eq!(layer, back);
    }
}

//! Slicer - layer-by-layer slicing of a whole object.
//!
//! Splits the Z extent of the placed mesh into layers, slices every layer at
//! its mid height and wraps the regions into [`Layer`]s.

use super::mesh_slicer::{slice_mesh_ex_at, slice_mesh_ex_with_progress};
use super::{Layer, SlicingParams};
use crate::geometry::{BoundingBox3F, ExPolygons};
use crate::mesh::TriangleMesh;
use crate::{CoordF, Error, Result, EPSILON};
use log::{debug, info};
use std::fmt;

/// Slices meshes into layers of the configured heights.
pub struct Slicer {
    params: SlicingParams,
}

impl Slicer {
    /// Create a new slicer with the given parameters.
    pub fn new(params: SlicingParams) -> Self {
        Self { params }
    }

    /// Create a new slicer with default parameters.
    pub fn with_defaults() -> Self {
        Self::new(SlicingParams::default())
    }

    pub fn params(&self) -> &SlicingParams {
        &self.params
    }

    /// Slice a mesh into layers.
    pub fn slice(&self, mesh: &TriangleMesh) -> Result<Vec<Layer>> {
        self.slice_with_callback(mesh, |_| {}, || false)
    }

    /// Slice a mesh into layers, reporting progress from 0.0 to 1.0.
    ///
    /// Progress is reported once the layer heights are known, after the
    /// facets are sliced and then every few layers as they are chained.
    ///
    /// `cancel` is polled between facet batches and between layers. A
    /// cancelled run returns [`Error::Cancelled`] and no layers.
    pub fn slice_with_callback<F, C>(&self, mesh: &TriangleMesh, mut callback: F, cancel: C) -> Result<Vec<Layer>>
    where
        F: FnMut(f64),
        C: Fn() -> bool + Sync,
    {
        self.params.validate()?;
        if mesh.is_empty() {
            return Err(Error::Mesh("Cannot slice an empty mesh".into()));
        }

        let heights = self.compute_layer_heights(mesh)?;
        callback(0.1);

        let slice_zs: Vec<CoordF> = heights.iter().map(|h| h.slice_z).collect();
        let sliced = slice_mesh_ex_with_progress(mesh, &slice_zs, &self.params.mesh, &cancel, |done, total| {
            callback(0.1 + 0.85 * done as f64 / total.max(1) as f64)
        })?;

        let layers: Vec<Layer> = heights
            .iter()
            .zip(sliced)
            .enumerate()
            .map(|(i, (h, slices))| Layer::new_f(i, h.bottom_z, h.top_z, h.slice_z).with_slices(slices))
            .collect();

        info!(
            "sliced {} facets into {} layers ({})",
            mesh.triangle_count(),
            layers.len(),
            self.params
        );
        callback(1.0);
        Ok(layers)
    }

    /// Slice the mesh at a single Z height.
    pub fn slice_at_z(&self, mesh: &TriangleMesh, z: CoordF) -> Result<ExPolygons> {
        if mesh.is_empty() {
            return Err(Error::Mesh("Cannot slice an empty mesh".into()));
        }
        slice_mesh_ex_at(mesh, z, &self.params.mesh, || false)
    }

    /// Z bands of the layers covering the placed mesh.
    fn compute_layer_heights(&self, mesh: &TriangleMesh) -> Result<Vec<LayerHeight>> {
        let trafo = &self.params.mesh.base.trafo;
        let mut bb = BoundingBox3F::new();
        for v in mesh.vertices() {
            bb.merge_point(trafo.apply(*v));
        }
        if !bb.is_defined() {
            return Err(Error::Mesh("Mesh has no bounding box".into()));
        }

        let (min_z, max_z) = (bb.min.z, bb.max.z);
        if max_z - min_z <= 0.0 {
            return Err(Error::Mesh("Object has zero height".into()));
        }

        let mut heights = Vec::new();
        let mut z = min_z;
        let mut step = self.params.first_layer_height;
        while max_z - z > EPSILON {
            let mut top_z = (z + step).min(max_z);
            if max_z - top_z < EPSILON {
                top_z = max_z;
            }
            heights.push(LayerHeight {
                bottom_z: z,
                top_z,
                slice_z: (z + top_z) / 2.0,
            });
            z = top_z;
            step = self.params.layer_height;
        }

        debug!("{} layers between z {:.3} and {:.3}", heights.len(), min_z, max_z);
        Ok(heights)
    }
}

impl Default for Slicer {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for Slicer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slicer({:?})", self.params)
    }
}

#[derive(Clone, Copy, Debug)]
struct LayerHeight {
    bottom_z: CoordF,
    /// Print Z.
    top_z: CoordF,
    slice_z: CoordF,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Transform3D;
    use crate::slice::SlicingMode;
    use crate::SCALING_FACTOR;

    #[test]
    fn test_slicer_new() {
        let slicer = Slicer::new(SlicingParams::default());
        assert!((slicer.params().layer_height - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_compute_layer_heights() {
        let slicer = Slicer::new(SlicingParams::new().layer_height(0.3).first_layer_height(0.5));
        let mesh = TriangleMesh::cube(10.0);

        let heights = slicer.compute_layer_heights(&mesh).unwrap();
        assert!((heights[0].bottom_z + 5.0).abs() < 1e-9);
        assert!((heights[0].top_z + 4.5).abs() < 1e-9);
        for i in 1..heights.len() {
            assert!((heights[i].bottom_z - heights[i - 1].top_z).abs() < 1e-9);
            assert!(heights[i].top_z - heights[i].bottom_z <= 0.3 + 1e-9);
        }
        assert!((heights.last().unwrap().top_z - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_layer_heights_follow_placement() {
        let mut params = SlicingParams::default();
        params.mesh.base.trafo = Transform3D::translation(0.0, 0.0, 5.0);
        let heights = Slicer::new(params).compute_layer_heights(&TriangleMesh::cube(10.0)).unwrap();
        assert!(heights[0].bottom_z.abs() < 1e-9);
    }

    #[test]
    fn test_slice_cube() {
        let slicer = Slicer::with_defaults();
        let mesh = TriangleMesh::cube(10.0);

        let layers = slicer.slice(&mesh).unwrap();
        assert_eq!(layers.len(), 50);
        for (i, layer) in layers.iter().enumerate() {
            assert_eq!(layer.id(), i);
            assert_eq!(layer.slices().len(), 1);
            assert!((layer.area() / (SCALING_FACTOR * SCALING_FACTOR) - 100.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_slice_empty_mesh() {
        let slicer = Slicer::with_defaults();
        assert!(matches!(slicer.slice(&TriangleMesh::new()), Err(Error::Mesh(_))));
    }

    #[test]
    fn test_slice_with_callback() {
        let slicer = Slicer::with_defaults();
        let mesh = TriangleMesh::cube(10.0);

        let mut last_progress = 0.0;
        let layers = slicer
            .slice_with_callback(
                &mesh,
                |progress| {
                    assert!(progress >= last_progress);
                    last_progress = progress;
                },
                || false,
            )
            .unwrap();

        assert!(!layers.is_empty());
        assert!((last_progress - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_progress_advances_with_layers() {
        let slicer = Slicer::new(SlicingParams::new().layer_height(0.05).first_layer_height(0.05));
        let mut reports = Vec::new();
        let layers = slicer
            .slice_with_callback(&TriangleMesh::cube(10.0), |p| reports.push(p), || false)
            .unwrap();
        assert_eq!(layers.len(), 200);
        // Heights, facets, 13 layer batches, done.
        assert_eq!(reports.len(), 16);
        assert!(reports.windows(2).all(|w| w[0] <= w[1]));
        assert!((reports[reports.len() - 1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cancelled_slice() {
        let slicer = Slicer::with_defaults();
        let result = slicer.slice_with_callback(&TriangleMesh::cube(10.0), |_| {}, || true);
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn test_slice_at_z() {
        let slicer = Slicer::new(SlicingParams::default().mode(SlicingMode::Positive));
        let expolygons = slicer.slice_at_z(&TriangleMesh::cube(10.0), 0.0).unwrap();
        assert_eq!(expolygons.len(), 1);
        assert!(expolygons[0].holes.is_empty());
    }
}

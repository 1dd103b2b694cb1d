//! Slicing parameters and configuration.
//!
//! Three layers of settings:
//! - [`MeshSlicingParams`] - how loops are oriented per layer, plus placement
//! - [`MeshSlicingParamsEx`] - adds closing, offset and simplification of regions
//! - [`SlicingParams`] - layer heights for the [`Slicer`](super::Slicer) facade
//!
//! All of them serialize with serde so they can be loaded from JSON, with
//! missing fields falling back to the defaults.

use crate::geometry::Transform3D;
use crate::{CoordF, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Slicing mode determines how the loops of a layer become regions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlicingMode {
    /// Regular slicing - loops keep their orientation, nonzero fill rule.
    #[default]
    Regular,
    /// Even-odd fill rule - for models with overlapping shells.
    EvenOdd,
    /// Positive mode - orients all loops CCW, closes holes.
    Positive,
    /// Positive largest contour - keeps only the largest loop, CCW.
    PositiveLargestContour,
}

/// Tuning of the proximity stitching pass of the segment chainer.
///
/// Open polylines whose ends are closer than `max_gap` are joined. A polyline
/// whose two ends are within `max_gap` of each other is closed into a loop
/// only if the closing segment is shorter than `closing_ratio` times the
/// polyline length, as long as another polyline end lies nearer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapClosingParams {
    /// Maximum gap to bridge (mm).
    pub max_gap: CoordF,
    /// Maximum ratio of the closing segment to the polyline length.
    pub closing_ratio: CoordF,
}

impl Default for GapClosingParams {
    fn default() -> Self {
        Self {
            max_gap: 2.0,
            closing_ratio: 0.3,
        }
    }
}

impl GapClosingParams {
    /// Disable gap closing, open polylines are only joined exactly.
    pub fn disabled() -> Self {
        Self {
            max_gap: 0.0,
            closing_ratio: 0.0,
        }
    }
}

/// Parameters of the polygon level slicing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshSlicingParams {
    /// Mode used at and above `slicing_mode_normal_below_layer`.
    pub mode: SlicingMode,

    /// Mode used for layers below `slicing_mode_normal_below_layer`.
    pub mode_below: SlicingMode,

    /// Index of the first layer sliced with `mode`.
    pub slicing_mode_normal_below_layer: usize,

    /// Placement applied to the mesh vertices before slicing.
    pub trafo: Transform3D,

    /// Proximity stitching of loops that do not close exactly.
    pub gap_closing: GapClosingParams,
}

impl Default for MeshSlicingParams {
    fn default() -> Self {
        Self {
            mode: SlicingMode::Regular,
            mode_below: SlicingMode::Regular,
            slicing_mode_normal_below_layer: 0,
            trafo: Transform3D::identity(),
            gap_closing: GapClosingParams::default(),
        }
    }
}

impl MeshSlicingParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mode for the given layer index.
    #[inline]
    pub fn mode_for_layer(&self, layer_id: usize) -> SlicingMode {
        if layer_id < self.slicing_mode_normal_below_layer {
            self.mode_below
        } else {
            self.mode
        }
    }

    /// Builder method: set slicing mode.
    pub fn mode(mut self, mode: SlicingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Builder method: use `mode_below` for the first `layers` layers.
    pub fn mode_below(mut self, mode_below: SlicingMode, layers: usize) -> Self {
        self.mode_below = mode_below;
        self.slicing_mode_normal_below_layer = layers;
        self
    }

    /// Builder method: set the placement transformation.
    pub fn trafo(mut self, trafo: Transform3D) -> Self {
        self.trafo = trafo;
        self
    }

    /// Builder method: set gap closing.
    pub fn gap_closing(mut self, gap_closing: GapClosingParams) -> Self {
        self.gap_closing = gap_closing;
        self
    }

    /// The polygon stage cannot keep the largest region, it orients loops
    /// CCW and the region stage picks the largest one.
    pub(crate) fn for_polygon_stage(&self) -> Self {
        let demote = |mode| match mode {
            SlicingMode::PositiveLargestContour => SlicingMode::Positive,
            other => other,
        };
        Self {
            mode: demote(self.mode),
            mode_below: demote(self.mode_below),
            ..self.clone()
        }
    }
}

/// Parameters of the region level slicing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshSlicingParamsEx {
    #[serde(flatten)]
    pub base: MeshSlicingParams,

    /// Morphological closing radius (mm) applied to slice contours.
    /// Helps close small gaps in the mesh.
    pub closing_radius: CoordF,

    /// Extra offset applied to slice contours (mm).
    /// Positive = expand, negative = shrink.
    pub extra_offset: CoordF,

    /// Resolution for contour simplification (mm).
    /// 0 = no simplification.
    pub resolution: CoordF,
}

impl Default for MeshSlicingParamsEx {
    fn default() -> Self {
        Self {
            base: MeshSlicingParams::default(),
            closing_radius: 0.0,
            extra_offset: 0.0,
            resolution: 0.0,
        }
    }
}

impl MeshSlicingParamsEx {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that the closing radius and resolution make sense.
    pub fn validate(&self) -> Result<()> {
        if !(self.closing_radius >= 0.0) {
            return Err(Error::Config(format!(
                "closing_radius must be non-negative, got {}",
                self.closing_radius
            )));
        }
        if !(self.resolution >= 0.0) {
            return Err(Error::Config(format!(
                "resolution must be non-negative, got {}",
                self.resolution
            )));
        }
        if !self.extra_offset.is_finite() {
            return Err(Error::Config("extra_offset must be finite".into()));
        }
        if !(self.base.gap_closing.max_gap >= 0.0) {
            return Err(Error::Config("gap_closing.max_gap must be non-negative".into()));
        }
        Ok(())
    }

    /// Builder method: set slicing mode.
    pub fn mode(mut self, mode: SlicingMode) -> Self {
        self.base.mode = mode;
        self
    }

    /// Builder method: set closing radius.
    pub fn closing_radius(mut self, radius: CoordF) -> Self {
        self.closing_radius = radius;
        self
    }

    /// Builder method: set extra offset.
    pub fn extra_offset(mut self, offset: CoordF) -> Self {
        self.extra_offset = offset;
        self
    }

    /// Builder method: set resolution.
    pub fn resolution(mut self, resolution: CoordF) -> Self {
        self.resolution = resolution;
        self
    }

    /// Builder method: set the placement transformation.
    pub fn trafo(mut self, trafo: Transform3D) -> Self {
        self.base.trafo = trafo;
        self
    }
}

impl From<MeshSlicingParams> for MeshSlicingParamsEx {
    fn from(base: MeshSlicingParams) -> Self {
        Self {
            base,
            ..Default::default()
        }
    }
}

/// Parameters controlling the layer heights of the [`Slicer`](super::Slicer).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlicingParams {
    /// Regular layer height (mm).
    pub layer_height: CoordF,

    /// First layer height (mm).
    pub first_layer_height: CoordF,

    /// How each layer is turned into regions.
    pub mesh: MeshSlicingParamsEx,
}

impl SlicingParams {
    /// Create new slicing parameters with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if parameters are valid.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.layer_height > 0.0) || !(self.first_layer_height > 0.0) {
            return Err(Error::Config(format!(
                "layer heights must be positive, got {} / {}",
                self.layer_height, self.first_layer_height
            )));
        }
        self.mesh.validate()
    }

    /// Load parameters from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let params: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Builder method: set layer height.
    pub fn layer_height(mut self, height: CoordF) -> Self {
        self.layer_height = height;
        self
    }

    /// Builder method: set first layer height.
    pub fn first_layer_height(mut self, height: CoordF) -> Self {
        self.first_layer_height = height;
        self
    }

    /// Builder method: set slicing mode.
    pub fn mode(mut self, mode: SlicingMode) -> Self {
        self.mesh.base.mode = mode;
        self
    }

    /// Builder method: set closing radius.
    pub fn closing_radius(mut self, radius: CoordF) -> Self {
        self.mesh.closing_radius = radius;
        self
    }

    /// Builder method: set resolution.
    pub fn resolution(mut self, resolution: CoordF) -> Self {
        self.mesh.resolution = resolution;
        self
    }
}

impl Default for SlicingParams {
    fn default() -> Self {
        Self {
            layer_height: 0.2,
            first_layer_height: 0.2,
            mesh: MeshSlicingParamsEx::default(),
        }
    }
}

impl fmt::Display for SlicingParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SlicingParams(layer_height={:.3}mm, first_layer={:.3}mm, mode={:?})",
            self.layer_height, self.first_layer_height, self.mesh.base.mode
        )
    }
}

//! # Slicer
//!
//! Triangle mesh slicing core. Converts an indexed triangle set into planar
//! geometry at a sorted set of horizontal plane heights:
//! - facet / plane intersection with typed segment end points
//! - segment chaining into closed loops, with exact and gap-closing stitching
//! - classification of loops into contours and holes (with closing / offset)
//! - projection of up / down facing surfaces between consecutive planes (slabs)
//! - cutting a mesh into an upper and a lower half with triangulated caps
//!
//! ## Example
//!
//! ```rust,ignore
//! use slicer::mesh::{load_stl, TriangleMesh};
//! use slicer::slice::{slice_mesh_ex, MeshSlicingParamsEx};
//!
//! let mesh = load_stl("model.stl")?;
//! let zs = vec![0.1, 0.3, 0.5];
//! let layers = slice_mesh_ex(&mesh, &zs, &MeshSlicingParamsEx::default(), || false)?;
//! ```

// Core modules
pub mod clipper;
pub mod geometry;
pub mod mesh;
pub mod slice;
pub mod triangulation;

pub use geometry::{ExPolygon, ExPolygons, Point, Point3F, Polygon, Polygons, Transform3D};
pub use mesh::{Triangle, TriangleMesh};
pub use slice::{
    cut_mesh, project_mesh, slice_mesh, slice_mesh_at, slice_mesh_ex, slice_mesh_ex_at,
    slice_mesh_slabs, CutResult, FacetEdgeType, FacetSliceType, GapClosingParams,
    IntersectionLine, Layer, MeshSlicingParams, MeshSlicingParamsEx, SlabSlices, Slicer,
    SlicingMode, SlicingParams,
};

/// Integer coordinate type for scaled values.
pub type Coord = i64;

/// Floating-point coordinate type for unscaled values.
pub type CoordF = f64;

/// Scaling factor: coordinates are stored as integers scaled by this factor.
/// 1 unit = 1 nanometer, so 1mm = 1_000_000 units.
pub const SCALING_FACTOR: f64 = 1_000_000.0;

/// Height tolerance in mm when stepping layer boundaries up to the top of a mesh.
pub const EPSILON: f64 = 1e-4;

/// Scale a floating-point coordinate to integer.
#[inline]
pub fn scale(v: CoordF) -> Coord {
    (v * SCALING_FACTOR).round() as Coord
}

/// Unscale an integer coordinate to floating-point.
#[inline]
pub fn unscale(v: Coord) -> CoordF {
    v as CoordF / SCALING_FACTOR
}

/// Result type for slicer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for slicer operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Mesh error: {0}")]
    Mesh(String),

    #[error("Slicing error: {0}")]
    Slicing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Triangulation error: {0}")]
    Triangulation(String),

    #[error("Cancelled")]
    Cancelled,
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

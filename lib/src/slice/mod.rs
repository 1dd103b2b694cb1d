//! Mesh slicing.
//!
//! - [`intersection`] - one facet against one plane
//! - [`dispatch`] - fan-out of facets to the planes they reach
//! - [`chain`] - segments of one plane into closed loops
//! - [`regions`] - loops into contours with holes
//! - [`slice_mesh`] and friends - the multi-plane and single-plane pipelines
//! - [`slice_mesh_slabs`] and [`project_mesh`] - up and down facing outlines
//! - [`cut_mesh`] - splitting a mesh at a plane with closed caps
//! - [`Slicer`] - layer heights plus slicing, producing [`Layer`]s
//!
//! Every long running entry point takes a cancellation callback, polled
//! between batches of work. A cancelled call returns
//! [`Error::Cancelled`](crate::Error::Cancelled) and nothing else.

pub mod chain;
mod cut;
pub mod dispatch;
pub mod intersection;
mod layer;
mod mesh_slicer;
pub mod regions;
mod slabs;
mod slicer;
mod slicing_params;

pub use chain::make_loops;
pub use cut::{cut_mesh, CutResult};
pub use dispatch::layer_range;
pub use intersection::{slice_facet, FacetEdgeType, FacetSliceType, IntersectionLine};
pub use layer::{Layer, Layers};
pub use mesh_slicer::{slice_mesh, slice_mesh_at, slice_mesh_ex, slice_mesh_ex_at};
pub use regions::{make_expolygons, make_expolygons_simple};
pub use slabs::{facet_orientation, project_mesh, slice_mesh_slabs, FacetOrientation, SlabSlices};
pub use slicer::Slicer;
pub use slicing_params::{GapClosingParams, MeshSlicingParams, MeshSlicingParamsEx, SlicingMode, SlicingParams};

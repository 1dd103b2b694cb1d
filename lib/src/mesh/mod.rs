//! Mesh loading and processing.
//!
//! - [`TriangleMesh`] - indexed triangle set
//! - [`Triangle`] - a single triangle
//! - STL file loading and saving
//! - [`topology`] - shared edge ids and face neighbors

mod stl;
pub mod topology;
mod triangle_mesh;

pub use stl::{load_stl, parse_stl, save_stl, write_stl};
pub use triangle_mesh::{Triangle, TriangleMesh};

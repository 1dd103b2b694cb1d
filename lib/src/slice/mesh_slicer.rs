//! Mesh slicing entry points.
//!
//! The pipeline for a set of plane heights:
//! 1. place the vertices and compute the shared edge ids of every facet
//! 2. intersect every facet with the planes it spans
//! 3. chain the segments of every plane into closed loops
//! 4. orient the loops for the slicing mode of their layer
//! 5. optionally classify the loops into regions (contours with holes)
//!
//! Steps 2 to 5 run on the rayon pool, steps 3 to 5 in batches of layers.
//! All of them poll the cancellation callback and return
//! [`Error::Cancelled`] without any partial output.

use super::chain::make_loops;
use super::dispatch::{check_sorted, slice_make_lines, slice_make_lines_at, transform_vertices, LayerLines};
use super::regions::{apply_mode, make_regions};
use super::slicing_params::{MeshSlicingParams, MeshSlicingParamsEx};
use crate::geometry::{ExPolygons, Polygons};
use crate::mesh::topology::face_edge_ids;
use crate::mesh::TriangleMesh;
use crate::{CoordF, Error, Result};
use log::debug;
use rayon::prelude::*;

/// Layers chained together between two progress reports.
const LAYER_BATCH: usize = 16;

/// Steps 1 and 2: the segments of every plane.
fn layer_lines<C>(mesh: &TriangleMesh, zs: &[CoordF], params: &MeshSlicingParams, cancel: &C) -> Result<LayerLines>
where
    C: Fn() -> bool + Sync,
{
    let vertices = transform_vertices(mesh, &params.trafo);
    let edge_ids = face_edge_ids(mesh);
    if cancel() {
        return Err(Error::Cancelled);
    }
    slice_make_lines(
        &vertices,
        mesh.indices(),
        &edge_ids,
        zs,
        params.trafo.has_reflection(),
        cancel,
    )
}

/// Chain every layer with `finish(layer_id, loops)`, [`LAYER_BATCH`] layers
/// at a time, calling `progress(done, total)` after each batch.
fn chain_layers<T, C, M, P>(
    lines: &mut LayerLines,
    params: &MeshSlicingParams,
    cancel: &C,
    finish: M,
    mut progress: P,
) -> Result<Vec<T>>
where
    T: Send,
    C: Fn() -> bool + Sync,
    M: Fn(usize, Polygons) -> T + Sync,
    P: FnMut(usize, usize),
{
    let total = lines.len();
    let mut layers = Vec::with_capacity(total);
    for (batch, chunk) in lines.chunks_mut(LAYER_BATCH).enumerate() {
        let first = batch * LAYER_BATCH;
        let done = chunk
            .par_iter_mut()
            .enumerate()
            .map(|(i, layer_lines)| {
                if cancel() {
                    return Err(Error::Cancelled);
                }
                let layer_id = first + i;
                let mut loops = make_loops(layer_lines, &params.gap_closing);
                apply_mode(&mut loops, params.mode_for_layer(layer_id));
                Ok(finish(layer_id, loops))
            })
            .collect::<Result<Vec<_>>>()?;
        layers.extend(done);
        progress(layers.len(), total);
    }
    Ok(layers)
}

/// Slice `mesh` at every height of the sorted `zs`, one list of closed loops
/// per height.
///
/// Loops are counter-clockwise around material and clockwise around holes.
/// An empty mesh yields empty layers.
pub fn slice_mesh<C>(
    mesh: &TriangleMesh,
    zs: &[CoordF],
    params: &MeshSlicingParams,
    cancel: C,
) -> Result<Vec<Polygons>>
where
    C: Fn() -> bool + Sync,
{
    check_sorted(zs)?;
    if mesh.is_empty() || zs.is_empty() {
        return Ok(vec![Polygons::new(); zs.len()]);
    }

    let mut lines = layer_lines(mesh, zs, params, &cancel)?;
    let layers = chain_layers(&mut lines, params, &cancel, |_, loops| loops, |_, _| {})?;

    debug!(
        "slice_mesh: {} facets, {} planes, {} loops",
        mesh.triangle_count(),
        zs.len(),
        layers.iter().map(Vec::len).sum::<usize>()
    );
    Ok(layers)
}

/// Slice `mesh` at every height of the sorted `zs`, one list of regions per
/// height.
pub fn slice_mesh_ex<C>(
    mesh: &TriangleMesh,
    zs: &[CoordF],
    params: &MeshSlicingParamsEx,
    cancel: C,
) -> Result<Vec<ExPolygons>>
where
    C: Fn() -> bool + Sync,
{
    slice_mesh_ex_with_progress(mesh, zs, params, cancel, |_, _| {})
}

/// [`slice_mesh_ex`] reporting `progress(layers_done, layers_total)` as
/// batches of layers finish. Facet slicing completes before the first report.
pub(crate) fn slice_mesh_ex_with_progress<C, P>(
    mesh: &TriangleMesh,
    zs: &[CoordF],
    params: &MeshSlicingParamsEx,
    cancel: C,
    mut progress: P,
) -> Result<Vec<ExPolygons>>
where
    C: Fn() -> bool + Sync,
    P: FnMut(usize, usize),
{
    params.validate()?;
    check_sorted(zs)?;
    if mesh.is_empty() || zs.is_empty() {
        progress(zs.len(), zs.len());
        return Ok(vec![ExPolygons::new(); zs.len()]);
    }

    let base = params.base.for_polygon_stage();
    let mut lines = layer_lines(mesh, zs, &base, &cancel)?;
    progress(0, zs.len());
    chain_layers(
        &mut lines,
        &base,
        &cancel,
        |layer_id, loops| make_regions(&loops, params, params.base.mode_for_layer(layer_id)),
        progress,
    )
}

/// Slice `mesh` at a single height.
///
/// Only the facets reaching `z` take part, which is much cheaper than
/// [`slice_mesh`] for one plane through a large mesh. The layer is sliced
/// with `params.mode`.
pub fn slice_mesh_at<C>(mesh: &TriangleMesh, z: CoordF, params: &MeshSlicingParams, cancel: C) -> Result<Polygons>
where
    C: Fn() -> bool + Sync,
{
    if mesh.is_empty() {
        return Ok(Polygons::new());
    }
    let vertices = transform_vertices(mesh, &params.trafo);
    let mut lines = slice_make_lines_at(mesh, &vertices, z, params.trafo.has_reflection(), &cancel)?;
    let mut loops = make_loops(&mut lines, &params.gap_closing);
    apply_mode(&mut loops, params.mode);
    Ok(loops)
}

/// Regions of `mesh` at a single height, see [`slice_mesh_at`].
pub fn slice_mesh_ex_at<C>(
    mesh: &TriangleMesh,
    z: CoordF,
    params: &MeshSlicingParamsEx,
    cancel: C,
) -> Result<ExPolygons>
where
    C: Fn() -> bool + Sync,
{
    params.validate()?;
    let loops = slice_mesh_at(mesh, z, &params.base.for_polygon_stage(), &cancel)?;
    if cancel() {
        return Err(Error::Cancelled);
    }
    Ok(make_regions(&loops, params, params.base.mode))
}

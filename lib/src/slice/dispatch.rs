//! Fan-out of facets to the planes they cross.
//!
//! Facets are sliced in parallel batches. Each batch collects its segments
//! locally, batches are then merged in order, so the per-layer buffers come
//! out the same on every run no matter how the work was scheduled. The
//! cancellation callback is polled once per batch.

use super::intersection::{lowest_vertex, slice_facet, z_range, FacetEdgeType, FacetSliceType, IntersectionLine};
use crate::geometry::{Point3F, Transform3D};
use crate::mesh::topology::{face_edge_ids_filtered, FaceEdgeIds};
use crate::mesh::{Triangle, TriangleMesh};
use crate::{Error, Result, SCALING_FACTOR};
use log::trace;
use rayon::prelude::*;
use std::ops::Range;

/// Number of facets sliced between two cancellation checks.
pub(crate) const FACET_BATCH: usize = 1 << 12;

/// Per-layer segment buffers.
pub type LayerLines = Vec<Vec<IntersectionLine>>;

/// Mesh vertices placed by `trafo`, X and Y scaled, Z in mm.
pub(crate) fn transform_vertices(mesh: &TriangleMesh, trafo: &Transform3D) -> Vec<Point3F> {
    let identity = trafo.is_identity(0.0);
    mesh.vertices()
        .par_iter()
        .map(|v| {
            let p = if identity { *v } else { trafo.apply(*v) };
            Point3F::new(p.x * SCALING_FACTOR, p.y * SCALING_FACTOR, p.z)
        })
        .collect()
}

#[inline]
pub(crate) fn facet_vertices(vertices: &[Point3F], tri: &Triangle) -> [Point3F; 3] {
    [
        vertices[tri.indices[0] as usize],
        vertices[tri.indices[1] as usize],
        vertices[tri.indices[2] as usize],
    ]
}

/// Plane heights have to come sorted ascending.
pub(crate) fn check_sorted(zs: &[f64]) -> Result<()> {
    if zs.windows(2).any(|w| !(w[0] <= w[1])) {
        return Err(Error::Slicing("plane heights must be sorted ascending".into()));
    }
    Ok(())
}

/// Indices of the planes in the sorted `zs` with `min_z <= z <= max_z`.
#[inline]
pub fn layer_range(zs: &[f64], min_z: f64, max_z: f64) -> Range<usize> {
    let first = zs.partition_point(|&z| z < min_z);
    let last = first + zs[first..].partition_point(|&z| z <= max_z);
    first..last
}

/// Slice one facet at every plane it spans.
///
/// Flat facets never make it into a slice: a flat facet always has a
/// non-flat neighbor which contributes the segment.
fn slice_facet_at_zs<F>(
    vertices: &[Point3F; 3],
    tri: &Triangle,
    edge_ids: &[Option<u32>; 3],
    zs: &[f64],
    mut emit: F,
) where
    F: FnMut(usize, IntersectionLine),
{
    let (min_z, max_z) = z_range(vertices);
    let idx_vertex_lowest = lowest_vertex(vertices, min_z);
    for layer in layer_range(zs, min_z, max_z) {
        if let (FacetSliceType::Slicing, Some(line)) = slice_facet(
            zs[layer],
            vertices,
            &tri.indices,
            edge_ids,
            idx_vertex_lowest,
            min_z == max_z,
        ) {
            if line.edge_type != FacetEdgeType::Horizontal {
                emit(layer, line);
            }
        }
    }
}

/// Slice every facet against the sorted plane heights `zs`.
///
/// With `reverse` every segment is flipped, which keeps the loops counter
/// clockwise for a mirroring placement.
pub(crate) fn slice_make_lines<C>(
    vertices: &[Point3F],
    indices: &[Triangle],
    edge_ids: &FaceEdgeIds,
    zs: &[f64],
    reverse: bool,
    cancel: &C,
) -> Result<LayerLines>
where
    C: Fn() -> bool + Sync,
{
    let batches = indices
        .par_chunks(FACET_BATCH)
        .enumerate()
        .map(|(batch, tris)| {
            if cancel() {
                return Err(Error::Cancelled);
            }
            let mut out: Vec<(usize, IntersectionLine)> = Vec::new();
            for (i, tri) in tris.iter().enumerate() {
                let face = batch * FACET_BATCH + i;
                slice_facet_at_zs(
                    &facet_vertices(vertices, tri),
                    tri,
                    &edge_ids[face],
                    zs,
                    |layer, line| out.push((layer, line)),
                );
            }
            Ok(out)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut lines: LayerLines = vec![Vec::new(); zs.len()];
    for (layer, mut line) in batches.into_iter().flatten() {
        if reverse {
            line.reverse();
        }
        lines[layer].push(line);
    }
    trace!(
        "sliced {} facets into {} segments over {} planes",
        indices.len(),
        lines.iter().map(Vec::len).sum::<usize>(),
        zs.len()
    );
    Ok(lines)
}

/// Side of a plane a vertex is on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Below,
    On,
    Above,
}

/// Slice at a single plane, looking only at the facets that reach it.
///
/// Vertices are classified once, facets completely above or below the plane
/// are dropped before edge ids are computed, so the topology work scales
/// with the cross-section instead of the whole mesh.
pub(crate) fn slice_make_lines_at<C>(
    mesh: &TriangleMesh,
    vertices: &[Point3F],
    z: f64,
    reverse: bool,
    cancel: &C,
) -> Result<Vec<IntersectionLine>>
where
    C: Fn() -> bool + Sync,
{
    let sides: Vec<Side> = vertices
        .par_iter()
        .map(|v| {
            if v.z < z {
                Side::Below
            } else if v.z > z {
                Side::Above
            } else {
                Side::On
            }
        })
        .collect();

    let candidates: Vec<bool> = mesh
        .indices()
        .par_iter()
        .map(|tri| {
            let s = tri.indices.map(|i| sides[i as usize]);
            !(s.iter().all(|&x| x == Side::Below) || s.iter().all(|&x| x == Side::Above))
        })
        .collect();

    if cancel() {
        return Err(Error::Cancelled);
    }

    let edge_ids = face_edge_ids_filtered(mesh, |face| candidates[face]);
    let faces: Vec<usize> = (0..candidates.len()).filter(|&f| candidates[f]).collect();
    trace!("plane {}: {} of {} facets reach it", z, faces.len(), candidates.len());

    let zs = [z];
    let batches = faces
        .par_chunks(FACET_BATCH)
        .map(|batch| {
            if cancel() {
                return Err(Error::Cancelled);
            }
            let mut out = Vec::new();
            for &face in batch {
                let tri = &mesh.indices()[face];
                slice_facet_at_zs(
                    &facet_vertices(vertices, tri),
                    tri,
                    &edge_ids[face],
                    &zs,
                    |_, line| out.push(line),
                );
            }
            Ok(out)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(batches
        .into_iter()
        .flatten()
        .map(|line| if reverse { line.reversed() } else { line })
        .collect())
}

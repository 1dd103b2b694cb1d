//! Slicing benchmarks
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use slicer::geometry::{Point3F, Transform3D};
use slicer::slice::{cut_mesh, project_mesh, slice_mesh, slice_mesh_ex, MeshSlicingParams, MeshSlicingParamsEx};
use slicer::TriangleMesh;

/// A grid of `n * n * n` unit cubes, 3 mm apart.
fn cube_grid(n: usize) -> TriangleMesh {
    let mut mesh = TriangleMesh::new();
    for i in 0..n {
        for j in 0..n {
            for k in 0..n {
                let min = Point3F::new(3.0 * i as f64, 3.0 * j as f64, 3.0 * k as f64);
                mesh.merge(&TriangleMesh::make_box(min, min + Point3F::new(2.0, 2.0, 2.0)));
            }
        }
    }
    mesh
}

fn layer_heights(max_z: f64, layer_height: f64) -> Vec<f64> {
    let n = (max_z / layer_height) as usize;
    (0..n).map(|i| (i as f64 + 0.5) * layer_height).collect()
}

fn slicing_benchmark(c: &mut Criterion) {
    let mesh = cube_grid(8);
    let zs = layer_heights(24.0, 0.2);

    c.bench_function("slice_mesh 8x8x8 cubes", |b| {
        b.iter(|| slice_mesh(black_box(&mesh), black_box(&zs), &MeshSlicingParams::default(), || false))
    });

    let params = MeshSlicingParamsEx::default().closing_radius(0.05);
    c.bench_function("slice_mesh_ex 8x8x8 cubes", |b| {
        b.iter(|| slice_mesh_ex(black_box(&mesh), black_box(&zs), &params, || false))
    });
}

fn cut_benchmark(c: &mut Criterion) {
    let mesh = cube_grid(8);
    c.bench_function("cut_mesh 8x8x8 cubes", |b| {
        b.iter(|| cut_mesh(black_box(&mesh), black_box(10.0), true, true, true))
    });
    c.bench_function("project_mesh 8x8x8 cubes", |b| {
        b.iter(|| project_mesh(black_box(&mesh), &Transform3D::default(), || false))
    });
}

criterion_group!(benches, slicing_benchmark, cut_benchmark);
criterion_main!(benches);

//! STL file loading and saving.
//!
//! Both ASCII and binary STL are read. Facets arrive unshared and are welded
//! into an indexed mesh, since slicing relies on shared vertex ids to find
//! face neighbors.

use super::TriangleMesh;
use crate::geometry::Point3F;
use crate::{Error, Result};
use log::debug;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

/// Load a triangle mesh from an STL file.
///
/// Automatically detects whether the file is ASCII or binary format.
pub fn load_stl<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
    let path = path.as_ref();
    let mut data = Vec::new();
    BufReader::new(File::open(path)?).read_to_end(&mut data)?;
    let mesh = parse_stl(&data)?;
    debug!(
        "loaded {}: {} vertices, {} triangles",
        path.display(),
        mesh.vertex_count(),
        mesh.triangle_count()
    );
    Ok(mesh)
}

/// Parse STL bytes held in memory.
pub fn parse_stl(data: &[u8]) -> Result<TriangleMesh> {
    let facets = if is_binary(data) {
        read_binary_facets(data)?
    } else {
        read_ascii_facets(data)?
    };
    if facets.is_empty() {
        return Err(Error::Mesh("No triangles found in STL file".into()));
    }
    Ok(TriangleMesh::from_facets(&facets))
}

/// Binary files may also start with "solid", so the size implied by the
/// facet count in the header decides.
fn is_binary(data: &[u8]) -> bool {
    if data.len() >= HEADER_LEN + 4 {
        let count = u32::from_le_bytes([data[80], data[81], data[82], data[83]]) as usize;
        if data.len() == HEADER_LEN + 4 + count * FACET_LEN {
            return true;
        }
    }
    let head = &data[..data.len().min(HEADER_LEN)];
    !String::from_utf8_lossy(head).trim_start().starts_with("solid")
}

fn read_ascii_facets(data: &[u8]) -> Result<Vec<[Point3F; 3]>> {
    let mut facets = Vec::new();
    let mut corners: Vec<Point3F> = Vec::with_capacity(3);

    for line in BufReader::new(data).lines() {
        let line = line?;
        let line = line.trim();

        if let Some(rest) = line.strip_prefix("vertex") {
            let coords = rest
                .split_whitespace()
                .take(3)
                .map(|s| {
                    s.parse::<f64>()
                        .map_err(|_| Error::Mesh(format!("Invalid vertex coordinate '{}'", s)))
                })
                .collect::<Result<Vec<f64>>>()?;
            if coords.len() != 3 {
                return Err(Error::Mesh(format!("Malformed vertex line '{}'", line)));
            }
            corners.push(Point3F::new(coords[0], coords[1], coords[2]));
        } else if line.starts_with("endfacet") {
            if corners.len() >= 3 {
                facets.push([corners[0], corners[1], corners[2]]);
            }
            corners.clear();
        }
    }

    Ok(facets)
}

fn read_binary_facets(data: &[u8]) -> Result<Vec<[Point3F; 3]>> {
    if data.len() < HEADER_LEN + 4 {
        return Err(Error::Mesh("Truncated binary STL header".into()));
    }
    let count = u32::from_le_bytes([data[80], data[81], data[82], data[83]]) as usize;
    let body = &data[HEADER_LEN + 4..];
    if body.len() < count * FACET_LEN {
        return Err(Error::Mesh(format!(
            "Binary STL declares {} facets but holds only {}",
            count,
            body.len() / FACET_LEN
        )));
    }

    // Each facet: normal (12 bytes), three corners (36 bytes), attribute (2 bytes).
    Ok(body
        .chunks_exact(FACET_LEN)
        .take(count)
        .map(|facet| {
            [
                read_vertex(&facet[12..24]),
                read_vertex(&facet[24..36]),
                read_vertex(&facet[36..48]),
            ]
        })
        .collect())
}

/// Read a vertex (3 little-endian floats) from bytes.
fn read_vertex(data: &[u8]) -> Point3F {
    let coord = |i: usize| {
        f32::from_le_bytes([data[i], data[i + 1], data[i + 2], data[i + 3]]) as f64
    };
    Point3F::new(coord(0), coord(4), coord(8))
}

/// Save a triangle mesh to a binary STL file.
pub fn save_stl<P: AsRef<Path>>(path: P, mesh: &TriangleMesh) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_stl(&mut writer, mesh)?;
    writer.flush()?;
    Ok(())
}

/// Write a mesh as binary STL.
pub fn write_stl<W: Write>(writer: &mut W, mesh: &TriangleMesh) -> Result<()> {
    let mut header = [0u8; HEADER_LEN];
    let tag = b"binary STL written by mesh-slicer";
    header[..tag.len()].copy_from_slice(tag);
    writer.write_all(&header)?;
    writer.write_all(&(mesh.triangle_count() as u32).to_le_bytes())?;

    for i in 0..mesh.triangle_count() {
        let normal = mesh.triangle_normal_raw(i).normalize();
        let [v0, v1, v2] = mesh.triangle_vertices(i);
        for p in [normal, v0, v1, v2] {
            for c in [p.x, p.y, p.z] {
                writer.write_all(&(c as f32).to_le_bytes())?;
            }
        }
        writer.write_all(&[0u8, 0u8])?;
    }
    Ok(())
}

//! Edge connectivity of an indexed triangle set.
//!
//! Edge `j` of a triangle runs from corner `j` to corner `(j + 1) % 3`. Two
//! triangles that share an edge get the same edge id, which is what lets the
//! segment chainer follow a cross-section from one facet to the next.

use super::TriangleMesh;
use rayon::prelude::*;

/// Per-face edge ids. `None` only on faces left out of the id assignment.
pub type FaceEdgeIds = Vec<[Option<u32>; 3]>;

/// Per-face neighbor across each edge, `None` for open edges.
pub type FaceNeighbors = Vec<[Option<u32>; 3]>;

/// Undirected edge key plus the face and signed 1-based edge slot.
/// A negative slot means the face walks the edge from high to low vertex.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct EdgeToFace {
    low: u32,
    high: u32,
    face: u32,
    slot: i8,
}

impl EdgeToFace {
    #[inline]
    fn same_edge(&self, other: &EdgeToFace) -> bool {
        self.low == other.low && self.high == other.high
    }

    #[inline]
    fn edge_index(&self) -> usize {
        (self.slot.unsigned_abs() - 1) as usize
    }
}

fn edge_map<F>(mesh: &TriangleMesh, face_filter: F) -> Vec<EdgeToFace>
where
    F: Fn(usize) -> bool,
{
    let mut edges = Vec::with_capacity(mesh.triangle_count() * 3);
    for (face, tri) in mesh.indices().iter().enumerate() {
        if !face_filter(face) {
            continue;
        }
        for j in 0..3 {
            let (a, b) = tri.edge(j);
            let slot = j as i8 + 1;
            edges.push(if a <= b {
                EdgeToFace { low: a, high: b, face: face as u32, slot }
            } else {
                EdgeToFace { low: b, high: a, face: face as u32, slot: -slot }
            });
        }
    }
    edges.par_sort_unstable();
    edges
}

/// Pair up coincident edges. An edge is matched with a not yet connected
/// partner of opposite orientation first, then with one of equal orientation
/// (flipped neighbor). Unmatched edges come back with `None`.
fn pair_edges(edges: &[EdgeToFace]) -> Vec<(EdgeToFace, Option<EdgeToFace>)> {
    let mut connected = vec![false; edges.len()];
    let mut pairs = Vec::with_capacity(edges.len() / 2 + 1);

    for i in 0..edges.len() {
        if connected[i] {
            continue;
        }
        let edge_i = edges[i];
        let candidates = (i + 1..edges.len()).take_while(|&j| edge_i.same_edge(&edges[j]));
        let partner = candidates
            .clone()
            .find(|&j| !connected[j] && (edge_i.slot > 0) != (edges[j].slot > 0))
            .or_else(|| candidates.clone().find(|&j| !connected[j]));

        if let Some(j) = partner {
            connected[j] = true;
        }
        pairs.push((edge_i, partner.map(|j| edges[j])));
    }
    pairs
}

/// Assign an id to every edge of the faces passing `face_filter`. An edge
/// shared by two faces gets one id for both, an open edge gets its own.
/// Faces rejected by the filter keep `None` on all edges.
pub fn face_edge_ids_filtered<F>(mesh: &TriangleMesh, face_filter: F) -> FaceEdgeIds
where
    F: Fn(usize) -> bool,
{
    let mut out = vec![[None; 3]; mesh.triangle_count()];
    let mut num_edges = 0u32;
    for (first, second) in pair_edges(&edge_map(mesh, face_filter)) {
        out[first.face as usize][first.edge_index()] = Some(num_edges);
        if let Some(second) = second {
            out[second.face as usize][second.edge_index()] = Some(num_edges);
        }
        num_edges += 1;
    }
    out
}

pub fn face_edge_ids(mesh: &TriangleMesh) -> FaceEdgeIds {
    face_edge_ids_filtered(mesh, |_| true)
}

/// Neighbor face across each edge, considering only faces passing the filter.
pub fn face_neighbors_filtered<F>(mesh: &TriangleMesh, face_filter: F) -> FaceNeighbors
where
    F: Fn(usize) -> bool,
{
    let mut out = vec![[None; 3]; mesh.triangle_count()];
    for (first, second) in pair_edges(&edge_map(mesh, face_filter)) {
        if let Some(second) = second {
            out[first.face as usize][first.edge_index()] = Some(second.face);
            out[second.face as usize][second.edge_index()] = Some(first.face);
        }
    }
    out
}

pub fn face_neighbors(mesh: &TriangleMesh) -> FaceNeighbors {
    face_neighbors_filtered(mesh, |_| true)
}

/// Edge ids derived from a neighbor table.
///
/// With `assign_unbound` every open edge also receives its own id, so the
/// result has no `None` entries at all. Returns the ids and the number of
/// ids handed out.
pub fn face_edge_ids_from_neighbors(
    mesh: &TriangleMesh,
    neighbors: &[[Option<u32>; 3]],
    assign_unbound: bool,
) -> (FaceEdgeIds, u32) {
    let mut out = vec![[None; 3]; neighbors.len()];
    let mut next_id = 0u32;

    for (i, tri_neighbors) in neighbors.iter().enumerate() {
        let tri = mesh.indices()[i];
        for j in 0..3 {
            match tri_neighbors[j] {
                Some(n) if n as usize > i => {
                    let other = mesh.indices()[n as usize];
                    let (a, b) = tri.edge(j);
                    let k = (0..3)
                        .find(|&k| other.edge(k) == (b, a))
                        .or_else(|| (0..3).find(|&k| other.edge(k) == (a, b)));
                    out[i][j] = Some(next_id);
                    if let Some(k) = k {
                        out[n as usize][k] = Some(next_id);
                    }
                    next_id += 1;
                }
                None if assign_unbound => {
                    out[i][j] = Some(next_id);
                    next_id += 1;
                }
                // Lower-indexed neighbors already assigned this edge.
                _ => {}
            }
        }
    }
    (out, next_id)
}

/// Number of face edges without a neighbor.
pub fn num_open_edges(neighbors: &[[Option<u32>; 3]]) -> usize {
    neighbors.iter().flatten().filter(|n| n.is_none()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point3F;
    use crate::mesh::Triangle;

    fn two_triangles() -> TriangleMesh {
        TriangleMesh::from_parts(
            vec![
                Point3F::new(0.0, 0.0, 0.0),
                Point3F::new(1.0, 0.0, 0.0),
                Point3F::new(1.0, 1.0, 0.0),
                Point3F::new(0.0, 1.0, 0.0),
            ],
            vec![Triangle::new(0, 1, 2), Triangle::new(0, 2, 3)],
        )
    }

    #[test]
    fn test_shared_edge_gets_common_id() {
        let mesh = two_triangles();
        let ids = face_edge_ids(&mesh);
        // Edge (2, 0) of face 0 is edge (0, 2) of face 1.
        assert!(ids[0][2].is_some());
        assert_eq!(ids[0][2], ids[1][0]);
        // Four open edges plus one shared edge.
        assert!(ids.iter().flatten().all(|id| id.is_some()));
        let mut distinct: Vec<u32> = ids.iter().flatten().flatten().copied().collect();
        distinct.sort_unstable();
        distinct.dedup();
        assert_eq!(distinct.len(), 5);
        assert_ne!(ids[0][0], ids[1][0]);
    }

    #[test]
    fn test_cube_is_closed() {
        let mesh = TriangleMesh::cube(2.0);
        let neighbors = face_neighbors(&mesh);
        assert_eq!(num_open_edges(&neighbors), 0);

        let ids = face_edge_ids(&mesh);
        assert!(ids.iter().flatten().all(|id| id.is_some()));
        let max = ids.iter().flatten().flatten().max().copied();
        assert_eq!(max, Some(17), "a triangulated cube has 18 edges");
    }

    #[test]
    fn test_neighbors_are_symmetric() {
        let mesh = TriangleMesh::cube(1.0);
        let neighbors = face_neighbors(&mesh);
        for (i, tri_neighbors) in neighbors.iter().enumerate() {
            for n in tri_neighbors.iter().flatten() {
                assert!(
                    neighbors[*n as usize].contains(&Some(i as u32)),
                    "face {} lists {} as neighbor but not vice versa",
                    i,
                    n
                );
            }
        }
    }

    #[test]
    fn test_filtered_neighbors_open_the_mesh() {
        let mesh = TriangleMesh::cube(1.0);
        // Keep only the two top triangles.
        let neighbors = face_neighbors_filtered(&mesh, |f| f == 2 || f == 3);
        assert_eq!(neighbors[2].iter().filter(|n| n.is_some()).count(), 1);
        assert!(neighbors[0].iter().all(|n| n.is_none()));
    }

    #[test]
    fn test_edge_ids_from_neighbors_assign_unbound() {
        let mesh = two_triangles();
        let neighbors = face_neighbors(&mesh);
        let (ids, n) = face_edge_ids_from_neighbors(&mesh, &neighbors, true);
        assert_eq!(n, 5);
        assert!(ids.iter().flatten().all(|id| id.is_some()));
        assert_eq!(ids[0][2], ids[1][0]);

        let (ids, n) = face_edge_ids_from_neighbors(&mesh, &neighbors, false);
        assert_eq!(n, 1);
        assert_eq!(ids.iter().flatten().filter(|id| id.is_some()).count(), 2);
    }
}

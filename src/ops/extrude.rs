use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::geometry::{Edge, Geometry};
use crate::types::Vec3;

/// Extrude options.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtrudeOptions {
    pub distance: f32,
    /// Use each vertex's own stored normal, rather than the averaged
    /// selection normal, as the displacement direction.
    pub use_normals: bool,
}

/// Extrudes the selected faces by `options.distance` along either their
/// own vertex normals or the averaged selection normal, stitching side
/// walls along the selection's boundary edges.
///
/// An empty selection is a no-op.
pub fn extrude(geo: &Geometry, selected_faces: &[usize], options: ExtrudeOptions) -> Geometry {
    if selected_faces.is_empty() {
        debug!("extrude: empty selection, no-op");
        return geo.clone();
    }

    let selected: HashSet<usize> = selected_faces.iter().copied().collect();

    let mut selected_vertices: HashSet<u32> = HashSet::new();
    for &f in &selected {
        for v in geo.triangle(f) {
            selected_vertices.insert(v);
        }
    }

    // Average selection normal: sum of geometric (position-derived) face
    // normals, normalized. Used when `use_normals` is false, and as the
    // fallback if a selected triangle degenerates to a zero-area normal.
    let mut avg_normal = Vec3::ZERO;
    for &f in &selected {
        let [a, b, c] = geo.triangle(f);
        let n = (geo.vertex(b) - geo.vertex(a)).cross(geo.vertex(c) - geo.vertex(a));
        avg_normal += n;
    }
    let avg_normal = if avg_normal.length_squared() > 0.0 { avg_normal.normalize() } else { Vec3::Z };

    // Clone every selected vertex.
    let mut clone_of: HashMap<u32, u32> = HashMap::new();
    let mut vertices = geo.vertices.clone();
    let mut normals = geo.normals.clone();
    let mut uvs = geo.uvs.clone();
    let mut vertex_count = geo.vertex_count;

    for &v in &selected_vertices {
        let n = if options.use_normals { geo.normal(v) } else { avg_normal };
        let n = if n.length_squared() > 0.0 { n } else { avg_normal };
        let new_pos = geo.vertex(v) + n * options.distance;
        let (u, w) = geo.uv(v);
        vertices.extend_from_slice(&[new_pos.x, new_pos.y, new_pos.z]);
        normals.extend_from_slice(&[n.x, n.y, n.z]);
        uvs.extend_from_slice(&[u, w]);
        clone_of.insert(v, vertex_count as u32);
        vertex_count += 1;
    }

    // Remap selected triangles onto the clones; unselected triangles pass through.
    let mut indices = Vec::with_capacity(geo.indices.len());
    for t in 0..geo.triangle_count() {
        let tri = geo.triangle(t);
        if selected.contains(&t) {
            indices.extend(tri.map(|v| clone_of[&v]));
        } else {
            indices.extend_from_slice(&tri);
        }
    }

    // Boundary edges of the selection: edges of a selected face not
    // shared with another selected face.
    let mut edge_owner_count: HashMap<Edge, u32> = HashMap::new();
    for &f in &selected {
        let tri = geo.triangle(f);
        for e in [Edge::new(tri[0], tri[1]), Edge::new(tri[1], tri[2]), Edge::new(tri[2], tri[0])] {
            *edge_owner_count.entry(e).or_insert(0) += 1;
        }
    }

    // Need the *directed* orientation of each boundary edge as it appears
    // in its owning selected triangle, so the side quad winds outward.
    let mut directed_boundary: Vec<(u32, u32)> = Vec::new();
    for &f in &selected {
        let tri = geo.triangle(f);
        for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
            if edge_owner_count[&Edge::new(a, b)] == 1 {
                directed_boundary.push((a, b));
            }
        }
    }

    for (a, b) in directed_boundary {
        let a2 = clone_of[&a];
        let b2 = clone_of[&b];
        // quad a -> b -> b' -> a', split into two triangles, CCW outward.
        indices.extend_from_slice(&[a, b, b2]);
        indices.extend_from_slice(&[a, b2, a2]);
    }

    debug!(
        selected_faces = selected.len(),
        cloned_vertices = selected_vertices.len(),
        "extrude"
    );

    let mut result = Geometry {
        vertices,
        normals,
        uvs,
        indices,
        vertex_count,
        edges: Vec::new(),
        faces: Vec::new(),
    };
    result.rebuild_derived();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Geometry {
        Geometry::from_buffers(
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0],
            vec![0, 1, 2, 0, 2, 3],
        )
        .unwrap()
    }

    #[test]
    fn empty_selection_is_noop() {
        let geo = quad();
        let out = extrude(&geo, &[], ExtrudeOptions { distance: 1.0, use_normals: false });
        assert_eq!(out, geo);
    }

    #[test]
    fn extrude_lifts_selected_vertices_and_adds_side_walls() {
        let geo = quad();
        let out = extrude(&geo, &[0, 1], ExtrudeOptions { distance: 2.0, use_normals: false });
        // 4 original + 4 clones
        assert_eq!(out.vertex_count, 8);
        // top cap (2 tris) + 4 side walls (8 tris) = 10
        assert_eq!(out.triangle_count(), 10);
        for i in 4..8u32 {
            assert!((out.vertex(i).z - 2.0).abs() < 1e-5);
        }
    }

    #[test]
    fn single_face_extrude_has_four_boundary_side_walls() {
        let geo = quad();
        let out = extrude(&geo, &[0], ExtrudeOptions { distance: 1.0, use_normals: false });
        // triangle 0 has all 3 edges as boundary (no neighbor selected)
        assert_eq!(out.triangle_count(), 1 /* original face 1 */ + 1 /* cap */ + 3 * 2 /* walls */);
    }
}

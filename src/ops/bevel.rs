use std::collections::HashMap;

use tracing::{debug, warn};

use crate::geometry::{Edge, Geometry};

/// Bevel (chamfer approximation) options.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BevelOptions {
    pub amount: f32,
    /// Accepted but implemented as a single ring regardless of value.
    /// A documented simplification.
    pub segments: u32,
}

/// Chamfers each selected edge: clones its endpoints outward along the
/// per-face perpendicular and stitches a ribbon between original and
/// clone. `segments > 1` is accepted but collapsed to one ring.
pub fn bevel(geo: &Geometry, selected_edges: &[Edge], options: BevelOptions) -> Geometry {
    if selected_edges.is_empty() {
        debug!("bevel: empty selection, no-op");
        return geo.clone();
    }
    if options.segments > 1 {
        warn!(segments = options.segments, "bevel: segments > 1 collapsed to a single ring (documented limitation)");
    }

    let mut vertices = geo.vertices.clone();
    let mut normals = geo.normals.clone();
    let mut uvs = geo.uvs.clone();
    let mut vertex_count = geo.vertex_count;

    let mut reroute: HashMap<u32, u32> = HashMap::new();
    let mut ribbon_indices: Vec<u32> = Vec::new();

    for &edge in selected_edges {
        let (a, b) = (edge.a, edge.b);
        let adjacent_faces: Vec<usize> = (0..geo.triangle_count())
            .filter(|&t| {
                let tri = geo.triangle(t);
                tri.contains(&a) && tri.contains(&b)
            })
            .collect();
        if adjacent_faces.is_empty() {
            continue;
        }

        let edge_dir = (geo.vertex(b) - geo.vertex(a)).normalize();
        let mut first_clone: Option<(u32, u32)> = None;

        for &face in &adjacent_faces {
            let [fa, fb, fc] = geo.triangle(face);
            let face_normal = (geo.vertex(fb) - geo.vertex(fa)).cross(geo.vertex(fc) - geo.vertex(fa));
            let face_normal = if face_normal.length_squared() > 0.0 { face_normal.normalize() } else { continue };
            let perp = edge_dir.cross(face_normal);
            let perp = if perp.length_squared() > 0.0 { perp.normalize() } else { continue };
            let offset = perp * options.amount;

            let (ua, va) = geo.uv(a);
            let (ub, vb) = geo.uv(b);
            let na = geo.normal(a);
            let nb = geo.normal(b);

            let clone_a = vertex_count as u32;
            let pos_a = geo.vertex(a) + offset;
            vertices.extend_from_slice(&[pos_a.x, pos_a.y, pos_a.z]);
            normals.extend_from_slice(&[na.x, na.y, na.z]);
            uvs.extend_from_slice(&[ua, va]);
            vertex_count += 1;

            let clone_b = vertex_count as u32;
            let pos_b = geo.vertex(b) + offset;
            vertices.extend_from_slice(&[pos_b.x, pos_b.y, pos_b.z]);
            normals.extend_from_slice(&[nb.x, nb.y, nb.z]);
            uvs.extend_from_slice(&[ub, vb]);
            vertex_count += 1;

            ribbon_indices.extend_from_slice(&[a, b, clone_b]);
            ribbon_indices.extend_from_slice(&[a, clone_b, clone_a]);

            if first_clone.is_none() {
                first_clone = Some((clone_a, clone_b));
            }
        }

        if let Some((ca, cb)) = first_clone {
            reroute.insert(a, ca);
            reroute.insert(b, cb);
        }
    }

    let mut indices = Vec::with_capacity(geo.indices.len() + ribbon_indices.len());
    for t in 0..geo.triangle_count() {
        let tri = geo.triangle(t);
        indices.extend(tri.map(|v| *reroute.get(&v).unwrap_or(&v)));
    }
    indices.extend(ribbon_indices);

    debug!(edges = selected_edges.len(), "bevel");

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
        let out = bevel(&geo, &[], BevelOptions { amount: 0.1, segments: 1 });
        assert_eq!(out, geo);
    }

    #[test]
    fn beveling_shared_edge_adds_clones_and_ribbon() {
        let geo = quad();
        let out = bevel(&geo, &[Edge::new(0, 2)], BevelOptions { amount: 0.1, segments: 1 });
        // 4 original + 2 clones per adjacent face * 2 faces = 8
        assert_eq!(out.vertex_count, 8);
        // 2 original tris + 2 ribbon tris per adjacent face (2 faces) = 6
        assert_eq!(out.triangle_count(), 6);
    }

    #[test]
    fn segments_greater_than_one_does_not_panic() {
        let geo = quad();
        let out = bevel(&geo, &[Edge::new(0, 1)], BevelOptions { amount: 0.1, segments: 4 });
        assert!(out.triangle_count() >= geo.triangle_count());
    }
}

use std::collections::HashMap;

use tracing::debug;

use crate::geometry::{Edge, Geometry};
use crate::types::Vec3;

/// Subdivide options.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SubdivideOptions {
    pub iterations: u32,
    /// Catmull-Clark-flavored smoothing pass after each split.
    pub smooth: bool,
}

/// 1-to-4 triangle subdivision, optionally smoothed, run `iterations`
/// times. `iterations = 0` is a no-op.
pub fn subdivide(geo: &Geometry, options: SubdivideOptions) -> Geometry {
    let mut current = geo.clone();
    for _ in 0..options.iterations {
        current = subdivide_once(&current, options.smooth);
    }
    debug!(iterations = options.iterations, triangles = current.triangle_count(), "subdivide");
    current
}

fn subdivide_once(geo: &Geometry, smooth: bool) -> Geometry {
    let mut vertices = geo.vertices.clone();
    let mut normals = geo.normals.clone();
    let mut uvs = geo.uvs.clone();
    let mut vertex_count = geo.vertex_count;

    let mut midpoint_of: HashMap<Edge, u32> = HashMap::new();
    let mut push_midpoint = |a: u32, b: u32,
                             vertices: &mut Vec<f32>,
                             normals: &mut Vec<f32>,
                             uvs: &mut Vec<f32>,
                             vertex_count: &mut usize,
                             geo: &Geometry|
     -> u32 {
        *midpoint_of.entry(Edge::new(a, b)).or_insert_with(|| {
            let pos = geo.vertex(a).lerp(geo.vertex(b), 0.5);
            let n = geo.normal(a).lerp(geo.normal(b), 0.5);
            let n = if n.length_squared() > 0.0 { n.normalize() } else { Vec3::ZERO };
            let (ua, va) = geo.uv(a);
            let (ub, vb) = geo.uv(b);
            let uv = (ua + (ub - ua) * 0.5, va + (vb - va) * 0.5);
            let idx = *vertex_count as u32;
            vertices.extend_from_slice(&[pos.x, pos.y, pos.z]);
            normals.extend_from_slice(&[n.x, n.y, n.z]);
            uvs.extend_from_slice(&[uv.0, uv.1]);
            *vertex_count += 1;
            idx
        })
    };

    let mut indices = Vec::with_capacity(geo.indices.len() * 4);
    for t in 0..geo.triangle_count() {
        let [a, b, c] = geo.triangle(t);
        let mab = push_midpoint(a, b, &mut vertices, &mut normals, &mut uvs, &mut vertex_count, geo);
        let mbc = push_midpoint(b, c, &mut vertices, &mut normals, &mut uvs, &mut vertex_count, geo);
        let mca = push_midpoint(c, a, &mut vertices, &mut normals, &mut uvs, &mut vertex_count, geo);

        indices.extend_from_slice(&[a, mab, mca]);
        indices.extend_from_slice(&[b, mbc, mab]);
        indices.extend_from_slice(&[c, mca, mbc]);
        indices.extend_from_slice(&[mab, mbc, mca]);
    }

    if smooth {
        let original_count = geo.vertex_count;
        let midpoint_ids: std::collections::HashSet<u32> = midpoint_of.values().copied().collect();

        // Adjacency: every vertex connected to `v` by a *new* edge.
        let mut adjacency: HashMap<u32, Vec<u32>> = HashMap::new();
        for t in 0..(indices.len() / 3) {
            let base = t * 3;
            let tri = [indices[base], indices[base + 1], indices[base + 2]];
            for (x, y) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                adjacency.entry(x).or_default().push(y);
                adjacency.entry(y).or_default().push(x);
            }
        }

        let mut smoothed_positions: Vec<(u32, Vec3)> = Vec::new();
        for v in 0..original_count as u32 {
            if midpoint_ids.contains(&v) {
                continue;
            }
            let Some(neighbors) = adjacency.get(&v) else { continue };
            if neighbors.is_empty() {
                continue;
            }
            let sum: Vec3 = neighbors
                .iter()
                .map(|&n| Vec3::new(vertices[n as usize * 3], vertices[n as usize * 3 + 1], vertices[n as usize * 3 + 2]))
                .sum();
            let centroid = sum / neighbors.len() as f32;
            let old = Vec3::new(vertices[v as usize * 3], vertices[v as usize * 3 + 1], vertices[v as usize * 3 + 2]);
            let new_pos = old.lerp(centroid, 0.25);
            smoothed_positions.push((v, new_pos));
        }
        for (v, pos) in smoothed_positions {
            let base = v as usize * 3;
            vertices[base] = pos.x;
            vertices[base + 1] = pos.y;
            vertices[base + 2] = pos.z;
        }
    }

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

    fn triangle() -> Geometry {
        Geometry::from_buffers(
            vec![0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 2.0, 0.0],
            vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            vec![0, 1, 2],
        )
        .unwrap()
    }

    #[test]
    fn zero_iterations_is_identity() {
        let geo = triangle();
        let out = subdivide(&geo, SubdivideOptions { iterations: 0, smooth: false });
        assert_eq!(out, geo);
    }

    #[test]
    fn one_iteration_quadruples_triangle_count() {
        let geo = triangle();
        let out = subdivide(&geo, SubdivideOptions { iterations: 1, smooth: false });
        assert_eq!(out.triangle_count(), 4);
        assert_eq!(out.vertex_count, 6); // 3 original + 3 midpoints
    }

    #[test]
    fn two_iterations_give_sixteen_times_triangle_count() {
        let geo = triangle();
        let out = subdivide(&geo, SubdivideOptions { iterations: 2, smooth: false });
        assert_eq!(out.triangle_count(), 16);
    }

    #[test]
    fn smoothing_moves_original_vertex_toward_neighbors() {
        let geo = triangle();
        let out = subdivide(&geo, SubdivideOptions { iterations: 1, smooth: true });
        // vertex 0 should have moved off its original exact position.
        let moved = out.vertex(0);
        assert!(moved.distance(Vec3::ZERO) > 1e-6);
    }

    #[test]
    fn midpoints_are_shared_across_adjacent_triangles() {
        let geo = Geometry::from_buffers(
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0],
            vec![0, 1, 2, 0, 2, 3],
        )
        .unwrap();
        let out = subdivide(&geo, SubdivideOptions { iterations: 1, smooth: false });
        // shared diagonal edge (0,2) contributes exactly one midpoint.
        assert_eq!(out.vertex_count, 4 + 5);
    }
}

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::geometry::Geometry;
use crate::picking::intersect_segment_triangle;
use crate::types::Vec3;

/// Knife cut options. The angle constraint is stored but not
/// enforced by the kernel. Out-of-angle cuts are a host-level concern.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KnifeOptions {
    pub through_cut: bool,
    pub angle_constraint: Option<f32>,
}

const NEAR_VERTEX_BARY: f32 = 0.95;
const THROUGH_EXTENSION: f32 = 1000.0;
const KNIFE_EPSILON: f32 = 1e-6;

/// A recorded cut on one local edge of a triangle: `(i, j)` are the
/// triangle-local vertex indices (0, 1, or 2) of the edge, `t` is the cut
/// parameter from `i` to `j`.
#[derive(Clone, Copy)]
struct LocalCut {
    i: usize,
    j: usize,
    t: f32,
}

/// Cuts `geo` along the world-space polyline `path`. A
/// path shorter than two points is a no-op. A
/// triangle hit by three or more distinct cut edges falls back to being
/// kept unchanged.
pub fn knife(geo: &Geometry, path: &[Vec3], options: KnifeOptions) -> Geometry {
    if path.len() < 2 {
        debug!("knife: path shorter than two points, no-op");
        return geo.clone();
    }

    let segments: Vec<(Vec3, Vec3)> = path
        .windows(2)
        .map(|w| {
            let (mut p0, mut p1) = (w[0], w[1]);
            if options.through_cut {
                let dir = (p1 - p0).normalize_or_zero();
                p0 -= dir * THROUGH_EXTENSION;
                p1 += dir * THROUGH_EXTENSION;
            }
            (p0, p1)
        })
        .collect();

    let mut cuts_per_triangle: HashMap<usize, Vec<LocalCut>> = HashMap::new();
    for t in 0..geo.triangle_count() {
        let [a, b, c] = geo.triangle(t);
        let (va, vb, vc) = (geo.vertex(a), geo.vertex(b), geo.vertex(c));
        for &(p0, p1) in &segments {
            let Some((_, u, v)) = intersect_segment_triangle(p0, p1, va, vb, vc, KNIFE_EPSILON) else { continue };
            let bary = [1.0 - u - v, u, v];
            if bary.iter().any(|&w| w > NEAR_VERTEX_BARY) {
                continue;
            }
            let k = (0..3).min_by(|&x, &y| bary[x].total_cmp(&bary[y])).unwrap();
            let mut edge_locals: Vec<usize> = (0..3).filter(|&x| x != k).collect();
            edge_locals.sort_unstable();
            let (i, j) = (edge_locals[0], edge_locals[1]);
            let tparam = bary[i] / (bary[i] + bary[j]);

            let entry = cuts_per_triangle.entry(t).or_default();
            if !entry.iter().any(|c| c.i == i && c.j == j) {
                entry.push(LocalCut { i, j, t: tparam });
            }
        }
    }

    let mut vertices = geo.vertices.clone();
    let mut normals = geo.normals.clone();
    let mut uvs = geo.uvs.clone();
    let mut vertex_count = geo.vertex_count;
    let mut indices = Vec::with_capacity(geo.indices.len());

    let mut push_cut_vertex = |tri: [u32; 3], cut: LocalCut,
                               vertices: &mut Vec<f32>,
                               normals: &mut Vec<f32>,
                               uvs: &mut Vec<f32>,
                               vertex_count: &mut usize|
     -> u32 {
        let (vi, vj) = (tri[cut.i], tri[cut.j]);
        let pos = geo.vertex(vi).lerp(geo.vertex(vj), cut.t);
        let n = geo.normal(vi).lerp(geo.normal(vj), cut.t);
        let n = if n.length_squared() > 0.0 { n.normalize() } else { Vec3::ZERO };
        let (ui, wi) = geo.uv(vi);
        let (uj, wj) = geo.uv(vj);
        let idx = *vertex_count as u32;
        vertices.extend_from_slice(&[pos.x, pos.y, pos.z]);
        normals.extend_from_slice(&[n.x, n.y, n.z]);
        uvs.extend_from_slice(&[ui + (uj - ui) * cut.t, wi + (wj - wi) * cut.t]);
        *vertex_count += 1;
        idx
    };

    for t in 0..geo.triangle_count() {
        let tri = geo.triangle(t);
        match cuts_per_triangle.get(&t) {
            None => indices.extend_from_slice(&tri),
            Some(cuts) if cuts.len() == 1 => {
                let cut = cuts[0];
                let opposite_local = (0..3).find(|&x| x != cut.i && x != cut.j).unwrap();
                let opposite = tri[opposite_local];
                let new_v = push_cut_vertex(tri, cut, &mut vertices, &mut normals, &mut uvs, &mut vertex_count);
                let (vi, vj) = (tri[cut.i], tri[cut.j]);
                indices.extend_from_slice(&[opposite, vi, new_v]);
                indices.extend_from_slice(&[opposite, new_v, vj]);
            }
            Some(cuts) if cuts.len() == 2 => {
                // any two edges of a triangle share exactly one vertex;
                // "opposite edges" never occurs for a 3-edge polygon.
                let (c1, c2) = (cuts[0], cuts[1]);
                let shared_local = [c1.i, c1.j].into_iter().find(|x| *x == c2.i || *x == c2.j).unwrap();
                let o1_local = if c1.i == shared_local { c1.j } else { c1.i };
                let o2_local = if c2.i == shared_local { c2.j } else { c2.i };

                let shared = tri[shared_local];
                let o1 = tri[o1_local];
                let o2 = tri[o2_local];
                let n1 = push_cut_vertex(tri, c1, &mut vertices, &mut normals, &mut uvs, &mut vertex_count);
                let n2 = push_cut_vertex(tri, c2, &mut vertices, &mut normals, &mut uvs, &mut vertex_count);

                indices.extend_from_slice(&[shared, n1, n2]);
                indices.extend_from_slice(&[n1, o1, o2]);
                indices.extend_from_slice(&[n1, o2, n2]);
            }
            Some(_) => {
                warn!(triangle = t, "knife: 3+ cuts in one triangle, keeping original (documented limitation)");
                indices.extend_from_slice(&tri);
            }
        }
    }

    debug!(segments = segments.len(), cut_triangles = cuts_per_triangle.len(), "knife");

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

/// Flattens a projector mesh's boundary into a closed polyline (walking
/// its boundary edges) and cuts `geo` with it, always through-cut.
pub fn knife_project(geo: &Geometry, projector: &Geometry) -> Geometry {
    let boundary = projector.boundary_edges();
    if boundary.is_empty() {
        return geo.clone();
    }
    let mut adjacency: HashMap<u32, Vec<u32>> = HashMap::new();
    for e in &boundary {
        adjacency.entry(e.a).or_default().push(e.b);
        adjacency.entry(e.b).or_default().push(e.a);
    }
    let start = boundary[0].a;
    let mut path = vec![start];
    let mut visited = std::collections::HashSet::new();
    visited.insert(start);
    let mut current = start;
    loop {
        let Some(neighbors) = adjacency.get(&current) else { break };
        let Some(&next) = neighbors.iter().find(|n| !visited.contains(n)) else { break };
        path.push(next);
        visited.insert(next);
        current = next;
    }
    let points: Vec<Vec3> = path.iter().map(|&v| projector.vertex(v)).collect();
    knife(geo, &points, KnifeOptions { through_cut: true, angle_constraint: None })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xz_quad() -> Geometry {
        Geometry::from_buffers(
            vec![-1.0, 0.0, -1.0, 1.0, 0.0, -1.0, 1.0, 0.0, 1.0, -1.0, 0.0, 1.0],
            vec![0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0],
            vec![0, 1, 2, 0, 2, 3],
        )
        .unwrap()
    }

    #[test]
    fn short_path_is_noop() {
        let geo = xz_quad();
        let out = knife(&geo, &[Vec3::ZERO], KnifeOptions { through_cut: true, angle_constraint: None });
        assert_eq!(out, geo);
    }

    #[test]
    fn cutting_through_the_diagonal_adds_vertices_and_triangles() {
        let geo = xz_quad();
        let path = [Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)];
        let out = knife(&geo, &path, KnifeOptions { through_cut: true, angle_constraint: None });
        assert!(out.triangle_count() >= 4, "expected at least 4 triangles, got {}", out.triangle_count());
        assert!(out.vertex_count > geo.vertex_count);
    }

    #[test]
    fn cutting_preserves_total_area() {
        let geo = xz_quad();
        let path = [Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)];
        let out = knife(&geo, &path, KnifeOptions { through_cut: true, angle_constraint: None });

        let area = |g: &Geometry| -> f32 {
            (0..g.triangle_count())
                .map(|t| {
                    let [a, b, c] = g.triangle(t);
                    0.5 * (g.vertex(b) - g.vertex(a)).cross(g.vertex(c) - g.vertex(a)).length()
                })
                .sum()
        };
        assert!((area(&geo) - area(&out)).abs() < 1e-4);
    }
}

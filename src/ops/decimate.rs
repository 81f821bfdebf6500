use std::collections::HashSet;

use rayon::prelude::*;
use tracing::debug;

use crate::config::KernelConfig;
use crate::geometry::{Edge, Geometry};
use crate::types::Vec3;

/// Decimate mode. `Planar` and `Unsubdivide` are accepted but alias
/// `Collapse` in this core. Distinguishing them would need a feature
/// classifier this kernel doesn't carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DecimateMode {
    Collapse,
    Planar,
    Unsubdivide,
}

/// Decimate options.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecimateOptions {
    /// Fraction of the original triangle count to retain, `0.0..=1.0`.
    pub target_ratio: f32,
    pub mode: DecimateMode,
}

const MIN_TRIANGLES: usize = 4;

/// A symmetric 4x4 error quadric stored as its 10 distinct entries:
/// `[q00, q01, q02, q03, q11, q12, q13, q22, q23, q33]`.
type Quadric = [f32; 10];

fn plane_quadric(n: Vec3, d: f32) -> Quadric {
    [
        n.x * n.x,
        n.x * n.y,
        n.x * n.z,
        n.x * d,
        n.y * n.y,
        n.y * n.z,
        n.y * d,
        n.z * n.z,
        n.z * d,
        d * d,
    ]
}

fn add_quadric(a: Quadric, b: Quadric) -> Quadric {
    std::array::from_fn(|i| a[i] + b[i])
}

fn eval_quadric(q: Quadric, p: Vec3) -> f32 {
    q[0] * p.x * p.x
        + 2.0 * q[1] * p.x * p.y
        + 2.0 * q[2] * p.x * p.z
        + 2.0 * q[3] * p.x
        + q[4] * p.y * p.y
        + 2.0 * q[5] * p.y * p.z
        + 2.0 * q[6] * p.y
        + q[7] * p.z * p.z
        + 2.0 * q[8] * p.z
        + q[9]
}

/// QEM edge-collapse decimation. Accumulates a plane
/// quadric per vertex from its incident faces, then repeatedly collapses
/// the edge whose midpoint minimizes combined quadric error, a cheaper
/// substitute for solving the optimal collapse position, chosen because
/// midpoint evaluation is numerically stable on degenerate quadrics.
/// Never reduces below 4 triangles.
pub fn decimate(geo: &Geometry, options: DecimateOptions) -> Geometry {
    decimate_with_config(geo, options, &KernelConfig::default())
}

pub fn decimate_with_config(geo: &Geometry, options: DecimateOptions, config: &KernelConfig) -> Geometry {
    let triangle_count = geo.triangle_count();
    let target = ((triangle_count as f32 * options.target_ratio.clamp(0.0, 1.0)).floor() as usize).max(MIN_TRIANGLES);
    if triangle_count <= target {
        debug!("decimate: already at or below target, no-op");
        return geo.clone();
    }

    let mut positions: Vec<Vec3> = (0..geo.vertex_count as u32).map(|v| geo.vertex(v)).collect();
    let mut alive: Vec<bool> = vec![true; geo.vertex_count];
    let mut indices: Vec<u32> = geo.indices.clone();

    let face_quadrics: Vec<(u32, u32, u32, Quadric)> = {
        let build = |t: usize| -> (u32, u32, u32, Quadric) {
            let b = t * 3;
            let (a, bi, c) = (indices[b], indices[b + 1], indices[b + 2]);
            let (pa, pb, pc) = (positions[a as usize], positions[bi as usize], positions[c as usize]);
            let normal = (pb - pa).cross(pc - pa);
            let normal = normal.try_normalize().unwrap_or(Vec3::ZERO);
            let d = -normal.dot(pa);
            (a, bi, c, plane_quadric(normal, d))
        };
        if config.parallel && triangle_count >= config.parallel_threshold {
            (0..indices.len() / 3).into_par_iter().map(build).collect()
        } else {
            (0..indices.len() / 3).map(build).collect()
        }
    };

    let mut quadrics: Vec<Quadric> = vec![[0.0; 10]; geo.vertex_count];
    for (a, b, c, q) in face_quadrics {
        quadrics[a as usize] = add_quadric(quadrics[a as usize], q);
        quadrics[b as usize] = add_quadric(quadrics[b as usize], q);
        quadrics[c as usize] = add_quadric(quadrics[c as usize], q);
    }

    let mut current_triangle_count = indices.len() / 3;
    let mut collapses = 0usize;

    while current_triangle_count > target {
        let mut edges: HashSet<Edge> = HashSet::new();
        for t in 0..indices.len() / 3 {
            let b = t * 3;
            let (x, y, z) = (indices[b], indices[b + 1], indices[b + 2]);
            edges.insert(Edge::new(x, y));
            edges.insert(Edge::new(y, z));
            edges.insert(Edge::new(z, x));
        }

        let mut best: Option<(Edge, f32, Vec3)> = None;
        for edge in edges {
            if !alive[edge.a as usize] || !alive[edge.b as usize] {
                continue;
            }
            let combined = add_quadric(quadrics[edge.a as usize], quadrics[edge.b as usize]);
            let midpoint = (positions[edge.a as usize] + positions[edge.b as usize]) * 0.5;
            let cost = eval_quadric(combined, midpoint);
            if best.as_ref().map(|(_, c, _)| cost < *c).unwrap_or(true) {
                best = Some((edge, cost, midpoint));
            }
        }

        let Some((edge, _, midpoint)) = best else {
            debug!("decimate: no collapsible edges remain, stopping early");
            break;
        };

        let (survivor, removed) = (edge.a, edge.b);
        positions[survivor as usize] = midpoint;
        quadrics[survivor as usize] = add_quadric(quadrics[survivor as usize], quadrics[removed as usize]);
        alive[removed as usize] = false;

        let mut rebuilt = Vec::with_capacity(indices.len());
        for t in 0..indices.len() / 3 {
            let b = t * 3;
            let tri = [
                if indices[b] == removed { survivor } else { indices[b] },
                if indices[b + 1] == removed { survivor } else { indices[b + 1] },
                if indices[b + 2] == removed { survivor } else { indices[b + 2] },
            ];
            if tri[0] != tri[1] && tri[1] != tri[2] && tri[0] != tri[2] {
                rebuilt.extend_from_slice(&tri);
            }
        }
        indices = rebuilt;
        current_triangle_count = indices.len() / 3;
        collapses += 1;
    }

    // compact: drop dead vertices and remap indices.
    let mut new_index_of = vec![u32::MAX; geo.vertex_count];
    let mut vertices = Vec::new();
    let mut normals = Vec::new();
    let mut uvs = Vec::new();
    for v in 0..geo.vertex_count as u32 {
        if !alive[v as usize] {
            continue;
        }
        let idx = (vertices.len() / 3) as u32;
        new_index_of[v as usize] = idx;
        let p = positions[v as usize];
        vertices.extend_from_slice(&[p.x, p.y, p.z]);
        let n = geo.normal(v);
        normals.extend_from_slice(&[n.x, n.y, n.z]);
        let (u, w) = geo.uv(v);
        uvs.extend_from_slice(&[u, w]);
    }
    for i in indices.iter_mut() {
        *i = new_index_of[*i as usize];
    }
    let vertex_count = vertices.len() / 3;

    debug!(mode = ?options.mode, collapses, target, "decimate");

    let mut result = Geometry { vertices, normals, uvs, indices, vertex_count, edges: Vec::new(), faces: Vec::new() };
    result.recompute_vertex_normals_with(config);
    result.rebuild_derived();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn octahedron() -> Geometry {
        // 6 vertices, 8 triangles
        let v = vec![
            1.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, -1.0,
        ];
        let indices = vec![
            0, 2, 4, 2, 1, 4, 1, 3, 4, 3, 0, 4, 2, 0, 5, 1, 2, 5, 3, 1, 5, 0, 3, 5,
        ];
        let normals = vec![0.0; v.len()];
        let uvs = vec![0.0; v.len() / 3 * 2];
        let mut geo = Geometry::from_buffers(v, normals, uvs, indices).unwrap();
        geo.recompute_vertex_normals();
        geo
    }

    #[test]
    fn target_at_or_above_input_is_noop() {
        let geo = octahedron();
        let out = decimate(&geo, DecimateOptions { target_ratio: 1.0, mode: DecimateMode::Collapse });
        assert_eq!(out.triangle_count(), geo.triangle_count());
    }

    #[test]
    fn decimate_reduces_triangle_count() {
        let geo = octahedron();
        let out = decimate(&geo, DecimateOptions { target_ratio: 0.5, mode: DecimateMode::Collapse });
        assert!(out.triangle_count() < geo.triangle_count());
        assert!(out.triangle_count() >= MIN_TRIANGLES);
    }

    #[test]
    fn decimate_never_drops_below_four_triangles() {
        let geo = octahedron();
        let out = decimate(&geo, DecimateOptions { target_ratio: 0.0, mode: DecimateMode::Collapse });
        assert!(out.triangle_count() >= MIN_TRIANGLES);
    }

    #[test]
    fn planar_mode_aliases_collapse() {
        let geo = octahedron();
        let a = decimate(&geo, DecimateOptions { target_ratio: 0.5, mode: DecimateMode::Planar });
        let b = decimate(&geo, DecimateOptions { target_ratio: 0.5, mode: DecimateMode::Collapse });
        assert_eq!(a.triangle_count(), b.triangle_count());
    }
}

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::geometry::{Edge, Geometry};
use crate::types::Vec3;

/// Shape applied to the interpolation parameter when placing intermediate
/// rings between two bridged loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BlendCurve {
    Linear,
    Smooth,
    Sphere,
}

fn apply_blend(t: f32, curve: BlendCurve) -> f32 {
    match curve {
        BlendCurve::Linear => t,
        BlendCurve::Smooth => t * t * (3.0 - 2.0 * t),
        BlendCurve::Sphere => 0.5 * (1.0 - (2.0 * t - 1.0).powi(2)).max(0.0).sqrt() + 0.5,
    }
}

/// Bridge options.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BridgeOptions {
    /// Extra rotation offset applied when pairing vertices of the two
    /// loops, in vertex steps. A nonzero twist disables the automatic
    /// alignment search.
    pub twist: i32,
    /// Number of intermediate rings inserted between the two loops.
    pub segments: u32,
    /// How far intermediate rings bulge outward along the averaged loop
    /// normal.
    pub smoothness: f32,
    pub blend: BlendCurve,
}

/// Walks `selected_edges` into closed (or open) vertex loops of at least
/// three vertices.
pub fn detect_edge_loops(selected_edges: &[Edge]) -> Vec<Vec<u32>> {
    let mut adjacency: HashMap<u32, Vec<u32>> = HashMap::new();
    for e in selected_edges {
        adjacency.entry(e.a).or_default().push(e.b);
        adjacency.entry(e.b).or_default().push(e.a);
    }

    let mut visited: HashSet<(u32, u32)> = HashSet::new();
    let mut loops = Vec::new();

    for &e in selected_edges {
        let key = (e.a.min(e.b), e.a.max(e.b));
        if visited.contains(&key) {
            continue;
        }
        visited.insert(key);
        let mut verts = vec![e.a, e.b];
        let mut prev = e.a;
        let mut current = e.b;
        loop {
            let neighbors = adjacency.get(&current).cloned().unwrap_or_default();
            let next = neighbors
                .iter()
                .find(|&&n| n != prev && !visited.contains(&(current.min(n), current.max(n))))
                .copied();
            match next {
                Some(n) => {
                    let key2 = (current.min(n), current.max(n));
                    visited.insert(key2);
                    if n == verts[0] {
                        break;
                    }
                    verts.push(n);
                    prev = current;
                    current = n;
                }
                None => break,
            }
        }
        if verts.len() >= 3 {
            loops.push(verts);
        }
    }
    loops
}

/// Finds the rotation offset into `loop_b` (of the same length as
/// `loop_a`) that minimizes total squared distance between paired
/// vertices. Used to automatically align the two loops when `twist == 0`.
fn best_alignment_offset(geo: &Geometry, loop_a: &[u32], loop_b: &[u32]) -> usize {
    let n = loop_a.len();
    (0..n)
        .min_by(|&off_a, &off_b| {
            let cost = |off: usize| -> f32 {
                (0..n).map(|i| (geo.vertex(loop_a[i]) - geo.vertex(loop_b[(i + off) % n])).length_squared()).sum()
            };
            cost(off_a).total_cmp(&cost(off_b))
        })
        .unwrap_or(0)
}

/// Stitches two vertex loops together with `options.segments` intermediate
/// rings, appending the new geometry to `geo`. Loops
/// shorter than three vertices are a no-op. Loops of mismatched size are
/// paired index-modulo-length with a documented limitation warning.
pub fn bridge_edge_loops(geo: &Geometry, loop_a: &[u32], loop_b: &[u32], options: BridgeOptions) -> Geometry {
    if loop_a.len() < 3 || loop_b.len() < 3 {
        debug!("bridge: loop shorter than 3 vertices, no-op");
        return geo.clone();
    }

    let n = loop_a.len();
    let paired_b: Vec<u32> = if loop_a.len() == loop_b.len() {
        let offset = if options.twist == 0 {
            best_alignment_offset(geo, loop_a, loop_b)
        } else {
            options.twist.rem_euclid(loop_b.len() as i32) as usize
        };
        (0..n).map(|i| loop_b[(i + offset) % loop_b.len()]).collect()
    } else {
        warn!(a = loop_a.len(), b = loop_b.len(), "bridge: mismatched loop sizes, pairing by index modulo (documented limitation)");
        let offset = options.twist.rem_euclid(loop_b.len() as i32) as usize;
        (0..n).map(|i| loop_b[(i + offset) % loop_b.len()]).collect()
    };

    let mut vertices = geo.vertices.clone();
    let mut normals = geo.normals.clone();
    let mut uvs = geo.uvs.clone();
    let mut vertex_count = geo.vertex_count;
    let mut indices = geo.indices.clone();

    let ring_count = options.segments + 2;
    let mut rings: Vec<Vec<u32>> = Vec::with_capacity(ring_count as usize);
    rings.push(loop_a.to_vec());

    for r in 1..=options.segments {
        let t_raw = r as f32 / (options.segments + 1) as f32;
        let t = apply_blend(t_raw, options.blend);
        let bulge = options.smoothness * (std::f32::consts::PI * t_raw).sin();
        let mut ring = Vec::with_capacity(n);
        for i in 0..n {
            let pa = geo.vertex(loop_a[i]);
            let pb = geo.vertex(paired_b[i]);
            let na = geo.normal(loop_a[i]);
            let nb = geo.normal(paired_b[i]);
            let avg_normal = (na + nb).try_normalize().unwrap_or(Vec3::ZERO);
            let base = pa.lerp(pb, t);
            let pos = base + avg_normal * bulge;
            let n_interp = (na.lerp(nb, t)).try_normalize().unwrap_or(avg_normal);
            let (ua, va) = geo.uv(loop_a[i]);
            let (ub, vb) = geo.uv(paired_b[i]);

            let idx = vertex_count as u32;
            vertices.extend_from_slice(&[pos.x, pos.y, pos.z]);
            normals.extend_from_slice(&[n_interp.x, n_interp.y, n_interp.z]);
            uvs.extend_from_slice(&[ua + (ub - ua) * t, va + (vb - va) * t]);
            vertex_count += 1;
            ring.push(idx);
        }
        rings.push(ring);
    }
    rings.push(paired_b);

    for w in rings.windows(2) {
        let (ring_a, ring_b) = (&w[0], &w[1]);
        for i in 0..n {
            let j = (i + 1) % n;
            let (a0, a1) = (ring_a[i], ring_a[j]);
            let (b0, b1) = (ring_b[i], ring_b[j]);
            indices.extend_from_slice(&[a0, a1, b1]);
            indices.extend_from_slice(&[a0, b1, b0]);
        }
    }

    debug!(segments = options.segments, loop_len = n, "bridge");

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

    fn two_triangle_loops() -> (Geometry, Vec<u32>, Vec<u32>) {
        // two parallel triangles, one at z=0 one at z=1
        let geo = Geometry::from_buffers(
            vec![
                0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.5, 1.0, 0.0, // loop a
                0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.5, 1.0, 1.0, // loop b
            ],
            vec![
                0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0,
            ],
            vec![0.0, 0.0, 1.0, 0.0, 0.5, 1.0, 0.0, 0.0, 1.0, 0.0, 0.5, 1.0],
            Vec::new(),
        )
        .unwrap();
        (geo, vec![0, 1, 2], vec![3, 4, 5])
    }

    fn default_options() -> BridgeOptions {
        BridgeOptions { twist: 0, segments: 0, smoothness: 0.0, blend: BlendCurve::Linear }
    }

    #[test]
    fn short_loop_is_noop() {
        let (geo, loop_a, _) = two_triangle_loops();
        let out = bridge_edge_loops(&geo, &loop_a[..2], &loop_a, default_options());
        assert_eq!(out, geo);
    }

    #[test]
    fn bridging_without_segments_adds_one_ring_of_quads() {
        let (geo, loop_a, loop_b) = two_triangle_loops();
        let out = bridge_edge_loops(&geo, &loop_a, &loop_b, default_options());
        assert_eq!(out.vertex_count, geo.vertex_count);
        assert_eq!(out.triangle_count(), 3 * 2);
    }

    #[test]
    fn intermediate_segments_add_new_rings() {
        let (geo, loop_a, loop_b) = two_triangle_loops();
        let mut opts = default_options();
        opts.segments = 2;
        opts.smoothness = 0.1;
        let out = bridge_edge_loops(&geo, &loop_a, &loop_b, opts);
        assert_eq!(out.vertex_count, geo.vertex_count + 2 * 3);
        assert_eq!(out.triangle_count(), 3 * 3 * 2);
    }

    #[test]
    fn detect_edge_loops_walks_a_closed_triangle() {
        let edges = vec![Edge::new(0, 1), Edge::new(1, 2), Edge::new(0, 2)];
        let loops = detect_edge_loops(&edges);
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].len(), 3);
    }
}

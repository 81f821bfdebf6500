use std::collections::HashMap;

use tracing::{debug, warn};

use crate::geometry::{Edge, Geometry};
use crate::types::Vec3;

/// Loop cut options.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoopCutOptions {
    pub number_of_cuts: u32,
}

/// Inserts `options.number_of_cuts` evenly spaced vertices along each
/// selected edge and retriangulates every triangle that touches one.
/// `number_of_cuts = 0` is a no-op.
///
/// A triangle with all three edges cut is a documented limitation: the
/// original triangle is kept unchanged.
pub fn loop_cut(geo: &Geometry, selected_edges: &[Edge], options: LoopCutOptions) -> Geometry {
    if options.number_of_cuts == 0 || selected_edges.is_empty() {
        debug!("loop_cut: no-op (zero cuts or empty selection)");
        return geo.clone();
    }
    let k = options.number_of_cuts as usize;
    let selected: std::collections::HashSet<Edge> = selected_edges.iter().copied().collect();

    let mut vertices = geo.vertices.clone();
    let mut normals = geo.normals.clone();
    let mut uvs = geo.uvs.clone();
    let mut vertex_count = geo.vertex_count;

    // canonical edge -> cut vertex indices, ordered from edge.a to edge.b
    let mut cuts_of: HashMap<Edge, Vec<u32>> = HashMap::new();
    for &edge in &selected {
        let a = edge.a;
        let b = edge.b;
        let mut cuts = Vec::with_capacity(k);
        for i in 1..=k {
            let t = i as f32 / (k as f32 + 1.0);
            let pos = geo.vertex(a).lerp(geo.vertex(b), t);
            let n = geo.normal(a).lerp(geo.normal(b), t);
            let n = if n.length_squared() > 0.0 { n.normalize() } else { Vec3::ZERO };
            let (ua, va) = geo.uv(a);
            let (ub, vb) = geo.uv(b);
            let idx = vertex_count as u32;
            vertices.extend_from_slice(&[pos.x, pos.y, pos.z]);
            normals.extend_from_slice(&[n.x, n.y, n.z]);
            uvs.extend_from_slice(&[ua + (ub - ua) * t, va + (vb - va) * t]);
            vertex_count += 1;
            cuts.push(idx);
        }
        cuts_of.insert(edge, cuts);
    }

    // Returns cut vertices in order from `from` to `to` (`from`/`to` being
    // the triangle-local direction), respecting the canonical storage
    // order so adjacent triangles' strips line up.
    let ordered_cuts = |from: u32, to: u32| -> Vec<u32> {
        let canon = Edge::new(from, to);
        let cuts = &cuts_of[&canon];
        if from == canon.a { cuts.clone() } else { cuts.iter().rev().copied().collect() }
    };

    let mut indices = Vec::with_capacity(geo.indices.len());
    for t in 0..geo.triangle_count() {
        let tri = geo.triangle(t);
        let tri_edges = [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])];
        let cut_flags: Vec<bool> = tri_edges.iter().map(|&(a, b)| selected.contains(&Edge::new(a, b))).collect();
        let cut_count = cut_flags.iter().filter(|&&b| b).count();

        match cut_count {
            0 => indices.extend_from_slice(&tri),
            1 => {
                let idx = cut_flags.iter().position(|&b| b).unwrap();
                let (a, b) = tri_edges[idx];
                let opposite = tri[(idx + 2) % 3];
                let mut seq = vec![a];
                seq.extend(ordered_cuts(a, b));
                seq.push(b);
                for w in seq.windows(2) {
                    indices.extend_from_slice(&[opposite, w[0], w[1]]);
                }
            }
            2 => {
                let cut_idxs: Vec<usize> = (0..3).filter(|&i| cut_flags[i]).collect();
                let (e0a, e0b) = tri_edges[cut_idxs[0]];
                let (e1a, e1b) = tri_edges[cut_idxs[1]];
                // shared vertex between the two cut edges
                let shared = if e0a == e1a || e0a == e1b {
                    e0a
                } else {
                    e0b
                };
                let (o1, o2);
                let c1 = {
                    let (from, to) = if e0a == shared { (e0a, e0b) } else { (e0b, e0a) };
                    o1 = to;
                    ordered_cuts(from, to)
                };
                let c2 = {
                    let (from, to) = if e1a == shared { (e1a, e1b) } else { (e1b, e1a) };
                    o2 = to;
                    ordered_cuts(from, to)
                };
                // tip triangle
                indices.extend_from_slice(&[shared, c1[0], c2[0]]);
                // strip of quads between corresponding cut pairs
                for i in 0..(k.saturating_sub(1)) {
                    indices.extend_from_slice(&[c1[i], c1[i + 1], c2[i + 1]]);
                    indices.extend_from_slice(&[c1[i], c2[i + 1], c2[i]]);
                }
                // base band joining the last cuts to the non-shared vertices
                indices.extend_from_slice(&[c1[k - 1], o1, o2]);
                indices.extend_from_slice(&[c1[k - 1], o2, c2[k - 1]]);
            }
            _ => {
                warn!(triangle = t, "loop_cut: all three edges cut, keeping original triangle (documented limitation)");
                indices.extend_from_slice(&tri);
            }
        }
    }

    debug!(edges_cut = selected.len(), number_of_cuts = k, "loop_cut");

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

use std::collections::HashMap;

use tracing::debug;

use crate::geometry::Geometry;

/// Which world axis to mirror across.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Mirror options.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MirrorOptions {
    pub axis: Axis,
    pub flip_normals: bool,
    /// Weld the mirror of a near-plane vertex to itself rather than
    /// cloning it.
    pub merge: bool,
    pub merge_threshold: f32,
}

/// Duplicates every vertex across the chosen plane, negating
/// `axis`'s coordinate, flips mirrored triangle winding, and (if
/// `flip_normals`) negates the same component of the normal.
/// With `merge`, vertices within `merge_threshold` of
/// the plane are reused rather than cloned. UVs on the mirrored side get
/// `u ↦ 1 - u` when mirroring across X.
pub fn mirror(geo: &Geometry, options: MirrorOptions) -> Geometry {
    let axis_idx = options.axis.index();

    let mut vertices = geo.vertices.clone();
    let mut normals = geo.normals.clone();
    let mut uvs = geo.uvs.clone();
    let mut vertex_count = geo.vertex_count;

    let mut mirror_of: HashMap<u32, u32> = HashMap::new();
    for v in 0..geo.vertex_count as u32 {
        let pos = geo.vertex(v);
        let coord = match axis_idx {
            0 => pos.x,
            1 => pos.y,
            _ => pos.z,
        };
        if options.merge && coord.abs() < options.merge_threshold {
            mirror_of.insert(v, v);
            continue;
        }
        let mut mirrored_pos = pos;
        match axis_idx {
            0 => mirrored_pos.x = -mirrored_pos.x,
            1 => mirrored_pos.y = -mirrored_pos.y,
            _ => mirrored_pos.z = -mirrored_pos.z,
        }
        let mut n = geo.normal(v);
        if options.flip_normals {
            match axis_idx {
                0 => n.x = -n.x,
                1 => n.y = -n.y,
                _ => n.z = -n.z,
            }
        }
        let (u, w) = geo.uv(v);
        let u = if matches!(options.axis, Axis::X) { 1.0 - u } else { u };

        let idx = vertex_count as u32;
        vertices.extend_from_slice(&[mirrored_pos.x, mirrored_pos.y, mirrored_pos.z]);
        normals.extend_from_slice(&[n.x, n.y, n.z]);
        uvs.extend_from_slice(&[u, w]);
        vertex_count += 1;
        mirror_of.insert(v, idx);
    }

    let mut indices = geo.indices.clone();
    for t in 0..geo.triangle_count() {
        let [a, b, c] = geo.triangle(t);
        let base = t * 3;
        // flip winding: swap two vertices of the mirrored triangle
        indices[base] = mirror_of[&a];
        indices[base + 1] = mirror_of[&c];
        indices[base + 2] = mirror_of[&b];
    }
    // keep the original triangles too, since this operator appends a
    // mirrored copy rather than replacing the input.
    let mirrored_only = indices;
    let mut final_indices = geo.indices.clone();
    final_indices.extend(mirrored_only);

    debug!(axis = ?options.axis, merge = options.merge, "mirror");

    let mut result = Geometry {
        vertices,
        normals,
        uvs,
        indices: final_indices,
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
    use crate::types::Vec3;

    fn default_options(axis: Axis) -> MirrorOptions {
        MirrorOptions { axis, flip_normals: false, merge: false, merge_threshold: 1e-4 }
    }

    #[test]
    fn mirror_triangle_across_x() {
        let geo = Geometry::from_buffers(
            vec![1.0, 0.0, 0.0, 2.0, 0.0, 0.0, 1.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            vec![0, 1, 2],
        )
        .unwrap();
        let out = mirror(&geo, default_options(Axis::X));
        assert_eq!(out.vertex_count, 6);
        assert_eq!(out.triangle_count(), 2);
        // mirrored vertex 3 is the negated-x copy of vertex 0
        assert!(out.vertex(3).abs_diff_eq(Vec3::new(-1.0, 0.0, 0.0), 1e-6));
        // winding of the mirrored triangle is reversed: (3,5,4) vs source (0,1,2)
        assert_eq!(out.triangle(1), [3, 5, 4]);
    }

    #[test]
    fn merge_reuses_near_plane_vertices() {
        let geo = Geometry::from_buffers(
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            vec![0, 1, 2],
        )
        .unwrap();
        let mut opts = default_options(Axis::X);
        opts.merge = true;
        opts.merge_threshold = 1e-3;
        let out = mirror(&geo, opts);
        // vertex 0 lies on the plane and is reused, not cloned.
        assert_eq!(out.vertex_count, 5);
    }

    #[test]
    fn double_mirror_is_congruent_to_original_topology() {
        let geo = Geometry::from_buffers(
            vec![1.0, 0.0, 0.0, 2.0, 0.0, 0.0, 1.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            vec![0, 1, 2],
        )
        .unwrap();
        let once = mirror(&geo, default_options(Axis::X));
        let twice = mirror(&once, default_options(Axis::X));
        // each mirror pass doubles the triangle count when merge=false.
        assert_eq!(twice.triangle_count(), geo.triangle_count() * 4);
    }
}

use tracing::debug;

use crate::geometry::Geometry;
use crate::types::Vec3;

/// Solidify options.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolidifyOptions {
    pub thickness: f32,
    /// Bias of the shell relative to the original surface, `-1..=1`.
    pub offset: f32,
    /// Recompute per-vertex normals from incident face normals rather
    /// than trusting the stored ones.
    pub even_thickness: bool,
    pub fill_rim: bool,
}

/// Builds an outer and inner shell offset along per-vertex normals by
/// `thickness`, optionally filling the boundary rim.
pub fn solidify(geo: &Geometry, options: SolidifyOptions) -> Geometry {
    let mut working = geo.clone();
    if options.even_thickness {
        working.recompute_vertex_normals();
    }

    let outer_scale = options.thickness * (options.offset + 1.0) / 2.0;
    let inner_scale = options.thickness * (options.offset - 1.0) / 2.0;

    let mut vertices = Vec::with_capacity(working.vertices.len() * 2);
    let mut normals = Vec::with_capacity(working.normals.len() * 2);
    let mut uvs = Vec::with_capacity(working.uvs.len() * 2);

    for v in 0..working.vertex_count as u32 {
        let n = working.normal(v);
        let outer = working.vertex(v) + n * outer_scale;
        vertices.extend_from_slice(&[outer.x, outer.y, outer.z]);
        normals.extend_from_slice(&[n.x, n.y, n.z]);
        let (u, w) = working.uv(v);
        uvs.extend_from_slice(&[u, w]);
    }
    for v in 0..working.vertex_count as u32 {
        let n = working.normal(v);
        let inner = working.vertex(v) + n * inner_scale;
        vertices.extend_from_slice(&[inner.x, inner.y, inner.z]);
        normals.extend_from_slice(&[-n.x, -n.y, -n.z]);
        let (u, w) = working.uv(v);
        uvs.extend_from_slice(&[u, w]);
    }

    let n = working.vertex_count as u32;
    let mut indices = Vec::with_capacity(working.indices.len() * 2);
    // outer shell: original winding
    indices.extend_from_slice(&working.indices);
    // inner shell: reversed winding, offset by n
    for t in 0..working.triangle_count() {
        let [a, b, c] = working.triangle(t);
        indices.extend_from_slice(&[n + a, n + c, n + b]);
    }

    if options.fill_rim {
        let boundary = working.boundary_edges();
        for edge in boundary {
            let (a, b) = (edge.a, edge.b);
            let outer_a = working.vertex(a) + working.normal(a) * outer_scale;
            let outer_b = working.vertex(b) + working.normal(b) * outer_scale;
            let inner_a = working.vertex(a) + working.normal(a) * inner_scale;
            let inner_b = working.vertex(b) + working.normal(b) * inner_scale;

            let edge_dir = (outer_b - outer_a).normalize_or_zero();
            let face_dir = (inner_a - outer_a).normalize_or_zero();
            let rim_normal = edge_dir.cross(face_dir).try_normalize().unwrap_or(Vec3::ZERO);

            let base = (vertices.len() / 3) as u32;
            for (p, uv) in [
                (outer_a, (0.0, 0.0)),
                (outer_b, (1.0, 0.0)),
                (inner_b, (1.0, 1.0)),
                (inner_a, (0.0, 1.0)),
            ] {
                vertices.extend_from_slice(&[p.x, p.y, p.z]);
                normals.extend_from_slice(&[rim_normal.x, rim_normal.y, rim_normal.z]);
                uvs.extend_from_slice(&[uv.0, uv.1]);
            }
            indices.extend_from_slice(&[base, base + 1, base + 2]);
            indices.extend_from_slice(&[base, base + 2, base + 3]);
        }
    }

    let vertex_count = vertices.len() / 3;
    debug!(thickness = options.thickness, fill_rim = options.fill_rim, "solidify");

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
        let mut geo = Geometry::from_buffers(
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0],
            vec![0, 1, 2, 0, 2, 3],
        )
        .unwrap();
        geo.recompute_vertex_normals();
        geo
    }

    #[test]
    fn solidify_doubles_triangle_count_without_rim() {
        let geo = quad();
        let out = solidify(&geo, SolidifyOptions { thickness: 0.2, offset: 0.0, even_thickness: false, fill_rim: false });
        assert_eq!(out.triangle_count(), geo.triangle_count() * 2);
        assert_eq!(out.vertex_count, geo.vertex_count * 2);
    }

    #[test]
    fn fill_rim_adds_a_quad_per_boundary_edge() {
        let geo = quad();
        let boundary_count = geo.boundary_edges().len();
        let out = solidify(&geo, SolidifyOptions { thickness: 0.2, offset: 0.0, even_thickness: false, fill_rim: true });
        assert_eq!(out.triangle_count(), geo.triangle_count() * 2 + boundary_count * 2);
    }

    #[test]
    fn outer_shell_moves_along_normal() {
        let geo = quad();
        let out = solidify(&geo, SolidifyOptions { thickness: 1.0, offset: 1.0, even_thickness: false, fill_rim: false });
        // offset=1.0 -> outer_scale = thickness*(1+1)/2 = thickness
        assert!((out.vertex(0).z - 1.0).abs() < 1e-4);
    }
}

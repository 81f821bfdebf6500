use std::collections::HashMap;

use tracing::debug;

use crate::config::KernelConfig;
use crate::geometry::Geometry;
use crate::types::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArrayMode {
    Constant,
    Relative,
    /// Same as `Constant` in this core. Resolving an external object's
    /// transform is out of scope.
    Object,
}

/// Array modifier options.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArrayOptions {
    pub count: u32,
    pub mode: ArrayMode,
    pub offset: Vec3,
    pub merge_vertices: bool,
}

/// Produces `options.count` rigid copies of `geo`, concatenated, with
/// per-copy offset determined by `options.mode`.
/// `count <= 1` is a no-op.
pub fn array(geo: &Geometry, options: ArrayOptions) -> Geometry {
    array_with_config(geo, options, &KernelConfig::default())
}

pub fn array_with_config(geo: &Geometry, options: ArrayOptions, config: &KernelConfig) -> Geometry {
    if options.count <= 1 {
        debug!("array: count <= 1, no-op");
        return geo.clone();
    }

    let step = match options.mode {
        ArrayMode::Constant | ArrayMode::Object => options.offset,
        ArrayMode::Relative => {
            let (min, max) = geo.bounding_box();
            let size = max - min;
            Vec3::new(options.offset.x * size.x, options.offset.y * size.y, options.offset.z * size.z)
        }
    };

    let mut vertices = Vec::with_capacity(geo.vertices.len() * options.count as usize);
    let mut normals = Vec::with_capacity(geo.normals.len() * options.count as usize);
    let mut uvs = Vec::with_capacity(geo.uvs.len() * options.count as usize);
    let mut indices = Vec::with_capacity(geo.indices.len() * options.count as usize);
    let mut vertex_count = 0usize;

    for copy in 0..options.count {
        let offset = step * copy as f32;
        let base = vertex_count as u32;
        for v in 0..geo.vertex_count as u32 {
            let p = geo.vertex(v) + offset;
            vertices.extend_from_slice(&[p.x, p.y, p.z]);
        }
        normals.extend_from_slice(&geo.normals);
        uvs.extend_from_slice(&geo.uvs);
        for &i in &geo.indices {
            indices.push(i + base);
        }
        vertex_count += geo.vertex_count;
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

    if options.merge_vertices {
        merge_close_vertices(&mut result, config);
    }

    result.rebuild_derived();
    debug!(count = options.count, merged = options.merge_vertices, "array");
    result
}

/// Buckets vertices whose positions agree to `config.merge_decimal_digits`
/// and remaps indices onto one representative per bucket. A brute-force
/// O(n²) pass within each bucket is acceptable at the target mesh sizes.
fn merge_close_vertices(geo: &mut Geometry, config: &KernelConfig) {
    let digits = config.merge_decimal_digits;
    let quantize = |x: f32| -> i64 {
        let scale = 10f64.powi(digits as i32);
        ((x as f64) * scale).round() as i64
    };

    let mut buckets: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
    for v in 0..geo.vertex_count as u32 {
        let p = geo.vertex(v);
        buckets.entry((quantize(p.x), quantize(p.y), quantize(p.z))).or_default().push(v);
    }

    let mut remap: Vec<u32> = (0..geo.vertex_count as u32).collect();
    for group in buckets.values() {
        if group.len() < 2 {
            continue;
        }
        let representative = group[0];
        for &dup in &group[1..] {
            remap[dup as usize] = representative;
        }
    }

    for i in geo.indices.iter_mut() {
        *i = remap[*i as usize];
    }

    // Compact: keep only vertices still referenced as their own representative.
    let mut new_index_of: HashMap<u32, u32> = HashMap::new();
    let mut vertices = Vec::new();
    let mut normals = Vec::new();
    let mut uvs = Vec::new();
    for v in 0..geo.vertex_count as u32 {
        if remap[v as usize] != v {
            continue;
        }
        let idx = new_index_of.len() as u32;
        new_index_of.insert(v, idx);
        let p = geo.vertex(v);
        vertices.extend_from_slice(&[p.x, p.y, p.z]);
        let n = geo.normal(v);
        normals.extend_from_slice(&[n.x, n.y, n.z]);
        let (u, w) = geo.uv(v);
        uvs.extend_from_slice(&[u, w]);
    }
    for i in geo.indices.iter_mut() {
        *i = new_index_of[&remap[*i as usize]];
    }
    geo.vertices = vertices;
    geo.normals = normals;
    geo.uvs = uvs;
    geo.vertex_count = new_index_of.len();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Geometry {
        Geometry::from_buffers(
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            vec![0, 1, 2],
        )
        .unwrap()
    }

    #[test]
    fn count_one_is_identity() {
        let geo = triangle();
        let opts = ArrayOptions { count: 1, mode: ArrayMode::Constant, offset: Vec3::X, merge_vertices: false };
        assert_eq!(array(&geo, opts), geo);
    }

    #[test]
    fn constant_mode_offsets_each_copy() {
        let geo = triangle();
        let opts = ArrayOptions { count: 3, mode: ArrayMode::Constant, offset: Vec3::new(2.0, 0.0, 0.0), merge_vertices: false };
        let out = array(&geo, opts);
        assert_eq!(out.vertex_count, 9);
        assert_eq!(out.triangle_count(), 3);
        assert!((out.vertex(6).x - 4.0).abs() < 1e-5);
    }

    #[test]
    fn relative_mode_scales_by_bounding_box() {
        let geo = triangle();
        let opts = ArrayOptions { count: 2, mode: ArrayMode::Relative, offset: Vec3::new(1.0, 0.0, 0.0), merge_vertices: false };
        let out = array(&geo, opts);
        // bbox size x = 1.0, so second copy is offset by 1.0 in x
        assert!((out.vertex(3).x - 1.0).abs() < 1e-5);
    }

    #[test]
    fn merge_vertices_welds_touching_copies() {
        let geo = triangle();
        let opts = ArrayOptions { count: 2, mode: ArrayMode::Constant, offset: Vec3::new(1.0, 0.0, 0.0), merge_vertices: true };
        let out = array(&geo, opts);
        // vertex 1 of copy 0 (1,0,0) coincides with vertex 0 of copy 1 (0+1,0,0)
        assert_eq!(out.vertex_count, 5);
    }
}

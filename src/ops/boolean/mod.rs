mod bsp;
mod polygon;

use tracing::debug;

use crate::config::KernelConfig;
use crate::geometry::Geometry;
use crate::types::Transform;
use bsp::BspTree;
use polygon::{Polygon, Vertex};

/// A boolean CSG operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BooleanOperation {
    Union,
    Difference,
    Intersect,
}

/// Computes a boolean combination of two meshes via BSP-tree polygon
/// clipping. Both inputs are baked into world space
/// through their own transform before clipping; the result is already in
/// world space, so the caller should attach it to a mesh with an identity
/// transform. UVs are discarded during clipping; output UVs are all `(0, 0)`.
pub fn boolean(a: &Geometry, transform_a: &Transform, b: &Geometry, transform_b: &Transform, op: BooleanOperation) -> Geometry {
    boolean_with_config(a, transform_a, b, transform_b, op, &KernelConfig::default())
}

pub fn boolean_with_config(
    a: &Geometry,
    transform_a: &Transform,
    b: &Geometry,
    transform_b: &Transform,
    op: BooleanOperation,
    config: &KernelConfig,
) -> Geometry {
    let epsilon = config.bsp_epsilon;
    let mut tree_a = BspTree::from_polygons(bake_polygons(a, transform_a), epsilon);
    let mut tree_b = BspTree::from_polygons(bake_polygons(b, transform_b), epsilon);

    match op {
        BooleanOperation::Union => {
            tree_a.clip_to(&tree_b, epsilon);
            tree_b.clip_to(&tree_a, epsilon);
            tree_b.invert();
            tree_b.clip_to(&tree_a, epsilon);
            tree_b.invert();
            tree_a.add_polygons(tree_b.all_polygons(), epsilon);
        }
        BooleanOperation::Difference => {
            tree_a.invert();
            tree_a.clip_to(&tree_b, epsilon);
            tree_b.clip_to(&tree_a, epsilon);
            tree_b.invert();
            tree_b.clip_to(&tree_a, epsilon);
            tree_b.invert();
            tree_a.add_polygons(tree_b.all_polygons(), epsilon);
            tree_a.invert();
        }
        BooleanOperation::Intersect => {
            tree_a.invert();
            tree_b.clip_to(&tree_a, epsilon);
            tree_b.invert();
            tree_a.clip_to(&tree_b, epsilon);
            tree_b.clip_to(&tree_a, epsilon);
            tree_a.add_polygons(tree_b.all_polygons(), epsilon);
            tree_a.invert();
        }
    }

    debug!(op = ?op, "boolean");
    polygons_to_geometry(tree_a.all_polygons())
}

fn bake_polygons(geo: &Geometry, transform: &Transform) -> Vec<Polygon> {
    (0..geo.triangle_count())
        .map(|t| {
            let [ia, ib, ic] = geo.triangle(t);
            let make = |v: u32| Vertex {
                position: transform.transform_point(geo.vertex(v)),
                normal: transform.transform_direction(geo.normal(v)).normalize_or_zero(),
            };
            Polygon::new(vec![make(ia), make(ib), make(ic)])
        })
        .collect()
}

fn polygons_to_geometry(polygons: Vec<Polygon>) -> Geometry {
    let mut vertices = Vec::new();
    let mut normals = Vec::new();
    let mut uvs = Vec::new();
    let mut indices = Vec::new();

    for polygon in polygons {
        if polygon.vertices.len() < 3 {
            continue;
        }
        let base = (vertices.len() / 3) as u32;
        for v in &polygon.vertices {
            vertices.extend_from_slice(&[v.position.x, v.position.y, v.position.z]);
            normals.extend_from_slice(&[v.normal.x, v.normal.y, v.normal.z]);
            uvs.extend_from_slice(&[0.0, 0.0]);
        }
        for i in 1..polygon.vertices.len() - 1 {
            indices.extend_from_slice(&[base, base + i as u32, base + i as u32 + 1]);
        }
    }

    let vertex_count = vertices.len() / 3;
    let mut geo = Geometry { vertices, normals, uvs, indices, vertex_count, edges: Vec::new(), faces: Vec::new() };
    geo.rebuild_derived();
    geo
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Vec3;

    fn unit_cube(center: Vec3) -> Geometry {
        let c = center;
        let s = 0.5;
        let corners = [
            c + Vec3::new(-s, -s, -s),
            c + Vec3::new(s, -s, -s),
            c + Vec3::new(s, s, -s),
            c + Vec3::new(-s, s, -s),
            c + Vec3::new(-s, -s, s),
            c + Vec3::new(s, -s, s),
            c + Vec3::new(s, s, s),
            c + Vec3::new(-s, s, s),
        ];
        let mut vertices = Vec::new();
        for p in corners {
            vertices.extend_from_slice(&[p.x, p.y, p.z]);
        }
        let normals = vec![0.0; vertices.len()];
        let uvs = vec![0.0; vertices.len() / 3 * 2];
        #[rustfmt::skip]
        let indices = vec![
            0, 1, 2, 0, 2, 3, // -z
            5, 4, 7, 5, 7, 6, // +z
            4, 0, 3, 4, 3, 7, // -x
            1, 5, 6, 1, 6, 2, // +x
            3, 2, 6, 3, 6, 7, // +y
            4, 5, 1, 4, 1, 0, // -y
        ];
        let mut geo = Geometry::from_buffers(vertices, normals, uvs, indices).unwrap();
        geo.recompute_vertex_normals();
        geo
    }

    #[test]
    fn union_of_separated_cubes_keeps_all_faces() {
        let a = unit_cube(Vec3::ZERO);
        let b = unit_cube(Vec3::new(5.0, 0.0, 0.0));
        let identity = Transform::identity();
        let out = boolean(&a, &identity, &b, &identity, BooleanOperation::Union);
        assert_eq!(out.triangle_count(), a.triangle_count() + b.triangle_count());
    }

    #[test]
    fn difference_of_disjoint_cubes_keeps_a_intact() {
        let a = unit_cube(Vec3::ZERO);
        let b = unit_cube(Vec3::new(5.0, 0.0, 0.0));
        let identity = Transform::identity();
        let out = boolean(&a, &identity, &b, &identity, BooleanOperation::Difference);
        assert_eq!(out.triangle_count(), a.triangle_count());
    }

    #[test]
    fn intersect_of_disjoint_cubes_is_empty() {
        let a = unit_cube(Vec3::ZERO);
        let b = unit_cube(Vec3::new(5.0, 0.0, 0.0));
        let identity = Transform::identity();
        let out = boolean(&a, &identity, &b, &identity, BooleanOperation::Intersect);
        assert_eq!(out.triangle_count(), 0);
    }

    #[test]
    fn intersect_of_overlapping_cubes_is_nonempty() {
        let a = unit_cube(Vec3::ZERO);
        let b = unit_cube(Vec3::new(0.25, 0.0, 0.0));
        let identity = Transform::identity();
        let out = boolean(&a, &identity, &b, &identity, BooleanOperation::Intersect);
        assert!(out.triangle_count() > 0);
    }
}

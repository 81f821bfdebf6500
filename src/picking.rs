use rayon::prelude::*;

use crate::config::KernelConfig;
use crate::mesh::Mesh;
use crate::types::{Transform, Vec3};

/// A camera projection model.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProjectionKind {
    Perspective,
    Orthographic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Camera {
    pub kind: ProjectionKind,
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view, radians. Only meaningful for `Perspective`.
    pub fov: f32,
    /// Half-height of the view volume. Only meaningful for `Orthographic`.
    pub zoom: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    /// Orthonormal `(forward, right, up)` camera basis.
    fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let forward = (self.target - self.position).normalize();
        let right = forward.cross(self.up).normalize();
        let up = right.cross(forward);
        (forward, right, up)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

/// The closest triangle hit against a single mesh or a whole scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    pub mesh_id: u64,
    pub triangle: usize,
    pub t: f32,
    pub point: Vec3,
    pub barycentric: (f32, f32),
}

/// Builds a world-space pick ray from canvas pixel coordinates.
/// `(x, y)` is canvas-pixel space with `y` increasing
/// downward, `(w, h)` the canvas size in pixels.
pub fn get_ray_from_mouse(x: f32, y: f32, w: f32, h: f32, camera: &Camera) -> Ray {
    let (forward, right, up) = camera.basis();
    let aspect = w / h;
    let ndc_x = 2.0 * x / w - 1.0;
    let ndc_y = 1.0 - 2.0 * y / h;

    match camera.kind {
        ProjectionKind::Perspective => {
            let half_fov = (camera.fov * 0.5).tan();
            let direction =
                (forward + right * (ndc_x * half_fov * aspect) + up * (ndc_y * half_fov)).normalize();
            Ray { origin: camera.position, direction }
        }
        ProjectionKind::Orthographic => {
            let origin = camera.position
                + right * (ndc_x * camera.zoom * aspect)
                + up * (ndc_y * camera.zoom);
            Ray { origin, direction: forward }
        }
    }
}

/// Möller–Trumbore ray/triangle intersection. Accepts only `t > epsilon`,
/// `u >= 0`, `v >= 0`, `u + v <= 1`.
pub fn intersect_ray_triangle(
    ray: &Ray,
    a: Vec3,
    b: Vec3,
    c: Vec3,
    epsilon: f32,
) -> Option<(f32, f32, f32)> {
    let edge1 = b - a;
    let edge2 = c - a;
    let pvec = ray.direction.cross(edge2);
    let det = edge1.dot(pvec);
    if det.abs() < epsilon {
        return None;
    }
    let inv_det = 1.0 / det;
    let tvec = ray.origin - a;
    let u = tvec.dot(pvec) * inv_det;
    if u < 0.0 || u > 1.0 {
        return None;
    }
    let qvec = tvec.cross(edge1);
    let v = ray.direction.dot(qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = edge2.dot(qvec) * inv_det;
    if t > epsilon { Some((t, u, v)) } else { None }
}

/// Möller–Trumbore segment/triangle variant used by knife cut: same classification, but `t` must also lie in `[0, 1]` since
/// the segment has finite extent.
pub fn intersect_segment_triangle(
    p0: Vec3,
    p1: Vec3,
    a: Vec3,
    b: Vec3,
    c: Vec3,
    epsilon: f32,
) -> Option<(f32, f32, f32)> {
    let ray = Ray { origin: p0, direction: p1 - p0 };
    let (t, u, v) = intersect_ray_triangle(&ray, a, b, c, epsilon)?;
    if (0.0..=1.0).contains(&t) { Some((t, u, v)) } else { None }
}

/// Casts `ray` against a single mesh's triangles, each brought into world
/// space via `mesh.transform`. Returns the smallest-`t` hit, or `None`.
pub fn raycast_mesh(ray: &Ray, mesh: &Mesh, config: &KernelConfig) -> Option<RaycastHit> {
    raycast_mesh_world(ray, mesh, &mesh.transform, config)
}

fn raycast_mesh_world(
    ray: &Ray,
    mesh: &Mesh,
    transform: &Transform,
    config: &KernelConfig,
) -> Option<RaycastHit> {
    let geo = &mesh.geometry;
    let mut best: Option<RaycastHit> = None;
    for t in 0..geo.triangle_count() {
        let [ia, ib, ic] = geo.triangle(t);
        let a = transform.transform_point(geo.vertex(ia));
        let b = transform.transform_point(geo.vertex(ib));
        let c = transform.transform_point(geo.vertex(ic));
        if let Some((hit_t, u, v)) = intersect_ray_triangle(ray, a, b, c, config.raycast_epsilon) {
            if best.is_none_or(|h| hit_t < h.t) {
                best = Some(RaycastHit {
                    mesh_id: mesh.id,
                    triangle: t,
                    t: hit_t,
                    point: ray.origin + ray.direction * hit_t,
                    barycentric: (u, v),
                });
            }
        }
    }
    best
}

/// Casts `ray` against a scene of meshes; invisible meshes are skipped;
/// the mesh with the smallest hit `t` wins.
pub fn raycast<'a>(ray: &Ray, meshes: impl IntoIterator<Item = &'a Mesh>, config: &KernelConfig) -> Option<RaycastHit> {
    let visible: Vec<&Mesh> = meshes.into_iter().filter(|m| m.visible).collect();
    let hits: Vec<RaycastHit> = if config.parallel && visible.len() >= config.parallel_threshold.min(64) {
        visible
            .par_iter()
            .filter_map(|m| raycast_mesh(ray, m, config))
            .collect()
    } else {
        visible.iter().filter_map(|m| raycast_mesh(ray, m, config)).collect()
    };
    hits.into_iter().min_by(|a, b| a.t.total_cmp(&b.t))
}

/// Brute-force nearest transformed vertex to a world-space point.
pub fn find_closest_vertex(mesh: &Mesh, point: Vec3) -> Option<u32> {
    (0..mesh.geometry.vertex_count as u32)
        .min_by(|&a, &b| {
            let da = mesh.transform.transform_point(mesh.geometry.vertex(a)).distance_squared(point);
            let db = mesh.transform.transform_point(mesh.geometry.vertex(b)).distance_squared(point);
            da.total_cmp(&db)
        })
}

/// Whether `point` (world space) is within `threshold` of the
/// transformed segment for `edges[edge_idx]`, clamped to the segment.
pub fn is_point_near_edge(mesh: &Mesh, point: Vec3, edge_idx: usize, threshold: f32) -> bool {
    let Some(edge) = mesh.geometry.edges.get(edge_idx) else { return false };
    let a = mesh.transform.transform_point(mesh.geometry.vertex(edge.a));
    let b = mesh.transform.transform_point(mesh.geometry.vertex(edge.b));
    let ab = b - a;
    let len_sq = ab.length_squared();
    let t = if len_sq > 0.0 { ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0) } else { 0.0 };
    let closest = a + ab * t;
    closest.distance(point) <= threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;

    fn unit_triangle_mesh() -> Mesh {
        let geo = Geometry::from_buffers(
            vec![-1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            vec![0.0, 0.0, 1.0, 0.0, 0.5, 1.0],
            vec![0, 1, 2],
        )
        .unwrap();
        Mesh::new(1, "tri", geo)
    }

    #[test]
    fn straight_down_ray_hits_triangle_center() {
        let mesh = unit_triangle_mesh();
        let ray = Ray { origin: Vec3::new(0.0, 0.0, 5.0), direction: Vec3::new(0.0, 0.0, -1.0) };
        let hit = raycast_mesh(&ray, &mesh, &KernelConfig::default());
        assert!(hit.is_some());
        assert!((hit.unwrap().point.z).abs() < 1e-5);
    }

    #[test]
    fn ray_missing_triangle_returns_none() {
        let mesh = unit_triangle_mesh();
        let ray = Ray { origin: Vec3::new(5.0, 5.0, 5.0), direction: Vec3::new(0.0, 0.0, -1.0) };
        assert!(raycast_mesh(&ray, &mesh, &KernelConfig::default()).is_none());
    }

    #[test]
    fn ray_grazing_shared_edge_still_hits() {
        // Two triangles sharing the edge (1,2); a ray straight down the
        // shared edge's midpoint must hit one of them, never neither.
        let geo = Geometry::from_buffers(
            vec![
                -1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 1.0, 1.0, 0.0, -1.0, 1.0, 0.0,
            ],
            vec![0.0; 12],
            vec![0.0; 8],
            vec![0, 1, 2, 0, 2, 3],
        )
        .unwrap();
        let mut mesh = Mesh::new(1, "quad", geo);
        mesh.geometry.recompute_vertex_normals();
        let ray = Ray { origin: Vec3::new(1.0, 0.0, 5.0), direction: Vec3::new(0.0, 0.0, -1.0) };
        assert!(raycast_mesh(&ray, &mesh, &KernelConfig::default()).is_some());
    }

    #[test]
    fn closest_vertex_finds_nearest() {
        let mesh = unit_triangle_mesh();
        let idx = find_closest_vertex(&mesh, Vec3::new(0.9, 0.9, 0.0)).unwrap();
        assert_eq!(idx, 2);
    }

    #[test]
    fn point_near_edge_detects_close_point() {
        let mesh = unit_triangle_mesh();
        // edge (0,1) runs along y=-1 from x=-1 to x=1
        let edge_idx = mesh
            .geometry
            .edges
            .iter()
            .position(|e| (e.a, e.b) == (0, 1))
            .unwrap();
        assert!(is_point_near_edge(&mesh, Vec3::new(0.0, -1.05, 0.0), edge_idx, 0.2));
        assert!(!is_point_near_edge(&mesh, Vec3::new(0.0, 5.0, 0.0), edge_idx, 0.2));
    }

    #[test]
    fn orthographic_ray_direction_is_forward() {
        let camera = Camera {
            kind: ProjectionKind::Orthographic,
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: 1.0,
            zoom: 1.0,
            near: 0.1,
            far: 100.0,
        };
        let ray = get_ray_from_mouse(400.0, 300.0, 800.0, 600.0, &camera);
        assert!(ray.direction.abs_diff_eq(Vec3::new(0.0, 0.0, -1.0), 1e-5));
    }
}

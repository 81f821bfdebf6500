use std::collections::HashMap;

use tracing::{debug, trace, warn};

use crate::geometry::Geometry;
use crate::mesh::Mesh;
use crate::picking::RaycastHit;
use crate::types::Vec3;

/// Brush behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BrushType {
    Grab,
    Smooth,
    Clay,
    Crease,
    Inflate,
    Flatten,
    Pinch,
}

/// Falloff curves applied to brush weight by normalized distance. Only
/// `smooth`, `sharp`, `linear`, and `constant` have formulas given; the
/// rest are this core's own reasonable choices (see `DESIGN.md`, Open
/// Questions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FalloffType {
    Smooth,
    Sphere,
    Root,
    InverseSquare,
    Sharp,
    Linear,
    Constant,
    Random,
}

fn hash_u32(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x7feb352d);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846ca68b);
    x ^= x >> 16;
    x
}

/// Weight in `[0, 1]` at normalized distance `t = distance / radius` from
/// the brush center. `vertex_index` only matters for `Random`, which
/// needs a per-vertex deterministic draw rather than true randomness so
/// that replaying a stroke is reproducible.
fn falloff_weight(t: f32, falloff: FalloffType, vertex_index: u32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    match falloff {
        FalloffType::Smooth => 1.0 - t * t * (3.0 - 2.0 * t),
        FalloffType::Sphere => (1.0 - t * t).max(0.0).sqrt(),
        FalloffType::Root => 1.0 - t.sqrt(),
        FalloffType::InverseSquare => 1.0 / (1.0 + 9.0 * t * t),
        FalloffType::Sharp => (1.0 - t).powi(3),
        FalloffType::Linear => 1.0 - t,
        FalloffType::Constant => if t < 1.0 { 1.0 } else { 0.0 },
        FalloffType::Random => {
            let r = (hash_u32(vertex_index) as f32 / u32::MAX as f32) * 0.5 + 0.5;
            (1.0 - t) * r
        }
    }
}

/// Brush settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BrushSettings {
    pub brush_type: BrushType,
    pub radius: f32,
    pub strength: f32,
    pub falloff: FalloffType,
    pub invert: bool,
    /// Strength of the single smoothing pass run at the end of a stroke.
    /// A value of `0.0` skips the pass entirely.
    pub auto_smooth: f32,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            brush_type: BrushType::Grab,
            radius: 0.5,
            strength: 0.5,
            falloff: FalloffType::Smooth,
            invert: false,
            auto_smooth: 0.2,
        }
    }
}

/// The sole stateful, single-owner component in the kernel. Binds to one mesh at a time and mutates its geometry in place
/// across a stroke, in contrast to every pure `ops::*` operator. Assumes
/// the bound mesh's transform is identity; callers sculpt in local
/// space, matching how a host typically bakes transforms before handing
/// a mesh to sculpt mode.
pub struct SculptEngine {
    mesh: Option<Mesh>,
    settings: BrushSettings,
    symmetry: [bool; 3],
    snapshot: Option<Geometry>,
    stroke_center: Option<Vec3>,
    stroke_normal: Option<Vec3>,
}

impl Default for SculptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SculptEngine {
    pub fn new() -> Self {
        Self {
            mesh: None,
            settings: BrushSettings::default(),
            symmetry: [false; 3],
            snapshot: None,
            stroke_center: None,
            stroke_normal: None,
        }
    }

    pub fn set_mesh(&mut self, mesh: Mesh) {
        self.mesh = Some(mesh);
        self.snapshot = None;
        self.stroke_center = None;
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        self.mesh.as_ref()
    }

    pub fn set_brush_settings(&mut self, settings: BrushSettings) {
        self.settings = settings;
    }

    pub fn set_symmetry(&mut self, axis: usize, on: bool) {
        if axis < 3 {
            self.symmetry[axis] = on;
        }
    }

    /// Snapshots the mesh's current geometry so [`SculptEngine::undo_stroke`]
    /// can restore it.
    pub fn begin_stroke(&mut self, hit: &RaycastHit) {
        let Some(mesh) = &self.mesh else {
            warn!("sculpt: begin_stroke with no bound mesh");
            return;
        };
        self.snapshot = Some(mesh.geometry.clone());
        self.stroke_center = Some(hit.point);
        self.stroke_normal = Some(interpolated_normal(&mesh.geometry, hit));
        debug!(mesh_id = mesh.id, triangle = hit.triangle, "sculpt: begin_stroke");
    }

    /// A no-op if called before `begin_stroke`. Applies the
    /// brush once, then once more per enabled symmetry plane with the hit
    /// point and delta reflected across that plane.
    pub fn update_stroke(&mut self, hit: &RaycastHit, delta: Vec3) {
        if self.stroke_center.is_none() {
            trace!("sculpt: update_stroke before begin_stroke, no-op");
            return;
        }
        let normal = self.stroke_normal.unwrap_or(Vec3::Y);
        let settings = self.settings;
        let symmetry = self.symmetry;
        let Some(mesh) = &mut self.mesh else { return };

        apply_brush(&mut mesh.geometry, hit.point, normal, delta, settings);
        for axis in 0..3 {
            if !symmetry[axis] {
                continue;
            }
            let mirrored_point = mirror_across(hit.point, axis);
            let mirrored_delta = mirror_across(delta, axis);
            let mirrored_normal = mirror_across(normal, axis);
            apply_brush(&mut mesh.geometry, mirrored_point, mirrored_normal, mirrored_delta, settings);
        }
    }

    /// Runs the auto-smooth pass (if `settings.auto_smooth > 0.0`) and
    /// recomputes normals from the final positions.
    pub fn end_stroke(&mut self) {
        let auto_smooth_strength = self.settings.auto_smooth;
        let Some(mesh) = &mut self.mesh else { return };
        if auto_smooth_strength > 0.0 {
            auto_smooth(&mut mesh.geometry, auto_smooth_strength);
        }
        mesh.geometry.recompute_vertex_normals();
        self.stroke_center = None;
        self.stroke_normal = None;
        debug!(mesh_id = mesh.id, "sculpt: end_stroke");
    }

    /// Restores the stroke-start snapshot.
    pub fn undo_stroke(&mut self) {
        let Some(snapshot) = self.snapshot.take() else {
            trace!("sculpt: undo_stroke with no snapshot, no-op");
            return;
        };
        if let Some(mesh) = &mut self.mesh {
            mesh.geometry = snapshot;
            mesh.geometry.recompute_vertex_normals();
        }
        self.stroke_center = None;
        self.stroke_normal = None;
    }
}

fn mirror_across(v: Vec3, axis: usize) -> Vec3 {
    match axis {
        0 => Vec3::new(-v.x, v.y, v.z),
        1 => Vec3::new(v.x, -v.y, v.z),
        _ => Vec3::new(v.x, v.y, -v.z),
    }
}

fn interpolated_normal(geo: &Geometry, hit: &RaycastHit) -> Vec3 {
    let [a, b, c] = geo.triangle(hit.triangle);
    let (u, v) = hit.barycentric;
    let w = 1.0 - u - v;
    let n = geo.normal(a) * w + geo.normal(b) * u + geo.normal(c) * v;
    n.try_normalize().unwrap_or(Vec3::Y)
}

fn apply_brush(geo: &mut Geometry, center: Vec3, stroke_normal: Vec3, delta: Vec3, settings: BrushSettings) {
    let radius = settings.radius.max(1e-6);
    let affected: Vec<u32> = (0..geo.vertex_count as u32)
        .filter(|&v| geo.vertex(v).distance(center) <= radius)
        .collect();
    if affected.is_empty() {
        return;
    }

    let neighbors = if settings.brush_type == BrushType::Smooth { Some(build_adjacency(geo)) } else { None };

    let invert_sign = if settings.invert { -1.0 } else { 1.0 };
    let mut new_positions: Vec<(u32, Vec3)> = Vec::with_capacity(affected.len());
    for v in affected {
        let p = geo.vertex(v);
        let t = p.distance(center) / radius;
        let base_weight = falloff_weight(t, settings.falloff, v);
        if base_weight <= 0.0 {
            continue;
        }
        let w = base_weight * settings.strength * invert_sign;

        let offset = match settings.brush_type {
            BrushType::Grab => delta * w,
            BrushType::Smooth => {
                let list = neighbors.as_ref().and_then(|m| m.get(&v));
                match list {
                    Some(ns) if !ns.is_empty() => {
                        let centroid: Vec3 = ns.iter().map(|&n| geo.vertex(n)).sum::<Vec3>() / ns.len() as f32;
                        (centroid - p) * w
                    }
                    _ => Vec3::ZERO,
                }
            }
            BrushType::Clay => geo.normal(v) * (w * 0.3 * radius),
            BrushType::Crease => {
                let toward_center = (center - p).try_normalize().unwrap_or(Vec3::ZERO);
                let dir = 0.5 * toward_center + 0.5 * (-stroke_normal);
                dir * (0.3 * w)
            }
            BrushType::Inflate => geo.normal(v) * (w * 0.2 * radius),
            BrushType::Flatten => {
                let offset_from_plane = (p - center).dot(stroke_normal);
                -stroke_normal * offset_from_plane * w
            }
            BrushType::Pinch => (center - p) * (0.2 * w),
        };
        new_positions.push((v, p + offset));
    }

    for (v, p) in new_positions {
        geo.set_vertex(v, p);
    }
}

fn build_adjacency(geo: &Geometry) -> HashMap<u32, Vec<u32>> {
    let mut adjacency: HashMap<u32, Vec<u32>> = HashMap::new();
    for edge in &geo.edges {
        adjacency.entry(edge.a).or_default().push(edge.b);
        adjacency.entry(edge.b).or_default().push(edge.a);
    }
    adjacency
}

/// Blends every vertex toward its neighbor centroid by `factor`. This is
/// the stroke-end auto-smooth pass.
fn auto_smooth(geo: &mut Geometry, factor: f32) {
    let adjacency = build_adjacency(geo);
    let mut new_positions = Vec::with_capacity(geo.vertex_count);
    for v in 0..geo.vertex_count as u32 {
        let p = geo.vertex(v);
        match adjacency.get(&v) {
            Some(ns) if !ns.is_empty() => {
                let centroid: Vec3 = ns.iter().map(|&n| geo.vertex(n)).sum::<Vec3>() / ns.len() as f32;
                new_positions.push(p.lerp(centroid, factor));
            }
            _ => new_positions.push(p),
        }
    }
    for (v, p) in new_positions.into_iter().enumerate() {
        geo.set_vertex(v as u32, p);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane_mesh() -> Mesh {
        let geo = Geometry::from_buffers(
            vec![
                -1.0, 0.0, -1.0, 1.0, 0.0, -1.0, 1.0, 0.0, 1.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0,
            ],
            vec![0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0],
            vec![0.0; 10],
            vec![0, 1, 4, 1, 2, 4, 2, 3, 4, 3, 0, 4],
        )
        .unwrap();
        Mesh::new(1, "plane", geo)
    }

    fn hit_at_center(mesh: &Mesh) -> RaycastHit {
        RaycastHit { mesh_id: mesh.id, triangle: 0, t: 1.0, point: Vec3::new(0.0, 0.0, -0.5), barycentric: (0.3, 0.3) }
    }

    #[test]
    fn update_before_begin_is_noop() {
        let mut engine = SculptEngine::new();
        let mesh = plane_mesh();
        let before = mesh.geometry.clone();
        engine.set_mesh(mesh);
        let hit = hit_at_center(engine.mesh().unwrap());
        engine.update_stroke(&hit, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(engine.mesh().unwrap().geometry, before);
    }

    #[test]
    fn inflate_moves_center_vertex_outward() {
        let mut engine = SculptEngine::new();
        engine.set_mesh(plane_mesh());
        engine.set_brush_settings(BrushSettings {
            brush_type: BrushType::Inflate,
            radius: 0.5,
            strength: 0.3,
            falloff: FalloffType::Constant,
            invert: false,
            auto_smooth: 0.0,
        });
        let hit = RaycastHit { mesh_id: 1, triangle: 0, t: 1.0, point: Vec3::ZERO, barycentric: (0.0, 0.0) };
        engine.begin_stroke(&hit);
        engine.update_stroke(&hit, Vec3::ZERO);
        let moved = engine.mesh().unwrap().geometry.vertex(4);
        assert!(moved.y > 0.0);
    }

    #[test]
    fn undo_restores_snapshot() {
        let mut engine = SculptEngine::new();
        engine.set_mesh(plane_mesh());
        let original = engine.mesh().unwrap().geometry.clone();
        engine.set_brush_settings(BrushSettings {
            brush_type: BrushType::Inflate,
            radius: 0.5,
            strength: 0.5,
            falloff: FalloffType::Constant,
            invert: false,
            auto_smooth: 0.0,
        });
        let hit = RaycastHit { mesh_id: 1, triangle: 0, t: 1.0, point: Vec3::ZERO, barycentric: (0.0, 0.0) };
        engine.begin_stroke(&hit);
        engine.update_stroke(&hit, Vec3::ZERO);
        engine.undo_stroke();
        assert_eq!(engine.mesh().unwrap().geometry.vertex(4), original.vertex(4));
    }

    #[test]
    fn symmetry_mirrors_the_stroke() {
        let mut engine = SculptEngine::new();
        engine.set_mesh(plane_mesh());
        engine.set_symmetry(0, true);
        engine.set_brush_settings(BrushSettings {
            brush_type: BrushType::Grab,
            radius: 1.5,
            strength: 1.0,
            falloff: FalloffType::Constant,
            invert: false,
            auto_smooth: 0.0,
        });
        let hit = RaycastHit { mesh_id: 1, triangle: 0, t: 1.0, point: Vec3::new(1.0, 0.0, -1.0), barycentric: (0.0, 0.0) };
        engine.begin_stroke(&hit);
        engine.update_stroke(&hit, Vec3::new(0.0, 1.0, 0.0));
        // vertex 0 is at (-1, 0, -1), the x-mirror of the hit point
        // (vertex 1 at (1, 0, -1)), and should also have moved.
        assert!(engine.mesh().unwrap().geometry.vertex(0).y > 0.0);
    }
}

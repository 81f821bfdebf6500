use rayon::prelude::*;
use std::collections::{HashMap, HashSet};

use crate::config::KernelConfig;
use crate::error::{KernelError, Result};
use crate::types::Vec3;

/// A deduplicated, unordered vertex pair `(a, b)` with `a < b`, an edge
/// that appears as a triangle side somewhere in [`Geometry::indices`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Edge {
    pub a: u32,
    pub b: u32,
}

impl Edge {
    /// Canonical form: `a < b`.
    pub fn new(x: u32, y: u32) -> Self {
        if x < y { Edge { a: x, b: y } } else { Edge { a: y, b: x } }
    }
}

/// One entry per triangle in [`Geometry::indices`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Face {
    pub vertex_indices: [u32; 3],
    pub normal: Vec3,
}

/// The flat vertex/normal/UV/index buffers plus their derived edge and
/// face lists. Geometry invariants:
///
/// 1. `vertex_count * 3 == vertices.len() == normals.len()`;
///    `vertex_count * 2 == uvs.len()`.
/// 2. Every index in `indices` is `< vertex_count`.
/// 3. No triangle has a repeated index (rebuilds drop these).
/// 4. `edges` is the canonical edge set of `indices`.
/// 5. `faces[i]` corresponds to triangle `i` of `indices`.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Geometry {
    pub vertices: Vec<f32>,
    pub normals: Vec<f32>,
    pub uvs: Vec<f32>,
    pub indices: Vec<u32>,
    pub vertex_count: usize,
    pub edges: Vec<Edge>,
    pub faces: Vec<Face>,
}

impl Geometry {
    /// Builds a `Geometry` from flat vertex/normal/uv/index buffers and
    /// immediately rebuilds `edges` and `faces`. Drops degenerate
    /// triangles (repeated index) per invariant 3.
    pub fn from_buffers(
        vertices: Vec<f32>,
        normals: Vec<f32>,
        uvs: Vec<f32>,
        indices: Vec<u32>,
    ) -> Result<Self> {
        if indices.len() % 3 != 0 {
            return Err(KernelError::IndicesNotTriples);
        }
        let vertex_count = vertices.len() / 3;
        if vertex_count * 3 != vertices.len() || vertex_count * 3 != normals.len() || vertex_count * 2 != uvs.len() {
            return Err(KernelError::VertexCountMismatch);
        }
        if indices.iter().any(|&i| i as usize >= vertex_count) {
            return Err(KernelError::IndexOutOfBounds);
        }
        let mut geo = Self {
            vertices,
            normals,
            uvs,
            indices,
            vertex_count,
            edges: Vec::new(),
            faces: Vec::new(),
        };
        geo.rebuild_derived();
        Ok(geo)
    }

    pub fn vertex(&self, i: u32) -> Vec3 {
        let i = i as usize * 3;
        Vec3::new(self.vertices[i], self.vertices[i + 1], self.vertices[i + 2])
    }

    pub fn normal(&self, i: u32) -> Vec3 {
        let i = i as usize * 3;
        Vec3::new(self.normals[i], self.normals[i + 1], self.normals[i + 2])
    }

    pub fn uv(&self, i: u32) -> (f32, f32) {
        let i = i as usize * 2;
        (self.uvs[i], self.uvs[i + 1])
    }

    pub fn set_vertex(&mut self, i: u32, v: Vec3) {
        let i = i as usize * 3;
        self.vertices[i] = v.x;
        self.vertices[i + 1] = v.y;
        self.vertices[i + 2] = v.z;
    }

    pub fn set_normal(&mut self, i: u32, n: Vec3) {
        let i = i as usize * 3;
        self.normals[i] = n.x;
        self.normals[i + 1] = n.y;
        self.normals[i + 2] = n.z;
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangle(&self, t: usize) -> [u32; 3] {
        let b = t * 3;
        [self.indices[b], self.indices[b + 1], self.indices[b + 2]]
    }

    /// Appends a vertex, returning its new index.
    pub fn push_vertex(&mut self, position: Vec3, normal: Vec3, uv: (f32, f32)) -> u32 {
        let idx = self.vertex_count as u32;
        self.vertices.extend_from_slice(&[position.x, position.y, position.z]);
        self.normals.extend_from_slice(&[normal.x, normal.y, normal.z]);
        self.uvs.extend_from_slice(&[uv.0, uv.1]);
        self.vertex_count += 1;
        idx
    }

    /// Rebuilds `edges` and `faces` from `indices`, dropping any
    /// triangle with a repeated index. `faces[i].normal` is taken from
    /// the vertex normal of the triangle's first vertex, a cheap proxy.
    /// Call [`Geometry::recompute_vertex_normals`] first when positions
    /// are authoritative and accuracy matters.
    pub fn rebuild_derived(&mut self) {
        let mut clean_indices = Vec::with_capacity(self.indices.len());
        for t in 0..(self.indices.len() / 3) {
            let tri = self.triangle(t);
            if tri[0] != tri[1] && tri[1] != tri[2] && tri[0] != tri[2] {
                clean_indices.extend_from_slice(&tri);
            }
        }
        self.indices = clean_indices;

        let mut edge_set: HashSet<Edge> = HashSet::new();
        let mut faces = Vec::with_capacity(self.triangle_count());
        for t in 0..self.triangle_count() {
            let tri = self.triangle(t);
            edge_set.insert(Edge::new(tri[0], tri[1]));
            edge_set.insert(Edge::new(tri[1], tri[2]));
            edge_set.insert(Edge::new(tri[2], tri[0]));
            let normal = if (tri[0] as usize) < self.vertex_count {
                self.normal(tri[0])
            } else {
                Vec3::ZERO
            };
            faces.push(Face { vertex_indices: tri, normal });
        }
        let mut edges: Vec<Edge> = edge_set.into_iter().collect();
        edges.sort_by_key(|e| (e.a, e.b));
        self.edges = edges;
        self.faces = faces;
    }

    /// Recomputes every per-vertex normal by accumulating area-weighted
    /// face normals over incident triangles and renormalizing. Used by
    /// any operator that creates vertices whose position is authoritative
    /// but whose normal is not yet known (decimate, sculpt, subdivide
    /// midpoints before smoothing).
    pub fn recompute_vertex_normals(&mut self) {
        self.recompute_vertex_normals_with(&KernelConfig::default());
    }

    pub fn recompute_vertex_normals_with(&mut self, config: &KernelConfig) {
        let tri_count = self.triangle_count();
        let use_parallel = config.parallel && tri_count >= config.parallel_threshold;

        let face_contribs: Vec<(u32, u32, u32, Vec3)> = if use_parallel {
            (0..tri_count)
                .into_par_iter()
                .map(|t| self.triangle_area_normal(t))
                .collect()
        } else {
            (0..tri_count).map(|t| self.triangle_area_normal(t)).collect()
        };

        let mut accum = vec![Vec3::ZERO; self.vertex_count];
        for (a, b, c, weighted) in face_contribs {
            accum[a as usize] += weighted;
            accum[b as usize] += weighted;
            accum[c as usize] += weighted;
        }

        for (i, n) in accum.into_iter().enumerate() {
            let normalized = if n.length_squared() > 0.0 { n.normalize() } else { Vec3::ZERO };
            self.set_normal(i as u32, normalized);
        }
    }

    /// Returns `(v0, v1, v2, area_weighted_normal)` for triangle `t`: the
    /// (non-unit) cross product, whose magnitude is twice the triangle's
    /// area, so summing it across incident faces naturally area-weights.
    fn triangle_area_normal(&self, t: usize) -> (u32, u32, u32, Vec3) {
        let [a, b, c] = self.triangle(t);
        let (pa, pb, pc) = (self.vertex(a), self.vertex(b), self.vertex(c));
        let n = (pb - pa).cross(pc - pa);
        (a, b, c, n)
    }

    /// Debug-only invariant check, asserted at the start and end of every
    /// public operator in non-release builds.
    pub fn debug_assert_invariants(&self) {
        debug_assert_eq!(self.vertex_count * 3, self.vertices.len());
        debug_assert_eq!(self.vertex_count * 3, self.normals.len());
        debug_assert_eq!(self.vertex_count * 2, self.uvs.len());
        debug_assert_eq!(self.indices.len() % 3, 0);
        debug_assert!(self.indices.iter().all(|&i| (i as usize) < self.vertex_count));
    }

    /// Boundary edges: edges that appear in exactly one triangle. Used by
    /// extrude (side faces), solidify (rim), and bridge (edge-loop walk).
    pub fn boundary_edges(&self) -> Vec<Edge> {
        let mut counts: HashMap<Edge, u32> = HashMap::new();
        for t in 0..self.triangle_count() {
            let tri = self.triangle(t);
            for e in [Edge::new(tri[0], tri[1]), Edge::new(tri[1], tri[2]), Edge::new(tri[2], tri[0])] {
                *counts.entry(e).or_insert(0) += 1;
            }
        }
        counts.into_iter().filter(|(_, c)| *c == 1).map(|(e, _)| e).collect()
    }

    /// Axis-aligned bounding box `(min, max)`. Used by array's `relative`
    /// offset mode.
    pub fn bounding_box(&self) -> (Vec3, Vec3) {
        if self.vertex_count == 0 {
            return (Vec3::ZERO, Vec3::ZERO);
        }
        let mut min = self.vertex(0);
        let mut max = min;
        for i in 1..self.vertex_count as u32 {
            let v = self.vertex(i);
            min = min.min(v);
            max = max.max(v);
        }
        (min, max)
    }
}

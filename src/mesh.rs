use crate::geometry::Geometry;
use crate::types::{Color, Transform};

/// Phong-ish material record. Opaque to every operator, carried through
/// unchanged on any mesh an operator produces.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Material {
    pub color: Color,
    pub roughness: f32,
    pub metalness: f32,
    pub opacity: f32,
    pub wireframe: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Color::default(),
            roughness: 0.5,
            metalness: 0.0,
            opacity: 1.0,
            wireframe: false,
        }
    }
}

/// A [`Geometry`] plus the scene-graph bookkeeping an operator never
/// looks at: id, name, material, transform, visibility, lock state, and
/// parent. Only `geometry` and `transform` are meaningful to kernel
/// operators; the rest is carried through unchanged.
///
/// Meshes are immutable from the kernel's perspective. An operator
/// produces a new `Geometry` rather than mutating one in place; the
/// sculpt engine is the sole exception.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mesh {
    pub id: u64,
    pub name: String,
    pub geometry: Geometry,
    pub material: Material,
    pub transform: Transform,
    pub visible: bool,
    pub locked: bool,
    pub parent_id: Option<u64>,
}

impl Mesh {
    pub fn new(id: u64, name: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            id,
            name: name.into(),
            geometry,
            material: Material::default(),
            transform: Transform::identity(),
            visible: true,
            locked: false,
            parent_id: None,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    /// Returns a copy of this mesh with `geometry` replaced, preserving
    /// id, material, transform, and every other bookkeeping field. This
    /// is the shape every operator's output takes.
    pub fn with_geometry(&self, geometry: Geometry) -> Self {
        Self {
            geometry,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;

    fn empty_geo() -> Geometry {
        Geometry::from_buffers(vec![], vec![], vec![], vec![]).unwrap()
    }

    #[test]
    fn with_geometry_preserves_identity_and_material() {
        let mesh = Mesh::new(7, "cube", empty_geo()).with_material(Material {
            opacity: 0.5,
            ..Material::default()
        });
        let replaced = mesh.with_geometry(empty_geo());
        assert_eq!(replaced.id, 7);
        assert_eq!(replaced.name, "cube");
        assert_eq!(replaced.material.opacity, 0.5);
    }
}

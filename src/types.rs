use glam::{Mat4, Quat};

/// A 3D vector / position. Re-export of `glam::Vec3`. The kernel carries
/// no renderer, but keeps the same math type a `glam`-backed engine
/// would already be using.
pub type Vec3 = glam::Vec3;

/// Packed RGBA color. `r, g, b` are conventionally `0..=255`; `a` is
/// `0.0..=1.0`. Opaque to every operator, passed through unchanged on
/// any [`crate::mesh::Material`] that flows in.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 1.0 };

    pub fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

/// Position, Euler-XYZ rotation (radians), and scale of a [`crate::mesh::Mesh`].
///
/// Applied in the order scale → rotate(X) → rotate(Y) → rotate(Z) →
/// translate. This ordering is load-bearing: picking, sculpt hit tests,
/// and CSG polygon baking all bake world-space vertices through
/// [`Transform::to_matrix`] and must agree on it.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn from_position(position: Vec3) -> Self {
        Self { position, ..Self::default() }
    }

    /// World matrix for scale → rotate(X) → rotate(Y) → rotate(Z) → translate.
    pub fn to_matrix(&self) -> Mat4 {
        let rot = Quat::from_rotation_z(self.rotation.z)
            * Quat::from_rotation_y(self.rotation.y)
            * Quat::from_rotation_x(self.rotation.x);
        Mat4::from_scale_rotation_translation(self.scale, rot, self.position)
    }

    /// Transforms a local-space point into world space.
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.to_matrix().transform_point3(p)
    }

    /// Transforms a local-space direction (normal) into world space,
    /// ignoring translation; does not renormalize.
    pub fn transform_direction(&self, d: Vec3) -> Vec3 {
        self.to_matrix().transform_vector3(d)
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }
}

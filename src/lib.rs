//! Pure mesh operator kernel, sculpting engine, and picking kernel for a
//! polygonal modeler. Every operator in [`ops`] is a deterministic
//! `Geometry -> Geometry` transform; [`sculpt::SculptEngine`] is the one
//! stateful, mutate-in-place exception.

pub mod config;
pub mod error;
pub mod geometry;
pub mod mesh;
pub mod ops;
pub mod picking;
pub mod sculpt;
pub mod types;

pub use config::KernelConfig;
pub use error::{KernelError, Result};
pub use geometry::{Edge, Face, Geometry};
pub use mesh::{Material, Mesh};
pub use ops::{
    array, bevel, boolean, bridge_edge_loops, decimate, detect_edge_loops, extrude, knife, knife_project, loop_cut,
    mirror, solidify, subdivide, ArrayMode, ArrayOptions, Axis, BevelOptions, BlendCurve, BooleanOperation,
    BridgeOptions, DecimateMode, DecimateOptions, ExtrudeOptions, KnifeOptions, LoopCutOptions, MirrorOptions,
    SolidifyOptions, SubdivideOptions,
};
pub use picking::{
    find_closest_vertex, get_ray_from_mouse, intersect_ray_triangle, intersect_segment_triangle, is_point_near_edge,
    raycast, raycast_mesh, Camera, ProjectionKind, Ray, RaycastHit,
};
pub use sculpt::{BrushSettings, BrushType, FalloffType, SculptEngine};
pub use types::{Color, Transform, Vec3};

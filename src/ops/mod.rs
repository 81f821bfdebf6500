//! One module per mesh operator. Every operator is
//! `(Geometry, Options) -> Geometry` (or, for the handful that can hit a
//! hard precondition violation, `-> Result<Geometry>`); none observes or
//! mutates anything outside its arguments.

pub mod array;
pub mod bevel;
pub mod boolean;
pub mod bridge;
pub mod decimate;
pub mod extrude;
pub mod knife;
pub mod loop_cut;
pub mod mirror;
pub mod solidify;
pub mod subdivide;

pub use array::{array, ArrayMode, ArrayOptions};
pub use bevel::{bevel, BevelOptions};
pub use boolean::{boolean, BooleanOperation};
pub use bridge::{bridge_edge_loops, detect_edge_loops, BlendCurve, BridgeOptions};
pub use decimate::{decimate, DecimateMode, DecimateOptions};
pub use extrude::{extrude, ExtrudeOptions};
pub use knife::{knife, knife_project, KnifeOptions};
pub use loop_cut::{loop_cut, LoopCutOptions};
pub use mirror::{mirror, Axis, MirrorOptions};
pub use solidify::{solidify, SolidifyOptions};
pub use subdivide::{subdivide, SubdivideOptions};

use derive_more::{Display, From};

pub type Result<T> = core::result::Result<T, KernelError>;

/// Hard precondition violations, invariants of the data model itself.
/// Silent no-ops and clamped fallbacks never
/// produce one of these; they are encoded by the geometry an operator
/// returns, not by this type.
#[derive(Debug, Display, From)]
#[display("{self:?}")]
pub enum KernelError {
    /// `indices.len()` is not a multiple of 3.
    IndicesNotTriples,
    /// `vertexCount * 3 != vertices.len()` (or the normals/uvs analogue).
    VertexCountMismatch,
    /// An index in `indices` is `>= vertexCount`.
    IndexOutOfBounds,
    /// An operator that requires non-degenerate input (e.g. bridge loop
    /// detection) was handed something it cannot make sense of.
    DegenerateInput,
}

impl std::error::Error for KernelError {}

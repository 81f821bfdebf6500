/// Tolerances and switches shared across operators.
///
/// A plain value threaded through (or defaulted by) whichever operator
/// needs it, rather than an ECS resource. This crate has no ECS to
/// register a resource into.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KernelConfig {
    /// Möller–Trumbore ray/triangle and segment/triangle epsilon.
    pub raycast_epsilon: f32,
    /// BSP plane-classification epsilon.
    pub bsp_epsilon: f32,
    /// Decimal digits used to bucket "close enough" vertices when
    /// welding (array `mergeVertices`, mirror `merge`).
    pub merge_decimal_digits: u32,
    /// Run the rayon-parallel path for passes large enough to benefit
    /// (quadric accumulation, scene raycast, normal recompute).
    pub parallel: bool,
    /// Triangle/vertex count below which the sequential path is used
    /// even when `parallel` is set, since the parallel path costs more
    /// than it saves on small inputs.
    pub parallel_threshold: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            raycast_epsilon: 1e-6,
            bsp_epsilon: 1e-5,
            merge_decimal_digits: 4,
            parallel: true,
            parallel_threshold: 2048,
        }
    }
}

impl KernelConfig {
    /// Merge bucket width implied by [`merge_decimal_digits`](Self::merge_decimal_digits).
    pub fn merge_quantum(&self) -> f32 {
        10f32.powi(-(self.merge_decimal_digits as i32))
    }
}

//! The workload hint and the numeric thresholds it selects.
//!
//! Every execution is tagged with a [`Workload`], which the executor
//! (`crate::executor`) uses to decide whether a transform is worth
//! splitting across threads at all, and if so how large a batch should be
//! claimed by a worker before it checks back in with the shared position
//! counter.

/// A caller-declared hint about the expected size of an execution, used to
/// pick the parallel threshold and batch size without having to measure
/// anything at runtime.
///
/// `Default` here names the workload, not Rust's `Default` semantics for
/// the value produced by other types; it is nonetheless the variant
/// returned by `Workload::default()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Workload {
    /// Expect the smallest inputs; the highest parallel threshold and the
    /// largest batch size, so only very large columns are split at all.
    Small,
    /// The workload used when the caller has no better information.
    Default,
    /// Expect large inputs; split eagerly, in small batches.
    Large,
    /// Expect huge inputs; split as eagerly and as finely as possible.
    Huge,
}

impl Default for Workload {
    fn default() -> Self {
        Workload::Default
    }
}

impl Workload {
    /// `T_par`: below this element count, equal-parts mode always picks a
    /// single batch (no parallelism at all).
    pub const fn parallel_threshold(self) -> usize {
        match self {
            Workload::Small => 1 << 15,
            Workload::Default => 1 << 10,
            Workload::Large => 1 << 5,
            Workload::Huge => 1 << 2,
        }
    }

    /// `B`: the window size a worker claims at a time in batched mode.
    pub const fn batch_size(self) -> usize {
        match self {
            Workload::Small => 1 << 20,
            Workload::Default => 1 << 15,
            Workload::Large => 1 << 10,
            Workload::Huge => 1 << 5,
        }
    }
}

/// Multiplier applied to `B * P` to decide whether an execution is large
/// enough to justify batched (work-stealing) dispatch over equal-parts.
pub const THRESHOLD_FACTOR_EQUAL_PARTS: usize = 2;

/// Every batch boundary in equal-parts mode (other than a final partial
/// batch) must land on a multiple of this value, to satisfy the alignment
/// requirement of the 2-bit packed categorical buffer.
pub const BATCH_DIVISOR: usize = 4;

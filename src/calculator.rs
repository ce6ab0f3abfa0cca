//! The `Calculator` contract: the unit of work the executor dispatches.
//!
//! Every applier, reducer, and filterer in this crate is, underneath its
//! typed public API, one `Calculator` implementation. The split between a
//! `&self`-based concurrent phase (`init`, `do_part`) and a by-value final
//! phase (`result`) lets a calculator hold interior-mutable or lock-guarded
//! state while workers are still running, then consume itself to hand back
//! plain owned data once every worker has joined — the same shape
//! `differential-dataflow`'s `Batcher` trait uses (`push_batch` taking
//! `&mut self` while a batch is being built, `seal` consuming it to produce
//! an immutable `Output`).

use crate::error::ExecutionError;

/// A unit of work that can be split into batches and run across a thread
/// pool by [`crate::executor::ParallelExecutor`].
///
/// `do_part` is called once per batch, never twice for the same
/// `batch_index`, from any worker thread; the executor guarantees that
/// every index in `0..num_batches` is eventually passed to some call,
/// unless cancellation cuts the execution short. Once all calls have
/// returned (successfully or not), the executor calls `result` exactly
/// once, on whichever thread drove the execution, to extract the output.
pub trait Calculator: Sync {
    /// The value produced once every batch has completed.
    type Output;

    /// The error type a batch can fail with; propagated to the caller
    /// wrapped in [`ExecutionError::User`].
    type Error: std::error::Error + Send + 'static;

    /// The total element/row count this calculator processes, `N`. Must
    /// be stable across a single execution; the executor calls this
    /// before deciding a strategy and never again.
    fn num_ops(&self) -> usize;

    /// Called once, before any batch runs, with the number of batches the
    /// executor has decided to split this execution into. Implementations
    /// that pre-size per-batch storage (a `Vec` of slots, a combine tree)
    /// do so here.
    fn init(&self, num_batches: usize);

    /// Processes the half-open range `[from, to)`, identified by the dense
    /// `batch_index` assigned by the executor (batches are numbered in
    /// ascending order of their `from` position, starting at 0).
    fn do_part(
        &self,
        from: usize,
        to: usize,
        batch_index: usize,
    ) -> Result<(), ExecutionError<Self::Error>>;

    /// Consumes the calculator to produce its final output. Only called
    /// after every batch's `do_part` has returned `Ok`.
    fn result(self) -> Self::Output;
}

//! The execution context collaborator.
//!
//! The specification describes a context as something callers hand the
//! engine a reference to, not something the engine constructs: a
//! task-group runner that already exists for reasons outside this crate's
//! concern (a UI event loop, a server's worker pool, a batch job
//! scheduler). Accordingly [`Context`] only exposes the two facts the
//! executor actually needs — whether it should keep going, and how much
//! parallelism it has to work with — and does not own the threads that
//! run the work.
//!
//! [`ThreadPoolContext`] is this crate's own reference collaborator, for
//! callers with no pool of their own to hand in. Its threads are a scoped
//! region ([`crossbeam::thread::scope`]) rather than a long-lived
//! `Arc`-shared pool, the same bounded-lifetime shape TiKV's worker pool
//! (`tikv_util::worker::pool`) uses a pool for — one unit of work, then
//! gone — since every execution here is run to completion before the
//! next one starts.

use std::sync::atomic::{AtomicBool, Ordering};

/// The execution environment an engine operation runs under.
///
/// Implementations must be cheap to query from any worker thread; the
/// executor calls [`Context::is_active`] frequently as part of its
/// cancellation check.
pub trait Context: Sync {
    /// Whether the context still wants work done. Once this returns
    /// `false`, the executor stops dispatching new batches and returns
    /// [`crate::error::EngineError::Aborted`] (wrapped appropriately) from
    /// any execution still in flight.
    fn is_active(&self) -> bool;

    /// The degree of parallelism the context makes available. The
    /// executor never spawns more concurrent batches than this.
    fn parallelism(&self) -> usize;
}

/// A [`Context`] backed by a fixed-size scoped thread pool.
///
/// `parallelism` is decided once, at construction, from the number of
/// available cores (or an explicit override); `is_active` starts `true`
/// and can be flipped permanently by [`ThreadPoolContext::cancel`], e.g.
/// from a signal handler or a UI "stop" button wired up by the caller.
pub struct ThreadPoolContext {
    parallelism: usize,
    active: AtomicBool,
}

impl ThreadPoolContext {
    /// Builds a context with `parallelism` reported as
    /// `std::thread::available_parallelism()`, falling back to `1` if the
    /// platform cannot report it.
    pub fn new() -> Self {
        let parallelism = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::with_parallelism(parallelism)
    }

    /// Builds a context that reports exactly `parallelism` (clamped to at
    /// least 1).
    pub fn with_parallelism(parallelism: usize) -> Self {
        ThreadPoolContext { parallelism: parallelism.max(1), active: AtomicBool::new(true) }
    }

    /// Permanently marks this context inactive. Any execution currently in
    /// flight observes this the next time it checks [`Context::is_active`]
    /// and stops dispatching further batches.
    pub fn cancel(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

impl Default for ThreadPoolContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Context for ThreadPoolContext {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn parallelism(&self) -> usize {
        self.parallelism
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_active_and_reports_parallelism() {
        let ctx = ThreadPoolContext::with_parallelism(4);
        assert!(ctx.is_active());
        assert_eq!(ctx.parallelism(), 4);
    }

    #[test]
    fn cancel_is_permanent() {
        let ctx = ThreadPoolContext::with_parallelism(2);
        ctx.cancel();
        assert!(!ctx.is_active());
        ctx.cancel();
        assert!(!ctx.is_active());
    }

    #[test]
    fn parallelism_is_clamped_to_at_least_one() {
        let ctx = ThreadPoolContext::with_parallelism(0);
        assert_eq!(ctx.parallelism(), 1);
    }
}

//! Loggers and logging events for the parallel executor.
//!
//! Modelled directly on `differential-dataflow::logging`: a closed event
//! enum plus a logger handle that is always `Option`-wrapped so that
//! logging costs nothing when no one is listening. This crate has no
//! dataflow worker to hang a `timely` logging registry off of, so the
//! handle here is a plain trait object instead of `TypedLogger`, but the
//! shape — a `Batch`/`Merge`/`Drop`-style closed enum of named events,
//! reported through an optional handle threaded down to every component
//! that can produce one — is the same one the teacher uses.

use std::fmt;

/// An event worth reporting from inside an execution.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutorEvent {
    /// The executor picked a dispatch strategy for an execution.
    StrategyChosen {
        /// Total element/row count being processed.
        num_ops: usize,
        /// Parallelism degree offered by the context.
        parallelism: usize,
        /// Human-readable strategy name (`"batched"` or `"equal_parts"`).
        strategy: &'static str,
        /// Number of batches the strategy settled on.
        num_batches: usize,
    },
    /// A single batch was dispatched to a worker.
    BatchDispatched {
        /// Start of the half-open interval, inclusive.
        from: usize,
        /// End of the half-open interval, exclusive.
        to: usize,
        /// Dense batch index passed to `Calculator::do_part`.
        batch_index: usize,
    },
    /// Two combine-tree accumulators were merged.
    CombineTreeMerge {
        /// Tree level at which the merge happened (0 = leaves).
        level: usize,
    },
    /// The sentinel was flipped from active to cancelled.
    Cancelled {
        /// Whether the cancellation originated from the context going
        /// inactive (`true`) or from a propagated user/engine error
        /// (`false`).
        context_inactive: bool,
    },
}

impl fmt::Display for ExecutorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorEvent::StrategyChosen { num_ops, parallelism, strategy, num_batches } => {
                write!(f, "strategy={strategy} num_ops={num_ops} parallelism={parallelism} num_batches={num_batches}")
            }
            ExecutorEvent::BatchDispatched { from, to, batch_index } => {
                write!(f, "batch[{batch_index}] = [{from}, {to})")
            }
            ExecutorEvent::CombineTreeMerge { level } => write!(f, "combine merge at level {level}"),
            ExecutorEvent::Cancelled { context_inactive } => {
                write!(f, "cancelled (context_inactive={context_inactive})")
            }
        }
    }
}

/// A sink for [`ExecutorEvent`]s.
///
/// Implementations must be safe to call concurrently from any worker
/// thread; the default no-op logger used when the caller passes `None`
/// costs nothing beyond a branch.
pub trait Logger: Send + Sync {
    /// Record one event.
    fn log(&self, event: ExecutorEvent);
}

impl<F: Fn(ExecutorEvent) + Send + Sync> Logger for F {
    fn log(&self, event: ExecutorEvent) {
        self(event)
    }
}

/// Log through an optional logger, at zero cost when absent.
#[inline]
pub(crate) fn log(logger: Option<&dyn Logger>, event: ExecutorEvent) {
    if let Some(logger) = logger {
        logger.log(event);
    }
}

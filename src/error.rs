//! The error taxonomy shared by every façade, calculator, and buffer.
//!
//! `differential-dataflow` mostly leans on `panic!` and bare
//! `Result<(), String>` at its edges (see e.g. `TraceReader::cursor`'s
//! "unable to acquire complete cursor" panic); that is too coarse for an
//! engine whose whole point is to surface exactly one well-typed failure
//! out of a thread pool. `thiserror` is used here the way Sui's
//! consensus core derives `CoreError`
//! (`consensus/core/src/core_thread.rs`): one small enum, one
//! `#[error("...")]` string per variant, no boxing.

use std::fmt;

/// Errors raised by the engine itself, as opposed to the caller's
/// operator, reducer, or combiner.
///
/// Every variant corresponds to one row of the error taxonomy: these are
/// either validated eagerly by a façade before any worker runs, or raised
/// cooperatively by the executor or a buffer during execution.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A required argument was missing (a null column, a null operator, a
    /// null combiner, ...). Raised eagerly by a façade.
    #[error("missing required argument: {0}")]
    NullArgument(&'static str),

    /// A multi-column façade was given an empty column list.
    #[error("column list must not be empty")]
    EmptyColumns,

    /// An argument was present but out of range (e.g. a negative
    /// `maxNumberOfValues`). Raised eagerly by a façade.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// An object column was read as a type that is not a supertype of its
    /// element type.
    #[error("object column element type is not a supertype of the requested read type")]
    TypeMismatch,

    /// A categorical operator produced more distinct values than the
    /// selected `Format` can encode. Raised by the target buffer's `set`.
    #[error("operator produced more distinct values than the format capacity of {max}")]
    CapacityExceeded {
        /// The capacity of the format that was exceeded.
        max: u64,
    },

    /// A mutable reducer's accumulator supplier returned no accumulator.
    #[error("reducer supplier returned no accumulator")]
    NullSupplier,

    /// The execution context became inactive, or another worker had
    /// already flipped the shared sentinel.
    #[error("execution was cancelled")]
    Aborted,
}

/// The result of a failed `execute`: either one of the engine's own
/// errors, or the user's operator/reducer/combiner error, propagated
/// unchanged.
///
/// Calculators are generic over their own error type (`Calculator::Error`)
/// rather than forced to box every user error, mirroring how
/// `Calculator`'s other associated types keep the engine generic instead
/// of dynamically typed.
#[derive(Debug)]
pub enum ExecutionError<E> {
    /// A failure raised by the engine itself.
    Engine(EngineError),
    /// A failure raised by the caller's operator, reducer, or combiner.
    User(E),
}

impl<E> From<EngineError> for ExecutionError<E> {
    fn from(e: EngineError) -> Self {
        ExecutionError::Engine(e)
    }
}

impl<E: fmt::Display> fmt::Display for ExecutionError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionError::Engine(e) => write!(f, "{e}"),
            ExecutionError::User(e) => write!(f, "{e}"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for ExecutionError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExecutionError::Engine(e) => Some(e),
            ExecutionError::User(e) => Some(e),
        }
    }
}

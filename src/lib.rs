//! A data-parallel column-transformation engine.
//!
//! Given one or more immutable source columns and a caller-supplied
//! per-element (or per-row) function, this crate maps them into a
//! freshly allocated typed buffer, reduces them to a scalar or
//! container, or derives a row-index array by predicate filtering. Work
//! is split across worker threads supplied by an external
//! [`context::Context`]; [`executor::ParallelExecutor`] decides whether
//! and how to split based on input size, a caller-declared
//! [`workload::Workload`] hint, and the target buffer's alignment
//! constraints.
//!
//! The typed entry points — [`facade::Transformer`],
//! [`facade::RowTransformer`], [`facade::Filterer`],
//! [`facade::RowFilterer`] — are thin dispatch layers over the
//! [`calculator::Calculator`] contract; most callers only need those
//! four types plus a [`context::ThreadPoolContext`] and the output
//! buffer types in [`column::buffer`].

pub mod appliers;
pub mod calculator;
pub mod column;
pub mod combine_tree;
pub mod context;
pub mod error;
pub mod executor;
pub mod facade;
pub mod filterers;
pub mod logging;
pub mod reducers;
pub mod workload;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use calculator::Calculator;
pub use context::{Context, ThreadPoolContext};
pub use error::{EngineError, ExecutionError};
pub use executor::ParallelExecutor;
pub use facade::{Filterer, RowFilterer, RowTransformer, Transformer};
pub use workload::Workload;

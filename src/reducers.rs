//! Reducers: fold one or more columns down to a scalar or container.
//!
//! Two shapes, per the specification: an identity-plus-associative-op fold
//! for primitive numeric/categorical reductions, and a mutable reduction
//! (supplier + per-batch accumulator + [`CombineTree`]) for anything
//! richer. Both shapes exist once per single-column source read-mode
//! (`Numeric`, `Categorical`) plus one row-wise mutable reducer generic
//! over any [`RowSource`], mirroring the source system's
//! `NumericColumnsReducer`/`CategoricalColumnsReducer` family without
//! repeating the fold logic once per arity.

use parking_lot::Mutex;
use std::marker::PhantomData;
use std::sync::OnceLock;

use crate::calculator::Calculator;
use crate::column::reader::{
    CategoricalReader, CategoricalSource, Column, NumericReader, NumericSource, RowReader, RowSource,
};
use crate::combine_tree::CombineTree;
use crate::error::{EngineError, ExecutionError};

/// Identity-plus-associative-op fold over a [`NumericSource`].
///
/// `fold` is applied left-to-right within each batch, seeded from
/// `identity`; `combine` folds the per-batch partial results, again
/// left-to-right in batch order, seeded from `identity` again. `fold` and
/// `combine` may be the same operation or distinct ones, per the
/// specification.
pub struct NumericIdentityReducer<'s, S, V, Fold, Combine, E> {
    source: &'s S,
    identity: V,
    fold: Fold,
    combine: Combine,
    partials: Mutex<Vec<Option<V>>>,
    _error: PhantomData<fn() -> E>,
}

impl<'s, S, V, Fold, Combine, E> NumericIdentityReducer<'s, S, V, Fold, Combine, E> {
    /// Builds a reducer seeded with `identity`, folding elements with
    /// `fold` and partial results with `combine`.
    pub fn new(source: &'s S, identity: V, fold: Fold, combine: Combine) -> Self {
        NumericIdentityReducer { source, identity, fold, combine, partials: Mutex::new(Vec::new()), _error: PhantomData }
    }
}

impl<'s, S, V, Fold, Combine, E> Calculator for NumericIdentityReducer<'s, S, V, Fold, Combine, E>
where
    S: NumericSource + Sync,
    V: Clone + Send,
    Fold: Fn(V, f64) -> Result<V, E> + Sync,
    Combine: Fn(V, V) -> V + Sync,
    E: std::error::Error + Send + 'static,
{
    type Output = V;
    type Error = E;

    fn num_ops(&self) -> usize {
        self.source.size()
    }

    fn init(&self, num_batches: usize) {
        *self.partials.lock() = vec![None; num_batches];
    }

    fn do_part(&self, from: usize, to: usize, batch_index: usize) -> Result<(), ExecutionError<E>> {
        let mut reader = self.source.numeric_reader(to);
        reader.set_position(from as i64 - 1);
        let mut acc = self.identity.clone();
        for _ in from..to {
            let value = reader.read();
            acc = (self.fold)(acc, value).map_err(ExecutionError::User)?;
        }
        self.partials.lock()[batch_index] = Some(acc);
        Ok(())
    }

    fn result(self) -> V {
        self.partials
            .into_inner()
            .into_iter()
            .map(|slot| slot.expect("every batch index was assigned by do_part"))
            .fold(self.identity, |acc, part| (self.combine)(acc, part))
    }
}

/// Identity-plus-associative-op fold over a [`CategoricalSource`].
pub struct CategoricalIdentityReducer<'s, S, V, Fold, Combine, E> {
    source: &'s S,
    identity: V,
    fold: Fold,
    combine: Combine,
    partials: Mutex<Vec<Option<V>>>,
    _error: PhantomData<fn() -> E>,
}

impl<'s, S, V, Fold, Combine, E> CategoricalIdentityReducer<'s, S, V, Fold, Combine, E> {
    /// Builds a reducer seeded with `identity`, folding elements with
    /// `fold` and partial results with `combine`.
    pub fn new(source: &'s S, identity: V, fold: Fold, combine: Combine) -> Self {
        CategoricalIdentityReducer { source, identity, fold, combine, partials: Mutex::new(Vec::new()), _error: PhantomData }
    }
}

impl<'s, S, V, Fold, Combine, E> Calculator for CategoricalIdentityReducer<'s, S, V, Fold, Combine, E>
where
    S: CategoricalSource + Sync,
    V: Clone + Send,
    Fold: Fn(V, u32) -> Result<V, E> + Sync,
    Combine: Fn(V, V) -> V + Sync,
    E: std::error::Error + Send + 'static,
{
    type Output = V;
    type Error = E;

    fn num_ops(&self) -> usize {
        self.source.size()
    }

    fn init(&self, num_batches: usize) {
        *self.partials.lock() = vec![None; num_batches];
    }

    fn do_part(&self, from: usize, to: usize, batch_index: usize) -> Result<(), ExecutionError<E>> {
        let mut reader = self.source.categorical_reader(to);
        reader.set_position(from as i64 - 1);
        let mut acc = self.identity.clone();
        for _ in from..to {
            let value = reader.read();
            acc = (self.fold)(acc, value).map_err(ExecutionError::User)?;
        }
        self.partials.lock()[batch_index] = Some(acc);
        Ok(())
    }

    fn result(self) -> V {
        self.partials
            .into_inner()
            .into_iter()
            .map(|slot| slot.expect("every batch index was assigned by do_part"))
            .fold(self.identity, |acc, part| (self.combine)(acc, part))
    }
}

/// Mutable reduction over a [`NumericSource`]: `supplier` creates a fresh
/// accumulator per batch, `reduce` folds elements into it, and finished
/// accumulators are offered to a [`CombineTree`] keyed by batch index.
pub struct NumericMutableReducer<'s, S, Acc, Supplier, Reduce, Combine, E> {
    source: &'s S,
    supplier: Supplier,
    reduce: Reduce,
    combine: Combine,
    tree: OnceLock<CombineTree<Acc, Combine>>,
    _error: PhantomData<fn() -> E>,
}

impl<'s, S, Acc, Supplier, Reduce, Combine, E> NumericMutableReducer<'s, S, Acc, Supplier, Reduce, Combine, E>
where
    Combine: Clone,
{
    /// Builds a mutable reducer. `supplier` must return `Some` on every
    /// call; a `None` is surfaced as [`EngineError::NullSupplier`].
    pub fn new(source: &'s S, supplier: Supplier, reduce: Reduce, combine: Combine) -> Self {
        NumericMutableReducer { source, supplier, reduce, combine, tree: OnceLock::new(), _error: PhantomData }
    }
}

impl<'s, S, Acc, Supplier, Reduce, Combine, E> Calculator
    for NumericMutableReducer<'s, S, Acc, Supplier, Reduce, Combine, E>
where
    S: NumericSource + Sync,
    Acc: Send,
    Supplier: Fn() -> Option<Acc> + Sync,
    Reduce: Fn(Acc, f64) -> Acc + Sync,
    Combine: Fn(Acc, Acc) -> Acc + Sync + Clone,
    E: std::error::Error + Send + 'static,
{
    type Output = Acc;
    type Error = E;

    fn num_ops(&self) -> usize {
        self.source.size()
    }

    fn init(&self, num_batches: usize) {
        let _ = self.tree.set(CombineTree::new(num_batches.max(1), self.combine.clone()));
    }

    fn do_part(&self, from: usize, to: usize, batch_index: usize) -> Result<(), ExecutionError<E>> {
        let mut reader = self.source.numeric_reader(to);
        reader.set_position(from as i64 - 1);
        let mut acc = (self.supplier)().ok_or(EngineError::NullSupplier)?;
        for _ in from..to {
            let value = reader.read();
            acc = (self.reduce)(acc, value);
        }
        self.tree.get().expect("init runs before do_part").offer(batch_index, acc);
        Ok(())
    }

    fn result(self) -> Acc {
        self.tree.into_inner().expect("init runs before result").root()
    }
}

/// Mutable reduction over a [`CategoricalSource`]. See
/// [`NumericMutableReducer`] for the general shape.
pub struct CategoricalMutableReducer<'s, S, Acc, Supplier, Reduce, Combine, E> {
    source: &'s S,
    supplier: Supplier,
    reduce: Reduce,
    combine: Combine,
    tree: OnceLock<CombineTree<Acc, Combine>>,
    _error: PhantomData<fn() -> E>,
}

impl<'s, S, Acc, Supplier, Reduce, Combine, E> CategoricalMutableReducer<'s, S, Acc, Supplier, Reduce, Combine, E>
where
    Combine: Clone,
{
    /// Builds a mutable reducer. `supplier` must return `Some` on every
    /// call; a `None` is surfaced as [`EngineError::NullSupplier`].
    pub fn new(source: &'s S, supplier: Supplier, reduce: Reduce, combine: Combine) -> Self {
        CategoricalMutableReducer { source, supplier, reduce, combine, tree: OnceLock::new(), _error: PhantomData }
    }
}

impl<'s, S, Acc, Supplier, Reduce, Combine, E> Calculator
    for CategoricalMutableReducer<'s, S, Acc, Supplier, Reduce, Combine, E>
where
    S: CategoricalSource + Sync,
    Acc: Send,
    Supplier: Fn() -> Option<Acc> + Sync,
    Reduce: Fn(Acc, u32) -> Acc + Sync,
    Combine: Fn(Acc, Acc) -> Acc + Sync + Clone,
    E: std::error::Error + Send + 'static,
{
    type Output = Acc;
    type Error = E;

    fn num_ops(&self) -> usize {
        self.source.size()
    }

    fn init(&self, num_batches: usize) {
        let _ = self.tree.set(CombineTree::new(num_batches.max(1), self.combine.clone()));
    }

    fn do_part(&self, from: usize, to: usize, batch_index: usize) -> Result<(), ExecutionError<E>> {
        let mut reader = self.source.categorical_reader(to);
        reader.set_position(from as i64 - 1);
        let mut acc = (self.supplier)().ok_or(EngineError::NullSupplier)?;
        for _ in from..to {
            let value = reader.read();
            acc = (self.reduce)(acc, value);
        }
        self.tree.get().expect("init runs before do_part").offer(batch_index, acc);
        Ok(())
    }

    fn result(self) -> Acc {
        self.tree.into_inner().expect("init runs before result").root()
    }
}

/// Mutable reduction over any [`RowSource<V>`], covering the multi-column
/// reducer family (`NumericColumnsReducer`, `CategoricalColumnsReducer`,
/// `ObjectColumnsReducer`) with a single generic implementation.
pub struct RowMutableReducer<'s, S, V, Acc, Supplier, Reduce, Combine, E> {
    source: &'s S,
    supplier: Supplier,
    reduce: Reduce,
    combine: Combine,
    tree: OnceLock<CombineTree<Acc, Combine>>,
    _row: PhantomData<fn() -> V>,
    _error: PhantomData<fn() -> E>,
}

impl<'s, S, V, Acc, Supplier, Reduce, Combine, E> RowMutableReducer<'s, S, V, Acc, Supplier, Reduce, Combine, E>
where
    Combine: Clone,
{
    /// Builds a mutable reducer. `supplier` must return `Some` on every
    /// call; a `None` is surfaced as [`EngineError::NullSupplier`].
    pub fn new(source: &'s S, supplier: Supplier, reduce: Reduce, combine: Combine) -> Self {
        RowMutableReducer {
            source,
            supplier,
            reduce,
            combine,
            tree: OnceLock::new(),
            _row: PhantomData,
            _error: PhantomData,
        }
    }
}

impl<'s, S, V, Acc, Supplier, Reduce, Combine, E> Calculator
    for RowMutableReducer<'s, S, V, Acc, Supplier, Reduce, Combine, E>
where
    S: RowSource<V> + Sync,
    Acc: Send,
    Supplier: Fn() -> Option<Acc> + Sync,
    Reduce: Fn(Acc, V) -> Acc + Sync,
    Combine: Fn(Acc, Acc) -> Acc + Sync + Clone,
    E: std::error::Error + Send + 'static,
{
    type Output = Acc;
    type Error = E;

    fn num_ops(&self) -> usize {
        self.source.size()
    }

    fn init(&self, num_batches: usize) {
        let _ = self.tree.set(CombineTree::new(num_batches.max(1), self.combine.clone()));
    }

    fn do_part(&self, from: usize, to: usize, batch_index: usize) -> Result<(), ExecutionError<E>> {
        let mut reader = self.source.row_reader(to);
        reader.set_position(from as i64 - 1);
        let mut acc = (self.supplier)().ok_or(EngineError::NullSupplier)?;
        for _ in from..to {
            let row = reader.move_next();
            acc = (self.reduce)(acc, row);
        }
        self.tree.get().expect("init runs before do_part").offer(batch_index, acc);
        Ok(())
    }

    fn result(self) -> Acc {
        self.tree.into_inner().expect("init runs before result").root()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ThreadPoolContext;
    use crate::executor::ParallelExecutor;
    use crate::testing::VecCategoricalColumn;
    use crate::testing::VecNumericColumn;
    use std::convert::Infallible;

    #[test]
    fn s3_sum_reduction() {
        let column = VecNumericColumn::new(vec![1.0; 1_000_000]);
        let reducer = NumericIdentityReducer::new(
            &column,
            0.0f64,
            |acc, x| -> Result<f64, Infallible> { Ok(acc + x) },
            |a, b| a + b,
        );
        let ctx = ThreadPoolContext::with_parallelism(8);
        let result = ParallelExecutor::new().execute(reducer, &ctx).unwrap();
        assert_eq!(result, 1_000_000.0);
    }

    #[test]
    fn s4_mutable_reduction_order() {
        let column = VecCategoricalColumn::new((0..16).collect());
        let reducer = CategoricalMutableReducer::new(
            &column,
            || Some(Vec::<u32>::new()),
            |mut acc: Vec<u32>, x: u32| {
                acc.push(x);
                acc
            },
            |mut a: Vec<u32>, b: Vec<u32>| {
                a.extend(b);
                a
            },
        );
        let ctx = ThreadPoolContext::with_parallelism(2);
        let executor = ParallelExecutor::new().workload(crate::workload::Workload::Huge);
        let result: Result<Vec<u32>, ExecutionError<Infallible>> = executor.execute(reducer, &ctx);
        assert_eq!(result.unwrap(), (0..16).collect::<Vec<u32>>());
    }
}

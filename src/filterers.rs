//! Filterers: predicate evaluation into an ordered array of accepted row
//! indices.
//!
//! Each filterer owns a boolean mask, one cell per input row, written
//! once per index by whichever batch owns that range, plus an atomic
//! running count of accepted rows. `result()` walks the mask in order and
//! compacts it into a dense, strictly ascending index array — the same
//! disjoint-write-then-compact shape the appliers use for their output
//! buffers, specialised to a single bit of information per row.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::calculator::Calculator;
use crate::column::reader::{CategoricalSource, Column, NumericReader, NumericSource, RowReader, RowSource};
use crate::column::CategoricalReader;
use crate::error::ExecutionError;

/// A bit per row, safe to write concurrently across disjoint batches.
struct Mask {
    bits: Box<[std::cell::UnsafeCell<bool>]>,
}

// Safety: each index is written by exactly one batch.
unsafe impl Sync for Mask {}

impl Mask {
    fn new(len: usize) -> Self {
        Mask { bits: (0..len).map(|_| std::cell::UnsafeCell::new(false)).collect() }
    }

    fn set(&self, index: usize, value: bool) {
        unsafe { *self.bits[index].get() = value };
    }

    fn get(&self, index: usize) -> bool {
        unsafe { *self.bits[index].get() }
    }

    fn len(&self) -> usize {
        self.bits.len()
    }
}

/// Filters a [`NumericSource`] by a predicate, producing the ascending
/// indices where it holds.
pub struct NumericFilterer<'s, S, Pred, E> {
    source: &'s S,
    predicate: Pred,
    mask: Mask,
    found: AtomicUsize,
    _error: PhantomData<fn() -> E>,
}

impl<'s, S, Pred, E> NumericFilterer<'s, S, Pred, E>
where
    S: NumericSource,
{
    /// Builds a filterer over `source` with `predicate`.
    pub fn new(source: &'s S, predicate: Pred) -> Self {
        let len = source.size();
        NumericFilterer { source, predicate, mask: Mask::new(len), found: AtomicUsize::new(0), _error: PhantomData }
    }
}

impl<'s, S, Pred, E> Calculator for NumericFilterer<'s, S, Pred, E>
where
    S: NumericSource + Sync,
    Pred: Fn(f64) -> Result<bool, E> + Sync,
    E: std::error::Error + Send + 'static,
{
    type Output = Vec<usize>;
    type Error = E;

    fn num_ops(&self) -> usize {
        self.source.size()
    }

    fn init(&self, _num_batches: usize) {}

    fn do_part(&self, from: usize, to: usize, _batch_index: usize) -> Result<(), ExecutionError<E>> {
        let mut reader = self.source.numeric_reader(to);
        reader.set_position(from as i64 - 1);
        let mut local_found = 0usize;
        for i in from..to {
            let value = reader.read();
            let accepted = (self.predicate)(value).map_err(ExecutionError::User)?;
            self.mask.set(i, accepted);
            if accepted {
                local_found += 1;
            }
        }
        self.found.fetch_add(local_found, Ordering::SeqCst);
        Ok(())
    }

    fn result(self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.found.load(Ordering::SeqCst));
        for i in 0..self.mask.len() {
            if self.mask.get(i) {
                out.push(i);
            }
        }
        out
    }
}

/// Filters a [`CategoricalSource`] by a predicate, producing the ascending
/// indices where it holds.
pub struct CategoricalFilterer<'s, S, Pred, E> {
    source: &'s S,
    predicate: Pred,
    mask: Mask,
    found: AtomicUsize,
    _error: PhantomData<fn() -> E>,
}

impl<'s, S, Pred, E> CategoricalFilterer<'s, S, Pred, E>
where
    S: CategoricalSource,
{
    /// Builds a filterer over `source` with `predicate`.
    pub fn new(source: &'s S, predicate: Pred) -> Self {
        let len = source.size();
        CategoricalFilterer { source, predicate, mask: Mask::new(len), found: AtomicUsize::new(0), _error: PhantomData }
    }
}

impl<'s, S, Pred, E> Calculator for CategoricalFilterer<'s, S, Pred, E>
where
    S: CategoricalSource + Sync,
    Pred: Fn(u32) -> Result<bool, E> + Sync,
    E: std::error::Error + Send + 'static,
{
    type Output = Vec<usize>;
    type Error = E;

    fn num_ops(&self) -> usize {
        self.source.size()
    }

    fn init(&self, _num_batches: usize) {}

    fn do_part(&self, from: usize, to: usize, _batch_index: usize) -> Result<(), ExecutionError<E>> {
        let mut reader = self.source.categorical_reader(to);
        reader.set_position(from as i64 - 1);
        let mut local_found = 0usize;
        for i in from..to {
            let value = reader.read();
            let accepted = (self.predicate)(value).map_err(ExecutionError::User)?;
            self.mask.set(i, accepted);
            if accepted {
                local_found += 1;
            }
        }
        self.found.fetch_add(local_found, Ordering::SeqCst);
        Ok(())
    }

    fn result(self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.found.load(Ordering::SeqCst));
        for i in 0..self.mask.len() {
            if self.mask.get(i) {
                out.push(i);
            }
        }
        out
    }
}

/// Filters a [`RowSource<V>`] by a row predicate, producing the ascending
/// indices where it holds.
pub struct RowFilterer<'s, S, V, Pred, E> {
    source: &'s S,
    predicate: Pred,
    mask: Mask,
    found: AtomicUsize,
    _row: PhantomData<fn() -> V>,
    _error: PhantomData<fn() -> E>,
}

impl<'s, S, V, Pred, E> RowFilterer<'s, S, V, Pred, E>
where
    S: RowSource<V>,
{
    /// Builds a filterer over `source` with `predicate`.
    pub fn new(source: &'s S, predicate: Pred) -> Self {
        let len = source.size();
        RowFilterer { source, predicate, mask: Mask::new(len), found: AtomicUsize::new(0), _row: PhantomData, _error: PhantomData }
    }
}

impl<'s, S, V, Pred, E> Calculator for RowFilterer<'s, S, V, Pred, E>
where
    S: RowSource<V> + Sync,
    Pred: Fn(V) -> Result<bool, E> + Sync,
    E: std::error::Error + Send + 'static,
{
    type Output = Vec<usize>;
    type Error = E;

    fn num_ops(&self) -> usize {
        self.source.size()
    }

    fn init(&self, _num_batches: usize) {}

    fn do_part(&self, from: usize, to: usize, _batch_index: usize) -> Result<(), ExecutionError<E>> {
        let mut reader = self.source.row_reader(to);
        reader.set_position(from as i64 - 1);
        let mut local_found = 0usize;
        for i in from..to {
            let row = reader.move_next();
            let accepted = (self.predicate)(row).map_err(ExecutionError::User)?;
            self.mask.set(i, accepted);
            if accepted {
                local_found += 1;
            }
        }
        self.found.fetch_add(local_found, Ordering::SeqCst);
        Ok(())
    }

    fn result(self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.found.load(Ordering::SeqCst));
        for i in 0..self.mask.len() {
            if self.mask.get(i) {
                out.push(i);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ThreadPoolContext;
    use crate::executor::ParallelExecutor;
    use crate::testing::VecNumericColumn;
    use std::convert::Infallible;

    #[test]
    fn s5_filter_compaction() {
        let column = VecNumericColumn::new(vec![-1.0, 2.0, -3.0, 4.0, 5.0, -6.0, 7.0]);
        let filterer = NumericFilterer::new(&column, |x: f64| -> Result<bool, Infallible> { Ok(x > 0.0) });
        let ctx = ThreadPoolContext::with_parallelism(4);
        let result = ParallelExecutor::new().execute(filterer, &ctx).unwrap();
        assert_eq!(result, vec![1, 3, 4, 6]);
    }
}

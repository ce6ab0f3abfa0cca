//! Single-source appliers: one column in, one buffer out.

use std::marker::PhantomData;

use crate::appliers::TargetWriter;
use crate::calculator::Calculator;
use crate::column::reader::{
    CategoricalReader, CategoricalSource, Column, NumericReader, NumericSource, ObjectReader,
    ObjectSource,
};
use crate::error::ExecutionError;

/// Applies `operator` over a [`NumericSource`] into any [`TargetWriter`].
pub struct NumericApplier<'s, S, B, Op, E> {
    source: &'s S,
    target: B,
    operator: Op,
    _error: PhantomData<fn() -> E>,
}

impl<'s, S, B, Op, E> NumericApplier<'s, S, B, Op, E> {
    /// Builds an applier over `source`, writing into `target`.
    pub fn new(source: &'s S, target: B, operator: Op) -> Self {
        NumericApplier { source, target, operator, _error: PhantomData }
    }
}

impl<'s, S, B, Op, E> Calculator for NumericApplier<'s, S, B, Op, E>
where
    S: NumericSource + Sync,
    B: TargetWriter + Sync,
    Op: Fn(f64) -> Result<B::Value, E> + Sync,
    E: std::error::Error + Send + 'static,
{
    type Output = B;
    type Error = E;

    fn num_ops(&self) -> usize {
        self.source.size()
    }

    fn init(&self, _num_batches: usize) {}

    fn do_part(&self, from: usize, to: usize, _batch_index: usize) -> Result<(), ExecutionError<E>> {
        let mut reader = self.source.numeric_reader(to);
        reader.set_position(from as i64 - 1);
        for i in from..to {
            let value = reader.read();
            let out = (self.operator)(value).map_err(ExecutionError::User)?;
            self.target.write(i, out)?;
        }
        Ok(())
    }

    fn result(self) -> B {
        self.target
    }
}

/// Applies `operator` over a [`CategoricalSource`] into any
/// [`TargetWriter`]; the category index recode or dictionary-lookup
/// flavour is entirely a property of which buffer `B` is.
pub struct CategoricalApplier<'s, S, B, Op, E> {
    source: &'s S,
    target: B,
    operator: Op,
    _error: PhantomData<fn() -> E>,
}

impl<'s, S, B, Op, E> CategoricalApplier<'s, S, B, Op, E> {
    /// Builds an applier over `source`, writing into `target`.
    pub fn new(source: &'s S, target: B, operator: Op) -> Self {
        CategoricalApplier { source, target, operator, _error: PhantomData }
    }
}

impl<'s, S, B, Op, E> Calculator for CategoricalApplier<'s, S, B, Op, E>
where
    S: CategoricalSource + Sync,
    B: TargetWriter + Sync,
    Op: Fn(u32) -> Result<B::Value, E> + Sync,
    E: std::error::Error + Send + 'static,
{
    type Output = B;
    type Error = E;

    fn num_ops(&self) -> usize {
        self.source.size()
    }

    fn init(&self, _num_batches: usize) {}

    fn do_part(&self, from: usize, to: usize, _batch_index: usize) -> Result<(), ExecutionError<E>> {
        let mut reader = self.source.categorical_reader(to);
        reader.set_position(from as i64 - 1);
        for i in from..to {
            let value = reader.read();
            let out = (self.operator)(value).map_err(ExecutionError::User)?;
            self.target.write(i, out)?;
        }
        Ok(())
    }

    fn result(self) -> B {
        self.target
    }
}

/// Applies `operator` over an [`ObjectSource<T>`] into any
/// [`TargetWriter`]. The operator receives `Option<T>` to accommodate
/// columns that may carry missing elements.
pub struct ObjectApplier<'s, S, T, B, Op, E> {
    source: &'s S,
    target: B,
    operator: Op,
    _element: PhantomData<fn() -> T>,
    _error: PhantomData<fn() -> E>,
}

impl<'s, S, T, B, Op, E> ObjectApplier<'s, S, T, B, Op, E> {
    /// Builds an applier over `source`, writing into `target`.
    pub fn new(source: &'s S, target: B, operator: Op) -> Self {
        ObjectApplier { source, target, operator, _element: PhantomData, _error: PhantomData }
    }
}

impl<'s, S, T, B, Op, E> Calculator for ObjectApplier<'s, S, T, B, Op, E>
where
    S: ObjectSource<T> + Sync,
    B: TargetWriter + Sync,
    Op: Fn(Option<T>) -> Result<B::Value, E> + Sync,
    E: std::error::Error + Send + 'static,
{
    type Output = B;
    type Error = E;

    fn num_ops(&self) -> usize {
        self.source.size()
    }

    fn init(&self, _num_batches: usize) {}

    fn do_part(&self, from: usize, to: usize, _batch_index: usize) -> Result<(), ExecutionError<E>> {
        let mut reader = self.source.object_reader(to)?;
        reader.set_position(from as i64 - 1);
        for i in from..to {
            let value = reader.read();
            let out = (self.operator)(value).map_err(ExecutionError::User)?;
            self.target.write(i, out)?;
        }
        Ok(())
    }

    fn result(self) -> B {
        self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::buffer::NumericBuffer;
    use crate::context::ThreadPoolContext;
    use crate::executor::ParallelExecutor;
    use crate::testing::VecNumericColumn;
    use std::convert::Infallible;

    #[test]
    fn s1_double_the_values() {
        let column = VecNumericColumn::new(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let target = NumericBuffer::new(column.size());
        let applier = NumericApplier::new(
            &column,
            target,
            |x: f64| -> Result<f64, Infallible> { Ok(x * 2.0) },
        );
        let ctx = ThreadPoolContext::with_parallelism(4);
        let result = ParallelExecutor::new().execute(applier, &ctx).unwrap();
        assert_eq!(result.into_vec(), vec![2.0, 4.0, 6.0, 8.0, 10.0]);
    }
}

//! Row-wise appliers: several same-read-mode columns in, one buffer out.
//!
//! One generic applier, parameterised over the row type `V`
//! (`NumericRow`, `CategoricalRow`, `ObjectRow<T>`, or any caller-defined
//! row a custom [`RowSource`] produces), covers the whole family —
//! mirroring `RowFilterer`'s genericity in `crate::filterers` rather than
//! repeating the same `do_part` body once per row type.

use std::marker::PhantomData;

use crate::appliers::TargetWriter;
use crate::calculator::Calculator;
use crate::column::reader::{RowReader, RowSource};
use crate::error::ExecutionError;

/// Applies `operator` over a [`RowSource<V>`] into any [`TargetWriter`].
pub struct RowApplier<'s, S, V, B, Op, E> {
    source: &'s S,
    target: B,
    operator: Op,
    _row: PhantomData<fn() -> V>,
    _error: PhantomData<fn() -> E>,
}

impl<'s, S, V, B, Op, E> RowApplier<'s, S, V, B, Op, E> {
    /// Builds a row applier over `source`, writing into `target`.
    pub fn new(source: &'s S, target: B, operator: Op) -> Self {
        RowApplier { source, target, operator, _row: PhantomData, _error: PhantomData }
    }
}

impl<'s, S, V, B, Op, E> Calculator for RowApplier<'s, S, V, B, Op, E>
where
    S: RowSource<V> + Sync,
    B: TargetWriter + Sync,
    Op: Fn(V) -> Result<B::Value, E> + Sync,
    E: std::error::Error + Send + 'static,
{
    type Output = B;
    type Error = E;

    fn num_ops(&self) -> usize {
        self.source.size()
    }

    fn init(&self, _num_batches: usize) {}

    fn do_part(&self, from: usize, to: usize, _batch_index: usize) -> Result<(), ExecutionError<E>> {
        let mut reader = self.source.row_reader(to);
        reader.set_position(from as i64 - 1);
        for i in from..to {
            let row = reader.move_next();
            let out = (self.operator)(row).map_err(ExecutionError::User)?;
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
    use crate::column::reader::NumericRow;
    use crate::context::ThreadPoolContext;
    use crate::executor::ParallelExecutor;
    use crate::testing::{NumericColumns, VecNumericColumn};
    use std::convert::Infallible;

    #[test]
    fn row_applier_sums_two_columns() {
        let a = VecNumericColumn::new(vec![1.0, 2.0, 3.0]);
        let b = VecNumericColumn::new(vec![10.0, 20.0, 30.0]);
        let columns = NumericColumns::new(vec![&a, &b]);
        let target = NumericBuffer::new(3);
        let applier = RowApplier::new(
            &columns,
            target,
            |row: NumericRow| -> Result<f64, Infallible> { Ok(row.0.iter().sum()) },
        );
        let ctx = ThreadPoolContext::with_parallelism(2);
        let result = ParallelExecutor::new().execute(applier, &ctx).unwrap();
        assert_eq!(result.into_vec(), vec![11.0, 22.0, 33.0]);
    }
}

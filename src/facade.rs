//! Typed façades: the public, per-target-kind entry points.
//!
//! `Transformer`/`RowTransformer` build and run an applier or a reducer;
//! `Filterer`/`RowFilterer` build and run a filterer. Every method here
//! validates its arguments eagerly — before any worker runs, per §4.8 —
//! then constructs the matching calculator from `crate::appliers`,
//! `crate::reducers`, or `crate::filterers` and drives it through a
//! [`ParallelExecutor`]. None of this layer carries engine semantics of
//! its own; it is dispatch and validation only.

use std::hash::Hash;

use crate::appliers::{CategoricalApplier, NumericApplier, ObjectApplier, RowApplier};
use crate::column::buffer::{
    DateTimeBuffer, DateTimeMillis, IntegerBuffer, NominalBuffer, NumericBuffer, ObjectBuffer,
    PackedCategoricalBuffer, TimeBuffer, TimeMillis,
};
use crate::column::format::Format;
use crate::column::reader::{
    CategoricalRow, CategoricalSource, Column, NumericRow, NumericSource, ObjectRow, ObjectSource,
    RowGroup, RowSource,
};
use crate::context::Context;
use crate::error::{EngineError, ExecutionError};
use crate::executor::ParallelExecutor;
use crate::filterers::{CategoricalFilterer, NumericFilterer, RowFilterer as RowFiltererCalculator};
use crate::logging::Logger;
use crate::reducers::{
    CategoricalIdentityReducer, CategoricalMutableReducer, NumericIdentityReducer,
    NumericMutableReducer, RowMutableReducer,
};
use crate::workload::Workload;

/// Shared fluent configuration every façade carries: a workload hint, an
/// optional progress callback, and an optional event logger.
struct Config<'e> {
    workload: Workload,
    callback: Option<Box<dyn Fn(f64) + Send + Sync + 'e>>,
    logger: Option<&'e dyn Logger>,
}

impl<'e> Config<'e> {
    fn new() -> Self {
        Config { workload: Workload::default(), callback: None, logger: None }
    }

    fn executor(&self) -> ParallelExecutor<'_> {
        let mut executor = ParallelExecutor::new().workload(self.workload);
        if let Some(callback) = &self.callback {
            executor = executor.callback(move |p| callback(p));
        }
        if let Some(logger) = self.logger {
            executor = executor.logger(logger);
        }
        executor
    }
}

/// Resolves the nominal/recode `Format` from a caller-declared bound on
/// distinct values, per §4.5: `Format.findMinimal(min(size, maxNumberOfValues))`.
fn resolve_format(size: usize, max_number_of_values: i64) -> Result<Format, EngineError> {
    if max_number_of_values < 0 {
        return Err(EngineError::InvalidArgument("maxNumberOfValues must be non-negative"));
    }
    let bound = (size as u64).min(max_number_of_values as u64);
    Ok(Format::find_minimal(bound))
}

/// The single-column applier/reducer façade.
pub struct Transformer<'s, 'e, S> {
    source: Option<&'s S>,
    config: Config<'e>,
}

impl<'s, 'e, S> Transformer<'s, 'e, S> {
    /// Builds a façade over `source`. Pass `None` to exercise the
    /// null-argument validation path.
    pub fn new(source: Option<&'s S>) -> Self {
        Transformer { source, config: Config::new() }
    }

    /// Sets the workload hint used for strategy selection.
    pub fn workload(mut self, workload: Workload) -> Self {
        self.config.workload = workload;
        self
    }

    /// Registers a progress callback.
    pub fn callback(mut self, callback: impl Fn(f64) + Send + Sync + 'e) -> Self {
        self.config.callback = Some(Box::new(callback));
        self
    }

    /// Registers an event logger.
    pub fn logger(mut self, logger: &'e dyn Logger) -> Self {
        self.config.logger = Some(logger);
        self
    }

    fn require_source(&self) -> Result<&'s S, EngineError> {
        self.source.ok_or(EngineError::NullArgument("source column"))
    }
}

impl<'s, 'e, S> Transformer<'s, 'e, S>
where
    S: NumericSource + Sync,
{
    /// `applyNumericToReal`: maps each element through `operator` into a
    /// freshly allocated [`NumericBuffer`].
    pub fn apply_numeric_to_real<Op, E>(
        self,
        operator: Option<Op>,
        ctx: &(impl Context + ?Sized),
    ) -> Result<NumericBuffer, ExecutionError<E>>
    where
        Op: Fn(f64) -> Result<f64, E> + Sync,
        E: std::error::Error + Send + 'static,
    {
        let source = self.require_source()?;
        let operator = operator.ok_or(EngineError::NullArgument("operator"))?;
        let target = NumericBuffer::new(source.size());
        let calculator = NumericApplier::new(source, target, operator);
        self.config.executor().execute(calculator, ctx)
    }

    /// `applyNumericToInteger53Bit`: maps each element through `operator`,
    /// optionally rounding to the nearest integer, into a freshly
    /// allocated [`IntegerBuffer`].
    pub fn apply_numeric_to_integer53<Op, E>(
        self,
        round: bool,
        operator: Option<Op>,
        ctx: &(impl Context + ?Sized),
    ) -> Result<IntegerBuffer, ExecutionError<E>>
    where
        Op: Fn(f64) -> Result<f64, E> + Sync,
        E: std::error::Error + Send + 'static,
    {
        let source = self.require_source()?;
        let operator = operator.ok_or(EngineError::NullArgument("operator"))?;
        let target = IntegerBuffer::new(source.size());
        let calculator = NumericApplier::new(source, target, move |x: f64| {
            let y = operator(x)?;
            Ok(if round { y.round() as i64 } else { y as i64 })
        });
        self.config.executor().execute(calculator, ctx)
    }

    /// `applyNumericToDateTime`: maps each element into epoch
    /// milliseconds.
    pub fn apply_numeric_to_datetime<Op, E>(
        self,
        operator: Option<Op>,
        ctx: &(impl Context + ?Sized),
    ) -> Result<DateTimeBuffer, ExecutionError<E>>
    where
        Op: Fn(f64) -> Result<DateTimeMillis, E> + Sync,
        E: std::error::Error + Send + 'static,
    {
        let source = self.require_source()?;
        let operator = operator.ok_or(EngineError::NullArgument("operator"))?;
        let target = DateTimeBuffer::new(source.size());
        let calculator = NumericApplier::new(source, target, operator);
        self.config.executor().execute(calculator, ctx)
    }

    /// `applyNumericToTime`: maps each element into milliseconds since
    /// midnight.
    pub fn apply_numeric_to_time<Op, E>(
        self,
        operator: Option<Op>,
        ctx: &(impl Context + ?Sized),
    ) -> Result<TimeBuffer, ExecutionError<E>>
    where
        Op: Fn(f64) -> Result<TimeMillis, E> + Sync,
        E: std::error::Error + Send + 'static,
    {
        let source = self.require_source()?;
        let operator = operator.ok_or(EngineError::NullArgument("operator"))?;
        let target = TimeBuffer::new(source.size());
        let calculator = NumericApplier::new(source, target, operator);
        self.config.executor().execute(calculator, ctx)
    }

    /// `reduceNumeric` (identity + associative op shape).
    pub fn reduce_numeric<V, Fold, Combine, E>(
        self,
        identity: V,
        fold: Option<Fold>,
        combine: Option<Combine>,
        ctx: &(impl Context + ?Sized),
    ) -> Result<V, ExecutionError<E>>
    where
        V: Clone + Send,
        Fold: Fn(V, f64) -> Result<V, E> + Sync,
        Combine: Fn(V, V) -> V + Sync,
        E: std::error::Error + Send + 'static,
    {
        let source = self.require_source()?;
        let fold = fold.ok_or(EngineError::NullArgument("fold"))?;
        let combine = combine.ok_or(EngineError::NullArgument("combine"))?;
        let calculator = NumericIdentityReducer::new(source, identity, fold, combine);
        self.config.executor().execute(calculator, ctx)
    }

    /// `reduceNumericMutable` (mutable-accumulator shape).
    pub fn reduce_numeric_mutable<Acc, Supplier, Reduce, Combine, E>(
        self,
        supplier: Option<Supplier>,
        reduce: Option<Reduce>,
        combine: Option<Combine>,
        ctx: &(impl Context + ?Sized),
    ) -> Result<Acc, ExecutionError<E>>
    where
        Acc: Send,
        Supplier: Fn() -> Option<Acc> + Sync,
        Reduce: Fn(Acc, f64) -> Acc + Sync,
        Combine: Fn(Acc, Acc) -> Acc + Sync + Clone,
        E: std::error::Error + Send + 'static,
    {
        let source = self.require_source()?;
        let supplier = supplier.ok_or(EngineError::NullArgument("supplier"))?;
        let reduce = reduce.ok_or(EngineError::NullArgument("reduce"))?;
        let combine = combine.ok_or(EngineError::NullArgument("combine"))?;
        let calculator = NumericMutableReducer::new(source, supplier, reduce, combine);
        self.config.executor().execute(calculator, ctx)
    }
}

impl<'s, 'e, S> Transformer<'s, 'e, S>
where
    S: CategoricalSource + Sync,
{
    /// `applyCategoricalToCategorical`: direct index recode into a
    /// bit-packed buffer sized from `max_number_of_values`.
    pub fn apply_categorical_to_categorical<Op, E>(
        self,
        max_number_of_values: i64,
        operator: Option<Op>,
        ctx: &(impl Context + ?Sized),
    ) -> Result<PackedCategoricalBuffer, ExecutionError<E>>
    where
        Op: Fn(u32) -> Result<u32, E> + Sync,
        E: std::error::Error + Send + 'static,
    {
        let source = self.require_source()?;
        let operator = operator.ok_or(EngineError::NullArgument("operator"))?;
        let format = resolve_format(source.size(), max_number_of_values)?;
        let target = PackedCategoricalBuffer::new(source.size(), format);
        let calculator = CategoricalApplier::new(source, target, operator);
        self.config.executor().execute(calculator, ctx)
    }

    /// `applyCategoricalToNominal`: dictionary-backed recode into
    /// arbitrary values `T`, capped at `max_number_of_values` distinct
    /// entries.
    pub fn apply_categorical_to_nominal<T, Op, E>(
        self,
        max_number_of_values: i64,
        operator: Option<Op>,
        ctx: &(impl Context + ?Sized),
    ) -> Result<NominalBuffer<T>, ExecutionError<E>>
    where
        T: Eq + Hash + Clone + Send,
        Op: Fn(u32) -> Result<T, E> + Sync,
        E: std::error::Error + Send + 'static,
    {
        let source = self.require_source()?;
        let operator = operator.ok_or(EngineError::NullArgument("operator"))?;
        let format = resolve_format(source.size(), max_number_of_values)?;
        let target = NominalBuffer::new(source.size(), format);
        let calculator = CategoricalApplier::new(source, target, operator);
        self.config.executor().execute(calculator, ctx)
    }

    /// `reduceCategorical` (identity + associative op shape).
    pub fn reduce_categorical<V, Fold, Combine, E>(
        self,
        identity: V,
        fold: Option<Fold>,
        combine: Option<Combine>,
        ctx: &(impl Context + ?Sized),
    ) -> Result<V, ExecutionError<E>>
    where
        V: Clone + Send,
        Fold: Fn(V, u32) -> Result<V, E> + Sync,
        Combine: Fn(V, V) -> V + Sync,
        E: std::error::Error + Send + 'static,
    {
        let source = self.require_source()?;
        let fold = fold.ok_or(EngineError::NullArgument("fold"))?;
        let combine = combine.ok_or(EngineError::NullArgument("combine"))?;
        let calculator = CategoricalIdentityReducer::new(source, identity, fold, combine);
        self.config.executor().execute(calculator, ctx)
    }

    /// `reduceCategoricalMutable` (mutable-accumulator shape).
    pub fn reduce_categorical_mutable<Acc, Supplier, Reduce, Combine, E>(
        self,
        supplier: Option<Supplier>,
        reduce: Option<Reduce>,
        combine: Option<Combine>,
        ctx: &(impl Context + ?Sized),
    ) -> Result<Acc, ExecutionError<E>>
    where
        Acc: Send,
        Supplier: Fn() -> Option<Acc> + Sync,
        Reduce: Fn(Acc, u32) -> Acc + Sync,
        Combine: Fn(Acc, Acc) -> Acc + Sync + Clone,
        E: std::error::Error + Send + 'static,
    {
        let source = self.require_source()?;
        let supplier = supplier.ok_or(EngineError::NullArgument("supplier"))?;
        let reduce = reduce.ok_or(EngineError::NullArgument("reduce"))?;
        let combine = combine.ok_or(EngineError::NullArgument("combine"))?;
        let calculator = CategoricalMutableReducer::new(source, supplier, reduce, combine);
        self.config.executor().execute(calculator, ctx)
    }
}

impl<'s, 'e, S> Transformer<'s, 'e, S> {
    /// `applyObjectToObject`: maps each (possibly missing) element through
    /// `operator` into a freshly allocated [`ObjectBuffer<U>`].
    pub fn apply_object_to_object<T, U, Op, E>(
        self,
        operator: Option<Op>,
        ctx: &(impl Context + ?Sized),
    ) -> Result<ObjectBuffer<U>, ExecutionError<E>>
    where
        S: ObjectSource<T> + Sync,
        U: Clone + Send,
        Op: Fn(Option<T>) -> Result<U, E> + Sync,
        E: std::error::Error + Send + 'static,
    {
        let source = self.require_source()?;
        let operator = operator.ok_or(EngineError::NullArgument("operator"))?;
        let target = ObjectBuffer::new(source.size());
        let calculator = ObjectApplier::new(source, target, operator);
        self.config.executor().execute(calculator, ctx)
    }
}

/// The multi-column applier/reducer façade.
pub struct RowTransformer<'s, 'e, S> {
    source: Option<&'s S>,
    config: Config<'e>,
}

impl<'s, 'e, S> RowTransformer<'s, 'e, S> {
    /// Builds a façade over a (possibly absent) group of same-mode
    /// columns. `None` here exercises the null-argument path; an empty
    /// (but present) group is rejected eagerly by [`Self::require_source`]
    /// once a read-mode-bound method calls it.
    pub fn new(source: Option<&'s S>) -> Self {
        RowTransformer { source, config: Config::new() }
    }

    /// Sets the workload hint used for strategy selection.
    pub fn workload(mut self, workload: Workload) -> Self {
        self.config.workload = workload;
        self
    }

    /// Registers a progress callback.
    pub fn callback(mut self, callback: impl Fn(f64) + Send + Sync + 'e) -> Self {
        self.config.callback = Some(Box::new(callback));
        self
    }

    /// Returns the source, rejecting a missing group with
    /// [`EngineError::NullArgument`] and an empty group with
    /// [`EngineError::EmptyColumns`], per §7's "eager, at façade" rule.
    fn require_source(&self) -> Result<&'s S, EngineError>
    where
        S: RowGroup,
    {
        let source = self.source.ok_or(EngineError::NullArgument("source columns"))?;
        if source.num_columns() == 0 {
            return Err(EngineError::EmptyColumns);
        }
        Ok(source)
    }
}

impl<'s, 'e, S> RowTransformer<'s, 'e, S>
where
    S: RowSource<NumericRow> + Sync,
{
    /// `applyNumericRowToReal`: maps each row through `operator` into a
    /// freshly allocated [`NumericBuffer`].
    pub fn apply_numeric_row_to_real<Op, E>(
        self,
        operator: Option<Op>,
        ctx: &(impl Context + ?Sized),
    ) -> Result<NumericBuffer, ExecutionError<E>>
    where
        Op: Fn(NumericRow) -> Result<f64, E> + Sync,
        E: std::error::Error + Send + 'static,
    {
        let source = self.require_source()?;
        let operator = operator.ok_or(EngineError::NullArgument("operator"))?;
        let target = NumericBuffer::new(source.size());
        let calculator = RowApplier::new(source, target, operator);
        self.config.executor().execute(calculator, ctx)
    }

    /// `reduceNumericRowsMutable` (mutable-accumulator shape).
    pub fn reduce_numeric_mutable<Acc, Supplier, Reduce, Combine, E>(
        self,
        supplier: Option<Supplier>,
        reduce: Option<Reduce>,
        combine: Option<Combine>,
        ctx: &(impl Context + ?Sized),
    ) -> Result<Acc, ExecutionError<E>>
    where
        Acc: Send,
        Supplier: Fn() -> Option<Acc> + Sync,
        Reduce: Fn(Acc, NumericRow) -> Acc + Sync,
        Combine: Fn(Acc, Acc) -> Acc + Sync + Clone,
        E: std::error::Error + Send + 'static,
    {
        let source = self.require_source()?;
        let supplier = supplier.ok_or(EngineError::NullArgument("supplier"))?;
        let reduce = reduce.ok_or(EngineError::NullArgument("reduce"))?;
        let combine = combine.ok_or(EngineError::NullArgument("combine"))?;
        let calculator = RowMutableReducer::new(source, supplier, reduce, combine);
        self.config.executor().execute(calculator, ctx)
    }
}

impl<'s, 'e, S> RowTransformer<'s, 'e, S>
where
    S: RowSource<CategoricalRow> + Sync,
{
    /// `applyCategoricalRowToNominal`: maps each row through `operator`
    /// into a dictionary-backed [`NominalBuffer<T>`].
    pub fn apply_categorical_row_to_nominal<T, Op, E>(
        self,
        max_number_of_values: i64,
        operator: Option<Op>,
        ctx: &(impl Context + ?Sized),
    ) -> Result<NominalBuffer<T>, ExecutionError<E>>
    where
        T: Eq + Hash + Clone + Send,
        Op: Fn(CategoricalRow) -> Result<T, E> + Sync,
        E: std::error::Error + Send + 'static,
    {
        let source = self.require_source()?;
        let operator = operator.ok_or(EngineError::NullArgument("operator"))?;
        let format = resolve_format(source.size(), max_number_of_values)?;
        let target = NominalBuffer::new(source.size(), format);
        let calculator = RowApplier::new(source, target, operator);
        self.config.executor().execute(calculator, ctx)
    }
}

impl<'s, 'e, S> RowTransformer<'s, 'e, S> {
    /// `applyObjectRowToObject`: maps each row through `operator` into a
    /// freshly allocated [`ObjectBuffer<U>`].
    pub fn apply_object_row_to_object<T, U, Op, E>(
        self,
        operator: Option<Op>,
        ctx: &(impl Context + ?Sized),
    ) -> Result<ObjectBuffer<U>, ExecutionError<E>>
    where
        S: RowSource<ObjectRow<T>> + Sync,
        U: Clone + Send,
        Op: Fn(ObjectRow<T>) -> Result<U, E> + Sync,
        E: std::error::Error + Send + 'static,
    {
        let source = self.require_source()?;
        let operator = operator.ok_or(EngineError::NullArgument("operator"))?;
        let target = ObjectBuffer::new(source.size());
        let calculator = RowApplier::new(source, target, operator);
        self.config.executor().execute(calculator, ctx)
    }

    /// `applyRow`/`MixedColumnsApplier`: maps each row through `operator`
    /// into any [`TargetWriter`]-backed buffer, generic over the row type
    /// `V` — the same genericity [`RowFilterer::filter_row`] already has,
    /// extended to the applier side so a caller-defined mixed-read-mode
    /// [`RowSource`] is not stranded to the filter family alone.
    pub fn apply_row<V, B, Op, E>(
        self,
        target: B,
        operator: Option<Op>,
        ctx: &(impl Context + ?Sized),
    ) -> Result<B, ExecutionError<E>>
    where
        S: RowSource<V> + Sync,
        B: crate::appliers::TargetWriter + Sync,
        Op: Fn(V) -> Result<B::Value, E> + Sync,
        E: std::error::Error + Send + 'static,
    {
        let source = self.require_source()?;
        let operator = operator.ok_or(EngineError::NullArgument("operator"))?;
        let calculator = RowApplier::new(source, target, operator);
        self.config.executor().execute(calculator, ctx)
    }

    /// `reduceRowMutable`/`MixedColumnsReducer`: mutable-accumulator
    /// reduction over a row type `V`, generic the same way
    /// [`Self::apply_row`] is.
    pub fn reduce_row<V, Acc, Supplier, Reduce, Combine, E>(
        self,
        supplier: Option<Supplier>,
        reduce: Option<Reduce>,
        combine: Option<Combine>,
        ctx: &(impl Context + ?Sized),
    ) -> Result<Acc, ExecutionError<E>>
    where
        S: RowSource<V> + Sync,
        Acc: Send,
        Supplier: Fn() -> Option<Acc> + Sync,
        Reduce: Fn(Acc, V) -> Acc + Sync,
        Combine: Fn(Acc, Acc) -> Acc + Sync + Clone,
        E: std::error::Error + Send + 'static,
    {
        let source = self.require_source()?;
        let supplier = supplier.ok_or(EngineError::NullArgument("supplier"))?;
        let reduce = reduce.ok_or(EngineError::NullArgument("reduce"))?;
        let combine = combine.ok_or(EngineError::NullArgument("combine"))?;
        let calculator = RowMutableReducer::new(source, supplier, reduce, combine);
        self.config.executor().execute(calculator, ctx)
    }
}

/// The single-column filterer façade.
pub struct Filterer<'s, 'e, S> {
    source: Option<&'s S>,
    config: Config<'e>,
}

impl<'s, 'e, S> Filterer<'s, 'e, S> {
    /// Builds a façade over `source`. Pass `None` to exercise the
    /// null-argument validation path.
    pub fn new(source: Option<&'s S>) -> Self {
        Filterer { source, config: Config::new() }
    }

    /// Sets the workload hint used for strategy selection.
    pub fn workload(mut self, workload: Workload) -> Self {
        self.config.workload = workload;
        self
    }

    fn require_source(&self) -> Result<&'s S, EngineError> {
        self.source.ok_or(EngineError::NullArgument("source column"))
    }
}

impl<'s, 'e, S> Filterer<'s, 'e, S>
where
    S: NumericSource + Sync,
{
    /// `filterNumeric`: returns the strictly ascending indices where
    /// `predicate` holds.
    pub fn filter_numeric<Pred, E>(
        self,
        predicate: Option<Pred>,
        ctx: &(impl Context + ?Sized),
    ) -> Result<Vec<usize>, ExecutionError<E>>
    where
        Pred: Fn(f64) -> Result<bool, E> + Sync,
        E: std::error::Error + Send + 'static,
    {
        let source = self.require_source()?;
        let predicate = predicate.ok_or(EngineError::NullArgument("predicate"))?;
        let calculator = NumericFilterer::new(source, predicate);
        self.config.executor().execute(calculator, ctx)
    }
}

impl<'s, 'e, S> Filterer<'s, 'e, S>
where
    S: CategoricalSource + Sync,
{
    /// `filterCategorical`: returns the strictly ascending indices where
    /// `predicate` holds.
    pub fn filter_categorical<Pred, E>(
        self,
        predicate: Option<Pred>,
        ctx: &(impl Context + ?Sized),
    ) -> Result<Vec<usize>, ExecutionError<E>>
    where
        Pred: Fn(u32) -> Result<bool, E> + Sync,
        E: std::error::Error + Send + 'static,
    {
        let source = self.require_source()?;
        let predicate = predicate.ok_or(EngineError::NullArgument("predicate"))?;
        let calculator = CategoricalFilterer::new(source, predicate);
        self.config.executor().execute(calculator, ctx)
    }
}

/// The multi-column filterer façade.
pub struct RowFilterer<'s, 'e, S> {
    source: Option<&'s S>,
    config: Config<'e>,
}

impl<'s, 'e, S> RowFilterer<'s, 'e, S> {
    /// Builds a façade over a (possibly absent) group of same-mode
    /// columns. `None` here exercises the null-argument path; an empty
    /// (but present) group is rejected eagerly by [`Self::require_source`].
    pub fn new(source: Option<&'s S>) -> Self {
        RowFilterer { source, config: Config::new() }
    }

    /// Sets the workload hint used for strategy selection.
    pub fn workload(mut self, workload: Workload) -> Self {
        self.config.workload = workload;
        self
    }

    /// Returns the source, rejecting a missing group with
    /// [`EngineError::NullArgument`] and an empty group with
    /// [`EngineError::EmptyColumns`], per §7's "eager, at façade" rule.
    fn require_source(&self) -> Result<&'s S, EngineError>
    where
        S: RowGroup,
    {
        let source = self.source.ok_or(EngineError::NullArgument("source columns"))?;
        if source.num_columns() == 0 {
            return Err(EngineError::EmptyColumns);
        }
        Ok(source)
    }
}

impl<'s, 'e, S> RowFilterer<'s, 'e, S> {
    /// `filterRow`: returns the strictly ascending indices where
    /// `predicate` holds.
    pub fn filter_row<V, Pred, E>(
        self,
        predicate: Option<Pred>,
        ctx: &(impl Context + ?Sized),
    ) -> Result<Vec<usize>, ExecutionError<E>>
    where
        S: RowSource<V> + Sync,
        Pred: Fn(V) -> Result<bool, E> + Sync,
        E: std::error::Error + Send + 'static,
    {
        let source = self.require_source()?;
        let predicate = predicate.ok_or(EngineError::NullArgument("predicate"))?;
        let calculator = RowFiltererCalculator::new(source, predicate);
        self.config.executor().execute(calculator, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ThreadPoolContext;
    use crate::testing::{NumericColumns, VecCategoricalColumn, VecNumericColumn};
    use std::convert::Infallible;

    #[test]
    fn s1_via_facade() {
        let column = VecNumericColumn::new(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let ctx = ThreadPoolContext::with_parallelism(4);
        let result = Transformer::new(Some(&column))
            .workload(Workload::Default)
            .apply_numeric_to_real(Some(|x: f64| -> Result<f64, Infallible> { Ok(x * 2.0) }), &ctx)
            .unwrap();
        assert_eq!(result.into_vec(), vec![2.0, 4.0, 6.0, 8.0, 10.0]);
    }

    #[test]
    fn s2_categorical_recode_via_facade() {
        let labels = ["a", "b", "c"];
        let column = VecCategoricalColumn::new(vec![0, 1, 1, 2, 0, 2]);
        let ctx = ThreadPoolContext::with_parallelism(1);
        let result = Transformer::new(Some(&column))
            .apply_categorical_to_nominal(
                3,
                Some(|i: u32| -> Result<&'static str, Infallible> { Ok(labels[i as usize]) }),
                &ctx,
            )
            .unwrap();
        assert_eq!(result.into_vec(), vec!["a", "b", "b", "c", "a", "c"]);
    }

    #[test]
    fn missing_source_is_a_null_argument_error() {
        let ctx = ThreadPoolContext::with_parallelism(1);
        let result: Result<NumericBuffer, ExecutionError<Infallible>> = Transformer::<VecNumericColumn>::new(None)
            .apply_numeric_to_real(Some(|x: f64| -> Result<f64, Infallible> { Ok(x) }), &ctx);
        assert!(matches!(result, Err(ExecutionError::Engine(EngineError::NullArgument(_)))));
    }

    #[test]
    fn negative_max_number_of_values_is_rejected() {
        let column = VecCategoricalColumn::new(vec![0, 1, 2]);
        let ctx = ThreadPoolContext::with_parallelism(1);
        let result = Transformer::new(Some(&column)).apply_categorical_to_nominal(
            -1,
            Some(|i: u32| -> Result<&'static str, Infallible> { Ok(["a", "b", "c"][i as usize]) }),
            &ctx,
        );
        assert!(matches!(result, Err(ExecutionError::Engine(EngineError::InvalidArgument(_)))));
    }

    #[test]
    fn empty_column_group_is_rejected_by_a_row_facade() {
        let group = NumericColumns::new(vec![]);
        let ctx = ThreadPoolContext::with_parallelism(1);
        let result = RowTransformer::new(Some(&group))
            .apply_numeric_row_to_real(Some(|row: NumericRow| -> Result<f64, Infallible> { Ok(row.0.iter().sum()) }), &ctx);
        assert!(matches!(result, Err(ExecutionError::Engine(EngineError::EmptyColumns))));
    }
}

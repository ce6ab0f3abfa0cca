//! Column and reader traits: the engine's external read-side boundary.
//!
//! These mirror the shape of `differential-dataflow`'s
//! `trace::TraceReader`: a owning type (`Column`/`Source`) whose
//! associated `Reader<'a>` is a GAT, so a reader can borrow from the
//! column it was created against without the column itself needing to be
//! generic over a lifetime. A reader is a cursor, not an iterator: it is
//! positioned once per batch with `set_position`, then advanced one step
//! at a time by `read`/`move_next`, exactly as the source system's
//! columns are read.

/// Any column: immutable, typed, of stable size for the duration of an
/// execution.
pub trait Column {
    /// The number of elements in this column. Stable across a single
    /// execution; the engine treats `sources[0].size()` as canonical for
    /// multi-column inputs even if callers failed to validate agreement.
    fn size(&self) -> usize;
}

/// A column that supports numeric (`f64`) reads.
pub trait NumericSource: Column {
    /// The cursor type produced by [`NumericSource::numeric_reader`].
    type Reader<'a>: NumericReader
    where
        Self: 'a;

    /// Creates a reader valid over `[0, up_to)`.
    fn numeric_reader(&self, up_to: usize) -> Self::Reader<'_>;
}

/// A cursor over a [`NumericSource`].
pub trait NumericReader {
    /// Positions the cursor so that the next `read()` returns the value
    /// at index `position + 1`. Batches call this once, with
    /// `position = from - 1` expressed as `from.wrapping_sub(1)` cast to
    /// `i64`, via the `from: usize` convention used throughout this
    /// crate: callers pass `from as i64 - 1`.
    fn set_position(&mut self, position: i64);

    /// Reads the value at the cursor's current position plus one, and
    /// advances the cursor to that position.
    fn read(&mut self) -> f64;
}

/// A column that supports categorical (`u32` category index) reads.
pub trait CategoricalSource: Column {
    /// The cursor type produced by
    /// [`CategoricalSource::categorical_reader`].
    type Reader<'a>: CategoricalReader
    where
        Self: 'a;

    /// Creates a reader valid over `[0, up_to)`.
    fn categorical_reader(&self, up_to: usize) -> Self::Reader<'_>;
}

/// A cursor over a [`CategoricalSource`].
pub trait CategoricalReader {
    /// See [`NumericReader::set_position`].
    fn set_position(&mut self, position: i64);

    /// Reads the category index at the cursor's current position plus
    /// one, and advances the cursor to that position.
    fn read(&mut self) -> u32;
}

/// A column that supports typed-object reads.
pub trait ObjectSource<T>: Column {
    /// The cursor type produced by [`ObjectSource::object_reader`].
    type Reader<'a>: ObjectReader<T>
    where
        Self: 'a;

    /// Creates a reader valid over `[0, up_to)`. Implementations that can
    /// store more than one element type behind the same `Self` return
    /// [`crate::error::EngineError::TypeMismatch`] when `T` does not
    /// match (or, for implementations with an open type hierarchy, is not
    /// a supertype of) the column's actual element type.
    fn object_reader(&self, up_to: usize) -> Result<Self::Reader<'_>, crate::error::EngineError>;
}

/// A cursor over an [`ObjectSource`].
pub trait ObjectReader<T> {
    /// See [`NumericReader::set_position`].
    fn set_position(&mut self, position: i64);

    /// Reads the element at the cursor's current position plus one, and
    /// advances the cursor to that position.
    fn read(&mut self) -> Option<T>;
}

/// A positional cursor over one or more columns that produces a row value
/// `V` per position, for `RowTransformer`/`RowFilterer`-style multi-column
/// operators.
///
/// Row types (`NumericRow`, `CategoricalRow`, `ObjectRow<T>`) are plain
/// owned vectors, one element per source column, in source order.
pub trait RowReader<V> {
    /// See [`NumericReader::set_position`].
    fn set_position(&mut self, position: i64);

    /// Reads the row at the cursor's current position plus one, and
    /// advances the cursor to that position.
    fn move_next(&mut self) -> V;
}

/// The column group backing a [`RowSource`], independent of the row type
/// `V` any particular grouping produces.
///
/// A multi-column façade (`RowTransformer`/`RowFilterer`) checks
/// [`RowGroup::num_columns`] eagerly and rejects zero with
/// [`crate::error::EngineError::EmptyColumns`] before any column is ever
/// read.
pub trait RowGroup {
    /// The number of columns in the group.
    fn num_columns(&self) -> usize;
}

/// A group of same-read-mode columns a [`RowReader`] can be built over.
///
/// Per the multi-column size invariant, `size()` is defined as the first
/// column's size; callers are expected to validate agreement themselves.
pub trait RowSource<V>: RowGroup {
    /// The cursor type produced by [`RowSource::row_reader`].
    type Reader<'a>: RowReader<V>
    where
        Self: 'a;

    /// `sources[0].size()`, the canonical row count for this group.
    fn size(&self) -> usize;

    /// Creates a reader valid over `[0, up_to)` for every column in the
    /// group.
    fn row_reader(&self, up_to: usize) -> Self::Reader<'_>;
}

/// A row of numeric values, one per source column, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericRow(pub Vec<f64>);

/// A row of categorical indices, one per source column, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalRow(pub Vec<u32>);

/// A row of typed elements, one per source column, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRow<T>(pub Vec<Option<T>>);

//! In-memory [`Column`] implementations for tests.
//!
//! `Column`, its readers, and the output buffers are all external
//! collaborators as far as the engine is concerned — real callers bring
//! their own, backed by whatever storage their table format uses. This
//! module supplies the simplest possible concrete implementations, all
//! backed by a plain `Vec`, so the rest of the crate's tests have
//! something to point appliers, reducers, and filterers at.

use std::any::{Any, TypeId};
use std::marker::PhantomData;

use crate::column::reader::{
    CategoricalReader, CategoricalRow, CategoricalSource, Column, NumericReader, NumericRow,
    NumericSource, ObjectReader, ObjectRow, ObjectSource, RowGroup, RowReader, RowSource,
};
use crate::error::EngineError;

/// A numeric column backed by a `Vec<f64>`.
pub struct VecNumericColumn {
    values: Vec<f64>,
}

impl VecNumericColumn {
    /// Builds a column from its element values.
    pub fn new(values: Vec<f64>) -> Self {
        VecNumericColumn { values }
    }
}

impl Column for VecNumericColumn {
    fn size(&self) -> usize {
        self.values.len()
    }
}

impl NumericSource for VecNumericColumn {
    type Reader<'a> = VecNumericReader<'a>;

    fn numeric_reader(&self, up_to: usize) -> Self::Reader<'_> {
        VecNumericReader { values: &self.values[..up_to], position: -1 }
    }
}

/// The cursor type for [`VecNumericColumn`].
pub struct VecNumericReader<'a> {
    values: &'a [f64],
    position: i64,
}

impl NumericReader for VecNumericReader<'_> {
    fn set_position(&mut self, position: i64) {
        self.position = position;
    }

    fn read(&mut self) -> f64 {
        self.position += 1;
        self.values[self.position as usize]
    }
}

/// A categorical column backed by a `Vec<u32>` of category indices.
pub struct VecCategoricalColumn {
    indices: Vec<u32>,
}

impl VecCategoricalColumn {
    /// Builds a column from its category indices.
    pub fn new(indices: Vec<u32>) -> Self {
        VecCategoricalColumn { indices }
    }
}

impl Column for VecCategoricalColumn {
    fn size(&self) -> usize {
        self.indices.len()
    }
}

impl CategoricalSource for VecCategoricalColumn {
    type Reader<'a> = VecCategoricalReader<'a>;

    fn categorical_reader(&self, up_to: usize) -> Self::Reader<'_> {
        VecCategoricalReader { indices: &self.indices[..up_to], position: -1 }
    }
}

/// The cursor type for [`VecCategoricalColumn`].
pub struct VecCategoricalReader<'a> {
    indices: &'a [u32],
    position: i64,
}

impl CategoricalReader for VecCategoricalReader<'_> {
    fn set_position(&mut self, position: i64) {
        self.position = position;
    }

    fn read(&mut self) -> u32 {
        self.position += 1;
        self.indices[self.position as usize]
    }
}

/// A typed-object column backed by a `Vec<T>`.
pub struct VecObjectColumn<T> {
    values: Vec<T>,
}

impl<T> VecObjectColumn<T> {
    /// Builds a column from its element values.
    pub fn new(values: Vec<T>) -> Self {
        VecObjectColumn { values }
    }
}

impl<T> Column for VecObjectColumn<T> {
    fn size(&self) -> usize {
        self.values.len()
    }
}

/// Reads `VecObjectColumn<T>` as any requested type `U`, rejecting a
/// mismatch with [`EngineError::TypeMismatch`] instead of the stored type
/// `T` always equalling the read-as type by construction. Rust has no
/// implicit upcast the way the source system's `isAssignableFrom` check
/// does, so the two types are required to match exactly rather than one
/// being a supertype of the other — see the design notes' Open Question
/// on this.
impl<T: Any, U: Any + Clone> ObjectSource<U> for VecObjectColumn<T> {
    type Reader<'a>
        = VecObjectReader<'a, T, U>
    where
        T: 'a,
        U: 'a;

    fn object_reader(&self, up_to: usize) -> Result<Self::Reader<'_>, EngineError> {
        if TypeId::of::<T>() != TypeId::of::<U>() {
            return Err(EngineError::TypeMismatch);
        }
        Ok(VecObjectReader { values: &self.values[..up_to], position: -1, _read_as: PhantomData })
    }
}

/// The cursor type for [`VecObjectColumn`], reading its stored `T` back
/// out as `U` once [`ObjectSource::object_reader`] has confirmed they
/// match.
pub struct VecObjectReader<'a, T, U> {
    values: &'a [T],
    position: i64,
    _read_as: PhantomData<U>,
}

impl<T: Any, U: Any + Clone> ObjectReader<U> for VecObjectReader<'_, T, U> {
    fn set_position(&mut self, position: i64) {
        self.position = position;
    }

    fn read(&mut self) -> Option<U> {
        self.position += 1;
        let value: &T = &self.values[self.position as usize];
        (value as &dyn Any).downcast_ref::<U>().cloned()
    }
}

/// A row-wise cursor over several [`VecNumericColumn`]s.
pub struct VecNumericRowReader<'a> {
    columns: Vec<&'a [f64]>,
    position: i64,
}

impl<'a> VecNumericRowReader<'a> {
    /// Builds a row reader over `columns`, each truncated to `up_to`.
    pub fn new(columns: &[&'a VecNumericColumn], up_to: usize) -> Self {
        VecNumericRowReader {
            columns: columns.iter().map(|c| &c.values[..up_to]).collect(),
            position: -1,
        }
    }
}

impl RowReader<NumericRow> for VecNumericRowReader<'_> {
    fn set_position(&mut self, position: i64) {
        self.position = position;
    }

    fn move_next(&mut self) -> NumericRow {
        self.position += 1;
        let i = self.position as usize;
        NumericRow(self.columns.iter().map(|c| c[i]).collect())
    }
}

/// A row-wise cursor over several [`VecCategoricalColumn`]s.
pub struct VecCategoricalRowReader<'a> {
    columns: Vec<&'a [u32]>,
    position: i64,
}

impl<'a> VecCategoricalRowReader<'a> {
    /// Builds a row reader over `columns`, each truncated to `up_to`.
    pub fn new(columns: &[&'a VecCategoricalColumn], up_to: usize) -> Self {
        VecCategoricalRowReader {
            columns: columns.iter().map(|c| &c.indices[..up_to]).collect(),
            position: -1,
        }
    }
}

impl RowReader<CategoricalRow> for VecCategoricalRowReader<'_> {
    fn set_position(&mut self, position: i64) {
        self.position = position;
    }

    fn move_next(&mut self) -> CategoricalRow {
        self.position += 1;
        let i = self.position as usize;
        CategoricalRow(self.columns.iter().map(|c| c[i]).collect())
    }
}

/// A row-wise cursor over several [`VecObjectColumn`]s.
pub struct VecObjectRowReader<'a, T> {
    columns: Vec<&'a [T]>,
    position: i64,
}

impl<'a, T> VecObjectRowReader<'a, T> {
    /// Builds a row reader over `columns`, each truncated to `up_to`.
    pub fn new(columns: &[&'a VecObjectColumn<T>], up_to: usize) -> Self {
        VecObjectRowReader {
            columns: columns.iter().map(|c| &c.values[..up_to]).collect(),
            position: -1,
        }
    }
}

impl<T: Clone> RowReader<ObjectRow<T>> for VecObjectRowReader<'_, T> {
    fn set_position(&mut self, position: i64) {
        self.position = position;
    }

    fn move_next(&mut self) -> ObjectRow<T> {
        self.position += 1;
        let i = self.position as usize;
        ObjectRow(self.columns.iter().map(|c| Some(c[i].clone())).collect())
    }
}

/// A group of numeric columns, borrowed for the duration of one row-wise
/// execution.
pub struct NumericColumns<'a> {
    columns: Vec<&'a VecNumericColumn>,
}

impl<'a> NumericColumns<'a> {
    /// Groups `columns` for row-wise reading. The first column's size is
    /// canonical. An empty group is rejected eagerly by the façade via
    /// [`RowGroup::num_columns`], not here.
    pub fn new(columns: Vec<&'a VecNumericColumn>) -> Self {
        NumericColumns { columns }
    }
}

impl RowGroup for NumericColumns<'_> {
    fn num_columns(&self) -> usize {
        self.columns.len()
    }
}

impl RowSource<NumericRow> for NumericColumns<'_> {
    type Reader<'b>
        = VecNumericRowReader<'b>
    where
        Self: 'b;

    fn size(&self) -> usize {
        self.columns[0].size()
    }

    fn row_reader(&self, up_to: usize) -> Self::Reader<'_> {
        VecNumericRowReader::new(&self.columns, up_to)
    }
}

/// A group of categorical columns, borrowed for the duration of one
/// row-wise execution.
pub struct CategoricalColumns<'a> {
    columns: Vec<&'a VecCategoricalColumn>,
}

impl<'a> CategoricalColumns<'a> {
    /// Groups `columns` for row-wise reading. The first column's size is
    /// canonical. An empty group is rejected eagerly by the façade via
    /// [`RowGroup::num_columns`], not here.
    pub fn new(columns: Vec<&'a VecCategoricalColumn>) -> Self {
        CategoricalColumns { columns }
    }
}

impl RowGroup for CategoricalColumns<'_> {
    fn num_columns(&self) -> usize {
        self.columns.len()
    }
}

impl RowSource<CategoricalRow> for CategoricalColumns<'_> {
    type Reader<'b>
        = VecCategoricalRowReader<'b>
    where
        Self: 'b;

    fn size(&self) -> usize {
        self.columns[0].size()
    }

    fn row_reader(&self, up_to: usize) -> Self::Reader<'_> {
        VecCategoricalRowReader::new(&self.columns, up_to)
    }
}

/// A group of object columns, borrowed for the duration of one row-wise
/// execution.
pub struct ObjectColumns<'a, T> {
    columns: Vec<&'a VecObjectColumn<T>>,
}

impl<'a, T> ObjectColumns<'a, T> {
    /// Groups `columns` for row-wise reading. The first column's size is
    /// canonical. An empty group is rejected eagerly by the façade via
    /// [`RowGroup::num_columns`], not here.
    pub fn new(columns: Vec<&'a VecObjectColumn<T>>) -> Self {
        ObjectColumns { columns }
    }
}

impl<T> RowGroup for ObjectColumns<'_, T> {
    fn num_columns(&self) -> usize {
        self.columns.len()
    }
}

impl<T: Clone> RowSource<ObjectRow<T>> for ObjectColumns<'_, T> {
    type Reader<'b>
        = VecObjectRowReader<'b, T>
    where
        Self: 'b;

    fn size(&self) -> usize {
        self.columns[0].size()
    }

    fn row_reader(&self, up_to: usize) -> Self::Reader<'_> {
        VecObjectRowReader::new(&self.columns, up_to)
    }
}

//! Appliers: element-/row-wise maps from one or more source columns into
//! a freshly allocated target buffer.
//!
//! One applier type exists per source read-mode (`Numeric`, `Categorical`,
//! `Object<T>`) and arity (single column, multi-column row). Rather than
//! the source system's per-(read-mode × target-type × format) class
//! explosion, every applier here is generic over its target through
//! [`TargetWriter`], and the handful of target *kinds* (real, integer-53,
//! packed categorical, nominal categorical, object, date-time, time)
//! collapse to one `TargetWriter` impl per buffer type in
//! `crate::column::buffer`.

mod row;
mod single;

pub use row::RowApplier;
pub use single::{CategoricalApplier, NumericApplier, ObjectApplier};

use crate::column::buffer::{
    DateTimeBuffer, DateTimeMillis, IntegerBuffer, NominalBuffer, NumericBuffer, ObjectBuffer,
    PackedCategoricalBuffer, TimeBuffer, TimeMillis,
};
use crate::error::EngineError;
use std::hash::Hash;

/// A target buffer an applier can write typed values into.
///
/// This is the seam that lets a single generic applier serve every target
/// kind: appliers are generic over `B: TargetWriter`, not over a concrete
/// buffer type.
pub trait TargetWriter: Sized {
    /// The element type this target accepts.
    type Value;

    /// The buffer's fixed length, equal to `sources[0].size()`.
    fn len(&self) -> usize;

    /// Writes `value` at `index`. Safe to call concurrently for distinct
    /// indices (subject to the packed-categorical alignment rule).
    fn write(&self, index: usize, value: Self::Value) -> Result<(), EngineError>;
}

impl TargetWriter for NumericBuffer {
    type Value = f64;

    fn len(&self) -> usize {
        NumericBuffer::len(self)
    }

    fn write(&self, index: usize, value: f64) -> Result<(), EngineError> {
        self.set(index, value);
        Ok(())
    }
}

impl TargetWriter for IntegerBuffer {
    type Value = i64;

    fn len(&self) -> usize {
        IntegerBuffer::len(self)
    }

    fn write(&self, index: usize, value: i64) -> Result<(), EngineError> {
        self.set(index, value);
        Ok(())
    }
}

impl TargetWriter for DateTimeBuffer {
    type Value = DateTimeMillis;

    fn len(&self) -> usize {
        DateTimeBuffer::len(self)
    }

    fn write(&self, index: usize, value: DateTimeMillis) -> Result<(), EngineError> {
        self.set(index, value);
        Ok(())
    }
}

impl TargetWriter for TimeBuffer {
    type Value = TimeMillis;

    fn len(&self) -> usize {
        TimeBuffer::len(self)
    }

    fn write(&self, index: usize, value: TimeMillis) -> Result<(), EngineError> {
        self.set(index, value);
        Ok(())
    }
}

impl TargetWriter for PackedCategoricalBuffer {
    type Value = u32;

    fn len(&self) -> usize {
        PackedCategoricalBuffer::len(self)
    }

    fn write(&self, index: usize, value: u32) -> Result<(), EngineError> {
        self.set(index, value)
    }
}

impl<T: Eq + Hash + Clone> TargetWriter for NominalBuffer<T> {
    type Value = T;

    fn len(&self) -> usize {
        NominalBuffer::len(self)
    }

    fn write(&self, index: usize, value: T) -> Result<(), EngineError> {
        self.set(index, value)
    }
}

impl<T: Clone> TargetWriter for ObjectBuffer<T> {
    type Value = T;

    fn len(&self) -> usize {
        ObjectBuffer::len(self)
    }

    fn write(&self, index: usize, value: T) -> Result<(), EngineError> {
        self.set(index, value);
        Ok(())
    }
}

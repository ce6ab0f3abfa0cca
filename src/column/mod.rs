//! The column/reader/buffer type family the engine reads from and writes
//! to.
//!
//! Everything in this module is, per the specification this crate
//! implements, an *external* collaborator: real columns and buffers come
//! from a caller's own table storage. What lives here is the trait
//! boundary the rest of the crate programs against, plus the concrete
//! buffer implementations a façade allocates as its output (buffers are
//! the engine's own output, not the caller's storage, so they are not
//! external in the same sense columns are).

pub mod buffer;
pub mod format;
pub mod reader;

pub use buffer::{
    DateTimeBuffer, DateTimeMillis, IntegerBuffer, NominalBuffer, NumericBuffer, ObjectBuffer,
    PackedCategoricalBuffer, TimeBuffer, TimeMillis,
};
pub use format::Format;
pub use reader::{
    CategoricalReader, CategoricalRow, CategoricalSource, Column, NumericReader, NumericRow,
    NumericSource, ObjectReader, ObjectRow, ObjectSource, RowGroup, RowReader, RowSource,
};

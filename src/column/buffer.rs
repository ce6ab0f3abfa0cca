//! Output buffer implementations.
//!
//! Every buffer here is a fixed-length sink whose `set(index, value)` is
//! safe to call concurrently from distinct threads, provided distinct
//! calls use distinct indices (and, for the bit-packed categorical
//! buffer, indices from distinct [`Format::alignment_group`] blocks). That
//! guarantee is the caller's job — the executor only ever hands out
//! disjoint, alignment-respecting ranges — so the unsafe writes below are
//! the same kind `TimelyStack` in `differential-dataflow::containers`
//! performs: justified by the caller's partitioning, not checked by the
//! type system.

use std::cell::UnsafeCell;
use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::Mutex;

use crate::column::format::Format;
use crate::error::EngineError;

/// A fixed-length slot array with disjoint-index concurrent writes.
///
/// This is the common shape behind [`NumericBuffer`], [`IntegerBuffer`],
/// [`ObjectBuffer`], [`DateTimeBuffer`], and [`TimeBuffer`]: none of them
/// need bit packing or capacity checks, so they all reduce to "an array
/// of cells, written at most once per index."
struct SlotBuffer<T> {
    slots: Box<[UnsafeCell<T>]>,
}

// Safety: `set` only ever writes index `i`, and the executor guarantees
// distinct batches touch disjoint indices, so no two threads ever write
// (or read, during `into_vec`) the same cell concurrently.
unsafe impl<T: Send> Sync for SlotBuffer<T> {}

impl<T: Clone> SlotBuffer<T> {
    fn new(len: usize, fill: T) -> Self {
        SlotBuffer { slots: (0..len).map(|_| UnsafeCell::new(fill.clone())).collect() }
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn set(&self, index: usize, value: T) {
        // Safety: see the `Sync` impl above — callers guarantee disjoint
        // indices across concurrent `set` calls.
        unsafe { *self.slots[index].get() = value };
    }

    fn into_vec(self) -> Vec<T> {
        self.slots.into_vec().into_iter().map(UnsafeCell::into_inner).collect()
    }
}

/// A buffer of `f64` values, the target of a real-numeric applier.
pub struct NumericBuffer {
    slots: SlotBuffer<f64>,
}

impl NumericBuffer {
    /// Allocates a buffer of `len` zero-initialised slots.
    pub fn new(len: usize) -> Self {
        NumericBuffer { slots: SlotBuffer::new(len, 0.0) }
    }

    /// The buffer's fixed length.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the buffer has zero length.
    pub fn is_empty(&self) -> bool {
        self.slots.len() == 0
    }

    /// Writes `value` at `index`. Safe to call concurrently for distinct
    /// indices.
    pub fn set(&self, index: usize, value: f64) {
        self.slots.set(index, value);
    }

    /// Consumes the buffer, yielding its contents in index order.
    pub fn into_vec(self) -> Vec<f64> {
        self.slots.into_vec()
    }
}

/// A buffer of 53-bit-safe integers, the target of an integer-53 applier.
pub struct IntegerBuffer {
    slots: SlotBuffer<i64>,
}

impl IntegerBuffer {
    /// Allocates a buffer of `len` zero-initialised slots.
    pub fn new(len: usize) -> Self {
        IntegerBuffer { slots: SlotBuffer::new(len, 0) }
    }

    /// The buffer's fixed length.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Writes `value` at `index`. Safe to call concurrently for distinct
    /// indices.
    pub fn set(&self, index: usize, value: i64) {
        self.slots.set(index, value);
    }

    /// Consumes the buffer, yielding its contents in index order.
    pub fn into_vec(self) -> Vec<i64> {
        self.slots.into_vec()
    }
}

/// A buffer of arbitrary owned values, the target of an `Object<U>`
/// applier.
pub struct ObjectBuffer<T> {
    slots: SlotBuffer<Option<T>>,
}

impl<T: Clone> ObjectBuffer<T> {
    /// Allocates a buffer of `len` slots, initially `None`.
    pub fn new(len: usize) -> Self {
        ObjectBuffer { slots: SlotBuffer::new(len, None) }
    }

    /// The buffer's fixed length.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Writes `value` at `index`. Safe to call concurrently for distinct
    /// indices.
    pub fn set(&self, index: usize, value: T) {
        self.slots.set(index, Some(value));
    }

    /// Consumes the buffer. Any index never written is `None`; a fully
    /// executed applier leaves none of those.
    pub fn into_vec(self) -> Vec<Option<T>> {
        self.slots.into_vec()
    }
}

/// Milliseconds since the epoch, the element type of [`DateTimeBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DateTimeMillis(pub i64);

/// Milliseconds since midnight, the element type of [`TimeBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeMillis(pub i64);

/// A buffer of [`DateTimeMillis`] values.
pub struct DateTimeBuffer {
    slots: SlotBuffer<DateTimeMillis>,
}

impl DateTimeBuffer {
    /// Allocates a buffer of `len` zero-initialised slots.
    pub fn new(len: usize) -> Self {
        DateTimeBuffer { slots: SlotBuffer::new(len, DateTimeMillis(0)) }
    }

    /// The buffer's fixed length.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Writes `value` at `index`. Safe to call concurrently for distinct
    /// indices.
    pub fn set(&self, index: usize, value: DateTimeMillis) {
        self.slots.set(index, value);
    }

    /// Consumes the buffer, yielding its contents in index order.
    pub fn into_vec(self) -> Vec<DateTimeMillis> {
        self.slots.into_vec()
    }
}

/// A buffer of [`TimeMillis`] values.
pub struct TimeBuffer {
    slots: SlotBuffer<TimeMillis>,
}

impl TimeBuffer {
    /// Allocates a buffer of `len` zero-initialised slots.
    pub fn new(len: usize) -> Self {
        TimeBuffer { slots: SlotBuffer::new(len, TimeMillis(0)) }
    }

    /// The buffer's fixed length.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Writes `value` at `index`. Safe to call concurrently for distinct
    /// indices.
    pub fn set(&self, index: usize, value: TimeMillis) {
        self.slots.set(index, value);
    }

    /// Consumes the buffer, yielding its contents in index order.
    pub fn into_vec(self) -> Vec<TimeMillis> {
        self.slots.into_vec()
    }
}

/// Backing storage for [`PackedCategoricalBuffer`], one variant per
/// [`Format`].
enum PackedStorage {
    /// Four 2-bit values per byte.
    Bits2 { bytes: Box<[UnsafeCell<u8>]>, len: usize },
    /// Two 4-bit values per byte.
    Bits4 { bytes: Box<[UnsafeCell<u8>]>, len: usize },
    Bits8(Box<[UnsafeCell<u8>]>),
    Bits16(Box<[UnsafeCell<u16>]>),
    Bits32(Box<[UnsafeCell<i32>]>),
}

// Safety: as with `SlotBuffer`, every write targets a disjoint logical
// index; for `Bits2`/`Bits4` the executor additionally guarantees batch
// boundaries fall on `Format::alignment_group` multiples, so distinct
// batches never touch the same byte.
unsafe impl Sync for PackedStorage {}

/// A bit-packed categorical buffer: the target of a direct index-recode
/// applier (source categories mapped to output categories of the same or
/// a different [`Format`]).
///
/// Unlike [`NominalBuffer`], this buffer never allocates a dictionary —
/// the operator is expected to produce index values directly, already
/// bounded by `format`.
pub struct PackedCategoricalBuffer {
    format: Format,
    storage: PackedStorage,
}

impl PackedCategoricalBuffer {
    /// Allocates a buffer of `len` zero-initialised slots in `format`.
    pub fn new(len: usize, format: Format) -> Self {
        let storage = match format {
            Format::UI2 => PackedStorage::Bits2 { bytes: (0..len.div_ceil(4)).map(|_| UnsafeCell::new(0u8)).collect(), len },
            Format::UI4 => PackedStorage::Bits4 { bytes: (0..len.div_ceil(2)).map(|_| UnsafeCell::new(0u8)).collect(), len },
            Format::UI8 => PackedStorage::Bits8((0..len).map(|_| UnsafeCell::new(0u8)).collect()),
            Format::UI16 => PackedStorage::Bits16((0..len).map(|_| UnsafeCell::new(0u16)).collect()),
            Format::SI32 => PackedStorage::Bits32((0..len).map(|_| UnsafeCell::new(0i32)).collect()),
        };
        PackedCategoricalBuffer { format, storage }
    }

    /// The format this buffer packs values in.
    pub fn format(&self) -> Format {
        self.format
    }

    /// The buffer's fixed length.
    pub fn len(&self) -> usize {
        match &self.storage {
            PackedStorage::Bits2 { len, .. } | PackedStorage::Bits4 { len, .. } => *len,
            PackedStorage::Bits8(b) => b.len(),
            PackedStorage::Bits16(b) => b.len(),
            PackedStorage::Bits32(b) => b.len(),
        }
    }

    /// Whether the buffer has zero length.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes category index `value` at `index`. Returns
    /// [`EngineError::CapacityExceeded`] if `value` does not fit in this
    /// buffer's format.
    pub fn set(&self, index: usize, value: u32) -> Result<(), EngineError> {
        let max = self.format.max_values();
        if value as u64 >= max {
            return Err(EngineError::CapacityExceeded { max });
        }
        match &self.storage {
            PackedStorage::Bits2 { bytes, .. } => {
                let byte_index = index / 4;
                let shift = (index % 4) * 2;
                // Safety: alignment_group(UI2) == 4 guarantees distinct
                // batches never share a byte_index.
                unsafe {
                    let cell = bytes[byte_index].get();
                    let mask = 0b11u8 << shift;
                    *cell = (*cell & !mask) | ((value as u8) << shift);
                }
            }
            PackedStorage::Bits4 { bytes, .. } => {
                let byte_index = index / 2;
                let shift = (index % 2) * 4;
                // Safety: alignment_group(UI4) == 2, same reasoning.
                unsafe {
                    let cell = bytes[byte_index].get();
                    let mask = 0b1111u8 << shift;
                    *cell = (*cell & !mask) | ((value as u8) << shift);
                }
            }
            PackedStorage::Bits8(bytes) => unsafe { *bytes[index].get() = value as u8 },
            PackedStorage::Bits16(words) => unsafe { *words[index].get() = value as u16 },
            PackedStorage::Bits32(words) => unsafe { *words[index].get() = value as i32 },
        }
        Ok(())
    }

    /// Reads back every value in index order. Intended for tests and for
    /// façades converting to a denser representation; not on any hot
    /// concurrent path.
    pub fn to_vec(&self) -> Vec<u32> {
        match &self.storage {
            PackedStorage::Bits2 { bytes, len } => (0..*len)
                .map(|i| {
                    let byte = unsafe { *bytes[i / 4].get() };
                    ((byte >> ((i % 4) * 2)) & 0b11) as u32
                })
                .collect(),
            PackedStorage::Bits4 { bytes, len } => (0..*len)
                .map(|i| {
                    let byte = unsafe { *bytes[i / 2].get() };
                    ((byte >> ((i % 2) * 4)) & 0b1111) as u32
                })
                .collect(),
            PackedStorage::Bits8(bytes) => bytes.iter().map(|c| unsafe { *c.get() } as u32).collect(),
            PackedStorage::Bits16(words) => words.iter().map(|c| unsafe { *c.get() } as u32).collect(),
            PackedStorage::Bits32(words) => words.iter().map(|c| unsafe { *c.get() } as u32).collect(),
        }
    }
}

/// A dictionary-backed nominal categorical buffer: the target of an
/// applier whose operator produces values of `T` (e.g. interned strings)
/// rather than raw indices, up to a declared capacity.
///
/// Per the format note on nominal buffers, `UI2`/`UI4`/`UI8` all collapse
/// onto a shared byte-per-index array (bit-packing the dictionary index
/// is not worth it once a dictionary lookup is already on the write
/// path); `UI16`/`SI32` keep their own wider index storage.
pub struct NominalBuffer<T> {
    format: Format,
    indices: IndexStorage,
    dictionary: Mutex<Dictionary<T>>,
}

enum IndexStorage {
    Narrow(Box<[UnsafeCell<u8>]>),
    Wide16(Box<[UnsafeCell<u16>]>),
    Wide32(Box<[UnsafeCell<i32>]>),
}

// Safety: disjoint indices only, same as `SlotBuffer`.
unsafe impl Sync for IndexStorage {}

struct Dictionary<T> {
    by_value: HashMap<T, u32>,
    values: Vec<T>,
    capacity: u64,
}

impl<T: Eq + Hash + Clone> Dictionary<T> {
    fn intern(&mut self, value: T) -> Result<u32, EngineError> {
        if let Some(&index) = self.by_value.get(&value) {
            return Ok(index);
        }
        if self.values.len() as u64 >= self.capacity {
            return Err(EngineError::CapacityExceeded { max: self.capacity });
        }
        let index = self.values.len() as u32;
        self.values.push(value.clone());
        self.by_value.insert(value, index);
        Ok(index)
    }
}

impl<T: Eq + Hash + Clone> NominalBuffer<T> {
    /// Allocates a buffer of `len` slots backed by a dictionary capped at
    /// `format.max_values()` distinct entries.
    pub fn new(len: usize, format: Format) -> Self {
        let indices = if format.nominal_collapses_to_ui8() {
            IndexStorage::Narrow((0..len).map(|_| UnsafeCell::new(0u8)).collect())
        } else if format == Format::UI16 {
            IndexStorage::Wide16((0..len).map(|_| UnsafeCell::new(0u16)).collect())
        } else {
            IndexStorage::Wide32((0..len).map(|_| UnsafeCell::new(0i32)).collect())
        };
        NominalBuffer {
            format,
            indices,
            dictionary: Mutex::new(Dictionary {
                by_value: HashMap::new(),
                values: Vec::new(),
                capacity: format.max_values(),
            }),
        }
    }

    /// The format backing this buffer's declared capacity.
    pub fn format(&self) -> Format {
        self.format
    }

    /// The buffer's fixed length.
    pub fn len(&self) -> usize {
        match &self.indices {
            IndexStorage::Narrow(b) => b.len(),
            IndexStorage::Wide16(b) => b.len(),
            IndexStorage::Wide32(b) => b.len(),
        }
    }

    /// Whether the buffer has zero length.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Interns `value` (growing the dictionary if it is new) and writes
    /// its index at `index`. Returns [`EngineError::CapacityExceeded`] if
    /// interning would exceed the declared capacity.
    pub fn set(&self, index: usize, value: T) -> Result<(), EngineError> {
        let dict_index = self.dictionary.lock().intern(value)?;
        match &self.indices {
            IndexStorage::Narrow(bytes) => unsafe { *bytes[index].get() = dict_index as u8 },
            IndexStorage::Wide16(words) => unsafe { *words[index].get() = dict_index as u16 },
            IndexStorage::Wide32(words) => unsafe { *words[index].get() = dict_index as i32 },
        }
        Ok(())
    }

    /// Consumes the buffer, yielding the resolved value at each index in
    /// order.
    pub fn into_vec(self) -> Vec<T> {
        let dictionary = self.dictionary.into_inner();
        match self.indices {
            IndexStorage::Narrow(bytes) => bytes
                .into_vec()
                .into_iter()
                .map(|c| dictionary.values[UnsafeCell::into_inner(c) as usize].clone())
                .collect(),
            IndexStorage::Wide16(words) => words
                .into_vec()
                .into_iter()
                .map(|c| dictionary.values[UnsafeCell::into_inner(c) as usize].clone())
                .collect(),
            IndexStorage::Wide32(words) => words
                .into_vec()
                .into_iter()
                .map(|c| dictionary.values[UnsafeCell::into_inner(c) as usize].clone())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_buffer_round_trips() {
        let buf = NumericBuffer::new(5);
        for i in 0..5 {
            buf.set(i, i as f64 * 2.0);
        }
        assert_eq!(buf.into_vec(), vec![0.0, 2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn packed_ui2_round_trips_and_rejects_overflow() {
        let buf = PackedCategoricalBuffer::new(6, Format::UI2);
        for i in 0..6 {
            buf.set(i, (i % 3) as u32).unwrap();
        }
        assert_eq!(buf.to_vec(), vec![0, 1, 2, 0, 1, 2]);
        assert!(matches!(buf.set(0, 4), Err(EngineError::CapacityExceeded { max: 4 })));
    }

    #[test]
    fn packed_ui4_round_trips() {
        let buf = PackedCategoricalBuffer::new(5, Format::UI4);
        for i in 0..5 {
            buf.set(i, i as u32).unwrap();
        }
        assert_eq!(buf.to_vec(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn nominal_buffer_interns_and_caps() {
        let buf: NominalBuffer<&'static str> = NominalBuffer::new(6, Format::find_minimal(3));
        buf.set(0, "a").unwrap();
        buf.set(1, "b").unwrap();
        buf.set(2, "b").unwrap();
        buf.set(3, "c").unwrap();
        buf.set(4, "a").unwrap();
        buf.set(5, "c").unwrap();
        assert_eq!(buf.into_vec(), vec!["a", "b", "b", "c", "a", "c"]);
    }

    #[test]
    fn nominal_buffer_rejects_overflow() {
        // UI2 can only encode 4 distinct values; a 5th must be rejected.
        let buf: NominalBuffer<&'static str> = NominalBuffer::new(5, Format::UI2);
        buf.set(0, "a").unwrap();
        buf.set(1, "b").unwrap();
        buf.set(2, "c").unwrap();
        buf.set(3, "d").unwrap();
        let err = buf.set(4, "e").unwrap_err();
        assert!(matches!(err, EngineError::CapacityExceeded { .. }));
    }
}

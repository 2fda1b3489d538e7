//! Growable, word-addressed object arena.
//!
//! Objects are bump allocated and never freed; the backing vector grows by
//! reallocation when an allocation does not fit. Every object starts with a
//! generic [`Header`] word and a type-specific sub-header word:
//!
//! ```text
//! [Header][RecordHeader ][field 0][field 1]...
//! [Header][ClosureHeader][arg 0  ][arg 1  ]...
//! ```
//!
//! Every access goes through a [`HeapRef`] and is checked against the
//! start-of-object bitmap, the header tag and the declared payload length.

use std::fmt::Write;

use object::{ClosureHeader, HEADER_WORDS, Header, ObjectType, RecordHeader, Value};

use crate::HeapRef;

// ── Heap settings ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HeapSettings {
    /// Words reserved up front.
    pub initial_words: usize,
    /// Hard ceiling in words. `None` grows until the allocator gives up.
    pub max_words: Option<usize>,
}

impl Default for HeapSettings {
    fn default() -> Self {
        Self {
            initial_words: 131_072, // 1 MB
            max_words: None,
        }
    }
}

// ── Errors ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeapError {
    #[error("The managed heap has overflowed ({requested} words requested, limit {limit}).")]
    Overflow { requested: usize, limit: usize },

    #[error("Pointer {ptr} does not reference a heap object.")]
    InvalidPointer { ptr: u64 },

    #[error("Object at {ptr} has an unknown header tag {tag}.")]
    CorruptHeader { ptr: u32, tag: u8 },

    #[error("Expected reference type `{expected}`, but got `{actual}`")]
    TypeMismatch {
        expected: ObjectType,
        actual: ObjectType,
    },

    #[error("Field at index {field} does not exist for record at {ptr} ({field_count} fields)")]
    InvalidField {
        ptr: u32,
        field: u32,
        field_count: u32,
    },

    #[error("Index {index} out of bounds for length {length}")]
    IndexOutOfBounds { index: u32, length: u32 },
}

// ── Heap ──────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Heap {
    /// Allocated words; `words.len()` is the bump pointer.
    words: Vec<Value>,
    /// One bit per word, set on the first word of every object.
    starts: Vec<u64>,
    max_words: Option<usize>,
}

impl Heap {
    pub fn new(settings: HeapSettings) -> Self {
        Self {
            words: Vec::with_capacity(settings.initial_words),
            starts: Vec::with_capacity(settings.initial_words.div_ceil(64)),
            max_words: settings.max_words,
        }
    }

    #[inline]
    pub fn used_words(&self) -> usize {
        self.words.len()
    }

    #[inline]
    pub fn capacity_words(&self) -> usize {
        self.words.capacity()
    }

    /// Forget every object while keeping the backing storage.
    pub fn reset(&mut self) {
        self.words.clear();
        self.starts.clear();
    }

    /// Reserve `size` zeroed words and return the index of the first one.
    fn alloc(&mut self, size: usize) -> Result<usize, HeapError> {
        let base = self.words.len();
        let limit = self.max_words.unwrap_or(u32::MAX as usize).min(u32::MAX as usize);
        let top = base
            .checked_add(size)
            .filter(|&top| top <= limit)
            .ok_or(HeapError::Overflow {
                requested: size,
                limit,
            })?;

        if top > self.words.capacity() {
            log::debug!(
                "heap: growing from {} to at least {} words",
                self.words.capacity(),
                top
            );
        }
        self.words.resize(top, Value::ZERO);
        Ok(base)
    }

    fn alloc_object(
        &mut self,
        object_type: ObjectType,
        sub_header: Value,
        payload_words: u32,
    ) -> Result<HeapRef, HeapError> {
        let base = self.alloc(HEADER_WORDS + payload_words as usize)?;
        self.words[base] = Header::new(object_type, payload_words).encode();
        self.words[base + 1] = sub_header;
        self.mark_start(base);
        // alloc bounds the top by u32::MAX, so base fits
        Ok(HeapRef::new(base as u32))
    }

    /// Allocate a record with `field_count` zeroed fields.
    pub fn alloc_record(&mut self, field_count: u32) -> Result<HeapRef, HeapError> {
        let sub = RecordHeader { field_count }.encode();
        self.alloc_object(ObjectType::Record, sub, field_count)
    }

    /// Allocate a closure over `procedure` with room for `arg_count`
    /// captured arguments. The arguments read as zero until set.
    pub fn alloc_closure(&mut self, procedure: u32, arg_count: u16) -> Result<HeapRef, HeapError> {
        let sub = ClosureHeader {
            procedure,
            arg_count,
        }
        .encode();
        self.alloc_object(ObjectType::Closure, sub, arg_count as u32)
    }

    // ── Headers ────────────────────────────────────────────────────

    pub fn header(&self, obj: HeapRef) -> Result<Header, HeapError> {
        if !self.is_object_start(obj.base()) {
            return Err(HeapError::InvalidPointer {
                ptr: obj.index() as u64,
            });
        }
        Header::decode(self.words[obj.base()]).map_err(|tag| HeapError::CorruptHeader {
            ptr: obj.index(),
            tag,
        })
    }

    fn expect(&self, obj: HeapRef, expected: ObjectType) -> Result<(), HeapError> {
        let actual = self.header(obj)?.object_type();
        if actual != expected {
            return Err(HeapError::TypeMismatch { expected, actual });
        }
        Ok(())
    }

    pub fn record_header(&self, obj: HeapRef) -> Result<RecordHeader, HeapError> {
        self.expect(obj, ObjectType::Record)?;
        Ok(RecordHeader::decode(self.words[obj.word(1)]))
    }

    pub fn closure_header(&self, obj: HeapRef) -> Result<ClosureHeader, HeapError> {
        self.expect(obj, ObjectType::Closure)?;
        Ok(ClosureHeader::decode(self.words[obj.word(1)]))
    }

    // ── Records ────────────────────────────────────────────────────

    fn field_word(&self, obj: HeapRef, field: u32) -> Result<usize, HeapError> {
        let header = self.record_header(obj)?;
        if field >= header.field_count {
            return Err(HeapError::InvalidField {
                ptr: obj.index(),
                field,
                field_count: header.field_count,
            });
        }
        Ok(obj.word(HEADER_WORDS + field as usize))
    }

    pub fn get_field(&self, obj: HeapRef, field: u32) -> Result<Value, HeapError> {
        let word = self.field_word(obj, field)?;
        Ok(self.words[word])
    }

    pub fn set_field(&mut self, obj: HeapRef, field: u32, value: Value) -> Result<(), HeapError> {
        let word = self.field_word(obj, field)?;
        self.words[word] = value;
        Ok(())
    }

    // ── Closures ───────────────────────────────────────────────────

    fn closure_arg_word(&self, obj: HeapRef, index: u16) -> Result<usize, HeapError> {
        let header = self.closure_header(obj)?;
        if index >= header.arg_count {
            return Err(HeapError::IndexOutOfBounds {
                index: index as u32,
                length: header.arg_count as u32,
            });
        }
        Ok(obj.word(HEADER_WORDS + index as usize))
    }

    pub fn get_closure_arg(&self, obj: HeapRef, index: u16) -> Result<Value, HeapError> {
        let word = self.closure_arg_word(obj, index)?;
        Ok(self.words[word])
    }

    pub fn set_closure_arg(
        &mut self,
        obj: HeapRef,
        index: u16,
        value: Value,
    ) -> Result<(), HeapError> {
        let word = self.closure_arg_word(obj, index)?;
        self.words[word] = value;
        Ok(())
    }

    /// All captured arguments of a closure, in index order.
    pub fn closure_args(&self, obj: HeapRef) -> Result<&[Value], HeapError> {
        let header = self.closure_header(obj)?;
        let start = obj.word(HEADER_WORDS);
        Ok(&self.words[start..start + header.arg_count as usize])
    }

    // ── Start bitmap ───────────────────────────────────────────────

    fn mark_start(&mut self, word: usize) {
        let slot = word / 64;
        if slot >= self.starts.len() {
            self.starts.resize(slot + 1, 0);
        }
        self.starts[slot] |= 1 << (word % 64);
    }

    #[inline]
    fn is_object_start(&self, word: usize) -> bool {
        word < self.words.len()
            && self
                .starts
                .get(word / 64)
                .is_some_and(|bits| bits & (1 << (word % 64)) != 0)
    }

    // ── Debugging ──────────────────────────────────────────────────

    /// Render every object, in allocation order.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Heap: {} words used", self.words.len());

        let mut base = 0;
        while base < self.words.len() {
            let Ok(header) = self.header(HeapRef::new(base as u32)) else {
                let _ = writeln!(out, "  @{base}: <corrupt>");
                break;
            };
            let payload = base + HEADER_WORDS;
            let len = header.payload_words() as usize;
            match header.object_type() {
                ObjectType::Record => {
                    let _ = write!(out, "  @{base}: Record({len})");
                }
                ObjectType::Closure => {
                    let sub = ClosureHeader::decode(self.words[base + 1]);
                    let _ = write!(out, "  @{base}: Closure(proc {}, {len})", sub.procedure);
                }
            }
            for (i, word) in self.words[payload..payload + len].iter().enumerate() {
                let _ = write!(out, "\n    [{i}]: {word}");
            }
            out.push('\n');
            base = payload + len;
        }
        out
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new(HeapSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_heap() -> Heap {
        Heap::new(HeapSettings {
            initial_words: 4,
            max_words: None,
        })
    }

    #[test]
    fn test_alloc_record_zeroes_fields() {
        let mut heap = small_heap();
        let rec = heap.alloc_record(3).unwrap();

        assert_eq!(heap.used_words(), HEADER_WORDS + 3);
        assert_eq!(heap.record_header(rec).unwrap().field_count, 3);
        for i in 0..3 {
            assert_eq!(heap.get_field(rec, i).unwrap(), Value::ZERO);
        }
    }

    #[test]
    fn test_set_and_get_field() {
        let mut heap = small_heap();
        let rec = heap.alloc_record(2).unwrap();
        heap.set_field(rec, 0, Value::from_i64(42)).unwrap();
        heap.set_field(rec, 1, Value::from_i64(7)).unwrap();

        assert_eq!(heap.get_field(rec, 0).unwrap().as_i64(), 42);
        assert_eq!(heap.get_field(rec, 1).unwrap().as_i64(), 7);
    }

    #[test]
    fn test_objects_do_not_overlap() {
        let mut heap = small_heap();
        let a = heap.alloc_record(1).unwrap();
        let b = heap.alloc_record(1).unwrap();
        heap.set_field(a, 0, Value::from_i64(1)).unwrap();
        heap.set_field(b, 0, Value::from_i64(2)).unwrap();

        assert_eq!(heap.get_field(a, 0).unwrap().as_i64(), 1);
        assert_eq!(heap.get_field(b, 0).unwrap().as_i64(), 2);
        assert_eq!(b.index() as usize, HEADER_WORDS + 1);
    }

    #[test]
    fn test_growth_preserves_contents() {
        let mut heap = small_heap();
        let first = heap.alloc_record(1).unwrap();
        heap.set_field(first, 0, Value::from_i64(99)).unwrap();

        let initial_capacity = heap.capacity_words();
        for _ in 0..100 {
            heap.alloc_record(4).unwrap();
        }

        assert!(heap.capacity_words() > initial_capacity);
        assert_eq!(heap.get_field(first, 0).unwrap().as_i64(), 99);
    }

    #[test]
    fn test_record_access_on_closure_is_type_mismatch() {
        let mut heap = small_heap();
        let clo = heap.alloc_closure(0, 2).unwrap();

        assert_eq!(
            heap.get_field(clo, 0),
            Err(HeapError::TypeMismatch {
                expected: ObjectType::Record,
                actual: ObjectType::Closure,
            })
        );
        assert_eq!(
            heap.set_field(clo, 0, Value::ZERO),
            Err(HeapError::TypeMismatch {
                expected: ObjectType::Record,
                actual: ObjectType::Closure,
            })
        );
    }

    #[test]
    fn test_closure_access_on_record_is_type_mismatch() {
        let mut heap = small_heap();
        let rec = heap.alloc_record(2).unwrap();

        assert_eq!(
            heap.closure_header(rec),
            Err(HeapError::TypeMismatch {
                expected: ObjectType::Closure,
                actual: ObjectType::Record,
            })
        );
    }

    #[test]
    fn test_field_bound_sweep() {
        let mut heap = small_heap();
        let rec = heap.alloc_record(2).unwrap();
        // trailing object so out-of-bounds words exist physically
        heap.alloc_record(8).unwrap();

        for field in 2..12 {
            assert_eq!(
                heap.get_field(rec, field),
                Err(HeapError::InvalidField {
                    ptr: rec.index(),
                    field,
                    field_count: 2,
                })
            );
        }
    }

    #[test]
    fn test_set_field_bound_sweep() {
        let mut heap = small_heap();
        let rec = heap.alloc_record(2).unwrap();
        let next = heap.alloc_record(8).unwrap();

        for field in 2..12 {
            assert_eq!(
                heap.set_field(rec, field, Value::from_i64(-1)),
                Err(HeapError::InvalidField {
                    ptr: rec.index(),
                    field,
                    field_count: 2,
                })
            );
        }
        // the neighbour's header and fields are untouched
        assert_eq!(heap.record_header(next).unwrap().field_count, 8);
        for field in 0..8 {
            assert_eq!(heap.get_field(next, field).unwrap(), Value::ZERO);
        }
    }

    #[test]
    fn test_set_closure_arg_bound_sweep() {
        let mut heap = small_heap();
        let clo = heap.alloc_closure(1, 3).unwrap();
        let next = heap.alloc_record(4).unwrap();

        for index in 3..10u16 {
            assert_eq!(
                heap.set_closure_arg(clo, index, Value::from_i64(-1)),
                Err(HeapError::IndexOutOfBounds {
                    index: index as u32,
                    length: 3,
                })
            );
        }
        assert_eq!(heap.record_header(next).unwrap().field_count, 4);
        assert!(heap.closure_args(clo).unwrap().iter().all(|v| *v == Value::ZERO));
    }

    #[test]
    fn test_high_bits_are_not_a_pointer() {
        let mut heap = small_heap();
        let rec = heap.alloc_record(1).unwrap();
        assert_eq!(rec.index(), 0);

        for raw in [1u64 << 32, 0xFFFF_FFFF_0000_0000, u64::MAX] {
            assert_eq!(
                HeapRef::try_from_value(Value::from_raw(raw)),
                Err(HeapError::InvalidPointer { ptr: raw })
            );
        }
        assert_eq!(HeapRef::try_from(rec.into_value()), Ok(rec));
    }

    #[test]
    fn test_closure_args() {
        let mut heap = small_heap();
        let clo = heap.alloc_closure(5, 3).unwrap();
        for i in 0..3u16 {
            heap.set_closure_arg(clo, i, Value::from_i64(10 + i as i64)).unwrap();
        }

        let header = heap.closure_header(clo).unwrap();
        assert_eq!(header.procedure, 5);
        assert_eq!(header.arg_count, 3);

        let args: Vec<i64> = heap.closure_args(clo).unwrap().iter().map(|v| v.as_i64()).collect();
        assert_eq!(args, vec![10, 11, 12]);

        assert_eq!(
            heap.get_closure_arg(clo, 3),
            Err(HeapError::IndexOutOfBounds { index: 3, length: 3 })
        );
    }

    #[test]
    fn test_interior_pointer_is_rejected() {
        let mut heap = small_heap();
        let rec = heap.alloc_record(2).unwrap();
        // forge something that looks exactly like a header inside the payload
        heap.set_field(rec, 0, Header::new(ObjectType::Record, 0).encode()).unwrap();

        let interior = HeapRef::try_from_value(Value::from_i64(rec.index() as i64 + 2)).unwrap();
        assert_eq!(
            heap.get_field(interior, 0),
            Err(HeapError::InvalidPointer {
                ptr: rec.index() as u64 + 2
            })
        );
    }

    #[test]
    fn test_pointer_past_top_is_rejected() {
        let mut heap = small_heap();
        heap.alloc_record(1).unwrap();
        let dangling = HeapRef::try_from_value(Value::from_i64(1000)).unwrap();

        assert_eq!(
            heap.header(dangling),
            Err(HeapError::InvalidPointer { ptr: 1000 })
        );
    }

    #[test]
    fn test_overflow_with_ceiling() {
        let mut heap = Heap::new(HeapSettings {
            initial_words: 4,
            max_words: Some(8),
        });
        heap.alloc_record(4).unwrap();

        assert_eq!(
            heap.alloc_record(1),
            Err(HeapError::Overflow {
                requested: HEADER_WORDS + 1,
                limit: 8,
            })
        );
        // a failed allocation leaves the heap untouched
        assert_eq!(heap.used_words(), HEADER_WORDS + 4);
    }

    #[test]
    fn test_reset_keeps_storage() {
        let mut heap = small_heap();
        let rec = heap.alloc_record(16).unwrap();
        let capacity = heap.capacity_words();

        heap.reset();

        assert_eq!(heap.used_words(), 0);
        assert_eq!(heap.capacity_words(), capacity);
        assert_eq!(
            heap.header(rec),
            Err(HeapError::InvalidPointer {
                ptr: rec.index() as u64
            })
        );
    }

    #[test]
    fn test_dump_lists_objects() {
        let mut heap = small_heap();
        let rec = heap.alloc_record(1).unwrap();
        heap.set_field(rec, 0, Value::from_i64(3)).unwrap();
        heap.alloc_closure(7, 0).unwrap();

        let dump = heap.dump();
        assert!(dump.contains("@0: Record(1)"));
        assert!(dump.contains("[0]: Int64 = 3"));
        assert!(dump.contains("@3: Closure(proc 7, 0)"));
    }
}

use crate::Value;

/// Object type tag stored in byte 0 of the header word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ObjectType {
    Record = 0,
    Closure,
}

impl ObjectType {
    pub const COUNT: usize = Self::Closure as usize + 1;
}

impl TryFrom<u8> for ObjectType {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, u8> {
        match byte {
            0 => Ok(Self::Record),
            1 => Ok(Self::Closure),
            other => Err(other),
        }
    }
}

impl core::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Record => f.write_str("Record"),
            Self::Closure => f.write_str("Closure"),
        }
    }
}

/// Number of words before an object's payload: generic header + sub-header.
pub const HEADER_WORDS: usize = 2;

/// The generic header, first word of every heap object.
///
/// ```text
/// byte 0:    object type
/// bytes 1‥3: reserved (zero)
/// bytes 4‥7: payload length in words (u32)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    object_type: ObjectType,
    payload_words: u32,
}

impl Header {
    pub const fn new(object_type: ObjectType, payload_words: u32) -> Self {
        Self {
            object_type,
            payload_words,
        }
    }

    #[inline(always)]
    pub const fn object_type(&self) -> ObjectType {
        self.object_type
    }

    #[inline(always)]
    pub const fn payload_words(&self) -> u32 {
        self.payload_words
    }

    pub fn encode(&self) -> Value {
        Value::ZERO
            .with_u8_at(0, self.object_type as u8)
            .with_u32_at(4, self.payload_words)
    }

    /// Decode a header word. Fails with the raw tag byte when it names no
    /// known object type.
    pub fn decode(word: Value) -> Result<Self, u8> {
        let object_type = ObjectType::try_from(word.read_u8_at(0))?;
        Ok(Self {
            object_type,
            payload_words: word.read_u32_at(4),
        })
    }
}

/// Sub-header of a record: `field_count: u32 @0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub field_count: u32,
}

impl RecordHeader {
    pub fn encode(&self) -> Value {
        Value::ZERO.with_u32_at(0, self.field_count)
    }

    pub fn decode(word: Value) -> Self {
        Self {
            field_count: word.read_u32_at(0),
        }
    }
}

/// Sub-header of a closure: `procedure: u32 @0`, `arg_count: u16 @4`.
///
/// `procedure` is an index into the program's procedure table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosureHeader {
    pub procedure: u32,
    pub arg_count: u16,
}

impl ClosureHeader {
    pub fn encode(&self) -> Value {
        Value::ZERO
            .with_u32_at(0, self.procedure)
            .with_u16_at(4, self.arg_count)
    }

    pub fn decode(word: Value) -> Self {
        Self {
            procedure: word.read_u32_at(0),
            arg_count: word.read_u16_at(4),
        }
    }
}

use object::Value;

use crate::HeapError;

/// An opaque reference to a heap object.
///
/// A `HeapRef` names the first word of an object. It has no public
/// arithmetic: field and argument addressing happens inside [`Heap`]
/// after the header has been checked, so a program can at worst hand the
/// heap a bogus handle, which is rejected, never a bogus interior address.
///
/// On the operand stack a reference travels as a plain [`Value`] holding
/// the word index in its low 32 bits. The high 32 bits must be zero.
///
/// [`Heap`]: crate::Heap
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct HeapRef(u32);

impl HeapRef {
    /// Fails with [`HeapError::InvalidPointer`] when the value does not fit
    /// a word index.
    #[inline(always)]
    pub fn try_from_value(value: Value) -> Result<Self, HeapError> {
        u32::try_from(value.raw())
            .map(Self)
            .map_err(|_| HeapError::InvalidPointer { ptr: value.raw() })
    }

    #[inline(always)]
    pub fn into_value(self) -> Value {
        Value::from_raw(self.0 as u64)
    }

    /// Raw word index, for diagnostics only.
    #[inline(always)]
    pub const fn index(self) -> u32 {
        self.0
    }

    #[inline(always)]
    pub(crate) const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline(always)]
    pub(crate) const fn base(self) -> usize {
        self.0 as usize
    }

    /// Word index `offset` words past the object base.
    #[inline(always)]
    pub(crate) const fn word(self, offset: usize) -> usize {
        self.0 as usize + offset
    }
}

impl TryFrom<Value> for HeapRef {
    type Error = HeapError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::try_from_value(value)
    }
}

impl From<HeapRef> for Value {
    fn from(r: HeapRef) -> Self {
        r.into_value()
    }
}

impl core::fmt::Debug for HeapRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "HeapRef(@{})", self.0)
    }
}

impl core::fmt::Display for HeapRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "@{}", self.0)
    }
}

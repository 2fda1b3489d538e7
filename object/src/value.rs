/// An untagged 64-bit word.
///
/// Every operand stack slot, heap word and instruction operand is one
/// `Value`. The bits carry no type information: the opcode that produces
/// or consumes a value decides whether it is an `i64`, an `f64`, a bool,
/// a heap reference or a pair of packed 32-bit fields.
///
/// Layout is little-endian regardless of host, so byte offsets used by
/// the `read_*_at`/`with_*_at` accessors mean the same thing everywhere:
///
/// ```text
/// byte:  0    1    2    3    4    5    6    7
///       [ low i32 / u32      ][ high i32 / u32      ]
///       [bool]
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Value(u64);

const _: () = assert!(size_of::<Value>() == 8);

impl Value {
    pub const ZERO: Self = Self(0);

    pub const SIZE: usize = 8;

    #[inline(always)]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[inline(always)]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline(always)]
    pub const fn to_le_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    #[inline(always)]
    pub const fn from_le_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_le_bytes(bytes))
    }

    // ── Scalars ────────────────────────────────────────────────────

    #[inline(always)]
    pub const fn from_i64(n: i64) -> Self {
        Self(n as u64)
    }

    #[inline(always)]
    pub const fn as_i64(self) -> i64 {
        self.0 as i64
    }

    #[inline(always)]
    pub const fn from_f64(f: f64) -> Self {
        Self(f.to_bits())
    }

    #[inline(always)]
    pub const fn as_f64(self) -> f64 {
        f64::from_bits(self.0)
    }

    /// `true` is stored as byte 0 == 1, every other byte zero.
    #[inline(always)]
    pub const fn from_bool(b: bool) -> Self {
        Self(b as u64)
    }

    /// Only byte 0 is inspected, and only the exact value 1 is true.
    #[inline(always)]
    pub const fn as_bool(self) -> bool {
        self.0 & 0xff == 1
    }

    /// Writes `n` into the low half and zeroes the high half.
    #[inline(always)]
    pub const fn from_i32(n: i32) -> Self {
        Self(n as u32 as u64)
    }

    #[inline(always)]
    pub const fn as_i32(self) -> i32 {
        self.0 as u32 as i32
    }

    #[inline(always)]
    pub const fn from_halves(lo: i32, hi: i32) -> Self {
        Self((lo as u32 as u64) | ((hi as u32 as u64) << 32))
    }

    #[inline(always)]
    pub const fn from_char(c: char) -> Self {
        Self(c as u32 as u64)
    }

    /// Returns `None` when the low 32 bits are not a Unicode scalar value.
    #[inline(always)]
    pub fn as_char(self) -> Option<char> {
        char::from_u32(self.read_u32_at(0))
    }

    // ── Sub-fields ─────────────────────────────────────────────────
    //
    // Offsets are byte offsets into the little-endian word. An offset that
    // would read past byte 7 is a programming error and panics.

    #[inline(always)]
    pub fn read_u32_at(self, offset: usize) -> u32 {
        let bytes = self.to_le_bytes();
        u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ])
    }

    #[inline(always)]
    pub fn read_i32_at(self, offset: usize) -> i32 {
        self.read_u32_at(offset) as i32
    }

    #[inline(always)]
    pub fn read_u16_at(self, offset: usize) -> u16 {
        let bytes = self.to_le_bytes();
        u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
    }

    #[inline(always)]
    pub fn read_u8_at(self, offset: usize) -> u8 {
        self.to_le_bytes()[offset]
    }

    #[must_use]
    #[inline(always)]
    pub fn with_u32_at(self, offset: usize, v: u32) -> Self {
        self.with_bytes_at(offset, &v.to_le_bytes())
    }

    #[must_use]
    #[inline(always)]
    pub fn with_u16_at(self, offset: usize, v: u16) -> Self {
        self.with_bytes_at(offset, &v.to_le_bytes())
    }

    #[must_use]
    #[inline(always)]
    pub fn with_u8_at(self, offset: usize, v: u8) -> Self {
        self.with_bytes_at(offset, &[v])
    }

    #[inline(always)]
    fn with_bytes_at(self, offset: usize, src: &[u8]) -> Self {
        let mut bytes = self.to_le_bytes();
        bytes[offset..offset + src.len()].copy_from_slice(src);
        Self::from_le_bytes(bytes)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::from_i64(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::from_f64(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::from_bool(b)
    }
}

impl core::fmt::Debug for Value {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Value(0x{:016x} = {})", self.0, self.as_i64())
    }
}

impl core::fmt::Display for Value {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Int64 = {}", self.as_i64())
    }
}

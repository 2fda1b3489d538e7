use core::fmt;

use object::Value;

use crate::Op;

/// One instruction: an opcode and its 8-byte operand word.
///
/// Operand fields are packed as documented on [`Op`]; the accessors below
/// read them back without interpreting the opcode, so the interpreter picks
/// the accessor matching the opcode it dispatched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub op: Op,
    pub operand: Value,
}

impl Instruction {
    #[inline(always)]
    pub const fn new(op: Op) -> Self {
        Self {
            op,
            operand: Value::ZERO,
        }
    }

    #[inline(always)]
    pub const fn with_operand(op: Op, operand: Value) -> Self {
        Self { op, operand }
    }

    pub const fn exit(code: i32) -> Self {
        Self::with_operand(Op::Exit, Value::from_i32(code))
    }

    pub fn call(procedure: u32) -> Self {
        Self::with_operand(Op::Call, Value::ZERO.with_u32_at(0, procedure))
    }

    /// `Jump`, `JumpTrue` or `JumpFalse` to an absolute instruction index.
    pub fn jump(op: Op, address: u32) -> Self {
        debug_assert!(matches!(op, Op::Jump | Op::JumpTrue | Op::JumpFalse));
        Self::with_operand(op, Value::ZERO.with_u32_at(0, address))
    }

    pub const fn i64_push(value: i64) -> Self {
        Self::with_operand(Op::I64Push, Value::from_i64(value))
    }

    pub const fn f64_push(value: f64) -> Self {
        Self::with_operand(Op::F64Push, Value::from_f64(value))
    }

    pub const fn bool_push(value: bool) -> Self {
        Self::with_operand(Op::BoolPush, Value::from_bool(value))
    }

    pub const fn char_push(value: char) -> Self {
        Self::with_operand(Op::CharPush, Value::from_char(value))
    }

    /// `LocalArgLoad`, `LocalClosureArgLoad` or `LocalLoad`.
    pub fn local(op: Op, offset: u16) -> Self {
        debug_assert!(matches!(
            op,
            Op::LocalArgLoad | Op::LocalClosureArgLoad | Op::LocalLoad
        ));
        Self::with_operand(op, Value::ZERO.with_u16_at(0, offset))
    }

    pub fn console_write_string(string: u32) -> Self {
        Self::with_operand(Op::ConsoleWriteString, Value::ZERO.with_u32_at(0, string))
    }

    /// `RecordAlloc`, `RecordGetField` or `RecordSetField`.
    pub fn record(op: Op, n: u32) -> Self {
        debug_assert!(matches!(
            op,
            Op::RecordAlloc | Op::RecordGetField | Op::RecordSetField
        ));
        Self::with_operand(op, Value::ZERO.with_u32_at(0, n))
    }

    pub fn closure_alloc(procedure: u32, arg_count: u16) -> Self {
        Self::with_operand(
            Op::ClosureAlloc,
            Value::ZERO
                .with_u32_at(0, procedure)
                .with_u16_at(4, arg_count),
        )
    }

    pub fn closure_set_arg(index: u16) -> Self {
        Self::with_operand(Op::ClosureSetArg, Value::ZERO.with_u16_at(0, index))
    }

    // ── Operand accessors ──────────────────────────────────────────

    /// Procedure id, jump target, string index, field or field count.
    #[inline(always)]
    pub fn u32_operand(self) -> u32 {
        self.operand.read_u32_at(0)
    }

    /// Frame offset or closure argument index.
    #[inline(always)]
    pub fn u16_operand(self) -> u16 {
        self.operand.read_u16_at(0)
    }

    /// `ClosureAlloc` captured argument count.
    #[inline(always)]
    pub fn closure_arg_count(self) -> u16 {
        self.operand.read_u16_at(4)
    }

    #[inline(always)]
    pub fn exit_code(self) -> i32 {
        self.operand.read_i32_at(0)
    }
}

impl From<Op> for Instruction {
    fn from(op: Op) -> Self {
        Self::new(op)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = self.op;
        match op {
            Op::Exit => write!(f, "{op} {}", self.exit_code()),
            Op::Call => write!(f, "{op} #{}", self.u32_operand()),
            Op::Jump | Op::JumpTrue | Op::JumpFalse => {
                write!(f, "{op} @{}", self.u32_operand())
            }
            Op::I64Push => write!(f, "{op} {}", self.operand.as_i64()),
            Op::F64Push => write!(f, "{op} {:?}", self.operand.as_f64()),
            Op::BoolPush => write!(f, "{op} {}", self.operand.as_bool()),
            Op::CharPush => match self.operand.as_char() {
                Some(c) => write!(f, "{op} {c:?}"),
                None => write!(f, "{op} 0x{:x}", self.u32_operand()),
            },
            Op::LocalArgLoad | Op::LocalClosureArgLoad | Op::LocalLoad => {
                write!(f, "{op} {}", self.u16_operand())
            }
            Op::ConsoleWriteString => write!(f, "{op} ${}", self.u32_operand()),
            Op::RecordAlloc | Op::RecordGetField | Op::RecordSetField => {
                write!(f, "{op} {}", self.u32_operand())
            }
            Op::ClosureAlloc => write!(
                f,
                "{op} #{} {}",
                self.u32_operand(),
                self.closure_arg_count()
            ),
            Op::ClosureSetArg => write!(f, "{op} {}", self.u16_operand()),
            _ => write!(f, "{op}"),
        }
    }
}

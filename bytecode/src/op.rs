/// Bytecode opcodes.
///
/// Every instruction is one opcode plus one 8-byte operand word. The
/// operand layout for each opcode is listed below as `name:type@offset`
/// (little-endian byte offset inside the operand word). Stack effects are
/// written `before -> after`, top of stack on the right.
///
/// Binary operators pop the right operand first, then the left one, and
/// push `left OP right`: `a b I64Sub -> (a - b)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Op {
    // ── Control flow ───────────────────────────────────────────────
    /// Halt with a status code.
    /// Operands: `code:i32@0`
    Exit = 0x00,

    NoOp,

    /// Call a procedure (or a registered foreign procedure) by id.
    /// Operands: `proc:u32@0`
    Call,

    /// `* ret -> ret`: the result replaces the callee frame.
    Return,

    /// Operands: `addr:u32@0`
    Jump,

    /// `bool ->`, jumps when true.
    /// Operands: `addr:u32@0`
    JumpTrue,

    /// `bool ->`, jumps when false.
    /// Operands: `addr:u32@0`
    JumpFalse,

    /// Indexed jump. Reserved, not executed by this interpreter.
    JumpTable,

    // ── Debugging / IO ─────────────────────────────────────────────
    DebugDumpStack,

    DebugDumpHeap,

    /// `i64 ->`
    DebugPrintI64,

    /// `f64 ->`
    DebugPrintF64,

    /// `bool ->`
    DebugPrintBool,

    /// Write a string from the string table.
    /// Operands: `string:u32@0`
    ConsoleWriteString,

    // ── Stack ──────────────────────────────────────────────────────
    /// Operands: `value:i64`
    I64Push,

    /// Operands: `value:f64`
    F64Push,

    /// Operands: `value:bool`
    BoolPush,

    /// Operands: `value:char@0`
    CharPush,

    /// `x ->`
    Pop,

    /// `x -> x x`
    Dup,

    /// Push procedure argument `offset`.
    /// Operands: `offset:u16@0`
    LocalArgLoad,

    /// Push closure-captured argument `offset`.
    /// Operands: `offset:u16@0`
    LocalClosureArgLoad,

    /// Push local `offset`.
    /// Operands: `offset:u16@0`
    LocalLoad,

    // ── Heap ───────────────────────────────────────────────────────
    /// Allocate a string from the string table. Reserved, not executed by
    /// this interpreter.
    StringLoad,

    /// `-> ptr`
    /// Operands: `fields:u32@0`
    RecordAlloc,

    /// `ptr -> value`
    /// Operands: `field:u32@0`
    RecordGetField,

    /// `ptr value -> ptr`
    /// Operands: `field:u32@0`
    RecordSetField,

    /// `-> ptr`
    /// Operands: `proc:u32@0`, `args:u16@4`
    ClosureAlloc,

    /// `ptr value -> ptr`
    /// Operands: `arg:u16@0`
    ClosureSetArg,

    /// `args* ptr -> ret`
    ClosureApply,

    // ── Arithmetic ─────────────────────────────────────────────────
    I64Add,
    I64Sub,
    I64Mul,
    I64Div,

    /// `i64 -> f64`
    I64ToF64,

    F64Add,
    F64Sub,
    F64Mul,
    F64Div,

    // ── Comparison / logic ─────────────────────────────────────────
    I64CmpEq,
    I64CmpNe,
    I64CmpGt,
    I64CmpLt,
    I64CmpGe,
    I64CmpLe,

    F64CmpEq,
    F64CmpNe,
    F64CmpGt,
    F64CmpLt,
    F64CmpGe,
    F64CmpLe,

    BoolCmpEq,
    BoolCmpNe,

    /// `bool -> bool`
    BoolNot,
    BoolAnd,
    BoolOr,
}

impl Op {
    pub const COUNT: usize = Op::BoolOr as usize + 1;

    /// Lower-case name used in listings and fault messages.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Op::Exit => "exit",
            Op::NoOp => "no_op",
            Op::Call => "call",
            Op::Return => "return",
            Op::Jump => "jump",
            Op::JumpTrue => "jump_true",
            Op::JumpFalse => "jump_false",
            Op::JumpTable => "jump_table",
            Op::DebugDumpStack => "debug.dump_stack",
            Op::DebugDumpHeap => "debug.dump_heap",
            Op::DebugPrintI64 => "debug.print_i64",
            Op::DebugPrintF64 => "debug.print_f64",
            Op::DebugPrintBool => "debug.print_bool",
            Op::ConsoleWriteString => "console.write_string",
            Op::I64Push => "i64.push",
            Op::F64Push => "f64.push",
            Op::BoolPush => "bool.push",
            Op::CharPush => "char.push",
            Op::Pop => "pop",
            Op::Dup => "dup",
            Op::LocalArgLoad => "local_arg_load",
            Op::LocalClosureArgLoad => "local_closure_arg_load",
            Op::LocalLoad => "local_load",
            Op::StringLoad => "string_load",
            Op::RecordAlloc => "record_alloc",
            Op::RecordGetField => "record_get_field",
            Op::RecordSetField => "record_set_field",
            Op::ClosureAlloc => "closure_alloc",
            Op::ClosureSetArg => "closure_set_arg",
            Op::ClosureApply => "closure_apply",
            Op::I64Add => "i64.add",
            Op::I64Sub => "i64.sub",
            Op::I64Mul => "i64.mul",
            Op::I64Div => "i64.div",
            Op::I64ToF64 => "i64.to_f64",
            Op::F64Add => "f64.add",
            Op::F64Sub => "f64.sub",
            Op::F64Mul => "f64.mul",
            Op::F64Div => "f64.div",
            Op::I64CmpEq => "i64.cmp_eq",
            Op::I64CmpNe => "i64.cmp_ne",
            Op::I64CmpGt => "i64.cmp_gt",
            Op::I64CmpLt => "i64.cmp_lt",
            Op::I64CmpGe => "i64.cmp_ge",
            Op::I64CmpLe => "i64.cmp_le",
            Op::F64CmpEq => "f64.cmp_eq",
            Op::F64CmpNe => "f64.cmp_ne",
            Op::F64CmpGt => "f64.cmp_gt",
            Op::F64CmpLt => "f64.cmp_lt",
            Op::F64CmpGe => "f64.cmp_ge",
            Op::F64CmpLe => "f64.cmp_le",
            Op::BoolCmpEq => "bool.cmp_eq",
            Op::BoolCmpNe => "bool.cmp_ne",
            Op::BoolNot => "bool.not",
            Op::BoolAnd => "bool.and",
            Op::BoolOr => "bool.or",
        }
    }
}

impl TryFrom<u8> for Op {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, u8> {
        if (byte as usize) < Self::COUNT {
            // SAFETY: Op is repr(u8) with contiguous variants starting at 0.
            Ok(unsafe { core::mem::transmute::<u8, Op>(byte) })
        } else {
            Err(byte)
        }
    }
}

impl TryFrom<i32> for Op {
    type Error = i32;

    fn try_from(id: i32) -> Result<Self, i32> {
        u8::try_from(id)
            .ok()
            .and_then(|byte| Op::try_from(byte).ok())
            .ok_or(id)
    }
}

impl core::fmt::Display for Op {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({})", self.mnemonic())
    }
}

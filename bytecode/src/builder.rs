use object::Value;

use crate::{Assembly, AssemblyError, Instruction, Op, ProcInfo};

/// A forward jump whose target has not yet been resolved.
///
/// Created by [`AssemblyBuilder::jump`]. Resolve it with
/// [`AssemblyBuilder::bind`].
#[derive(Debug)]
#[must_use = "a label must be bound or the jump targets instruction 0"]
pub struct Label {
    /// Index of the jump instruction to patch.
    at: usize,
}

/// Builds an [`Assembly`] instruction by instruction.
///
/// Procedures get dense ids in declaration order. A procedure can be
/// declared before its body exists, so mutually recursive code can call
/// ids that are bound later.
#[derive(Debug, Default)]
pub struct AssemblyBuilder {
    instructions: Vec<Instruction>,
    procedures: Vec<(Option<u32>, u32)>,
    strings: Vec<String>,
}

impl AssemblyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the next emitted instruction will get.
    pub fn current_address(&self) -> u32 {
        self.instructions.len() as u32
    }

    pub fn emit(&mut self, inst: Instruction) -> &mut Self {
        self.instructions.push(inst);
        self
    }

    pub fn op(&mut self, op: Op) -> &mut Self {
        self.emit(Instruction::new(op))
    }

    // ── Procedures ─────────────────────────────────────────────────

    /// Reserve a procedure id. Its entry address is set by
    /// [`bind_procedure`](Self::bind_procedure).
    pub fn declare_procedure(&mut self, num_args: u32) -> u32 {
        let id = self.procedures.len() as u32;
        self.procedures.push((None, num_args));
        id
    }

    /// Point procedure `id` at the current address.
    pub fn bind_procedure(&mut self, id: u32) {
        let address = self.current_address();
        if let Some(entry) = self.procedures.get_mut(id as usize) {
            entry.0 = Some(address);
        }
    }

    /// Declare a procedure whose body starts at the current address.
    pub fn begin_procedure(&mut self, num_args: u32) -> u32 {
        let id = self.declare_procedure(num_args);
        self.bind_procedure(id);
        id
    }

    /// Intern a string, returning its index in the string table.
    pub fn string(&mut self, s: &str) -> u32 {
        if let Some(index) = self.strings.iter().position(|existing| existing == s) {
            return index as u32;
        }
        self.strings.push(s.to_owned());
        (self.strings.len() - 1) as u32
    }

    // ── Jumps ──────────────────────────────────────────────────────

    /// Emit a forward `Jump`, `JumpTrue` or `JumpFalse`.
    pub fn jump(&mut self, op: Op) -> Label {
        let at = self.instructions.len();
        self.emit(Instruction::jump(op, 0));
        Label { at }
    }

    /// Bind a forward jump label to the current address.
    pub fn bind(&mut self, label: Label) {
        let target = self.current_address();
        let inst = &mut self.instructions[label.at];
        inst.operand = Value::ZERO.with_u32_at(0, target);
    }

    /// Emit a jump to an already known address (usually a loop head).
    pub fn jump_to(&mut self, op: Op, address: u32) -> &mut Self {
        self.emit(Instruction::jump(op, address))
    }

    // ── Typed helpers ──────────────────────────────────────────────

    pub fn exit(&mut self, code: i32) -> &mut Self {
        self.emit(Instruction::exit(code))
    }

    pub fn call(&mut self, procedure: u32) -> &mut Self {
        self.emit(Instruction::call(procedure))
    }

    pub fn i64_push(&mut self, value: i64) -> &mut Self {
        self.emit(Instruction::i64_push(value))
    }

    pub fn f64_push(&mut self, value: f64) -> &mut Self {
        self.emit(Instruction::f64_push(value))
    }

    pub fn bool_push(&mut self, value: bool) -> &mut Self {
        self.emit(Instruction::bool_push(value))
    }

    pub fn char_push(&mut self, value: char) -> &mut Self {
        self.emit(Instruction::char_push(value))
    }

    pub fn arg(&mut self, offset: u16) -> &mut Self {
        self.emit(Instruction::local(Op::LocalArgLoad, offset))
    }

    pub fn closure_arg(&mut self, offset: u16) -> &mut Self {
        self.emit(Instruction::local(Op::LocalClosureArgLoad, offset))
    }

    pub fn local(&mut self, offset: u16) -> &mut Self {
        self.emit(Instruction::local(Op::LocalLoad, offset))
    }

    /// Intern `s` and emit a `ConsoleWriteString` for it.
    pub fn write_string(&mut self, s: &str) -> &mut Self {
        let index = self.string(s);
        self.emit(Instruction::console_write_string(index))
    }

    pub fn record_alloc(&mut self, fields: u32) -> &mut Self {
        self.emit(Instruction::record(Op::RecordAlloc, fields))
    }

    pub fn get_field(&mut self, field: u32) -> &mut Self {
        self.emit(Instruction::record(Op::RecordGetField, field))
    }

    pub fn set_field(&mut self, field: u32) -> &mut Self {
        self.emit(Instruction::record(Op::RecordSetField, field))
    }

    pub fn closure_alloc(&mut self, procedure: u32, arg_count: u16) -> &mut Self {
        self.emit(Instruction::closure_alloc(procedure, arg_count))
    }

    pub fn closure_set_arg(&mut self, index: u16) -> &mut Self {
        self.emit(Instruction::closure_set_arg(index))
    }

    pub fn build(self) -> Result<Assembly, AssemblyError> {
        let procedures = self
            .procedures
            .into_iter()
            .enumerate()
            .map(|(id, (address, num_args))| {
                address
                    .map(|address| ProcInfo::new(address, num_args))
                    .ok_or(AssemblyError::UnboundProcedure { id: id as u32 })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Assembly::new(self.instructions, procedures, self.strings))
    }
}

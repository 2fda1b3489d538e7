use bytecode::{Instruction, Op};
use heap::HeapRef;
use object::Value;

use crate::{ExitStatus, Frame, VM, VmError};

/// What the dispatch loop does after an instruction.
enum Flow {
    /// Fall through to `ip + 1`.
    Next,
    /// The instruction already set `ip`.
    Jumped,
    Exit(ExitStatus),
}

impl VM {
    /// Execute from the current `ip` until `Exit` or a fault.
    ///
    /// On a fault `ip` still names the faulting instruction, so
    /// [`debug_dump`](VM::debug_dump) shows where it happened.
    pub fn run(&mut self) -> Result<ExitStatus, VmError> {
        log::debug!("vm: run from ip {}", self.ip);
        match self.dispatch() {
            Ok(status) => {
                log::debug!("vm: exit {} at ip {}", status.code(), self.ip);
                Ok(status)
            }
            Err(err) => {
                log::debug!("vm: fault at ip {}: {err}", self.ip);
                Err(err)
            }
        }
    }

    fn dispatch(&mut self) -> Result<ExitStatus, VmError> {
        let trace = log::log_enabled!(log::Level::Trace);
        let mut steps: u64 = 0;

        loop {
            if let Some(max) = self.max_steps {
                if steps >= max {
                    return Err(VmError::StepLimitExceeded);
                }
                steps += 1;
            }

            let inst = self
                .program
                .instructions()
                .get(self.ip)
                .copied()
                .ok_or(VmError::InstructionPointerOutOfRange { ip: self.ip })?;

            if trace {
                log::trace!("{:>6}: {inst}  sp={}", self.ip, self.stack.sp());
            }

            match self.execute(inst)? {
                Flow::Next => self.ip += 1,
                Flow::Jumped => {}
                Flow::Exit(status) => return Ok(status),
            }
        }
    }

    #[inline(always)]
    fn execute(&mut self, inst: Instruction) -> Result<Flow, VmError> {
        match inst.op {
            // ── Control flow ───────────────────────────────────────
            Op::Exit => return Ok(Flow::Exit(ExitStatus(inst.exit_code()))),
            Op::NoOp => {}
            Op::Call => return self.call(inst.u32_operand()),
            Op::Return => return self.ret(),
            Op::Jump => {
                self.ip = inst.u32_operand() as usize;
                return Ok(Flow::Jumped);
            }
            Op::JumpTrue | Op::JumpFalse => {
                let cond = self.stack.pop()?.as_bool();
                if cond == (inst.op == Op::JumpTrue) {
                    self.ip = inst.u32_operand() as usize;
                    return Ok(Flow::Jumped);
                }
            }
            Op::JumpTable | Op::StringLoad => {
                return Err(VmError::InstructionNotSupported { op: inst.op });
            }

            // ── Debugging / IO ─────────────────────────────────────
            Op::DebugDumpStack => {
                let dump = self.debug_dump();
                self.output.write_line("----------- Stack Dump -----------");
                self.output.write(&dump);
                self.output.write_line("--------- End Stack Dump ---------");
                self.output.write_line("");
            }
            Op::DebugDumpHeap => {
                let dump = self.heap.dump();
                self.output.write_line("----------- Heap Dump ------------");
                self.output.write(&dump);
                self.output.write_line("--------- End Heap Dump ----------");
                self.output.write_line("");
            }
            Op::DebugPrintI64 => {
                let v = self.stack.pop()?.as_i64();
                self.output.write_line(&v.to_string());
            }
            Op::DebugPrintF64 => {
                let v = self.stack.pop()?.as_f64();
                self.output.write_line(&v.to_string());
            }
            Op::DebugPrintBool => {
                let v = self.stack.pop()?.as_bool();
                self.output.write_line(if v { "true" } else { "false" });
            }
            Op::ConsoleWriteString => {
                let index = inst.u32_operand();
                let s = self
                    .program
                    .strings()
                    .get(index as usize)
                    .ok_or(VmError::StringDoesNotExist { index })?;
                self.output.write(s);
            }

            // ── Stack ──────────────────────────────────────────────
            Op::I64Push | Op::F64Push | Op::BoolPush | Op::CharPush => {
                self.stack.push(inst.operand)?;
            }
            Op::Pop => {
                self.stack.pop()?;
            }
            Op::Dup => {
                let top = self.stack.peek(0)?;
                self.stack.push(top)?;
            }
            Op::LocalArgLoad => {
                let index = self.frames.current()?.arg_index(inst.u16_operand());
                self.load(index)?;
            }
            Op::LocalClosureArgLoad => {
                let index = self.frames.current()?.closure_arg_index(inst.u16_operand());
                self.load(index)?;
            }
            Op::LocalLoad => {
                let index = self.frames.current()?.local_index(inst.u16_operand());
                self.load(index)?;
            }

            // ── Heap ───────────────────────────────────────────────
            Op::RecordAlloc => {
                let obj = self.heap.alloc_record(inst.u32_operand())?;
                self.stack.push(obj.into_value())?;
            }
            Op::RecordGetField => {
                let obj = HeapRef::try_from_value(self.stack.pop()?)?;
                let value = self.heap.get_field(obj, inst.u32_operand())?;
                self.stack.push(value)?;
            }
            Op::RecordSetField => {
                let value = self.stack.pop()?;
                let obj = HeapRef::try_from_value(self.stack.peek(0)?)?;
                self.heap.set_field(obj, inst.u32_operand(), value)?;
            }
            Op::ClosureAlloc => {
                let obj = self
                    .heap
                    .alloc_closure(inst.u32_operand(), inst.closure_arg_count())?;
                self.stack.push(obj.into_value())?;
            }
            Op::ClosureSetArg => {
                let value = self.stack.pop()?;
                let obj = HeapRef::try_from_value(self.stack.peek(0)?)?;
                self.heap.set_closure_arg(obj, inst.u16_operand(), value)?;
            }
            Op::ClosureApply => return self.apply(),

            // ── Arithmetic ─────────────────────────────────────────
            Op::I64Add => self.i64_op(i64::wrapping_add)?,
            Op::I64Sub => self.i64_op(i64::wrapping_sub)?,
            Op::I64Mul => self.i64_op(i64::wrapping_mul)?,
            Op::I64Div => {
                let right = self.stack.pop()?.as_i64();
                let left = self.stack.pop()?.as_i64();
                if right == 0 {
                    return Err(VmError::DivisionByZero);
                }
                self.stack.push(Value::from_i64(left.wrapping_div(right)))?;
            }
            Op::I64ToF64 => {
                let v = self.stack.pop()?.as_i64();
                self.stack.push(Value::from_f64(v as f64))?;
            }
            Op::F64Add => self.f64_op(|a, b| a + b)?,
            Op::F64Sub => self.f64_op(|a, b| a - b)?,
            Op::F64Mul => self.f64_op(|a, b| a * b)?,
            Op::F64Div => self.f64_op(|a, b| a / b)?,

            // ── Comparison / logic ─────────────────────────────────
            Op::I64CmpEq => self.i64_cmp(|a, b| a == b)?,
            Op::I64CmpNe => self.i64_cmp(|a, b| a != b)?,
            Op::I64CmpGt => self.i64_cmp(|a, b| a > b)?,
            Op::I64CmpLt => self.i64_cmp(|a, b| a < b)?,
            Op::I64CmpGe => self.i64_cmp(|a, b| a >= b)?,
            Op::I64CmpLe => self.i64_cmp(|a, b| a <= b)?,
            Op::F64CmpEq => self.f64_cmp(|a, b| a == b)?,
            Op::F64CmpNe => self.f64_cmp(|a, b| a != b)?,
            Op::F64CmpGt => self.f64_cmp(|a, b| a > b)?,
            Op::F64CmpLt => self.f64_cmp(|a, b| a < b)?,
            Op::F64CmpGe => self.f64_cmp(|a, b| a >= b)?,
            Op::F64CmpLe => self.f64_cmp(|a, b| a <= b)?,
            Op::BoolCmpEq => self.bool_op(|a, b| a == b)?,
            Op::BoolCmpNe => self.bool_op(|a, b| a != b)?,
            Op::BoolAnd => self.bool_op(|a, b| a && b)?,
            Op::BoolOr => self.bool_op(|a, b| a || b)?,
            Op::BoolNot => {
                let v = self.stack.pop()?.as_bool();
                self.stack.push(Value::from_bool(!v))?;
            }
        }
        Ok(Flow::Next)
    }

    // ── Calls ──────────────────────────────────────────────────────

    fn call(&mut self, id: u32) -> Result<Flow, VmError> {
        if self
            .foreign
            .invoke(id, &mut self.stack, self.output.as_mut())?
        {
            return Ok(Flow::Next);
        }
        self.enter(id, 0)?;
        Ok(Flow::Jumped)
    }

    /// Push a frame for procedure `id` over the arguments already on the
    /// stack and jump to its entry.
    fn enter(&mut self, id: u32, closure_args: usize) -> Result<(), VmError> {
        let proc = *self
            .program
            .procedures()
            .get(id as usize)
            .ok_or(VmError::ProcedureDoesNotExist { id })?;
        if self.frames.depth() >= self.frames.max_depth() {
            return Err(VmError::CallStackOverflow {
                depth: self.frames.depth(),
            });
        }
        let num_args = proc.num_args as usize;
        let sp = self.stack.sp();
        let base_sp = sp
            .checked_sub(num_args)
            .ok_or(VmError::BasePointerOutOfRange { sp, num_args })?;

        self.frames
            .push(Frame::new(self.ip + 1, base_sp, num_args, closure_args))?;
        self.ip = proc.address as usize;
        Ok(())
    }

    /// `args* closure -> args* captured*`, then enter the closure's
    /// procedure.
    ///
    /// Every captured argument must have been set with `ClosureSetArg`
    /// before the closure is applied. Applying one with unset arguments is
    /// a program error: those slots are spliced in as zero.
    fn apply(&mut self) -> Result<Flow, VmError> {
        let obj = HeapRef::try_from_value(self.stack.pop()?)?;
        let header = self.heap.closure_header(obj)?;
        self.enter(header.procedure, header.arg_count as usize)?;
        for &arg in self.heap.closure_args(obj)? {
            self.stack.push(arg)?;
        }
        Ok(Flow::Jumped)
    }

    /// The return value replaces the whole frame and lands at `base_sp`.
    ///
    /// A fault leaves the stack and the call stack untouched.
    fn ret(&mut self) -> Result<Flow, VmError> {
        let sp = self.stack.sp();
        if sp == 0 {
            return Err(VmError::StackUnderflow);
        }
        let base_sp = self.frames.current()?.base_sp;
        // the value itself does not count towards the frame
        if sp - 1 < base_sp {
            return Err(VmError::StackPointerOutOfRange {
                index: base_sp as isize,
            });
        }
        let value = self.stack.pop()?;
        let frame = self.frames.pop()?;
        self.stack.truncate(frame.base_sp);
        self.stack.push(value)?;
        self.ip = frame.return_addr;
        Ok(Flow::Jumped)
    }

    #[inline(always)]
    fn load(&mut self, index: usize) -> Result<(), VmError> {
        let value = self.stack.get(index as isize)?;
        self.stack.push(value)
    }

    // ── Binary operators ───────────────────────────────────────────
    //
    // The right operand is on top: `left right OP -> (left OP right)`.

    #[inline(always)]
    fn binary(&mut self, op: impl FnOnce(Value, Value) -> Value) -> Result<(), VmError> {
        let right = self.stack.pop()?;
        let left = self.stack.pop()?;
        self.stack.push(op(left, right))
    }

    #[inline(always)]
    fn i64_op(&mut self, op: impl FnOnce(i64, i64) -> i64) -> Result<(), VmError> {
        self.binary(|a, b| Value::from_i64(op(a.as_i64(), b.as_i64())))
    }

    #[inline(always)]
    fn f64_op(&mut self, op: impl FnOnce(f64, f64) -> f64) -> Result<(), VmError> {
        self.binary(|a, b| Value::from_f64(op(a.as_f64(), b.as_f64())))
    }

    #[inline(always)]
    fn i64_cmp(&mut self, op: impl FnOnce(i64, i64) -> bool) -> Result<(), VmError> {
        self.binary(|a, b| Value::from_bool(op(a.as_i64(), b.as_i64())))
    }

    #[inline(always)]
    fn f64_cmp(&mut self, op: impl FnOnce(f64, f64) -> bool) -> Result<(), VmError> {
        self.binary(|a, b| Value::from_bool(op(a.as_f64(), b.as_f64())))
    }

    #[inline(always)]
    fn bool_op(&mut self, op: impl FnOnce(bool, bool) -> bool) -> Result<(), VmError> {
        self.binary(|a, b| Value::from_bool(op(a.as_bool(), b.as_bool())))
    }
}

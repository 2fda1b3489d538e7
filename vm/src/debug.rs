use std::fmt::Write;

use crate::VM;

impl VM {
    /// Human-readable view of the active frame (or the top of the stack when
    /// no frame is active), the call stack and `ip`.
    pub fn debug_dump(&self) -> String {
        let mut out = String::new();
        let stack = self.stack.as_slice();

        match self.frames.current() {
            Ok(frame) => {
                let closure_start = frame.base_sp + frame.closure_args_offset;
                let locals_start = frame.base_sp + frame.locals_offset;
                let mut region = frame.base_sp;

                out.push_str("Current Frame:\n");
                out.push_str("  [Procedure Args]:\n");
                for (i, value) in stack.iter().enumerate().skip(frame.base_sp) {
                    if i == closure_start {
                        out.push_str("  [Closure Args]:\n");
                        region = closure_start;
                    }
                    if i == locals_start {
                        out.push_str("  [Locals]:\n");
                        region = locals_start;
                    }
                    let _ = writeln!(out, "    [{}]: {value}", i - region);
                }
            }
            Err(_) => {
                out.push_str("Value Stack:\n");
                let _ = writeln!(out, "  Stack Pointer: {}", self.stack.sp());
                for depth in 0..4 {
                    if let Ok(value) = self.stack.peek(depth) {
                        let _ = writeln!(out, "    [{depth}]: {value}");
                    }
                }
            }
        }

        out.push_str("Call Stack:\n");
        let _ = writeln!(out, "  Frames: {}", self.frames.depth());
        if let Ok(frame) = self.frames.current() {
            let _ = writeln!(
                out,
                "    [0]: Return Address = {}, Base Stack Pointer = {}",
                frame.return_addr, frame.base_sp
            );
        }
        let _ = writeln!(out, "Instruction Pointer: {}", self.ip);
        out
    }
}

mod bench;
mod debug;
mod error;
mod foreign;
mod frame;
mod interpreter;
pub mod natives;
mod output;
mod stack;

use bytecode::Assembly;
use heap::{Heap, HeapSettings};

pub use bench::BenchmarkInfo;
pub use error::VmError;
pub use foreign::{ForeignContext, ForeignError, ForeignProcedure, ForeignTable};
pub use frame::{CallStack, Frame};
pub use output::{ConsoleOutput, LoggedOutput, Output};
pub use stack::{Stack, StackSettings};

// ── VM settings ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct VMSettings {
    pub stack: StackSettings,
    pub heap: HeapSettings,
    pub max_call_depth: usize,
    /// Abort with [`VmError::StepLimitExceeded`] after this many dispatched
    /// instructions in one run.
    pub max_steps: Option<u64>,
}

impl Default for VMSettings {
    fn default() -> Self {
        Self {
            stack: StackSettings::default(),
            heap: HeapSettings::default(),
            max_call_depth: 1_000_000,
            max_steps: None,
        }
    }
}

/// Status code of a program that halted through `Exit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExitStatus(pub i32);

impl ExitStatus {
    #[inline]
    pub fn code(self) -> i32 {
        self.0
    }
}

/// Inspection copy of the VM registers and storage sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VMSnapshot {
    pub ip: usize,
    pub sp: usize,
    pub frames: usize,
    pub heap_words: usize,
    pub stack_capacity: usize,
    pub heap_capacity: usize,
}

// ── VM ────────────────────────────────────────────────────────────────

/// One interpreter instance. It exclusively owns its program, operand
/// stack, call stack, heap and output sink.
pub struct VM {
    program: Assembly,
    stack: Stack,
    frames: CallStack,
    heap: Heap,
    ip: usize,
    output: Box<dyn Output>,
    foreign: ForeignTable,
    max_steps: Option<u64>,
}

impl VM {
    pub fn builder(program: Assembly) -> VMBuilder {
        VMBuilder::new(program)
    }

    #[inline]
    pub fn ip(&self) -> usize {
        self.ip
    }

    #[inline]
    pub fn program(&self) -> &Assembly {
        &self.program
    }

    #[inline]
    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    #[inline]
    pub fn frames(&self) -> &CallStack {
        &self.frames
    }

    #[inline]
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Back to the initial state: `ip = 0`, empty stacks, empty heap.
    /// Storage is kept.
    pub fn reset(&mut self) {
        self.ip = 0;
        self.stack.clear();
        self.frames.clear();
        self.heap.reset();
        log::debug!("vm: reset");
    }

    pub fn snapshot(&self) -> VMSnapshot {
        VMSnapshot {
            ip: self.ip,
            sp: self.stack.sp(),
            frames: self.frames.depth(),
            heap_words: self.heap.used_words(),
            stack_capacity: self.stack.capacity(),
            heap_capacity: self.heap.capacity_words(),
        }
    }
}

impl core::fmt::Debug for VM {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VM")
            .field("ip", &self.ip)
            .field("sp", &self.stack.sp())
            .field("frames", &self.frames.depth())
            .field("foreign", &self.foreign)
            .finish_non_exhaustive()
    }
}

// ── Builder ───────────────────────────────────────────────────────────

pub struct VMBuilder {
    program: Assembly,
    output: Option<Box<dyn Output>>,
    settings: VMSettings,
    foreign: ForeignTable,
}

impl VMBuilder {
    pub fn new(program: Assembly) -> Self {
        Self {
            program,
            output: None,
            settings: VMSettings::default(),
            foreign: ForeignTable::new(),
        }
    }

    pub fn with_output(mut self, output: impl Output + 'static) -> Self {
        self.output = Some(Box::new(output));
        self
    }

    pub fn with_settings(mut self, settings: VMSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_procedure(mut self, id: u32, procedure: Box<dyn ForeignProcedure>) -> Self {
        self.foreign.register(id, procedure);
        self
    }

    /// Output defaults to [`ConsoleOutput`].
    pub fn build(self) -> VM {
        let VMSettings {
            stack,
            heap,
            max_call_depth,
            max_steps,
        } = self.settings;

        log::debug!(
            "vm: built with {} instructions, {} procedures, {} foreign procedures",
            self.program.instructions().len(),
            self.program.procedures().len(),
            self.foreign.len()
        );

        VM {
            program: self.program,
            stack: Stack::new(&stack),
            frames: CallStack::new(max_call_depth),
            heap: Heap::new(heap),
            ip: 0,
            output: self
                .output
                .unwrap_or_else(|| Box::new(ConsoleOutput)),
            foreign: self.foreign,
            max_steps,
        }
    }
}

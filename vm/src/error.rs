use bytecode::{AssemblyError, Op};
use heap::HeapError;

/// Every way a run can abort. `Exit` is not among them: a halted program
/// reports an [`ExitStatus`](crate::ExitStatus).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VmError {
    #[error(transparent)]
    Heap(#[from] HeapError),

    #[error("Invalid assembly: {0}")]
    InvalidAssembly(#[from] AssemblyError),

    #[error("Stack overflow.")]
    StackOverflow,

    #[error("Stack underflow.")]
    StackUnderflow,

    #[error("Stack pointer out of range (index {index}).")]
    StackPointerOutOfRange { index: isize },

    #[error("Instruction pointer out of range (ip {ip}).")]
    InstructionPointerOutOfRange { ip: usize },

    #[error("Call stack underflow.")]
    CallStackUnderflow,

    #[error("Call stack overflow (depth {depth}).")]
    CallStackOverflow { depth: usize },

    #[error("Procedure {id} does not exist.")]
    ProcedureDoesNotExist { id: u32 },

    #[error("Base pointer out of range (sp {sp}, {num_args} arguments).")]
    BasePointerOutOfRange { sp: usize, num_args: usize },

    #[error("Instruction `{}` is not supported.", .op.mnemonic())]
    InstructionNotSupported { op: Op },

    #[error("String {index} does not exist.")]
    StringDoesNotExist { index: u32 },

    #[error("Division by zero.")]
    DivisionByZero,

    #[error("Step limit exceeded.")]
    StepLimitExceeded,

    #[error("Foreign procedure `{procedure}` failed: {message}")]
    Foreign { procedure: String, message: String },
}

mod op;
mod instruction;
mod assembly;
mod builder;

pub use op::Op;
pub use instruction::Instruction;
pub use assembly::{Assembly, AssemblyError, MAGIC_NUMBER, ProcInfo, VERSION};
pub use builder::{AssemblyBuilder, Label};

mod handle;
mod heap;

pub use handle::HeapRef;
pub use heap::*;

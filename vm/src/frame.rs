use crate::VmError;

/// Activation record of one in-progress call.
///
/// A frame owns nothing: it describes a range of the operand stack starting
/// at `base_sp`, laid out as three contiguous regions.
///
/// ```text
/// base_sp
///   │ args ... │ closure args ... │ locals ...
///   0          closure_args_offset locals_offset
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Instruction index to resume at after `Return`.
    pub return_addr: usize,
    /// Stack index of the first argument.
    pub base_sp: usize,
    /// Length of the argument region.
    pub closure_args_offset: usize,
    /// Length of the argument and closure argument regions together.
    pub locals_offset: usize,
}

impl Frame {
    pub fn new(return_addr: usize, base_sp: usize, num_args: usize, closure_args: usize) -> Self {
        Self {
            return_addr,
            base_sp,
            closure_args_offset: num_args,
            locals_offset: num_args + closure_args,
        }
    }

    #[inline(always)]
    pub fn arg_index(&self, offset: u16) -> usize {
        self.base_sp + offset as usize
    }

    #[inline(always)]
    pub fn closure_arg_index(&self, offset: u16) -> usize {
        self.base_sp + self.closure_args_offset + offset as usize
    }

    #[inline(always)]
    pub fn local_index(&self, offset: u16) -> usize {
        self.base_sp + self.locals_offset + offset as usize
    }
}

/// The explicit stack of [`Frame`]s, bounded by the configured call depth.
#[derive(Debug, Clone)]
pub struct CallStack {
    frames: Vec<Frame>,
    max_depth: usize,
}

impl CallStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            frames: Vec::new(),
            max_depth,
        }
    }

    #[inline(always)]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    #[inline(always)]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Fails when one more frame would exceed the maximum depth.
    #[inline(always)]
    pub fn push(&mut self, frame: Frame) -> Result<(), VmError> {
        if self.frames.len() >= self.max_depth {
            return Err(VmError::CallStackOverflow {
                depth: self.frames.len(),
            });
        }
        self.frames.push(frame);
        Ok(())
    }

    #[inline(always)]
    pub fn pop(&mut self) -> Result<Frame, VmError> {
        self.frames.pop().ok_or(VmError::CallStackUnderflow)
    }

    /// The active frame.
    #[inline(always)]
    pub fn current(&self) -> Result<&Frame, VmError> {
        self.frames.last().ok_or(VmError::CallStackUnderflow)
    }

    /// Frames from innermost to outermost.
    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter().rev()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

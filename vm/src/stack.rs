use object::Value;

use crate::VmError;

#[derive(Debug, Clone)]
pub struct StackSettings {
    /// Slots reserved up front.
    pub initial_size: usize,
    /// Hard ceiling in slots. `None` grows without bound.
    pub max_size: Option<usize>,
}

impl Default for StackSettings {
    fn default() -> Self {
        Self {
            initial_size: 8192, // 64 KB
            max_size: None,
        }
    }
}

/// The operand stack.
///
/// `sp` is the number of live slots; slots at or above it are never read.
/// Frames are views over ranges of this stack, see [`Frame`](crate::Frame).
#[derive(Debug, Clone)]
pub struct Stack {
    slots: Vec<Value>,
    limit: usize,
}

impl Stack {
    #[must_use]
    pub fn new(settings: &StackSettings) -> Self {
        Self {
            slots: Vec::with_capacity(settings.initial_size),
            limit: settings.max_size.unwrap_or(usize::MAX),
        }
    }

    /// The live portion of the stack, bottom first.
    #[inline(always)]
    #[must_use]
    pub fn as_slice(&self) -> &[Value] {
        &self.slots
    }

    #[inline(always)]
    #[must_use]
    pub fn sp(&self) -> usize {
        self.slots.len()
    }

    #[inline(always)]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    #[inline(always)]
    pub fn push(&mut self, value: Value) -> Result<(), VmError> {
        let sp = self.slots.len();
        if sp >= self.limit {
            return Err(VmError::StackOverflow);
        }
        if sp == self.slots.capacity() {
            self.grow();
        }
        self.slots.push(value);
        Ok(())
    }

    #[cold]
    fn grow(&mut self) {
        let sp = self.slots.len();
        log::debug!("stack: growing past {sp} slots");
        self.slots.reserve(sp.max(1));
    }

    #[inline(always)]
    pub fn pop(&mut self) -> Result<Value, VmError> {
        self.slots.pop().ok_or(VmError::StackUnderflow)
    }

    /// The value `depth` slots below the top, without popping.
    #[inline(always)]
    pub fn peek(&self, depth: usize) -> Result<Value, VmError> {
        let index = self.slots.len() as isize - 1 - depth as isize;
        self.get(index)
    }

    #[inline(always)]
    pub fn get(&self, index: isize) -> Result<Value, VmError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.slots.get(i))
            .copied()
            .ok_or(VmError::StackPointerOutOfRange { index })
    }

    #[inline(always)]
    pub fn set(&mut self, index: isize, value: Value) -> Result<(), VmError> {
        let slot = usize::try_from(index)
            .ok()
            .and_then(|i| self.slots.get_mut(i))
            .ok_or(VmError::StackPointerOutOfRange { index })?;
        *slot = value;
        Ok(())
    }

    /// Drop every slot at or above `sp`.
    #[inline(always)]
    pub fn truncate(&mut self, sp: usize) {
        self.slots.truncate(sp);
    }

    /// The topmost `n` slots, oldest first.
    pub fn top(&self, n: usize) -> Result<&[Value], VmError> {
        let start = self
            .slots
            .len()
            .checked_sub(n)
            .ok_or(VmError::StackUnderflow)?;
        Ok(&self.slots[start..])
    }

    /// Empty the stack, keeping its storage.
    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack(max_size: Option<usize>) -> Stack {
        Stack::new(&StackSettings {
            initial_size: 2,
            max_size,
        })
    }

    #[test]
    fn balanced_push_pop_restores_sp() {
        let mut s = stack(None);
        s.push(Value::from_i64(-1)).unwrap();
        let before = s.sp();
        for i in 0..100 {
            s.push(Value::from_i64(i)).unwrap();
        }
        for i in (0..100).rev() {
            assert_eq!(s.pop().unwrap().as_i64(), i);
        }
        assert_eq!(s.sp(), before);
        assert_eq!(s.pop().unwrap().as_i64(), -1);
    }

    #[test]
    fn pop_empty_underflows() {
        let mut s = stack(None);
        assert_eq!(s.pop(), Err(VmError::StackUnderflow));
        s.push(Value::ZERO).unwrap();
        s.pop().unwrap();
        assert_eq!(s.pop(), Err(VmError::StackUnderflow));
    }

    #[test]
    fn grows_past_initial_size() {
        let mut s = stack(None);
        for i in 0..1000 {
            s.push(Value::from_i64(i)).unwrap();
        }
        assert_eq!(s.sp(), 1000);
        assert!(s.capacity() >= 1000);
        assert_eq!(s.peek(999).unwrap().as_i64(), 0);
    }

    #[test]
    fn max_size_overflows() {
        let mut s = stack(Some(3));
        for _ in 0..3 {
            s.push(Value::ZERO).unwrap();
        }
        assert_eq!(s.push(Value::ZERO), Err(VmError::StackOverflow));
        assert_eq!(s.sp(), 3);
    }

    #[test]
    fn peek_and_indexed_access() {
        let mut s = stack(None);
        s.push(Value::from_i64(10)).unwrap();
        s.push(Value::from_i64(20)).unwrap();
        assert_eq!(s.peek(0).unwrap().as_i64(), 20);
        assert_eq!(s.peek(1).unwrap().as_i64(), 10);
        assert_eq!(
            s.peek(2),
            Err(VmError::StackPointerOutOfRange { index: -1 })
        );

        s.set(0, Value::from_i64(11)).unwrap();
        assert_eq!(s.get(0).unwrap().as_i64(), 11);
        assert_eq!(s.get(2), Err(VmError::StackPointerOutOfRange { index: 2 }));
        assert_eq!(
            s.set(-3, Value::ZERO),
            Err(VmError::StackPointerOutOfRange { index: -3 })
        );
    }

    #[test]
    fn top_slice() {
        let mut s = stack(None);
        for i in 1..=3 {
            s.push(Value::from_i64(i)).unwrap();
        }
        let top: Vec<i64> = s.top(2).unwrap().iter().map(|v| v.as_i64()).collect();
        assert_eq!(top, vec![2, 3]);
        assert!(s.top(0).unwrap().is_empty());
        assert_eq!(s.top(4), Err(VmError::StackUnderflow));
    }

    #[test]
    fn clear_keeps_storage() {
        let mut s = stack(None);
        for i in 0..64 {
            s.push(Value::from_i64(i)).unwrap();
        }
        let capacity = s.capacity();
        s.clear();
        assert!(s.is_empty());
        assert_eq!(s.capacity(), capacity);
    }
}

//! The synchronous call stack.

use core_types::{JsError, StackFrame};

/// LIFO stack of active frames.
///
/// Only the top frame is ever running. Frames are pushed by
/// [`EventLoop::call`](crate::EventLoop::call) and the loop's own dispatch and
/// popped when the body returns, whether it returned `Ok` or `Err`.
#[derive(Debug, Clone)]
pub struct CallStack {
    frames: Vec<StackFrame>,
    max_depth: usize,
}

impl CallStack {
    /// Creates an empty stack holding at most `max_depth` frames.
    pub fn new(max_depth: usize) -> Self {
        Self {
            frames: Vec::new(),
            max_depth,
        }
    }

    /// Pushes a frame, or raises `RangeError` if the stack is full.
    pub fn push(&mut self, frame: StackFrame) -> Result<(), JsError> {
        if self.frames.len() >= self.max_depth {
            let mut error = JsError::range_error("Maximum call stack size exceeded");
            error.stack = self.trace();
            return Err(error);
        }
        self.frames.push(frame);
        Ok(())
    }

    /// Pops the running frame.
    pub fn pop(&mut self) -> Option<StackFrame> {
        self.frames.pop()
    }

    /// Returns the running frame.
    pub fn current(&self) -> Option<&StackFrame> {
        self.frames.last()
    }

    /// Number of active frames.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Returns true if no frame is running.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Copies the stack, innermost frame first.
    pub fn trace(&self) -> Vec<StackFrame> {
        self.frames.iter().rev().cloned().collect()
    }
}

//! Stack frame types for call stack tracking.
//!
//! Frames are recorded by the scheduler's call stack and copied into
//! [`JsError::stack`](crate::JsError) when an error escapes a frame.

use std::fmt;

/// What kind of activation pushed a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// The top-level body of a script run by the host
    Script,
    /// A nested synchronous call made from inside another frame
    Call,
    /// A continuation dequeued from the microtask queue
    Microtask,
    /// A continuation dequeued from the macrotask queue
    Macrotask,
    /// A promise executor, run synchronously at creation time
    Executor,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FrameKind::Script => "script",
            FrameKind::Call => "call",
            FrameKind::Microtask => "microtask",
            FrameKind::Macrotask => "macrotask",
            FrameKind::Executor => "executor",
        };
        f.write_str(name)
    }
}

/// Represents a single frame in a call stack.
///
/// # Examples
///
/// ```
/// use core_types::{FrameKind, StackFrame};
///
/// let frame = StackFrame::new(Some("getUser".to_string()), FrameKind::Macrotask);
///
/// assert_eq!(frame.function_name, Some("getUser".to_string()));
/// assert_eq!(frame.to_string(), "at getUser (macrotask)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// Name of the function, or None for anonymous functions
    pub function_name: Option<String>,
    /// The kind of activation that pushed this frame
    pub kind: FrameKind,
}

impl StackFrame {
    /// Creates a new frame.
    pub fn new(function_name: Option<String>, kind: FrameKind) -> Self {
        Self {
            function_name,
            kind,
        }
    }

    /// Returns the function name, or `<anonymous>`.
    pub fn display_name(&self) -> &str {
        self.function_name.as_deref().unwrap_or("<anonymous>")
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at {} ({})", self.display_name(), self.kind)
    }
}

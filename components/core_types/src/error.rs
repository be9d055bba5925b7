//! Error types raised by continuations.
//!
//! This module provides error types that correspond to JavaScript's built-in
//! error constructors, along with the stack trace captured when the error
//! escaped its frame.

use crate::StackFrame;
use std::fmt;
use thiserror::Error;

/// The kind of error.
///
/// These correspond to JavaScript's built-in error constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Plain `Error`, used for user-raised failures
    Error,
    /// Type error (e.g., a promise resolved with itself)
    TypeError,
    /// Value out of allowed range (e.g., call stack overflow)
    RangeError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Error => "Error",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::RangeError => "RangeError",
        };
        f.write_str(name)
    }
}

/// An error with message and stack trace.
///
/// This struct represents an exception that a continuation raises by returning
/// `Err`. The stack is empty when the error is created and is filled in by
/// the call stack the first time the error escapes a frame.
///
/// # Examples
///
/// ```
/// use core_types::{JsError, ErrorKind};
///
/// let error = JsError::new(ErrorKind::TypeError, "undefined is not a function");
///
/// assert_eq!(error.message, "undefined is not a function");
/// assert!(error.stack.is_empty());
/// ```
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct JsError {
    /// The type of error
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Stack trace, innermost frame first
    pub stack: Vec<StackFrame>,
}

impl JsError {
    /// Creates an error with an empty stack.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            stack: Vec::new(),
        }
    }

    /// Shorthand for a plain `Error`.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Error, message)
    }

    /// Shorthand for a `TypeError`.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    /// Shorthand for a `RangeError`.
    pub fn range_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RangeError, message)
    }

    /// Formats the error followed by one `at ...` line per frame.
    pub fn stack_trace(&self) -> String {
        let mut out = self.to_string();
        for frame in &self.stack {
            out.push_str("\n    ");
            out.push_str(&frame.to_string());
        }
        out
    }
}

/// Two errors are equal when they have the same kind and message; the
/// captured stack does not take part in the comparison.
impl PartialEq for JsError {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.message == other.message
    }
}

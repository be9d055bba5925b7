//! Core value, error and stack-frame types for the Corten event loop.
//!
//! This crate provides the foundational types shared by the scheduler and its
//! hosts: the values continuations exchange, the errors they raise, and the
//! frames recorded on the call stack.
//!
//! # Overview
//!
//! - [`Value`] - Tagged representation of values passed between continuations
//! - [`JsError`] - Errors raised by continuations, with a captured stack trace
//! - [`ErrorKind`] - Types of errors
//! - [`StackFrame`] - Call stack frame information
//! - [`FrameKind`] - What pushed a frame onto the call stack
//!
//! # Examples
//!
//! ```
//! use core_types::{Value, JsError, ErrorKind};
//!
//! let results = Value::Array(vec![Value::Smi(42), Value::from("done")]);
//! assert_eq!(results.to_string(), "42,done");
//!
//! let error = JsError::new(ErrorKind::TypeError, "undefined is not a function");
//! assert_eq!(error.to_string(), "TypeError: undefined is not a function");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod source;
mod value;

pub use error::{ErrorKind, JsError};
pub use source::{FrameKind, StackFrame};
pub use value::Value;

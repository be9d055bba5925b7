//! Async runtime: a single-threaded cooperative scheduler.
//!
//! This crate provides the asynchronous core of the runtime:
//! - A call stack of synchronous frames
//! - A microtask queue, drained completely between macrotasks
//! - A macrotask queue ordered by logical trigger time
//! - Promises whose reactions always run as microtasks
//!
//! # Overview
//!
//! - [`EventLoop`] - Scheduler handle that owns the queues and drives turns
//! - [`Promise`] - Single-assignment deferred value with chaining
//! - [`Continuation`] - A closure plus the arguments it was scheduled with
//! - [`host`] - `setTimeout`-style timers and callback normalisation
//!
//! # Examples
//!
//! ## Ordering
//!
//! ```
//! use async_runtime::{host, EventLoop, Promise};
//! use core_types::Value;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let event_loop = EventLoop::new();
//! let log = Rc::new(RefCell::new(Vec::new()));
//!
//! log.borrow_mut().push("Start");
//! let l = log.clone();
//! host::set_timeout(&event_loop, 0, move || {
//!     l.borrow_mut().push("Timeout");
//!     Ok(Value::Undefined)
//! });
//! let l = log.clone();
//! Promise::resolved(&event_loop, Value::Undefined).then(move |_| {
//!     l.borrow_mut().push("Promise");
//!     Ok(Value::Undefined)
//! });
//! log.borrow_mut().push("End");
//!
//! event_loop.run_to_quiescence().unwrap();
//! assert_eq!(*log.borrow(), vec!["Start", "End", "Promise", "Timeout"]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod call_stack;
pub mod config;
pub mod error;
pub mod event_loop;
pub mod host;
pub mod promise;
pub mod task_queue;

// Re-export main types at crate root
pub use call_stack::CallStack;
pub use config::EventLoopConfig;
pub use error::RuntimeError;
pub use event_loop::{ErrorReporter, EventLoop, LoopPhase, LoopStats};
pub use promise::{OnFulfilled, OnRejected, Promise, PromiseReaction, PromiseState, Reject, Resolve};
pub use task_queue::{
    Continuation, ContinuationFn, MacrotaskQueue, MicrotaskQueue, ScheduledTask, TimerId,
};

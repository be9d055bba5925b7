//! Errors surfaced by the event loop to its host.

use core_types::JsError;
use thiserror::Error;

/// An error observed at the scheduler boundary.
///
/// The first three variants are reported through the loop's error reporter
/// (or returned from [`EventLoop::run_until_settled`](crate::EventLoop::run_until_settled))
/// and never stop the loop. The remaining variants are returned from the
/// driving methods and leave queued work in place.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// An error escaped a top-level continuation with no recovery point.
    #[error("Uncaught {0}")]
    SynchronousRaise(JsError),
    /// A promise settled into the rejected state.
    #[error("Promise rejected: {0}")]
    RejectedDeferred(JsError),
    /// A rejected promise had no reaction registered when the loop went idle.
    #[error("Uncaught (in promise) {0}")]
    UnhandledRejection(JsError),
    /// The awaited promise was still pending when the loop went idle.
    #[error("promise was still pending when the event loop went idle")]
    NeverSettled,
    /// The loop was driven from inside one of its own continuations or its
    /// error reporter.
    #[error("the event loop cannot be driven while it is already running")]
    Reentrant,
    /// `max_turns` was reached with macrotasks still queued.
    #[error("event loop exceeded the limit of {limit} turns")]
    TurnLimitExceeded {
        /// The configured limit
        limit: u64,
    },
    /// A single microtask checkpoint ran more than `microtask_checkpoint_limit` jobs.
    #[error("microtask checkpoint exceeded the limit of {limit} microtasks")]
    MicrotaskLimitExceeded {
        /// The configured limit
        limit: usize,
    },
}

impl RuntimeError {
    /// Returns the underlying script error, if this variant carries one.
    pub fn js_error(&self) -> Option<&JsError> {
        match self {
            RuntimeError::SynchronousRaise(e)
            | RuntimeError::RejectedDeferred(e)
            | RuntimeError::UnhandledRejection(e) => Some(e),
            _ => None,
        }
    }
}

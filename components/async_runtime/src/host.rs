//! Host facilities built on the event loop.
//!
//! These mirror the browser APIs the scheduler is normally driven by:
//! timers, and callback-style completions normalised into promises so every
//! asynchronous result follows the same ordering rules.

use crate::event_loop::EventLoop;
use crate::promise::Promise;
use crate::task_queue::{Continuation, TimerId};
use core_types::{JsError, Value};

/// Completion callback handed to a callback-style operation.
pub type NodeCallback = Box<dyn FnOnce(Result<Value, JsError>)>;

/// `setTimeout`: runs `callback` as a macrotask after `delay_ms` logical
/// milliseconds.
pub fn set_timeout<F>(event_loop: &EventLoop, delay_ms: i64, callback: F) -> TimerId
where
    F: FnOnce() -> Result<Value, JsError> + 'static,
{
    event_loop.schedule_macrotask(
        Continuation::new(callback).named("setTimeout callback"),
        delay_ms,
    )
}

/// `clearTimeout`: withdraws a timer that has not fired. Returns false if it
/// already fired or was already cleared.
pub fn clear_timeout(event_loop: &EventLoop, id: TimerId) -> bool {
    event_loop.cancel_macrotask(id)
}

/// A promise fulfilled with `value` when a `delay_ms` timer fires.
///
/// # Examples
///
/// ```
/// use async_runtime::{host, EventLoop};
/// use core_types::Value;
///
/// let event_loop = EventLoop::new();
/// let response = host::delay(&event_loop, 2000, Value::from("Sample data from API"));
///
/// assert_eq!(
///     event_loop.run_until_settled(&response).unwrap(),
///     Value::from("Sample data from API")
/// );
/// assert_eq!(event_loop.now(), 2000);
/// ```
pub fn delay(event_loop: &EventLoop, delay_ms: i64, value: Value) -> Promise {
    let timers = event_loop.clone();
    Promise::new(event_loop, move |resolve, _reject| {
        set_timeout(&timers, delay_ms, move || {
            resolve.call(value);
            Ok(Value::Undefined)
        });
        Ok(())
    })
}

/// Wraps a callback-style operation so its completion settles a promise.
///
/// `start` runs synchronously and receives the completion callback; calling
/// it with `Ok` fulfils the promise and with `Err` rejects it. Only the first
/// completion counts. A raise from `start` itself rejects the promise.
///
/// # Examples
///
/// ```
/// use async_runtime::{host, EventLoop};
/// use core_types::{JsError, Value};
///
/// let event_loop = EventLoop::new();
/// let timers = event_loop.clone();
/// let user = host::from_callback(&event_loop, move |done| {
///     host::set_timeout(&timers, 1000, move || {
///         done(Ok(Value::from("John Doe")));
///         Ok(Value::Undefined)
///     });
///     Ok(())
/// });
///
/// assert_eq!(event_loop.run_until_settled(&user).unwrap(), Value::from("John Doe"));
/// ```
pub fn from_callback<F>(event_loop: &EventLoop, start: F) -> Promise
where
    F: FnOnce(NodeCallback) -> Result<(), JsError> + 'static,
{
    Promise::new(event_loop, move |resolve, reject| {
        start(Box::new(move |outcome| match outcome {
            Ok(value) => resolve.call(value),
            Err(error) => reject.call(error),
        }))
    })
}

//! Event loop implementation.
//!
//! This module provides the scheduler that coordinates the call stack, the
//! microtask queue and the macrotask queue following the JavaScript event
//! loop model.

use crate::call_stack::CallStack;
use crate::config::EventLoopConfig;
use crate::error::RuntimeError;
use crate::promise::{Promise, PromiseState};
use crate::task_queue::{Continuation, MacrotaskQueue, MicrotaskQueue, TimerId};
use core_types::{FrameKind, JsError, StackFrame, Value};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, error, trace};

/// Callback that receives errors which escaped every recovery point.
pub type ErrorReporter = Box<dyn FnMut(&RuntimeError)>;

/// The scheduler's position in its turn state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    /// A continuation is on the call stack
    Running,
    /// The microtask queue is being drained
    DrainingMicrotasks,
    /// The next macrotask is being chosen
    SelectingMacrotask,
    /// Nothing left to run
    Idle,
}

/// Counters accumulated over the lifetime of a loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Macrotask turns executed
    pub turns: u64,
    /// Microtasks executed
    pub microtasks_run: u64,
    /// Errors reported as escaping a top-level continuation
    pub uncaught_errors: u64,
    /// Rejections reported as unhandled
    pub unhandled_rejections: u64,
}

struct LoopState {
    config: EventLoopConfig,
    call_stack: CallStack,
    microtasks: MicrotaskQueue,
    macrotasks: MacrotaskQueue,
    clock: u64,
    phase: LoopPhase,
    stats: LoopStats,
    next_promise_id: u64,
    pending_rejections: BTreeMap<u64, JsError>,
}

struct Shared {
    state: RefCell<LoopState>,
    reporter: RefCell<ErrorReporter>,
    driving: Cell<bool>,
}

/// Clears the driving flag when a drive method returns.
struct DriveGuard<'a>(&'a Cell<bool>);

impl Drop for DriveGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// The event loop.
///
/// Each turn of the loop:
/// 1. Drains every microtask, including ones queued while draining
/// 2. Takes the macrotask with the earliest trigger time and runs it
/// 3. Drains microtasks again
///
/// `EventLoop` is a cheap handle: clones share the same queues, so
/// continuations capture a clone to schedule further work. Separate
/// `EventLoop::new()` calls produce fully independent loops.
///
/// # Examples
///
/// ```
/// use async_runtime::{Continuation, EventLoop};
/// use core_types::Value;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let event_loop = EventLoop::new();
/// let log = Rc::new(RefCell::new(Vec::new()));
///
/// let l = log.clone();
/// event_loop.schedule_macrotask(Continuation::new(move || {
///     l.borrow_mut().push("timeout");
///     Ok(Value::Undefined)
/// }), 0);
/// let l = log.clone();
/// event_loop.queue_microtask(move || {
///     l.borrow_mut().push("microtask");
///     Ok(Value::Undefined)
/// });
///
/// event_loop.run_to_quiescence().unwrap();
/// assert_eq!(*log.borrow(), vec!["microtask", "timeout"]);
/// ```
#[derive(Clone)]
pub struct EventLoop {
    shared: Rc<Shared>,
}

impl EventLoop {
    /// Creates a new EventLoop with empty queues and default limits.
    pub fn new() -> Self {
        Self::with_config(EventLoopConfig::default())
    }

    /// Creates a new EventLoop with the given limits.
    pub fn with_config(config: EventLoopConfig) -> Self {
        let state = LoopState {
            call_stack: CallStack::new(config.max_call_depth),
            config,
            microtasks: MicrotaskQueue::new(),
            macrotasks: MacrotaskQueue::new(),
            clock: 0,
            phase: LoopPhase::Idle,
            stats: LoopStats::default(),
            next_promise_id: 0,
            pending_rejections: BTreeMap::new(),
        };
        Self {
            shared: Rc::new(Shared {
                state: RefCell::new(state),
                reporter: RefCell::new(Box::new(default_reporter)),
                driving: Cell::new(false),
            }),
        }
    }

    /// Replaces the error reporter.
    pub fn set_error_reporter<F>(&self, reporter: F)
    where
        F: FnMut(&RuntimeError) + 'static,
    {
        *self.shared.reporter.borrow_mut() = Box::new(reporter);
    }

    /// Builder-style [`set_error_reporter`](Self::set_error_reporter).
    pub fn with_error_reporter<F>(self, reporter: F) -> Self
    where
        F: FnMut(&RuntimeError) + 'static,
    {
        self.set_error_reporter(reporter);
        self
    }

    /// Returns a copy of the active configuration.
    pub fn config(&self) -> EventLoopConfig {
        self.shared.state.borrow().config.clone()
    }

    /// Current phase of the turn state machine.
    pub fn phase(&self) -> LoopPhase {
        self.shared.state.borrow().phase
    }

    /// Current logical time.
    pub fn now(&self) -> u64 {
        self.shared.state.borrow().clock
    }

    /// Counters so far.
    pub fn stats(&self) -> LoopStats {
        self.shared.state.borrow().stats
    }

    /// Number of frames on the call stack.
    pub fn call_depth(&self) -> usize {
        self.shared.state.borrow().call_stack.depth()
    }

    /// Copy of the call stack, innermost frame first.
    pub fn stack_trace(&self) -> Vec<StackFrame> {
        self.shared.state.borrow().call_stack.trace()
    }

    /// Returns true if the macrotask queue is empty.
    pub fn is_task_queue_empty(&self) -> bool {
        self.shared.state.borrow().macrotasks.is_empty()
    }

    /// Returns true if the microtask queue is empty.
    pub fn is_microtask_queue_empty(&self) -> bool {
        self.shared.state.borrow().microtasks.is_empty()
    }

    /// Number of macrotasks waiting to run.
    pub fn pending_macrotasks(&self) -> usize {
        self.shared.state.borrow().macrotasks.len()
    }

    /// Returns true if the call stack and both queues are empty.
    pub fn is_quiescent(&self) -> bool {
        let state = self.shared.state.borrow();
        state.call_stack.is_empty() && state.microtasks.is_empty() && state.macrotasks.is_empty()
    }

    /// Appends a continuation to the microtask queue.
    pub fn schedule_microtask(&self, microtask: Continuation) {
        let mut state = self.shared.state.borrow_mut();
        trace!(name = ?microtask.name(), "microtask queued");
        state.microtasks.enqueue(microtask);
    }

    /// Queues a closure as a microtask (`queueMicrotask`).
    pub fn queue_microtask<F>(&self, f: F)
    where
        F: FnOnce() -> Result<Value, JsError> + 'static,
    {
        self.schedule_microtask(Continuation::new(f).named("queueMicrotask callback"));
    }

    /// Schedules a macrotask to run `delay` logical milliseconds from now.
    ///
    /// Negative delays are treated as zero. A zero delay still runs after the
    /// current synchronous code and after every queued microtask.
    pub fn schedule_macrotask(&self, task: Continuation, delay: i64) -> TimerId {
        let mut state = self.shared.state.borrow_mut();
        let due = state.clock.saturating_add(delay.max(0) as u64);
        let id = state.macrotasks.enqueue(due, task);
        debug!(timer = id.as_u64(), delay, due, "macrotask scheduled");
        id
    }

    /// Adds an I/O-style macrotask that runs in arrival order.
    pub fn enqueue_task(&self, task: Continuation) -> TimerId {
        self.schedule_macrotask(task, 0)
    }

    /// Withdraws a macrotask that has not run yet.
    ///
    /// Returns true if the task was withdrawn. Cancelling a task that already
    /// ran, or was already cancelled, is a no-op that returns false.
    pub fn cancel_macrotask(&self, id: TimerId) -> bool {
        let withdrawn = self.shared.state.borrow_mut().macrotasks.cancel(id);
        debug!(timer = id.as_u64(), withdrawn, "macrotask cancelled");
        withdrawn
    }

    /// Runs a continuation synchronously in a new frame on top of the stack.
    ///
    /// The frame is popped when the body returns. An `Err` is handed back to
    /// the caller, which acts as the recovery point; the stack trace is
    /// captured the first time an error escapes a frame.
    pub fn call(&self, continuation: Continuation) -> Result<Value, JsError> {
        self.run_frame(FrameKind::Call, continuation)
    }

    /// Host entry point: runs `main` as the top-level script, then drives the
    /// loop to quiescence.
    pub fn run(&self, main: Continuation) -> Result<LoopStats, RuntimeError> {
        let _guard = self.begin_drive()?;
        self.run_top_level(FrameKind::Script, main);
        self.drive_to_quiescence()
    }

    /// Drains the microtask queue, including microtasks queued while draining.
    pub fn run_all_microtasks(&self) -> Result<(), RuntimeError> {
        let _guard = self.begin_drive()?;
        self.perform_microtask_checkpoint()?;
        self.settle_phase();
        Ok(())
    }

    /// Processes one complete turn: leftover microtasks, one macrotask, and
    /// the microtasks it produced.
    ///
    /// Returns false if there was no macrotask to run.
    pub fn run_one_turn(&self) -> Result<bool, RuntimeError> {
        let _guard = self.begin_drive()?;
        self.turn()
    }

    fn turn(&self) -> Result<bool, RuntimeError> {
        self.perform_microtask_checkpoint()?;

        let task = {
            let mut state = self.shared.state.borrow_mut();
            state.phase = LoopPhase::SelectingMacrotask;
            if state.macrotasks.is_empty() {
                state.phase = LoopPhase::Idle;
                return Ok(false);
            }
            if let Some(limit) = state.config.max_turns {
                if state.stats.turns >= limit {
                    return Err(RuntimeError::TurnLimitExceeded { limit });
                }
            }
            let Some(task) = state.macrotasks.dequeue() else {
                return Ok(false);
            };
            state.clock = state.clock.max(task.due);
            state.stats.turns += 1;
            debug!(turn = state.stats.turns, clock = state.clock, timer = task.id.as_u64(), "turn started");
            task
        };

        self.run_top_level(FrameKind::Macrotask, task.continuation);
        self.perform_microtask_checkpoint()?;
        self.settle_phase();
        Ok(true)
    }

    /// Drives the loop until the call stack and both queues are empty.
    ///
    /// Rejections still unhandled at that point are reported once each. The
    /// loop is then `Idle`; scheduling more work and calling this again
    /// resumes it.
    pub fn run_to_quiescence(&self) -> Result<LoopStats, RuntimeError> {
        let _guard = self.begin_drive()?;
        self.drive_to_quiescence()
    }

    fn drive_to_quiescence(&self) -> Result<LoopStats, RuntimeError> {
        loop {
            while self.turn()? {}
            self.report_unhandled_rejections();
            if self.is_quiescent() {
                break;
            }
        }
        self.set_phase(LoopPhase::Idle);
        let stats = self.stats();
        debug!(?stats, "event loop idle");
        Ok(stats)
    }

    /// Runs to quiescence and returns the promise's settlement.
    ///
    /// The promise counts as handled, so its rejection is returned here as
    /// [`RuntimeError::RejectedDeferred`] rather than reported.
    pub fn run_until_settled(&self, promise: &Promise) -> Result<Value, RuntimeError> {
        promise.mark_handled();
        self.run_to_quiescence()?;
        match promise.state() {
            PromiseState::Fulfilled(value) => Ok(value),
            PromiseState::Rejected(error) => Err(RuntimeError::RejectedDeferred(error)),
            PromiseState::Pending => Err(RuntimeError::NeverSettled),
        }
    }

    /// Marks the loop as driven until the guard drops. Fails if a
    /// continuation or reporter is already running under a drive.
    fn begin_drive(&self) -> Result<DriveGuard<'_>, RuntimeError> {
        if self.shared.driving.get() || self.call_depth() > 0 {
            return Err(RuntimeError::Reentrant);
        }
        self.shared.driving.set(true);
        Ok(DriveGuard(&self.shared.driving))
    }

    /// Leaves the phase a finished drain or turn ends in.
    fn settle_phase(&self) {
        if self.is_quiescent() {
            self.set_phase(LoopPhase::Idle);
        } else {
            self.set_phase(LoopPhase::SelectingMacrotask);
        }
    }

    fn set_phase(&self, phase: LoopPhase) {
        let mut state = self.shared.state.borrow_mut();
        if state.phase != phase {
            trace!(from = ?state.phase, to = ?phase, "phase change");
            state.phase = phase;
        }
    }

    fn perform_microtask_checkpoint(&self) -> Result<(), RuntimeError> {
        self.set_phase(LoopPhase::DrainingMicrotasks);
        let mut ran = 0usize;
        loop {
            let microtask = {
                let mut state = self.shared.state.borrow_mut();
                if let Some(limit) = state.config.microtask_checkpoint_limit {
                    if ran >= limit && !state.microtasks.is_empty() {
                        return Err(RuntimeError::MicrotaskLimitExceeded { limit });
                    }
                }
                match state.microtasks.dequeue() {
                    Some(microtask) => {
                        state.stats.microtasks_run += 1;
                        microtask
                    }
                    None => break,
                }
            };
            ran += 1;
            self.run_top_level(FrameKind::Microtask, microtask);
            self.set_phase(LoopPhase::DrainingMicrotasks);
        }
        if ran > 0 {
            trace!(ran, "microtask checkpoint complete");
        }
        Ok(())
    }

    /// Runs a continuation with nothing beneath it; an escaping error is
    /// reported instead of propagated.
    fn run_top_level(&self, kind: FrameKind, continuation: Continuation) {
        if let Err(error) = self.run_frame(kind, continuation) {
            self.shared.state.borrow_mut().stats.uncaught_errors += 1;
            self.report(RuntimeError::SynchronousRaise(error));
        }
    }

    pub(crate) fn run_frame(
        &self,
        kind: FrameKind,
        continuation: Continuation,
    ) -> Result<Value, JsError> {
        let previous = {
            let mut state = self.shared.state.borrow_mut();
            let frame = StackFrame::new(continuation.name().map(str::to_owned), kind);
            state.call_stack.push(frame)?;
            std::mem::replace(&mut state.phase, LoopPhase::Running)
        };

        let result = continuation.run();

        let mut state = self.shared.state.borrow_mut();
        let result = result.map_err(|mut error| {
            if error.stack.is_empty() {
                error.stack = state.call_stack.trace();
            }
            error
        });
        state.call_stack.pop();
        state.phase = previous;
        result
    }

    fn report(&self, error: RuntimeError) {
        match self.shared.reporter.try_borrow_mut() {
            Ok(mut reporter) => reporter(&error),
            // The reporter itself raised into the loop; fall back to the log.
            Err(_) => default_reporter(&error),
        }
    }

    fn report_unhandled_rejections(&self) {
        let (rejections, enabled) = {
            let mut state = self.shared.state.borrow_mut();
            let rejections = std::mem::take(&mut state.pending_rejections);
            let enabled = state.config.report_unhandled_rejections;
            if enabled {
                state.stats.unhandled_rejections += rejections.len() as u64;
            }
            (rejections, enabled)
        };
        for (promise_id, error) in rejections {
            if enabled {
                self.report(RuntimeError::UnhandledRejection(error));
            } else {
                debug!(promise = promise_id, %error, "unhandled rejection ignored");
            }
        }
    }

    pub(crate) fn next_promise_id(&self) -> u64 {
        let mut state = self.shared.state.borrow_mut();
        state.next_promise_id += 1;
        state.next_promise_id
    }

    pub(crate) fn track_rejection(&self, promise_id: u64, error: JsError) {
        self.shared
            .state
            .borrow_mut()
            .pending_rejections
            .insert(promise_id, error);
    }

    pub(crate) fn untrack_rejection(&self, promise_id: u64) {
        self.shared
            .state
            .borrow_mut()
            .pending_rejections
            .remove(&promise_id);
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("EventLoop")
            .field("phase", &state.phase)
            .field("clock", &state.clock)
            .field("call_depth", &state.call_stack.depth())
            .field("microtasks", &state.microtasks.len())
            .field("macrotasks", &state.macrotasks.len())
            .finish()
    }
}

fn default_reporter(error: &RuntimeError) {
    match error.js_error() {
        Some(js_error) => error!(trace = %js_error.stack_trace(), "{}", error),
        None => error!("{}", error),
    }
}

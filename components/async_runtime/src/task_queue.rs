//! Continuations and the two queues that hold them.
//!
//! Microtasks are kept in strict FIFO order. Macrotasks are ordered by their
//! logical trigger time, with ties broken by arrival order.

use core_types::{JsError, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;

/// The boxed body of a continuation.
pub type ContinuationFn = Box<dyn FnOnce(Vec<Value>) -> Result<Value, JsError>>;

/// A deferred unit of work: a closure plus the arguments it was scheduled with.
///
/// A continuation is consumed when it runs. Returning `Err` is how its body
/// raises.
///
/// # Examples
///
/// ```
/// use async_runtime::Continuation;
/// use core_types::Value;
///
/// let add = Continuation::with_args(vec![Value::Smi(2), Value::Smi(3)], |args| {
///     match (&args[0], &args[1]) {
///         (Value::Smi(a), Value::Smi(b)) => Ok(Value::Smi(a + b)),
///         _ => Ok(Value::Undefined),
///     }
/// })
/// .named("add");
///
/// assert_eq!(add.name(), Some("add"));
/// assert_eq!(add.run().unwrap(), Value::Smi(5));
/// ```
pub struct Continuation {
    name: Option<String>,
    args: Vec<Value>,
    body: ContinuationFn,
}

impl Continuation {
    /// Creates a continuation that takes no arguments.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<Value, JsError> + 'static,
    {
        Self::with_args(Vec::new(), move |_| f())
    }

    /// Creates a continuation that receives `args` when it runs.
    pub fn with_args<F>(args: Vec<Value>, f: F) -> Self
    where
        F: FnOnce(Vec<Value>) -> Result<Value, JsError> + 'static,
    {
        Self {
            name: None,
            args,
            body: Box::new(f),
        }
    }

    /// Names the frame this continuation runs in.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The frame name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The captured arguments.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Executes the continuation.
    pub fn run(self) -> Result<Value, JsError> {
        (self.body)(self.args)
    }
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation")
            .field("name", &self.name)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

/// A queue for microtasks.
///
/// Microtasks are drained completely between macrotasks.
#[derive(Debug, Default)]
pub struct MicrotaskQueue {
    queue: VecDeque<Continuation>,
}

impl MicrotaskQueue {
    /// Creates a new empty MicrotaskQueue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a microtask to the end of the queue.
    pub fn enqueue(&mut self, microtask: Continuation) {
        self.queue.push_back(microtask);
    }

    /// Removes and returns the next microtask from the queue.
    pub fn dequeue(&mut self) -> Option<Continuation> {
        self.queue.pop_front()
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns the number of microtasks in the queue.
    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

/// Handle to a scheduled macrotask, used for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    /// The raw arrival sequence number.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// A macrotask popped from the queue, ready to run.
#[derive(Debug)]
pub struct ScheduledTask {
    /// The handle it was scheduled under
    pub id: TimerId,
    /// Logical time at which it became runnable
    pub due: u64,
    /// The work itself
    pub continuation: Continuation,
}

/// A queue for macrotasks, ordered by `(trigger time, arrival)`.
#[derive(Debug, Default)]
pub struct MacrotaskQueue {
    entries: BTreeMap<(u64, u64), Continuation>,
    due_by_id: HashMap<u64, u64>,
    next_seq: u64,
}

impl MacrotaskQueue {
    /// Creates a new empty MacrotaskQueue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a macrotask that becomes runnable at logical time `due`.
    pub fn enqueue(&mut self, due: u64, task: Continuation) -> TimerId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert((due, seq), task);
        self.due_by_id.insert(seq, due);
        TimerId(seq)
    }

    /// Removes and returns the macrotask with the earliest trigger time.
    pub fn dequeue(&mut self) -> Option<ScheduledTask> {
        let ((due, seq), continuation) = self.entries.pop_first()?;
        self.due_by_id.remove(&seq);
        Some(ScheduledTask {
            id: TimerId(seq),
            due,
            continuation,
        })
    }

    /// Withdraws a macrotask that has not been dequeued yet.
    ///
    /// Returns false if the handle is unknown, already ran, or was already
    /// cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.due_by_id.remove(&id.0) {
            Some(due) => self.entries.remove(&(due, id.0)).is_some(),
            None => false,
        }
    }

    /// Trigger time of the next macrotask.
    pub fn next_due(&self) -> Option<u64> {
        self.entries.keys().next().map(|(due, _)| *due)
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of macrotasks in the queue.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

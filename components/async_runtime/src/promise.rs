//! Promise implementation.
//!
//! A promise is a single-assignment container for the eventual result of an
//! asynchronous operation. Reactions registered on it always run as
//! microtasks on the owning [`EventLoop`], never inline, even when the
//! promise has already settled.

use crate::event_loop::EventLoop;
use crate::task_queue::Continuation;
use core_types::{FrameKind, JsError, Value};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use tracing::trace;

/// Handler run when the source promise fulfils.
pub type OnFulfilled = Box<dyn FnOnce(Value) -> Result<Value, JsError>>;

/// Handler run when the source promise rejects.
pub type OnRejected = Box<dyn FnOnce(JsError) -> Result<Value, JsError>>;

/// The state of a Promise.
///
/// Once settled (Fulfilled or Rejected), a Promise cannot change state.
#[derive(Debug, Clone, PartialEq)]
pub enum PromiseState {
    /// The initial state; the promise is neither fulfilled nor rejected.
    Pending,
    /// The promise has been fulfilled with a value.
    Fulfilled(Value),
    /// The promise has been rejected with an error.
    Rejected(JsError),
}

#[derive(Clone)]
enum Settlement {
    Fulfilled(Value),
    Rejected(JsError),
}

/// A reaction registered via [`Promise::register`].
///
/// A missing handler passes the settlement through to the chained promise
/// unchanged.
pub struct PromiseReaction {
    on_fulfilled: Option<OnFulfilled>,
    on_rejected: Option<OnRejected>,
    resolve: Resolve,
    reject: Reject,
}

impl PromiseReaction {
    fn run(self, settlement: Settlement) {
        let outcome = match settlement {
            Settlement::Fulfilled(value) => match self.on_fulfilled {
                Some(handler) => handler(value),
                None => Ok(value),
            },
            Settlement::Rejected(error) => match self.on_rejected {
                Some(handler) => handler(error),
                None => Err(error),
            },
        };
        match outcome {
            Ok(value) => self.resolve.call(value),
            Err(error) => self.reject.call(error),
        }
    }
}

impl fmt::Debug for PromiseReaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromiseReaction")
            .field("on_fulfilled", &self.on_fulfilled.is_some())
            .field("on_rejected", &self.on_rejected.is_some())
            .field("chained", &self.resolve.promise.id())
            .finish()
    }
}

struct PromiseInner {
    id: u64,
    state: PromiseState,
    reactions: Vec<PromiseReaction>,
    handled: bool,
}

/// A promise bound to an event loop.
///
/// Cloning a `Promise` clones the handle, not the state.
///
/// # Examples
///
/// ```
/// use async_runtime::{EventLoop, Promise, PromiseState};
/// use core_types::Value;
///
/// let event_loop = EventLoop::new();
/// let promise = Promise::new(&event_loop, |resolve, _reject| {
///     resolve.call(Value::from("The operation was successful!"));
///     Ok(())
/// });
/// let chained = promise.then(|message| Ok(Value::from(format!("got: {}", message))));
///
/// // Settled synchronously, but reactions wait for the microtask checkpoint.
/// assert!(matches!(promise.state(), PromiseState::Fulfilled(_)));
/// assert!(chained.is_pending());
///
/// let value = event_loop.run_until_settled(&chained).unwrap();
/// assert_eq!(value, Value::from("got: The operation was successful!"));
/// ```
#[derive(Clone)]
pub struct Promise {
    inner: Rc<RefCell<PromiseInner>>,
    event_loop: EventLoop,
}

/// Fulfils (or adopts into) the promise it was created for.
///
/// Shares a one-shot flag with its [`Reject`] twin: only the first call to
/// either has any effect.
#[derive(Clone)]
pub struct Resolve {
    promise: Promise,
    already_resolved: Rc<Cell<bool>>,
}

/// Rejects the promise it was created for.
#[derive(Clone)]
pub struct Reject {
    promise: Promise,
    already_resolved: Rc<Cell<bool>>,
}

impl Resolve {
    /// Resolves the promise with `value`.
    ///
    /// If `value` carries another promise, this promise adopts its eventual
    /// state instead of fulfilling with the wrapper.
    pub fn call(&self, value: Value) {
        if self.already_resolved.replace(true) {
            return;
        }
        self.promise.resolve_with(value);
    }
}

impl Reject {
    /// Rejects the promise with `error`.
    pub fn call(&self, error: JsError) {
        if self.already_resolved.replace(true) {
            return;
        }
        self.promise.settle(Settlement::Rejected(error));
    }
}

impl fmt::Debug for Resolve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Resolve {{ promise: {} }}", self.promise.id())
    }
}

impl fmt::Debug for Reject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reject {{ promise: {} }}", self.promise.id())
    }
}

impl Promise {
    /// Creates a promise and runs `executor` synchronously on the call stack.
    ///
    /// If the executor raises before resolving, the promise is rejected with
    /// the raised error.
    pub fn new<F>(event_loop: &EventLoop, executor: F) -> Promise
    where
        F: FnOnce(Resolve, Reject) -> Result<(), JsError> + 'static,
    {
        let promise = Promise::pending(event_loop);
        let (resolve, reject) = promise.resolving_functions();
        let reject_on_raise = reject.clone();
        let body = Continuation::new(move || executor(resolve, reject).map(|()| Value::Undefined))
            .named("Promise executor");
        if let Err(error) = event_loop.run_frame(FrameKind::Executor, body) {
            reject_on_raise.call(error);
        }
        promise
    }

    /// Creates a pending promise along with its settle functions.
    pub fn with_resolvers(event_loop: &EventLoop) -> (Promise, Resolve, Reject) {
        let promise = Promise::pending(event_loop);
        let (resolve, reject) = promise.resolving_functions();
        (promise, resolve, reject)
    }

    /// `Promise.resolve`: returns `value` itself if it already carries a
    /// promise, otherwise a promise resolved with it.
    pub fn resolved(event_loop: &EventLoop, value: Value) -> Promise {
        if let Some(existing) = Promise::from_value(&value) {
            return existing;
        }
        let (promise, resolve, _) = Promise::with_resolvers(event_loop);
        resolve.call(value);
        promise
    }

    /// `Promise.reject`: a promise already rejected with `error`.
    pub fn rejected(event_loop: &EventLoop, error: JsError) -> Promise {
        let (promise, _, reject) = Promise::with_resolvers(event_loop);
        reject.call(error);
        promise
    }

    /// Aggregate wait (`Promise.all`).
    ///
    /// Fulfils with a [`Value::Array`] of results in input order once every
    /// input has fulfilled, or rejects with the first rejection observed.
    pub fn all(event_loop: &EventLoop, promises: Vec<Promise>) -> Promise {
        let (aggregate, resolve, reject) = Promise::with_resolvers(event_loop);
        if promises.is_empty() {
            resolve.call(Value::Array(Vec::new()));
            return aggregate;
        }

        let results = Rc::new(RefCell::new(vec![Value::Undefined; promises.len()]));
        let remaining = Rc::new(Cell::new(promises.len()));
        for (index, promise) in promises.into_iter().enumerate() {
            let results = Rc::clone(&results);
            let remaining = Rc::clone(&remaining);
            let resolve = resolve.clone();
            let reject = reject.clone();
            promise.register(
                Some(Box::new(move |value| {
                    results.borrow_mut()[index] = value;
                    remaining.set(remaining.get() - 1);
                    if remaining.get() == 0 {
                        let values = std::mem::take(&mut *results.borrow_mut());
                        resolve.call(Value::Array(values));
                    }
                    Ok(Value::Undefined)
                })),
                Some(Box::new(move |error| {
                    reject.call(error);
                    Ok(Value::Undefined)
                })),
            );
        }
        aggregate
    }

    /// Recovers a promise carried in a [`Value`].
    pub fn from_value(value: &Value) -> Option<Promise> {
        match value {
            Value::NativeObject(object) => object.borrow().downcast_ref::<Promise>().cloned(),
            _ => None,
        }
    }

    /// Wraps this promise in a [`Value`], e.g. to return it from a reaction so
    /// the chained promise adopts it.
    pub fn into_value(self) -> Value {
        Value::native(self)
    }

    /// Registers reactions and returns the chained promise.
    ///
    /// If this promise has already settled, the matching reaction is queued
    /// as a microtask immediately.
    pub fn register(
        &self,
        on_fulfilled: Option<OnFulfilled>,
        on_rejected: Option<OnRejected>,
    ) -> Promise {
        let chained = Promise::pending(&self.event_loop);
        let (resolve, reject) = chained.resolving_functions();
        self.add_reaction(PromiseReaction {
            on_fulfilled,
            on_rejected,
            resolve,
            reject,
        });
        chained
    }

    /// Registers a fulfilment handler only (`.then(f)`).
    pub fn then<F>(&self, on_fulfilled: F) -> Promise
    where
        F: FnOnce(Value) -> Result<Value, JsError> + 'static,
    {
        self.register(Some(Box::new(on_fulfilled)), None)
    }

    /// Registers a rejection handler only (`.catch(f)`).
    pub fn catch<F>(&self, on_rejected: F) -> Promise
    where
        F: FnOnce(JsError) -> Result<Value, JsError> + 'static,
    {
        self.register(None, Some(Box::new(on_rejected)))
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> PromiseState {
        self.inner.borrow().state.clone()
    }

    /// Returns true while the promise has not settled.
    pub fn is_pending(&self) -> bool {
        matches!(self.inner.borrow().state, PromiseState::Pending)
    }

    /// Identifier unique within the owning event loop.
    pub fn id(&self) -> u64 {
        self.inner.borrow().id
    }

    /// Returns true if both handles refer to the same promise.
    pub fn ptr_eq(&self, other: &Promise) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of reactions waiting for settlement.
    pub fn pending_reactions(&self) -> usize {
        self.inner.borrow().reactions.len()
    }

    /// Marks the promise as observed so its rejection is never reported as
    /// unhandled.
    pub(crate) fn mark_handled(&self) {
        let was_handled = std::mem::replace(&mut self.inner.borrow_mut().handled, true);
        if !was_handled {
            self.event_loop.untrack_rejection(self.id());
        }
    }

    fn pending(event_loop: &EventLoop) -> Promise {
        Promise {
            inner: Rc::new(RefCell::new(PromiseInner {
                id: event_loop.next_promise_id(),
                state: PromiseState::Pending,
                reactions: Vec::new(),
                handled: false,
            })),
            event_loop: event_loop.clone(),
        }
    }

    fn resolving_functions(&self) -> (Resolve, Reject) {
        let already_resolved = Rc::new(Cell::new(false));
        (
            Resolve {
                promise: self.clone(),
                already_resolved: Rc::clone(&already_resolved),
            },
            Reject {
                promise: self.clone(),
                already_resolved,
            },
        )
    }

    fn resolve_with(&self, value: Value) {
        match Promise::from_value(&value) {
            Some(inner) if inner.ptr_eq(self) => {
                self.settle(Settlement::Rejected(JsError::type_error(
                    "Chaining cycle detected for promise",
                )));
            }
            Some(inner) => {
                // Adoption takes its own microtask before the inner
                // promise's reaction is even registered.
                let (resolve, reject) = self.resolving_functions();
                let job = Continuation::new(move || {
                    inner.add_reaction(PromiseReaction {
                        on_fulfilled: None,
                        on_rejected: None,
                        resolve,
                        reject,
                    });
                    Ok(Value::Undefined)
                })
                .named("PromiseResolveThenableJob");
                self.event_loop.schedule_microtask(job);
            }
            None => self.settle(Settlement::Fulfilled(value)),
        }
    }

    fn settle(&self, settlement: Settlement) {
        let (reactions, unhandled) = {
            let mut inner = self.inner.borrow_mut();
            if !matches!(inner.state, PromiseState::Pending) {
                return;
            }
            inner.state = match &settlement {
                Settlement::Fulfilled(value) => PromiseState::Fulfilled(value.clone()),
                Settlement::Rejected(error) => PromiseState::Rejected(error.clone()),
            };
            let unhandled = match &settlement {
                Settlement::Rejected(error) if !inner.handled => Some(error.clone()),
                _ => None,
            };
            (std::mem::take(&mut inner.reactions), unhandled)
        };

        let id = self.id();
        trace!(promise = id, reactions = reactions.len(), "promise settled");
        if let Some(error) = unhandled {
            self.event_loop.track_rejection(id, error);
        }
        for reaction in reactions {
            self.enqueue_reaction_job(reaction, settlement.clone());
        }
    }

    fn add_reaction(&self, reaction: PromiseReaction) {
        let (settlement, untrack) = {
            let mut inner = self.inner.borrow_mut();
            let was_handled = std::mem::replace(&mut inner.handled, true);
            let settled = match &inner.state {
                PromiseState::Pending => None,
                PromiseState::Fulfilled(value) => Some((Settlement::Fulfilled(value.clone()), false)),
                PromiseState::Rejected(error) => {
                    Some((Settlement::Rejected(error.clone()), !was_handled))
                }
            };
            match settled {
                Some(settled) => settled,
                None => {
                    inner.reactions.push(reaction);
                    return;
                }
            }
        };
        if untrack {
            self.event_loop.untrack_rejection(self.id());
        }
        self.enqueue_reaction_job(reaction, settlement);
    }

    fn enqueue_reaction_job(&self, reaction: PromiseReaction, settlement: Settlement) {
        let job = Continuation::new(move || {
            reaction.run(settlement);
            Ok(Value::Undefined)
        })
        .named("PromiseReactionJob");
        self.event_loop.schedule_microtask(job);
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Promise")
            .field("id", &inner.id)
            .field("state", &inner.state)
            .field("reactions", &inner.reactions.len())
            .finish()
    }
}

//! Built-in scenarios
//!
//! Each scenario is a small script whose console output demonstrates one
//! ordering rule of the event loop: synchronous code first, then every
//! microtask, then one macrotask per turn in trigger-time order.

use crate::runtime::Console;
use async_runtime::{host, Continuation, EventLoop, Promise};
use core_types::{JsError, Value};

/// A named script that can be run on a fresh loop.
#[derive(Clone, Copy)]
pub struct Scenario {
    /// Name accepted by `--scenario`
    pub name: &'static str,
    /// One-line summary shown by `--list`
    pub description: &'static str,
    build: fn(&EventLoop, &Console) -> Continuation,
}

impl Scenario {
    /// Builds the top-level script continuation for `event_loop`.
    pub fn script(&self, event_loop: &EventLoop, console: &Console) -> Continuation {
        (self.build)(event_loop, console)
    }
}

/// Every built-in scenario, in `--all` order.
pub const SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "ordering",
        description: "Synchronous code, then promise reactions, then timers",
        build: ordering,
    },
    Scenario {
        name: "zero-delay",
        description: "A zero-delay timer still waits for the current script",
        build: zero_delay,
    },
    Scenario {
        name: "call-stack",
        description: "Nested calls push and pop frames; a caught error keeps its trace",
        build: call_stack,
    },
    Scenario {
        name: "nested-microtasks",
        description: "Microtasks queued while draining run before the next timer",
        build: nested_microtasks,
    },
    Scenario {
        name: "callback-chain",
        description: "Callback-style operations normalised into a promise chain",
        build: callback_chain,
    },
    Scenario {
        name: "promise-all",
        description: "Results are collected in input order, not completion order",
        build: promise_all,
    },
    Scenario {
        name: "rejection",
        description: "Caught rejections, uncaught raises and unhandled rejections",
        build: rejection,
    },
];

/// Finds a built-in scenario by name.
pub fn find(name: &str) -> Option<&'static Scenario> {
    SCENARIOS.iter().find(|s| s.name == name)
}

fn print(console: &Console, line: &'static str) -> impl FnOnce() -> Result<Value, JsError> {
    let console = console.clone();
    move || {
        console.log(line);
        Ok(Value::Undefined)
    }
}

fn ordering(event_loop: &EventLoop, console: &Console) -> Continuation {
    let (el, console) = (event_loop.clone(), console.clone());
    Continuation::new(move || {
        console.log("Start");
        host::set_timeout(&el, 0, print(&console, "Timeout"));
        let on_resolved = print(&console, "Promise");
        Promise::resolved(&el, Value::Undefined).then(move |_| on_resolved());
        console.log("End");
        Ok(Value::Undefined)
    })
    .named("main")
}

fn zero_delay(event_loop: &EventLoop, console: &Console) -> Continuation {
    let (el, console) = (event_loop.clone(), console.clone());
    Continuation::new(move || {
        console.log("1");
        host::set_timeout(&el, 0, print(&console, "2"));
        console.log("3");
        Ok(Value::Undefined)
    })
    .named("main")
}

fn call_stack(event_loop: &EventLoop, console: &Console) -> Continuation {
    let (el, console) = (event_loop.clone(), console.clone());
    Continuation::new(move || {
        let (outer, c) = (el.clone(), console.clone());
        el.call(
            Continuation::new(move || {
                let (inner, c2) = (outer.clone(), c.clone());
                outer.call(
                    Continuation::new(move || {
                        c2.log("Second function called");
                        for frame in inner.stack_trace() {
                            c2.log(format!("  {}", frame));
                        }
                        Ok(Value::Undefined)
                    })
                    .named("second"),
                )?;
                c.log("First function called");
                Ok(Value::Undefined)
            })
            .named("first"),
        )?;

        let broken = Continuation::new(|| Err(JsError::type_error("callback is not a function")))
            .named("broken");
        if let Err(error) = el.call(broken) {
            console.log(format!("Caught {}", error));
            console.log(format!("Stack depth after unwinding: {}", el.call_depth()));
        }
        console.log("End of script");
        Ok(Value::Undefined)
    })
    .named("main")
}

fn nested_microtasks(event_loop: &EventLoop, console: &Console) -> Continuation {
    let (el, console) = (event_loop.clone(), console.clone());
    Continuation::new(move || {
        console.log("script start");
        host::set_timeout(&el, 0, print(&console, "timeout"));

        let (queue, c) = (el.clone(), console.clone());
        el.queue_microtask(move || {
            c.log("microtask 1");
            queue.queue_microtask(print(&c, "microtask 2"));
            Ok(Value::Undefined)
        });
        let on_resolved = print(&console, "promise reaction");
        Promise::resolved(&el, Value::Undefined).then(move |_| on_resolved());

        console.log("script end");
        Ok(Value::Undefined)
    })
    .named("main")
}

fn get_user(event_loop: &EventLoop) -> Promise {
    let timers = event_loop.clone();
    host::from_callback(event_loop, move |done| {
        host::set_timeout(&timers, 1000, move || {
            done(Ok(Value::Array(vec![Value::Smi(1), Value::from("John Doe")])));
            Ok(Value::Undefined)
        });
        Ok(())
    })
}

fn get_orders(event_loop: &EventLoop, console: &Console) -> Promise {
    let (timers, console) = (event_loop.clone(), console.clone());
    host::from_callback(event_loop, move |done| {
        host::set_timeout(&timers, 1000, move || {
            console.log("Orders fetched");
            done(Ok(Value::Array(vec![
                Value::from("Order1"),
                Value::from("Order2"),
            ])));
            Ok(Value::Undefined)
        });
        Ok(())
    })
}

fn callback_chain(event_loop: &EventLoop, console: &Console) -> Continuation {
    let (el, console) = (event_loop.clone(), console.clone());
    Continuation::new(move || {
        console.log("Fetching user...");
        let (orders_loop, c) = (el.clone(), console.clone());
        let c2 = console.clone();
        let c3 = console.clone();
        get_user(&el)
            .then(move |user| {
                c.log("User data fetched");
                c.log(format!("User: {}", user));
                Ok(get_orders(&orders_loop, &c).into_value())
            })
            .then(move |orders| {
                c2.log(format!("Orders: {}", orders));
                Ok(Value::Undefined)
            })
            .catch(move |error| {
                c3.log(format!("Failed: {}", error));
                Ok(Value::Undefined)
            });
        Ok(Value::Undefined)
    })
    .named("main")
}

fn promise_all(event_loop: &EventLoop, console: &Console) -> Continuation {
    let (el, console) = (event_loop.clone(), console.clone());
    Continuation::new(move || {
        let tasks: Vec<Promise> = [("a", 300), ("b", 100), ("c", 200)]
            .into_iter()
            .map(|(name, ms)| {
                let promise = host::delay(&el, ms, Value::from(name));
                let (clock, c) = (el.clone(), console.clone());
                promise.then(move |value| {
                    c.log(format!("{} settled at {}ms", value, clock.now()));
                    Ok(Value::Undefined)
                });
                promise
            })
            .collect();

        let c = console.clone();
        Promise::all(&el, tasks).then(move |results| {
            c.log(format!("All results: {}", results));
            Ok(Value::Undefined)
        });
        Ok(Value::Undefined)
    })
    .named("main")
}

fn rejection(event_loop: &EventLoop, console: &Console) -> Continuation {
    let (el, console) = (event_loop.clone(), console.clone());
    Continuation::new(move || {
        console.log("Starting operation");

        let (c, c2) = (console.clone(), console.clone());
        Promise::new(&el, |_resolve, reject| {
            reject.call(JsError::error("There was an error in the operation."));
            Ok(())
        })
        .then(move |_| {
            c.log("Operation succeeded");
            Ok(Value::Undefined)
        })
        .catch(move |error| {
            c2.log(format!("Caught: {}", error.message));
            Ok(Value::Undefined)
        });

        Promise::rejected(&el, JsError::error("nobody is listening"));

        host::set_timeout(&el, 0, || {
            Err(JsError::type_error("timer callback failed"))
        });
        host::set_timeout(&el, 10, print(&console, "Loop kept running"));
        Ok(Value::Undefined)
    })
    .named("main")
}

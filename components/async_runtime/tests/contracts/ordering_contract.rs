//! Contract tests for the scheduler's ordering guarantees
//!
//! One test per observable guarantee of the event loop and promise protocol.

use async_runtime::{
    host, Continuation, EventLoop, LoopStats, Promise, PromiseState, RuntimeError, TimerId,
};
use core_types::{JsError, Value};
use std::cell::RefCell;
use std::rc::Rc;

type Lines = Rc<RefCell<Vec<&'static str>>>;

fn push(lines: &Lines, line: &'static str) -> impl FnOnce() -> Result<Value, JsError> + 'static {
    let lines = lines.clone();
    move || {
        lines.borrow_mut().push(line);
        Ok(Value::Undefined)
    }
}

#[test]
fn sync_then_microtasks_then_macrotask() {
    let event_loop = EventLoop::new();
    let lines: Lines = Rc::default();

    let el = event_loop.clone();
    let l = lines.clone();
    let main = Continuation::new(move || {
        l.borrow_mut().push("A");
        el.queue_microtask(push(&l, "B"));
        el.schedule_macrotask(Continuation::new(push(&l, "C")), 0);
        l.borrow_mut().push("D");
        Ok(Value::Undefined)
    });
    event_loop.run(main).unwrap();

    assert_eq!(*lines.borrow(), vec!["A", "D", "B", "C"]);
}

#[test]
fn microtask_spawned_by_microtask_beats_every_macrotask() {
    let event_loop = EventLoop::new();
    let lines: Lines = Rc::default();

    for _ in 0..5 {
        event_loop.enqueue_task(Continuation::new(push(&lines, "macro")));
    }
    let el = event_loop.clone();
    let l = lines.clone();
    event_loop.queue_microtask(move || {
        l.borrow_mut().push("micro 1");
        el.queue_microtask(push(&l, "micro 2"));
        Ok(Value::Undefined)
    });
    event_loop.run_to_quiescence().unwrap();

    assert_eq!(
        lines.borrow()[..3].to_vec(),
        vec!["micro 1", "micro 2", "macro"]
    );
    assert_eq!(lines.borrow().len(), 7);
}

#[test]
fn only_the_first_settlement_is_observable() {
    let event_loop = EventLoop::new();
    let observed: Rc<RefCell<Vec<String>>> = Rc::default();

    let promise = Promise::new(&event_loop, |resolve, reject| {
        resolve.call(Value::from("first"));
        reject.call(JsError::error("second"));
        resolve.call(Value::from("third"));
        Ok(())
    });
    let (ok, err) = (observed.clone(), observed.clone());
    promise.register(
        Some(Box::new(move |v| {
            ok.borrow_mut().push(format!("fulfilled {}", v));
            Ok(Value::Undefined)
        })),
        Some(Box::new(move |e| {
            err.borrow_mut().push(format!("rejected {}", e));
            Ok(Value::Undefined)
        })),
    );
    event_loop.run_to_quiescence().unwrap();

    assert_eq!(*observed.borrow(), vec!["fulfilled first".to_string()]);
    assert_eq!(promise.state(), PromiseState::Fulfilled(Value::from("first")));
}

#[test]
fn rejection_passes_through_unhandled_links() {
    let event_loop = EventLoop::new();
    let (d1, _, reject) = Promise::with_resolvers(&event_loop);
    let end = d1
        .then(|_| Ok(Value::from("link 1")))
        .then(|_| Ok(Value::from("link 2")));

    reject.call(JsError::error("E"));

    assert_eq!(
        event_loop.run_until_settled(&end),
        Err(RuntimeError::RejectedDeferred(JsError::error("E")))
    );
}

#[test]
fn all_rejects_with_first_rejection() {
    let event_loop = EventLoop::new();
    let d1 = host::delay(&event_loop, 200, Value::Smi(1));
    let timers = event_loop.clone();
    let d2 = Promise::new(&event_loop, move |_, reject| {
        host::set_timeout(&timers, 100, move || {
            reject.call(JsError::error("D2 failed"));
            Ok(Value::Undefined)
        });
        Ok(())
    });
    let d3 = host::delay(&event_loop, 300, Value::Smi(3));

    let all = Promise::all(&event_loop, vec![d1.clone(), d2, d3.clone()]);

    assert_eq!(
        event_loop.run_until_settled(&all),
        Err(RuntimeError::RejectedDeferred(JsError::error("D2 failed")))
    );
    assert_eq!(d1.state(), PromiseState::Fulfilled(Value::Smi(1)));
    assert_eq!(d3.state(), PromiseState::Fulfilled(Value::Smi(3)));
}

#[test]
fn equal_delays_run_in_scheduling_order() {
    let event_loop = EventLoop::new();
    let lines: Lines = Rc::default();

    host::set_timeout(&event_loop, 25, push(&lines, "A"));
    host::set_timeout(&event_loop, 25, push(&lines, "B"));
    event_loop.run_to_quiescence().unwrap();

    assert_eq!(*lines.borrow(), vec!["A", "B"]);
}

#[test]
fn cancelling_after_run_is_a_no_op() {
    let event_loop = EventLoop::new();
    let lines: Lines = Rc::default();

    let id: TimerId = event_loop.schedule_macrotask(Continuation::new(push(&lines, "ran")), 0);
    event_loop.run_to_quiescence().unwrap();

    assert!(!event_loop.cancel_macrotask(id));
    assert_eq!(*lines.borrow(), vec!["ran"]);
    let stats: LoopStats = event_loop.run_to_quiescence().unwrap();
    assert_eq!(stats.turns, 1);
}

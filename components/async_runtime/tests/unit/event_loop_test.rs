//! Unit tests for EventLoop turn ordering

use crate::support::{collect_reports, Log};
use async_runtime::{Continuation, EventLoop, EventLoopConfig, LoopPhase, Promise, RuntimeError};
use core_types::{JsError, Value};
use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn new_event_loop_is_idle_and_empty() {
    let event_loop = EventLoop::new();
    assert!(event_loop.is_task_queue_empty());
    assert!(event_loop.is_microtask_queue_empty());
    assert_eq!(event_loop.phase(), LoopPhase::Idle);
    assert_eq!(event_loop.now(), 0);
}

#[test]
fn macrotasks_with_equal_delay_run_fifo() {
    let event_loop = EventLoop::new();
    let log = Log::new();

    event_loop.schedule_macrotask(log.task("A"), 10);
    event_loop.schedule_macrotask(log.task("B"), 10);
    event_loop.schedule_macrotask(log.task("C"), 10);
    event_loop.run_to_quiescence().unwrap();

    assert_eq!(log.lines(), vec!["A", "B", "C"]);
}

#[test]
fn earlier_trigger_time_runs_first() {
    let event_loop = EventLoop::new();
    let log = Log::new();

    event_loop.schedule_macrotask(log.task("2000ms"), 2000);
    event_loop.schedule_macrotask(log.task("0ms"), 0);
    event_loop.schedule_macrotask(log.task("1000ms"), 1000);
    event_loop.run_to_quiescence().unwrap();

    assert_eq!(log.lines(), vec!["0ms", "1000ms", "2000ms"]);
    assert_eq!(event_loop.now(), 2000);
}

#[test]
fn delays_are_relative_to_the_clock_at_scheduling_time() {
    let event_loop = EventLoop::new();
    let log = Log::new();

    let el = event_loop.clone();
    let l = log.clone();
    event_loop.schedule_macrotask(
        Continuation::new(move || {
            l.push("outer@100");
            el.schedule_macrotask(l.task("inner@150"), 50);
            Ok(Value::Undefined)
        }),
        100,
    );
    event_loop.schedule_macrotask(log.task("other@200"), 200);
    event_loop.run_to_quiescence().unwrap();

    assert_eq!(log.lines(), vec!["outer@100", "inner@150", "other@200"]);
}

#[test]
fn microtasks_drain_between_macrotasks() {
    let event_loop = EventLoop::new();
    let log = Log::new();

    for name in ["T1", "T2"] {
        let el = event_loop.clone();
        let l = log.clone();
        let micro = format!("{} microtask", name);
        event_loop.enqueue_task(Continuation::new(move || {
            l.push(name);
            el.queue_microtask(l.entry(&micro));
            Ok(Value::Undefined)
        }));
    }
    event_loop.run_to_quiescence().unwrap();

    assert_eq!(
        log.lines(),
        vec!["T1", "T1 microtask", "T2", "T2 microtask"]
    );
    assert_eq!(event_loop.stats().turns, 2);
    assert_eq!(event_loop.stats().microtasks_run, 2);
}

#[test]
fn zero_delay_timer_from_microtask_waits_for_full_drain() {
    let event_loop = EventLoop::new();
    let log = Log::new();

    let el = event_loop.clone();
    let l = log.clone();
    event_loop.queue_microtask(move || {
        el.schedule_macrotask(l.task("timer"), 0);
        el.queue_microtask(l.entry("second microtask"));
        l.push("first microtask");
        Ok(Value::Undefined)
    });
    event_loop.run_to_quiescence().unwrap();

    assert_eq!(
        log.lines(),
        vec!["first microtask", "second microtask", "timer"]
    );
}

#[test]
fn run_one_turn_runs_exactly_one_macrotask() {
    let event_loop = EventLoop::new();
    let log = Log::new();

    event_loop.enqueue_task(log.task("one"));
    event_loop.enqueue_task(log.task("two"));
    event_loop.schedule_microtask(log.task("leftover"));

    assert!(event_loop.run_one_turn().unwrap());
    assert_eq!(log.lines(), vec!["leftover", "one"]);
    assert_eq!(event_loop.pending_macrotasks(), 1);
}

#[test]
fn cancelled_macrotask_never_runs() {
    let event_loop = EventLoop::new();
    let log = Log::new();

    let id = event_loop.schedule_macrotask(log.task("cancelled"), 5);
    event_loop.schedule_macrotask(log.task("kept"), 5);
    assert!(event_loop.cancel_macrotask(id));
    event_loop.run_to_quiescence().unwrap();

    assert_eq!(log.lines(), vec!["kept"]);
}

#[test]
fn macrotask_can_cancel_a_later_sibling() {
    let event_loop = EventLoop::new();
    let log = Log::new();

    let el = event_loop.clone();
    let l = log.clone();
    let victim = std::rc::Rc::new(std::cell::Cell::new(None));
    let v = victim.clone();
    event_loop.enqueue_task(Continuation::new(move || {
        l.push("canceller");
        if let Some(id) = v.get() {
            l.push(&format!("withdrawn={}", el.cancel_macrotask(id)));
        }
        Ok(Value::Undefined)
    }));
    victim.set(Some(event_loop.enqueue_task(log.task("victim"))));
    event_loop.run_to_quiescence().unwrap();

    assert_eq!(log.lines(), vec!["canceller", "withdrawn=true"]);
}

#[test]
fn raise_in_macrotask_is_reported_and_loop_continues() {
    let event_loop = EventLoop::new();
    let reports = collect_reports(&event_loop);
    let log = Log::new();

    event_loop.enqueue_task(Continuation::new(|| Err(JsError::error("timer failed"))));
    event_loop.enqueue_task(log.task("next timer"));
    event_loop.run_to_quiescence().unwrap();

    assert_eq!(log.lines(), vec!["next timer"]);
    assert_eq!(
        *reports.borrow(),
        vec![RuntimeError::SynchronousRaise(JsError::error("timer failed"))]
    );
}

#[test]
fn raise_in_microtask_does_not_stop_the_drain() {
    let event_loop = EventLoop::new();
    let reports = collect_reports(&event_loop);
    let log = Log::new();

    event_loop.queue_microtask(|| Err(JsError::type_error("bad microtask")));
    event_loop.queue_microtask(log.entry("still drained"));
    event_loop.enqueue_task(log.task("macrotask"));
    event_loop.run_to_quiescence().unwrap();

    assert_eq!(log.lines(), vec!["still drained", "macrotask"]);
    assert_eq!(reports.borrow().len(), 1);
}

#[test]
fn idle_loop_resumes_after_new_work() {
    let event_loop = EventLoop::new();
    let log = Log::new();

    event_loop.enqueue_task(log.task("first run"));
    event_loop.run_to_quiescence().unwrap();
    assert_eq!(event_loop.phase(), LoopPhase::Idle);

    event_loop.schedule_macrotask(log.task("injected"), 30);
    let stats = event_loop.run_to_quiescence().unwrap();

    assert_eq!(log.lines(), vec!["first run", "injected"]);
    assert_eq!(stats.turns, 2);
    assert_eq!(event_loop.now(), 30);
}

#[test]
fn independent_loops_do_not_share_queues() {
    let a = EventLoop::new();
    let b = EventLoop::new();
    let log = Log::new();

    a.enqueue_task(log.task("a"));
    b.enqueue_task(log.task("b"));
    b.run_to_quiescence().unwrap();

    assert_eq!(log.lines(), vec!["b"]);
    assert_eq!(a.pending_macrotasks(), 1);
}

fn reschedule_forever(event_loop: EventLoop) -> Continuation {
    Continuation::new(move || {
        let next = reschedule_forever(event_loop.clone());
        event_loop.schedule_macrotask(next, 1);
        Ok(Value::Undefined)
    })
}

#[test]
fn turn_limit_stops_runaway_timers() {
    let event_loop = EventLoop::with_config(EventLoopConfig::default().with_max_turns(3));
    event_loop.enqueue_task(reschedule_forever(event_loop.clone()));

    let result = event_loop.run_to_quiescence();

    assert_eq!(result, Err(RuntimeError::TurnLimitExceeded { limit: 3 }));
    assert_eq!(event_loop.stats().turns, 3);
    assert_eq!(event_loop.pending_macrotasks(), 1);

    assert_eq!(
        event_loop.run_to_quiescence(),
        Err(RuntimeError::TurnLimitExceeded { limit: 3 })
    );
}

fn spin(event_loop: EventLoop) -> Continuation {
    Continuation::new(move || {
        event_loop.schedule_microtask(spin(event_loop.clone()));
        Ok(Value::Undefined)
    })
}

#[test]
fn microtask_limit_stops_livelock() {
    let config = EventLoopConfig::default().with_microtask_checkpoint_limit(100);
    let event_loop = EventLoop::with_config(config);
    event_loop.schedule_microtask(spin(event_loop.clone()));

    let result = event_loop.run_to_quiescence();

    assert_eq!(
        result,
        Err(RuntimeError::MicrotaskLimitExceeded { limit: 100 })
    );
    assert_eq!(event_loop.stats().microtasks_run, 100);
}

#[test]
fn continuation_args_reach_the_body() {
    let event_loop = EventLoop::new();
    let log = Log::new();

    let l = log.clone();
    event_loop.enqueue_task(Continuation::with_args(
        vec![Value::from("Order1"), Value::from("Order2")],
        move |args| {
            l.push(&Value::Array(args).to_string());
            Ok(Value::Undefined)
        },
    ));
    event_loop.run_to_quiescence().unwrap();

    assert_eq!(log.lines(), vec!["Order1,Order2"]);
}

#[test]
fn host_side_frames_leave_the_loop_idle() {
    let event_loop = EventLoop::new();

    let _promise = Promise::new(&event_loop, |resolve, _reject| {
        resolve.call(Value::Smi(1));
        Ok(())
    });
    assert_eq!(event_loop.call_depth(), 0);
    assert_eq!(event_loop.phase(), LoopPhase::Idle);

    event_loop
        .call(Continuation::new(|| Ok(Value::Undefined)).named("helper"))
        .unwrap();
    assert_eq!(event_loop.call_depth(), 0);
    assert_eq!(event_loop.phase(), LoopPhase::Idle);

    let _ = event_loop.call(Continuation::new(|| Err(JsError::error("caught by host"))));
    assert_eq!(event_loop.phase(), LoopPhase::Idle);
}

#[test]
fn finished_turn_selects_next_macrotask_or_idles() {
    let event_loop = EventLoop::new();
    let log = Log::new();
    event_loop.enqueue_task(log.task("first"));
    event_loop.enqueue_task(log.task("second"));

    assert!(event_loop.run_one_turn().unwrap());
    assert_eq!(event_loop.phase(), LoopPhase::SelectingMacrotask);

    assert!(event_loop.run_one_turn().unwrap());
    assert!(event_loop.is_quiescent());
    assert_eq!(event_loop.phase(), LoopPhase::Idle);

    assert!(!event_loop.run_one_turn().unwrap());
    assert_eq!(event_loop.phase(), LoopPhase::Idle);
}

#[test]
fn drained_microtasks_move_on_to_selection() {
    let event_loop = EventLoop::new();
    let log = Log::new();
    event_loop.queue_microtask(log.entry("microtask"));
    event_loop.enqueue_task(log.task("macrotask"));

    event_loop.run_all_microtasks().unwrap();

    assert_eq!(log.lines(), vec!["microtask"]);
    assert_eq!(event_loop.phase(), LoopPhase::SelectingMacrotask);
}

#[test]
fn nested_call_keeps_outer_frame_running() {
    let event_loop = EventLoop::new();
    let inner = event_loop.clone();
    let seen = Rc::new(RefCell::new(None));
    let s = seen.clone();

    event_loop.enqueue_task(Continuation::new(move || {
        inner.call(Continuation::new(|| Ok(Value::Undefined)))?;
        *s.borrow_mut() = Some(inner.phase());
        Ok(Value::Undefined)
    }));
    event_loop.run_to_quiescence().unwrap();

    assert_eq!(*seen.borrow(), Some(LoopPhase::Running));
}

#[test]
fn reporter_cannot_drive_the_loop() {
    let event_loop = EventLoop::new();
    let inner = event_loop.clone();
    let nested = Rc::new(RefCell::new(Vec::new()));
    let sink = nested.clone();
    event_loop.set_error_reporter(move |_| {
        sink.borrow_mut()
            .push(inner.run_to_quiescence().map(|stats| stats.turns));
    });
    let log = Log::new();

    event_loop.enqueue_task(Continuation::new(|| Err(JsError::error("first timer"))));
    event_loop.enqueue_task(log.task("second timer"));
    event_loop.run_to_quiescence().unwrap();

    assert_eq!(*nested.borrow(), vec![Err(RuntimeError::Reentrant)]);
    assert_eq!(log.lines(), vec!["second timer"]);
    assert_eq!(event_loop.stats().turns, 2);
}

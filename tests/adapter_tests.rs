//! Integration tests for the promise-to-coroutine adapter.
//!
//! Every coroutine here is driven by [`common::TickDriver`], which resumes it
//! only when its last step is ready, the way a cooperative scheduler does.

mod common;

use std::cell::Cell;
use std::rc::Rc;

use common::{capture_logs, init_test_logging, CallLog, TickDriver};
use stepsync::prelude::*;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
#[error("boom: {0}")]
struct Boom(&'static str);

fn boom(tag: &'static str) -> Error {
    Error::faulted(Boom(tag))
}

fn fault_tag(error: &Error) -> Option<&'static str> {
    error
        .as_fault()
        .and_then(|fault| fault.downcast_ref::<Boom>())
        .map(|boom| boom.0)
}

// ============================================================================
// Propagating channel
// ============================================================================

#[test]
fn test_success_invokes_continuation_once_then_completes() {
    init_test_logging();
    let (resolver, promise) = Promise::channel();
    let calls = Rc::new(Cell::new(0));
    let seen = Rc::new(Cell::new(0));
    let (calls2, seen2) = (Rc::clone(&calls), Rc::clone(&seen));

    let mut driver = TickDriver::new(promise.then(move |v: i32| {
        calls2.set(calls2.get() + 1);
        seen2.set(v);
        Ok(())
    }));

    assert!(driver.tick());
    assert_eq!(driver.run_ticks(5), 0);
    assert_eq!(calls.get(), 0);

    resolver.succeed(42);
    assert!(driver.tick());

    assert!(matches!(driver.finished(), Some(Ok(()))));
    assert_eq!(calls.get(), 1);
    assert_eq!(seen.get(), 42);
    assert_eq!(driver.run_ticks(3), 0);
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_cancelled_source_terminates_abnormally() {
    init_test_logging();
    let (resolver, promise) = Promise::<i32>::channel();
    let log = CallLog::new();
    let rest = ContinuationList::new().with(log.recorder::<i32>("rest"));

    let mut coroutine = promise.then_all(log.recorder::<i32>("first"), rest);
    let mut driver = TickDriver::new(&mut coroutine);
    driver.tick();

    resolver.cancel();
    driver.tick();

    let err = driver.finished().unwrap().as_ref().unwrap_err();
    assert!(matches!(err, Error::Cancelled(id) if *id == promise.id()));
    assert!(log.entries().is_empty());
    assert_eq!(coroutine.state(), CoroutineState::Failed);
}

#[test]
fn test_faulted_source_forwards_error_unmodified() {
    let original = boom("source");
    let promise = Promise::<i32>::faulted(original.clone());
    let log = CallLog::new();

    let mut driver = TickDriver::new(promise.then(log.recorder::<i32>("first")));
    driver.run_ticks(2);

    let err = driver.finished().unwrap().as_ref().unwrap_err();
    assert!(err.is_same_fault(&original));
    assert!(log.entries().is_empty());
}

#[test]
fn test_fault_without_error_uses_incomplete_failure() {
    let (resolver, promise) = Promise::<()>::channel();
    resolver.fault_without_error();

    let mut driver = TickDriver::new(promise.then(|()| Ok(())));
    driver.run_ticks(2);

    let err = driver.finished().unwrap().as_ref().unwrap_err();
    assert!(matches!(err, Error::IncompleteFailure(id) if *id == promise.id()));
    assert_eq!(err.kind(), ErrorKind::Faulted);
}

#[test]
fn test_list_runs_in_insertion_order_after_first() {
    init_test_logging();
    let log = CallLog::new();
    let rest = ContinuationList::new()
        .with(log.recorder::<i32>("b"))
        .with(log.recorder::<i32>("c"))
        .with(log.recorder::<i32>("d"));

    let mut driver = TickDriver::new(Promise::succeeded(7).then_all(log.recorder::<i32>("a"), rest));
    driver.run_ticks(2);

    assert!(matches!(driver.finished(), Some(Ok(()))));
    assert_eq!(log.entries(), vec!["a:7", "b:7", "c:7", "d:7"]);
}

#[test]
fn test_empty_slot_stops_list_at_its_position() {
    let log = CallLog::new();
    let mut rest = ContinuationList::new();
    rest.push(log.recorder::<i32>("b"));
    rest.push_slot(None);
    rest.push(log.recorder::<i32>("d"));

    let mut driver = TickDriver::new(Promise::succeeded(1).then_all(log.recorder::<i32>("a"), rest));
    driver.run_ticks(2);

    let err = driver.finished().unwrap().as_ref().unwrap_err();
    assert!(matches!(err, Error::EmptyContinuation { index: 1, len: 3, .. }));
    assert!(err.to_string().contains("continuations of coroutine on Promise("));
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(log.entries(), vec!["a:1", "b:1"]);
}

#[test]
fn test_plain_continuation_error_propagates_without_sink() {
    let log = CallLog::new();
    let rest = ContinuationList::new().with(log.recorder::<i32>("after"));

    let mut driver = TickDriver::new(
        Promise::succeeded(3).then_all(|_| Err(boom("continuation")), rest),
    );
    driver.run_ticks(2);

    let err = driver.finished().unwrap().as_ref().unwrap_err();
    assert_eq!(fault_tag(err), Some("continuation"));
    assert!(log.entries().is_empty());
}

#[test]
fn test_void_source_with_zero_argument_continuations() {
    let (resolver, promise) = Promise::<()>::channel();
    let count = Rc::new(Cell::new(0));
    let (a, b) = (Rc::clone(&count), Rc::clone(&count));

    let rest = ContinuationList::new().with(move |()| {
        b.set(b.get() * 10);
        Ok(())
    });
    let mut driver = TickDriver::new(promise.then_all(
        move |()| {
            a.set(a.get() + 1);
            Ok(())
        },
        rest,
    ));

    driver.tick();
    resolver.succeed(());
    driver.tick();

    assert!(matches!(driver.finished(), Some(Ok(()))));
    assert_eq!(count.get(), 10);
}

// ============================================================================
// Completion channel
// ============================================================================

#[test]
fn test_plain_continuation_publishes_value() {
    let (resolver, promise) = Promise::channel();
    let sink = CompletionSource::new();

    let mut driver = TickDriver::new(
        promise.then_complete(Continuation::value(|v: u64| Ok(v.to_string())), sink.clone()),
    );
    driver.tick();
    assert!(!sink.is_completed());

    resolver.succeed(99);
    driver.tick();

    assert!(matches!(driver.finished(), Some(Ok(()))));
    assert_eq!(sink.outcome().unwrap().unwrap(), "99");
}

#[test]
fn test_plain_continuation_error_goes_to_sink_and_sequence_ends_normally() {
    init_test_logging();
    let sink = CompletionSource::<i32>::new();
    let mut coroutine = Promise::succeeded(3).then_complete(
        Continuation::value(|_: i32| Err(boom("continuation"))),
        sink.clone(),
    );

    let mut driver = TickDriver::new(&mut coroutine);
    driver.run_ticks(2);

    assert!(matches!(driver.finished(), Some(Ok(()))));
    let err = sink.outcome().unwrap().unwrap_err();
    assert_eq!(fault_tag(&err), Some("continuation"));
    assert_eq!(coroutine.state(), CoroutineState::Failed);
}

#[test]
fn test_source_failure_goes_to_sink() {
    let (resolver, promise) = Promise::<i32>::channel();
    let sink = CompletionSource::<i32>::new();
    let invoked = Rc::new(Cell::new(false));
    let flag = Rc::clone(&invoked);

    let mut driver = TickDriver::new(promise.then_complete(
        Continuation::value(move |v: i32| {
            flag.set(true);
            Ok(v)
        }),
        sink.clone(),
    ));
    driver.tick();
    resolver.cancel();
    driver.tick();

    assert!(matches!(driver.finished(), Some(Ok(()))));
    assert!(!invoked.get());
    let err = sink.outcome().unwrap().unwrap_err();
    assert!(matches!(err, Error::Cancelled(id) if id == promise.id()));
}

#[test]
fn test_chained_continuation_waits_on_derived_promise() {
    init_test_logging();
    let (source_resolver, source) = Promise::channel();
    let (derived_resolver, derived) = Promise::channel();
    let derived_id = derived.id();
    let sink = CompletionSource::new();

    let mut coroutine = source.then_complete(
        Continuation::chain(move |path: String| {
            assert_eq!(path, "level.bin");
            Ok(derived)
        }),
        sink.clone(),
    );
    let mut driver = TickDriver::new(&mut coroutine);

    driver.tick();
    source_resolver.succeed("level.bin".to_string());
    driver.tick();

    assert_eq!(driver.waiting_on().unwrap().promise_id(), derived_id);
    assert_eq!(driver.run_ticks(4), 0);
    assert!(!sink.is_completed());

    derived_resolver.succeed(vec![0_u8, 1, 2]);
    driver.tick();

    assert!(matches!(driver.finished(), Some(Ok(()))));
    assert_eq!(sink.outcome().unwrap().unwrap(), vec![0, 1, 2]);
    assert_eq!(driver.resumes(), 3);
    drop(driver);
    assert_eq!(coroutine.state(), CoroutineState::Completed);
}

#[test]
fn test_derived_fault_is_written_once_as_error() {
    let (derived_resolver, derived) = Promise::<i32>::channel();
    let sink = CompletionSource::new();
    let original = boom("derived");

    let mut driver = TickDriver::new(
        Promise::succeeded(()).then_complete(Continuation::chain(move |()| Ok(derived)), sink.clone()),
    );
    driver.run_ticks(2);

    derived_resolver.fault(original.clone());
    driver.run_ticks(2);

    assert!(matches!(driver.finished(), Some(Ok(()))));
    let err = sink.outcome().unwrap().unwrap_err();
    assert!(err.is_same_fault(&original));
    // Nobody else can overwrite it, and no success was ever written.
    assert!(matches!(sink.set_result(1), Err(Error::AlreadyCompleted(_))));
    assert!(sink.outcome().unwrap().is_err());
}

#[test]
fn test_derived_cancellation_is_written_as_error() {
    let (derived_resolver, derived) = Promise::<i32>::channel();
    let derived_id = derived.id();
    let sink = CompletionSource::new();

    let mut driver = TickDriver::new(
        Promise::succeeded(1).then_complete(Continuation::chain(move |_: i32| Ok(derived)), sink.clone()),
    );
    driver.run_ticks(2);
    derived_resolver.cancel();
    driver.run_ticks(1);

    let err = sink.outcome().unwrap().unwrap_err();
    assert!(matches!(err, Error::Cancelled(id) if id == derived_id));
}

#[test]
fn test_chained_continuation_failing_synchronously_skips_derived_wait() {
    let sink = CompletionSource::<i32>::new();
    let mut driver = TickDriver::new(Promise::succeeded(-1).then_complete(
        Continuation::chain(|v: i32| {
            if v < 0 {
                return Err(Error::InvalidArgument("count"));
            }
            Ok(Promise::succeeded(v))
        }),
        sink.clone(),
    ));
    driver.run_ticks(2);

    assert!(matches!(driver.finished(), Some(Ok(()))));
    assert_eq!(driver.resumes(), 2);
    assert!(matches!(
        sink.outcome().unwrap(),
        Err(Error::InvalidArgument("count"))
    ));
}

#[test]
fn test_void_derived_promise_publishes_unit() {
    let (derived_resolver, derived) = Promise::<()>::channel();
    let sink = CompletionSource::<()>::new();

    let mut driver = TickDriver::new(
        Promise::succeeded(5).then_complete(Continuation::chain(move |_: i32| Ok(derived)), sink.clone()),
    );
    driver.run_ticks(2);
    derived_resolver.succeed(());
    driver.run_ticks(1);

    assert!(matches!(sink.outcome(), Some(Ok(()))));
}

#[test]
fn test_zero_argument_continuation_on_value_source() {
    let sink = CompletionSource::new();
    let mut driver = TickDriver::new(
        Promise::succeeded("ignored").then_complete(Continuation::value(|_: &str| Ok(17_u8)), sink.clone()),
    );
    driver.run_ticks(2);

    assert_eq!(sink.outcome().unwrap().unwrap(), 17);
}

#[test]
fn test_sink_is_awaitable_from_async_code() {
    let (resolver, promise) = Promise::channel();
    let sink = CompletionSource::new();
    let published = sink.promise();

    let mut driver = TickDriver::new(
        promise.then_complete(Continuation::value(|v: i32| Ok(v + 1)), sink),
    );
    driver.tick();
    resolver.succeed(1);
    driver.tick();

    assert_eq!(futures::executor::block_on(published).unwrap(), 2);
}

#[test]
fn test_refused_write_traces_failed_transition_only() {
    let sink = CompletionSource::<i32>::new();
    sink.set_result(1).unwrap();

    let logs = capture_logs(|| {
        let mut driver = TickDriver::new(
            Promise::succeeded(2).then_complete(Continuation::value(|v: i32| Ok(v * 10)), sink.clone()),
        );
        driver.run_ticks(2);
        assert!(matches!(driver.finished(), Some(Err(Error::AlreadyCompleted(_)))));
    });

    assert!(logs.contains("to=Failed"));
    assert!(!logs.contains("to=Completed"));
    assert_eq!(sink.outcome().unwrap().unwrap(), 1);
}

#[test]
fn test_accepted_write_traces_completed_transition() {
    let sink = CompletionSource::<i32>::new();

    let logs = capture_logs(|| {
        let mut driver = TickDriver::new(
            Promise::succeeded(2).then_complete(Continuation::value(|v: i32| Ok(v * 10)), sink.clone()),
        );
        driver.run_ticks(2);
        assert!(matches!(driver.finished(), Some(Ok(()))));
    });

    assert!(logs.contains("to=Completed"));
    assert!(!logs.contains("to=Failed"));
    assert_eq!(sink.outcome().unwrap().unwrap(), 20);
}

#[test]
fn test_refused_error_write_is_not_logged_as_fault() {
    let sink = CompletionSource::<i32>::new();

    let logs = capture_logs(|| {
        sink.set_error(boom("first")).unwrap();
        assert!(matches!(sink.set_error(boom("second")), Err(Error::AlreadyCompleted(_))));
    });

    assert_eq!(logs.matches("completion source faulted").count(), 1);
    assert!(logs.contains("boom: first"));
    assert!(!logs.contains("boom: second"));
}

// ============================================================================
// Async driving
// ============================================================================

#[test]
fn test_drive_awaits_each_step() {
    let (resolver, promise) = Promise::channel();
    let (derived_resolver, derived) = Promise::channel();
    let sink = CompletionSource::new();

    let coroutine = promise.then_complete(
        Continuation::chain(move |v: i32| {
            derived_resolver.succeed(v * 3);
            Ok(derived)
        }),
        sink.clone(),
    );

    let handle = std::thread::spawn(move || {
        std::thread::sleep(std::time::Duration::from_millis(10));
        resolver.succeed(2);
    });

    futures::executor::block_on(coroutine.drive()).unwrap();
    handle.join().unwrap();
    assert_eq!(sink.outcome().unwrap().unwrap(), 6);
}

#[test]
fn test_drive_returns_propagated_error() {
    let coroutine = Promise::<i32>::cancelled().then(|_| Ok(()));
    let err = futures::executor::block_on(coroutine.drive()).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Cancelled);
}

// ============================================================================
// Builder
// ============================================================================

#[test]
fn test_builder_dispatch_variant() {
    let log = CallLog::new();
    let coroutine = CoroutineBuilder::<char, ()>::new()
        .name("boot")
        .source(Promise::succeeded('x'))
        .then(log.recorder::<char>("first"))
        .then_all(ContinuationList::new().with(log.recorder::<char>("second")))
        .build()
        .unwrap();

    assert_eq!(coroutine.label(), "boot");
    let mut driver = TickDriver::new(coroutine);
    driver.run_ticks(2);

    assert!(matches!(driver.finished(), Some(Ok(()))));
    assert_eq!(log.entries(), vec!["first:'x'", "second:'x'"]);
}

//! Example: Driving adapters from a scheduler tick loop
//!
//! This example shows a minimal cooperative scheduler that resumes each
//! coroutine once per tick, and only when the step it last yielded is ready.

use std::cell::RefCell;
use std::rc::Rc;

use stepsync::prelude::*;

fn main() {
    println!("🧰 stepsync - Tick Loop Examples\n");

    example_chained_completion();
    example_continuation_list();
    example_cancelled_source();

    println!("\n✅ All tick loop examples completed!");
}

/// Runs `coroutine` for at most `ticks` ticks, settling promises through
/// `on_tick` as the loop goes.
fn run_ticks<T, R>(
    mut coroutine: Coroutine<T, R>,
    ticks: usize,
    mut on_tick: impl FnMut(usize),
) -> Option<stepsync::Result<()>>
where
    T: Clone + Send + 'static,
    R: Clone + Send + 'static,
{
    let mut waiting_on: Option<WaitableStep> = None;

    for tick in 0..ticks {
        on_tick(tick);

        if waiting_on.as_ref().is_some_and(WaitableStep::keep_waiting) {
            println!("   tick {tick}: still waiting ({})", coroutine.state());
            continue;
        }

        match coroutine.next() {
            Some(Ok(step)) => {
                println!("   tick {tick}: suspended on {step:?}");
                waiting_on = Some(step);
            }
            Some(Err(error)) => {
                println!("   tick {tick}: ended with error: {error}");
                return Some(Err(error));
            }
            None => {
                println!("   tick {tick}: finished ({})", coroutine.state());
                return Some(Ok(()));
            }
        }
    }
    None
}

/// A continuation that starts a second asynchronous operation
fn example_chained_completion() {
    println!("📌 Example 1: Chained completion");
    println!("   Load an id, then fetch a record for it, publishing into a sink\n");

    let (load_resolver, load) = Promise::<u32>::channel();
    let (fetch_resolver, fetch) = Promise::<String>::channel();
    let sink = CompletionSource::<String>::new();

    let coroutine = CoroutineBuilder::new()
        .name("load-then-fetch")
        .source(load)
        .complete_into(
            Continuation::chain(move |id: u32| {
                println!("   continuation: fetching record {id}");
                Ok(fetch)
            }),
            sink.clone(),
        )
        .build()
        .expect("source and continuation are set");

    let ended = run_ticks(coroutine, 8, |tick| match tick {
        2 => {
            load_resolver.succeed(42);
        }
        5 => {
            fetch_resolver.succeed("record #42".to_owned());
        }
        _ => {}
    });

    println!("   sequence: {ended:?}");
    println!("   sink: {:?}\n", sink.outcome());
}

/// Several continuations observing one value
fn example_continuation_list() {
    println!("📌 Example 2: Continuation list");
    println!("   Continuations run in insertion order after the first one\n");

    let (resolver, promise) = Promise::<i32>::channel();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let (a, b) = (Rc::clone(&seen), Rc::clone(&seen));

    let rest = ContinuationList::new()
        .named("observers")
        .with(move |v: i32| {
            a.borrow_mut().push(format!("double:{}", v * 2));
            Ok(())
        })
        .with(move |v: i32| {
            b.borrow_mut().push(format!("negate:{}", -v));
            Ok(())
        });
    let first = Rc::clone(&seen);
    let coroutine = promise.then_all(
        move |v: i32| {
            first.borrow_mut().push(format!("first:{v}"));
            Ok(())
        },
        rest,
    );

    let ended = run_ticks(coroutine, 4, |tick| {
        if tick == 1 {
            resolver.succeed(7);
        }
    });

    println!("   sequence: {ended:?}");
    println!("   continuations: {:?}\n", seen.borrow());
}

/// A cancelled source ends the sequence without running anything
fn example_cancelled_source() {
    println!("📌 Example 3: Cancelled source");
    println!("   The propagating adapter surfaces the cancellation to the scheduler\n");

    let (resolver, promise) = Promise::<i32>::channel();
    let coroutine = promise.then(|v: i32| {
        println!("   never printed: {v}");
        Ok(())
    });

    let ended = run_ticks(coroutine, 4, |tick| {
        if tick == 1 {
            resolver.cancel();
        }
    });

    println!("   sequence: {ended:?}");
}

//! The promise-to-coroutine state machine.

use std::fmt;
use std::iter::FusedIterator;
use std::mem;

use tracing::{debug, trace};

use crate::coroutine::continuation::{Continuation, Continued};
use crate::coroutine::WaitableStep;
use crate::dispatch::{Action, ContinuationList};
use crate::error::Result;
use crate::promise::{CompletionSource, Promise};

/// Where a coroutine is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoroutineState {
    /// Not resumed yet.
    Created,
    /// Suspended on the source promise.
    WaitingOnSource,
    /// The source succeeded; continuations are about to run.
    ///
    /// Only seen in logs: the coroutine never suspends here.
    SourceReady,
    /// Continuations are running.
    ///
    /// Only seen in logs: the coroutine never suspends here.
    InvokingContinuation,
    /// Suspended on the promise returned by a chained continuation.
    WaitingOnDerivedFuture,
    /// Finished normally.
    Completed,
    /// Finished with a failure.
    Failed,
}

impl CoroutineState {
    /// Returns true for `Completed` and `Failed`.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self, CoroutineState::Completed | CoroutineState::Failed)
    }
}

impl fmt::Display for CoroutineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoroutineState::Created => write!(f, "Created"),
            CoroutineState::WaitingOnSource => write!(f, "WaitingOnSource"),
            CoroutineState::SourceReady => write!(f, "SourceReady"),
            CoroutineState::InvokingContinuation => write!(f, "InvokingContinuation"),
            CoroutineState::WaitingOnDerivedFuture => write!(f, "WaitingOnDerivedFuture"),
            CoroutineState::Completed => write!(f, "Completed"),
            CoroutineState::Failed => write!(f, "Failed"),
        }
    }
}

/// What happens once the source promise is terminal.
///
/// The two arms are two failure channels and must stay distinct: `Dispatch`
/// reports failures by ending the step sequence with an error, `Complete`
/// writes them into the completion source and ends normally.
pub(crate) enum Reaction<T, R> {
    Dispatch {
        first: Action<T>,
        rest: ContinuationList<T>,
    },
    Complete {
        continuation: Continuation<T, R>,
        sink: CompletionSource<R>,
    },
}

enum Stage<T, R> {
    Created {
        source: Promise<T>,
        reaction: Reaction<T, R>,
    },
    WaitingOnSource {
        source: Promise<T>,
        reaction: Reaction<T, R>,
    },
    WaitingOnDerived {
        derived: Promise<R>,
        sink: CompletionSource<R>,
    },
    Completed,
    Failed,
}

impl<T, R> Stage<T, R> {
    fn state(&self) -> CoroutineState {
        match self {
            Stage::Created { .. } => CoroutineState::Created,
            Stage::WaitingOnSource { .. } => CoroutineState::WaitingOnSource,
            Stage::WaitingOnDerived { .. } => CoroutineState::WaitingOnDerivedFuture,
            Stage::Completed => CoroutineState::Completed,
            Stage::Failed => CoroutineState::Failed,
        }
    }
}

/// A lazy, single-shot sequence of suspension steps that runs continuations
/// once a promise is terminal.
///
/// Each call to [`resume`] (or [`Iterator::next`]) advances the state machine
/// by one scheduler tick:
///
/// - `Some(Ok(step))` suspends; resume again once [`WaitableStep::is_ready`].
/// - `Some(Err(error))` ends the sequence abnormally.
/// - `None` ends the sequence normally.
///
/// Coroutines built with [`Promise::then`] or [`Promise::then_all`] report
/// every failure through `Some(Err(_))`. Coroutines built with
/// [`Promise::then_complete`] write every failure into their
/// [`CompletionSource`] instead and end normally; callers learn about the
/// failure from the completion source only.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use stepsync::promise::Promise;
///
/// let (resolver, promise) = Promise::channel();
/// let seen = Rc::new(Cell::new(0));
/// let sink = Rc::clone(&seen);
///
/// let mut coroutine = promise.then(move |v: i32| {
///     sink.set(v);
///     Ok(())
/// });
///
/// // First tick: suspend on the source.
/// let step = coroutine.next().unwrap().unwrap();
/// assert!(step.keep_waiting());
///
/// resolver.succeed(3);
/// assert!(step.is_ready());
///
/// // Next tick: run the continuation and finish.
/// assert!(coroutine.next().is_none());
/// assert_eq!(seen.get(), 3);
/// ```
///
/// [`resume`]: Coroutine::resume
pub struct Coroutine<T, R = ()> {
    label: String,
    stage: Stage<T, R>,
}

impl<T, R> Coroutine<T, R>
where
    T: Clone + Send + 'static,
    R: Clone + Send + 'static,
{
    pub(crate) fn new(name: Option<String>, source: Promise<T>, reaction: Reaction<T, R>) -> Self {
        let label = name.unwrap_or_else(|| format!("coroutine on {source}"));
        Self {
            label,
            stage: Stage::Created { source, reaction },
        }
    }

    /// Returns the label used in log events.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> CoroutineState {
        self.stage.state()
    }

    /// Returns true once the sequence has ended, normally or not.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state().is_finished()
    }

    /// Advances the coroutine by one step.
    ///
    /// Resuming before the yielded step is ready is harmless: the coroutine
    /// yields a fresh step for the same promise and runs nothing.
    pub fn resume(&mut self) -> Option<Result<WaitableStep>> {
        // Anything that does not reassign the stage below leaves it Failed.
        match mem::replace(&mut self.stage, Stage::Failed) {
            Stage::Created { source, reaction } => {
                let step = source.waitable();
                self.transition(
                    Stage::WaitingOnSource { source, reaction },
                    CoroutineState::Created,
                );
                Some(Ok(step))
            }
            Stage::WaitingOnSource { source, reaction } => match source.outcome() {
                Some(outcome) => self.on_source_terminal(outcome, reaction),
                None => {
                    let step = source.waitable();
                    self.stage = Stage::WaitingOnSource { source, reaction };
                    Some(Ok(step))
                }
            },
            Stage::WaitingOnDerived { derived, sink } => match derived.outcome() {
                Some(outcome) => {
                    let from = CoroutineState::WaitingOnDerivedFuture;
                    self.publish(&sink, outcome, from)
                }
                None => {
                    let step = derived.waitable();
                    self.stage = Stage::WaitingOnDerived { derived, sink };
                    Some(Ok(step))
                }
            },
            Stage::Completed => {
                self.stage = Stage::Completed;
                None
            }
            Stage::Failed => None,
        }
    }

    /// Drives the coroutine to its end by awaiting each yielded step.
    ///
    /// # Errors
    ///
    /// Returns the error that ended the sequence abnormally, if any.
    pub async fn drive(mut self) -> Result<()> {
        while let Some(step) = self.resume() {
            step?.await;
        }
        Ok(())
    }

    fn on_source_terminal(
        &mut self,
        outcome: Result<T>,
        reaction: Reaction<T, R>,
    ) -> Option<Result<WaitableStep>> {
        let from = CoroutineState::WaitingOnSource;

        match reaction {
            Reaction::Dispatch { first, rest } => {
                let rest = rest.or_named(|| format!("continuations of {}", self.label));
                let result = outcome.and_then(|value| {
                    self.trace_transient(from, CoroutineState::SourceReady);
                    self.trace_transient(
                        CoroutineState::SourceReady,
                        CoroutineState::InvokingContinuation,
                    );
                    first(value.clone())?;
                    rest.dispatch(value)
                });
                match result {
                    Ok(()) => {
                        self.transition(Stage::Completed, CoroutineState::InvokingContinuation);
                        None
                    }
                    Err(error) => {
                        debug!(coroutine = %self.label, error = %error, "coroutine failed");
                        self.transition(Stage::Failed, from);
                        Some(Err(error))
                    }
                }
            }
            Reaction::Complete { continuation, sink } => {
                let value = match outcome {
                    Ok(value) => value,
                    Err(error) => return self.publish(&sink, Err(error), from),
                };

                self.trace_transient(from, CoroutineState::SourceReady);
                self.trace_transient(
                    CoroutineState::SourceReady,
                    CoroutineState::InvokingContinuation,
                );
                let from = CoroutineState::InvokingContinuation;

                match continuation.invoke(value) {
                    Ok(Continued::Value(result)) => self.publish(&sink, Ok(result), from),
                    Ok(Continued::Derived(derived)) => {
                        let step = derived.waitable();
                        self.transition(Stage::WaitingOnDerived { derived, sink }, from);
                        Some(Ok(step))
                    }
                    Err(error) => self.publish(&sink, Err(error), from),
                }
            }
        }
    }

    /// Writes `outcome` into `sink` and ends the sequence.
    fn publish(
        &mut self,
        sink: &CompletionSource<R>,
        outcome: Result<R>,
        from: CoroutineState,
    ) -> Option<Result<WaitableStep>> {
        let (written, stage) = match outcome {
            Ok(value) => (sink.set_result(value), Stage::Completed),
            Err(error) => (sink.set_error(error), Stage::Failed),
        };

        match written {
            Ok(()) => {
                self.transition(stage, from);
                None
            }
            Err(error) => {
                debug!(coroutine = %self.label, error = %error, "completion source refused outcome");
                self.transition(Stage::Failed, from);
                Some(Err(error))
            }
        }
    }

    fn transition(&mut self, stage: Stage<T, R>, from: CoroutineState) {
        trace!(
            coroutine = %self.label,
            from = %from,
            to = %stage.state(),
            "coroutine transition"
        );
        self.stage = stage;
    }

    fn trace_transient(&self, from: CoroutineState, to: CoroutineState) {
        trace!(coroutine = %self.label, from = %from, to = %to, "coroutine transition");
    }
}

impl<T, R> Iterator for Coroutine<T, R>
where
    T: Clone + Send + 'static,
    R: Clone + Send + 'static,
{
    type Item = Result<WaitableStep>;

    fn next(&mut self) -> Option<Self::Item> {
        self.resume()
    }
}

impl<T, R> FusedIterator for Coroutine<T, R>
where
    T: Clone + Send + 'static,
    R: Clone + Send + 'static,
{
}

impl<T, R> fmt::Debug for Coroutine<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coroutine")
            .field("label", &self.label)
            .field("state", &self.stage.state())
            .finish()
    }
}

impl<T> Promise<T>
where
    T: Clone + Send + 'static,
{
    /// Runs `first` with the resolved value once this promise succeeds.
    ///
    /// Cancellation, faults and errors returned by `first` end the returned
    /// sequence with `Some(Err(_))`.
    pub fn then<F>(&self, first: F) -> Coroutine<T>
    where
        F: FnOnce(T) -> Result<()> + 'static,
    {
        self.then_all(first, ContinuationList::new())
    }

    /// Runs `first`, then every continuation of `rest` in order, once this
    /// promise succeeds.
    ///
    /// Failures end the returned sequence with `Some(Err(_))`; continuations
    /// after the failing one do not run.
    pub fn then_all<F>(&self, first: F, rest: ContinuationList<T>) -> Coroutine<T>
    where
        F: FnOnce(T) -> Result<()> + 'static,
    {
        Coroutine::new(
            None,
            self.clone(),
            Reaction::Dispatch {
                first: Box::new(first),
                rest,
            },
        )
    }

    /// Runs `continuation` once this promise succeeds and publishes its
    /// outcome into `sink`.
    ///
    /// Every failure, including the cancellation or fault of this promise, is
    /// written into `sink` and the returned sequence ends normally.
    pub fn then_complete<R>(
        &self,
        continuation: Continuation<T, R>,
        sink: CompletionSource<R>,
    ) -> Coroutine<T, R>
    where
        R: Clone + Send + 'static,
    {
        Coroutine::new(
            None,
            self.clone(),
            Reaction::Complete { continuation, sink },
        )
    }
}

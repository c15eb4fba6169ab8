//! Validated construction of coroutines.

use crate::coroutine::adapter::{Coroutine, Reaction};
use crate::coroutine::Continuation;
use crate::dispatch::{Action, ContinuationList};
use crate::error::{Error, Result};
use crate::promise::{CompletionSource, Promise};

/// Builder for a [`Coroutine`], checking every required input before the
/// coroutine can suspend.
///
/// [`then`]/[`then_all`] select the propagating variant and
/// [`complete_into`] selects the completion-source variant; whichever is
/// called last wins.
///
/// # Example
///
/// ```rust
/// use stepsync::coroutine::{Continuation, CoroutineBuilder};
/// use stepsync::promise::{CompletionSource, Promise};
/// use stepsync::Error;
///
/// let sink = CompletionSource::new();
/// let coroutine = CoroutineBuilder::new()
///     .name("parse-config")
///     .source(Promise::succeeded("42".to_string()))
///     .complete_into(
///         Continuation::value(|text: String| text.parse::<u32>().map_err(Error::faulted)),
///         sink.clone(),
///     )
///     .build()
///     .unwrap();
///
/// assert_eq!(coroutine.label(), "parse-config");
/// for step in coroutine {
///     assert!(step.unwrap().is_ready());
/// }
/// assert_eq!(sink.outcome().unwrap().unwrap(), 42);
///
/// let missing = CoroutineBuilder::<u32, ()>::new().then(|_| Ok(())).build();
/// assert!(matches!(missing, Err(Error::InvalidArgument("source"))));
/// ```
///
/// [`then`]: CoroutineBuilder::then
/// [`then_all`]: CoroutineBuilder::then_all
/// [`complete_into`]: CoroutineBuilder::complete_into
pub struct CoroutineBuilder<T, R = ()> {
    name: Option<String>,
    source: Option<Promise<T>>,
    first: Option<Action<T>>,
    rest: Option<ContinuationList<T>>,
    completion: Option<(Continuation<T, R>, CompletionSource<R>)>,
}

impl<T, R> CoroutineBuilder<T, R>
where
    T: Clone + Send + 'static,
    R: Clone + Send + 'static,
{
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: None,
            source: None,
            first: None,
            rest: None,
            completion: None,
        }
    }

    /// Sets a name used to label log events.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the promise to wait on.
    #[must_use]
    pub fn source(mut self, source: Promise<T>) -> Self {
        self.source = Some(source);
        self
    }

    /// Sets the first continuation of the propagating variant.
    #[must_use]
    pub fn then<F>(mut self, first: F) -> Self
    where
        F: FnOnce(T) -> Result<()> + 'static,
    {
        self.first = Some(Box::new(first));
        self.completion = None;
        self
    }

    /// Sets the continuations dispatched after the first one.
    #[must_use]
    pub fn then_all(mut self, rest: ContinuationList<T>) -> Self {
        self.rest = Some(rest);
        self.completion = None;
        self
    }

    /// Selects the completion-source variant.
    #[must_use]
    pub fn complete_into(mut self, continuation: Continuation<T, R>, sink: CompletionSource<R>) -> Self {
        self.completion = Some((continuation, sink));
        self.first = None;
        self.rest = None;
        self
    }

    /// Validates the inputs and builds the coroutine.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] naming the first missing input:
    /// `"source"` without a promise, `"continuation"` without a continuation.
    pub fn build(self) -> Result<Coroutine<T, R>> {
        let source = self.source.ok_or(Error::InvalidArgument("source"))?;

        let reaction = match (self.completion, self.first) {
            (Some((continuation, sink)), _) => Reaction::Complete { continuation, sink },
            (None, Some(first)) => Reaction::Dispatch {
                first,
                rest: self.rest.unwrap_or_default(),
            },
            (None, None) => return Err(Error::InvalidArgument("continuation")),
        };

        Ok(Coroutine::new(self.name, source, reaction))
    }
}

impl<T, R> Default for CoroutineBuilder<T, R>
where
    T: Clone + Send + 'static,
    R: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

//! Continuations that publish into a completion source.

use std::fmt;

use crate::error::Result;
use crate::promise::Promise;

/// A continuation whose outcome is published into a
/// [`CompletionSource`](crate::promise::CompletionSource).
///
/// The two variants are the two ways a continuation can finish: with a plain
/// value, or with a further promise the coroutine must also wait on.
/// Zero-argument continuations simply ignore their argument.
pub enum Continuation<T, R> {
    /// Produces the published value directly.
    Value(Box<dyn FnOnce(T) -> Result<R>>),
    /// Produces a promise whose outcome is published once it is terminal.
    Chain(Box<dyn FnOnce(T) -> Result<Promise<R>>>),
}

/// What invoking a [`Continuation`] produced.
pub(crate) enum Continued<R> {
    Value(R),
    Derived(Promise<R>),
}

impl<T, R> Continuation<T, R> {
    /// Wraps a value-producing continuation.
    pub fn value<F>(f: F) -> Self
    where
        F: FnOnce(T) -> Result<R> + 'static,
    {
        Continuation::Value(Box::new(f))
    }

    /// Wraps a promise-producing continuation.
    pub fn chain<F>(f: F) -> Self
    where
        F: FnOnce(T) -> Result<Promise<R>> + 'static,
    {
        Continuation::Chain(Box::new(f))
    }

    /// Returns true for [`Continuation::Chain`].
    #[must_use]
    pub fn is_chained(&self) -> bool {
        matches!(self, Continuation::Chain(_))
    }

    pub(crate) fn invoke(self, value: T) -> Result<Continued<R>> {
        match self {
            Continuation::Value(f) => f(value).map(Continued::Value),
            Continuation::Chain(f) => f(value).map(Continued::Derived),
        }
    }
}

impl<T, R> fmt::Debug for Continuation<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Continuation::Value(_) => f.write_str("Continuation::Value"),
            Continuation::Chain(_) => f.write_str("Continuation::Chain"),
        }
    }
}

//! Write-once completion source.

use std::fmt;

use tracing::debug;

use crate::error::{Error, Result};
use crate::promise::{Promise, PromiseId, Resolver};

/// A write-once container publishing a result or an error.
///
/// Exactly one of [`set_result`], [`set_error`] or [`set_cancelled`] may
/// succeed; any later write returns [`Error::AlreadyCompleted`]. The outcome
/// is observable through [`promise`], which holders can poll, inspect or
/// await without knowing anything about the scheduler that produced it.
///
/// Cloning a completion source yields another handle to the same slot.
///
/// # Example
///
/// ```rust
/// use stepsync::promise::CompletionSource;
///
/// let source = CompletionSource::new();
/// let published = source.promise();
///
/// source.set_result(5).unwrap();
/// assert!(source.set_result(6).is_err());
///
/// assert_eq!(published.outcome().unwrap().unwrap(), 5);
/// ```
///
/// [`set_result`]: CompletionSource::set_result
/// [`set_error`]: CompletionSource::set_error
/// [`set_cancelled`]: CompletionSource::set_cancelled
/// [`promise`]: CompletionSource::promise
pub struct CompletionSource<T> {
    resolver: Resolver<T>,
}

impl<T> CompletionSource<T> {
    /// Creates an unset completion source.
    #[must_use]
    pub fn new() -> Self {
        let (resolver, _) = Promise::channel();
        Self { resolver }
    }

    /// Returns the identifier of the published promise.
    #[must_use]
    pub fn id(&self) -> PromiseId {
        self.resolver.id()
    }

    /// Returns a handle to the published outcome.
    #[must_use]
    pub fn promise(&self) -> Promise<T> {
        self.resolver.promise()
    }

    /// Returns true once any outcome has been written.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.resolver.promise().is_terminal()
    }

    /// Returns the written outcome, or `None` while unset.
    #[must_use]
    pub fn outcome(&self) -> Option<Result<T>>
    where
        T: Clone,
    {
        self.resolver.promise().outcome()
    }

    /// Publishes a result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyCompleted`] if an outcome was already written.
    pub fn set_result(&self, value: T) -> Result<()> {
        self.written(self.resolver.succeed(value))
    }

    /// Publishes an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyCompleted`] if an outcome was already written.
    pub fn set_error(&self, error: Error) -> Result<()> {
        let accepted = self.resolver.fault(error.clone());
        if accepted {
            debug!(promise = %self.id(), error = %error, "completion source faulted");
        }
        self.written(accepted)
    }

    /// Publishes a cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyCompleted`] if an outcome was already written.
    pub fn set_cancelled(&self) -> Result<()> {
        self.written(self.resolver.cancel())
    }

    fn written(&self, accepted: bool) -> Result<()> {
        if accepted {
            Ok(())
        } else {
            Err(Error::AlreadyCompleted(self.id()))
        }
    }
}

impl<T> Default for CompletionSource<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for CompletionSource<T> {
    fn clone(&self) -> Self {
        Self {
            resolver: self.resolver.clone(),
        }
    }
}

impl<T> fmt::Debug for CompletionSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSource")
            .field("id", &self.id())
            .field("is_completed", &self.is_completed())
            .finish()
    }
}

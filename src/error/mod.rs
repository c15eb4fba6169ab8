//! Error definitions
//!
//! This module provides the error type shared by promises, the continuation
//! dispatcher and the coroutine adapter.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::promise::PromiseId;

/// A foreign error carried by a faulted promise.
pub type FaultError = Arc<dyn StdError + Send + Sync + 'static>;

/// Main error type for stepsync
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// A required input was not provided.
    #[error("missing required argument `{0}`")]
    InvalidArgument(&'static str),

    /// The awaited promise was cancelled.
    #[error("{0} was cancelled")]
    Cancelled(PromiseId),

    /// The awaited promise faulted with this error.
    #[error("{0}")]
    Faulted(FaultError),

    /// The awaited promise faulted without carrying an error.
    #[error("{0} failed to complete execution")]
    IncompleteFailure(PromiseId),

    /// A continuation list slot was empty at dispatch time.
    #[error("continuation slot {index} of {len} in `{list}` was empty")]
    EmptyContinuation {
        /// Name of the list being dispatched.
        list: String,
        /// Position of the empty slot.
        index: usize,
        /// Length of the list being dispatched.
        len: usize,
    },

    /// A completion source was written more than once.
    #[error("completion source for {0} was already completed")]
    AlreadyCompleted(PromiseId),
}

/// Broad classification of an [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required input was absent.
    InvalidArgument,
    /// An awaited promise was cancelled.
    Cancelled,
    /// An awaited promise (or a continuation) failed.
    Faulted,
    /// A contract violation by the caller.
    InvalidState,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidArgument => write!(f, "InvalidArgument"),
            ErrorKind::Cancelled => write!(f, "Cancelled"),
            ErrorKind::Faulted => write!(f, "Faulted"),
            ErrorKind::InvalidState => write!(f, "InvalidState"),
        }
    }
}

impl Error {
    /// Wrap a foreign error as a fault.
    ///
    /// # Example
    ///
    /// ```rust
    /// use stepsync::{Error, ErrorKind};
    ///
    /// let err = Error::faulted(std::io::Error::other("disk on fire"));
    /// assert_eq!(err.kind(), ErrorKind::Faulted);
    /// assert_eq!(err.to_string(), "disk on fire");
    /// ```
    #[must_use]
    pub fn faulted(error: impl StdError + Send + Sync + 'static) -> Self {
        Self::Faulted(Arc::new(error))
    }

    /// Returns the classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::Cancelled(_) => ErrorKind::Cancelled,
            Error::Faulted(_) | Error::IncompleteFailure(_) => ErrorKind::Faulted,
            Error::EmptyContinuation { .. } | Error::AlreadyCompleted(_) => {
                ErrorKind::InvalidState
            }
        }
    }

    /// Returns the carried foreign error, if this is a [`Error::Faulted`].
    ///
    /// The returned reference can be downcast to the original error type.
    #[must_use]
    pub fn as_fault(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            Error::Faulted(inner) => Some(inner.as_ref()),
            _ => None,
        }
    }

    /// Returns true if both errors carry the very same fault object.
    #[must_use]
    pub fn is_same_fault(&self, other: &Error) -> bool {
        match (self, other) {
            (Error::Faulted(a), Error::Faulted(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

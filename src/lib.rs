//! # stepsync
//!
//! > Run promises to completion inside a step-driven cooperative scheduler
//!
//! **stepsync** adapts promises, computations resolved by some other
//! executor, into coroutines that a single-threaded scheduler advances one
//! step per tick. The adapter waits on the promise, turns cancellation and
//! faults into errors, and runs continuations in order, including
//! continuations that return another promise to wait on.
//!
//! ## Quick Start
//!
//! ```rust
//! use stepsync::prelude::*;
//!
//! let (resolver, promise) = Promise::channel();
//! let sink = CompletionSource::new();
//!
//! let mut coroutine = promise.then_complete(
//!     Continuation::value(|bytes: Vec<u8>| Ok(bytes.len())),
//!     sink.clone(),
//! );
//!
//! // The scheduler resumes the coroutine once per tick while its step is not ready.
//! let step = coroutine.next().unwrap().unwrap();
//! resolver.succeed(vec![1, 2, 3]);
//! assert!(step.is_ready());
//! assert!(coroutine.next().is_none());
//!
//! assert_eq!(sink.outcome().unwrap().unwrap(), 3);
//! ```
//!
//! ## Modules
//!
//! - [`promise`] - Promise handles, resolvers and completion sources
//! - [`dispatch`] - Ordered fail-fast continuation dispatch
//! - [`coroutine`] - The promise-to-coroutine adapter
//! - [`error`] - Error type shared by all of the above

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod coroutine;
pub mod dispatch;
pub mod error;
pub mod promise;

/// Prelude for convenient imports
///
/// ```rust
/// use stepsync::prelude::*;
/// ```
pub mod prelude {
    pub use crate::coroutine::{
        Continuation, Coroutine, CoroutineBuilder, CoroutineState, WaitableStep,
    };
    pub use crate::dispatch::{dispatch_continuations, Action, ContinuationList};
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::promise::{CompletionSource, Promise, PromiseId, PromiseState, Resolver};
}

// Re-exports
pub use error::{Error, ErrorKind, Result};

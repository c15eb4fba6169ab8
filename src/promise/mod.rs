//! Promise handles observed by the coroutine adapter.
//!
//! A [`Promise`] is the read side of an asynchronous computation that runs
//! somewhere else (a thread pool, an async runtime, a timer). Whoever runs the
//! computation holds the matching [`Resolver`] and moves the promise into
//! exactly one terminal state. A [`CompletionSource`] is a write-once
//! container that publishes its outcome as a promise of its own.
//!
//! # Example
//!
//! ```rust
//! use stepsync::promise::{Promise, PromiseState};
//!
//! let (resolver, promise) = Promise::channel();
//! assert!(promise.is_pending());
//!
//! std::thread::spawn(move || {
//!     resolver.succeed(21 * 2);
//! })
//! .join()
//! .unwrap();
//!
//! assert!(matches!(promise.state(), PromiseState::Succeeded(42)));
//! ```

mod completion;
mod handle;

pub use completion::CompletionSource;
pub use handle::{Promise, PromiseId, PromiseState, Resolver};
pub(crate) use handle::Waitable;

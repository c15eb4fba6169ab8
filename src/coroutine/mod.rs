//! Adapting promises into step-driven coroutines.
//!
//! A [`Coroutine`] waits on a [`Promise`](crate::promise::Promise) without
//! blocking: every time the host scheduler resumes it, it either yields a
//! [`WaitableStep`] (suspend until that promise is terminal) or ends.
//! Continuations run synchronously inside the resume that observes the
//! promise's terminal state.
//!
//! There are two failure channels, picked by how the coroutine is built:
//!
//! - [`Promise::then`](crate::promise::Promise::then) and
//!   [`Promise::then_all`](crate::promise::Promise::then_all) end the step
//!   sequence with the error.
//! - [`Promise::then_complete`](crate::promise::Promise::then_complete)
//!   writes the error into a [`CompletionSource`](crate::promise::CompletionSource)
//!   and ends the sequence normally.
//!
//! # Example
//!
//! ```rust
//! use stepsync::coroutine::Continuation;
//! use stepsync::promise::{CompletionSource, Promise};
//!
//! let (load, level) = Promise::<&str>::channel();
//! let (spawn, actors) = Promise::<u32>::channel();
//! let sink = CompletionSource::new();
//!
//! let mut coroutine = level.then_complete(
//!     Continuation::chain(move |_name: &str| Ok(actors)),
//!     sink.clone(),
//! );
//!
//! // A scheduler tick loop, unrolled.
//! let step = coroutine.next().unwrap().unwrap();
//! load.succeed("dungeon");
//! assert!(step.is_ready());
//!
//! let step = coroutine.next().unwrap().unwrap();
//! assert!(step.keep_waiting());
//! spawn.succeed(12);
//!
//! assert!(coroutine.next().is_none());
//! assert_eq!(sink.outcome().unwrap().unwrap(), 12);
//! ```

mod adapter;
mod builder;
mod continuation;
mod waitable;

pub use adapter::{Coroutine, CoroutineState};
pub use builder::CoroutineBuilder;
pub use continuation::Continuation;
pub use waitable::WaitableStep;

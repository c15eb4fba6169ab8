//! The suspension marker handed to the cooperative scheduler.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::promise::{PromiseId, Waitable};

/// "Not ready yet; resume me once this promise is terminal."
///
/// A scheduler polls [`is_ready`] once per tick and resumes the coroutine
/// that yielded the step only after it returns `true`. The step is also a
/// [`Future`] that completes at the same moment, for hosts that drive
/// coroutines from an async executor.
///
/// [`is_ready`]: WaitableStep::is_ready
#[derive(Clone)]
pub struct WaitableStep {
    target: Arc<dyn Waitable>,
}

impl WaitableStep {
    pub(crate) fn new(target: Arc<dyn Waitable>) -> Self {
        Self { target }
    }

    /// Returns the identifier of the promise being waited on.
    #[must_use]
    pub fn promise_id(&self) -> PromiseId {
        self.target.id()
    }

    /// Returns true once the wrapped promise is terminal.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.target.is_terminal()
    }

    /// Returns true while the scheduler should keep the coroutine suspended.
    #[must_use]
    pub fn keep_waiting(&self) -> bool {
        !self.is_ready()
    }
}

impl Future for WaitableStep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.is_ready() {
            Poll::Ready(())
        } else {
            self.target.register(cx.waker());
            Poll::Pending
        }
    }
}

impl fmt::Debug for WaitableStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitableStep")
            .field("promise", &self.promise_id())
            .field("is_ready", &self.is_ready())
            .finish()
    }
}

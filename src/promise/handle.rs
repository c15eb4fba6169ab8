//! Promise, resolver and the state they share.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;
use tracing::trace;

use crate::coroutine::WaitableStep;
use crate::error::{Error, Result};

/// Unique identifier for a promise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PromiseId(u64);

impl PromiseId {
    /// Creates a new unique promise ID.
    pub(crate) fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PromiseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Promise({})", self.0)
    }
}

/// The state of a promise.
///
/// A promise leaves `Pending` at most once; terminal states never change.
#[derive(Clone, Debug)]
pub enum PromiseState<T> {
    /// Still running.
    Pending,
    /// Completed with a value.
    Succeeded(T),
    /// Cancelled by its executor.
    Cancelled,
    /// Failed. The error is `None` when the executor did not provide one.
    Faulted(Option<Error>),
}

impl<T> PromiseState<T> {
    /// Returns true for every state except `Pending`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PromiseState::Pending)
    }

    fn name(&self) -> &'static str {
        match self {
            PromiseState::Pending => "Pending",
            PromiseState::Succeeded(_) => "Succeeded",
            PromiseState::Cancelled => "Cancelled",
            PromiseState::Faulted(_) => "Faulted",
        }
    }
}

struct Inner<T> {
    state: PromiseState<T>,
    /// Wakers of async pollers waiting for a terminal state.
    wakers: Vec<Waker>,
}

pub(crate) struct Shared<T> {
    id: PromiseId,
    inner: Mutex<Inner<T>>,
}

impl<T> Shared<T> {
    fn new() -> Self {
        Self {
            id: PromiseId::new(),
            inner: Mutex::new(Inner {
                state: PromiseState::Pending,
                wakers: Vec::new(),
            }),
        }
    }

    /// Moves the promise to `state` unless it is already terminal.
    fn settle(&self, state: PromiseState<T>) -> bool {
        let wakers = {
            let mut inner = self.inner.lock();
            if inner.state.is_terminal() {
                trace!(
                    promise = %self.id,
                    current = inner.state.name(),
                    rejected = state.name(),
                    "promise already terminal"
                );
                return false;
            }
            trace!(promise = %self.id, state = state.name(), "promise settled");
            inner.state = state;
            std::mem::take(&mut inner.wakers)
        };

        for waker in wakers {
            waker.wake();
        }
        true
    }

    fn is_terminal(&self) -> bool {
        self.inner.lock().state.is_terminal()
    }

    fn register_waker(&self, waker: &Waker) {
        let mut inner = self.inner.lock();
        if inner.state.is_terminal() {
            drop(inner);
            waker.wake_by_ref();
        } else if !inner.wakers.iter().any(|w| w.will_wake(waker)) {
            inner.wakers.push(waker.clone());
        }
    }
}

/// Type-erased view of a promise used by [`WaitableStep`].
pub(crate) trait Waitable: Send + Sync {
    fn id(&self) -> PromiseId;
    fn is_terminal(&self) -> bool;
    fn register(&self, waker: &Waker);
}

impl<T: Send> Waitable for Shared<T> {
    fn id(&self) -> PromiseId {
        self.id
    }

    fn is_terminal(&self) -> bool {
        Shared::is_terminal(self)
    }

    fn register(&self, waker: &Waker) {
        self.register_waker(waker);
    }
}

/// Read-only handle to an asynchronous computation.
///
/// Cloning a promise yields another handle to the same computation. The
/// handle never changes the computation; only the matching [`Resolver`] can.
///
/// `Promise<T>` is also a [`Future`] resolving to `Result<T>`, so the same
/// handle can be awaited by ordinary async code.
///
/// # Example
///
/// ```rust
/// use stepsync::promise::Promise;
///
/// let (resolver, promise) = Promise::<&str>::channel();
/// assert!(promise.outcome().is_none());
///
/// resolver.succeed("done");
/// assert_eq!(promise.outcome().unwrap().unwrap(), "done");
/// ```
pub struct Promise<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Promise<T> {
    /// Creates a pending promise together with its resolver.
    #[must_use]
    pub fn channel() -> (Resolver<T>, Promise<T>) {
        let shared = Arc::new(Shared::new());
        (
            Resolver {
                shared: Arc::clone(&shared),
            },
            Promise { shared },
        )
    }

    /// Creates a promise that has already succeeded with `value`.
    #[must_use]
    pub fn succeeded(value: T) -> Self {
        let (resolver, promise) = Self::channel();
        resolver.succeed(value);
        promise
    }

    /// Creates a promise that has already been cancelled.
    #[must_use]
    pub fn cancelled() -> Self {
        let (resolver, promise) = Self::channel();
        resolver.cancel();
        promise
    }

    /// Creates a promise that has already faulted with `error`.
    #[must_use]
    pub fn faulted(error: Error) -> Self {
        let (resolver, promise) = Self::channel();
        resolver.fault(error);
        promise
    }

    /// Returns the promise's unique identifier.
    #[must_use]
    pub fn id(&self) -> PromiseId {
        self.shared.id
    }

    /// Returns true while the promise has not reached a terminal state.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true once the promise has succeeded, been cancelled or faulted.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.shared.is_terminal()
    }

    /// Returns a snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> PromiseState<T>
    where
        T: Clone,
    {
        self.shared.inner.lock().state.clone()
    }

    /// Returns the terminal outcome, or `None` while pending.
    ///
    /// Cancellation becomes [`Error::Cancelled`]. A fault forwards the carried
    /// error as is; a fault without an error becomes
    /// [`Error::IncompleteFailure`] naming this promise.
    #[must_use]
    pub fn outcome(&self) -> Option<Result<T>>
    where
        T: Clone,
    {
        let inner = self.shared.inner.lock();
        match &inner.state {
            PromiseState::Pending => None,
            PromiseState::Succeeded(value) => Some(Ok(value.clone())),
            PromiseState::Cancelled => Some(Err(Error::Cancelled(self.id()))),
            PromiseState::Faulted(Some(error)) => Some(Err(error.clone())),
            PromiseState::Faulted(None) => Some(Err(Error::IncompleteFailure(self.id()))),
        }
    }

    /// Returns a suspension step that is ready once this promise is terminal.
    #[must_use]
    pub fn waitable(&self) -> WaitableStep
    where
        T: Send + 'static,
    {
        WaitableStep::new(Arc::clone(&self.shared) as Arc<dyn Waitable>)
    }
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Display for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.shared.id, f)
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("id", &self.shared.id)
            .field("state", &self.shared.inner.lock().state.name())
            .finish()
    }
}

impl<T: Clone> Future for Promise<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.outcome() {
            Some(outcome) => Poll::Ready(outcome),
            None => {
                // Wakes immediately if the promise settled since `outcome`.
                self.shared.register_waker(cx.waker());
                Poll::Pending
            }
        }
    }
}

/// Write side of a [`Promise`], held by whatever runs the computation.
///
/// Every method returns `false` and changes nothing once the promise is
/// terminal.
pub struct Resolver<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Resolver<T> {
    /// Returns the identifier of the promise this resolver settles.
    #[must_use]
    pub fn id(&self) -> PromiseId {
        self.shared.id
    }

    /// Returns a new handle to the promise this resolver settles.
    #[must_use]
    pub fn promise(&self) -> Promise<T> {
        Promise {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Completes the promise with a value.
    pub fn succeed(&self, value: T) -> bool {
        self.shared.settle(PromiseState::Succeeded(value))
    }

    /// Marks the promise as cancelled.
    pub fn cancel(&self) -> bool {
        self.shared.settle(PromiseState::Cancelled)
    }

    /// Marks the promise as faulted with `error`.
    pub fn fault(&self, error: Error) -> bool {
        self.shared.settle(PromiseState::Faulted(Some(error)))
    }

    /// Marks the promise as faulted without an error object.
    pub fn fault_without_error(&self) -> bool {
        self.shared.settle(PromiseState::Faulted(None))
    }

    /// Completes the promise from a `Result`: `Ok` succeeds, `Err` faults.
    pub fn complete(&self, result: Result<T>) -> bool {
        match result {
            Ok(value) => self.succeed(value),
            Err(error) => self.fault(error),
        }
    }
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("id", &self.shared.id)
            .finish_non_exhaustive()
    }
}

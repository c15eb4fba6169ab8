//! Ordered, fail-fast continuation dispatch.
//!
//! A [`ContinuationList`] holds continuations in insertion order. Dispatching
//! invokes each of them once, synchronously, and stops at the first empty slot
//! or the first continuation that returns an error. Nothing is retried and
//! continuations that already ran are not rolled back.
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use stepsync::dispatch::ContinuationList;
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let (a, b) = (Rc::clone(&seen), Rc::clone(&seen));
//!
//! let list = ContinuationList::new()
//!     .with(move |v: i32| { a.borrow_mut().push(v); Ok(()) })
//!     .with(move |v: i32| { b.borrow_mut().push(v * 10); Ok(()) });
//!
//! list.dispatch(4).unwrap();
//! assert_eq!(*seen.borrow(), vec![4, 40]);
//! ```

use std::fmt;

use tracing::trace;

use crate::error::{Error, Result};

/// A single plain continuation receiving the resolved value.
///
/// Zero-argument continuations are `Action<()>`.
pub type Action<T> = Box<dyn FnOnce(T) -> Result<()>>;

/// Name reported for lists that were never given one.
pub const UNNAMED_LIST: &str = "continuations";

/// An ordered sequence of continuations.
///
/// A list may carry a name, which [`Error::EmptyContinuation`] reports
/// alongside the position of the empty slot.
pub struct ContinuationList<T> {
    name: Option<String>,
    slots: Vec<Option<Action<T>>>,
}

impl<T> ContinuationList<T> {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: None,
            slots: Vec::new(),
        }
    }

    /// Builds a list from raw slots, keeping empty ones.
    ///
    /// Empty slots are only reported when the list is dispatched.
    pub fn from_slots(slots: impl IntoIterator<Item = Option<Action<T>>>) -> Self {
        Self {
            name: None,
            slots: slots.into_iter().collect(),
        }
    }

    /// Names the list for error reports and log events.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Names the list with `name()` unless it already has a name.
    #[must_use]
    pub fn or_named(mut self, name: impl FnOnce() -> String) -> Self {
        if self.name.is_none() {
            self.name = Some(name());
        }
        self
    }

    /// Returns the list's name, or [`UNNAMED_LIST`].
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNNAMED_LIST)
    }

    /// Appends a continuation.
    pub fn push<F>(&mut self, continuation: F)
    where
        F: FnOnce(T) -> Result<()> + 'static,
    {
        self.slots.push(Some(Box::new(continuation)));
    }

    /// Appends a raw slot, which may be empty.
    pub fn push_slot(&mut self, slot: Option<Action<T>>) {
        self.slots.push(slot);
    }

    /// Appends a continuation, builder style.
    #[must_use]
    pub fn with<F>(mut self, continuation: F) -> Self
    where
        F: FnOnce(T) -> Result<()> + 'static,
    {
        self.push(continuation);
        self
    }

    /// Returns the number of slots, empty ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if the list has no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Invokes every continuation in insertion order with a clone of `value`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyContinuation`] naming the list and position of
    /// the first empty slot, or the
    /// first error returned by a continuation, unmodified. Continuations after
    /// the failing position are not invoked.
    pub fn dispatch(self, value: T) -> Result<()>
    where
        T: Clone,
    {
        let len = self.slots.len();
        let list = self.name.unwrap_or_else(|| UNNAMED_LIST.to_owned());
        for (index, slot) in self.slots.into_iter().enumerate() {
            let Some(continuation) = slot else {
                return Err(Error::EmptyContinuation { list, index, len });
            };
            trace!(list = %list, index, len, "dispatching continuation");
            continuation(value.clone())?;
        }
        Ok(())
    }
}

impl ContinuationList<()> {
    /// Invokes every zero-argument continuation in insertion order.
    ///
    /// # Errors
    ///
    /// Same as [`ContinuationList::dispatch`].
    pub fn run(self) -> Result<()> {
        self.dispatch(())
    }
}

impl<T> Default for ContinuationList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ContinuationList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let empty = self.slots.iter().filter(|slot| slot.is_none()).count();
        f.debug_struct("ContinuationList")
            .field("name", &self.name())
            .field("len", &self.slots.len())
            .field("empty_slots", &empty)
            .finish()
    }
}

/// Dispatches `continuations` with `value`.
///
/// Free-function form of [`ContinuationList::dispatch`].
///
/// # Errors
///
/// Same as [`ContinuationList::dispatch`].
pub fn dispatch_continuations<T: Clone>(continuations: ContinuationList<T>, value: T) -> Result<()> {
    continuations.dispatch(value)
}

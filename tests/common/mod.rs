//! Shared helpers for integration tests.
//!
//! - Tracing initialization and log capture
//! - A minimal tick driver standing in for a cooperative scheduler
//! - Continuation recorders

#![allow(dead_code)]

use std::cell::RefCell;
use std::io;
use std::rc::Rc;
use std::sync::{Arc, Once};

use parking_lot::Mutex;

use stepsync::coroutine::WaitableStep;
use stepsync::Result;

static INIT_LOGGING: Once = Once::new();

/// Initialize test logging with trace-level output.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .with_target(true)
            .with_ansi(false)
            .try_init();
    });
}

/// Runs `f` under a trace-level subscriber and returns everything it logged.
pub fn capture_logs(f: impl FnOnce()) -> String {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, f);
    let bytes = buffer.0.lock().clone();
    String::from_utf8_lossy(&bytes).into_owned()
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Drives one coroutine the way a cooperative scheduler would: once per
/// tick, resuming only when the last yielded step is ready.
pub struct TickDriver<I> {
    coroutine: I,
    waiting_on: Option<WaitableStep>,
    resumes: usize,
    finished: Option<Result<()>>,
}

impl<I> TickDriver<I>
where
    I: Iterator<Item = Result<WaitableStep>>,
{
    pub fn new(coroutine: I) -> Self {
        Self {
            coroutine,
            waiting_on: None,
            resumes: 0,
            finished: None,
        }
    }

    /// Runs one scheduler tick.
    ///
    /// Returns `true` if the coroutine was resumed.
    pub fn tick(&mut self) -> bool {
        if self.finished.is_some() {
            return false;
        }
        if self
            .waiting_on
            .as_ref()
            .is_some_and(WaitableStep::keep_waiting)
        {
            return false;
        }

        self.resumes += 1;
        match self.coroutine.next() {
            Some(Ok(step)) => self.waiting_on = Some(step),
            Some(Err(error)) => {
                self.waiting_on = None;
                self.finished = Some(Err(error));
            }
            None => {
                self.waiting_on = None;
                self.finished = Some(Ok(()));
            }
        }
        true
    }

    /// Runs `ticks` scheduler ticks and returns how many resumed the coroutine.
    pub fn run_ticks(&mut self, ticks: usize) -> usize {
        (0..ticks).filter(|_| self.tick()).count()
    }

    /// The step the coroutine is currently suspended on.
    pub fn waiting_on(&self) -> Option<&WaitableStep> {
        self.waiting_on.as_ref()
    }

    /// How the sequence ended, once it has.
    pub fn finished(&self) -> Option<&Result<()>> {
        self.finished.as_ref()
    }

    pub fn resumes(&self) -> usize {
        self.resumes
    }
}

/// Shared log of continuation invocations.
#[derive(Clone, Default)]
pub struct CallLog {
    entries: Rc<RefCell<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A continuation recording `tag:value`.
    pub fn recorder<T: std::fmt::Debug + 'static>(
        &self,
        tag: &'static str,
    ) -> impl FnOnce(T) -> Result<()> + 'static {
        let entries = Rc::clone(&self.entries);
        move |value| {
            entries.borrow_mut().push(format!("{tag}:{value:?}"));
            Ok(())
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }
}

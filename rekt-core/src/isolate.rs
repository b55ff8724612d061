//! Failure Isolation
//!
//! User callbacks (computations, effects, timer bodies) run inside an
//! [`Isolated`] cell. A failing callback, whether it returns `Err` or
//! panics, is reported to an optional [`ErrorSink`] and the cell hands back
//! the last value that was produced successfully.
//!
//! The cell never re-raises. Reactive recomputation calls into user code
//! from inside the store's notification path, and an unwinding failure
//! there would leave the derived-value graph half updated.
//!
//! `None` is returned both when nothing has ever succeeded and when a
//! successful callback legitimately produced nothing, so callers detect
//! failures through the sink, not through the return value.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::error::{BoxError, IsolatedError};

/// Receives failures captured by an [`Isolated`] cell.
pub type ErrorSink = Arc<dyn Fn(&IsolatedError) + Send + Sync>;

/// Wrap a closure as an [`ErrorSink`].
pub fn error_sink<F>(sink: F) -> ErrorSink
where
    F: Fn(&IsolatedError) + Send + Sync + 'static,
{
    Arc::new(sink)
}

/// An [`ErrorSink`] that reports every failure as a `tracing` error event.
pub fn log_sink() -> ErrorSink {
    error_sink(|err| error!(error = %err, "isolated callback failed"))
}

/// A failure-isolating call cell holding the last successful result.
pub struct Isolated<T> {
    /// Result of the most recent successful call.
    last: Option<T>,

    /// Where failures are reported, if anywhere.
    sink: Option<ErrorSink>,
}

impl<T: Clone> Isolated<T> {
    /// Create an empty cell reporting to `sink`, if any.
    pub fn new(sink: Option<ErrorSink>) -> Self {
        Self { last: None, sink }
    }

    /// Run `f`, returning its value on success or the previous value on
    /// failure.
    pub fn call<F, E>(&mut self, f: F) -> Option<T>
    where
        F: FnOnce() -> Result<T, E>,
        E: Into<BoxError>,
    {
        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(Ok(value)) => {
                self.last = Some(value.clone());
                Some(value)
            }
            Ok(Err(err)) => {
                self.report(IsolatedError::Failed(err.into()));
                self.last.clone()
            }
            Err(payload) => {
                self.report(IsolatedError::from_panic(payload));
                self.last.clone()
            }
        }
    }

    /// The value produced by the most recent successful call.
    pub fn last(&self) -> Option<&T> {
        self.last.as_ref()
    }

    fn report(&self, err: IsolatedError) {
        debug!(error = %err, has_sink = self.sink.is_some(), "isolated callback failure");

        if let Some(sink) = &self.sink {
            // A panicking sink must not undo the isolation it provides.
            if panic::catch_unwind(AssertUnwindSafe(|| sink(&err))).is_err() {
                warn!("error sink panicked while reporting an isolated failure");
            }
        }
    }
}

impl<T> std::fmt::Debug for Isolated<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Isolated")
            .field("has_value", &self.last.is_some())
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

/// Wrap a zero-argument callback in a fresh [`Isolated`] cell.
pub fn isolate<T, E, F>(sink: Option<ErrorSink>, mut f: F) -> impl FnMut() -> Option<T>
where
    T: Clone,
    E: Into<BoxError>,
    F: FnMut() -> Result<T, E>,
{
    let mut cell = Isolated::new(sink);
    move || cell.call(&mut f)
}

/// Wrap a callback taking arguments in a fresh [`Isolated`] cell.
///
/// Multiple arguments are passed as a tuple.
pub fn isolate_with<A, T, E, F>(sink: Option<ErrorSink>, mut f: F) -> impl FnMut(A) -> Option<T>
where
    T: Clone,
    E: Into<BoxError>,
    F: FnMut(A) -> Result<T, E>,
{
    let mut cell = Isolated::new(sink);
    move |args| cell.call(|| f(args))
}

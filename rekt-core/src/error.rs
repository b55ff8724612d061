//! Error types for rekt-core.
//!
//! Failures fall into three groups:
//!
//! - Mount-time failures ([`LifecycleError::Mount`]) surface to the mount
//!   driver.
//! - Failures inside computation, effect and timer bodies are isolated. They
//!   are handed to an [`ErrorSink`](crate::isolate::ErrorSink) as an
//!   [`IsolatedError`] and never propagate.
//! - Release-action failures ([`LifecycleError::Release`]) surface to the
//!   caller of `dismount()` and abort the rest of the drain.

use std::any::Any;

use thiserror::Error;

/// Boxed error returned by user-supplied callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by a [`Context`](crate::lifecycle::Context).
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("mount action failed: {0}")]
    Mount(#[source] BoxError),

    #[error("release action {index} of {total} failed: {source}")]
    Release {
        /// Zero-based position of the failing action in the drained batch.
        index: usize,
        /// Number of actions in the drained batch.
        total: usize,
        #[source]
        source: BoxError,
    },
}

/// A failure captured by the isolating wrapper.
#[derive(Debug, Error)]
pub enum IsolatedError {
    #[error("callback failed: {0}")]
    Failed(#[source] BoxError),

    #[error("callback panicked: {0}")]
    Panicked(String),
}

impl IsolatedError {
    /// Build an error from a payload caught by `catch_unwind`.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panicked(message)
    }
}

/// Errors from constructing a scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("no tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

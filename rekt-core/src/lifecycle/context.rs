//! Lifecycle Context
//!
//! One [`Context`] exists per mounted component instance. It records a
//! release action for every resource acquired while the component is
//! mounted and runs them all when the component is dismounted.
//!
//! # Ordering
//!
//! Release actions run in registration order (first registered, first
//! released), not in reverse. Mount actions run synchronously at the call
//! site.
//!
//! # Failure
//!
//! Neither registration nor dismount isolates failures. A failing mount
//! action surfaces to the caller of [`Context::try_on_mount`]; a failing
//! release action surfaces from [`Context::dismount`] and the actions after
//! it in the same batch are dropped without running.

use std::borrow::Cow;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::release::ReleaseAction;
use crate::error::{BoxError, LifecycleError};

/// Construction options for a [`Context`].
#[derive(Debug, Clone)]
pub struct ContextOptions {
    /// Name used in log fields.
    pub label: Cow<'static, str>,
}

impl ContextOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the label used in log fields.
    pub fn label(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.label = label.into();
        self
    }
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            label: Cow::Borrowed("component"),
        }
    }
}

/// Per-component lifecycle handle.
///
/// # Example
///
/// ```rust
/// use rekt_core::lifecycle::{Context, ReleaseAction};
/// use std::sync::{Arc, Mutex};
///
/// let log = Arc::new(Mutex::new(Vec::new()));
/// let context = Context::new();
///
/// let l = log.clone();
/// context.on_mount(move || {
///     l.lock().unwrap().push("mounted");
///     let l = l.clone();
///     Some(ReleaseAction::new(move || l.lock().unwrap().push("released")))
/// });
///
/// context.dismount().unwrap();
/// assert_eq!(*log.lock().unwrap(), vec!["mounted", "released"]);
/// ```
pub struct Context {
    /// Name used in log fields.
    label: Cow<'static, str>,

    /// Release actions in registration order.
    releases: Mutex<Vec<ReleaseAction>>,
}

impl Context {
    /// Create a context with default options.
    pub fn new() -> Self {
        Self::with_options(ContextOptions::default())
    }

    /// Create a context with the given options.
    pub fn with_options(options: ContextOptions) -> Self {
        Self {
            label: options.label,
            releases: Mutex::new(Vec::new()),
        }
    }

    /// The label given at construction.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of release actions waiting for [`dismount`](Self::dismount).
    pub fn pending_releases(&self) -> usize {
        self.releases.lock().len()
    }

    /// Run `action` now and register the release action it returns, if any.
    ///
    /// A panic inside `action` propagates and registers nothing.
    pub fn on_mount<F>(&self, action: F)
    where
        F: FnOnce() -> Option<ReleaseAction>,
    {
        if let Some(release) = action() {
            self.on_dismount(release);
        }
    }

    /// Run a fallible `action` now and register the release action it
    /// returns, if any.
    ///
    /// An error from `action` is returned as [`LifecycleError::Mount`] and
    /// registers nothing.
    pub fn try_on_mount<F, E>(&self, action: F) -> Result<(), LifecycleError>
    where
        F: FnOnce() -> Result<Option<ReleaseAction>, E>,
        E: Into<BoxError>,
    {
        let release = action().map_err(|err| LifecycleError::Mount(err.into()))?;
        if let Some(release) = release {
            self.on_dismount(release);
        }
        Ok(())
    }

    /// Append `release` to the release sequence.
    pub fn on_dismount(&self, release: ReleaseAction) {
        let mut releases = self.releases.lock();
        releases.push(release);
        trace!(context = %self.label, pending = releases.len(), "release action registered");
    }

    /// Drain the release sequence and run every action in registration
    /// order.
    ///
    /// The sequence is taken as one batch before anything runs, so actions
    /// registered during the drain wait for the next call. Dismounting an
    /// empty context does nothing.
    pub fn dismount(&self) -> Result<(), LifecycleError> {
        let batch = std::mem::take(&mut *self.releases.lock());
        if batch.is_empty() {
            return Ok(());
        }

        let total = batch.len();
        debug!(context = %self.label, pending = total, "dismounting");

        for (index, release) in batch.into_iter().enumerate() {
            release.run().map_err(|source| {
                warn!(
                    context = %self.label,
                    index,
                    skipped = total - index - 1,
                    error = %source,
                    "release action failed, aborting dismount"
                );
                LifecycleError::Release {
                    index,
                    total,
                    source,
                }
            })?;
        }

        Ok(())
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("label", &self.label)
            .field("pending_releases", &self.pending_releases())
            .finish()
    }
}

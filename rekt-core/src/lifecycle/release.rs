//! Release actions.

use crate::error::BoxError;

/// A zero-argument procedure that undoes one acquired resource.
///
/// Consumed when run, so a release action can never run twice.
pub struct ReleaseAction {
    /// The release body, run at most once.
    run: Box<dyn FnOnce() -> Result<(), BoxError> + Send>,
}

impl ReleaseAction {
    /// Wrap an infallible release body.
    pub fn new<F>(release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            run: Box::new(move || {
                release();
                Ok(())
            }),
        }
    }

    /// Wrap a release body that can fail.
    pub fn fallible<F, E>(release: F) -> Self
    where
        F: FnOnce() -> Result<(), E> + Send + 'static,
        E: Into<BoxError>,
    {
        Self {
            run: Box::new(move || release().map_err(Into::into)),
        }
    }

    /// Run the release body.
    pub fn run(self) -> Result<(), BoxError> {
        (self.run)()
    }
}

impl std::fmt::Debug for ReleaseAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseAction").finish_non_exhaustive()
    }
}

//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies.
//!
//! 2. When any dependency notifies, the effect re-runs.
//!
//! 3. `stop()` unsubscribes it. Dropping the last handle does the same.

use std::sync::Arc;

use super::reaction::Reaction;
use super::source::Source;

/// A side-effecting computation that runs when dependencies change.
///
/// # Example
///
/// ```rust
/// use rekt_core::reactive::{Effect, State};
/// use std::sync::atomic::{AtomicI32, Ordering};
/// use std::sync::Arc;
///
/// let count = State::new(0);
/// let seen = Arc::new(AtomicI32::new(-1));
///
/// let (c, s) = (count.clone(), seen.clone());
/// let effect = Effect::new(move || s.store(c.get(), Ordering::SeqCst));
///
/// count.set(5);
/// assert_eq!(seen.load(Ordering::SeqCst), 5);
/// effect.stop();
/// ```
#[must_use = "dropping the effect stops it"]
pub struct Effect {
    /// The shared runner. Dropped with the last handle.
    reaction: Arc<Reaction>,
}

impl Effect {
    /// Create an effect that depends on whatever it reads. Runs
    /// immediately.
    pub fn new<F>(run: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let reaction = Reaction::new("effect", run, false);
        reaction.execute();
        Self { reaction }
    }

    /// Create an effect that runs when one of `dependencies` notifies.
    /// Runs immediately; reads inside it are not tracked.
    pub fn with_dependencies<F>(dependencies: &[Source], run: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let reaction = Reaction::new("effect", run, true);
        reaction.attach(dependencies);
        reaction.execute();
        Self { reaction }
    }

    /// Unsubscribe from all dependencies. Idempotent.
    pub fn stop(&self) {
        self.reaction.stop();
    }

    /// Check if the effect has been stopped.
    pub fn is_stopped(&self) -> bool {
        self.reaction.is_stopped()
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.reaction.run_count()
    }

    /// Get the number of dependencies.
    pub fn dependency_count(&self) -> usize {
        self.reaction.dependency_count()
    }
}

impl Clone for Effect {
    fn clone(&self) -> Self {
        Self {
            reaction: Arc::clone(&self.reaction),
        }
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

//! Computed Implementation
//!
//! A [`Computed`] is a derived value that recomputes whenever one of its
//! dependencies changes.
//!
//! # How Computed Values Work
//!
//! 1. On creation the computation runs once and its result becomes the
//!    initial value.
//!
//! 2. Every notification from a dependency re-runs the computation and
//!    stores the new result, which in turn notifies the computed value's
//!    own dependents.
//!
//! 3. `stop()` detaches it from its dependencies. The last value stays
//!    readable.
//!
//! Unlike a lazy memo, a computed value is eager: dependents always observe
//! an up-to-date value without pulling.

use std::fmt::Debug;
use std::sync::Arc;

use super::reaction::Reaction;
use super::source::{Source, SourceId};
use super::state::State;
use super::tracking;

/// An eagerly recomputed derived value.
///
/// # Example
///
/// ```rust
/// use rekt_core::reactive::{Computed, State};
///
/// let count = State::new(2);
/// let c = count.clone();
/// let doubled = Computed::new(move || c.get() * 2);
///
/// count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Computed<T> {
    /// Holds the latest value and notifies dependents.
    state: State<T>,

    /// Recomputes into `state`.
    reaction: Arc<Reaction>,
}

impl<T> Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a computed value whose dependencies are whatever the
    /// computation reads.
    pub fn new<F>(compute: F) -> Self
    where
        F: FnMut() -> T + Send + 'static,
    {
        Self::build(None, compute)
    }

    /// Create a computed value that recomputes only when one of
    /// `dependencies` notifies. Reads inside the computation are not
    /// tracked.
    pub fn with_dependencies<F>(dependencies: &[Source], compute: F) -> Self
    where
        F: FnMut() -> T + Send + 'static,
    {
        Self::build(Some(dependencies), compute)
    }

    fn build<F>(dependencies: Option<&[Source]>, mut compute: F) -> Self
    where
        F: FnMut() -> T + Send + 'static,
    {
        let (initial, sources) = match dependencies {
            Some(dependencies) => (tracking::untracked(&mut compute), dependencies.to_vec()),
            None => tracking::collect(&mut compute),
        };

        let state = State::new(initial);
        let target = state.clone();
        let reaction = Reaction::new(
            "computed",
            move || target.set(compute()),
            dependencies.is_some(),
        );
        reaction.attach(&sources);

        Self { state, reaction }
    }

    /// Get the current value, recording a dependency if a reaction is
    /// running.
    pub fn get(&self) -> T {
        self.state.get()
    }

    /// Get the current value without recording a dependency.
    pub fn get_untracked(&self) -> T {
        self.state.get_untracked()
    }

    /// Get the unique ID of the source dependents subscribe to.
    pub fn id(&self) -> SourceId {
        self.state.id()
    }

    /// The source dependents subscribe to.
    pub fn source(&self) -> Source {
        self.state.source()
    }

    /// Stop recomputing. Idempotent.
    pub fn stop(&self) {
        self.reaction.stop();
    }

    /// Whether [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.reaction.is_stopped()
    }

    /// Number of sources the value currently depends on.
    pub fn dependency_count(&self) -> usize {
        self.reaction.dependency_count()
    }
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            reaction: Arc::clone(&self.reaction),
        }
    }
}

impl<T> From<&Computed<T>> for Source
where
    T: Clone + Send + Sync + 'static,
{
    fn from(computed: &Computed<T>) -> Self {
        computed.source()
    }
}

impl<T> Debug for Computed<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.id())
            .field("value", &self.get_untracked())
            .field("dependency_count", &self.dependency_count())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

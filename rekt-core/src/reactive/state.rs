//! State Implementation
//!
//! A [`State`] holds a value and a [`Source`]. Reading it inside a running
//! reaction records a dependency; writing it notifies every listener.
//!
//! # Thread Safety
//!
//! The value sits behind a `RwLock`. Writes release the lock before
//! listeners are notified, so a listener may read the value it was woken
//! for.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;

use super::source::{Source, SourceId};
use super::tracking;

/// A reactive value of type `T`.
///
/// Cloning yields another handle to the same value.
///
/// # Example
///
/// ```rust
/// use rekt_core::reactive::State;
///
/// let count = State::new(1);
/// count.update(|v| v + 1);
/// assert_eq!(count.get(), 2);
/// ```
pub struct State<T> {
    /// The current value, shared between clones.
    value: Arc<RwLock<T>>,

    /// Notified after every write.
    source: Source,
}

impl<T> State<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a state with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            value: Arc::new(RwLock::new(value)),
            source: Source::new(),
        }
    }

    /// Get the state's unique ID.
    pub fn id(&self) -> SourceId {
        self.source.id()
    }

    /// Get the current value, recording a dependency if a reaction is
    /// running.
    pub fn get(&self) -> T {
        tracking::track(&self.source);
        self.value.read().clone()
    }

    /// Get the current value without recording a dependency.
    pub fn get_untracked(&self) -> T {
        self.value.read().clone()
    }

    /// Borrow the current value without cloning it. Not tracked.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.read())
    }

    /// Replace the value and notify listeners.
    pub fn set(&self, value: T) {
        *self.value.write() = value;
        self.source.notify();
    }

    /// Compute a new value from the current one and notify listeners.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(&self.value.read());
        self.set(next);
    }

    /// The source reactions subscribe to.
    pub fn source(&self) -> Source {
        self.source.clone()
    }

    /// Number of listeners currently subscribed.
    pub fn subscriber_count(&self) -> usize {
        self.source.listener_count()
    }
}

impl<T> Clone for State<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            source: self.source.clone(),
        }
    }
}

impl<T> From<&State<T>> for Source {
    fn from(state: &State<T>) -> Self {
        state.source.clone()
    }
}

impl<T> Debug for State<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("id", &self.source.id())
            .field("value", &*self.value.read())
            .field("subscriber_count", &self.source.listener_count())
            .finish()
    }
}

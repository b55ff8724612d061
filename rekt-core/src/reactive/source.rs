//! Notification sources.
//!
//! A [`Source`] is the type-erased half of every reactive value: it knows
//! who is listening but not what the value is. Reactions subscribe to
//! sources, and explicit dependency lists are written as `&[Source]` so a
//! computation can depend on values of different types.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use smallvec::SmallVec;

use super::tracking;

/// Unique identifier for a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(u64);

impl SourceId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

type Listener = Arc<dyn Fn() + Send + Sync>;

struct SourceInner {
    /// Unique identifier for this source.
    id: SourceId,

    /// Key handed to the next subscriber.
    next_key: AtomicU64,

    /// Registered listeners by key. Most values have one or two dependents.
    listeners: Mutex<SmallVec<[(u64, Listener); 4]>>,
}

/// A point that listeners can subscribe to and that can be notified.
///
/// Cloning a source yields another handle to the same listener list.
#[derive(Clone)]
pub struct Source {
    /// Shared with every clone and, weakly, with subscriptions.
    inner: Arc<SourceInner>,
}

impl Source {
    /// Create a source with no listeners.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SourceInner {
                id: SourceId::next(),
                next_key: AtomicU64::new(0),
                listeners: Mutex::new(SmallVec::new()),
            }),
        }
    }

    /// Get the source's unique ID.
    pub fn id(&self) -> SourceId {
        self.inner.id
    }

    /// Register a listener, called on every [`notify`](Self::notify).
    ///
    /// The listener stays registered until the returned [`Subscription`] is
    /// unsubscribed or dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let key = self.inner.next_key.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.lock().push((key, Arc::new(listener)));

        Subscription {
            source: Arc::downgrade(&self.inner),
            key,
            active: true,
        }
    }

    /// Call every listener registered at the time of the call.
    ///
    /// Listeners run on a snapshot with the lock released, so they may
    /// subscribe or unsubscribe freely. Reads made by a listener are never
    /// attributed to a computation that happens to be running around it.
    pub fn notify(&self) {
        let snapshot: SmallVec<[Listener; 4]> = self
            .inner
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        tracking::untracked(|| {
            for listener in snapshot {
                listener();
            }
        });
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }
}

impl Default for Source {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("id", &self.inner.id)
            .field("listener_count", &self.listener_count())
            .finish()
    }
}

/// A registered listener. Unsubscribes on drop.
///
/// Holds the source weakly; a subscription never keeps a value alive.
pub struct Subscription {
    /// The source subscribed to. Weak so a subscription never keeps it alive.
    source: Weak<SourceInner>,

    /// Key of the listener within the source.
    key: u64,

    /// Cleared by `unsubscribe`.
    active: bool,
}

impl Subscription {
    /// Remove the listener. Idempotent.
    pub fn unsubscribe(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;

        if let Some(source) = self.source.upgrade() {
            source.listeners.lock().retain(|(key, _)| *key != self.key);
        }
    }

    /// Whether the listener is still registered.
    pub fn is_active(&self) -> bool {
        self.active && self.source.strong_count() > 0
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("active", &self.is_active())
            .finish()
    }
}

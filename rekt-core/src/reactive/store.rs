//! The store interface consumed by the binding adapter.
//!
//! [`ReactiveBindings`](crate::bindings::ReactiveBindings) only needs two
//! constructors and a way to tear down what they return. Keeping that
//! behind [`ReactiveStore`] lets a component run against a fake store in
//! tests, or against a different reactive engine entirely.

use super::computed::Computed;
use super::effect::Effect;
use super::source::Source;

/// Tear down a binding. Must be idempotent.
pub trait Stop {
    fn stop(&self);
}

impl<T> Stop for Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn stop(&self) {
        Computed::stop(self);
    }
}

impl Stop for Effect {
    fn stop(&self) {
        Effect::stop(self);
    }
}

/// Constructors for derived values and effects.
///
/// `dependencies: None` means the store infers dependencies from what the
/// body reads; `Some` subscribes to exactly the given sources.
pub trait ReactiveStore {
    type Computed<T>: Stop + Clone + Send + Sync + 'static
    where
        T: Clone + Send + Sync + 'static;

    type Effect: Stop + Send + Sync + 'static;

    fn computed<T, F>(&self, dependencies: Option<&[Source]>, compute: F) -> Self::Computed<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnMut() -> T + Send + 'static;

    /// Start an effect. Effects run once immediately.
    fn effect<F>(&self, dependencies: Option<&[Source]>, effect: F) -> Self::Effect
    where
        F: FnMut() + Send + 'static;
}

/// The store backed by this crate's [`State`](super::State),
/// [`Computed`] and [`Effect`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalStore;

impl ReactiveStore for SignalStore {
    type Computed<T> = Computed<T>
    where
        T: Clone + Send + Sync + 'static;

    type Effect = Effect;

    fn computed<T, F>(&self, dependencies: Option<&[Source]>, compute: F) -> Computed<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnMut() -> T + Send + 'static,
    {
        match dependencies {
            Some(dependencies) => Computed::with_dependencies(dependencies, compute),
            None => Computed::new(compute),
        }
    }

    fn effect<F>(&self, dependencies: Option<&[Source]>, effect: F) -> Effect
    where
        F: FnMut() + Send + 'static,
    {
        match dependencies {
            Some(dependencies) => Effect::with_dependencies(dependencies, effect),
            None => Effect::new(effect),
        }
    }
}

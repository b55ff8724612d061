//! Reactive bindings scoped to a component.

use tracing::debug;

use crate::error::BoxError;
use crate::isolate::{isolate, isolate_with, ErrorSink};
use crate::lifecycle::{Context, ReleaseAction};
use crate::reactive::{ReactiveStore, Source, State, Stop};

/// Builds computed values and effects whose teardown is registered on a
/// [`Context`] and whose bodies run failure-isolated.
///
/// A body that fails keeps its subscriptions. The failing run is reported
/// to the error sink and a computed value keeps the result of the last run
/// that succeeded (`None` if none has).
pub struct ReactiveBindings<'a, S: ReactiveStore> {
    /// Context teardown is registered on.
    context: &'a Context,

    /// Store the bindings are created in.
    store: &'a S,

    /// Receives failures of computations and effects.
    sink: Option<ErrorSink>,
}

impl<'a, S: ReactiveStore> ReactiveBindings<'a, S> {
    pub fn new(context: &'a Context, store: &'a S, sink: Option<ErrorSink>) -> Self {
        Self {
            context,
            store,
            sink,
        }
    }

    /// Derive a value from whatever `compute` reads.
    ///
    /// The returned handle can be read, passed as a dependency of another
    /// binding, or rendered. It is stopped when the context is dismounted.
    pub fn computed<T, E, F>(&self, compute: F) -> S::Computed<Option<T>>
    where
        T: Clone + Send + Sync + 'static,
        E: Into<BoxError> + 'static,
        F: FnMut() -> Result<T, E> + Send + 'static,
    {
        self.build_computed(None, compute)
    }

    /// Derive a value that recomputes only when one of `dependencies`
    /// changes.
    pub fn computed_with<T, E, F>(
        &self,
        dependencies: &[Source],
        compute: F,
    ) -> S::Computed<Option<T>>
    where
        T: Clone + Send + Sync + 'static,
        E: Into<BoxError> + 'static,
        F: FnMut() -> Result<T, E> + Send + 'static,
    {
        self.build_computed(Some(dependencies), compute)
    }

    /// Run `effect` now and after every change to what it reads, until the
    /// context is dismounted.
    pub fn set_effect<E, F>(&self, effect: F)
    where
        E: Into<BoxError> + 'static,
        F: FnMut() -> Result<(), E> + Send + 'static,
    {
        self.build_effect(None, effect);
    }

    /// Run `effect` now and after every change to one of `dependencies`,
    /// until the context is dismounted.
    pub fn set_effect_with<E, F>(&self, dependencies: &[Source], effect: F)
    where
        E: Into<BoxError> + 'static,
        F: FnMut() -> Result<(), E> + Send + 'static,
    {
        self.build_effect(Some(dependencies), effect);
    }

    /// Derive a value from the current values of `states`.
    ///
    /// `compute` receives the values in the order the states were given and
    /// re-runs whenever any of them changes.
    pub fn computed_from<V, T, E, F>(
        &self,
        states: &[State<V>],
        mut compute: F,
    ) -> S::Computed<Option<T>>
    where
        V: Clone + Send + Sync + 'static,
        T: Clone + Send + Sync + 'static,
        E: Into<BoxError> + 'static,
        F: FnMut(&[V]) -> Result<T, E> + Send + 'static,
    {
        let sources = sources_of(states);
        let states = states.to_vec();
        let mut wrapped = isolate_with(self.sink.clone(), move |values: Vec<V>| compute(&values));
        let computed = self
            .store
            .computed(Some(&sources), move || wrapped(snapshot(&states)));

        self.register(computed.clone(), "computed binding registered", true);
        computed
    }

    /// Run `effect` with the current values of `states` now and after every
    /// change to one of them, until the context is dismounted.
    pub fn set_effect_from<V, E, F>(&self, states: &[State<V>], mut effect: F)
    where
        V: Clone + Send + Sync + 'static,
        E: Into<BoxError> + 'static,
        F: FnMut(&[V]) -> Result<(), E> + Send + 'static,
    {
        let sources = sources_of(states);
        let states = states.to_vec();
        let mut wrapped = isolate_with(self.sink.clone(), move |values: Vec<V>| effect(&values));
        let handle = self.store.effect(Some(&sources), move || {
            wrapped(snapshot(&states));
        });

        self.register(handle, "effect binding registered", true);
    }

    fn build_computed<T, E, F>(
        &self,
        dependencies: Option<&[Source]>,
        compute: F,
    ) -> S::Computed<Option<T>>
    where
        T: Clone + Send + Sync + 'static,
        E: Into<BoxError> + 'static,
        F: FnMut() -> Result<T, E> + Send + 'static,
    {
        let wrapped = isolate(self.sink.clone(), compute);
        let computed = self.store.computed(dependencies, wrapped);

        self.register(computed.clone(), "computed binding registered", dependencies.is_some());
        computed
    }

    fn build_effect<E, F>(&self, dependencies: Option<&[Source]>, effect: F)
    where
        E: Into<BoxError> + 'static,
        F: FnMut() -> Result<(), E> + Send + 'static,
    {
        let mut wrapped = isolate(self.sink.clone(), effect);
        let handle = self.store.effect(dependencies, move || {
            wrapped();
        });

        self.register(handle, "effect binding registered", dependencies.is_some());
    }

    fn register<H>(&self, handle: H, message: &'static str, explicit: bool)
    where
        H: Stop + Send + 'static,
    {
        self.context.on_dismount(ReleaseAction::new(move || handle.stop()));
        debug!(context = self.context.label(), explicit, "{message}");
    }
}

fn sources_of<V>(states: &[State<V>]) -> Vec<Source>
where
    V: Clone + Send + Sync + 'static,
{
    states.iter().map(State::source).collect()
}

fn snapshot<V>(states: &[State<V>]) -> Vec<V>
where
    V: Clone + Send + Sync + 'static,
{
    states.iter().map(State::get_untracked).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IsolatedError;
    use crate::isolate::error_sink;
    use crate::reactive::SignalStore;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn recording_sink() -> (ErrorSink, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let sink = error_sink(move |err: &IsolatedError| seen_clone.lock().push(err.to_string()));
        (sink, seen)
    }

    #[test]
    fn computed_is_stopped_on_dismount() {
        let context = Context::new();
        let store = SignalStore;
        let bindings = ReactiveBindings::new(&context, &store, None);

        let base = State::new(2);
        let b = base.clone();
        let doubled = bindings.computed(move || Ok::<_, BoxError>(b.get() * 2));
        assert_eq!(doubled.get(), Some(4));
        assert_eq!(context.pending_releases(), 1);

        context.dismount().unwrap();
        base.set(10);
        assert!(doubled.is_stopped());
        assert_eq!(doubled.get(), Some(4));
    }

    #[test]
    fn failing_trigger_keeps_previous_value() {
        let (sink, seen) = recording_sink();
        let context = Context::new();
        let store = SignalStore;
        let bindings = ReactiveBindings::new(&context, &store, Some(sink));

        let input = State::new(1);
        let i = input.clone();
        let checked = bindings.computed(move || {
            let value = i.get();
            if value < 0 {
                Err(format!("negative input {value}"))
            } else {
                Ok(value * 10)
            }
        });

        input.set(2);
        assert_eq!(checked.get(), Some(20));

        input.set(-1);
        assert_eq!(checked.get(), Some(20));
        assert_eq!(seen.lock().len(), 1);

        // Still subscribed after the failure.
        input.set(3);
        assert_eq!(checked.get(), Some(30));
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn computed_with_explicit_dependencies() {
        let context = Context::new();
        let store = SignalStore;
        let bindings = ReactiveBindings::new(&context, &store, None);

        let refresh = State::new(0u32);
        let data = State::new("a");
        let d = data.clone();
        let view = bindings.computed_with(&[refresh.source()], move || Ok::<_, BoxError>(d.get()));

        data.set("b");
        assert_eq!(view.get(), Some("a"));
        refresh.set(1);
        assert_eq!(view.get(), Some("b"));
    }

    #[test]
    fn effect_is_unsubscribed_on_dismount() {
        let context = Context::new();
        let store = SignalStore;
        let bindings = ReactiveBindings::new(&context, &store, None);

        let state = State::new(0);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (s, log) = (state.clone(), seen.clone());
        bindings.set_effect(move || {
            log.lock().push(s.get());
            Ok::<_, BoxError>(())
        });

        state.set(1);
        context.dismount().unwrap();
        state.set(2);

        assert_eq!(*seen.lock(), vec![0, 1]);
        assert_eq!(state.subscriber_count(), 0);
    }

    #[test]
    fn failing_effect_keeps_running() {
        let (sink, seen) = recording_sink();
        let context = Context::new();
        let store = SignalStore;
        let bindings = ReactiveBindings::new(&context, &store, Some(sink));

        let state = State::new(0);
        let runs = Arc::new(Mutex::new(0));
        let (s, r) = (state.clone(), runs.clone());
        bindings.set_effect_with(&[state.source()], move || {
            *r.lock() += 1;
            if s.get_untracked() % 2 == 1 {
                panic!("odd value");
            }
            Ok::<_, BoxError>(())
        });

        state.set(1);
        state.set(2);
        assert_eq!(*runs.lock(), 3);
        assert_eq!(*seen.lock(), vec!["callback panicked: odd value".to_string()]);
    }

    #[test]
    fn computed_from_receives_values_in_order() {
        let context = Context::new();
        let store = SignalStore;
        let bindings = ReactiveBindings::new(&context, &store, None);

        let first = State::new(String::from("Ada"));
        let last = State::new(String::from("Lovelace"));
        let unrelated = State::new(String::from("x"));
        let u = unrelated.clone();
        let full = bindings.computed_from(&[first.clone(), last.clone()], move |names: &[String]| {
            u.get();
            Ok::<_, BoxError>(names.join(" "))
        });
        assert_eq!(full.get().as_deref(), Some("Ada Lovelace"));

        last.set(String::from("King"));
        assert_eq!(full.get().as_deref(), Some("Ada King"));

        // Reads inside the body are not dependencies.
        unrelated.set(String::from("y"));
        assert_eq!(full.dependency_count(), 2);

        context.dismount().unwrap();
        first.set(String::from("Grace"));
        assert_eq!(full.get().as_deref(), Some("Ada King"));
    }

    #[test]
    fn effect_from_failure_is_isolated() {
        let (sink, seen) = recording_sink();
        let context = Context::new();
        let store = SignalStore;
        let bindings = ReactiveBindings::new(&context, &store, Some(sink));

        let width = State::new(2);
        let height = State::new(3);
        let areas = Arc::new(Mutex::new(Vec::new()));
        let a = areas.clone();
        bindings.set_effect_from(&[width.clone(), height.clone()], move |sides: &[i32]| {
            if sides.iter().any(|side| *side < 0) {
                return Err("negative side");
            }
            a.lock().push(sides[0] * sides[1]);
            Ok(())
        });

        height.set(-1);
        width.set(4);
        height.set(5);

        assert_eq!(*areas.lock(), vec![6, 20]);
        assert_eq!(seen.lock().len(), 2);
        assert_eq!(width.subscriber_count(), 1);

        context.dismount().unwrap();
        assert_eq!(width.subscriber_count(), 0);
    }
}

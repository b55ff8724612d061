//! Reactive Primitives
//!
//! This module implements the reactive store the binding adapter builds on:
//! states, computed values and effects.
//!
//! # Concepts
//!
//! ## States
//!
//! A [`State`] is a container for mutable data. Reading it while a computed
//! value or effect runs registers that reaction as a dependent; writing it
//! re-runs every dependent.
//!
//! ## Computed values
//!
//! A [`Computed`] is a derived value. It is computed once on creation and
//! again every time a dependency changes.
//!
//! ## Effects
//!
//! An [`Effect`] synchronizes reactive data with the outside world. It runs
//! on creation and after every dependency change.
//!
//! ## Sources
//!
//! Every value exposes a [`Source`], the type-erased notification point
//! reactions subscribe to. Explicit dependency lists are slices of sources.
//!
//! # Implementation Notes
//!
//! Dependencies are detected with a thread-local tracking stack, the same
//! "transparent reactivity" approach used by SolidJS, Vue 3 and Leptos.
//! Notification is synchronous: `State::set` returns after every dependent
//! has re-run.

mod computed;
mod effect;
mod reaction;
mod source;
mod state;
mod store;
mod tracking;

pub use computed::Computed;
pub use effect::Effect;
pub use source::{Source, SourceId, Subscription};
pub use state::State;
pub use store::{ReactiveStore, SignalStore, Stop};
pub use tracking::{is_tracking, untracked};

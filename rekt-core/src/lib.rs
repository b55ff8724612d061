//! Rekt Core
//!
//! This crate provides the component lifecycle layer for the Rekt UI
//! framework. It implements:
//!
//! - A per-component lifecycle context that collects release actions and
//!   runs them once on dismount
//! - Failure isolation for user callbacks
//! - Reactive bindings (computed values, effects) tied to a context
//! - Timer bindings (timeouts, intervals) tied to a context
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `lifecycle`: [`Context`], release actions, and the server-side context
//! - `isolate`: the [`Isolated`] cell and error sinks
//! - `reactive`: a small signal store behind the [`ReactiveStore`] seam
//! - `timer`: the [`Scheduler`] seam with a tokio and a manual scheduler
//! - `bindings`: adapters that combine the above for a component body
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use rekt_core::{
//!     BoxError, Context, ManualScheduler, ReactiveBindings, SignalStore, State, TimerBindings,
//! };
//!
//! let context = Context::new();
//! let store = SignalStore;
//! let scheduler = Arc::new(ManualScheduler::new());
//!
//! let count = State::new(1);
//! let reactive = ReactiveBindings::new(&context, &store, None);
//! let c = count.clone();
//! let doubled = reactive.computed(move || Ok::<_, BoxError>(c.get() * 2));
//!
//! let timers = TimerBindings::new(&context, scheduler.clone(), None);
//! let c = count.clone();
//! timers.set_interval(
//!     move || {
//!         c.update(|n| n + 1);
//!         Ok::<_, BoxError>(())
//!     },
//!     Duration::from_millis(100),
//! );
//!
//! scheduler.advance(Duration::from_millis(300));
//! assert_eq!(doubled.get(), Some(8));
//!
//! context.dismount().unwrap();
//! scheduler.advance(Duration::from_millis(300));
//! assert_eq!(count.get(), 4);
//! ```

pub mod bindings;
pub mod error;
pub mod isolate;
pub mod lifecycle;
pub mod reactive;
pub mod timer;

pub use bindings::{ReactiveBindings, TimerBindings};
pub use error::{BoxError, IsolatedError, LifecycleError, SchedulerError};
pub use isolate::{error_sink, isolate, isolate_with, log_sink, ErrorSink, Isolated};
pub use lifecycle::{Context, ContextOptions, ReleaseAction, ResponseParts, ServerContext};
pub use reactive::{Computed, Effect, ReactiveStore, SignalStore, Source, State, Stop};
pub use timer::{ManualScheduler, Scheduler, TimerHandle, TokioScheduler};

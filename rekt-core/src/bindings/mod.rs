//! Component Bindings
//!
//! Adapters a component body uses to acquire resources. Both close over the
//! component's [`Context`](crate::lifecycle::Context): every binding they
//! create registers its teardown there, and every user callback they accept
//! runs inside an [`Isolated`](crate::isolate::Isolated) cell.
//!
//! - [`ReactiveBindings`]: computed values and effects.
//! - [`TimerBindings`]: timeouts and intervals.

mod reactive;
mod timers;

pub use reactive::ReactiveBindings;
pub use timers::TimerBindings;

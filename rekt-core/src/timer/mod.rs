//! Timers
//!
//! The [`Scheduler`] trait is the only way the crate touches time. Two
//! implementations are provided:
//!
//! - [`ManualScheduler`]: a virtual clock advanced by hand. Deterministic,
//!   suited to tests and to drivers that pump their own event loop.
//! - [`TokioScheduler`]: real timers as tasks on a tokio runtime.

mod runtime;
mod scheduler;

pub use runtime::TokioScheduler;
pub use scheduler::{ManualScheduler, Scheduler, TimerCallback, TimerHandle, MIN_INTERVAL};

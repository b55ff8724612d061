//! Component Lifecycle
//!
//! The mount driver creates a [`Context`] for every component instance it
//! runs, hands it to the component body, and calls
//! [`dismount`](Context::dismount) exactly once when the instance goes
//! away. Everything acquired in between is released through the context.
//!
//! The context owns release actions, never the resources themselves: a
//! computed value belongs to the reactive store and a timer to the
//! scheduler, and the context only holds the closure that stops or cancels
//! it.

mod context;
mod release;
mod server;

pub use context::{Context, ContextOptions};
pub use release::ReleaseAction;
pub use server::{ResponseParts, ServerContext};

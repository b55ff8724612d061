//! Timer bindings scoped to a component.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::error::BoxError;
use crate::isolate::{isolate, log_sink, ErrorSink};
use crate::lifecycle::{Context, ReleaseAction};
use crate::timer::{Scheduler, TimerCallback};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    Timeout,
    Interval,
}

/// Starts timers through `on_mount` and cancels them on dismount.
///
/// The handler runs failure-isolated: an error or panic is reported to the
/// sink and an interval keeps firing. Without a sink, failures are logged
/// at `error` level.
pub struct TimerBindings<'a> {
    /// Context the timers are mounted on.
    context: &'a Context,

    /// Host timer capability.
    scheduler: Arc<dyn Scheduler>,

    /// Receives handler failures.
    sink: ErrorSink,
}

impl<'a> TimerBindings<'a> {
    pub fn new(context: &'a Context, scheduler: Arc<dyn Scheduler>, sink: Option<ErrorSink>) -> Self {
        Self {
            context,
            scheduler,
            sink: sink.unwrap_or_else(log_sink),
        }
    }

    /// Run `handler` once after `delay`, unless the context is dismounted
    /// first.
    pub fn set_timeout<E, F>(&self, handler: F, delay: Duration)
    where
        E: Into<BoxError> + 'static,
        F: FnMut() -> Result<(), E> + Send + 'static,
    {
        self.arm(TimerKind::Timeout, delay, handler);
    }

    /// Run `handler` every `period` until the context is dismounted.
    pub fn set_interval<E, F>(&self, handler: F, period: Duration)
    where
        E: Into<BoxError> + 'static,
        F: FnMut() -> Result<(), E> + Send + 'static,
    {
        self.arm(TimerKind::Interval, period, handler);
    }

    fn arm<E, F>(&self, kind: TimerKind, duration: Duration, handler: F)
    where
        E: Into<BoxError> + 'static,
        F: FnMut() -> Result<(), E> + Send + 'static,
    {
        let scheduler = Arc::clone(&self.scheduler);
        let sink = self.sink.clone();
        let label = self.context.label().to_owned();

        self.context.on_mount(move || {
            let mut wrapped = isolate(Some(sink), handler);
            let callback: TimerCallback = Box::new(move || {
                wrapped();
            });

            let handle = match kind {
                TimerKind::Timeout => scheduler.start_timeout(duration, callback),
                TimerKind::Interval => scheduler.start_interval(duration, callback),
            };
            debug!(context = %label, ?kind, ?duration, handle = handle.raw(), "timer armed");

            Some(ReleaseAction::new(move || {
                match kind {
                    TimerKind::Timeout => scheduler.cancel_timeout(handle),
                    TimerKind::Interval => scheduler.cancel_interval(handle),
                }
                trace!(context = %label, handle = handle.raw(), "timer cancelled");
            }))
        });
    }
}

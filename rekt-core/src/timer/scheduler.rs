//! Timer Scheduling
//!
//! [`Scheduler`] is the host capability timers are started on. The binding
//! adapter never touches a clock directly; it hands a callback to the
//! scheduler and keeps the returned [`TimerHandle`] for cancellation.
//!
//! [`ManualScheduler`] keeps a virtual clock that only moves when
//! [`advance`](ManualScheduler::advance) is called. It is deterministic:
//! due timers fire in (due time, handle) order, so two timers due at the
//! same instant fire in the order they were started.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::trace;

/// Shortest allowed interval period. Shorter periods are clamped up.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Opaque identifier of a started timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Generate a new unique handle.
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw handle value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Callback invoked when a timer fires.
pub type TimerCallback = Box<dyn FnMut() + Send>;

/// Fire-once and repeating timers provided by the host.
///
/// Cancelling an unknown, already cancelled, or already fired handle is a
/// no-op.
pub trait Scheduler: Send + Sync {
    fn start_timeout(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;

    fn cancel_timeout(&self, handle: TimerHandle);

    fn start_interval(&self, period: Duration, callback: TimerCallback) -> TimerHandle;

    fn cancel_interval(&self, handle: TimerHandle);
}

struct ManualTimer {
    /// Virtual time of the next fire.
    due: Duration,

    /// Repeat period. `None` for timeouts.
    period: Option<Duration>,

    /// The callback. Taken out while it runs.
    callback: Option<TimerCallback>,
}

#[derive(Default)]
struct ManualState {
    /// Current virtual time, measured from creation.
    now: Duration,

    /// Armed timers by handle.
    timers: BTreeMap<TimerHandle, ManualTimer>,
}

/// A scheduler driven by an explicit virtual clock.
#[derive(Default)]
pub struct ManualScheduler {
    /// Clock and timer table, behind one lock.
    state: Mutex<ManualState>,
}

impl ManualScheduler {
    /// Create a scheduler with its clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed on the virtual clock.
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Number of timers that are armed and not yet cancelled or fired.
    pub fn active_timers(&self) -> usize {
        self.state.lock().timers.len()
    }

    /// Whether `handle` is still armed.
    pub fn is_active(&self, handle: TimerHandle) -> bool {
        self.state.lock().timers.contains_key(&handle)
    }

    /// Move the clock forward by `by`, firing every timer that falls due.
    ///
    /// Callbacks run with the scheduler unlocked and may start or cancel
    /// timers. A timer started by a callback fires within the same call if
    /// it falls due before the target time. The clock stops at
    /// `Duration::MAX`. Returns the number of fires.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.state.lock().now.saturating_add(by);
        let mut fired = 0;

        loop {
            let (handle, mut callback) = {
                let mut state = self.state.lock();

                let next = state
                    .timers
                    .iter()
                    .filter(|(_, timer)| timer.callback.is_some() && timer.due <= target)
                    .min_by_key(|(handle, timer)| (timer.due, **handle))
                    .map(|(handle, timer)| (*handle, timer.due));

                let Some((handle, due)) = next else {
                    state.now = target;
                    break;
                };
                state.now = due;

                let Some(timer) = state.timers.get_mut(&handle) else {
                    continue;
                };
                let Some(callback) = timer.callback.take() else {
                    continue;
                };
                if timer.period.is_none() {
                    state.timers.remove(&handle);
                }

                (handle, callback)
            };

            trace!(handle = handle.raw(), "manual timer fired");
            callback();
            fired += 1;

            // Re-arm intervals unless the callback cancelled them. An
            // interval whose next fire would pass the end of the clock retires.
            let mut state = self.state.lock();
            let retired = match state.timers.get_mut(&handle) {
                Some(ManualTimer {
                    due,
                    period: Some(period),
                    callback: slot,
                }) => {
                    let next = due.saturating_add(*period);
                    if next == *due {
                        true
                    } else {
                        *due = next;
                        *slot = Some(callback);
                        false
                    }
                }
                _ => false,
            };
            if retired {
                state.timers.remove(&handle);
            }
        }

        fired
    }

    fn start(
        &self,
        delay: Duration,
        period: Option<Duration>,
        callback: TimerCallback,
    ) -> TimerHandle {
        let handle = TimerHandle::next();
        let mut state = self.state.lock();
        let due = state.now.saturating_add(delay);
        state.timers.insert(
            handle,
            ManualTimer {
                due,
                period,
                callback: Some(callback),
            },
        );
        handle
    }

    fn cancel(&self, handle: TimerHandle) {
        self.state.lock().timers.remove(&handle);
    }
}

impl Scheduler for ManualScheduler {
    fn start_timeout(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        self.start(delay, None, callback)
    }

    fn cancel_timeout(&self, handle: TimerHandle) {
        self.cancel(handle);
    }

    fn start_interval(&self, period: Duration, callback: TimerCallback) -> TimerHandle {
        let period = period.max(MIN_INTERVAL);
        self.start(period, Some(period), callback)
    }

    fn cancel_interval(&self, handle: TimerHandle) {
        self.cancel(handle);
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ManualScheduler")
            .field("now", &state.now)
            .field("active_timers", &state.timers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> TimerCallback) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_clone = log.clone();
        let make = move |name: &'static str| -> TimerCallback {
            let log = log_clone.clone();
            Box::new(move || log.lock().push(name))
        };
        (log, make)
    }

    #[test]
    fn timeout_fires_once_when_due() {
        let scheduler = ManualScheduler::new();
        let (log, make) = recorder();

        let handle = scheduler.start_timeout(Duration::from_millis(100), make("t"));
        assert_eq!(scheduler.advance(Duration::from_millis(99)), 0);
        assert!(scheduler.is_active(handle));

        assert_eq!(scheduler.advance(Duration::from_millis(1)), 1);
        assert_eq!(scheduler.advance(Duration::from_secs(1)), 0);
        assert_eq!(*log.lock(), vec!["t"]);
        assert_eq!(scheduler.active_timers(), 0);
    }

    #[test]
    fn interval_repeats_until_cancelled() {
        let scheduler = ManualScheduler::new();
        let (log, make) = recorder();

        let handle = scheduler.start_interval(Duration::from_millis(10), make("i"));
        assert_eq!(scheduler.advance(Duration::from_millis(35)), 3);

        scheduler.cancel_interval(handle);
        scheduler.cancel_interval(handle);
        assert_eq!(scheduler.advance(Duration::from_millis(100)), 0);
        assert_eq!(log.lock().len(), 3);
    }

    #[test]
    fn timers_fire_in_due_then_start_order() {
        let scheduler = ManualScheduler::new();
        let (log, make) = recorder();

        scheduler.start_timeout(Duration::from_millis(20), make("late"));
        scheduler.start_timeout(Duration::from_millis(10), make("first"));
        scheduler.start_timeout(Duration::from_millis(10), make("second"));

        scheduler.advance(Duration::from_millis(20));
        assert_eq!(*log.lock(), vec!["first", "second", "late"]);
        assert_eq!(scheduler.now(), Duration::from_millis(20));
    }

    #[test]
    fn zero_period_is_clamped() {
        let scheduler = ManualScheduler::new();
        let (log, make) = recorder();

        scheduler.start_interval(Duration::ZERO, make("z"));
        assert_eq!(scheduler.advance(Duration::from_millis(3)), 3);
        assert_eq!(log.lock().len(), 3);
    }

    #[test]
    fn callback_may_cancel_its_own_interval() {
        let scheduler = Arc::new(ManualScheduler::new());
        let slot: Arc<Mutex<Option<TimerHandle>>> = Arc::new(Mutex::new(None));

        let (inner, slot_clone) = (scheduler.clone(), slot.clone());
        let handle = scheduler.start_interval(
            Duration::from_millis(5),
            Box::new(move || {
                if let Some(handle) = *slot_clone.lock() {
                    inner.cancel_interval(handle);
                }
            }),
        );
        *slot.lock() = Some(handle);

        assert_eq!(scheduler.advance(Duration::from_millis(50)), 1);
        assert!(!scheduler.is_active(handle));
    }

    #[test]
    fn callback_may_start_timers() {
        let scheduler = Arc::new(ManualScheduler::new());
        let (log, make) = recorder();

        let inner = scheduler.clone();
        let mut follow_up = Some(make("follow-up"));
        scheduler.start_timeout(
            Duration::from_millis(5),
            Box::new(move || {
                if let Some(callback) = follow_up.take() {
                    inner.start_timeout(Duration::from_millis(5), callback);
                }
            }),
        );

        assert_eq!(scheduler.advance(Duration::from_millis(10)), 2);
        assert_eq!(*log.lock(), vec!["follow-up"]);
    }

    #[test]
    fn clock_saturates_instead_of_overflowing() {
        let scheduler = ManualScheduler::new();
        let (log, make) = recorder();

        scheduler.start_timeout(Duration::from_millis(5), make("early"));
        assert_eq!(scheduler.advance(Duration::MAX), 1);
        assert_eq!(scheduler.now(), Duration::MAX);

        assert_eq!(scheduler.advance(Duration::from_secs(1)), 0);
        assert_eq!(scheduler.now(), Duration::MAX);

        scheduler.start_timeout(Duration::from_secs(1), make("late"));
        assert_eq!(scheduler.advance(Duration::ZERO), 1);
        assert_eq!(*log.lock(), vec!["early", "late"]);
    }

    #[test]
    fn interval_at_end_of_clock_retires() {
        let scheduler = ManualScheduler::new();
        let (log, make) = recorder();

        scheduler.advance(Duration::MAX);
        let handle = scheduler.start_interval(Duration::from_millis(10), make("tick"));

        assert_eq!(scheduler.advance(Duration::ZERO), 1);
        assert!(!scheduler.is_active(handle));
        assert_eq!(scheduler.active_timers(), 0);
        assert_eq!(*log.lock(), vec!["tick"]);
    }
}

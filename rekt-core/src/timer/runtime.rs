//! Tokio-backed scheduler.
//!
//! Each timer is a task spawned on a captured runtime handle. The task
//! table maps handles to join handles so cancellation can abort the task.
//! A task waits until its table entry exists before starting its clock, so
//! a timeout that fires immediately still finds its own entry to remove.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::trace;

use super::scheduler::{Scheduler, TimerCallback, TimerHandle, MIN_INTERVAL};
use crate::error::SchedulerError;

/// Runs timers as tasks on a tokio runtime.
#[derive(Clone)]
pub struct TokioScheduler {
    /// Runtime the timer tasks are spawned on.
    runtime: Handle,

    /// Live timer tasks. Timeouts remove themselves when they fire.
    tasks: Arc<DashMap<TimerHandle, JoinHandle<()>>>,
}

impl TokioScheduler {
    /// Spawn timers on the given runtime.
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            tasks: Arc::new(DashMap::new()),
        }
    }

    /// Spawn timers on the runtime the caller is running in.
    pub fn current() -> Result<Self, SchedulerError> {
        Ok(Self::new(Handle::try_current()?))
    }

    /// Number of timers that have not fired (timeouts) or been cancelled.
    pub fn active_timers(&self) -> usize {
        self.tasks.len()
    }

    fn spawn<F>(&self, handle: TimerHandle, timer: F) -> TimerHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (registered, on_registered) = oneshot::channel::<()>();
        let task = self.runtime.spawn(async move {
            if on_registered.await.is_ok() {
                timer.await;
            }
        });

        self.tasks.insert(handle, task);
        // The receiver is gone only if the task was aborted already.
        let _ = registered.send(());
        handle
    }

    fn cancel(&self, handle: TimerHandle) {
        if let Some((_, task)) = self.tasks.remove(&handle) {
            task.abort();
            trace!(handle = handle.raw(), "tokio timer cancelled");
        }
    }
}

impl Scheduler for TokioScheduler {
    fn start_timeout(&self, delay: Duration, mut callback: TimerCallback) -> TimerHandle {
        let handle = TimerHandle::next();
        let tasks = Arc::clone(&self.tasks);

        self.spawn(handle, async move {
            time::sleep(delay).await;
            tasks.remove(&handle);
            callback();
        })
    }

    fn cancel_timeout(&self, handle: TimerHandle) {
        self.cancel(handle);
    }

    fn start_interval(&self, period: Duration, mut callback: TimerCallback) -> TimerHandle {
        let handle = TimerHandle::next();
        let period = period.max(MIN_INTERVAL);

        self.spawn(handle, async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                callback();
            }
        })
    }

    fn cancel_interval(&self, handle: TimerHandle) {
        self.cancel(handle);
    }
}

impl std::fmt::Debug for TokioScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioScheduler")
            .field("active_timers", &self.active_timers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, TimerCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let callback: TimerCallback = Box::new(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        (count, callback)
    }

    #[test]
    fn current_requires_a_runtime() {
        assert!(matches!(
            TokioScheduler::current(),
            Err(SchedulerError::NoRuntime(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_fires_after_delay() {
        let scheduler = TokioScheduler::current().unwrap();
        let (count, callback) = counter();

        scheduler.start_timeout(Duration::from_millis(100), callback);
        assert_eq!(scheduler.active_timers(), 1);

        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_millis(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.active_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timeout_never_fires() {
        let scheduler = TokioScheduler::current().unwrap();
        let (count, callback) = counter();

        let handle = scheduler.start_timeout(Duration::from_millis(10), callback);
        scheduler.cancel_timeout(handle);
        scheduler.cancel_timeout(handle);

        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.active_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_ticks_until_cancelled() {
        let scheduler = TokioScheduler::current().unwrap();
        let (count, callback) = counter();

        let handle = scheduler.start_interval(Duration::from_millis(10), callback);

        time::sleep(Duration::from_millis(35)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        scheduler.cancel_interval(handle);
        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn immediate_timeouts_leave_no_stale_entries() {
        let scheduler = TokioScheduler::current().unwrap();

        for _ in 0..32 {
            let (done, fired) = oneshot::channel::<()>();
            let mut done = Some(done);
            scheduler.start_timeout(
                Duration::ZERO,
                Box::new(move || {
                    if let Some(done) = done.take() {
                        let _ = done.send(());
                    }
                }),
            );
            fired.await.unwrap();
        }

        assert_eq!(scheduler.active_timers(), 0);
    }
}

//! Reactions
//!
//! The machinery shared by [`Computed`](super::Computed) and
//! [`Effect`](super::Effect): a body that re-runs whenever one of its
//! sources notifies.
//!
//! Auto-tracked reactions re-collect their sources on every run, so a
//! branch that stops reading a value also stops depending on it. Reactions
//! built with explicit dependencies run untracked and keep the sources they
//! were given.
//!
//! Runs never overlap. A notification that arrives mid-run is queued as a
//! single pending flag and served by the thread already running the body.
//!
//! Listeners hold the reaction weakly. The handle types own it, and
//! dropping the last handle unsubscribes it from everything.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use super::source::{Source, Subscription};
use super::tracking;

pub(crate) struct Reaction {
    /// Kind of handle that owns this reaction, for logging.
    kind: &'static str,

    /// The body. Locked for the duration of a run.
    run: Mutex<Box<dyn FnMut() + Send>>,

    /// Whether the sources were given up front instead of collected.
    explicit: bool,

    /// Live subscriptions to the current sources.
    subscriptions: Mutex<Vec<Subscription>>,

    /// Set by every notification, cleared by the run that serves it.
    pending: AtomicBool,

    /// Whether `stop` has been called.
    stopped: AtomicBool,

    /// Number of completed runs.
    runs: AtomicUsize,
}

impl Reaction {
    pub(crate) fn new<F>(kind: &'static str, run: F, explicit: bool) -> Arc<Self>
    where
        F: FnMut() + Send + 'static,
    {
        Arc::new(Self {
            kind,
            run: Mutex::new(Box::new(run)),
            explicit,
            subscriptions: Mutex::new(Vec::new()),
            pending: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            runs: AtomicUsize::new(0),
        })
    }

    /// Replace the current subscriptions with listeners on `sources`.
    pub(crate) fn attach(self: &Arc<Self>, sources: &[Source]) {
        if self.is_stopped() {
            return;
        }

        let fresh: Vec<Subscription> = sources
            .iter()
            .map(|source| {
                let weak = Arc::downgrade(self);
                source.subscribe(move || {
                    if let Some(reaction) = weak.upgrade() {
                        reaction.execute();
                    }
                })
            })
            .collect();

        let stale = std::mem::replace(&mut *self.subscriptions.lock(), fresh);
        drop(stale);
    }

    /// Run the body, or hand the run to whoever is running it already.
    ///
    /// A notification that arrives while the body is running, on this
    /// thread or another, marks the reaction pending. The runner repeats the
    /// body until nothing is pending, so the last run always sees the latest
    /// values.
    pub(crate) fn execute(self: &Arc<Self>) {
        if self.is_stopped() {
            return;
        }
        self.pending.store(true, Ordering::SeqCst);

        loop {
            let Some(mut run) = self.run.try_lock() else {
                trace!(kind = self.kind, "reaction busy, run deferred to current runner");
                return;
            };

            while self.pending.swap(false, Ordering::SeqCst) && !self.is_stopped() {
                if self.explicit {
                    tracking::untracked(&mut **run);
                } else {
                    let ((), sources) = tracking::collect(&mut **run);
                    self.attach(&sources);
                }
                self.runs.fetch_add(1, Ordering::SeqCst);
            }
            drop(run);

            // A notification can land between the last swap and the unlock.
            if !self.pending.load(Ordering::SeqCst) || self.is_stopped() {
                return;
            }
        }
    }

    /// Stop reacting. Idempotent.
    pub(crate) fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        let subscriptions = std::mem::take(&mut *self.subscriptions.lock());
        trace!(kind = self.kind, released = subscriptions.len(), "reaction stopped");
        drop(subscriptions);
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub(crate) fn run_count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub(crate) fn dependency_count(&self) -> usize {
        self.subscriptions.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::State;
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn reaction_follows_its_latest_reads() {
        let flag = State::new(true);
        let left = State::new(1);
        let right = State::new(2);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let (f, l, r, s) = (flag.clone(), left.clone(), right.clone(), seen.clone());
        let reaction = Reaction::new(
            "test",
            move || {
                let value = if f.get() { l.get() } else { r.get() };
                s.lock().push(value);
            },
            false,
        );
        reaction.execute();
        assert_eq!(reaction.dependency_count(), 2);

        flag.set(false);
        right.set(3);
        // No longer reads `left`.
        left.set(100);

        assert_eq!(*seen.lock(), vec![1, 2, 3]);
        assert_eq!(reaction.run_count(), 3);
    }

    #[test]
    fn explicit_reaction_ignores_reads() {
        let trigger = State::new(0);
        let other = State::new(0);
        let count = Arc::new(AtomicUsize::new(0));

        let (o, c) = (other.clone(), count.clone());
        let reaction = Reaction::new(
            "test",
            move || {
                o.get();
                c.fetch_add(1, Ordering::SeqCst);
            },
            true,
        );
        reaction.attach(&[trigger.source()]);
        reaction.execute();

        other.set(1);
        trigger.set(1);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn stopped_reaction_releases_sources() {
        let state = State::new(0);
        let s = state.clone();
        let reaction = Reaction::new(
            "test",
            move || {
                s.get();
            },
            false,
        );
        reaction.execute();
        assert_eq!(state.subscriber_count(), 1);

        reaction.stop();
        reaction.stop();
        assert!(reaction.is_stopped());
        assert_eq!(state.subscriber_count(), 0);

        reaction.execute();
        assert_eq!(reaction.run_count(), 1);
    }

    #[test]
    fn self_triggering_reaction_settles() {
        let state = State::new(0);
        let s = state.clone();
        let reaction = Reaction::new(
            "test",
            move || {
                let value = s.get();
                if value < 5 {
                    s.set(value + 1);
                }
            },
            false,
        );
        reaction.execute();
        // Not yet subscribed during the first run.
        assert_eq!(state.get_untracked(), 1);
        assert_eq!(reaction.run_count(), 1);

        state.set(2);
        assert_eq!(state.get_untracked(), 5);
        assert_eq!(reaction.run_count(), 5);
    }

    #[test]
    fn notification_from_another_thread_mid_run_is_served() {
        let state = State::new(0);
        let entered = Arc::new(Barrier::new(2));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let (s, e, log) = (state.clone(), entered.clone(), seen.clone());
        let reaction = Reaction::new(
            "test",
            move || {
                let value = s.get();
                if value == 1 {
                    e.wait();
                    thread::sleep(Duration::from_millis(50));
                }
                log.lock().push(value);
            },
            false,
        );
        reaction.execute();

        let writer = {
            let state = state.clone();
            thread::spawn(move || state.set(1))
        };
        entered.wait();
        state.set(2);
        writer.join().unwrap();

        assert_eq!(seen.lock().last(), Some(&2));
    }

    #[test]
    fn dropping_the_reaction_unsubscribes() {
        let state = State::new(0);
        let s = state.clone();
        let reaction = Reaction::new(
            "test",
            move || {
                s.get();
            },
            false,
        );
        reaction.execute();
        assert_eq!(state.subscriber_count(), 1);

        drop(reaction);
        assert_eq!(state.subscriber_count(), 0);
    }
}

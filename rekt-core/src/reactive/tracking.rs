//! Dependency Tracking
//!
//! While a reaction runs, every [`State`](super::State) it reads records its
//! [`Source`] in the innermost tracking frame. When the run finishes the
//! frame is popped and the reaction subscribes to exactly those sources.
//!
//! # Implementation
//!
//! Frames live on a thread-local stack. Nested frames are independent: a
//! computed value read inside an effect tracks into its own frame, not the
//! effect's. An untracked frame swallows reads without recording them.

use std::cell::RefCell;

use super::source::Source;

thread_local! {
    static FRAMES: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

struct Frame {
    tracking: bool,
    sources: Vec<Source>,
}

/// Pops its frame when dropped, so a panicking computation leaves the
/// stack balanced.
struct FrameGuard {
    depth: usize,
    popped: bool,
}

impl FrameGuard {
    fn push(tracking: bool) -> Self {
        let depth = FRAMES.with(|frames| {
            let mut frames = frames.borrow_mut();
            frames.push(Frame {
                tracking,
                sources: Vec::new(),
            });
            frames.len()
        });

        Self {
            depth,
            popped: false,
        }
    }

    fn finish(mut self) -> Vec<Source> {
        self.popped = true;
        self.pop()
    }

    fn pop(&self) -> Vec<Source> {
        FRAMES.with(|frames| {
            let mut frames = frames.borrow_mut();
            debug_assert_eq!(
                frames.len(),
                self.depth,
                "tracking frame mismatch: expected depth {}, found {}",
                self.depth,
                frames.len()
            );
            frames.pop().map(|frame| frame.sources).unwrap_or_default()
        })
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        if !self.popped {
            self.pop();
        }
    }
}

/// Run `f` in a fresh tracking frame and return the sources it read, in
/// first-read order and without duplicates.
pub(crate) fn collect<R>(f: impl FnOnce() -> R) -> (R, Vec<Source>) {
    let guard = FrameGuard::push(true);
    let result = f();
    (result, guard.finish())
}

/// Run `f` without recording any reads.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _guard = FrameGuard::push(false);
    f()
}

/// Whether reads are currently being recorded.
pub fn is_tracking() -> bool {
    FRAMES.with(|frames| frames.borrow().last().is_some_and(|frame| frame.tracking))
}

/// Record a read of `source` in the innermost frame.
pub(crate) fn track(source: &Source) {
    FRAMES.with(|frames| {
        if let Some(frame) = frames.borrow_mut().last_mut() {
            if frame.tracking && !frame.sources.iter().any(|s| s.id() == source.id()) {
                frame.sources.push(source.clone());
            }
        }
    });
}

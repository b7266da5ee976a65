//! Usage tracking.
//!
//! The tracker is the read-side half of dependency tracking: while a
//! tracking frame is active on the current thread, every tracked signal
//! read registers a [`Usage`] with it. The caller that opened the frame
//! ends up with one handle covering everything the computation read, which
//! an external scheduler can then turn into re-run scheduling.
//!
//! # Implementation
//!
//! Frames form a thread-local stack so tracked computations nest: an inner
//! frame collects its own usages without polluting the outer one, and
//! [`UsageTracker::untracked`] pushes a suspension frame that hides any
//! active tracker for the duration of a closure. A guard pops the frame on
//! drop, so the stack stays balanced even if the computation panics.

use std::cell::RefCell;

use super::usage::{CombinedUsage, NoUsage, Usage};

thread_local! {
    /// Tracking frames for the current thread, innermost last.
    static FRAME_STACK: RefCell<Vec<Frame>> = RefCell::new(Vec::new());
}

enum Frame {
    /// An active tracked computation collecting usages.
    Tracking(Vec<Box<dyn Usage>>),
    /// Tracking explicitly suspended.
    Suspended,
}

/// Thread-scoped collector of the usages produced by tracked reads.
///
/// # Example
///
/// ```rust,ignore
/// let (total, usage) = UsageTracker::track(|| {
///     price.get().unwrap() * quantity.get().unwrap()
/// });
///
/// // Re-render when either input changes.
/// usage.on_next_change(Box::new(move |_| {
///     schedule_rerender();
///     false
/// }));
/// ```
pub struct UsageTracker;

impl UsageTracker {
    /// Whether a tracking frame is active on the calling thread.
    pub fn is_active() -> bool {
        FRAME_STACK.with(|stack| matches!(stack.borrow().last(), Some(Frame::Tracking(_))))
    }

    /// Registers a usage with the innermost tracking frame. Ignored when
    /// tracking is inactive or suspended.
    pub fn register_usage(usage: Box<dyn Usage>) {
        FRAME_STACK.with(|stack| {
            if let Some(Frame::Tracking(usages)) = stack.borrow_mut().last_mut() {
                usages.push(usage);
            }
        });
    }

    /// Runs `f` with tracking active and returns its result together with a
    /// usage covering every signal read during the run.
    ///
    /// A run that reads no signals yields a usage that never reports
    /// changes; a run that reads one signal yields that signal's usage
    /// directly; several reads are merged into a [`CombinedUsage`].
    pub fn track<R>(f: impl FnOnce() -> R) -> (R, Box<dyn Usage>) {
        let guard = FrameGuard::push(Frame::Tracking(Vec::new()));
        let result = f();
        let usages = match guard.pop() {
            Frame::Tracking(usages) => usages,
            Frame::Suspended => unreachable!("tracking frame replaced while active"),
        };

        let usage: Box<dyn Usage> = match usages.len() {
            0 => Box::new(NoUsage),
            1 => usages.into_iter().next().expect("length checked above"),
            _ => Box::new(CombinedUsage::new(usages)),
        };
        (result, usage)
    }

    /// Runs `f` with tracking suspended, even inside an active tracked
    /// computation. Reads inside `f` create no dependency edges.
    pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
        let _guard = FrameGuard::push(Frame::Suspended);
        f()
    }
}

/// Pops the pushed frame when dropped, keeping the stack balanced across
/// panics.
struct FrameGuard {
    armed: bool,
}

impl FrameGuard {
    fn push(frame: Frame) -> Self {
        FRAME_STACK.with(|stack| stack.borrow_mut().push(frame));
        Self { armed: true }
    }

    /// Pops and returns the frame, disarming the drop handler.
    fn pop(mut self) -> Frame {
        self.armed = false;
        FRAME_STACK.with(|stack| {
            stack
                .borrow_mut()
                .pop()
                .expect("tracking frame stack underflow")
        })
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        if self.armed {
            FRAME_STACK.with(|stack| {
                stack.borrow_mut().pop();
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use crate::signal::{CleanupHandle, TransientListener};

    struct TestUsage {
        changed: Arc<AtomicBool>,
    }

    impl Usage for TestUsage {
        fn has_changes(&self) -> bool {
            self.changed.load(Ordering::SeqCst)
        }

        fn on_next_change(&self, _listener: Box<dyn TransientListener>) -> CleanupHandle {
            CleanupHandle::noop()
        }
    }

    fn test_usage(changed: &Arc<AtomicBool>) -> Box<dyn Usage> {
        Box::new(TestUsage {
            changed: Arc::clone(changed),
        })
    }

    #[test]
    fn inactive_outside_track() {
        assert!(!UsageTracker::is_active());
    }

    #[test]
    fn active_inside_track_inactive_after() {
        let ((), _usage) = UsageTracker::track(|| {
            assert!(UsageTracker::is_active());
        });

        assert!(!UsageTracker::is_active());
    }

    #[test]
    fn untracked_suspends_active_tracker() {
        UsageTracker::track(|| {
            assert!(UsageTracker::is_active());

            UsageTracker::untracked(|| {
                assert!(!UsageTracker::is_active());
            });

            assert!(UsageTracker::is_active());
        });
    }

    #[test]
    fn track_returns_closure_result() {
        let (value, _usage) = UsageTracker::track(|| 42);
        assert_eq!(value, 42);
    }

    #[test]
    fn no_reads_yield_changeless_usage() {
        let ((), usage) = UsageTracker::track(|| {});
        assert!(!usage.has_changes());
    }

    #[test]
    fn single_usage_passed_through() {
        let changed = Arc::new(AtomicBool::new(false));

        let ((), usage) = UsageTracker::track(|| {
            UsageTracker::register_usage(test_usage(&changed));
        });

        assert!(!usage.has_changes());
        changed.store(true, Ordering::SeqCst);
        assert!(usage.has_changes());
    }

    #[test]
    fn multiple_usages_combined() {
        let first = Arc::new(AtomicBool::new(false));
        let second = Arc::new(AtomicBool::new(false));

        let ((), usage) = UsageTracker::track(|| {
            UsageTracker::register_usage(test_usage(&first));
            UsageTracker::register_usage(test_usage(&second));
        });

        assert!(!usage.has_changes());
        second.store(true, Ordering::SeqCst);
        assert!(usage.has_changes());
    }

    #[test]
    fn register_outside_frame_is_ignored() {
        let changed = Arc::new(AtomicBool::new(false));
        UsageTracker::register_usage(test_usage(&changed));
        // Nothing to assert beyond not panicking; the usage went nowhere.
    }

    #[test]
    fn nested_frames_collect_independently() {
        let outer_read = Arc::new(AtomicBool::new(false));
        let inner_read = Arc::new(AtomicBool::new(false));

        let ((), outer_usage) = UsageTracker::track(|| {
            UsageTracker::register_usage(test_usage(&outer_read));

            let ((), inner_usage) = UsageTracker::track(|| {
                UsageTracker::register_usage(test_usage(&inner_read));
            });

            inner_read.store(true, Ordering::SeqCst);
            assert!(inner_usage.has_changes());
        });

        // The inner frame's usage never leaked into the outer frame.
        assert!(!outer_usage.has_changes());

        outer_read.store(true, Ordering::SeqCst);
        assert!(outer_usage.has_changes());
    }

    #[test]
    fn panic_inside_track_pops_frame() {
        let result = std::panic::catch_unwind(|| {
            UsageTracker::track(|| {
                panic!("inside tracked computation");
            })
        });

        assert!(result.is_err());
        assert!(!UsageTracker::is_active());
    }
}

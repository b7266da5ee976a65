//! Usage handles produced by tracked reads.
//!
//! A [`Usage`] is a snapshot-plus-subscription handle: it remembers the
//! state a signal was in when it was read and can answer whether anything
//! has changed since, or deliver a callback on the next change. Usages are
//! what dependency tracking is made of; the runtime collects them during a
//! tracked computation and the caller turns them into re-run scheduling.
//!
//! # Combining
//!
//! A computation usually reads several signals. [`CombinedUsage`] merges
//! their usages into a single handle that reports changes when any
//! constituent does and delivers a registered listener at most once per
//! change, regardless of which constituent fired.

use std::sync::Arc;

use parking_lot::Mutex;

use super::listener::{CleanupHandle, TransientListener};

/// Snapshot-plus-subscription handle produced by a tracked signal read.
pub trait Usage: Send {
    /// Whether the underlying signal has changed since this usage was
    /// captured. Once `true`, it stays `true` for the lifetime of the
    /// handle; a fresh read produces a fresh usage.
    fn has_changes(&self) -> bool;

    /// Registers a listener for the next change.
    ///
    /// If a change already happened since the usage was captured, the
    /// listener is invoked immediately with the `already_changed` flag set,
    /// and is subscribed for further changes only if it returns `true`.
    ///
    /// Registering the same listener through two usages of the same signal
    /// subscribes it twice; deduplication is the caller's concern.
    fn on_next_change(&self, listener: Box<dyn TransientListener>) -> CleanupHandle;
}

/// A usage that never changes. Returned by tracked computations that read
/// no signals at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUsage;

impl Usage for NoUsage {
    fn has_changes(&self) -> bool {
        false
    }

    fn on_next_change(&self, _listener: Box<dyn TransientListener>) -> CleanupHandle {
        CleanupHandle::noop()
    }
}

/// Several usages merged into one.
///
/// `has_changes` is live: it reports `true` while any constituent does.
/// A listener registered through `on_next_change` is shared between all
/// constituents and invoked at most once per change; when it declines
/// renewal, the registrations with the remaining constituents are removed
/// as well.
pub struct CombinedUsage {
    usages: Vec<Box<dyn Usage>>,
}

impl CombinedUsage {
    /// Combines the given usages into a single handle.
    pub fn new(usages: Vec<Box<dyn Usage>>) -> Self {
        Self { usages }
    }
}

/// State shared between the per-constituent delegate listeners of one
/// combined registration.
struct DelegateState {
    listener: Box<dyn TransientListener>,
    stopped: bool,
    cleanups: Vec<Option<CleanupHandle>>,
}

impl DelegateState {
    /// Takes every recorded sibling cleanup, optionally leaving out the
    /// constituent that is currently firing (its registration is dropped by
    /// the notification pass itself, and removing it here would retake a
    /// lock that is already held).
    fn take_cleanups(&mut self, skip: Option<usize>) -> Vec<CleanupHandle> {
        self.cleanups
            .iter_mut()
            .enumerate()
            .filter(|(index, _)| Some(*index) != skip)
            .filter_map(|(_, slot)| slot.take())
            .collect()
    }
}

impl Usage for CombinedUsage {
    fn has_changes(&self) -> bool {
        self.usages.iter().any(|usage| usage.has_changes())
    }

    fn on_next_change(&self, listener: Box<dyn TransientListener>) -> CleanupHandle {
        let state = Arc::new(Mutex::new(DelegateState {
            listener,
            stopped: false,
            cleanups: Vec::with_capacity(self.usages.len()),
        }));

        for (index, usage) in self.usages.iter().enumerate() {
            let delegate = {
                let state = Arc::clone(&state);
                move |already_changed: bool| {
                    let mut guard = state.lock();
                    if guard.stopped {
                        return false;
                    }
                    if guard.listener.invoke(already_changed) {
                        return true;
                    }
                    guard.stopped = true;
                    let siblings = guard.take_cleanups(Some(index));
                    drop(guard);
                    for cleanup in siblings {
                        cleanup.cleanup();
                    }
                    false
                }
            };

            let handle = usage.on_next_change(Box::new(delegate));

            let mut guard = state.lock();
            if guard.stopped {
                // The listener fired during this registration and declined
                // renewal; the handle has nothing live behind it.
                drop(guard);
                handle.cleanup();
                break;
            }
            guard.cleanups.push(Some(handle));
        }

        CleanupHandle::new(move || {
            let mut guard = state.lock();
            guard.stopped = true;
            let handles = guard.take_cleanups(None);
            drop(guard);
            for handle in handles {
                handle.cleanup();
            }
        })
    }
}

impl std::fmt::Debug for CombinedUsage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombinedUsage")
            .field("usages", &self.usages.len())
            .finish()
    }
}

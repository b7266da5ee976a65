//! Shared signal machinery.
//!
//! Every local signal flavor is built on the same per-instance state: a
//! mutex, a monotonically increasing version counter, a transient listener
//! list and an in-place-modification flag. This module owns that state and
//! the three algorithms on it that every signal shares:
//!
//! 1. Precondition checks: no operation runs inside an ambient transaction
//!    or while an in-place modification is in flight.
//!
//! 2. The notification pass: bump the version, swap the listener list for an
//!    empty one, invoke the drained listeners, and re-add only those that
//!    ask to stay subscribed. Draining before invoking bounds the pass to
//!    the listeners known when the change happened and keeps a listener
//!    from being notified twice for one change.
//!
//! 3. Usage capture: a tracked read registers a [`Usage`] snapshot taken at
//!    the version seen in the same critical section as the returned value.
//!
//! # Locking
//!
//! The mutex is not reentrant. Listener callbacks and `update` closures run
//! while it is held and must not call back into the same signal instance;
//! doing so deadlocks. The in-place modification path is the exception: its
//! mutator runs with the lock released and the flag as the only guard.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use smallvec::SmallVec;

use super::error::{SignalError, SignalResult};
use super::listener::{CleanupHandle, TransientListener};
use super::tracker::UsageTracker;
use super::transaction::Transaction;
use super::usage::Usage;

/// Counter for generating unique signal ids.
static SIGNAL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generates a new unique signal id.
pub(crate) fn next_signal_id() -> u64 {
    SIGNAL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

type ListenerEntry = (u64, Box<dyn TransientListener>);

/// Lock-guarded state shared by all flavors of local signal.
pub(crate) struct LocalState<T> {
    /// The current value. Vacated only while an in-place modification runs
    /// its mutator outside the lock.
    slot: Option<T>,

    /// Bumped by every completed write, never reset.
    version: u64,

    /// Listeners waiting for the next change, in registration order. Most
    /// signals have none or a handful, hence the inline capacity.
    listeners: SmallVec<[ListenerEntry; 2]>,

    /// Source of per-instance listener ids, used for removal.
    next_listener_id: u64,

    /// Set while an in-place modification is in flight; every other
    /// operation on the instance fails fast as long as it is.
    modify_in_progress: bool,
}

impl<T> LocalState<T> {
    fn new(value: T) -> Self {
        Self {
            slot: Some(value),
            version: 0,
            listeners: SmallVec::new(),
            next_listener_id: 0,
            modify_in_progress: false,
        }
    }

    /// Checks that the calling context may operate on the signal at all.
    pub(crate) fn check_preconditions(&self) -> SignalResult<()> {
        if Transaction::in_transaction() {
            return Err(SignalError::TransactionActive);
        }
        if self.modify_in_progress {
            return Err(SignalError::ConcurrentModification);
        }
        Ok(())
    }

    /// The current value. Callers reach this only after the precondition
    /// checks, so the slot is always occupied here.
    pub(crate) fn value(&self) -> &T {
        self.slot
            .as_ref()
            .expect("value slot vacated outside a modify pass")
    }

    pub(crate) fn value_mut(&mut self) -> &mut T {
        self.slot
            .as_mut()
            .expect("value slot vacated outside a modify pass")
    }

    /// Stores `value` and returns the previous one, without notifying.
    pub(crate) fn replace_value(&mut self, value: T) -> T {
        self.slot
            .replace(value)
            .expect("value slot vacated outside a modify pass")
    }

    /// The value as currently stored, `None` while a mutator is running.
    pub(crate) fn try_value(&self) -> Option<&T> {
        self.slot.as_ref()
    }

    /// Vacates the value slot for an in-place modification.
    pub(crate) fn take_value(&mut self) -> T {
        self.slot
            .take()
            .expect("value slot vacated outside a modify pass")
    }

    /// Puts the value back after an in-place modification.
    pub(crate) fn restore_value(&mut self, value: T) {
        debug_assert!(
            self.slot.is_none(),
            "value slot occupied during a modify pass"
        );
        self.slot = Some(value);
    }

    pub(crate) fn set_modify_in_progress(&mut self, in_progress: bool) {
        self.modify_in_progress = in_progress;
    }

    pub(crate) fn version(&self) -> u64 {
        self.version
    }

    /// Bumps the version and runs the drain-and-requeue notification pass.
    ///
    /// Runs with the state lock held (all access goes through the mutex), so
    /// no listener can be added or removed while the pass is underway and
    /// each pass covers exactly the listeners registered before it.
    pub(crate) fn notify_listeners(&mut self) {
        self.version += 1;
        let pass: SmallVec<[ListenerEntry; 2]> = std::mem::take(&mut self.listeners);
        tracing::trace!(version = self.version, listeners = pass.len(), "signal changed");
        for (id, mut listener) in pass {
            if listener.invoke(false) {
                self.listeners.push((id, listener));
            }
        }
    }

    fn add_listener(&mut self, listener: Box<dyn TransientListener>) -> u64 {
        let id = self.next_listener_id;
        self.next_listener_id += 1;
        self.listeners.push((id, listener));
        id
    }

    fn remove_listener(&mut self, id: u64) {
        self.listeners.retain(|(entry, _)| *entry != id);
    }

    #[cfg(test)]
    fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

/// The shared, mutex-guarded core of a signal instance. Signal handles hold
/// it behind an `Arc` so clones observe the same state.
pub(crate) struct SignalShared<T> {
    state: Mutex<LocalState<T>>,
}

impl<T: Send + 'static> SignalShared<T> {
    pub(crate) fn new(value: T) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(LocalState::new(value)),
        })
    }

    /// Acquires the state lock and runs the shared precondition checks.
    pub(crate) fn lock_checked(&self) -> SignalResult<MutexGuard<'_, LocalState<T>>> {
        let state = self.state.lock();
        state.check_preconditions()?;
        Ok(state)
    }

    /// Acquires the state lock without precondition checks.
    pub(crate) fn lock(&self) -> MutexGuard<'_, LocalState<T>> {
        self.state.lock()
    }

    /// Non-blocking lock acquisition for the modify protocol.
    pub(crate) fn try_lock(&self) -> Option<MutexGuard<'_, LocalState<T>>> {
        self.state.try_lock()
    }

    /// Registers a usage for the current tracked read, captured at the
    /// version seen in the same critical section as the value the read
    /// returns.
    pub(crate) fn track_read(self: &Arc<Self>, state: &LocalState<T>) {
        if UsageTracker::is_active() {
            UsageTracker::register_usage(Box::new(SignalUsage {
                shared: Arc::clone(self),
                version: state.version(),
            }));
        }
    }
}

/// A [`Usage`] over one signal instance, captured at a specific version.
struct SignalUsage<T> {
    shared: Arc<SignalShared<T>>,
    version: u64,
}

impl<T: Send + 'static> Usage for SignalUsage<T> {
    fn has_changes(&self) -> bool {
        self.shared.state.lock().version() != self.version
    }

    fn on_next_change(&self, mut listener: Box<dyn TransientListener>) -> CleanupHandle {
        // Hold the lock across the change check and the registration so a
        // write cannot slip in between and be missed.
        let mut state = self.shared.state.lock();
        if state.version() != self.version && !listener.invoke(true) {
            return CleanupHandle::noop();
        }
        let id = state.add_listener(listener);
        drop(state);

        let shared = Arc::clone(&self.shared);
        CleanupHandle::new(move || {
            shared.state.lock().remove_listener(id);
        })
    }
}

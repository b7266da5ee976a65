//! Value signal implementation.
//!
//! A [`ValueSignal`] is a single mutable reference cell with four write
//! modes tuned for different use patterns:
//!
//! - [`set`](ValueSignal::set): unconditional store, returns the old value.
//! - [`replace`](ValueSignal::replace): compare-and-swap by value equality,
//!   the one write whose failure is a normal outcome.
//! - [`update`](ValueSignal::update): read-modify-write executed atomically
//!   under the instance lock.
//! - [`modify`](ValueSignal::modify): in-place mutation for values that are
//!   not safe to share between threads, run with the lock released.
//!
//! # The modify protocol
//!
//! `set`, `replace` and `update` hold the instance lock for the duration of
//! the write, which is fine because they hold it only for an instant.
//! Holding a lock across an arbitrary user mutator is not fine, so `modify`
//! works in two phases: under the lock it only marks a modification as in
//! flight and vacates the value slot, then it runs the mutator unlocked.
//! While the flag is up, every other operation on the instance fails fast
//! with [`SignalError::ConcurrentModification`] instead of blocking. Misuse
//! (two racing `modify` calls, or a read during the mutator) is therefore
//! detected and reported, not prevented.
//!
//! # Thread safety
//!
//! Handles are cheap to clone and share one underlying state; writes to a
//! single signal are linearizable. Values handed to `set`/`replace`/
//! `update` must be treated as immutable after handoff; `modify` is the
//! sanctioned path for in-place mutation.

use std::fmt::Debug;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::core::{next_signal_id, SignalShared};
use super::error::{SignalError, SignalResult};
use super::traits::{Signal, WritableSignal};

/// A reactive cell holding a single value of type `T`.
///
/// # Example
///
/// ```rust,ignore
/// let counter = ValueSignal::new(0);
///
/// assert_eq!(counter.set(1)?, 0);
/// assert_eq!(counter.update(|n| n + 1)?, 1);
/// assert_eq!(counter.peek()?, 2);
/// ```
pub struct ValueSignal<T> {
    /// Unique identifier for this signal instance.
    id: u64,

    /// State shared between clones of the handle.
    shared: Arc<SignalShared<T>>,
}

impl<T: Send + 'static> ValueSignal<T> {
    /// Creates a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            id: next_signal_id(),
            shared: SignalShared::new(value),
        }
    }

    /// The unique id of this signal instance. Clones of a handle share the
    /// id; independently created signals never do.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Mutates the value in place.
    ///
    /// The mutator runs on the calling thread with the instance lock
    /// released, so it may be arbitrarily long-running. Until it finishes,
    /// any other operation on this instance fails with
    /// [`SignalError::ConcurrentModification`], as does this call itself if
    /// the lock is contended at entry or another modification is already in
    /// flight.
    ///
    /// A completed mutator always counts as a change: the version is bumped
    /// and listeners are notified even if the mutator did nothing. If the
    /// mutator panics, the value is restored as-is, no notification fires,
    /// and the panic resumes on the caller.
    pub fn modify(&self, mutator: impl FnOnce(&mut T)) -> SignalResult<()> {
        let mut state = self
            .shared
            .try_lock()
            .ok_or(SignalError::ConcurrentModification)?;
        state.check_preconditions()?;
        state.set_modify_in_progress(true);
        let mut value = state.take_value();
        drop(state);

        tracing::debug!(signal = self.id, "modify pass started");
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| mutator(&mut value)));

        // Uncontended by construction: everyone else fails fast on the
        // in-flight flag instead of waiting for this lock.
        let mut state = self.shared.lock();
        state.set_modify_in_progress(false);
        state.restore_value(value);
        match outcome {
            Ok(()) => {
                state.notify_listeners();
                Ok(())
            }
            Err(payload) => {
                drop(state);
                panic::resume_unwind(payload);
            }
        }
    }
}

impl<T: Clone + Send + 'static> ValueSignal<T> {
    /// Reads the current value. Registers a dependency when a usage tracker
    /// is active on the calling thread.
    pub fn get(&self) -> SignalResult<T> {
        let state = self.shared.lock_checked()?;
        self.shared.track_read(&state);
        Ok(state.value().clone())
    }

    /// Reads the current value without registering a dependency.
    pub fn peek(&self) -> SignalResult<T> {
        let state = self.shared.lock_checked()?;
        Ok(state.value().clone())
    }

    /// Stores `value` and returns the previous value. Always bumps the
    /// version and notifies listeners.
    pub fn set(&self, value: T) -> SignalResult<T> {
        let mut state = self.shared.lock_checked()?;
        let old = state.replace_value(value);
        state.notify_listeners();
        Ok(old)
    }

    /// Stores `new` only if the current value equals `expected`.
    ///
    /// On mismatch the signal is left untouched, no notification fires, and
    /// [`SignalError::ValueMismatch`] is returned for the caller to branch
    /// on, typically by re-reading and retrying.
    pub fn replace(&self, expected: &T, new: T) -> SignalResult<()>
    where
        T: PartialEq,
    {
        let mut state = self.shared.lock_checked()?;
        if state.value() != expected {
            return Err(SignalError::ValueMismatch);
        }
        state.replace_value(new);
        state.notify_listeners();
        Ok(())
    }

    /// Derives a new value from the current one and returns the previous
    /// value.
    ///
    /// The closure is invoked exactly once, synchronously, under the
    /// instance lock; it must not touch this signal or a deadlock results.
    /// A result equal to the current value skips the write entirely, so no
    /// version bump or notification happens.
    pub fn update<F>(&self, f: F) -> SignalResult<T>
    where
        F: FnOnce(&T) -> T,
        T: PartialEq,
    {
        let mut state = self.shared.lock_checked()?;
        let new = f(state.value());
        if new == *state.value() {
            return Ok(state.value().clone());
        }
        let old = state.replace_value(new);
        state.notify_listeners();
        Ok(old)
    }

    /// A read-only view over the same underlying state.
    pub fn as_readonly(&self) -> ReadonlySignal<T> {
        ReadonlySignal {
            inner: self.clone(),
        }
    }
}

impl<T> Clone for ValueSignal<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Default + Send + 'static> Default for ValueSignal<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Debug + Send + 'static> Debug for ValueSignal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        let mut builder = f.debug_struct("ValueSignal");
        builder.field("id", &self.id);
        match state.try_value() {
            Some(value) => builder.field("value", value),
            None => builder.field("value", &"<modify in progress>"),
        };
        builder.finish()
    }
}

impl<T> PartialEq for ValueSignal<T> {
    /// Two handles are equal iff they refer to the same signal instance.
    /// Clones of a handle share an `id`; independently created signals never
    /// do.
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T: Clone + Send + 'static> Signal for ValueSignal<T> {
    type Value = T;

    fn get(&self) -> SignalResult<T> {
        ValueSignal::get(self)
    }

    fn peek(&self) -> SignalResult<T> {
        ValueSignal::peek(self)
    }
}

impl<T: Clone + PartialEq + Send + 'static> WritableSignal for ValueSignal<T> {
    fn set(&self, value: T) -> SignalResult<T> {
        ValueSignal::set(self, value)
    }

    fn replace(&self, expected: &T, new: T) -> SignalResult<()> {
        ValueSignal::replace(self, expected, new)
    }

    fn update<F>(&self, f: F) -> SignalResult<T>
    where
        F: FnOnce(&T) -> T,
    {
        ValueSignal::update(self, f)
    }
}

/// Read-only view of a [`ValueSignal`], produced by
/// [`ValueSignal::as_readonly`]. Exposes the read surface only; the
/// underlying signal keeps its writers.
pub struct ReadonlySignal<T> {
    inner: ValueSignal<T>,
}

impl<T: Clone + Send + 'static> ReadonlySignal<T> {
    /// Reads the current value, registering a dependency when a usage
    /// tracker is active.
    pub fn get(&self) -> SignalResult<T> {
        self.inner.get()
    }

    /// Reads the current value without registering a dependency.
    pub fn peek(&self) -> SignalResult<T> {
        self.inner.peek()
    }
}

impl<T> Clone for ReadonlySignal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Debug + Send + 'static> Debug for ReadonlySignal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadonlySignal")
            .field("inner", &self.inner)
            .finish()
    }
}

impl<T: Clone + Send + 'static> Signal for ReadonlySignal<T> {
    type Value = T;

    fn get(&self) -> SignalResult<T> {
        ReadonlySignal::get(self)
    }

    fn peek(&self) -> SignalResult<T> {
        ReadonlySignal::peek(self)
    }
}

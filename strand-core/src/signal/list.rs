//! List signal implementation.
//!
//! A [`ListSignal`] is an ordered collection of [`ValueSignal`] entries
//! whose structural changes and per-entry changes are observable
//! independently:
//!
//! - Inserting, removing or clearing entries bumps the list's own version
//!   and notifies list-level listeners.
//! - Writing through an entry handle bumps only that entry's version and
//!   notifies only that entry's listeners; the list is untouched.
//!
//! This granularity is what makes fine-grained re-rendering possible: a
//! dependent that read one entry does not re-run when a sibling mutates or
//! when the list gains an unrelated entry.
//!
//! The list owns its entries: they are created by the insert operations and
//! leave the list only through [`remove`](ListSignal::remove) or
//! [`clear`](ListSignal::clear). A removed entry keeps working as a
//! standalone signal for anyone still holding its handle.

use std::fmt::Debug;
use std::sync::Arc;

use super::core::{next_signal_id, SignalShared};
use super::error::{SignalError, SignalResult};
use super::traits::Signal;
use super::value::ValueSignal;

/// A reactive ordered collection of [`ValueSignal`] entries.
///
/// # Example
///
/// ```rust,ignore
/// let todos: ListSignal<String> = ListSignal::new();
///
/// let first = todos.insert_last("write tests".to_string())?;
/// todos.insert_last("ship".to_string())?;
///
/// // Entry-level write; list-level listeners stay quiet.
/// first.set("write more tests".to_string())?;
/// ```
pub struct ListSignal<T> {
    /// Unique identifier for this signal instance.
    id: u64,

    /// State shared between clones of the handle. The value is the entry
    /// sequence itself; entry handles are cheap `Arc` clones.
    shared: Arc<SignalShared<Vec<ValueSignal<T>>>>,
}

impl<T: Send + 'static> ListSignal<T> {
    /// Creates a new, empty list signal.
    pub fn new() -> Self {
        Self {
            id: next_signal_id(),
            shared: SignalShared::new(Vec::new()),
        }
    }

    /// The unique id of this signal instance.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Reads the current entry sequence. Registers a dependency on the
    /// list's structure when a usage tracker is active; reading an
    /// individual entry afterwards registers that entry separately.
    pub fn get(&self) -> SignalResult<Vec<ValueSignal<T>>> {
        let state = self.shared.lock_checked()?;
        self.shared.track_read(&state);
        Ok(state.value().clone())
    }

    /// Reads the current entry sequence without registering a dependency.
    pub fn peek(&self) -> SignalResult<Vec<ValueSignal<T>>> {
        let state = self.shared.lock_checked()?;
        Ok(state.value().clone())
    }

    /// Inserts a new entry at the front of the list and returns its handle.
    /// Safe under concurrent structural mutation, since it needs no
    /// externally computed index.
    pub fn insert_first(&self, value: T) -> SignalResult<ValueSignal<T>> {
        self.insert_entry(0, value)
    }

    /// Appends a new entry at the end of the list and returns its handle.
    /// Safe under concurrent structural mutation.
    pub fn insert_last(&self, value: T) -> SignalResult<ValueSignal<T>> {
        let mut state = self.shared.lock_checked()?;
        let entry = ValueSignal::new(value);
        state.value_mut().push(entry.clone());
        state.notify_listeners();
        Ok(entry)
    }

    /// Inserts a new entry at `index` and returns its handle.
    ///
    /// Fails with [`SignalError::IndexOutOfBounds`] when `index` is past the
    /// end of the list; the list is left untouched in that case.
    ///
    /// Index-based insertion is inherently racy under concurrent structural
    /// mutation from other threads: by the time the insert runs, the index
    /// may no longer mean what the caller computed it from. Use it only
    /// when structural changes are otherwise sequential, or prefer
    /// [`insert_first`](ListSignal::insert_first) /
    /// [`insert_last`](ListSignal::insert_last).
    pub fn insert_at(&self, index: usize, value: T) -> SignalResult<ValueSignal<T>> {
        self.insert_entry(index, value)
    }

    fn insert_entry(&self, index: usize, value: T) -> SignalResult<ValueSignal<T>> {
        let mut state = self.shared.lock_checked()?;
        let len = state.value().len();
        if index > len {
            return Err(SignalError::IndexOutOfBounds { index, len });
        }
        let entry = ValueSignal::new(value);
        state.value_mut().insert(index, entry.clone());
        state.notify_listeners();
        Ok(entry)
    }

    /// Removes the given entry, identified by handle identity rather than
    /// by value. Removing an entry that is not in the list is a no-op and
    /// notifies nobody.
    pub fn remove(&self, entry: &ValueSignal<T>) -> SignalResult<()> {
        let mut state = self.shared.lock_checked()?;
        let entries = state.value_mut();
        let Some(position) = entries
            .iter()
            .position(|candidate| candidate.id() == entry.id())
        else {
            return Ok(());
        };
        entries.remove(position);
        state.notify_listeners();
        Ok(())
    }

    /// Removes every entry. Notifies list-level listeners only if the list
    /// was non-empty.
    pub fn clear(&self) -> SignalResult<()> {
        let mut state = self.shared.lock_checked()?;
        if state.value().is_empty() {
            return Ok(());
        }
        state.value_mut().clear();
        state.notify_listeners();
        Ok(())
    }
}

impl<T> Clone for ListSignal<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> Default for ListSignal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> Debug for ListSignal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("ListSignal")
            .field("id", &self.id)
            .field("len", &state.try_value().map_or(0, Vec::len))
            .finish()
    }
}

impl<T: Send + 'static> Signal for ListSignal<T> {
    type Value = Vec<ValueSignal<T>>;

    fn get(&self) -> SignalResult<Vec<ValueSignal<T>>> {
        ListSignal::get(self)
    }

    fn peek(&self) -> SignalResult<Vec<ValueSignal<T>>> {
        ListSignal::peek(self)
    }
}

//! Ambient transaction boundary.
//!
//! The transactional machinery itself lives outside this crate; local
//! signals only need to know whether the calling thread is currently inside
//! a transaction, because every local signal operation is forbidden there.
//! The flag is thread-scoped and maintained with scope helpers so it can
//! never leak past the closure that set it, even on panic.

use std::cell::Cell;

thread_local! {
    /// Nesting depth of ambient transactions on the current thread.
    static TRANSACTION_DEPTH: Cell<usize> = Cell::new(0);
}

/// Facade over the thread-scoped ambient transaction flag.
///
/// Local signals call [`Transaction::in_transaction`] in their precondition
/// checks; the transactional subsystem brackets its work with
/// [`Transaction::run`].
pub struct Transaction;

impl Transaction {
    /// Whether the calling thread is inside an ambient transaction.
    pub fn in_transaction() -> bool {
        TRANSACTION_DEPTH.with(|depth| depth.get() > 0)
    }

    /// Runs `f` with the ambient transaction flag set for the calling
    /// thread. Nested calls are counted, so the flag clears only when the
    /// outermost scope exits.
    pub fn run<R>(f: impl FnOnce() -> R) -> R {
        let _scope = DepthScope::enter();
        f()
    }

    /// Runs `f` with the ambient transaction flag cleared, restoring the
    /// previous nesting depth afterwards.
    pub fn run_without<R>(f: impl FnOnce() -> R) -> R {
        let _scope = DepthScope::suspend();
        f()
    }
}

/// Restores the previous nesting depth when dropped, so panics inside the
/// scoped closure cannot leave the flag behind.
struct DepthScope {
    previous: usize,
}

impl DepthScope {
    fn enter() -> Self {
        let previous = TRANSACTION_DEPTH.with(|depth| {
            let current = depth.get();
            depth.set(current + 1);
            current
        });
        Self { previous }
    }

    fn suspend() -> Self {
        let previous = TRANSACTION_DEPTH.with(|depth| depth.replace(0));
        Self { previous }
    }
}

impl Drop for DepthScope {
    fn drop(&mut self) {
        TRANSACTION_DEPTH.with(|depth| depth.set(self.previous));
    }
}

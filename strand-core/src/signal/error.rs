//! Error types for the signal runtime.
//!
//! All fallible signal operations return [`SignalResult`]. Only one variant,
//! [`SignalError::ValueMismatch`], is an expected outcome of normal use (the
//! compare-and-swap retry pattern); the others report misuse that the caller
//! has to fix rather than retry.

use thiserror::Error;

/// Result alias used throughout the signal runtime.
pub type SignalResult<T> = Result<T, SignalError>;

/// Errors raised by signal operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    /// A local signal was accessed while an ambient transaction is active.
    ///
    /// Local signals are not transactional; reads and writes inside a
    /// transaction would not roll back with it, so every operation refuses
    /// to run there.
    #[error("local signals cannot be used inside a transaction")]
    TransactionActive,

    /// The signal was accessed while an exclusive in-place modification is
    /// running, or a modification could not start because the instance lock
    /// was contended.
    ///
    /// The modification that was already in progress is unaffected; only the
    /// late arrival observes this error.
    #[error("the signal is concurrently being modified")]
    ConcurrentModification,

    /// A compare-and-swap found a current value different from the expected
    /// one. The signal is unchanged; retrying with a fresh expected value is
    /// the caller's decision.
    #[error("the current value does not match the expected value")]
    ValueMismatch,

    /// A positional insert pointed outside the list.
    #[error("index {index} is out of bounds for a list of length {len}")]
    IndexOutOfBounds {
        /// The requested position.
        index: usize,
        /// The list length at the time of the call.
        len: usize,
    },
}

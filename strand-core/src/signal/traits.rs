//! Capability traits for the signal surface.
//!
//! The concrete signal types expose their operations as inherent methods;
//! these traits exist for code that wants to stay generic over the read or
//! write capability, such as render helpers that accept any readable
//! signal.

use super::error::SignalResult;

/// Read capability: a reactively observable container for a value.
pub trait Signal {
    /// The contained value type.
    type Value;

    /// Reads the value. When a usage tracker is active on the calling
    /// thread, the read registers a dependency with it.
    fn get(&self) -> SignalResult<Self::Value>;

    /// Reads the value without registering a dependency, for reads that
    /// must not create an edge in a dependency graph.
    fn peek(&self) -> SignalResult<Self::Value>;
}

/// Write capability on top of [`Signal`].
pub trait WritableSignal: Signal {
    /// Stores a new value unconditionally and returns the previous one.
    fn set(&self, value: Self::Value) -> SignalResult<Self::Value>;

    /// Compare-and-swap: stores `new` only if the current value equals
    /// `expected`. A mismatch is reported as
    /// [`SignalError::ValueMismatch`](super::SignalError::ValueMismatch)
    /// and leaves the signal untouched.
    fn replace(&self, expected: &Self::Value, new: Self::Value) -> SignalResult<()>;

    /// Atomically derives a new value from the current one and returns the
    /// previous value. The closure runs under the instance lock and must
    /// not touch the same signal.
    fn update<F>(&self, f: F) -> SignalResult<Self::Value>
    where
        F: FnOnce(&Self::Value) -> Self::Value,
        Self: Sized;
}

//! Reactive Signal Primitives
//!
//! This module implements the local signal: a single-process container for
//! mutable state with thread-safe reads and writes, automatic dependency
//! tracking and subscription-based change notification. It is the substrate
//! higher layers build "recompute this view when its inputs change" on.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A [`ValueSignal`] holds one value; a [`ListSignal`] holds an ordered
//! collection of value signals with independently observable structure.
//! Handles are cheap clones sharing one locked state, so any number of
//! threads may operate on a signal without external synchronization.
//!
//! ## Usage tracking
//!
//! Reading through [`get`](ValueSignal::get) while a [`UsageTracker`] frame
//! is active captures a [`Usage`]: a snapshot handle that can tell whether
//! the signal changed since the read and can deliver a callback on the next
//! change. [`peek`](ValueSignal::peek) is the escape hatch that never
//! creates a dependency edge. Scheduling of dependent recomputation is the
//! caller's concern; this module only produces the usages.
//!
//! ## Versions and listeners
//!
//! Every signal carries a monotonically increasing version, bumped exactly
//! when a write completes. Listeners are [`TransientListener`]s: each
//! delivery lets the listener decide whether it stays subscribed. A change
//! notifies exactly the listeners registered before it, synchronously,
//! before the write call returns.
//!
//! # Transactions
//!
//! Local signals are forbidden inside the ambient transactions of the
//! shared-signal machinery. Every operation checks the thread-scoped
//! [`Transaction`] flag and fails with [`SignalError::TransactionActive`]
//! rather than producing state a transaction could not roll back.

mod core;
mod error;
mod list;
mod listener;
mod tracker;
mod traits;
mod transaction;
mod usage;
mod value;

pub use error::{SignalError, SignalResult};
pub use list::ListSignal;
pub use listener::{CleanupHandle, TransientListener};
pub use tracker::UsageTracker;
pub use traits::{Signal, WritableSignal};
pub use transaction::Transaction;
pub use usage::{CombinedUsage, NoUsage, Usage};
pub use value::{ReadonlySignal, ValueSignal};

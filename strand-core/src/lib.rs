//! Strand Core
//!
//! This crate provides the core signal runtime for the Strand reactive UI
//! framework. It implements:
//!
//! - Thread-safe reactive state cells (value and list signals)
//! - Automatic dependency tracking for tracked reads
//! - Subscription-based change notification with exactly-once delivery
//!
//! Higher layers (component trees, rendering, the shared-signal transport)
//! consume signals exclusively through the read/write surface exposed here.
//!
//! # Example
//!
//! ```rust,ignore
//! use strand_core::signal::{UsageTracker, ValueSignal};
//!
//! let count = ValueSignal::new(0);
//!
//! // A render pass reads signals under a tracker.
//! let (rendered, usage) = UsageTracker::track(|| {
//!     format!("count: {}", count.get().unwrap())
//! });
//!
//! // Re-render when any input of the pass changes.
//! usage.on_next_change(Box::new(move |_| {
//!     schedule_rerender();
//!     false
//! }));
//!
//! count.set(1).unwrap(); // triggers the listener
//! ```

pub mod signal;

//! Integration Tests for the Signal Runtime
//!
//! These tests exercise the signal types across threads and across module
//! boundaries: write atomicity, compare-and-swap contention, the modify
//! exclusivity window, and the tracked render flow that combines list and
//! entry reactivity.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::thread;

use strand_core::signal::{ListSignal, SignalError, UsageTracker, ValueSignal};

/// Concurrent read-modify-write increments must never lose an update.
#[test]
fn concurrent_updates_are_atomic() {
    const THREADS: usize = 8;
    const UPDATES: usize = 500;

    let signal = ValueSignal::new(0u64);
    let barrier = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let signal = signal.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..UPDATES {
                    signal.update(|n| n + 1).unwrap();
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(signal.peek().unwrap(), (THREADS * UPDATES) as u64);
}

/// Of N racing compare-and-swaps against the same expected value, exactly
/// one wins; the losers see a mismatch and no extra notification fires.
#[test]
fn concurrent_replace_has_single_winner() {
    const THREADS: usize = 8;

    let signal = ValueSignal::new(0usize);

    let ((), usage) = UsageTracker::track(|| {
        signal.get().unwrap();
    });
    let notifications = Arc::new(AtomicUsize::new(0));
    {
        let notifications = Arc::clone(&notifications);
        usage.on_next_change(Box::new(move |_| {
            notifications.fetch_add(1, Ordering::SeqCst);
            true
        }));
    }

    let barrier = Arc::new(Barrier::new(THREADS));
    let successes = Arc::new(AtomicUsize::new(0));
    let mismatches = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..THREADS)
        .map(|index| {
            let signal = signal.clone();
            let barrier = Arc::clone(&barrier);
            let successes = Arc::clone(&successes);
            let mismatches = Arc::clone(&mismatches);
            thread::spawn(move || {
                barrier.wait();
                match signal.replace(&0, index + 1) {
                    Ok(()) => {
                        successes.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(SignalError::ValueMismatch) => {
                        mismatches.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(other) => panic!("unexpected error: {other}"),
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(successes.load(Ordering::SeqCst), 1);
    assert_eq!(mismatches.load(Ordering::SeqCst), THREADS - 1);
    // Failed attempts bumped nothing: one write, one notification.
    assert_eq!(notifications.load(Ordering::SeqCst), 1);
    assert_ne!(signal.peek().unwrap(), 0);
}

/// While a mutator is running on one thread, every operation from another
/// thread fails fast instead of blocking, and the running modification is
/// unaffected.
#[test]
fn modify_excludes_other_threads() {
    let signal = ValueSignal::new(vec![0]);

    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();

    let worker = {
        let signal = signal.clone();
        thread::spawn(move || {
            signal
                .modify(move |value| {
                    started_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                    value.push(42);
                })
                .unwrap();
        })
    };

    // Wait until the mutator is inside its unlocked window.
    started_rx.recv().unwrap();

    assert_eq!(signal.get(), Err(SignalError::ConcurrentModification));
    assert_eq!(signal.peek(), Err(SignalError::ConcurrentModification));
    assert_eq!(
        signal.set(vec![1]),
        Err(SignalError::ConcurrentModification)
    );
    assert_eq!(
        signal.replace(&vec![0], vec![1]),
        Err(SignalError::ConcurrentModification)
    );
    assert_eq!(
        signal.update(|v| v.clone()),
        Err(SignalError::ConcurrentModification)
    );
    assert_eq!(
        signal.modify(|_| {}),
        Err(SignalError::ConcurrentModification)
    );

    release_tx.send(()).unwrap();
    worker.join().unwrap();

    // The rejected calls left no trace; the mutation went through.
    assert_eq!(signal.peek().unwrap(), vec![0, 42]);
}

/// Change notification is synchronous: it has happened by the time the
/// write call returns, on whichever thread performed the write.
#[test]
fn notification_completes_before_write_returns() {
    let signal = ValueSignal::new(0);

    let ((), usage) = UsageTracker::track(|| {
        signal.get().unwrap();
    });

    let fired = Arc::new(AtomicBool::new(false));
    {
        let fired = Arc::clone(&fired);
        usage.on_next_change(Box::new(move |_| {
            fired.store(true, Ordering::SeqCst);
            false
        }));
    }

    let worker = {
        let signal = signal.clone();
        let fired = Arc::clone(&fired);
        thread::spawn(move || {
            signal.set(1).unwrap();
            assert!(fired.load(Ordering::SeqCst));
        })
    };

    worker.join().unwrap();
    assert!(fired.load(Ordering::SeqCst));
}

/// A usage handle never reverts to "unchanged", no matter how many further
/// writes happen from other threads.
#[test]
fn usage_changes_are_monotonic() {
    let signal = ValueSignal::new(0);

    let ((), usage) = UsageTracker::track(|| {
        signal.get().unwrap();
    });
    assert!(!usage.has_changes());

    let worker = {
        let signal = signal.clone();
        thread::spawn(move || {
            for n in 1..=10 {
                signal.set(n).unwrap();
            }
        })
    };
    worker.join().unwrap();

    assert!(usage.has_changes());
    signal.set(11).unwrap();
    assert!(usage.has_changes());
}

/// Append-only structural inserts are safe from any number of threads.
#[test]
fn concurrent_insert_last_loses_nothing() {
    const THREADS: usize = 4;
    const INSERTS: usize = 100;

    let list = ListSignal::new();
    let barrier = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|index| {
            let list = list.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for n in 0..INSERTS {
                    list.insert_last(format!("{index}-{n}")).unwrap();
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(list.peek().unwrap().len(), THREADS * INSERTS);
}

/// The full render flow: one tracked pass over a list and its entries,
/// re-notified once per change of any input.
#[test]
fn tracked_render_pass_observes_list_and_entries() {
    let list = ListSignal::new();
    let first = list.insert_last("hello".to_string()).unwrap();
    let second = list.insert_last("world".to_string()).unwrap();

    let (rendered, usage) = UsageTracker::track(|| {
        list.get()
            .unwrap()
            .iter()
            .map(|entry| entry.get().unwrap())
            .collect::<Vec<_>>()
            .join(", ")
    });
    assert_eq!(rendered, "hello, world");

    let renders = Arc::new(AtomicUsize::new(0));
    {
        let renders = Arc::clone(&renders);
        usage.on_next_change(Box::new(move |_| {
            renders.fetch_add(1, Ordering::SeqCst);
            true
        }));
    }

    // An entry-level write notifies the pass once.
    first.set("hi".to_string()).unwrap();
    assert_eq!(renders.load(Ordering::SeqCst), 1);

    // A structural change notifies the pass once.
    list.insert_last("again".to_string()).unwrap();
    assert_eq!(renders.load(Ordering::SeqCst), 2);

    // The other entry is an input too.
    second.set("there".to_string()).unwrap();
    assert_eq!(renders.load(Ordering::SeqCst), 3);
}

/// A pass that reads only one entry is not re-notified by sibling writes or
/// by writes to entries the pass never read.
#[test]
fn entry_granularity_limits_recomputation() {
    let list = ListSignal::new();
    let first = list.insert_last(1).unwrap();
    let second = list.insert_last(2).unwrap();

    let (value, usage) = UsageTracker::track(|| first.get().unwrap());
    assert_eq!(value, 1);

    let renders = Arc::new(AtomicUsize::new(0));
    {
        let renders = Arc::clone(&renders);
        usage.on_next_change(Box::new(move |_| {
            renders.fetch_add(1, Ordering::SeqCst);
            true
        }));
    }

    // Sibling and structural changes are invisible to this pass.
    second.set(20).unwrap();
    list.insert_last(3).unwrap();
    assert_eq!(renders.load(Ordering::SeqCst), 0);

    first.set(10).unwrap();
    assert_eq!(renders.load(Ordering::SeqCst), 1);
}

/// Listeners may write to other signals; the notification cascades
/// synchronously without double delivery. (Writing back to the signal that
/// is notifying would deadlock; only other instances are fair game.)
#[test]
fn listener_writing_to_another_signal_cascades() {
    let source = ValueSignal::new(0);
    let changes = ValueSignal::new(0);

    let ((), source_usage) = UsageTracker::track(|| {
        source.get().unwrap();
    });

    {
        let changes = changes.clone();
        source_usage.on_next_change(Box::new(move |_| {
            changes.update(|n| n + 1).unwrap();
            true
        }));
    }

    source.set(5).unwrap();
    assert_eq!(changes.peek().unwrap(), 1);

    source.set(7).unwrap();
    assert_eq!(changes.peek().unwrap(), 2);
}

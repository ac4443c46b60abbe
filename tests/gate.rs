//! Gate backend tests: mutual exclusion, shared concurrency, and the
//! non-blocking exclusive path, exercised against both implementations.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Barrier;
use std::thread;
use std::time::Duration;

use swell::{CondvarGate, Gate, TicketGate};

fn exclusive_holders_never_overlap<G: Gate>(gate: &G) {
    const THREADS: usize = 8;
    const ROUNDS: usize = 500;

    let in_critical = AtomicBool::new(false);
    let entries = AtomicUsize::new(0);

    thread::scope(|s| {
        for _ in 0..THREADS {
            let gate = &gate;
            let in_critical = &in_critical;
            let entries = &entries;
            s.spawn(move || {
                for _ in 0..ROUNDS {
                    gate.lock_exclusive();
                    assert!(!in_critical.swap(true, Ordering::SeqCst));
                    entries.fetch_add(1, Ordering::Relaxed);
                    assert!(in_critical.swap(false, Ordering::SeqCst));
                    gate.unlock_exclusive();
                }
            });
        }
    });

    assert_eq!(entries.load(Ordering::Relaxed), THREADS * ROUNDS);
}

fn shared_holders_overlap<G: Gate>(gate: &G) {
    const READERS: usize = 4;

    let barrier = Barrier::new(READERS);
    thread::scope(|s| {
        for _ in 0..READERS {
            let gate = &gate;
            let barrier = &barrier;
            s.spawn(move || {
                gate.lock_shared();
                // All readers must be inside simultaneously for this to
                // return; a gate that serialized readers would deadlock here.
                barrier.wait();
                gate.unlock_shared();
            });
        }
    });
}

fn writer_excludes_readers<G: Gate>(gate: &G) {
    let counter = AtomicUsize::new(0);

    gate.lock_exclusive();
    thread::scope(|s| {
        let gate = &gate;
        let counter = &counter;
        let reader = s.spawn(move || {
            gate.lock_shared();
            counter.fetch_add(1, Ordering::SeqCst);
            gate.unlock_shared();
        });

        thread::sleep(Duration::from_millis(50));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        gate.unlock_exclusive();
        reader.join().unwrap();
    });

    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

fn try_exclusive_fails_while_held<G: Gate>(gate: &G) {
    assert!(gate.try_lock_exclusive());
    assert!(!gate.try_lock_exclusive());
    gate.unlock_exclusive();
    assert!(gate.try_lock_exclusive());
    gate.unlock_exclusive();

    gate.lock_shared();
    assert!(!gate.try_lock_exclusive());
    gate.unlock_shared();
    assert!(gate.try_lock_exclusive());
    gate.unlock_exclusive();
}

#[test]
fn ticket_exclusive_mutual_exclusion() {
    exclusive_holders_never_overlap(&TicketGate::default());
}

#[test]
fn condvar_exclusive_mutual_exclusion() {
    exclusive_holders_never_overlap(&CondvarGate::default());
}

#[test]
fn ticket_shared_holders_run_concurrently() {
    shared_holders_overlap(&TicketGate::default());
}

#[test]
fn condvar_shared_holders_run_concurrently() {
    shared_holders_overlap(&CondvarGate::default());
}

#[test]
fn ticket_writer_excludes_readers() {
    writer_excludes_readers(&TicketGate::default());
}

#[test]
fn condvar_writer_excludes_readers() {
    writer_excludes_readers(&CondvarGate::default());
}

#[test]
fn ticket_try_exclusive() {
    try_exclusive_fails_while_held(&TicketGate::default());
}

#[test]
fn condvar_try_exclusive() {
    try_exclusive_fails_while_held(&CondvarGate::default());
}

#[test]
fn ticket_order_admits_queued_writer() {
    // A writer queued behind active readers gets in as soon as they leave,
    // even while new readers keep arriving.
    let gate = TicketGate::default();
    let writer_done = AtomicBool::new(false);

    thread::scope(|s| {
        let gate = &gate;
        let writer_done = &writer_done;

        gate.lock_shared();
        let writer = s.spawn(move || {
            gate.lock_exclusive();
            writer_done.store(true, Ordering::SeqCst);
            gate.unlock_exclusive();
        });

        thread::sleep(Duration::from_millis(20));
        assert!(!writer_done.load(Ordering::SeqCst));
        gate.unlock_shared();
        writer.join().unwrap();
    });

    assert!(writer_done.load(Ordering::SeqCst));
}

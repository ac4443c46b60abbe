//! Shared/exclusive gate strategies guarding the storage buffer.
//!
//! Element reads and writes take the gate in shared mode and run fully
//! concurrently; only structural reallocation (and `clear`) takes it
//! exclusively. Two backends implement the same contract: [`TicketGate`], a
//! FIFO ticket-based reader-writer spinlock, and [`CondvarGate`], a blocking
//! reader-writer lock built on `Mutex` + `Condvar`. The choice affects
//! spinning versus blocking under contention, not correctness.

use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crossbeam_utils::{Backoff, CachePadded};

/// A reader-writer lock strategy for the vector's storage.
///
/// Implementations must guarantee that an exclusive holder excludes every
/// other holder, and that shared holders exclude only exclusive ones. Each
/// `unlock_*` call must pair with a prior `lock_*` call (or a successful
/// `try_lock_exclusive`) on the same thread of execution.
pub trait Gate: Default + Send + Sync {
    /// Acquires shared access, waiting while an exclusive holder is active.
    fn lock_shared(&self);

    /// Releases shared access.
    fn unlock_shared(&self);

    /// Acquires exclusive access, waiting for all current holders to leave.
    fn lock_exclusive(&self);

    /// Releases exclusive access.
    fn unlock_exclusive(&self);

    /// Attempts exclusive access without waiting.
    ///
    /// Returns `false` when the gate is busy in either mode.
    fn try_lock_exclusive(&self) -> bool;
}

/// A FIFO ticket-based reader-writer spinlock.
///
/// `next` dispenses tickets; `enter` is the serving counter readers wait on
/// and `leave` counts completed holders, which is what writers wait on. A
/// reader advances `enter` as soon as it is admitted, so consecutive readers
/// overlap; a writer advances both counters only when it releases, so
/// everything queued behind it stays parked until then. Strict ticket order
/// means a writer waits for at most the holders that ticketed before it, so
/// heavy read traffic cannot starve growth.
#[derive(Debug, Default)]
pub struct TicketGate {
    next: CachePadded<AtomicUsize>,
    enter: CachePadded<AtomicUsize>,
    leave: CachePadded<AtomicUsize>,
}

impl Gate for TicketGate {
    fn lock_shared(&self) {
        let ticket = self.next.fetch_add(1, Ordering::Relaxed);
        let backoff = Backoff::new();
        while self.enter.load(Ordering::Acquire) != ticket {
            backoff.snooze();
        }
        // Admit the next ticket immediately; readers run concurrently. The
        // RMW extends the release sequence of the writer that admitted us,
        // so later readers still synchronize with that writer's unlock.
        self.enter.fetch_add(1, Ordering::Relaxed);
    }

    fn unlock_shared(&self) {
        self.leave.fetch_add(1, Ordering::Release);
    }

    fn lock_exclusive(&self) {
        let ticket = self.next.fetch_add(1, Ordering::Relaxed);
        let backoff = Backoff::new();
        while self.leave.load(Ordering::Acquire) != ticket {
            backoff.snooze();
        }
    }

    fn unlock_exclusive(&self) {
        self.enter.fetch_add(1, Ordering::Release);
        self.leave.fetch_add(1, Ordering::Release);
    }

    fn try_lock_exclusive(&self) -> bool {
        let ticket = self.next.load(Ordering::Relaxed);
        if self.leave.load(Ordering::Acquire) != ticket {
            return false;
        }
        // Claiming ticket `t` while `leave == t` means every earlier holder
        // has already left; the gate is ours the moment the ticket is ours.
        self.next
            .compare_exchange(ticket, ticket + 1, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }
}

#[derive(Debug, Default)]
struct CondvarState {
    readers: usize,
    writer: bool,
}

/// A blocking reader-writer gate built on `Mutex` + `Condvar`.
///
/// Writer-preferring: once a writer claims the gate, newly arriving readers
/// queue behind it instead of extending the read phase indefinitely.
#[derive(Debug, Default)]
pub struct CondvarGate {
    state: Mutex<CondvarState>,
    readers_gone: Condvar,
    writer_gone: Condvar,
}

impl CondvarGate {
    fn state(&self) -> MutexGuard<'_, CondvarState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(
        condvar: &Condvar,
        guard: MutexGuard<'a, CondvarState>,
    ) -> MutexGuard<'a, CondvarState> {
        condvar.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }
}

impl Gate for CondvarGate {
    fn lock_shared(&self) {
        let mut state = self.state();
        while state.writer {
            state = Self::wait(&self.writer_gone, state);
        }
        state.readers += 1;
    }

    fn unlock_shared(&self) {
        let mut state = self.state();
        state.readers -= 1;
        if state.readers == 0 {
            self.readers_gone.notify_all();
        }
    }

    fn lock_exclusive(&self) {
        let mut state = self.state();
        while state.writer {
            state = Self::wait(&self.writer_gone, state);
        }
        state.writer = true;
        while state.readers > 0 {
            state = Self::wait(&self.readers_gone, state);
        }
    }

    fn unlock_exclusive(&self) {
        let mut state = self.state();
        state.writer = false;
        drop(state);
        self.writer_gone.notify_all();
    }

    fn try_lock_exclusive(&self) -> bool {
        let mut state = self.state();
        if state.writer || state.readers > 0 {
            return false;
        }
        state.writer = true;
        true
    }
}

/// Scoped shared acquisition; releases on drop, including early returns.
pub(crate) struct SharedGuard<'a, G: Gate> {
    gate: &'a G,
}

impl<'a, G: Gate> SharedGuard<'a, G> {
    pub(crate) fn new(gate: &'a G) -> Self {
        gate.lock_shared();
        Self { gate }
    }
}

impl<G: Gate> Drop for SharedGuard<'_, G> {
    fn drop(&mut self) {
        self.gate.unlock_shared();
    }
}

/// Scoped exclusive acquisition; releases on drop, including early returns.
pub(crate) struct ExclusiveGuard<'a, G: Gate> {
    gate: &'a G,
}

impl<'a, G: Gate> ExclusiveGuard<'a, G> {
    pub(crate) fn new(gate: &'a G) -> Self {
        gate.lock_exclusive();
        Self { gate }
    }

    /// Non-blocking variant; `None` means the gate is busy.
    pub(crate) fn try_new(gate: &'a G) -> Option<Self> {
        gate.try_lock_exclusive().then_some(Self { gate })
    }
}

impl<G: Gate> Drop for ExclusiveGuard<'_, G> {
    fn drop(&mut self) {
        self.gate.unlock_exclusive();
    }
}

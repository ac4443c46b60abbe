//! `ConcurrentVec` — a thread-safe, dynamically growable vector.
//!
//! Any number of threads may append, read, and overwrite slots on a shared
//! reference. Three atomic counters drive the protocol:
//!
//! - `reserved` — the reservation high-water mark. A relaxed `fetch_add` on
//!   it is the *only* way a writable index is ever produced, so concurrent
//!   appends can never overlap.
//! - `capacity` — slots currently allocated. When a reservation lands at or
//!   past it, the reserving thread grows the buffer under the exclusive gate
//!   (or waits for whoever beat it to the gate).
//! - `len` — the published count. It is advanced only *after* an element is
//!   fully written, so readers iterating below `len` never observe a torn or
//!   uninitialized slot.
//!
//! Ordinary reads and writes hold the gate in shared mode and run fully
//! concurrently; only reallocation and `clear` take it exclusively. Writes to
//! the *same* index are intentionally not serialized against each other —
//! callers needing per-element exclusivity must layer their own
//! synchronization on top.

use core::fmt;
use core::iter::FusedIterator;
use core::mem;
use core::ptr;
use core::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::{Backoff, CachePadded};
use num_traits::{One, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::alloc::{BufferAlloc, Heap};
use crate::error::TryReserveError;
use crate::gate::{ExclusiveGuard, Gate, SharedGuard, TicketGate};
use crate::growth::Growth;
use crate::raw::RawBuf;

/// Number of slots allocated when no initial capacity is given.
pub const DEFAULT_CAPACITY: usize = 8;

/// Configures and creates a [`ConcurrentVec`].
///
/// Obtained from [`ConcurrentVec::builder`]. Every knob has a sensible
/// default: capacity [`DEFAULT_CAPACITY`], three-halves growth, natural
/// element alignment, no drop hook.
#[derive(Clone, Copy, Debug)]
pub struct Builder<T> {
    capacity: usize,
    growth: Growth,
    cache_aligned: bool,
    drop_hook: Option<fn(&mut T)>,
}

impl<T: Copy> Builder<T> {
    fn new() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            growth: Growth::default(),
            cache_aligned: false,
            drop_hook: None,
        }
    }

    /// Sets the initial capacity in element slots.
    #[must_use]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the growth policy applied when the buffer must expand.
    #[must_use]
    pub fn growth(mut self, growth: Growth) -> Self {
        self.growth = growth;
        self
    }

    /// Aligns the storage buffer to a cache-line boundary.
    #[must_use]
    pub fn cache_aligned(mut self, cache_aligned: bool) -> Self {
        self.cache_aligned = cache_aligned;
        self
    }

    /// Registers a hook run once per published element when the vector is
    /// dropped. Useful when elements carry raw resources (handles, foreign
    /// pointers) that plain-copy semantics would otherwise leak.
    #[must_use]
    pub fn drop_hook(mut self, hook: fn(&mut T)) -> Self {
        self.drop_hook = Some(hook);
        self
    }

    /// Builds the vector with the default gate and heap allocator.
    ///
    /// # Panics
    /// Panics if the initial allocation fails.
    #[must_use]
    pub fn build(self) -> ConcurrentVec<T> {
        match self.try_build() {
            Ok(vec) => vec,
            Err(err) => panic!("failed to allocate initial storage: {err}"),
        }
    }

    /// Builds the vector, reporting allocation failure instead of panicking.
    ///
    /// # Errors
    /// Returns an error when the initial allocation fails or the requested
    /// capacity overflows.
    pub fn try_build(self) -> Result<ConcurrentVec<T>, TryReserveError> {
        self.try_build_in(Heap)
    }

    /// Builds the vector with an explicit gate backend and allocator.
    ///
    /// # Errors
    /// Returns an error when the initial allocation fails or the requested
    /// capacity overflows.
    pub fn try_build_in<G: Gate, A: BufferAlloc>(
        self,
        alloc: A,
    ) -> Result<ConcurrentVec<T, G, A>, TryReserveError> {
        let align = if self.cache_aligned {
            mem::align_of::<CachePadded<T>>()
        } else {
            mem::align_of::<T>()
        };
        let buf = RawBuf::with_capacity(&alloc, self.capacity, align)?;
        Ok(ConcurrentVec {
            buf,
            len: CachePadded::new(AtomicUsize::new(0)),
            reserved: CachePadded::new(AtomicUsize::new(0)),
            gate: G::default(),
            alloc,
            growth: self.growth,
            drop_hook: self.drop_hook,
        })
    }
}

/// A thread-safe, dynamically growable vector of plain-copy elements.
///
/// See the [module docs](self) for the reservation/publish protocol. Elements
/// are copied in and out by value; references into the buffer are never
/// handed out, which is what lets the buffer move during growth.
///
/// # Caveats
///
/// - A concurrent [`set`] and [`get`] (or two `set`s) on the *same* index are
///   not serialized by the vector; callers racing on one slot must add their
///   own synchronization.
/// - After a push or extend fails with an allocation error, the indices it
///   reserved are never published; the publish guarantee covers histories in
///   which every append succeeded.
/// - Dropping the vector while other threads still use it is prevented by the
///   borrow checker, not by the vector.
///
/// [`set`]: Self::set
/// [`get`]: Self::get
pub struct ConcurrentVec<T: Copy, G: Gate = TicketGate, A: BufferAlloc = Heap> {
    buf: RawBuf<T>,
    len: CachePadded<AtomicUsize>,
    reserved: CachePadded<AtomicUsize>,
    gate: G,
    alloc: A,
    growth: Growth,
    drop_hook: Option<fn(&mut T)>,
}

// SAFETY: the vector owns its buffer and elements are plain copies; sending
// the container only requires sending the elements.
unsafe impl<T: Copy + Send, G: Gate, A: BufferAlloc> Send for ConcurrentVec<T, G, A> {}

// SAFETY: all buffer access goes through the gate and values are copied in
// and out rather than borrowed, so a shared vector never exposes `&T` across
// threads.
unsafe impl<T: Copy + Send, G: Gate, A: BufferAlloc> Sync for ConcurrentVec<T, G, A> {}

impl<T: Copy> ConcurrentVec<T> {
    /// Creates an empty vector with [`DEFAULT_CAPACITY`] slots.
    ///
    /// # Panics
    /// Panics if the initial allocation fails.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates an empty vector with at least `capacity` slots.
    ///
    /// # Panics
    /// Panics if the initial allocation fails.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::builder().capacity(capacity).build()
    }

    /// Returns a builder for configuring capacity, growth, alignment, the
    /// drop hook, and the gate/allocator backends.
    #[must_use]
    pub fn builder() -> Builder<T> {
        Builder::new()
    }

    /// Creates a vector holding `n` copies of `value`, all published.
    ///
    /// # Panics
    /// Panics if the allocation fails.
    #[must_use]
    pub fn from_elem(n: usize, value: T) -> Self {
        let vec = Self::with_capacity(n);
        let data = vec.buf.data();
        for i in 0..n {
            // SAFETY: the buffer was just allocated with at least `n` slots
            // and nothing else can reference it yet.
            unsafe { ptr::write(data.add(i), value) };
        }
        vec.reserved.store(n, Ordering::Relaxed);
        vec.len.store(n, Ordering::Release);
        vec
    }
}

impl<T: Copy + Zero> ConcurrentVec<T> {
    /// Creates a vector of `n` published zeros.
    ///
    /// # Panics
    /// Panics if the allocation fails.
    #[must_use]
    pub fn zeros(n: usize) -> Self {
        Self::from_elem(n, T::zero())
    }
}

impl<T: Copy + One> ConcurrentVec<T> {
    /// Creates a vector of `n` published ones.
    ///
    /// # Panics
    /// Panics if the allocation fails.
    #[must_use]
    pub fn ones(n: usize) -> Self {
        Self::from_elem(n, T::one())
    }
}

impl<T: Copy, G: Gate, A: BufferAlloc> ConcurrentVec<T, G, A> {
    /// Number of published elements. Every index below this holds a fully
    /// written value.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Returns `true` if no element has been published yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of element slots currently allocated. Never decreases.
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// The reservation high-water mark: slots claimed by some writer,
    /// published or not.
    pub fn reserved(&self) -> usize {
        self.reserved.load(Ordering::Relaxed)
    }

    /// Pointer to the start of the storage buffer.
    ///
    /// Growth may reallocate and invalidate it at any time; it is only
    /// meaningful for inspection (e.g. alignment checks), never for element
    /// access.
    pub fn as_ptr(&self) -> *const T {
        self.buf.data()
    }

    /// Claims `n` consecutive slot indices. The sole source of writable
    /// indices; distinct calls never overlap.
    fn reserve(&self, n: usize) -> usize {
        self.reserved.fetch_add(n, Ordering::Relaxed)
    }

    /// Spins until `capacity` covers `needed` slots, performing the growth
    /// ourselves whenever the exclusive gate is free.
    ///
    /// The spin is bounded by real progress: capacity strictly increases with
    /// every successful growth, and `try_lock_exclusive` succeeds once the
    /// holders that beat us drain out.
    fn catch_up(&self, needed: usize) -> Result<(), TryReserveError> {
        let backoff = Backoff::new();
        while self.buf.capacity() < needed {
            match ExclusiveGuard::try_new(&self.gate) {
                Some(_gate) => self.grow_to_fit(needed)?,
                None => backoff.snooze(),
            }
        }
        Ok(())
    }

    /// Grows storage until `capacity >= needed`. Caller must hold the gate
    /// exclusively. Re-checks under the lock, so a racing grower that already
    /// expanded does not trigger redundant growth.
    fn grow_to_fit(&self, needed: usize) -> Result<(), TryReserveError> {
        let capacity = self.buf.capacity();
        if capacity >= needed {
            return Ok(());
        }
        let target = self.growth.target(capacity, needed);
        #[cfg(feature = "tracing")]
        tracing::trace!(old = capacity, new = target, needed, "growing storage");
        // SAFETY: the caller holds the gate exclusively.
        unsafe { self.buf.grow(&self.alloc, target) }
    }

    /// Appends an element, returning the index it was placed at.
    ///
    /// Lock-free in the common case: claiming the index is one relaxed
    /// `fetch_add`, and writing the element only takes the shared gate.
    ///
    /// # Errors
    /// Returns an error when growth was required and allocation failed; the
    /// vector stays valid at its prior capacity, but the claimed index is
    /// never published.
    pub fn push(&self, value: T) -> Result<usize, TryReserveError> {
        let index = self.reserve(1);
        let needed = index
            .checked_add(1)
            .ok_or(TryReserveError::CapacityOverflow)?;
        self.catch_up(needed)?;
        {
            let _gate = SharedGuard::new(&self.gate);
            // SAFETY: `catch_up` ensured `index < capacity`, the index is
            // uniquely ours, and the gate keeps the buffer in place.
            unsafe { ptr::write(self.buf.data().add(index), value) };
        }
        self.len.fetch_add(1, Ordering::Release);
        Ok(index)
    }

    /// Appends a batch of elements contiguously, returning the start index.
    ///
    /// One reservation, one growth check, and one bulk copy under a single
    /// shared-gate acquisition, so batch appends avoid `n` separate atomic
    /// claims.
    ///
    /// # Errors
    /// Returns an error when growth was required and allocation failed; the
    /// claimed range is never published in that case.
    pub fn extend_from_slice(&self, values: &[T]) -> Result<usize, TryReserveError> {
        let n = values.len();
        let start = self.reserve(n);
        if n == 0 {
            return Ok(start);
        }
        let needed = start
            .checked_add(n)
            .ok_or(TryReserveError::CapacityOverflow)?;
        self.catch_up(needed)?;
        {
            let _gate = SharedGuard::new(&self.gate);
            // SAFETY: the range `start..start + n` is below capacity and
            // uniquely ours; source and buffer cannot overlap.
            unsafe { ptr::copy_nonoverlapping(values.as_ptr(), self.buf.data().add(start), n) };
        }
        self.len.fetch_add(n, Ordering::Release);
        Ok(start)
    }

    /// Copies out the element at `index`, or `None` when the index has not
    /// been published. Bounds-checked against [`len`], not capacity, so
    /// reserved-but-unwritten slots stay invisible.
    ///
    /// [`len`]: Self::len
    pub fn get(&self, index: usize) -> Option<T> {
        if index >= self.len.load(Ordering::Acquire) {
            return None;
        }
        let _gate = SharedGuard::new(&self.gate);
        // SAFETY: published slots below `len` hold fully written elements,
        // and `len` never exceeds capacity.
        Some(unsafe { ptr::read(self.buf.data().add(index)) })
    }

    /// Copies out the element at `index` without a bounds check. Still takes
    /// the shared gate, so growth cannot move the buffer mid-read.
    ///
    /// # Safety
    /// `index` must refer to a published slot — typically an index previously
    /// returned by [`push`] or [`extend_from_slice`] on this vector.
    ///
    /// [`push`]: Self::push
    /// [`extend_from_slice`]: Self::extend_from_slice
    pub unsafe fn get_unchecked(&self, index: usize) -> T {
        let _gate = SharedGuard::new(&self.gate);
        // SAFETY: the caller guarantees the slot is published.
        unsafe { ptr::read(self.buf.data().add(index)) }
    }

    /// Overwrites the element at `index`, returning `false` when the index
    /// is out of range.
    ///
    /// Bounds-checked against the *reservation* mark, not [`len`]: a slot may
    /// legally be overwritten before the push that reserved it publishes, but
    /// never past the high-water mark. Does not touch [`len`]. Returns
    /// `false` also in the narrow window where the reserving writer has not
    /// grown storage far enough for the slot to exist yet.
    ///
    /// [`len`]: Self::len
    pub fn set(&self, index: usize, value: T) -> bool {
        if index >= self.reserved.load(Ordering::Relaxed) {
            return false;
        }
        let _gate = SharedGuard::new(&self.gate);
        if index >= self.buf.capacity() {
            return false;
        }
        // SAFETY: `index` is below capacity and the gate keeps the buffer in
        // place. Plain overwrite; elements are `Copy` and need no drop.
        unsafe { ptr::write(self.buf.data().add(index), value) };
        true
    }

    /// Resets the vector to empty, retaining allocated capacity.
    ///
    /// Takes the exclusive gate: no read or write is in flight while the
    /// counters reset.
    pub fn clear(&self) {
        let _gate = ExclusiveGuard::new(&self.gate);
        #[cfg(feature = "tracing")]
        tracing::trace!(capacity = self.buf.capacity(), "clearing vector");
        self.reserved.store(0, Ordering::Relaxed);
        self.len.store(0, Ordering::Release);
    }

    /// Grows storage to exactly `capacity` slots, bypassing the growth
    /// factor. Does nothing when the current capacity already suffices.
    ///
    /// # Errors
    /// Returns an error on allocation failure; the vector is untouched.
    pub fn grow_capacity(&self, capacity: usize) -> Result<(), TryReserveError> {
        if self.buf.capacity() >= capacity {
            return Ok(());
        }
        let _gate = ExclusiveGuard::new(&self.gate);
        let current = self.buf.capacity();
        if current >= capacity {
            return Ok(());
        }
        // SAFETY: we hold the gate exclusively.
        unsafe { self.buf.grow(&self.alloc, capacity) }
    }

    /// Grows storage through the growth factor until it covers `needed`
    /// slots. The factor-iterated analogue of [`grow_capacity`].
    ///
    /// # Errors
    /// Returns an error on allocation failure; the vector is untouched.
    ///
    /// [`grow_capacity`]: Self::grow_capacity
    pub fn reserve_capacity(&self, needed: usize) -> Result<(), TryReserveError> {
        if self.buf.capacity() >= needed {
            return Ok(());
        }
        let _gate = ExclusiveGuard::new(&self.gate);
        self.grow_to_fit(needed)
    }

    /// Publishes the first `len` slots as-is, without writing them.
    ///
    /// # Safety
    /// Every slot below `len` must already hold a fully written element, and
    /// `len` must not exceed the current capacity.
    pub unsafe fn set_len(&self, len: usize) {
        self.reserved.fetch_max(len, Ordering::Relaxed);
        self.len.store(len, Ordering::Release);
    }

    /// Bulk-copies the first `n` storage slots of `src` into `self` and
    /// publishes exactly `n` elements, growing `self` first if needed.
    ///
    /// The copy happens under `src`'s shared gate, so growth of `src` cannot
    /// move its buffer mid-copy. Slots of `src` beyond its published length
    /// are copied verbatim and carry unspecified values. Copying a vector
    /// into itself skips the memory copy and just publishes `n`.
    ///
    /// # Panics
    /// Panics if `n` exceeds `src`'s capacity.
    ///
    /// # Errors
    /// Returns an error when growing `self` fails; `self` is untouched.
    pub fn copy_from(&self, src: &Self, n: usize) -> Result<(), TryReserveError> {
        assert!(n <= src.capacity(), "copy source smaller than requested");
        if !ptr::eq(self, src) {
            self.grow_capacity(n)?;
            let _src_gate = SharedGuard::new(&src.gate);
            let _dst_gate = SharedGuard::new(&self.gate);
            if n > 0 {
                // SAFETY: both buffers hold at least `n` slots, are distinct
                // allocations, and both gates keep them in place.
                unsafe { ptr::copy_nonoverlapping(src.buf.data(), self.buf.data(), n) };
            }
        }
        self.reserved.fetch_max(n, Ordering::Relaxed);
        self.len.store(n, Ordering::Release);
        Ok(())
    }

    /// Creates a new vector holding a copy of this vector's first `n` slots,
    /// with the same growth policy, alignment, and drop hook.
    ///
    /// # Panics
    /// Panics if `n` exceeds this vector's capacity.
    ///
    /// # Errors
    /// Returns an error when allocating the new vector fails.
    pub fn duplicate(&self, n: usize) -> Result<Self, TryReserveError>
    where
        A: Clone,
    {
        let dst = Self {
            buf: RawBuf::with_capacity(&self.alloc, n, self.buf.align())?,
            len: CachePadded::new(AtomicUsize::new(0)),
            reserved: CachePadded::new(AtomicUsize::new(0)),
            gate: G::default(),
            alloc: self.alloc.clone(),
            growth: self.growth,
            drop_hook: self.drop_hook,
        };
        dst.copy_from(self, n)?;
        Ok(dst)
    }

    /// Returns an iterator copying out the elements published at the moment
    /// this call snapshots [`len`].
    ///
    /// The iterator holds the gate in shared mode for its whole lifetime:
    /// growth cannot move the buffer underneath it, but any operation needing
    /// the exclusive gate (growth, [`clear`]) blocks until it is dropped. Do
    /// not grow or clear the same vector from inside the loop; that
    /// deadlocks.
    ///
    /// [`len`]: Self::len
    /// [`clear`]: Self::clear
    pub fn iter(&self) -> Iter<'_, T, G, A> {
        self.gate.lock_shared();
        let len = self.len.load(Ordering::Acquire);
        Iter {
            vec: self,
            index: 0,
            len,
        }
    }
}

impl<T: Copy> Default for ConcurrentVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy, G: Gate, A: BufferAlloc> Drop for ConcurrentVec<T, G, A> {
    fn drop(&mut self) {
        if let Some(hook) = self.drop_hook {
            let len = (*self.len.get_mut()).min(self.buf.capacity());
            let data = self.buf.data();
            for i in 0..len {
                // SAFETY: slots below `len` hold fully written elements and
                // we have exclusive ownership.
                hook(unsafe { &mut *data.add(i) });
            }
        }
        self.buf.release(&self.alloc);
    }
}

impl<T: Copy + fmt::Debug, G: Gate, A: BufferAlloc> fmt::Debug for ConcurrentVec<T, G, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// An iterator copying out the elements published when [`ConcurrentVec::iter`]
/// was called.
///
/// Holds the source vector's gate in shared mode until dropped; see
/// [`ConcurrentVec::iter`] for the re-entrancy constraint.
pub struct Iter<'a, T: Copy, G: Gate, A: BufferAlloc> {
    vec: &'a ConcurrentVec<T, G, A>,
    index: usize,
    len: usize,
}

impl<T: Copy, G: Gate, A: BufferAlloc> Iter<'_, T, G, A> {
    /// Rewinds the iterator to the start of its snapshot without releasing
    /// the gate.
    pub fn restart(&mut self) {
        self.index = 0;
    }
}

impl<T: Copy, G: Gate, A: BufferAlloc> Iterator for Iter<'_, T, G, A> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.index >= self.len {
            return None;
        }
        let index = self.index;
        self.index += 1;
        // SAFETY: `index` is below the published length snapshot and the
        // shared gate we hold keeps the buffer in place.
        Some(unsafe { ptr::read(self.vec.buf.data().add(index)) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.index;
        (remaining, Some(remaining))
    }
}

impl<T: Copy, G: Gate, A: BufferAlloc> ExactSizeIterator for Iter<'_, T, G, A> {}

impl<T: Copy, G: Gate, A: BufferAlloc> FusedIterator for Iter<'_, T, G, A> {}

impl<T: Copy, G: Gate, A: BufferAlloc> Drop for Iter<'_, T, G, A> {
    fn drop(&mut self) {
        self.vec.gate.unlock_shared();
    }
}

impl<'a, T: Copy, G: Gate, A: BufferAlloc> IntoIterator for &'a ConcurrentVec<T, G, A> {
    type Item = T;
    type IntoIter = Iter<'a, T, G, A>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, G, A> Serialize for ConcurrentVec<T, G, A>
where
    T: Copy + Serialize,
    G: Gate,
    A: BufferAlloc,
{
    /// Serializes the published elements as a sequence.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de, T, G, A> Deserialize<'de> for ConcurrentVec<T, G, A>
where
    T: Copy + Deserialize<'de>,
    G: Gate,
    A: BufferAlloc + Default,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<T>::deserialize(deserializer)?;
        let vec: Self = Builder::new()
            .capacity(items.len())
            .try_build_in(A::default())
            .map_err(serde::de::Error::custom)?;
        vec.extend_from_slice(&items)
            .map_err(serde::de::Error::custom)?;
        Ok(vec)
    }
}

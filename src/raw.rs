//! Raw storage: the owned allocation behind a `ConcurrentVec`.

use core::alloc::Layout;
use core::mem;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

use crate::alloc::BufferAlloc;
use crate::error::TryReserveError;

/// An owned, contiguous buffer of `capacity` element slots whose pointer and
/// capacity are published atomically.
///
/// The pointer may change only while the owning vector holds its gate
/// exclusively, so shared-gate holders always observe a fully old or fully
/// new buffer, never a partial copy. `RawBuf` knows nothing about element
/// liveness; running drop hooks over live slots is the vector's job.
pub(crate) struct RawBuf<T> {
    ptr: AtomicPtr<T>,
    cap: AtomicUsize,
    align: usize,
}

impl<T> RawBuf<T> {
    /// Allocates a buffer of at least one slot (zero-size types never
    /// allocate and report the requested capacity as-is).
    pub(crate) fn with_capacity<A: BufferAlloc>(
        alloc: &A,
        capacity: usize,
        align: usize,
    ) -> Result<Self, TryReserveError> {
        let capacity = capacity.max(1);
        if mem::size_of::<T>() == 0 {
            return Ok(Self {
                ptr: AtomicPtr::new(NonNull::dangling().as_ptr()),
                cap: AtomicUsize::new(capacity),
                align,
            });
        }
        let layout = Self::layout(capacity, align)?;
        let ptr = alloc.allocate(layout)?.cast::<T>();
        Ok(Self {
            ptr: AtomicPtr::new(ptr.as_ptr()),
            cap: AtomicUsize::new(capacity),
            align,
        })
    }

    fn layout(capacity: usize, align: usize) -> Result<Layout, TryReserveError> {
        let size = mem::size_of::<T>()
            .checked_mul(capacity)
            .ok_or(TryReserveError::CapacityOverflow)?;
        Layout::from_size_align(size, align).map_err(|_| TryReserveError::CapacityOverflow)
    }

    pub(crate) fn capacity(&self) -> usize {
        self.cap.load(Ordering::Acquire)
    }

    pub(crate) fn align(&self) -> usize {
        self.align
    }

    /// Current buffer pointer. Only meaningful while the caller holds the
    /// gate in some mode; growth swaps it.
    pub(crate) fn data(&self) -> *mut T {
        self.ptr.load(Ordering::Acquire)
    }

    /// Reallocates the buffer to `new_capacity` slots, preserving contents.
    ///
    /// On failure the old pointer and capacity are untouched.
    ///
    /// # Safety
    /// The caller must hold the gate exclusively: no shared holder may touch
    /// the buffer while the pointer swaps.
    pub(crate) unsafe fn grow<A: BufferAlloc>(
        &self,
        alloc: &A,
        new_capacity: usize,
    ) -> Result<(), TryReserveError> {
        let old_capacity = self.cap.load(Ordering::Relaxed);
        debug_assert!(new_capacity > old_capacity);

        if mem::size_of::<T>() == 0 {
            self.cap.store(new_capacity, Ordering::Release);
            return Ok(());
        }

        let old_layout = Self::layout(old_capacity, self.align)?;
        let new_layout = Self::layout(new_capacity, self.align)?;
        let old_ptr = self.ptr.load(Ordering::Relaxed);
        debug_assert!(!old_ptr.is_null());

        // SAFETY: `old_ptr` came from `allocate`/`reallocate` with
        // `old_layout`; the caller guarantees exclusivity.
        let new_ptr = unsafe {
            alloc.reallocate(
                NonNull::new_unchecked(old_ptr).cast::<u8>(),
                old_layout,
                new_layout.size(),
            )
        }?;

        self.ptr
            .store(new_ptr.cast::<T>().as_ptr(), Ordering::Release);
        self.cap.store(new_capacity, Ordering::Release);
        Ok(())
    }

    /// Frees the buffer. Releasing an already-released (null) buffer is a
    /// no-op.
    pub(crate) fn release<A: BufferAlloc>(&mut self, alloc: &A) {
        if mem::size_of::<T>() == 0 {
            return;
        }
        let ptr = *self.ptr.get_mut();
        let Some(ptr) = NonNull::new(ptr) else {
            return;
        };
        let capacity = *self.cap.get_mut();
        if let Ok(layout) = Self::layout(capacity, self.align) {
            // SAFETY: `ptr` was allocated by `alloc` with exactly this
            // layout, and is nulled below so it cannot be freed twice.
            unsafe { alloc.deallocate(ptr.cast::<u8>(), layout) };
        }
        *self.ptr.get_mut() = core::ptr::null_mut();
    }
}

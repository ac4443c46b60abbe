//! Allocation backends for the vector's storage buffer.
//!
//! The vector only ever needs three operations: allocate a buffer, reallocate
//! it in place (alignment-aware, so the old layout is part of the contract),
//! and free it. [`Heap`] routes these to the global allocator; alternative
//! backends (pools, arenas) can implement [`BufferAlloc`] and be plugged in
//! through the builder.

use core::alloc::Layout;
use core::ptr::NonNull;

use crate::error::TryReserveError;

/// A source of raw storage for the vector's element buffer.
///
/// # Safety
///
/// Implementations must return pointers that are valid for reads and writes
/// of `layout.size()` bytes, aligned to `layout.align()`, and that stay valid
/// until passed back to [`deallocate`] or [`reallocate`]. `reallocate` must
/// preserve the first `min(old, new)` bytes of the buffer and must leave the
/// old buffer untouched when it fails.
///
/// [`deallocate`]: BufferAlloc::deallocate
/// [`reallocate`]: BufferAlloc::reallocate
pub unsafe trait BufferAlloc: Send + Sync {
    /// Allocates a fresh buffer for `layout`.
    ///
    /// # Errors
    /// Returns [`TryReserveError::AllocError`] when memory is exhausted.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, TryReserveError>;

    /// Grows a buffer previously allocated with `old_layout` to `new_size`
    /// bytes, preserving its contents and alignment.
    ///
    /// # Errors
    /// Returns [`TryReserveError::AllocError`] when memory is exhausted. The
    /// old buffer remains allocated and intact in that case.
    ///
    /// # Safety
    /// `ptr` must have been returned by this allocator with `old_layout`, and
    /// `new_size` must be greater than `old_layout.size()`.
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_size: usize,
    ) -> Result<NonNull<u8>, TryReserveError>;

    /// Frees a buffer previously allocated with `layout`.
    ///
    /// # Safety
    /// `ptr` must have been returned by this allocator with `layout` and must
    /// not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// The global-allocator backend. This is the default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Heap;

// SAFETY: delegates directly to the global allocator, which satisfies the
// layout and in-place-preservation contract of `BufferAlloc`.
unsafe impl BufferAlloc for Heap {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, TryReserveError> {
        debug_assert!(layout.size() > 0);
        // SAFETY: the vector never requests a zero-size layout.
        let ptr = unsafe { std::alloc::alloc(layout) };
        NonNull::new(ptr).ok_or(TryReserveError::AllocError)
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_size: usize,
    ) -> Result<NonNull<u8>, TryReserveError> {
        // `std::alloc::realloc` keeps the alignment of `old_layout`, which is
        // what makes the cache-aligned configuration survive growth.
        // SAFETY: the caller upholds the matching-layout contract.
        let ptr = unsafe { std::alloc::realloc(ptr.as_ptr(), old_layout, new_size) };
        NonNull::new(ptr).ok_or(TryReserveError::AllocError)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: the caller upholds the matching-layout contract.
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) };
    }
}

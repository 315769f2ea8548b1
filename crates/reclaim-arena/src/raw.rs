//! Owned heap blocks with a bump cursor.
//!
//! A [`HeapBlock`] is one link of a [`ChainArena`](crate::ChainArena): a
//! fixed-capacity region from the global allocator plus the number of bytes
//! handed out from it. This module holds the chain's `unsafe` code; every
//! block is freed exactly once, by `Drop`.

#![allow(unsafe_code)]

use std::alloc::{self, Layout};
use std::fmt;
use std::ptr::NonNull;

use reclaim_core::align::align_padding;

/// Alignment requested from the global allocator for every block.
///
/// Allocations still align against the block's actual address, so this
/// only makes small default alignments free of padding.
pub(crate) const BLOCK_ALIGN: usize = 16;

/// A heap region of fixed capacity with a bump cursor.
pub(crate) struct HeapBlock {
    ptr: NonNull<u8>,
    capacity: usize,
    used: usize,
}

impl HeapBlock {
    /// Allocate an empty block of `capacity` bytes.
    ///
    /// Returns `None` if the layout is invalid or the allocator fails.
    pub(crate) fn new(capacity: usize) -> Option<Self> {
        let layout = Self::layout(capacity)?;
        // SAFETY: the layout has non-zero size.
        let ptr = NonNull::new(unsafe { alloc::alloc(layout) })?;
        Some(Self {
            ptr,
            capacity,
            used: 0,
        })
    }

    fn layout(capacity: usize) -> Option<Layout> {
        Layout::from_size_align(capacity.max(1), BLOCK_ALIGN).ok()
    }

    /// Bump-allocate `size` bytes at `align` from the free tail.
    ///
    /// Returns `None`, leaving the block untouched, if the request does not
    /// fit.
    pub(crate) fn bump(&mut self, size: usize, align: usize) -> Option<NonNull<u8>> {
        let cursor = self.ptr.addr().get().wrapping_add(self.used);
        let start = self.used.checked_add(align_padding(cursor, align))?;
        let end = start.checked_add(size)?;
        if end > self.capacity {
            return None;
        }
        self.used = end;
        // SAFETY: `start <= end <= capacity`, so the pointer stays within
        // (or one past) this block's allocation.
        Some(unsafe { self.ptr.add(start) })
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn used(&self) -> usize {
        self.used
    }

    /// Resize an empty block to `capacity` bytes in place or by moving it.
    ///
    /// Returns `false`, leaving the block untouched, if the allocator fails.
    pub(crate) fn resize(&mut self, capacity: usize) -> bool {
        debug_assert_eq!(self.used, 0, "only empty blocks are resized");
        let (Some(old), Some(new)) = (Self::layout(self.capacity), Self::layout(capacity)) else {
            return false;
        };
        // SAFETY: `ptr` was allocated with `old`, and `new` has the same
        // alignment and a valid non-zero size.
        let ptr = unsafe { alloc::realloc(self.ptr.as_ptr(), old, new.size()) };
        let Some(ptr) = NonNull::new(ptr) else {
            return false;
        };
        self.ptr = ptr;
        self.capacity = capacity;
        true
    }

    /// Roll the cursor back to `used` bytes.
    pub(crate) fn truncate(&mut self, used: usize) {
        debug_assert!(used <= self.used);
        self.used = used.min(self.used);
    }
}

impl Drop for HeapBlock {
    fn drop(&mut self) {
        if let Some(layout) = Self::layout(self.capacity) {
            // SAFETY: `ptr` was allocated in `new` with this exact layout and
            // is freed only here.
            unsafe { alloc::dealloc(self.ptr.as_ptr(), layout) };
        }
    }
}

// SAFETY: a block uniquely owns its allocation.
unsafe impl Send for HeapBlock {}

impl fmt::Debug for HeapBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeapBlock")
            .field("capacity", &self.capacity)
            .field("used", &self.used)
            .finish()
    }
}

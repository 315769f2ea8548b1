//! The virtual-memory backend interface.
//!
//! A reserve/commit arena needs exactly four platform primitives. They are
//! collected behind [`VirtualMemory`] so the arena logic contains no
//! platform branches; each target provides one implementation, selected at
//! build time, and tests can substitute a heap-backed double.

use std::io;
use std::ptr::NonNull;

/// Platform primitives for reserving and committing address space.
#[allow(unsafe_code)]
pub trait VirtualMemory {
    /// Granularity of reservations and commits, or `None` if unknown.
    fn page_size(&self) -> Option<usize>;

    /// Reserve `size` bytes of address space with no access rights and no
    /// physical backing. `size` is a non-zero multiple of the page size.
    fn reserve(&mut self, size: usize) -> io::Result<NonNull<u8>>;

    /// Make `[base, base + new_committed)` readable and writable.
    ///
    /// # Safety
    ///
    /// `base` must come from [`reserve`](VirtualMemory::reserve) on this
    /// backend and must not have been released. `committed` is the currently
    /// accessible prefix; both sizes are page multiples with
    /// `committed < new_committed <= reserved size`.
    unsafe fn commit(
        &mut self,
        base: NonNull<u8>,
        committed: usize,
        new_committed: usize,
    ) -> io::Result<()>;

    /// Return the whole reservation to the OS.
    ///
    /// # Safety
    ///
    /// `base` and `size` must describe exactly one live reservation made by
    /// this backend. No pointer into the range may be used afterwards.
    unsafe fn release(&mut self, base: NonNull<u8>, size: usize) -> io::Result<()>;
}

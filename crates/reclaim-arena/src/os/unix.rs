//! POSIX implementation.

use std::io;
use std::ptr::{self, NonNull};

use reclaim_core::VirtualMemory;

use super::LockableMemory;

/// Query the OS page size.
pub fn page_size() -> Option<usize> {
    // SAFETY: sysconf has no memory-safety preconditions.
    let ps = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    usize::try_from(ps).ok().filter(|&p| p != 0)
}

/// Total physical memory in bytes.
pub fn system_memory() -> Option<usize> {
    // SAFETY: sysconf has no memory-safety preconditions.
    let pages = unsafe { libc::sysconf(libc::_SC_PHYS_PAGES) };
    let pages = usize::try_from(pages).ok()?;
    pages.checked_mul(page_size()?)
}

/// Current soft `RLIMIT_MEMLOCK`.
pub fn lockable_memory() -> LockableMemory {
    let mut rlim = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: `rlim` is a valid, writable rlimit struct.
    if unsafe { libc::getrlimit(libc::RLIMIT_MEMLOCK, &mut rlim) } != 0 {
        return LockableMemory::Unknown;
    }
    if rlim.rlim_cur == libc::RLIM_INFINITY {
        LockableMemory::Unlimited
    } else {
        LockableMemory::Bytes(usize::try_from(rlim.rlim_cur).unwrap_or(usize::MAX))
    }
}

/// Native virtual-memory backend: anonymous no-access mapping, commit by
/// widening protection, release by unmapping.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemVm;

impl VirtualMemory for SystemVm {
    fn page_size(&self) -> Option<usize> {
        page_size()
    }

    fn reserve(&mut self, size: usize) -> io::Result<NonNull<u8>> {
        // SAFETY: an anonymous mapping at a kernel-chosen address touches no
        // existing memory.
        let base = unsafe {
            libc::mmap(
                ptr::null_mut(),
                size,
                libc::PROT_NONE,
                libc::MAP_PRIVATE | libc::MAP_ANON,
                -1,
                0,
            )
        };
        if base == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        NonNull::new(base.cast::<u8>()).ok_or_else(|| io::Error::other("mmap returned null"))
    }

    unsafe fn commit(
        &mut self,
        base: NonNull<u8>,
        _committed: usize,
        new_committed: usize,
    ) -> io::Result<()> {
        // SAFETY: caller guarantees `[base, base + new_committed)` lies in a
        // live reservation from `reserve`.
        let rc = unsafe {
            libc::mprotect(
                base.as_ptr().cast(),
                new_committed,
                libc::PROT_READ | libc::PROT_WRITE,
            )
        };
        if rc == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    unsafe fn release(&mut self, base: NonNull<u8>, size: usize) -> io::Result<()> {
        // SAFETY: caller guarantees this is exactly one live reservation.
        if unsafe { libc::munmap(base.as_ptr().cast(), size) } == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

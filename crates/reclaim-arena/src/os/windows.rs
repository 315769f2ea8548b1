//! Windows implementation.

use std::io;
use std::mem;
use std::ptr::{self, NonNull};

use reclaim_core::VirtualMemory;
use winapi::shared::basetsd::SIZE_T;
use winapi::um::memoryapi::{VirtualAlloc, VirtualFree};
use winapi::um::processthreadsapi::GetCurrentProcess;
use winapi::um::sysinfoapi::{GetSystemInfo, GlobalMemoryStatusEx, MEMORYSTATUSEX, SYSTEM_INFO};
use winapi::um::winbase::GetProcessWorkingSetSize;
use winapi::um::winnt::{MEM_COMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_NOACCESS, PAGE_READWRITE};

use super::LockableMemory;

/// Query the OS page size.
pub fn page_size() -> Option<usize> {
    // SAFETY: SYSTEM_INFO is plain data; all-zero is a valid value and
    // GetSystemInfo fills it in.
    let info = unsafe {
        let mut info: SYSTEM_INFO = mem::zeroed();
        GetSystemInfo(&mut info);
        info
    };
    Some(info.dwPageSize as usize).filter(|&p| p != 0)
}

/// Total physical memory in bytes.
pub fn system_memory() -> Option<usize> {
    // SAFETY: MEMORYSTATUSEX is plain data with dwLength set as required.
    unsafe {
        let mut status: MEMORYSTATUSEX = mem::zeroed();
        status.dwLength = mem::size_of::<MEMORYSTATUSEX>() as u32;
        if GlobalMemoryStatusEx(&mut status) == 0 {
            return None;
        }
        usize::try_from(status.ullTotalPhys).ok()
    }
}

/// Maximum working-set size of the current process, the closest Windows
/// analogue of a lockable-memory limit.
pub fn lockable_memory() -> LockableMemory {
    let mut min: SIZE_T = 0;
    let mut max: SIZE_T = 0;
    // SAFETY: both out-pointers are valid; the pseudo-handle needs no close.
    let ok = unsafe { GetProcessWorkingSetSize(GetCurrentProcess(), &mut min, &mut max) };
    if ok == 0 {
        LockableMemory::Unknown
    } else {
        LockableMemory::Bytes(max)
    }
}

/// Native virtual-memory backend: `MEM_RESERVE` up front, `MEM_COMMIT` on
/// growth, `MEM_RELEASE` on drop.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemVm;

impl VirtualMemory for SystemVm {
    fn page_size(&self) -> Option<usize> {
        page_size()
    }

    fn reserve(&mut self, size: usize) -> io::Result<NonNull<u8>> {
        // SAFETY: reserving at a system-chosen address touches no existing
        // memory.
        let base = unsafe { VirtualAlloc(ptr::null_mut(), size, MEM_RESERVE, PAGE_NOACCESS) };
        NonNull::new(base.cast::<u8>()).ok_or_else(io::Error::last_os_error)
    }

    unsafe fn commit(
        &mut self,
        base: NonNull<u8>,
        committed: usize,
        new_committed: usize,
    ) -> io::Result<()> {
        // SAFETY: caller guarantees `[base + committed, base + new_committed)`
        // lies in a live reservation from `reserve`.
        let ptr = unsafe {
            VirtualAlloc(
                base.as_ptr().add(committed).cast(),
                new_committed - committed,
                MEM_COMMIT,
                PAGE_READWRITE,
            )
        };
        if ptr.is_null() {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    unsafe fn release(&mut self, base: NonNull<u8>, _size: usize) -> io::Result<()> {
        // SAFETY: caller guarantees this is exactly one live reservation;
        // MEM_RELEASE requires a size of zero.
        if unsafe { VirtualFree(base.as_ptr().cast(), 0, MEM_RELEASE) } == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

//! Operating-system queries and the native [`VirtualMemory`] backend.
//!
//! Everything here is stateless: there is no init/teardown and nothing is
//! cached. Arena constructors receive these values through their backend
//! or config rather than reading global state.
//!
//! One implementation module is compiled per target family:
//!
//! - `unix.rs`: `sysconf`, `getrlimit`, anonymous `mmap` with `PROT_NONE`,
//!   `mprotect` to commit, `munmap` to release.
//! - `windows.rs`: `GetSystemInfo`, `GlobalMemoryStatusEx`,
//!   `VirtualAlloc(MEM_RESERVE)`, `VirtualAlloc(MEM_COMMIT)`,
//!   `VirtualFree(MEM_RELEASE)`.
//!
//! [`VirtualMemory`]: reclaim_core::VirtualMemory

#![allow(unsafe_code)]

#[cfg(unix)]
#[path = "unix.rs"]
mod imp;

#[cfg(windows)]
#[path = "windows.rs"]
mod imp;

pub use imp::{lockable_memory, page_size, system_memory, SystemVm};

/// How much memory the process may lock into physical pages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockableMemory {
    /// The limit could not be queried.
    Unknown,
    /// At most this many bytes may be locked (possibly zero).
    Bytes(usize),
    /// No limit is imposed.
    Unlimited,
}

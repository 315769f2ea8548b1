//! Heap-backed virtual-memory double.
//!
//! [`MockVm`] hands out page-aligned, zeroed heap regions as
//! "reservations". It does not enforce access rights, but it does check the
//! commit/release protocol with assertions, counts every call, and can be
//! told to fail reservations or commits.

#![allow(unsafe_code)]

use std::alloc::{self, Layout};
use std::io;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use reclaim_core::VirtualMemory;

/// `ENOMEM`, reported for injected failures.
const INJECTED_OS_CODE: i32 = 12;

/// Call counters shared between a [`MockVm`] and the test holding it.
#[derive(Debug, Default)]
pub struct VmStats {
    reserves: AtomicUsize,
    commits: AtomicUsize,
    releases: AtomicUsize,
    live_bytes: AtomicUsize,
}

impl VmStats {
    /// Successful `reserve` calls.
    pub fn reserves(&self) -> usize {
        self.reserves.load(Ordering::Relaxed)
    }

    /// Successful `commit` calls.
    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::Relaxed)
    }

    /// Successful `release` calls.
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::Relaxed)
    }

    /// Bytes reserved and not yet released.
    pub fn live_bytes(&self) -> usize {
        self.live_bytes.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
struct Region {
    base: NonNull<u8>,
    layout: Layout,
    committed: usize,
}

/// Heap-backed [`VirtualMemory`] with failure injection.
#[derive(Debug)]
pub struct MockVm {
    page_size: Option<usize>,
    refuse_reserve: bool,
    /// Commits left before every further commit fails; `None` = never fail.
    commits_left: Option<usize>,
    regions: Vec<Region>,
    stats: Arc<VmStats>,
}

impl MockVm {
    /// A backend reporting `page_size` that never fails.
    pub fn new(page_size: usize) -> Self {
        assert!(page_size.is_power_of_two(), "page size must be a power of two");
        Self {
            page_size: Some(page_size),
            refuse_reserve: false,
            commits_left: None,
            regions: Vec::new(),
            stats: Arc::default(),
        }
    }

    /// A backend that cannot report a page size.
    pub fn unknown_page_size() -> Self {
        let mut vm = Self::new(4096);
        vm.page_size = None;
        vm
    }

    /// A backend whose every `reserve` fails.
    pub fn refusing_reserve(page_size: usize) -> Self {
        let mut vm = Self::new(page_size);
        vm.refuse_reserve = true;
        vm
    }

    /// Let the first `n` commits succeed and fail every one after.
    pub fn fail_commits_after(mut self, n: usize) -> Self {
        self.commits_left = Some(n);
        self
    }

    /// Shared handle to the call counters. Outlives the backend.
    pub fn stats(&self) -> Arc<VmStats> {
        Arc::clone(&self.stats)
    }

    fn region_mut(&mut self, base: NonNull<u8>) -> Option<&mut Region> {
        self.regions.iter_mut().find(|r| r.base == base)
    }

    fn injected() -> io::Error {
        io::Error::from_raw_os_error(INJECTED_OS_CODE)
    }
}

impl VirtualMemory for MockVm {
    fn page_size(&self) -> Option<usize> {
        self.page_size
    }

    fn reserve(&mut self, size: usize) -> io::Result<NonNull<u8>> {
        if self.refuse_reserve {
            return Err(Self::injected());
        }
        let page = self.page_size.unwrap_or(4096);
        assert!(size > 0 && size % page == 0, "reserve({size}) is not a page multiple");
        let layout = Layout::from_size_align(size, page)
            .map_err(|_| Self::injected())?;
        // SAFETY: `size > 0`.
        let base = NonNull::new(unsafe { alloc::alloc_zeroed(layout) }).ok_or_else(Self::injected)?;
        self.regions.push(Region {
            base,
            layout,
            committed: 0,
        });
        self.stats.reserves.fetch_add(1, Ordering::Relaxed);
        self.stats.live_bytes.fetch_add(size, Ordering::Relaxed);
        Ok(base)
    }

    unsafe fn commit(
        &mut self,
        base: NonNull<u8>,
        committed: usize,
        new_committed: usize,
    ) -> io::Result<()> {
        let page = self.page_size.unwrap_or(4096);
        if let Some(left) = self.commits_left {
            if left == 0 {
                return Err(Self::injected());
            }
            self.commits_left = Some(left - 1);
        }
        let region = self
            .region_mut(base)
            .ok_or_else(|| io::Error::other("commit on unknown reservation"))?;
        assert_eq!(region.committed, committed, "commit from a stale prefix");
        assert!(
            committed < new_committed && new_committed <= region.layout.size(),
            "commit range {committed}..{new_committed} outside reservation"
        );
        assert_eq!(new_committed % page, 0, "commit end is not a page multiple");
        region.committed = new_committed;
        self.stats.commits.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    unsafe fn release(&mut self, base: NonNull<u8>, size: usize) -> io::Result<()> {
        let idx = self
            .regions
            .iter()
            .position(|r| r.base == base)
            .ok_or_else(|| io::Error::other("release of unknown reservation"))?;
        let region = self.regions.swap_remove(idx);
        assert_eq!(region.layout.size(), size, "release size mismatch");
        // SAFETY: allocated in `reserve` with this layout, removed from
        // `regions` so it is freed once.
        unsafe { alloc::dealloc(region.base.as_ptr(), region.layout) };
        self.stats.releases.fetch_add(1, Ordering::Relaxed);
        self.stats.live_bytes.fetch_sub(size, Ordering::Relaxed);
        Ok(())
    }
}

impl Drop for MockVm {
    fn drop(&mut self) {
        for region in self.regions.drain(..) {
            // SAFETY: still-live regions from `reserve`.
            unsafe { alloc::dealloc(region.base.as_ptr(), region.layout) };
        }
    }
}

// SAFETY: the backend exclusively owns its regions.
unsafe impl Send for MockVm {}

//! Reserve-then-commit bump arena.
//!
//! [`VirtualArena`] reserves its whole address range once, at construction,
//! and commits pages on demand as the bump offset advances. The base address
//! never moves, so growth never invalidates earlier pointers.
//!
//! ```text
//! base                      used          committed                reserved
//!  |=========================|---------------|.........................|
//!   live allocations          committed,      reserved, no access,
//!                             reusable        no physical backing
//! ```
//!
//! `restore` only moves `used` back. Committed pages are kept until the
//! arena is dropped, which releases the reservation in one OS call.

#![allow(unsafe_code)]

use std::fmt;
use std::ptr::NonNull;

use reclaim_core::align::{align_padding, round_to_multiple};
use reclaim_core::{Alloc, AllocError, InitError, StackAlloc, StackToken, VirtualMemory};
use tracing::{debug, warn};

use crate::config::VirtualConfig;
use crate::os::SystemVm;

/// Growable bump arena over a fixed virtual-memory reservation.
pub struct VirtualArena<V: VirtualMemory = SystemVm> {
    vm: V,
    /// Start of the reservation. Stable for the arena's lifetime.
    base: NonNull<u8>,
    /// Reserved bytes, a page multiple.
    reserved: usize,
    /// Accessible prefix, a page multiple, `<= reserved`. Never shrinks.
    committed: usize,
    /// Bump offset, `<= committed`.
    used: usize,
    default_align: usize,
    /// Commit granularity, a page multiple.
    grow_size: usize,
}

// SAFETY: the arena exclusively owns its reservation; moving it to another
// thread moves that ownership. It is not `Sync`.
unsafe impl<V: VirtualMemory + Send> Send for VirtualArena<V> {}

impl VirtualArena<SystemVm> {
    /// Reserve address space with the native backend.
    pub fn new(config: VirtualConfig) -> Result<Self, InitError> {
        Self::with_backend(config, SystemVm)
    }
}

impl<V: VirtualMemory> VirtualArena<V> {
    /// Reserve address space with an explicit backend.
    ///
    /// Fails if the config is out of range, if the backend cannot report a
    /// page size, or if the reservation is refused.
    pub fn with_backend(config: VirtualConfig, mut vm: V) -> Result<Self, InitError> {
        if config.reserve_size == 0 {
            return Err(InitError::InvalidConfig {
                reason: "reserve_size must be non-zero".into(),
            });
        }
        if !config.default_align.is_power_of_two() {
            return Err(InitError::InvalidConfig {
                reason: format!(
                    "default_align must be a power of two (got {})",
                    config.default_align
                ),
            });
        }

        let page = vm
            .page_size()
            .filter(|&p| p != 0)
            .ok_or(InitError::PageSizeUnknown)?;
        let reserved =
            round_to_multiple(config.reserve_size, page).ok_or_else(|| InitError::InvalidConfig {
                reason: format!(
                    "reserve_size {} overflows when rounded to {page} byte pages",
                    config.reserve_size
                ),
            })?;
        let grow_size = round_to_multiple(config.grow_size.max(1), page).ok_or_else(|| {
            InitError::InvalidConfig {
                reason: format!(
                    "grow_size {} overflows when rounded to {page} byte pages",
                    config.grow_size
                ),
            }
        })?;

        let base = vm
            .reserve(reserved)
            .map_err(|e| InitError::reserve_failed(reserved, &e))?;
        debug!(
            reserved,
            grow_size,
            page,
            default_align = config.default_align,
            "reserved virtual arena"
        );

        Ok(Self {
            vm,
            base,
            reserved,
            committed: 0,
            used: 0,
            default_align: config.default_align,
            grow_size,
        })
    }

    /// Start of the reservation.
    pub fn base(&self) -> NonNull<u8> {
        self.base
    }

    /// Reserved bytes (page-rounded).
    pub fn reserved_size(&self) -> usize {
        self.reserved
    }

    /// Bytes currently readable and writable. The high-water mark of growth.
    pub fn committed_size(&self) -> usize {
        self.committed
    }

    /// Bytes handed out, including alignment padding.
    pub fn used_size(&self) -> usize {
        self.used
    }

    /// Commit granularity (page-rounded).
    pub fn grow_size(&self) -> usize {
        self.grow_size
    }

    /// Borrow the backend.
    pub fn backend(&self) -> &V {
        &self.vm
    }

    /// Extend the committed prefix to cover `end` bytes.
    ///
    /// Leaves `committed` untouched on failure.
    fn grow(&mut self, end: usize) -> Result<(), AllocError> {
        if end > self.reserved {
            return Err(AllocError::CapacityExceeded {
                requested: end,
                capacity: self.reserved,
            });
        }
        // The reservation is a page multiple but not necessarily a multiple
        // of the growth step, so the last step is clipped to it.
        let target = round_to_multiple(end, self.grow_size)
            .unwrap_or(self.reserved)
            .min(self.reserved);

        // SAFETY: `base` is our live reservation and
        // `committed < end <= target <= reserved`, all page multiples.
        let result = unsafe { self.vm.commit(self.base, self.committed, target) };
        if let Err(e) = result {
            warn!(
                committed = self.committed,
                target,
                error = %e,
                "virtual arena commit failed"
            );
            return Err(AllocError::commit_failed(target, &e));
        }
        debug!(from = self.committed, to = target, "virtual arena committed");
        self.committed = target;
        Ok(())
    }
}

impl<V: VirtualMemory> Alloc for VirtualArena<V> {
    fn alloc(&mut self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        let align = if align == 0 { self.default_align } else { align };
        debug_assert!(align.is_power_of_two(), "align must be a power of two");

        // Align the absolute address, not just the offset.
        let cursor = self.base.addr().get().wrapping_add(self.used);
        let offset = self
            .used
            .checked_add(align_padding(cursor, align))
            .ok_or(AllocError::OutOfMemory { requested: size })?;
        let end = offset
            .checked_add(size)
            .ok_or(AllocError::OutOfMemory { requested: size })?;

        if end > self.committed {
            self.grow(end)?;
        }

        self.used = end;
        // SAFETY: `offset <= end <= committed <= reserved`, so the result
        // stays inside the reservation and keeps `base`'s provenance.
        Ok(unsafe { self.base.add(offset) })
    }

    fn default_align(&self) -> usize {
        self.default_align
    }
}

impl<V: VirtualMemory> StackAlloc for VirtualArena<V> {
    fn save(&self) -> StackToken {
        StackToken::from_extent(self.used)
    }

    fn restore(&mut self, token: StackToken) {
        debug_assert!(
            token.extent() <= self.used,
            "restore token {token} is beyond the current extent {}",
            self.used
        );
        self.used = token.extent().min(self.used);
    }
}

impl<V: VirtualMemory> Drop for VirtualArena<V> {
    fn drop(&mut self) {
        // SAFETY: `base`/`reserved` describe the reservation made in
        // `with_backend`; nothing can use it after drop.
        if let Err(e) = unsafe { self.vm.release(self.base, self.reserved) } {
            warn!(reserved = self.reserved, error = %e, "failed to release virtual arena");
        } else {
            debug!(reserved = self.reserved, committed = self.committed, "released virtual arena");
        }
    }
}

impl<V: VirtualMemory> fmt::Debug for VirtualArena<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualArena")
            .field("base", &self.base)
            .field("reserved", &self.reserved)
            .field("committed", &self.committed)
            .field("used", &self.used)
            .field("default_align", &self.default_align)
            .field("grow_size", &self.grow_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reclaim_test_utils::MockVm;

    const PAGE: usize = 4096;

    fn arena(reserve: usize, grow: usize, align: usize) -> VirtualArena<MockVm> {
        let config = VirtualConfig::new(reserve)
            .with_grow_size(grow)
            .with_default_align(align);
        VirtualArena::with_backend(config, MockVm::new(PAGE)).unwrap()
    }

    #[test]
    fn construction_rounds_to_pages() {
        let a = arena(PAGE + 1, 1, 16);
        assert_eq!(a.reserved_size(), 2 * PAGE);
        assert_eq!(a.grow_size(), PAGE);
        assert_eq!(a.committed_size(), 0);
        assert_eq!(a.used_size(), 0);
    }

    #[test]
    fn zero_grow_size_means_one_page() {
        let a = arena(4 * PAGE, 0, 16);
        assert_eq!(a.grow_size(), PAGE);
    }

    #[test]
    fn zero_reservation_is_rejected() {
        let err = VirtualArena::with_backend(VirtualConfig::new(0), MockVm::new(PAGE)).unwrap_err();
        assert!(matches!(err, InitError::InvalidConfig { .. }));
    }

    #[test]
    fn non_power_of_two_default_align_is_rejected() {
        let config = VirtualConfig::new(PAGE).with_default_align(24);
        let err = VirtualArena::with_backend(config, MockVm::new(PAGE)).unwrap_err();
        assert!(matches!(err, InitError::InvalidConfig { .. }));
    }

    #[test]
    fn unknown_page_size_fails_construction() {
        let err =
            VirtualArena::with_backend(VirtualConfig::new(PAGE), MockVm::unknown_page_size())
                .unwrap_err();
        assert_eq!(err, InitError::PageSizeUnknown);
    }

    #[test]
    fn refused_reservation_fails_construction() {
        let err = VirtualArena::with_backend(VirtualConfig::new(PAGE), MockVm::refusing_reserve(PAGE))
            .unwrap_err();
        assert!(matches!(
            err,
            InitError::ReserveFailed {
                requested: PAGE,
                ..
            }
        ));
    }

    #[test]
    fn first_alloc_commits_one_growth_step() {
        let mut a = arena(16 * PAGE, 2 * PAGE, 16);
        let p = a.alloc(100, 0).unwrap();
        assert_eq!(p, a.base());
        assert_eq!(a.committed_size(), 2 * PAGE);
        assert_eq!(a.used_size(), 100);
        assert_eq!(a.backend().stats().commits(), 1);
    }

    #[test]
    fn alignment_is_applied_to_the_address() {
        let mut a = arena(4 * PAGE, PAGE, 16);
        a.alloc(3, 1).unwrap();
        let p = a.alloc(8, 64).unwrap();
        assert_eq!(p.addr().get() % 64, 0);
        assert_eq!(a.used_size(), 72);
    }

    #[test]
    fn growth_is_clipped_to_the_reservation() {
        // 3 pages reserved, 2 page steps: the second step may only add one.
        let mut a = arena(3 * PAGE, 2 * PAGE, 16);
        a.alloc(2 * PAGE, 0).unwrap();
        assert_eq!(a.committed_size(), 2 * PAGE);
        a.alloc(PAGE, 0).unwrap();
        assert_eq!(a.committed_size(), 3 * PAGE);
    }

    #[test]
    fn exhausted_reservation_fails_without_mutation() {
        let mut a = arena(PAGE, PAGE, 16);
        a.alloc(PAGE - 8, 16).unwrap();
        let before = (a.used_size(), a.committed_size());
        let err = a.alloc(16, 0).unwrap_err();
        assert_eq!(
            err,
            AllocError::CapacityExceeded {
                requested: PAGE + 16,
                capacity: PAGE
            }
        );
        assert_eq!((a.used_size(), a.committed_size()), before);
    }

    #[test]
    fn commit_failure_leaves_state_unchanged() {
        let config = VirtualConfig::new(8 * PAGE).with_grow_size(PAGE);
        let mut a = VirtualArena::with_backend(config, MockVm::new(PAGE).fail_commits_after(1))
            .unwrap();
        a.alloc(PAGE, 0).unwrap();
        let err = a.alloc(1, 0).unwrap_err();
        assert!(matches!(err, AllocError::CommitFailed { requested, .. } if requested == 2 * PAGE));
        assert_eq!(a.used_size(), PAGE);
        assert_eq!(a.committed_size(), PAGE);
        // Requests inside the committed prefix still succeed after a restore.
        a.restore(StackToken::EMPTY);
        assert!(a.alloc(PAGE, 0).is_ok());
    }

    #[test]
    fn restore_keeps_committed_high_water_mark() {
        let mut a = arena(8 * PAGE, PAGE, 16);
        let t = a.save();
        a.alloc(3 * PAGE, 0).unwrap();
        a.restore(t);
        assert_eq!(a.used_size(), 0);
        assert_eq!(a.committed_size(), 3 * PAGE);
        a.alloc(3 * PAGE, 0).unwrap();
        assert_eq!(a.backend().stats().commits(), 1);
    }

    #[test]
    fn save_restore_without_alloc_is_a_no_op() {
        let mut a = arena(4 * PAGE, PAGE, 16);
        a.alloc(40, 0).unwrap();
        let t = a.save();
        a.restore(t);
        let p = a.alloc(8, 0).unwrap();
        assert_eq!(p.addr().get() - a.base().addr().get(), 48);
    }

    #[test]
    fn rollback_reproduces_the_same_pointer() {
        let mut a = arena(4 * PAGE, PAGE, 16);
        a.alloc(100, 0).unwrap();
        let t = a.save();
        let first = a.alloc(200, 0).unwrap();
        a.restore(t);
        let second = a.alloc(200, 0).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn overflowing_request_is_exhaustion_not_panic() {
        let mut a = arena(4 * PAGE, PAGE, 16);
        a.alloc(1, 0).unwrap();
        let err = a.alloc(usize::MAX, 0).unwrap_err();
        assert_eq!(err, AllocError::OutOfMemory { requested: usize::MAX });
        assert_eq!(a.used_size(), 1);
    }

    #[test]
    fn zero_size_alloc_needs_no_commit() {
        let mut a = arena(4 * PAGE, PAGE, 16);
        let p = a.alloc(0, 0).unwrap();
        assert_eq!(p, a.base());
        assert_eq!(a.committed_size(), 0);
    }

    #[test]
    fn drop_releases_reservation_once() {
        let vm = MockVm::new(PAGE);
        let stats = vm.stats();
        {
            let _a = VirtualArena::with_backend(VirtualConfig::new(2 * PAGE), vm).unwrap();
        }
        assert_eq!(stats.reserves(), 1);
        assert_eq!(stats.releases(), 1);
        assert_eq!(stats.live_bytes(), 0);
    }

    #[test]
    fn written_memory_is_readable() {
        let mut a = arena(4 * PAGE, PAGE, 16);
        let p = a.alloc_copy(b"persistent", 0).unwrap();
        // SAFETY: `p` was just allocated and nothing has been restored.
        let bytes = unsafe { p.as_ref() };
        assert_eq!(bytes, b"persistent");
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "beyond the current extent")]
    fn forward_restore_token_panics_in_debug() {
        let mut a = arena(4 * PAGE, PAGE, 8);
        a.alloc(8, 0).unwrap();
        a.restore(StackToken::from_extent(999));
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn forward_restore_token_is_ignored_in_release() {
        let mut a = arena(4 * PAGE, PAGE, 8);
        let p = a.alloc(8, 0).unwrap();
        a.restore(StackToken::from_extent(999));
        assert_eq!(a.save().extent(), 8);
        let q = a.alloc(8, 0).unwrap();
        assert_eq!(q.addr().get() - p.addr().get(), 8);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "align must be a power of two")]
    fn non_power_of_two_align_panics_in_debug() {
        let mut a = arena(4 * PAGE, PAGE, 8);
        let _ = a.alloc(8, 24);
    }
}

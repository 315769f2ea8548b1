//! Integration test: heap high-water mark of a coalescing reset.
//!
//! Runs under a counting global allocator, so this binary holds a single
//! test to keep other threads' allocations out of the numbers.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicUsize, Ordering};

use reclaim_arena::{ChainArena, ChainConfig, ResetPolicy};
use reclaim_core::Alloc;

struct Counting;

static LIVE: AtomicUsize = AtomicUsize::new(0);
static PEAK: AtomicUsize = AtomicUsize::new(0);

fn track_alloc(size: usize) {
    let live = LIVE.fetch_add(size, Ordering::SeqCst) + size;
    PEAK.fetch_max(live, Ordering::SeqCst);
}

// SAFETY: forwards to `System` unchanged and only adds bookkeeping.
unsafe impl GlobalAlloc for Counting {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        // SAFETY: caller upholds `GlobalAlloc::alloc`'s contract.
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            track_alloc(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        // SAFETY: caller upholds `GlobalAlloc::dealloc`'s contract.
        unsafe { System.dealloc(ptr, layout) };
        LIVE.fetch_sub(layout.size(), Ordering::SeqCst);
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        // Count a moving realloc as old and new both live.
        track_alloc(new_size);
        // SAFETY: caller upholds `GlobalAlloc::realloc`'s contract.
        let new = unsafe { System.realloc(ptr, layout, new_size) };
        if new.is_null() {
            LIVE.fetch_sub(new_size, Ordering::SeqCst);
        } else {
            LIVE.fetch_sub(layout.size(), Ordering::SeqCst);
        }
        new
    }
}

#[global_allocator]
static GLOBAL: Counting = Counting;

const BLOCK: usize = 1024 * 1024;

#[test]
fn coalescing_reset_frees_smaller_blocks_before_resizing() {
    let config = ChainConfig::new()
        .with_initial_size(BLOCK)
        .with_max_grow(BLOCK)
        .with_default_align(1);
    let mut arena = ChainArena::with_page_size(config, None).unwrap();
    for _ in 0..4 {
        arena.alloc(BLOCK, 1).unwrap();
    }
    assert_eq!(arena.buffer_count(), 4);
    let total = arena.total_capacity();
    assert_eq!(total, 4 * BLOCK);

    let before = LIVE.load(Ordering::SeqCst);
    PEAK.store(before, Ordering::SeqCst);
    arena.reset(ResetPolicy::Coalesce);
    let peak = PEAK.load(Ordering::SeqCst) - before;

    assert_eq!(arena.buffer_count(), 1);
    assert_eq!(arena.head_capacity(), total);
    // The old chain and a chain-sized block are never live together.
    assert!(
        peak < total,
        "reset peaked at {peak} bytes above a {total}-byte chain"
    );
}

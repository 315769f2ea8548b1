//! Buffer-chain temporaries arena.
//!
//! [`ChainArena`] grows by linking new heap blocks in front of the current
//! one instead of reserving address space, so it needs no virtual-memory
//! support from the OS. Earlier blocks are frozen: their `used` counts are
//! folded into `pre_head` the moment they stop being the head.
//!
//! ```text
//! frozen[0]        frozen[1]            head
//! [used|waste] ->  [used     |waste] -> [used   |free          ]
//! \________ pre_head ________/          \_used_/
//! ```
//!
//! `save()` is `pre_head + head.used`. `restore` pops whole blocks until the
//! remainder fits in the head, so it costs O(blocks crossed). Any pointer into
//! a popped block dies with it, even if it was allocated before the token was
//! saved in some other sense; never keep a pointer across a restore.

use std::mem;
use std::ptr::NonNull;

use reclaim_core::{Alloc, AllocError, InitError, StackAlloc, StackToken};
use tracing::{debug, trace, warn};

use crate::config::ChainConfig;
use crate::os;
use crate::raw::HeapBlock;

/// How [`ChainArena::reset`] treats the existing blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ResetPolicy {
    /// Keep the largest block and free the rest.
    #[default]
    KeepLargest,
    /// Replace the chain with one block as large as all blocks combined, so
    /// the next pass of the same size needs no growth. The smaller blocks
    /// are freed before the largest one is resized to the total. Falls back
    /// to [`ResetPolicy::KeepLargest`] if the resize fails, or if there is
    /// only one block.
    Coalesce,
}

/// Growable bump arena made of a chain of heap blocks.
#[derive(Debug)]
pub struct ChainArena {
    /// Current block; all allocations come from here.
    head: HeapBlock,
    /// Previous heads, oldest first.
    frozen: Vec<HeapBlock>,
    /// Sum of `used` over `frozen`.
    pre_head: usize,
    default_align: usize,
    max_grow: usize,
    coalesce_on_restore: bool,
}

impl ChainArena {
    /// Build an arena, defaulting the initial size to the OS page size.
    pub fn new(config: ChainConfig) -> Result<Self, InitError> {
        Self::with_page_size(config, os::page_size())
    }

    /// Build an arena against an explicit page size (`None` = unknown).
    pub fn with_page_size(config: ChainConfig, page_size: Option<usize>) -> Result<Self, InitError> {
        let (initial, max_grow, default_align) = config.resolve(page_size);
        if !default_align.is_power_of_two() {
            return Err(InitError::InvalidConfig {
                reason: format!("default_align must be a power of two (got {default_align})"),
            });
        }
        let head = HeapBlock::new(initial).ok_or(InitError::OutOfMemory { requested: initial })?;
        debug!(initial, max_grow, default_align, "created chain arena");
        Ok(Self {
            head,
            frozen: Vec::new(),
            pre_head: 0,
            default_align,
            max_grow,
            coalesce_on_restore: config.coalesce_on_restore,
        })
    }

    /// Bytes logically allocated, padding included. Equal to `save()`.
    pub fn extent(&self) -> usize {
        self.pre_head + self.head.used()
    }

    /// Number of blocks in the chain (always at least one).
    pub fn buffer_count(&self) -> usize {
        self.frozen.len() + 1
    }

    /// Capacity of the current head block.
    pub fn head_capacity(&self) -> usize {
        self.head.capacity()
    }

    /// Bytes used in the current head block.
    pub fn head_used(&self) -> usize {
        self.head.used()
    }

    /// Sum of all block capacities.
    pub fn total_capacity(&self) -> usize {
        self.frozen
            .iter()
            .fold(self.head.capacity(), |acc, b| acc.saturating_add(b.capacity()))
    }

    /// Growth cap for the doubling heuristic.
    pub fn max_grow(&self) -> usize {
        self.max_grow
    }

    /// Discard every allocation and shrink the chain to one block.
    ///
    /// All previously returned pointers become invalid.
    pub fn reset(&mut self, policy: ResetPolicy) {
        let blocks = self.buffer_count();
        let total = self.total_capacity();

        // Ties go to the most recent block.
        let largest = self
            .frozen
            .iter()
            .enumerate()
            .filter(|(_, b)| b.capacity() > self.head.capacity())
            .max_by_key(|(_, b)| b.capacity())
            .map(|(i, _)| i);
        if let Some(i) = largest {
            self.head = self.frozen.swap_remove(i);
        }
        self.frozen.clear();
        self.head.truncate(0);
        self.pre_head = 0;

        if policy == ResetPolicy::Coalesce && blocks > 1 {
            // Only the kept block is live here.
            if self.head.resize(total) {
                debug!(blocks, capacity = total, "chain arena reset: coalesced");
                return;
            }
            warn!(blocks, capacity = total, "chain arena coalesce failed, keeping largest block");
        }
        debug!(blocks, capacity = self.head.capacity(), "chain arena reset: kept largest");
    }

    /// Link a fresh head able to hold `size` bytes at `align`.
    ///
    /// On failure the chain is untouched.
    fn grow(&mut self, size: usize, align: usize) -> Result<(), AllocError> {
        let min = size
            .checked_add(align - 1)
            .ok_or(AllocError::OutOfMemory { requested: size })?;
        let doubled = self
            .head
            .used()
            .saturating_mul(2)
            .min(self.max_grow)
            .max(size);
        let capacity = doubled.max(min);

        let Some(block) = HeapBlock::new(capacity) else {
            warn!(capacity, size, "chain arena failed to allocate a new block");
            return Err(AllocError::OutOfMemory {
                requested: capacity,
            });
        };
        debug!(
            capacity,
            size,
            blocks = self.buffer_count() + 1,
            "chain arena grew"
        );
        let old = mem::replace(&mut self.head, block);
        self.pre_head += old.used();
        self.frozen.push(old);
        Ok(())
    }

    /// Replace a lone emptied head with a block of `live` bytes.
    fn coalesce_after_restore(&mut self, live: usize) {
        if !self.frozen.is_empty() || self.head.used() != 0 || live <= self.head.capacity() {
            return;
        }
        if let Some(block) = HeapBlock::new(live) {
            trace!(from = self.head.capacity(), to = live, "chain arena resized head after restore");
            self.head = block;
        }
    }
}

impl Alloc for ChainArena {
    fn alloc(&mut self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        let align = if align == 0 { self.default_align } else { align };
        debug_assert!(align.is_power_of_two(), "align must be a power of two");

        if let Some(ptr) = self.head.bump(size, align) {
            return Ok(ptr);
        }
        self.grow(size, align)?;
        // A fresh block of at least `size + align - 1` bytes always fits.
        self.head
            .bump(size, align)
            .ok_or(AllocError::OutOfMemory { requested: size })
    }

    fn default_align(&self) -> usize {
        self.default_align
    }
}

impl StackAlloc for ChainArena {
    fn save(&self) -> StackToken {
        StackToken::from_extent(self.extent())
    }

    fn restore(&mut self, token: StackToken) {
        let extent = self.extent();
        debug_assert!(
            token.extent() <= extent,
            "restore token {token} is beyond the current extent {extent}"
        );
        let mut discard = extent - token.extent().min(extent);

        // A head whose whole contents are discarded was created after the
        // token was taken (heads are never empty once grown into), so it
        // goes too.
        while discard > 0 && discard >= self.head.used() {
            let Some(prev) = self.frozen.pop() else {
                break;
            };
            let freed = mem::replace(&mut self.head, prev);
            discard -= freed.used();
            self.pre_head -= self.head.used();
            trace!(
                capacity = freed.capacity(),
                used = freed.used(),
                "chain arena freed block on restore"
            );
        }
        self.head.truncate(self.head.used().saturating_sub(discard));

        if self.coalesce_on_restore {
            self.coalesce_after_restore(extent);
        }
    }
}

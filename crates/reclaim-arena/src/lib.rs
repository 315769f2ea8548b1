//! Bulk-reclaim bump arenas.
//!
//! Two arenas implement the [`StackAlloc`](reclaim_core::StackAlloc)
//! contract from `reclaim-core`:
//!
//! ```text
//! VirtualArena<V>   one reservation, pages committed on demand
//! │                 (V = SystemVm: mmap/mprotect or VirtualAlloc)
//! │
//! ChainArena        linked heap blocks, no OS reservation
//! └── HeapBlock × n (oldest frozen, newest is the head)
//! ```
//!
//! Pick [`VirtualArena`] when the address space is available and pointers
//! must never move; pick [`ChainArena`] when it is not (small address
//! spaces, sandboxes) or when the working set is small and short-lived.
//!
//! Neither arena frees individual objects. Memory comes back in bulk, either
//! through `restore` to a saved [`StackToken`](reclaim_core::StackToken), a
//! [`Scope`](reclaim_core::Scope) guard, [`MarkStack`], or drop.
//!
//! # Unsafe code
//!
//! Confined to `raw.rs` (heap blocks), `virtual_arena.rs` (pointer
//! arithmetic over the reservation) and `os/` (system calls).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod chain;
pub mod config;
pub mod marks;
pub mod os;
mod raw;
pub mod virtual_arena;

// Public re-exports for the primary API surface.
pub use chain::{ChainArena, ResetPolicy};
pub use config::{ChainConfig, VirtualConfig};
pub use marks::MarkStack;
pub use os::{LockableMemory, SystemVm};
pub use virtual_arena::VirtualArena;

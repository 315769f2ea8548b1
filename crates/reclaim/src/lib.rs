//! Reclaim: bump arenas that free memory in bulk.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Reclaim sub-crates. For most users, adding `reclaim` as a single dependency
//! is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use reclaim::prelude::*;
//!
//! // Scratch space for one pass; nothing is freed individually.
//! let mut arena = ChainArena::new(ChainConfig::new()).unwrap();
//!
//! let name = arena.alloc_copy(b"persistent", 1).unwrap();
//! {
//!     let mut scratch = arena.scope();
//!     for _ in 0..100 {
//!         scratch.alloc(256, 0).unwrap();
//!     }
//!     // Everything allocated through `scratch` is released here.
//! }
//! assert_eq!(arena.extent(), name.len());
//!
//! // Same contract, different backing: one reservation, pages on demand.
//! let mut big = VirtualArena::new(VirtualConfig::new(64 << 20)).unwrap();
//! let t = big.save();
//! big.alloc(1 << 20, 4096).unwrap();
//! big.restore(t);
//! assert_eq!(big.used_size(), 0);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `reclaim-core` | `Alloc`/`StackAlloc` traits, tokens, scopes, errors, `VirtualMemory` |
//! | [`arena`] | `reclaim-arena` | `VirtualArena`, `ChainArena`, `MarkStack`, configs, OS queries |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Allocation contracts (`reclaim-core`).
///
/// Program against [`types::Alloc`] and [`types::StackAlloc`]; implement
/// [`types::VirtualMemory`] to run a [`arena::VirtualArena`] on a custom
/// backend.
pub use reclaim_core as types;

/// Arena implementations (`reclaim-arena`).
///
/// [`arena::VirtualArena`] for a fixed reservation with stable addresses,
/// [`arena::ChainArena`] when address space cannot be reserved up front.
/// [`arena::os`] exposes page size and memory limits.
pub use reclaim_arena as arena;

/// Common imports for typical Reclaim usage.
///
/// ```rust
/// use reclaim::prelude::*;
/// ```
pub mod prelude {
    // Contracts
    pub use reclaim_core::{Alloc, Scope, StackAlloc, StackToken};

    // Errors
    pub use reclaim_core::{AllocError, InitError, RestoreError};

    // Arenas
    pub use reclaim_arena::{
        ChainArena, ChainConfig, MarkStack, ResetPolicy, VirtualArena, VirtualConfig,
    };
}

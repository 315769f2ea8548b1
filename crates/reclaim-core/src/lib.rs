//! Core allocation contracts for the Reclaim arenas.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! capability surface every Reclaim arena implements and every consumer
//! programs against:
//!
//! - [`Alloc`]: `alloc(size, align) -> pointer | error`.
//! - [`StackAlloc`]: adds `save()`/`restore()` bulk rollback via an opaque
//!   [`StackToken`].
//! - [`Scope`]: RAII guard that restores on every exit path.
//! - [`VirtualMemory`]: the narrow platform interface a reserve/commit arena
//!   is built on.
//!
//! Consumers never see arena internals. A pointer returned by `alloc` stays
//! valid until the next `restore` that crosses it, or until the arena is
//! dropped.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod align;
pub mod backend;
pub mod error;
pub mod scope;
pub mod token;
pub mod traits;

pub use align::{align_padding, align_up, round_to_multiple};
pub use backend::VirtualMemory;
pub use error::{AllocError, InitError, RestoreError};
pub use scope::Scope;
pub use token::StackToken;
pub use traits::{Alloc, StackAlloc};

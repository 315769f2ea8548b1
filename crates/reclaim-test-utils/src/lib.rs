//! Test utilities and fixtures for Reclaim development.
//!
//! Provides a heap-backed [`MockVm`] implementing
//! [`VirtualMemory`](reclaim_core::VirtualMemory) with call counting and
//! failure injection, and [`KeyStore`], a small consumer that exercises the
//! save/alloc/restore-on-duplicate pattern against any
//! [`StackAlloc`](reclaim_core::StackAlloc).

#![deny(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod mock_vm;

pub use fixtures::KeyStore;
pub use mock_vm::{MockVm, VmStats};

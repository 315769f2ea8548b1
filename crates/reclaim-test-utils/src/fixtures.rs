//! Reusable consumer fixtures.
//!
//! [`KeyStore`] is the canonical arena consumer: it copies each candidate key
//! into the arena before knowing whether it is new, and rolls the copy back
//! with `restore` when it turns out to be a duplicate. Any
//! [`StackAlloc`] must keep this pattern leak-free.

#![allow(unsafe_code)]

use std::ptr::NonNull;

use reclaim_core::{AllocError, StackAlloc};

/// Deduplicating byte-string store whose keys live in a [`StackAlloc`].
pub struct KeyStore<A: StackAlloc> {
    alloc: A,
    keys: Vec<NonNull<[u8]>>,
}

impl<A: StackAlloc> KeyStore<A> {
    pub fn new(alloc: A) -> Self {
        Self {
            alloc,
            keys: Vec::new(),
        }
    }

    /// Insert `key`, returning `true` if it was not already present.
    ///
    /// A duplicate leaves the allocator's extent exactly where it was.
    pub fn insert(&mut self, key: &[u8]) -> Result<bool, AllocError> {
        let token = self.alloc.save();
        let copy = self.alloc.alloc_copy(key, 1)?;
        // SAFETY: `copy` was just written; stored keys are only invalidated
        // by a restore below their token, which this store never issues.
        let copied = unsafe { copy.as_ref() };
        if self.iter().any(|k| k == copied) {
            self.alloc.restore(token);
            return Ok(false);
        }
        self.keys.push(copy);
        Ok(true)
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.iter().any(|k| k == key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> + '_ {
        // SAFETY: see `insert`; the store owns the allocator, so nothing
        // else can roll it back while `self` is borrowed.
        self.keys.iter().map(|k| unsafe { k.as_ref() })
    }

    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Give the allocator back. Stored keys are forgotten.
    pub fn into_inner(self) -> A {
        self.alloc
    }
}

//! RAII save/restore scopes.
//!
//! A [`Scope`] captures a [`StackToken`] on creation and restores it when
//! dropped, so temporaries are released on every exit path, including `?`
//! early returns and unwinding. Scopes nest without any depth limit: each
//! one simply borrows the allocator (or the enclosing scope) mutably.

use std::fmt;
use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use crate::error::AllocError;
use crate::token::StackToken;
use crate::traits::{Alloc, StackAlloc};

/// Guard that rolls a [`StackAlloc`] back to the point it was created.
#[must_use = "dropping a Scope immediately restores the allocator"]
pub struct Scope<'a, A: StackAlloc + ?Sized> {
    inner: &'a mut A,
    token: StackToken,
}

impl<'a, A: StackAlloc + ?Sized> Scope<'a, A> {
    /// Save `alloc`'s extent and return a guard that restores it on drop.
    pub fn new(alloc: &'a mut A) -> Self {
        let token = alloc.save();
        Self {
            inner: alloc,
            token,
        }
    }

    /// The token this scope restores to.
    pub fn token(&self) -> StackToken {
        self.token
    }

    /// Close the scope without restoring, keeping its allocations alive in
    /// the enclosing scope.
    pub fn keep(self) {
        let _ = ManuallyDrop::new(self);
    }
}

impl<A: StackAlloc + ?Sized> Deref for Scope<'_, A> {
    type Target = A;

    fn deref(&self) -> &A {
        &*self.inner
    }
}

impl<A: StackAlloc + ?Sized> DerefMut for Scope<'_, A> {
    fn deref_mut(&mut self) -> &mut A {
        &mut *self.inner
    }
}

impl<A: StackAlloc + ?Sized> Alloc for Scope<'_, A> {
    fn alloc(&mut self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        self.inner.alloc(size, align)
    }

    fn default_align(&self) -> usize {
        self.inner.default_align()
    }
}

impl<A: StackAlloc + ?Sized> StackAlloc for Scope<'_, A> {
    fn save(&self) -> StackToken {
        self.inner.save()
    }

    fn restore(&mut self, token: StackToken) {
        debug_assert!(
            token >= self.token,
            "restore past the start of the enclosing scope"
        );
        self.inner.restore(token.max(self.token))
    }
}

impl<A: StackAlloc + ?Sized> Drop for Scope<'_, A> {
    fn drop(&mut self) {
        self.inner.restore(self.token);
    }
}

impl<A: StackAlloc + ?Sized> fmt::Debug for Scope<'_, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope").field("token", &self.token).finish()
    }
}

//! Explicit mark stack over any [`StackAlloc`].
//!
//! [`MarkStack`] is the non-RAII counterpart of [`Scope`](reclaim_core::Scope)
//! for code that opens and closes scopes at points a borrow cannot span,
//! such as the enter/leave callbacks of a tree walk. Marks are kept inline
//! for shallow nesting and spill to the heap past that; depth is unbounded.

use std::ptr::NonNull;

use reclaim_core::{Alloc, AllocError, StackAlloc, StackToken};
use smallvec::SmallVec;

/// Inline capacity before marks spill to the heap.
const INLINE_MARKS: usize = 8;

/// A stack of saved tokens paired with the allocator they belong to.
#[derive(Debug)]
pub struct MarkStack<A: StackAlloc> {
    inner: A,
    marks: SmallVec<[StackToken; INLINE_MARKS]>,
}

impl<A: StackAlloc> MarkStack<A> {
    /// Wrap `inner` with an empty mark stack.
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            marks: SmallVec::new(),
        }
    }

    /// Open a scope at the current extent.
    pub fn push(&mut self) {
        self.marks.push(self.inner.save());
    }

    /// Close the innermost scope and discard its allocations.
    ///
    /// Returns the token restored to, or `None` if no scope was open.
    pub fn pop(&mut self) -> Option<StackToken> {
        let token = self.marks.pop()?;
        self.inner.restore(token);
        Some(token)
    }

    /// Close the innermost scope but keep its allocations, which now belong
    /// to the enclosing scope.
    pub fn merge_pop(&mut self) -> Option<StackToken> {
        self.marks.pop()
    }

    /// Number of open scopes.
    pub fn depth(&self) -> usize {
        self.marks.len()
    }

    /// The wrapped allocator.
    pub fn get_ref(&self) -> &A {
        &self.inner
    }

    /// Unwrap the allocator, leaving any open scopes unrestored.
    pub fn into_inner(self) -> A {
        self.inner
    }
}

impl<A: StackAlloc> Alloc for MarkStack<A> {
    fn alloc(&mut self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        self.inner.alloc(size, align)
    }

    fn default_align(&self) -> usize {
        self.inner.default_align()
    }
}

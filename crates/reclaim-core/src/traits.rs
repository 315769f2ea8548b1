//! The allocation capability surface.

use std::alloc::Layout;
use std::ptr::NonNull;

use crate::error::{AllocError, RestoreError};
use crate::scope::Scope;
use crate::token::StackToken;

/// A bump-style allocator with no per-object free.
///
/// `align == 0` selects the allocator's [`default_align`](Alloc::default_align);
/// any other value must be a power of two (asserted in debug builds). On
/// success the returned pointer addresses `size` writable bytes aligned to
/// the effective alignment. On failure the allocator is unchanged.
pub trait Alloc {
    /// Allocate `size` bytes aligned to `align` (0 = default alignment).
    fn alloc(&mut self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError>;

    /// The alignment used when `alloc` is called with `align == 0`.
    fn default_align(&self) -> usize;

    /// Allocate storage matching `layout`.
    fn alloc_layout(&mut self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        self.alloc(layout.size(), layout.align())
    }

    /// Allocate `bytes.len()` bytes and copy `bytes` into them.
    #[allow(unsafe_code)]
    fn alloc_copy(&mut self, bytes: &[u8], align: usize) -> Result<NonNull<[u8]>, AllocError> {
        let ptr = self.alloc(bytes.len(), align)?;
        // SAFETY: `ptr` addresses `bytes.len()` freshly allocated writable
        // bytes that cannot overlap the borrowed source slice.
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr(), bytes.len());
        }
        Ok(NonNull::slice_from_raw_parts(ptr, bytes.len()))
    }
}

/// An [`Alloc`] that can roll back everything allocated since a saved point.
///
/// `restore(token)` invalidates every pointer obtained after the matching
/// `save()`. Using such a pointer afterwards is a use-after-free. Tokens must
/// be restored in stack order; restoring a token from the future is a
/// precondition violation (asserted in debug builds, ignored in release).
pub trait StackAlloc: Alloc {
    /// Capture the current extent.
    fn save(&self) -> StackToken;

    /// Discard every allocation made since `token` was saved.
    fn restore(&mut self, token: StackToken);

    /// Like [`restore`](StackAlloc::restore), but reports a forward token
    /// as an error instead of treating it as a programming error.
    fn try_restore(&mut self, token: StackToken) -> Result<(), RestoreError> {
        let extent = self.save();
        if token > extent {
            return Err(RestoreError::FutureToken {
                token: token.extent(),
                extent: extent.extent(),
            });
        }
        self.restore(token);
        Ok(())
    }

    /// Open a scope that restores to the current extent when dropped.
    fn scope(&mut self) -> Scope<'_, Self>
    where
        Self: Sized,
    {
        Scope::new(self)
    }
}

impl<A: Alloc + ?Sized> Alloc for &mut A {
    fn alloc(&mut self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        (**self).alloc(size, align)
    }

    fn default_align(&self) -> usize {
        (**self).default_align()
    }
}

impl<A: StackAlloc + ?Sized> StackAlloc for &mut A {
    fn save(&self) -> StackToken {
        (**self).save()
    }

    fn restore(&mut self, token: StackToken) {
        (**self).restore(token)
    }
}

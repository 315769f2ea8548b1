//! Save/restore tokens.

use std::fmt;

/// Opaque snapshot of a stack allocator's extent.
///
/// The wrapped value is the number of bytes logically allocated at the
/// moment of [`StackAlloc::save`](crate::StackAlloc::save), padding
/// included. A token is only meaningful to the allocator instance that
/// produced it, and only while that allocator has not been rolled back past
/// it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct StackToken(usize);

impl StackToken {
    /// Token for an allocator with nothing allocated.
    pub const EMPTY: Self = Self(0);

    /// Wrap a raw extent. Intended for allocator implementations.
    pub const fn from_extent(extent: usize) -> Self {
        Self(extent)
    }

    /// The extent captured by this token, in bytes.
    pub const fn extent(self) -> usize {
        self.0
    }
}

impl fmt::Display for StackToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

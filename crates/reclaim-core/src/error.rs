//! Error types for arena construction, allocation and rollback.
//!
//! Construction failures are fatal to the object being built. Allocation
//! failures are recoverable: the arena is left exactly as it was before the
//! failing call. Precondition violations (bad alignment, forward restore
//! tokens) are programming errors and are asserted, not reported here,
//! except through the explicit [`StackAlloc::try_restore`](crate::StackAlloc::try_restore).

use std::error::Error;
use std::fmt;
use std::io;

/// Errors that prevent an arena from being constructed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InitError {
    /// A construction parameter is out of range (zero reservation,
    /// non-power-of-two alignment, size overflow while rounding).
    InvalidConfig {
        /// Description of the offending parameter.
        reason: String,
    },
    /// The operating system page size could not be determined.
    PageSizeUnknown,
    /// The address-space reservation was refused by the OS.
    ReserveFailed {
        /// Number of bytes that were requested (page-rounded).
        requested: usize,
        /// Raw OS error code, if one was reported.
        os_code: Option<i32>,
    },
    /// The initial heap buffer could not be allocated.
    OutOfMemory {
        /// Number of bytes that were requested.
        requested: usize,
    },
}

impl InitError {
    /// Build a [`InitError::ReserveFailed`] from an OS error.
    pub fn reserve_failed(requested: usize, err: &io::Error) -> Self {
        Self::ReserveFailed {
            requested,
            os_code: err.raw_os_error(),
        }
    }
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { reason } => write!(f, "invalid arena config: {reason}"),
            Self::PageSizeUnknown => write!(f, "unable to determine the OS page size"),
            Self::ReserveFailed { requested, os_code } => {
                write!(f, "failed to reserve {requested} bytes of address space")?;
                if let Some(code) = os_code {
                    write!(f, " (os error {code})")?;
                }
                Ok(())
            }
            Self::OutOfMemory { requested } => {
                write!(f, "out of memory allocating initial {requested} byte buffer")
            }
        }
    }
}

impl Error for InitError {}

/// Errors returned by [`Alloc::alloc`](crate::Alloc::alloc).
///
/// Every variant means the backing store could not grow to satisfy the
/// request. The allocator state is unchanged; a smaller request, or a
/// request after a `restore`, may still succeed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllocError {
    /// The request does not fit in the fixed address-space reservation.
    CapacityExceeded {
        /// Extent (in bytes, from the arena base) the request needed.
        requested: usize,
        /// Total reserved bytes.
        capacity: usize,
    },
    /// The OS refused to commit more pages.
    CommitFailed {
        /// Committed size (in bytes) that was being grown to.
        requested: usize,
        /// Raw OS error code, if one was reported.
        os_code: Option<i32>,
    },
    /// A heap buffer could not be allocated, or the request size overflowed.
    OutOfMemory {
        /// Number of bytes that were requested.
        requested: usize,
    },
}

impl AllocError {
    /// Build a [`AllocError::CommitFailed`] from an OS error.
    pub fn commit_failed(requested: usize, err: &io::Error) -> Self {
        Self::CommitFailed {
            requested,
            os_code: err.raw_os_error(),
        }
    }
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded {
                requested,
                capacity,
            } => {
                write!(
                    f,
                    "arena capacity exceeded: requested extent {requested} bytes, reserved {capacity} bytes"
                )
            }
            Self::CommitFailed { requested, os_code } => {
                write!(f, "failed to commit pages up to {requested} bytes")?;
                if let Some(code) = os_code {
                    write!(f, " (os error {code})")?;
                }
                Ok(())
            }
            Self::OutOfMemory { requested } => {
                write!(f, "out of memory: requested {requested} bytes")
            }
        }
    }
}

impl Error for AllocError {}

/// Errors returned by [`StackAlloc::try_restore`](crate::StackAlloc::try_restore).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestoreError {
    /// The token lies beyond the allocator's current extent. Restoring
    /// forward is not supported.
    FutureToken {
        /// Extent captured by the token.
        token: usize,
        /// Current extent of the allocator.
        extent: usize,
    },
}

impl fmt::Display for RestoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FutureToken { token, extent } => {
                write!(
                    f,
                    "restore token {token} is beyond the current extent {extent}"
                )
            }
        }
    }
}

impl Error for RestoreError {}

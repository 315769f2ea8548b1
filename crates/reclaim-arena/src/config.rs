//! Arena configuration parameters.

/// Configuration for a [`VirtualArena`](crate::VirtualArena).
///
/// Validated at construction; the arena keeps the page-rounded values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VirtualConfig {
    /// Bytes of address space to reserve up front.
    ///
    /// Rounded up to whole pages. Must be non-zero. This is a hard ceiling:
    /// the arena never relocates, so it can never hold more than this.
    pub reserve_size: usize,

    /// Alignment used when `alloc` is called with `align == 0`.
    ///
    /// Must be a power of two.
    pub default_align: usize,

    /// Bytes committed per growth step.
    ///
    /// Rounded up to whole pages; `0` means one page. Larger values mean
    /// fewer commit calls at the cost of touching memory earlier.
    pub grow_size: usize,
}

impl VirtualConfig {
    /// Default reservation: 512MB of address space.
    pub const DEFAULT_RESERVE_SIZE: usize = 512 * 1024 * 1024;

    /// Default alignment.
    pub const DEFAULT_ALIGN: usize = 16;

    /// Default growth step: 1MB.
    pub const DEFAULT_GROW_SIZE: usize = 1024 * 1024;

    /// Create a config reserving `reserve_size` bytes, with default
    /// alignment and growth step.
    pub fn new(reserve_size: usize) -> Self {
        Self {
            reserve_size,
            default_align: Self::DEFAULT_ALIGN,
            grow_size: Self::DEFAULT_GROW_SIZE,
        }
    }

    /// Replace the default alignment.
    pub fn with_default_align(mut self, align: usize) -> Self {
        self.default_align = align;
        self
    }

    /// Replace the growth step.
    pub fn with_grow_size(mut self, grow_size: usize) -> Self {
        self.grow_size = grow_size;
        self
    }
}

impl Default for VirtualConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RESERVE_SIZE)
    }
}

/// Configuration for a [`ChainArena`](crate::ChainArena).
///
/// Zero values select defaults, resolved when the arena is built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainConfig {
    /// Capacity of the first buffer in bytes.
    ///
    /// `0` means one OS page, or [`ChainConfig::FALLBACK_INITIAL_SIZE`] when
    /// the page size cannot be queried.
    pub initial_size: usize,

    /// Upper bound on the doubling heuristic for new buffers.
    ///
    /// A single oversized request may still produce a larger buffer. `0`
    /// means twice the initial size.
    pub max_grow: usize,

    /// Alignment used when `alloc` is called with `align == 0`.
    ///
    /// `0` means [`ChainConfig::DEFAULT_ALIGN`]; otherwise a power of two.
    pub default_align: usize,

    /// Replace a lone, emptied buffer with one sized to the extent that was
    /// live before a `restore`, so the next pass grows fewer times. Off by
    /// default.
    pub coalesce_on_restore: bool,
}

impl ChainConfig {
    /// Initial buffer size when the OS page size is unknown.
    pub const FALLBACK_INITIAL_SIZE: usize = 1024;

    /// Default alignment.
    pub const DEFAULT_ALIGN: usize = 16;

    /// Create a config with every parameter defaulted.
    pub fn new() -> Self {
        Self {
            initial_size: 0,
            max_grow: 0,
            default_align: 0,
            coalesce_on_restore: false,
        }
    }

    /// Replace the initial buffer size.
    pub fn with_initial_size(mut self, initial_size: usize) -> Self {
        self.initial_size = initial_size;
        self
    }

    /// Replace the growth cap.
    pub fn with_max_grow(mut self, max_grow: usize) -> Self {
        self.max_grow = max_grow;
        self
    }

    /// Replace the default alignment.
    pub fn with_default_align(mut self, align: usize) -> Self {
        self.default_align = align;
        self
    }

    /// Enable or disable coalescing on restore.
    pub fn with_coalesce_on_restore(mut self, enabled: bool) -> Self {
        self.coalesce_on_restore = enabled;
        self
    }

    /// Resolve zero values against the given page size.
    ///
    /// Returns `(initial_size, max_grow, default_align)`.
    pub(crate) fn resolve(&self, page_size: Option<usize>) -> (usize, usize, usize) {
        let initial = match self.initial_size {
            0 => page_size
                .filter(|&p| p != 0)
                .unwrap_or(Self::FALLBACK_INITIAL_SIZE),
            n => n,
        };
        let max_grow = match self.max_grow {
            0 => initial.saturating_mul(2),
            n => n,
        };
        let align = match self.default_align {
            0 => Self::DEFAULT_ALIGN,
            n => n,
        };
        (initial, max_grow, align)
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self::new()
    }
}

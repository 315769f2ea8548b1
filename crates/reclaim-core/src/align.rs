//! Alignment arithmetic on plain integers.
//!
//! Arenas carry a base pointer plus an integer offset. Alignment is computed
//! here on addresses and offsets; turning the result back into a pointer is a
//! separate `base.add(offset)` step at the call site.

/// Round `value` up to the next multiple of `align`.
///
/// `align` must be a non-zero power of two. Returns `None` if the rounded
/// value does not fit in a `usize`.
#[inline]
pub fn align_up(value: usize, align: usize) -> Option<usize> {
    debug_assert!(align.is_power_of_two(), "align must be a power of two");
    let mask = align - 1;
    value.checked_add(mask).map(|v| v & !mask)
}

/// Number of bytes that must be added to `addr` to make it a multiple of
/// `align`.
///
/// `align` must be a non-zero power of two. The result is always in
/// `0..align`.
#[inline]
pub fn align_padding(addr: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two(), "align must be a power of two");
    let mask = align - 1;
    (align - (addr & mask)) & mask
}

/// Round `value` up to a whole number of `unit`s, where `unit` is any
/// non-zero size (page sizes are not required to be powers of two here).
///
/// Returns `None` on overflow.
#[inline]
pub fn round_to_multiple(value: usize, unit: usize) -> Option<usize> {
    debug_assert!(unit != 0, "unit must be non-zero");
    let units = value.checked_add(unit - 1)? / unit;
    units.checked_mul(unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_rounds_to_next_multiple() {
        assert_eq!(align_up(0, 16), Some(0));
        assert_eq!(align_up(1, 16), Some(16));
        assert_eq!(align_up(16, 16), Some(16));
        assert_eq!(align_up(17, 8), Some(24));
        assert_eq!(align_up(5, 1), Some(5));
    }

    #[test]
    fn align_up_reports_overflow() {
        assert_eq!(align_up(usize::MAX, 2), None);
        assert_eq!(align_up(usize::MAX - 3, 8), None);
    }

    #[test]
    fn padding_is_zero_for_aligned_addresses() {
        assert_eq!(align_padding(0, 8), 0);
        assert_eq!(align_padding(4096, 4096), 0);
        assert_eq!(align_padding(48, 16), 0);
    }

    #[test]
    fn padding_reaches_next_boundary() {
        assert_eq!(align_padding(1, 8), 7);
        assert_eq!(align_padding(9, 8), 7);
        assert_eq!(align_padding(15, 16), 1);
        assert_eq!(align_padding(usize::MAX, 2), 1);
    }

    #[test]
    fn round_to_multiple_handles_non_power_of_two_units() {
        assert_eq!(round_to_multiple(0, 3000), Some(0));
        assert_eq!(round_to_multiple(1, 3000), Some(3000));
        assert_eq!(round_to_multiple(6000, 3000), Some(6000));
        assert_eq!(round_to_multiple(6001, 4096), Some(8192));
        assert_eq!(round_to_multiple(usize::MAX, 4096), None);
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn padded_address_is_aligned(addr in 0usize..(1 << 40), shift in 0u32..16) {
                let align = 1usize << shift;
                let pad = align_padding(addr, align);
                prop_assert!(pad < align);
                prop_assert_eq!((addr + pad) % align, 0);
                prop_assert_eq!(align_up(addr, align), Some(addr + pad));
            }
        }
    }
}

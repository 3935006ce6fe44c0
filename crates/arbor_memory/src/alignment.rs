//! # Alignment
//!
//! Every record handed out by an arena starts on a pointer-size boundary,
//! because slot records themselves hold links.

use std::mem::size_of;

/// Size of a native pointer, the unit every allocation is rounded to.
pub const POINTER_SIZE: usize = size_of::<usize>();

const MASK: usize = POINTER_SIZE - 1;

/// Footprint of a string header: one offset plus one length.
pub const STRING_HEADER_SIZE: usize = 2 * POINTER_SIZE;

/// Rounds `bytes` up to the next multiple of [`POINTER_SIZE`].
///
/// Overflows for sizes within `POINTER_SIZE` of `usize::MAX`; use
/// [`checked_padding`] for caller-supplied sizes.
#[inline]
#[must_use]
pub const fn add_padding(bytes: usize) -> usize {
    (bytes + MASK) & !MASK
}

/// Rounds `bytes` up to the next multiple of [`POINTER_SIZE`], or `None`
/// if the result does not fit in a `usize`.
#[inline]
#[must_use]
pub const fn checked_padding(bytes: usize) -> Option<usize> {
    match bytes.checked_add(MASK) {
        Some(bytes) => Some(bytes & !MASK),
        None => None,
    }
}

/// Returns `true` if `value` is a multiple of [`POINTER_SIZE`].
#[inline]
#[must_use]
pub const fn is_aligned(value: usize) -> bool {
    value & MASK == 0
}

/// Bytes occupied by one right-side record when slots hold an `S`.
///
/// Slot records and string headers share this size so that the two free
/// lists can hand records back to the same region.
#[inline]
#[must_use]
pub const fn record_size<S>() -> usize {
    let slot = size_of::<S>();
    let widest = if slot > STRING_HEADER_SIZE {
        slot
    } else {
        STRING_HEADER_SIZE
    };
    add_padding(widest)
}

/// Bytes a frozen string of `len` bytes costs, header included.
#[inline]
#[must_use]
pub const fn string_footprint<S>(len: usize) -> usize {
    add_padding(len) + record_size::<S>()
}

//! Helpers for validating and normalising transform axes.

use std::collections::HashSet;
use std::hash::Hash;

use crate::{Error, Result};

/// Map a possibly negative axis onto `0..rank`; `-1` is the last axis.
///
/// `axis` must satisfy `|axis| < rank`.
pub fn convert_negative_axis(rank: usize, axis: isize) -> Result<usize> {
    if axis.unsigned_abs() >= rank {
        return Err(Error::InvalidAxis { axis, rank }.bt());
    }
    if axis < 0 {
        Ok(rank - axis.unsigned_abs())
    } else {
        Ok(axis as usize)
    }
}

/// Split a roll of `shift` positions over an axis of `extent` elements
/// into the three offsets used by a two-block copy: the source start of
/// the first block, the destination start of the second block, and the
/// default half-length shift when `shift == 0`.
///
/// A zero shift means "roll by half", as for fftshift; odd extents
/// put the extra element on the side that makes the roll invertible.
pub fn convert_negative_shift(extent: usize, shift: isize) -> (usize, usize, usize) {
    let odd = extent % 2;
    match shift.signum() {
        -1 => {
            let s = shift.unsigned_abs();
            (s + odd, s, 0)
        }
        1 => {
            let s = shift.unsigned_abs();
            (s, s + odd, 0)
        }
        _ => (0, 0, extent / 2),
    }
}

/// Whether any value occurs more than once.
pub fn has_duplicate_values<T: Eq + Hash>(values: &[T]) -> bool {
    let mut seen = HashSet::with_capacity(values.len());
    values.iter().any(|v| !seen.insert(v))
}

/// Whether any value is `>= max`.
pub fn is_out_of_range_value_included(values: &[usize], max: usize) -> bool {
    values.iter().any(|&v| v >= max)
}

/// Position of the first occurrence of `key` in `values`.
pub fn get_index<T: PartialEq>(values: &[T], key: &T) -> Result<usize> {
    values
        .iter()
        .position(|v| v == key)
        .ok_or_else(|| Error::NotFound.bt())
}

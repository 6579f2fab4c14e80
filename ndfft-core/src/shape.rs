use std::{
    fmt,
    ops::{Index, IndexMut},
};

use crate::{Error, Result};

/// Highest rank any array, shape or kernel in this crate supports.
pub const MAX_RANK: usize = 8;

/// An ordered, fixed-length list of `D` axis extents.
///
/// A `Shape` may describe a full array shape or only the leading transform
/// axes of one. It is a plain value: copy it, compare it entrywise, index
/// into it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape<const D: usize>([usize; D]);

impl<const D: usize> Shape<D> {
    /// Build a shape, rejecting a zero-length shape, ranks above
    /// [`MAX_RANK`] and zero extents.
    pub fn new(dims: [usize; D]) -> Result<Self> {
        let shape = Self(dims);
        shape.validate()?;
        Ok(shape)
    }

    /// Check that `1 <= D <= MAX_RANK`, that every extent is positive and
    /// that the element count fits in a `usize`.
    pub fn validate(&self) -> Result<()> {
        self.checked_element_count().map(|_| ())
    }

    /// [`Shape::validate`], returning the element count.
    pub fn checked_element_count(&self) -> Result<usize> {
        check_rank(D)?;
        let mut count: usize = 1;
        for (axis, &extent) in self.0.iter().enumerate() {
            if extent == 0 {
                return Err(Error::InvalidShape { axis, extent }.bt());
            }
            count = count.checked_mul(extent).ok_or_else(|| {
                Error::ElementCountOverflow {
                    shape: self.0.to_vec(),
                }
                .bt()
            })?;
        }
        Ok(count)
    }

    pub fn dims(&self) -> &[usize; D] {
        &self.0
    }

    pub const fn len(&self) -> usize {
        D
    }

    pub const fn is_empty(&self) -> bool {
        D == 0
    }

    /// Product of the extents, saturating at `usize::MAX`.
    pub fn element_count(&self) -> usize {
        self.0
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n))
            .unwrap_or(usize::MAX)
    }

    pub fn to_vec(&self) -> Vec<usize> {
        self.0.to_vec()
    }
}

pub(crate) fn check_rank(rank: usize) -> Result<()> {
    if rank == 0 || rank > MAX_RANK {
        return Err(Error::InvalidRank {
            rank,
            max: MAX_RANK,
        }
        .bt());
    }
    Ok(())
}

impl<const D: usize> From<[usize; D]> for Shape<D> {
    fn from(dims: [usize; D]) -> Self {
        Self(dims)
    }
}

impl<const D: usize> From<Shape<D>> for [usize; D] {
    fn from(shape: Shape<D>) -> Self {
        shape.0
    }
}

impl<const D: usize> Index<usize> for Shape<D> {
    type Output = usize;

    fn index(&self, axis: usize) -> &usize {
        &self.0[axis]
    }
}

impl<const D: usize> IndexMut<usize> for Shape<D> {
    fn index_mut(&mut self, axis: usize) -> &mut usize {
        &mut self.0[axis]
    }
}

impl<const D: usize> fmt::Debug for Shape<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shape{self}")
    }
}

impl<const D: usize> fmt::Display for Shape<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, extent) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{extent}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_zero_extent() {
        let err = Shape::new([3, 0, 2]).unwrap_err();
        assert!(matches!(
            err.inner(),
            Error::InvalidShape { axis: 1, extent: 0 }
        ));
    }

    #[test]
    fn new_rejects_rank_above_max() {
        let err = Shape::new([1; 9]).unwrap_err();
        assert!(matches!(err.inner(), Error::InvalidRank { rank: 9, .. }));
    }

    #[test]
    fn new_rejects_empty_shape() {
        let err = Shape::<0>::new([]).unwrap_err();
        assert!(matches!(err.inner(), Error::InvalidRank { rank: 0, .. }));
    }

    #[test]
    fn element_count_overflow_is_rejected() {
        let err = Shape::new([(1 << 63) + 1, 2]).unwrap_err();
        assert!(matches!(err.inner(), Error::ElementCountOverflow { .. }));
        let err = Shape::from([usize::MAX, 1, 2]).validate().unwrap_err();
        assert!(matches!(err.inner(), Error::ElementCountOverflow { .. }));
        assert_eq!(
            Shape::from([usize::MAX, 1]).checked_element_count().unwrap(),
            usize::MAX
        );
    }

    #[test]
    fn index_and_mutate() {
        let mut s = Shape::from([2, 3, 4]);
        s[1] = 7;
        assert_eq!(s[1], 7);
        assert_eq!(s.element_count(), 56);
        assert_eq!(s, Shape::from([2, 7, 4]));
        assert_ne!(s, Shape::from([2, 7, 5]));
    }

    #[test]
    fn display() {
        assert_eq!(Shape::from([5, 3]).to_string(), "(5, 3)");
        assert_eq!(format!("{:?}", Shape::from([1])), "Shape(1)");
    }
}

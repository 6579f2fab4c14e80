//! Iteration-space description for the bounded multi-dimensional copy.
//!
//! A copy of rank `R` is split into *parallel* axes, which are cut into
//! tiles and distributed over the backend's parallel units, and
//! *sequential* axes, which every unit walks in an inner loop. How many
//! axes may be parallel is a backend capability ([`IterationStrategy`]);
//! the tile sizes come from a rank-indexed lookup table.

use crate::shape::MAX_RANK;

/// Per-rank tile sizes, indexed by `rank - 1`.
///
/// Rank 1 is a plain range split into chunks of 256 elements.
/// Later axes get smaller tiles as the rank grows so the number of tiles
/// stays in a useful range for the scheduler. Entries past a rank's own
/// axes are unused.
pub const TILE_HINTS: [[usize; MAX_RANK]; MAX_RANK] = [
    [256, 1, 1, 1, 1, 1, 1, 1],
    [4, 4, 1, 1, 1, 1, 1, 1],
    [4, 4, 4, 1, 1, 1, 1, 1],
    [4, 4, 4, 4, 1, 1, 1, 1],
    [4, 4, 4, 4, 1, 1, 1, 1],
    [4, 4, 4, 4, 1, 1, 1, 1],
    [4, 4, 4, 4, 1, 1, 1, 1],
    [4, 4, 4, 4, 1, 1, 1, 1],
];

/// Number of leading axes a tiled multi-dimensional range can distribute.
/// Axes beyond this run sequentially inside each parallel unit.
pub const DEFAULT_MAX_PARALLEL_RANK: usize = 6;

/// Tile sizes for a copy of the given rank. Ranks outside `1..=MAX_RANK`
/// fall back to untiled iteration.
pub fn default_tile_hint(rank: usize) -> [usize; MAX_RANK] {
    match rank {
        1..=MAX_RANK => TILE_HINTS[rank - 1],
        _ => [1; MAX_RANK],
    }
}

/// How a backend spreads a multi-dimensional index range over its
/// parallel units.
pub trait IterationStrategy {
    /// How many leading axes are distributed across parallel units.
    fn max_parallel_rank(&self) -> usize;

    /// Tile size per axis for a range of `rank` axes.
    fn tile_hint(&self, rank: usize) -> [usize; MAX_RANK] {
        default_tile_hint(rank)
    }

    /// Lay out the copy of `extents` elements between two dense arrays.
    fn copy_region<const R: usize>(
        &self,
        extents: [usize; R],
        src_strides: [usize; R],
        dst_strides: [usize; R],
    ) -> CopyRegion<R> {
        CopyRegion::new(
            extents,
            src_strides,
            dst_strides,
            self.max_parallel_rank(),
            &self.tile_hint(R),
        )
    }
}

/// The bounded index range `prod [0, extents[i])` of a copy between two
/// dense row-major arrays, with its split into tiled parallel axes and
/// sequential axes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRegion<const R: usize> {
    extents: [usize; R],
    src_strides: [usize; R],
    dst_strides: [usize; R],
    tile: [usize; R],
    parallel_rank: usize,
}

impl<const R: usize> CopyRegion<R> {
    pub fn new(
        extents: [usize; R],
        src_strides: [usize; R],
        dst_strides: [usize; R],
        max_parallel_rank: usize,
        tile_hint: &[usize; MAX_RANK],
    ) -> Self {
        let parallel_rank = max_parallel_rank.clamp(1, R.max(1)).min(R);
        let mut tile = [1; R];
        for (axis, t) in tile.iter_mut().enumerate().take(parallel_rank) {
            *t = tile_hint.get(axis).copied().unwrap_or(1).max(1);
        }
        Self {
            extents,
            src_strides,
            dst_strides,
            tile,
            parallel_rank,
        }
    }

    pub fn extents(&self) -> &[usize; R] {
        &self.extents
    }

    pub fn src_strides(&self) -> &[usize; R] {
        &self.src_strides
    }

    pub fn dst_strides(&self) -> &[usize; R] {
        &self.dst_strides
    }

    /// Tile sizes; `1` on every sequential axis.
    pub fn tile(&self) -> &[usize; R] {
        &self.tile
    }

    /// Number of leading axes that are tiled and run in parallel.
    pub fn parallel_rank(&self) -> usize {
        self.parallel_rank
    }

    /// Total number of elements the copy touches, saturating at `usize::MAX`.
    pub fn element_count(&self) -> usize {
        self.extents
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n))
            .unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.extents.contains(&0)
    }

    /// Number of index points of the parallel axes alone.
    pub fn parallel_count(&self) -> usize {
        self.extents[..self.parallel_rank].iter().product()
    }

    /// Number of index points every parallel unit walks sequentially.
    pub fn sequential_count(&self) -> usize {
        self.extents[self.parallel_rank..].iter().product()
    }

    /// One past the largest source offset the copy reads.
    pub fn src_span(&self) -> usize {
        self.span(&self.src_strides)
    }

    /// One past the largest destination offset the copy writes.
    pub fn dst_span(&self) -> usize {
        self.span(&self.dst_strides)
    }

    /// Saturates at `usize::MAX`, which no buffer can satisfy.
    fn span(&self, strides: &[usize; R]) -> usize {
        if self.extents.contains(&0) {
            return 0;
        }
        self.extents
            .iter()
            .zip(strides)
            .try_fold(1usize, |acc, (&n, &stride)| {
                (n - 1).checked_mul(stride)?.checked_add(acc)
            })
            .unwrap_or(usize::MAX)
    }

    /// Number of tiles along each parallel axis.
    fn tile_counts(&self) -> [usize; R] {
        let mut counts = [1; R];
        for axis in 0..self.parallel_rank {
            counts[axis] = self.extents[axis].div_ceil(self.tile[axis]);
        }
        counts
    }

    /// Number of independent work units.
    pub fn num_tiles(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        self.tile_counts()[..self.parallel_rank].iter().product()
    }

    /// Walk one tile in row-major order, calling `f(src_offset, dst_offset, len)`
    /// for every contiguous run along the last axis.
    ///
    /// Tiles partition the region, so distinct tiles never yield the same
    /// destination offset.
    pub fn for_each_run_in_tile(&self, tile_index: usize, mut f: impl FnMut(usize, usize, usize)) {
        if R == 0 || tile_index >= self.num_tiles() {
            return;
        }

        let counts = self.tile_counts();
        let mut lo = [0; R];
        let mut hi = self.extents;
        let mut rem = tile_index;
        for axis in (0..self.parallel_rank).rev() {
            let coord = rem % counts[axis];
            rem /= counts[axis];
            lo[axis] = coord * self.tile[axis];
            hi[axis] = (lo[axis] + self.tile[axis]).min(self.extents[axis]);
        }

        let last = R - 1;
        let run = hi[last] - lo[last];
        let mut idx = lo;
        let mut src = dot(&lo, &self.src_strides);
        let mut dst = dot(&lo, &self.dst_strides);
        loop {
            f(src, dst, run);

            // Advance the odometer over every axis but the last.
            let mut axis = last;
            loop {
                if axis == 0 {
                    return;
                }
                axis -= 1;
                idx[axis] += 1;
                src += self.src_strides[axis];
                dst += self.dst_strides[axis];
                if idx[axis] < hi[axis] {
                    break;
                }
                let span = hi[axis] - lo[axis];
                src -= span * self.src_strides[axis];
                dst -= span * self.dst_strides[axis];
                idx[axis] = lo[axis];
            }
        }
    }
}

fn dot<const R: usize>(a: &[usize; R], b: &[usize; R]) -> usize {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Dense row-major strides for `shape`.
pub fn contiguous_strides<const R: usize>(shape: &[usize; R]) -> [usize; R] {
    let mut strides = [0; R];
    let mut acc = 1;
    // Iterate dims in reverse to accumulate products
    for (stride, dim) in strides.iter_mut().zip(shape).rev() {
        *stride = acc;
        acc *= *dim;
    }
    strides
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ceiling(usize);

    impl IterationStrategy for Ceiling {
        fn max_parallel_rank(&self) -> usize {
            self.0
        }
    }

    fn collect<const R: usize>(region: &CopyRegion<R>) -> Vec<(usize, usize, usize)> {
        let mut runs = Vec::new();
        for t in 0..region.num_tiles() {
            region.for_each_run_in_tile(t, |s, d, n| runs.push((s, d, n)));
        }
        runs
    }

    #[test]
    fn strides_are_row_major() {
        assert_eq!(contiguous_strides(&[2, 3, 4]), [12, 4, 1]);
        assert_eq!(contiguous_strides(&[5]), [1]);
    }

    #[test]
    fn tile_table_matches_rank() {
        assert_eq!(default_tile_hint(2)[..2], [4, 4]);
        assert_eq!(default_tile_hint(5)[..5], [4, 4, 4, 4, 1]);
        assert_eq!(default_tile_hint(8)[..6], [4, 4, 4, 4, 1, 1]);
        assert_eq!(default_tile_hint(9), [1; MAX_RANK]);
    }

    #[test]
    fn high_rank_keeps_trailing_axes_sequential() {
        let extents = [2; 8];
        let strides = contiguous_strides(&extents);
        let region = Ceiling(DEFAULT_MAX_PARALLEL_RANK).copy_region(extents, strides, strides);
        assert_eq!(region.parallel_rank(), 6);
        assert_eq!(region.sequential_count(), 4);
        assert_eq!(region.tile()[6..], [1, 1]);

        let full = Ceiling(8).copy_region(extents, strides, strides);
        assert_eq!(full.parallel_rank(), 8);
        assert_eq!(full.sequential_count(), 1);
    }

    #[test]
    fn tiles_cover_every_offset_once() {
        let extents = [5, 3, 6];
        let src = contiguous_strides(&[7, 3, 9]);
        let dst = contiguous_strides(&extents);
        let region = Ceiling(6).copy_region(extents, src, dst);
        assert_eq!(region.num_tiles(), 4);

        let mut seen = vec![0u8; 5 * 3 * 6];
        for (_, d, n) in collect(&region) {
            for x in &mut seen[d..d + n] {
                *x += 1;
            }
        }
        assert!(seen.iter().all(|&c| c == 1));
    }

    #[test]
    fn runs_follow_source_strides() {
        let region = Ceiling(6).copy_region([2, 2], [10, 1], [2, 1]);
        assert_eq!(collect(&region), vec![(0, 0, 2), (10, 2, 2)]);
    }

    #[test]
    fn spans_bound_the_offsets() {
        let region = Ceiling(6).copy_region([2, 3], [5, 1], [3, 1]);
        assert_eq!(region.src_span(), 5 + 2 + 1);
        assert_eq!(region.dst_span(), 6);
    }

    #[test]
    fn overflowing_spans_saturate() {
        let huge = (1 << 63) + 1;
        let region = Ceiling(6).copy_region([huge, 2], [2, 1], [2, 1]);
        assert_eq!(region.src_span(), usize::MAX);
        assert_eq!(region.dst_span(), usize::MAX);
        assert_eq!(region.element_count(), usize::MAX);
    }

    #[test]
    fn empty_region_has_no_tiles() {
        let region = Ceiling(6).copy_region([3, 0], [4, 1], [1, 1]);
        assert!(region.is_empty());
        assert_eq!(region.num_tiles(), 0);
        assert!(collect(&region).is_empty());
    }
}

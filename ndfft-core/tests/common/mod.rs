use ndfft_core::{contiguous_strides, DType};

/// Element-by-element crop/pad of a row-major buffer.
pub fn reference_crop_or_pad<T: DType, const R: usize>(
    input: &[T],
    in_extents: [usize; R],
    out_extents: [usize; R],
) -> Vec<T> {
    let in_strides = contiguous_strides(&in_extents);
    let count: usize = out_extents.iter().product();
    (0..count)
        .map(|flat| {
            let mut rem = flat;
            let mut offset = 0;
            for axis in (0..R).rev() {
                let i = rem % out_extents[axis];
                rem /= out_extents[axis];
                if i >= in_extents[axis] {
                    return T::ZERO;
                }
                offset += i * in_strides[axis];
            }
            input[offset]
        })
        .collect()
}

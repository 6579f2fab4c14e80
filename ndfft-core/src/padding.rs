//! Resizing arrays along their transform axes.
//!
//! A transform of length `n` over an axis of a different length first
//! crops or zero-pads that axis to `n`. The usual sequence is
//! [`get_modified_shape`] to resolve the full target shape,
//! [`is_crop_or_pad_needed`] to skip arrays that already fit, then
//! [`crop_or_pad`] to build the resized copy.

use std::time::Instant;

use crate::{
    array::Array,
    device::{Dev, Device},
    shape::{check_rank, Shape},
    trace::{next_operation_id, record_trace, DispatchTrace},
    DType, Error, IterationStrategy, Result,
};

/// Overlay `shape`, which covers the first `N` axes, onto the extents of
/// `array`. Axes `N..R` keep the array's own extents.
pub fn get_modified_shape<T: DType, const R: usize, const N: usize, D: Dev>(
    array: &Array<T, R, D>,
    shape: Shape<N>,
) -> Result<Shape<R>> {
    if N == 0 || N > R {
        return Err(Error::InvalidRank { rank: N, max: R }.bt());
    }
    shape.validate()?;

    let mut modified = array.shape();
    for axis in 0..N {
        modified[axis] = shape[axis];
    }
    Ok(modified)
}

/// Whether `shape` differs from the extents of `array` on any axis.
pub fn is_crop_or_pad_needed<T: DType, const R: usize, D: Dev>(
    array: &Array<T, R, D>,
    shape: &Shape<R>,
) -> bool {
    array.extents() != shape.dims()
}

/// Copy `input` into a new zero-filled array of exactly `shape`.
///
/// Along each axis the first `min(shape[i], input.extent(i))` elements are
/// copied; positions past the input's extent stay zero (padding) and input
/// positions past `shape[i]` are never read (cropping). The copy is a single
/// kernel dispatch on `device`, which must own the memory `input` lives in.
///
/// The result is a fresh allocation even when `shape` equals the input's
/// shape. Rebind it over any previous output: `out = crop_or_pad(..)?`.
pub fn crop_or_pad<T: DType, const R: usize, D: Dev>(
    device: &Device,
    input: &Array<T, R, D>,
    shape: Shape<R>,
) -> Result<Array<T, R, D>> {
    check_rank(R)?;
    shape.validate()?;

    let start = Instant::now();
    let mut out = Array::<T, R, D>::zeros_on(device, "out", *shape.dims())?;

    let copy: [usize; R] = std::array::from_fn(|axis| shape[axis].min(input.extent(axis)));
    let region = device.copy_region(copy, input.strides(), out.strides());
    device.launch_copy(input.label(), input.storage(), out.storage_mut(), &region)?;

    record_trace(DispatchTrace {
        operation_id: next_operation_id(),
        operation: "crop_or_pad",
        backend: device.location(),
        dtype: T::NAME,
        label: input.label().to_string(),
        rank: R,
        input_shape: input.extents().to_vec(),
        output_shape: shape.to_vec(),
        copied_elements: region.element_count(),
        parallel_rank: region.parallel_rank(),
        tile: region.tile().to_vec(),
        timing_ns: start.elapsed().as_nanos(),
    });
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cpu;

    #[test]
    fn modified_shape_overlays_leading_axes() {
        let a = Array::<f32, 3, Cpu>::zeros("a", [2, 3, 4]).unwrap();
        let s = get_modified_shape(&a, Shape::from([7, 1])).unwrap();
        assert_eq!(s, Shape::from([7, 1, 4]));
    }

    #[test]
    fn modified_shape_rejects_too_many_axes() {
        let a = Array::<f32, 1, Cpu>::zeros("a", [2]).unwrap();
        let err = get_modified_shape(&a, Shape::from([2, 2])).unwrap_err();
        assert!(matches!(err.inner(), Error::InvalidRank { rank: 2, max: 1 }));
    }

    #[test]
    fn modified_shape_rejects_zero_axes() {
        let a = Array::<f32, 2, Cpu>::zeros("a", [2, 2]).unwrap();
        let err = get_modified_shape(&a, Shape::<0>::from([])).unwrap_err();
        assert!(matches!(err.inner(), Error::InvalidRank { rank: 0, .. }));
    }

    #[test]
    fn modified_shape_rejects_zero_extent() {
        let a = Array::<f32, 2, Cpu>::zeros("a", [2, 2]).unwrap();
        let err = get_modified_shape(&a, Shape::from([0])).unwrap_err();
        assert!(matches!(err.inner(), Error::InvalidShape { axis: 0, .. }));
    }

    #[test]
    fn crop_or_pad_rejects_zero_extent_before_allocating() {
        let a = Array::<f64, 2, Cpu>::zeros("a", [2, 2]).unwrap();
        let err = crop_or_pad(&Device::cpu(), &a, Shape::from([2, 0])).unwrap_err();
        assert!(matches!(err.inner(), Error::InvalidShape { axis: 1, .. }));
    }
}

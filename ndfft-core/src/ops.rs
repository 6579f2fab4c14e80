use std::time::Instant;

use crate::{
    array::Array,
    device::{Dev, Device},
    trace::{next_operation_id, record_trace, DispatchTrace},
    DType, Result,
};

/// A new array holding the complex conjugate of every element of `input`.
/// Real element types are copied unchanged.
pub fn conjugate<T: DType, const R: usize, D: Dev>(
    device: &Device,
    input: &Array<T, R, D>,
) -> Result<Array<T, R, D>> {
    let start = Instant::now();
    let storage = device.conjugate(input.label(), input.storage())?;
    let out = Array::from_parts("out".to_string(), *input.extents(), storage);

    record_trace(DispatchTrace {
        operation_id: next_operation_id(),
        operation: "conjugate",
        backend: device.location(),
        dtype: T::NAME,
        label: input.label().to_string(),
        rank: R,
        input_shape: input.extents().to_vec(),
        output_shape: input.extents().to_vec(),
        copied_elements: input.len(),
        parallel_rank: 1,
        tile: Vec::new(),
        timing_ns: start.elapsed().as_nanos(),
    });
    Ok(out)
}

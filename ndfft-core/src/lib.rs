//! ndfft is the array plumbing underneath a multi-dimensional FFT: dense
//! arrays with compile-time rank, a choice of execution device, and the
//! data-parallel kernels that prepare inputs for a transform.
//!
//! The central operation is [`crop_or_pad`]. Before a transform of shape `s`
//! runs over an array whose extents differ, the array is copied into a
//! zero-filled buffer of shape `s`: axes that are too long are cropped, axes
//! that are too short are padded. The copy is one kernel launch, tiled over
//! up to eight axes.
//!
//! ## Devices
//! Arrays carry a marker for where their storage lives ([`Cpu`], or
//! `Cuda<ORD>` with the `cuda` feature). Operations take a [`Device`] to run
//! on, which must own that memory. The CPU device runs on rayon; a custom
//! thread pool and tile table are set through [`CpuConfig`].
//!
//! ## A quick example
//! ```
//! use ndfft_core::{crop_or_pad, get_modified_shape, is_crop_or_pad_needed, Array, Cpu, Device, Shape};
//!
//! let device = Device::cpu();
//! let x = Array::<f64, 2, Cpu>::arange("x", [3, 2]).unwrap();
//!
//! let target = get_modified_shape(&x, Shape::from([2, 4])).unwrap();
//! assert!(is_crop_or_pad_needed(&x, &target));
//!
//! let out = crop_or_pad(&device, &x, target).unwrap();
//! assert_eq!(out.extents(), &[2, 4]);
//! assert_eq!(
//!     out.to_vec().unwrap(),
//!     vec![0., 1., 0., 0., 2., 3., 0., 0.],
//! );
//! ```

mod array;
mod axes;
mod config;
mod cpu_storage;
#[cfg(feature = "cuda")]
mod cuda_backend;
mod device;
mod dtype;
mod error;
mod ops;
mod padding;
mod shape;
mod storage;
mod tiling;
mod trace;

pub use array::Array;
pub use axes::{
    convert_negative_axis, convert_negative_shift, get_index, has_duplicate_values,
    is_out_of_range_value_included,
};
pub use config::{CpuConfig, WorkerPolicy, NUM_THREADS_ENV};
pub use cpu_storage::CpuDevice;
#[cfg(feature = "cuda")]
pub use cuda_backend::CudaDevice;
#[cfg(feature = "cuda")]
pub use device::Cuda;
pub use device::{Cpu, Dev, Device};
pub use dtype::{Complex, Complex32, Complex64, DType};
pub use error::{Context, Error, Result};
pub use ops::conjugate;
pub use padding::{crop_or_pad, get_modified_shape, is_crop_or_pad_needed};
pub use shape::{Shape, MAX_RANK};
pub use tiling::{
    contiguous_strides, default_tile_hint, CopyRegion, IterationStrategy,
    DEFAULT_MAX_PARALLEL_RANK, TILE_HINTS,
};
pub use trace::{take_dispatch_traces, DispatchTrace, MAX_TRACES};

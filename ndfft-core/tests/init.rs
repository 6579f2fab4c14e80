use ndfft_core::{Array, Complex32, Complex64, Cpu, Error};

#[cfg(feature = "cuda")]
use ndfft_core::Cuda;
#[cfg(feature = "bfloat")]
use half::bf16;
#[cfg(feature = "half")]
use half::f16;

macro_rules! test_device_dtype {
    ($dtype:ty, $dev:ty, $zero:expr, $full:expr, $dtype_mod:ident) => {
        mod $dtype_mod {
            use super::*;

            #[test]
            fn zeros() {
                let a = Array::<$dtype, 2, $dev>::zeros("a", [3, 4]).unwrap();
                assert_eq!(a.to_vec().unwrap(), vec![$zero; 12]);
            }

            #[test]
            fn full() {
                let a = Array::<$dtype, 2, $dev>::full("a", [3, 4], $full).unwrap();
                assert_eq!(a.to_vec().unwrap(), vec![$full; 12]);
            }

            #[test]
            fn dim1() {
                let a = Array::<$dtype, 1, $dev>::full("a", [3], $full).unwrap();
                assert_eq!(a.len(), 3);
                assert_eq!(a.to_vec().unwrap(), vec![$full; 3]);
            }

            #[test]
            fn dim3() {
                let a = Array::<$dtype, 3, $dev>::full("a", [3, 4, 5], $full).unwrap();
                assert_eq!(a.strides(), [20, 5, 1]);
                assert_eq!(a.get([2, 3, 4]).unwrap(), $full);
            }

            #[test]
            fn set_then_get() {
                let mut a = Array::<$dtype, 2, $dev>::zeros("a", [2, 2]).unwrap();
                a.set([1, 0], $full).unwrap();
                assert_eq!(a.to_vec().unwrap(), vec![$zero, $zero, $full, $zero]);
            }

            #[test]
            fn wrong_length_is_rejected() {
                let err = Array::<$dtype, 2, $dev>::from_vec("a", [2, 2], vec![$zero; 3]).unwrap_err();
                assert!(matches!(err.inner(), Error::ShapeMismatch { expected: 4, len: 3, .. }));
            }

            #[test]
            fn zero_extent_is_rejected() {
                let err = Array::<$dtype, 2, $dev>::zeros("a", [2, 0]).unwrap_err();
                assert!(matches!(err.inner(), Error::InvalidShape { axis: 1, .. }));
            }

            #[test]
            fn out_of_bounds_index() {
                let a = Array::<$dtype, 2, $dev>::zeros("a", [2, 2]).unwrap();
                let err = a.get([0, 2]).unwrap_err();
                assert!(matches!(err.inner(), Error::IndexOutOfBounds { .. }));
            }
        }
    };
}

test_device_dtype!(f32, Cpu, 0.0, 1.5, cpu_f32);
test_device_dtype!(f64, Cpu, 0.0, -2.25, cpu_f64);
test_device_dtype!(i32, Cpu, 0, 7, cpu_i32);
test_device_dtype!(i64, Cpu, 0, -9, cpu_i64);
test_device_dtype!(u8, Cpu, 0, 255, cpu_u8);
test_device_dtype!(u32, Cpu, 0, 42, cpu_u32);
test_device_dtype!(Complex32, Cpu, Complex32::new(0.0, 0.0), Complex32::new(1.0, -1.0), cpu_c64);
test_device_dtype!(Complex64, Cpu, Complex64::new(0.0, 0.0), Complex64::new(0.5, 3.0), cpu_c128);
#[cfg(feature = "half")]
test_device_dtype!(f16, Cpu, f16::from_f32(0.0), f16::from_f32(2.5), cpu_f16);
#[cfg(feature = "bfloat")]
test_device_dtype!(bf16, Cpu, bf16::from_f32(0.0), bf16::from_f32(2.5), cpu_bf16);

#[cfg(feature = "cuda")]
test_device_dtype!(f32, Cuda<0>, 0.0, 1.5, cuda_f32);
#[cfg(feature = "cuda")]
test_device_dtype!(f64, Cuda<0>, 0.0, -2.25, cuda_f64);
#[cfg(feature = "cuda")]
test_device_dtype!(i32, Cuda<0>, 0, 7, cuda_i32);
#[cfg(feature = "cuda")]
test_device_dtype!(Complex64, Cuda<0>, Complex64::new(0.0, 0.0), Complex64::new(0.5, 3.0), cuda_c128);

#[test]
fn arange_is_row_major() {
    let a = Array::<f64, 2, Cpu>::arange("a", [2, 3]).unwrap();
    assert_eq!(a.get([1, 0]).unwrap(), 3.0);
    assert_eq!(a.to_vec().unwrap(), vec![0., 1., 2., 3., 4., 5.]);
    assert_eq!(a.label(), "a");
    assert_eq!(a.location(), "cpu");
}

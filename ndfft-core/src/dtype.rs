use std::fmt::Debug;

#[cfg(feature = "bfloat")]
use half::bf16;
#[cfg(feature = "half")]
use half::f16;

#[cfg(feature = "cuda")]
use cudarc::driver::{DeviceRepr, ValidAsZeroBits};

#[cfg(feature = "cuda")]
/// Marker trait for array element types.
pub trait DType:
    Debug + Copy + PartialEq + DeviceRepr + ValidAsZeroBits + Send + Sync + 'static
{
    /// The value newly allocated storage holds, and the value padding writes.
    const ZERO: Self;
    const NAME: &'static str;
    const C_NAME: &'static str;
    const C_DEP: Option<&'static str>;
    const IS_COMPLEX: bool;

    /// Complex conjugate. Identity for real types.
    fn conj(self) -> Self {
        self
    }

    /// Lossy conversion used to build ramps and test data.
    fn from_f64(v: f64) -> Self;
}

#[cfg(not(feature = "cuda"))]
/// Marker trait for array element types.
pub trait DType: Debug + Copy + PartialEq + Send + Sync + 'static {
    /// The value newly allocated storage holds, and the value padding writes.
    const ZERO: Self;
    const NAME: &'static str;
    const C_NAME: &'static str;
    const C_DEP: Option<&'static str>;
    const IS_COMPLEX: bool;

    /// Complex conjugate. Identity for real types.
    fn conj(self) -> Self {
        self
    }

    /// Lossy conversion used to build ramps and test data.
    fn from_f64(v: f64) -> Self;
}

macro_rules! dtype {
    ($rt:ident, $zero:expr, $repr:expr, $c_repr:expr) => {
        impl DType for $rt {
            const ZERO: $rt = $zero;
            const NAME: &'static str = $repr;
            const C_NAME: &'static str = $c_repr;
            const C_DEP: Option<&'static str> = None;
            const IS_COMPLEX: bool = false;

            fn from_f64(v: f64) -> Self {
                v as $rt
            }
        }
    };
}

dtype!(u8, 0u8, "u8", "uint8_t");
dtype!(u32, 0u32, "u32", "uint32_t");
dtype!(i32, 0i32, "i32", "int");
dtype!(i64, 0i64, "i64", "int64_t");
dtype!(f32, 0f32, "f32", "float");
dtype!(f64, 0f64, "f64", "double");

#[cfg(feature = "half")]
impl DType for f16 {
    const ZERO: f16 = f16::from_f32_const(0.0);
    const NAME: &'static str = "f16";
    const C_NAME: &'static str = "__half";
    const C_DEP: Option<&'static str> = Some("#include \"cuda_fp16.h\"");
    const IS_COMPLEX: bool = false;

    fn from_f64(v: f64) -> Self {
        f16::from_f64(v)
    }
}

#[cfg(feature = "bfloat")]
impl DType for bf16 {
    const ZERO: bf16 = bf16::from_f32_const(0.0);
    const NAME: &'static str = "bf16";
    const C_NAME: &'static str = "__nv_bfloat16";
    const C_DEP: Option<&'static str> = Some("#include \"cuda_bf16.h\"");
    const IS_COMPLEX: bool = false;

    fn from_f64(v: f64) -> Self {
        bf16::from_f64(v)
    }
}

/// Interleaved complex number with the same layout as `float2`/`double2`
/// and the FFT libraries' complex types.
///
/// Convertible to and from [`num_complex::Complex`].
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Complex<T> {
    pub re: T,
    pub im: T,
}

pub type Complex32 = Complex<f32>;
pub type Complex64 = Complex<f64>;

impl<T> Complex<T> {
    pub const fn new(re: T, im: T) -> Self {
        Self { re, im }
    }
}

impl<T> From<num_complex::Complex<T>> for Complex<T> {
    fn from(value: num_complex::Complex<T>) -> Self {
        Self {
            re: value.re,
            im: value.im,
        }
    }
}

impl<T> From<Complex<T>> for num_complex::Complex<T> {
    fn from(value: Complex<T>) -> Self {
        num_complex::Complex::new(value.re, value.im)
    }
}

// SAFETY: `Complex<T>` is `repr(C)` with two fields of `T`, so it is plain
// data whenever `T` is.
#[cfg(feature = "cuda")]
unsafe impl<T: DeviceRepr> DeviceRepr for Complex<T> {}
// SAFETY: all-zero bits are `re = 0, im = 0` whenever they are valid for `T`.
#[cfg(feature = "cuda")]
unsafe impl<T: ValidAsZeroBits> ValidAsZeroBits for Complex<T> {}

macro_rules! complex_dtype {
    ($rt:ident, $repr:expr, $c_repr:expr, $c_dep:expr) => {
        impl DType for Complex<$rt> {
            const ZERO: Self = Complex::new(0.0, 0.0);
            const NAME: &'static str = $repr;
            const C_NAME: &'static str = $c_repr;
            const C_DEP: Option<&'static str> = Some($c_dep);
            const IS_COMPLEX: bool = true;

            fn conj(self) -> Self {
                Complex::new(self.re, -self.im)
            }

            fn from_f64(v: f64) -> Self {
                Complex::new(v as $rt, 0.0)
            }
        }
    };
}

complex_dtype!(
    f32,
    "c64",
    "ndfft_c64",
    r#"struct ndfft_c64 { float re; float im; };
__device__ inline ndfft_c64 ndfft_conj(ndfft_c64 v) { v.im = -v.im; return v; }"#
);
complex_dtype!(
    f64,
    "c128",
    "ndfft_c128",
    r#"struct ndfft_c128 { double re; double im; };
__device__ inline ndfft_c128 ndfft_conj(ndfft_c128 v) { v.im = -v.im; return v; }"#
);

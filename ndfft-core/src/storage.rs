use std::borrow::Cow;

#[cfg(feature = "cuda")]
use crate::cuda_backend::CudaStorage;
use crate::{cpu_storage::CpuStorage, tiling::CopyRegion, DType, IterationStrategy, Result};

/// Backing memory of an array, on whichever device allocated it.
pub enum Storage<T: DType> {
    #[cfg(feature = "cuda")]
    Cuda(CudaStorage<T>),
    Cpu(CpuStorage<T>),
}

impl<T: DType> Storage<T> {
    pub(crate) fn to_cpu_storage(&self) -> Result<Cow<'_, CpuStorage<T>>> {
        match self {
            Self::Cpu(cpu) => cpu.to_cpu_storage(),
            #[cfg(feature = "cuda")]
            Self::Cuda(cuda) => cuda.to_cpu_storage(),
        }
    }

    pub(crate) fn read(&self, offset: usize) -> Result<T> {
        match self {
            Self::Cpu(cpu) => cpu.read(offset),
            #[cfg(feature = "cuda")]
            Self::Cuda(cuda) => cuda.read(offset),
        }
    }

    pub(crate) fn write(&mut self, offset: usize, value: T) -> Result<()> {
        match self {
            Self::Cpu(cpu) => cpu.write(offset, value),
            #[cfg(feature = "cuda")]
            Self::Cuda(cuda) => cuda.write(offset, value),
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            Self::Cpu(cpu) => cpu.len(),
            #[cfg(feature = "cuda")]
            Self::Cuda(cuda) => cuda.len(),
        }
    }

    /// Name of the device kind the memory lives on.
    pub(crate) fn location(&self) -> &'static str {
        match self {
            Self::Cpu(_) => "cpu",
            #[cfg(feature = "cuda")]
            Self::Cuda(_) => "cuda",
        }
    }
}

pub trait BackendStorage<T: DType> {
    fn to_cpu_storage(&self) -> Result<Cow<'_, CpuStorage<T>>>;

    fn len(&self) -> usize;

    /// Read one element. `offset` must be in bounds.
    fn read(&self, offset: usize) -> Result<T>;

    /// Write one element. `offset` must be in bounds.
    fn write(&mut self, offset: usize, value: T) -> Result<()>;
}

/// An execution backend: allocates storage and runs data-parallel kernels on it.
pub trait BackendDevice: IterationStrategy {
    type Storage<X: DType>: BackendStorage<X>;

    const NAME: &'static str;

    /// Allocate `len` elements, all equal to [`DType::ZERO`].
    fn zeros<T: DType>(&self, len: usize) -> Result<Self::Storage<T>>;

    fn from_host<T: DType>(&self, data: Vec<T>) -> Result<Self::Storage<T>>;

    /// Launch one kernel copying every point of `region` from `src` to `dst`.
    /// Points of `dst` outside the region are left untouched.
    fn launch_copy<T: DType, const R: usize>(
        &self,
        src: &Self::Storage<T>,
        dst: &mut Self::Storage<T>,
        region: &CopyRegion<R>,
    ) -> Result<()>;

    /// Launch one kernel producing the elementwise conjugate of `src`.
    fn conjugate<T: DType>(&self, src: &Self::Storage<T>) -> Result<Self::Storage<T>>;
}

use crate::{
    config::CpuConfig,
    cpu_storage::CpuDevice,
    shape::MAX_RANK,
    storage::{BackendDevice, Storage},
    tiling::CopyRegion,
    DType, Error, IterationStrategy, Result,
};

#[cfg(feature = "cuda")]
use crate::cuda_backend::CudaDevice;

/// Marker trait for the device an array's storage lives on.
pub trait Dev: Clone {
    /// Kind of device this marker stands for, as reported by [`Device::location`].
    const LOCATION: &'static str;

    /// The default execution device for this marker.
    fn resolve() -> Result<Device>;
}

#[derive(Clone, Debug)]
pub struct Cpu;

impl Dev for Cpu {
    const LOCATION: &'static str = "cpu";

    fn resolve() -> Result<Device> {
        Ok(Device::Cpu(CpuDevice::global()))
    }
}

#[cfg(feature = "cuda")]
#[derive(Clone, Debug)]
pub struct Cuda<const ORD: usize>;

#[cfg(feature = "cuda")]
macro_rules! cuda_device {
    ($ord:expr) => {
        impl Dev for Cuda<$ord> {
            const LOCATION: &'static str = "cuda";

            fn resolve() -> Result<Device> {
                Ok(Device::Cuda(CudaDevice::new($ord)?))
            }
        }
    };
}

// NOTE: Support up to 10 ordinals
#[cfg(feature = "cuda")]
cuda_device!(0);
#[cfg(feature = "cuda")]
cuda_device!(1);
#[cfg(feature = "cuda")]
cuda_device!(2);
#[cfg(feature = "cuda")]
cuda_device!(3);
#[cfg(feature = "cuda")]
cuda_device!(4);
#[cfg(feature = "cuda")]
cuda_device!(5);
#[cfg(feature = "cuda")]
cuda_device!(6);
#[cfg(feature = "cuda")]
cuda_device!(7);
#[cfg(feature = "cuda")]
cuda_device!(8);
#[cfg(feature = "cuda")]
cuda_device!(9);

/// A concrete execution backend handle.
///
/// Every kernel launched through a `Device` runs on it; arrays passed in
/// must live in its memory.
#[derive(Clone)]
pub enum Device {
    #[cfg(feature = "cuda")]
    Cuda(CudaDevice),
    Cpu(CpuDevice),
}

impl Device {
    /// Host device on rayon's global pool.
    pub fn cpu() -> Self {
        Self::Cpu(CpuDevice::global())
    }

    /// Host device with its own pool and tiling settings.
    pub fn cpu_with(config: &CpuConfig) -> Result<Self> {
        Ok(Self::Cpu(CpuDevice::new(config)?))
    }

    #[cfg(feature = "cuda")]
    pub fn new_cuda(ordinal: usize) -> Result<Self> {
        Ok(Self::Cuda(CudaDevice::new(ordinal)?))
    }

    /// Kind of memory this device allocates: `"cpu"` or `"cuda"`.
    pub fn location(&self) -> &'static str {
        match self {
            Self::Cpu(_) => CpuDevice::NAME,
            #[cfg(feature = "cuda")]
            Self::Cuda(_) => CudaDevice::NAME,
        }
    }

    pub(crate) fn zeros<T: DType>(&self, len: usize) -> Result<Storage<T>> {
        match self {
            Self::Cpu(cpu) => Ok(Storage::Cpu(cpu.zeros(len)?)),
            #[cfg(feature = "cuda")]
            Self::Cuda(cuda) => Ok(Storage::Cuda(cuda.zeros(len)?)),
        }
    }

    pub(crate) fn from_host<T: DType>(&self, data: Vec<T>) -> Result<Storage<T>> {
        match self {
            Self::Cpu(cpu) => Ok(Storage::Cpu(cpu.from_host(data)?)),
            #[cfg(feature = "cuda")]
            Self::Cuda(cuda) => Ok(Storage::Cuda(cuda.from_host(data)?)),
        }
    }

    #[allow(unreachable_patterns)]
    pub(crate) fn launch_copy<T: DType, const R: usize>(
        &self,
        label: &str,
        src: &Storage<T>,
        dst: &mut Storage<T>,
        region: &CopyRegion<R>,
    ) -> Result<()> {
        match (self, src, dst) {
            (Self::Cpu(cpu), Storage::Cpu(src), Storage::Cpu(dst)) => {
                cpu.launch_copy(src, dst, region)
            }
            #[cfg(feature = "cuda")]
            (Self::Cuda(cuda), Storage::Cuda(src), Storage::Cuda(dst))
                if cuda.ordinal() == src.ordinal() && cuda.ordinal() == dst.ordinal() =>
            {
                cuda.launch_copy(src, dst, region)
            }
            (_, src, _) => Err(self.mismatch(label, src)),
        }
    }

    #[allow(unreachable_patterns)]
    pub(crate) fn conjugate<T: DType>(&self, label: &str, src: &Storage<T>) -> Result<Storage<T>> {
        match (self, src) {
            (Self::Cpu(cpu), Storage::Cpu(src)) => Ok(Storage::Cpu(cpu.conjugate(src)?)),
            #[cfg(feature = "cuda")]
            (Self::Cuda(cuda), Storage::Cuda(src)) if cuda.ordinal() == src.ordinal() => {
                Ok(Storage::Cuda(cuda.conjugate(src)?))
            }
            (_, src) => Err(self.mismatch(label, src)),
        }
    }

    fn mismatch<T: DType>(&self, label: &str, storage: &Storage<T>) -> Error {
        Error::DeviceMismatch {
            label: label.to_string(),
            device: self.location(),
            storage: storage.location(),
        }
        .bt()
    }
}

impl IterationStrategy for Device {
    fn max_parallel_rank(&self) -> usize {
        match self {
            Self::Cpu(cpu) => cpu.max_parallel_rank(),
            #[cfg(feature = "cuda")]
            Self::Cuda(cuda) => cuda.max_parallel_rank(),
        }
    }

    fn tile_hint(&self, rank: usize) -> [usize; MAX_RANK] {
        match self {
            Self::Cpu(cpu) => cpu.tile_hint(rank),
            #[cfg(feature = "cuda")]
            Self::Cuda(cuda) => cuda.tile_hint(rank),
        }
    }
}

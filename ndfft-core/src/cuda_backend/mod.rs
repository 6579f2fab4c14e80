use cudarc::{
    driver::{CudaContext, CudaFunction, CudaModule, CudaSlice, CudaStream, LaunchConfig, PushKernelArg},
    nvrtc::Ptx,
};
use error::{CudaError, WrapErr};
use std::{
    borrow::Cow,
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, RwLock},
};

use crate::{
    cpu_storage::CpuStorage,
    shape::MAX_RANK,
    storage::{BackendDevice, BackendStorage},
    tiling::CopyRegion,
    DType, Error, IterationStrategy, Result,
};

pub(crate) mod error;
pub(crate) mod util;

const MAX_CACHED_KERNELS: usize = 128;

/// One CUDA device with a single in-order stream.
///
/// Kernels are generated per element type and rank, compiled with NVRTC
/// on first use and cached by name.
#[derive(Clone)]
pub struct CudaDevice {
    ordinal: usize,
    context: Arc<CudaContext>,
    stream: Arc<CudaStream>,
    modules: Arc<RwLock<HashMap<String, Arc<CudaModule>>>>,
    module_cache_order: Arc<Mutex<VecDeque<String>>>,
}

impl CudaDevice {
    pub(crate) fn new(ordinal: usize) -> Result<Self> {
        let context = CudaContext::new(ordinal).w()?;
        let stream = context.new_stream().w()?;
        Ok(Self {
            ordinal,
            context,
            stream,
            modules: Arc::new(RwLock::new(HashMap::new())),
            module_cache_order: Arc::new(Mutex::new(VecDeque::new())),
        })
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub(crate) fn stream(&self) -> Arc<CudaStream> {
        self.stream.clone()
    }

    /// Load `function_name`, compiling `source()` only on a cache miss.
    fn get_or_compile(
        &self,
        function_name: &str,
        source: impl FnOnce() -> String,
    ) -> Result<CudaFunction> {
        {
            let modules = self.modules.read().map_err(|_| CudaError::Poisoned)?;
            if let Some(module) = modules.get(function_name) {
                return module.load_function(function_name).w();
            }
        }
        let ptx = util::compile_ptx(function_name, source())?;
        self.load_func(function_name, ptx)
    }

    pub(crate) fn load_func(&self, function_name: &str, ptx: Ptx) -> Result<CudaFunction> {
        let module = self
            .context
            .load_module(ptx)
            .map_err(|cuda| CudaError::Load {
                cuda,
                module_name: function_name.to_string(),
            })?;
        let func = module.load_function(function_name).w()?;
        // Insert into cache and cap size
        {
            let mut modules = self.modules.write().map_err(|_| CudaError::Poisoned)?;
            let mut order = self
                .module_cache_order
                .lock()
                .map_err(|_| CudaError::Poisoned)?;
            modules.insert(function_name.to_string(), module);
            order.push_back(function_name.to_string());
            if order.len() > MAX_CACHED_KERNELS {
                if let Some(old) = order.pop_front() {
                    modules.remove(&old);
                }
            }
        }
        Ok(func)
    }
}

impl IterationStrategy for CudaDevice {
    /// A thread grid flattens any number of axes.
    fn max_parallel_rank(&self) -> usize {
        MAX_RANK
    }
}

pub struct CudaStorage<T: DType> {
    slice: CudaSlice<T>,
    device: CudaDevice,
}

impl<T: DType> CudaStorage<T> {
    pub(crate) fn ordinal(&self) -> usize {
        self.device.ordinal()
    }

    fn check_offset(&self, offset: usize) -> Result<()> {
        if offset >= self.slice.len() {
            crate::bail!("offset {offset} past end of device buffer");
        }
        Ok(())
    }
}

impl<T: DType> BackendStorage<T> for CudaStorage<T> {
    fn to_cpu_storage(&self) -> Result<Cow<'_, CpuStorage<T>>> {
        let data = self.device.stream().memcpy_dtov(&self.slice).w()?;
        Ok(Cow::Owned(CpuStorage(data)))
    }

    fn len(&self) -> usize {
        self.slice.len()
    }

    fn read(&self, offset: usize) -> Result<T> {
        self.check_offset(offset)?;
        let view = self.slice.slice(offset..offset + 1);
        let data = self.device.stream().memcpy_dtov(&view).w()?;
        data.into_iter()
            .next()
            .ok_or_else(|| Error::msg("empty device read"))
    }

    fn write(&mut self, offset: usize, value: T) -> Result<()> {
        self.check_offset(offset)?;
        let stream = self.device.stream();
        let mut view = self.slice.slice_mut(offset..offset + 1);
        stream.memcpy_htod(&[value], &mut view).w()?;
        Ok(())
    }
}

impl BackendDevice for CudaDevice {
    type Storage<X: DType> = CudaStorage<X>;

    const NAME: &'static str = "cuda";

    fn zeros<T: DType>(&self, len: usize) -> Result<Self::Storage<T>> {
        let slice = self.stream.alloc_zeros::<T>(len).w()?;
        Ok(CudaStorage {
            slice,
            device: self.clone(),
        })
    }

    fn from_host<T: DType>(&self, data: Vec<T>) -> Result<Self::Storage<T>> {
        let slice = self.stream.memcpy_stod(&data).w()?;
        Ok(CudaStorage {
            slice,
            device: self.clone(),
        })
    }

    fn launch_copy<T: DType, const R: usize>(
        &self,
        src: &Self::Storage<T>,
        dst: &mut Self::Storage<T>,
        region: &CopyRegion<R>,
    ) -> Result<()> {
        if region.is_empty() {
            return Ok(());
        }
        if region.src_span() > src.len() || region.dst_span() > dst.len() {
            return Err(Error::Dispatch {
                op: "crop_or_pad",
                backend: Self::NAME,
                reason: format!(
                    "copy region {:?} exceeds buffers of {} and {} elements",
                    region.extents(),
                    src.len(),
                    dst.len()
                ),
            }
            .bt());
        }

        let name = util::copy_kernel_name::<T, R>(region);
        let func = self.get_or_compile(&name, || util::copy_kernel_source::<T, R>(&name, region))?;

        let meta: Vec<u64> = region
            .extents()
            .iter()
            .chain(region.src_strides())
            .chain(region.dst_strides())
            .map(|&v| v as u64)
            .collect();
        let meta = self.stream.memcpy_stod(&meta).w()?;
        let parallel = region.parallel_count();
        let sequential = region.sequential_count();
        let cfg = util::copy_launch_config(region);

        let mut builder = self.stream.launch_builder(&func);
        builder.arg(&src.slice);
        builder.arg(&mut dst.slice);
        builder.arg(&meta);
        builder.arg(&parallel);
        builder.arg(&sequential);
        // SAFETY: the spans checked above bound every offset the kernel
        // computes, and each thread writes a distinct destination point.
        unsafe { builder.launch(cfg).w()? };
        Ok(())
    }

    fn conjugate<T: DType>(&self, src: &Self::Storage<T>) -> Result<Self::Storage<T>> {
        let numel = src.len();
        let mut out = self.zeros::<T>(numel)?;
        if numel == 0 {
            return Ok(out);
        }

        let name = util::conjugate_kernel_name::<T>();
        let func = self.get_or_compile(&name, || util::conjugate_kernel_source::<T>(&name))?;
        let cfg = LaunchConfig::for_num_elems(numel as u32);

        let mut builder = self.stream.launch_builder(&func);
        builder.arg(&src.slice);
        builder.arg(&mut out.slice);
        builder.arg(&numel);
        // SAFETY: one thread per element of two buffers of `numel` elements.
        unsafe { builder.launch(cfg).w()? };
        Ok(out)
    }
}

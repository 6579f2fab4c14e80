use std::borrow::Cow;
use std::sync::Arc;

use rayon::iter::{IntoParallelIterator, IntoParallelRefIterator, ParallelIterator};
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::{
    config::CpuConfig,
    shape::MAX_RANK,
    storage::{BackendDevice, BackendStorage},
    tiling::CopyRegion,
    DType, Error, IterationStrategy, Result,
};

/// Host execution device backed by a rayon thread pool.
#[derive(Clone)]
pub struct CpuDevice {
    /// `None` runs on rayon's global pool.
    pool: Option<Arc<ThreadPool>>,
    max_parallel_rank: usize,
    tile_hints: [[usize; MAX_RANK]; MAX_RANK],
}

impl CpuDevice {
    pub fn new(config: &CpuConfig) -> Result<Self> {
        config.validate()?;
        let pool = match config.workers.resolve()? {
            Some(n) => {
                let pool = ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(|i| format!("ndfft-cpu-{i}"))
                    .build()
                    .map_err(|e| {
                        Error::Dispatch {
                            op: "thread pool",
                            backend: Self::NAME,
                            reason: e.to_string(),
                        }
                        .bt()
                    })?;
                Some(Arc::new(pool))
            }
            None => None,
        };
        Ok(Self {
            pool,
            max_parallel_rank: config.max_parallel_rank,
            tile_hints: config.tile_hints,
        })
    }

    /// A device on rayon's global pool with the default tiling.
    pub fn global() -> Self {
        let config = CpuConfig::default();
        Self {
            pool: None,
            max_parallel_rank: config.max_parallel_rank,
            tile_hints: config.tile_hints,
        }
    }

    pub fn num_threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    fn install<O: Send>(&self, f: impl FnOnce() -> O + Send) -> O {
        match &self.pool {
            Some(pool) => pool.install(f),
            None => f(),
        }
    }
}

impl IterationStrategy for CpuDevice {
    fn max_parallel_rank(&self) -> usize {
        self.max_parallel_rank
    }

    fn tile_hint(&self, rank: usize) -> [usize; MAX_RANK] {
        match rank {
            1..=MAX_RANK => self.tile_hints[rank - 1],
            _ => [1; MAX_RANK],
        }
    }
}

#[derive(Clone, Debug)]
pub struct CpuStorage<T: DType>(pub(crate) Vec<T>);

impl<T: DType> BackendStorage<T> for CpuStorage<T> {
    fn to_cpu_storage(&self) -> Result<Cow<'_, CpuStorage<T>>> {
        Ok(Cow::Borrowed(self))
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn read(&self, offset: usize) -> Result<T> {
        self.0
            .get(offset)
            .copied()
            .ok_or_else(|| Error::msg(format!("offset {offset} past end of host buffer")))
    }

    fn write(&mut self, offset: usize, value: T) -> Result<()> {
        match self.0.get_mut(offset) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Error::msg(format!("offset {offset} past end of host buffer"))),
        }
    }
}

/// Raw buffer pointer shared across the workers of one kernel.
#[derive(Clone, Copy)]
struct SharedPtr<T>(*mut T);

// SAFETY: the pointer is only dereferenced inside `launch_copy`, where every
// worker touches a disjoint set of offsets inside the buffer.
unsafe impl<T: Send> Send for SharedPtr<T> {}
unsafe impl<T: Send> Sync for SharedPtr<T> {}

impl<T> SharedPtr<T> {
    fn get(self) -> *mut T {
        self.0
    }
}

impl BackendDevice for CpuDevice {
    type Storage<X: DType> = CpuStorage<X>;

    const NAME: &'static str = "cpu";

    fn zeros<T: DType>(&self, len: usize) -> Result<Self::Storage<T>> {
        Ok(CpuStorage(vec![T::ZERO; len]))
    }

    fn from_host<T: DType>(&self, data: Vec<T>) -> Result<Self::Storage<T>> {
        Ok(CpuStorage(data))
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
        if region.src_span() > src.0.len() || region.dst_span() > dst.0.len() {
            return Err(Error::Dispatch {
                op: "crop_or_pad",
                backend: Self::NAME,
                reason: format!(
                    "copy region {:?} exceeds buffers of {} and {} elements",
                    region.extents(),
                    src.0.len(),
                    dst.0.len()
                ),
            }
            .bt());
        }

        let src_ptr = SharedPtr(src.0.as_ptr().cast_mut());
        let dst_ptr = SharedPtr(dst.0.as_mut_ptr());
        self.install(|| {
            (0..region.num_tiles()).into_par_iter().for_each(|tile| {
                region.for_each_run_in_tile(tile, |s, d, n| {
                    // SAFETY: runs lie inside the region, whose spans were
                    // checked against both buffers above. Tiles partition the
                    // region, so no two workers write the same offset, and
                    // `src` and `dst` are distinct allocations.
                    unsafe {
                        std::ptr::copy_nonoverlapping(
                            src_ptr.get().add(s).cast_const(),
                            dst_ptr.get().add(d),
                            n,
                        );
                    }
                });
            });
        });
        Ok(())
    }

    fn conjugate<T: DType>(&self, src: &Self::Storage<T>) -> Result<Self::Storage<T>> {
        let data = self.install(|| src.0.par_iter().map(|v| v.conj()).collect::<Vec<T>>());
        Ok(CpuStorage(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiling::contiguous_strides;

    #[test]
    fn dedicated_pool_reports_its_size() {
        let device = CpuDevice::new(&CpuConfig::default().with_num_threads(2)).unwrap();
        assert_eq!(device.num_threads(), 2);
    }

    #[test]
    fn copy_leaves_outside_points_untouched() {
        let device = CpuDevice::global();
        let src = CpuStorage((1..=6).collect::<Vec<i32>>());
        let mut dst = device.zeros::<i32>(9).unwrap();
        let region = device.copy_region(
            [2, 2],
            contiguous_strides(&[2, 3]),
            contiguous_strides(&[3, 3]),
        );
        device.launch_copy(&src, &mut dst, &region).unwrap();
        assert_eq!(dst.0, vec![1, 2, 0, 4, 5, 0, 0, 0, 0]);
    }

    #[test]
    fn copy_rejects_region_past_buffer() {
        let device = CpuDevice::global();
        let src = CpuStorage(vec![1u8; 4]);
        let mut dst = device.zeros::<u8>(4).unwrap();
        let region = device.copy_region([3, 3], [3, 1], [2, 1]);
        let err = device.launch_copy(&src, &mut dst, &region).unwrap_err();
        assert!(matches!(err.inner(), Error::Dispatch { .. }));
    }

    #[test]
    fn read_write_bounds() {
        let mut storage = CpuStorage(vec![0.0f32; 2]);
        storage.write(1, 2.5).unwrap();
        assert_eq!(storage.read(1).unwrap(), 2.5);
        assert!(storage.read(2).is_err());
        assert!(storage.write(2, 1.0).is_err());
    }
}

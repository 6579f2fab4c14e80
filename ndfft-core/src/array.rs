use std::{fmt, marker::PhantomData};

use crate::{
    device::{Dev, Device},
    shape::Shape,
    storage::Storage,
    tiling::contiguous_strides,
    DType, Error, Result,
};

/// A dense, row-major array of rank `R` owning its storage on device `D`.
///
/// Freshly constructed arrays are zero-filled. Only functions which
/// allocate, move data between host and device, or launch kernels return
/// `Result`s.
pub struct Array<T: DType, const R: usize, D: Dev> {
    label: String,
    extents: [usize; R],
    storage: Storage<T>,
    _ghost: PhantomData<D>,
}

impl<T: DType, const R: usize, D: Dev> Array<T, R, D> {
    /// Allocate a zero-filled array on the default device of `D`.
    pub fn zeros(label: impl Into<String>, extents: [usize; R]) -> Result<Self> {
        Self::zeros_on(&D::resolve()?, label, extents)
    }

    /// Allocate a zero-filled array on `device`.
    pub fn zeros_on(device: &Device, label: impl Into<String>, extents: [usize; R]) -> Result<Self> {
        let label = label.into();
        let count = Self::check_layout(device, &label, &extents)?;
        let storage = device.zeros(count)?;
        Ok(Self::from_parts(label, extents, storage))
    }

    /// Build an array from row-major host data on the default device of `D`.
    pub fn from_vec(label: impl Into<String>, extents: [usize; R], data: Vec<T>) -> Result<Self> {
        Self::from_vec_on(&D::resolve()?, label, extents, data)
    }

    pub fn from_vec_on(
        device: &Device,
        label: impl Into<String>,
        extents: [usize; R],
        data: Vec<T>,
    ) -> Result<Self> {
        let label = label.into();
        let count = Self::check_layout(device, &label, &extents)?;
        if data.len() != count {
            return Err(Error::ShapeMismatch {
                shape: extents.to_vec(),
                expected: count,
                len: data.len(),
            }
            .bt());
        }
        let storage = device.from_host(data)?;
        Ok(Self::from_parts(label, extents, storage))
    }

    /// An array holding `0, 1, 2, ...` in row-major order.
    pub fn arange(label: impl Into<String>, extents: [usize; R]) -> Result<Self> {
        let count = Self::checked_len(&extents)?;
        let data = (0..count).map(|i| T::from_f64(i as f64)).collect();
        Self::from_vec(label, extents, data)
    }

    /// An array with every element equal to `value`.
    pub fn full(label: impl Into<String>, extents: [usize; R], value: T) -> Result<Self> {
        let count = Self::checked_len(&extents)?;
        Self::from_vec(label, extents, vec![value; count])
    }

    /// Element count of `extents`, rejecting shapes whose buffer could not
    /// be allocated.
    fn checked_len(extents: &[usize; R]) -> Result<usize> {
        let count = Shape::from(*extents).checked_element_count()?;
        let fits = count
            .checked_mul(std::mem::size_of::<T>())
            .is_some_and(|bytes| bytes <= isize::MAX as usize);
        if !fits {
            return Err(Error::ElementCountOverflow {
                shape: extents.to_vec(),
            }
            .bt());
        }
        Ok(count)
    }

    /// Validate `extents` for an allocation on `device`, returning the
    /// element count.
    fn check_layout(device: &Device, label: &str, extents: &[usize; R]) -> Result<usize> {
        let count = Self::checked_len(extents)?;
        if device.location() != D::LOCATION {
            return Err(Error::DeviceMismatch {
                label: label.to_string(),
                device: device.location(),
                storage: D::LOCATION,
            }
            .bt());
        }
        Ok(count)
    }

    pub(crate) fn from_parts(label: String, extents: [usize; R], storage: Storage<T>) -> Self {
        debug_assert_eq!(storage.len(), extents.iter().product::<usize>());
        Self {
            label,
            extents,
            storage,
            _ghost: PhantomData,
        }
    }

    pub(crate) fn storage(&self) -> &Storage<T> {
        &self.storage
    }

    pub(crate) fn storage_mut(&mut self) -> &mut Storage<T> {
        &mut self.storage
    }

    pub const fn rank(&self) -> usize {
        R
    }

    /// Extent of `axis`.
    ///
    /// # Panics
    /// If `axis >= R`.
    pub fn extent(&self, axis: usize) -> usize {
        self.extents[axis]
    }

    pub fn extents(&self) -> &[usize; R] {
        &self.extents
    }

    pub fn shape(&self) -> Shape<R> {
        Shape::from(self.extents)
    }

    pub fn strides(&self) -> [usize; R] {
        contiguous_strides(&self.extents)
    }

    pub fn len(&self) -> usize {
        self.extents.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Kind of memory the array lives in.
    pub fn location(&self) -> &'static str {
        self.storage.location()
    }

    fn offset(&self, index: [usize; R]) -> Result<usize> {
        if index.iter().zip(&self.extents).any(|(i, n)| i >= n) {
            return Err(Error::IndexOutOfBounds {
                index: index.to_vec(),
                shape: self.extents.to_vec(),
            }
            .bt());
        }
        Ok(index
            .iter()
            .zip(self.strides())
            .map(|(i, stride)| i * stride)
            .sum())
    }

    /// Read one element. On an accelerator this is a device-to-host copy.
    pub fn get(&self, index: [usize; R]) -> Result<T> {
        let offset = self.offset(index)?;
        self.storage.read(offset)
    }

    /// Write one element. On an accelerator this is a host-to-device copy.
    pub fn set(&mut self, index: [usize; R], value: T) -> Result<()> {
        let offset = self.offset(index)?;
        self.storage.write(offset, value)
    }

    /// Copy all elements to the host, in row-major order.
    pub fn to_vec(&self) -> Result<Vec<T>> {
        Ok(self.storage.to_cpu_storage()?.into_owned().0)
    }
}

impl<T: DType, const R: usize, D: Dev> fmt::Debug for Array<T, R, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Array")
            .field("label", &self.label)
            .field("extents", &self.extents)
            .field("dtype", &T::NAME)
            .field("location", &self.location())
            .finish()
    }
}

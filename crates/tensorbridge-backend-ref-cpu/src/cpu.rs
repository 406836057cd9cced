use std::any::Any;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tensorbridge::error::{EngineError, EngineResult};
use tensorbridge::grad_mode;
use tensorbridge::{DType, Device, NativeTensor, Shape, TensorEngine, TensorHandle, TensorOptions};

/// Whether the engine offers an accelerator device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceleratorMode {
    /// Accelerator memory is emulated with separate host allocations that refuse
    /// raw element access, like real device memory.
    Emulated { devices: usize },
    /// Every accelerator transfer fails.
    Unavailable,
}

impl AcceleratorMode {
    fn check(self, device: Device) -> EngineResult<()> {
        match (device, self) {
            (Device::Cpu, _) => Ok(()),
            (Device::Cuda(index), AcceleratorMode::Emulated { devices }) if index < devices => {
                Ok(())
            }
            (Device::Cuda(_), _) => Err(EngineError::AcceleratorUnavailable(device)),
        }
    }
}

/// Pure-Rust engine with shared, strided `f32` storage.
#[derive(Debug, Clone)]
pub struct RefEngine {
    accelerator: AcceleratorMode,
}

impl RefEngine {
    pub fn new() -> Self {
        Self::with_accelerator(AcceleratorMode::Emulated { devices: 1 })
    }

    pub fn with_accelerator(accelerator: AcceleratorMode) -> Self {
        Self { accelerator }
    }

    /// Allocates a tensor directly from row-major values.
    pub fn from_vec(
        &self,
        dims: Vec<usize>,
        values: Vec<f32>,
        options: TensorOptions,
    ) -> EngineResult<TensorHandle> {
        let shape = Shape::new(dims);
        if values.len() != shape.num_elements() {
            return Err(EngineError::ElementCountMismatch {
                expected: shape.num_elements(),
                found: values.len(),
            });
        }
        self.accelerator.check(options.device)?;
        Ok(TensorHandle::new(RefTensor::dense(
            Storage::new(options.device, values),
            shape,
            options.requires_grad,
            self.accelerator,
        )))
    }
}

impl Default for RefEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TensorEngine for RefEngine {
    fn engine_name(&self) -> &str {
        "ref-cpu"
    }

    fn accelerator_available(&self) -> bool {
        matches!(self.accelerator, AcceleratorMode::Emulated { devices } if devices > 0)
    }

    fn full(
        &self,
        dims: &[i64],
        value: f32,
        options: TensorOptions,
    ) -> EngineResult<TensorHandle> {
        let too_large = || EngineError::backend(format!("shape {dims:?} is too large"));
        let mut extents = Vec::with_capacity(dims.len());
        let mut numel = 1usize;
        for (index, &dim) in dims.iter().enumerate() {
            if dim < 0 {
                return Err(EngineError::NegativeDimension { index, dim });
            }
            let extent = usize::try_from(dim).map_err(|_| too_large())?;
            numel = numel.checked_mul(extent).ok_or_else(too_large)?;
            extents.push(extent);
        }
        // Vec allocations are capped at isize::MAX bytes.
        let bytes = numel
            .checked_mul(options.dtype.size_in_bytes())
            .ok_or_else(too_large)?;
        if bytes > isize::MAX as usize {
            return Err(too_large());
        }
        tracing::debug!(?extents, value, device = %options.device, "ref-cpu allocation");
        let mut values = Vec::new();
        values.try_reserve_exact(numel).map_err(|err| {
            EngineError::backend(format!("cannot allocate {bytes} bytes: {err}"))
        })?;
        values.resize(numel, value);
        self.from_vec(extents, values, options)
    }
}

struct Storage {
    device: Device,
    data: RwLock<Vec<f32>>,
}

impl Storage {
    fn new(device: Device, data: Vec<f32>) -> Arc<Self> {
        Arc::new(Storage {
            device,
            data: RwLock::new(data),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<f32>> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<f32>> {
        self.data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A strided view over shared storage.
#[derive(Clone)]
pub struct RefTensor {
    storage: Arc<Storage>,
    shape: Shape,
    strides: Vec<usize>,
    offset: usize,
    requires_grad: bool,
    accelerator: AcceleratorMode,
}

impl RefTensor {
    fn dense(
        storage: Arc<Storage>,
        shape: Shape,
        requires_grad: bool,
        accelerator: AcceleratorMode,
    ) -> Self {
        let strides = shape.contiguous_strides();
        RefTensor {
            storage,
            shape,
            strides,
            offset: 0,
            requires_grad,
            accelerator,
        }
    }

    /// Number of tensors (views and handles' targets) sharing this storage.
    pub fn storage_references(&self) -> usize {
        Arc::strong_count(&self.storage)
    }

    /// Storage indices of every element, in row-major logical order.
    fn storage_offsets(&self) -> Vec<usize> {
        let dims = self.shape.dims();
        let numel = self.shape.num_elements();
        let mut offsets = Vec::with_capacity(numel);
        if numel == 0 {
            return offsets;
        }
        let mut index = vec![0usize; dims.len()];
        for _ in 0..numel {
            let linear: usize = index
                .iter()
                .zip(&self.strides)
                .map(|(i, stride)| i * stride)
                .sum();
            offsets.push(self.offset + linear);
            for axis in (0..dims.len()).rev() {
                index[axis] += 1;
                if index[axis] < dims[axis] {
                    break;
                }
                index[axis] = 0;
            }
        }
        offsets
    }

    fn gather(&self) -> Vec<f32> {
        let data = self.storage.read();
        self.storage_offsets()
            .into_iter()
            .map(|offset| data[offset])
            .collect()
    }

    /// Gradient flag of a tensor derived from this one by an engine operation.
    fn derived_requires_grad(&self) -> bool {
        self.requires_grad && grad_mode::is_enabled()
    }

    fn check_raw_access(&self) -> EngineResult<()> {
        if !self.storage.device.is_host() {
            return Err(EngineError::NotHostResident(self.storage.device));
        }
        if !self.is_contiguous() {
            return Err(EngineError::NotContiguous);
        }
        Ok(())
    }

    fn check_in_place(&self) -> EngineResult<()> {
        if self.requires_grad && grad_mode::is_enabled() {
            return Err(EngineError::InPlaceOnLeaf);
        }
        Ok(())
    }
}

impl fmt::Debug for RefTensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefTensor")
            .field("shape", &self.shape.dims())
            .field("strides", &self.strides)
            .field("offset", &self.offset)
            .field("device", &self.storage.device)
            .field("requires_grad", &self.requires_grad)
            .finish()
    }
}

impl NativeTensor for RefTensor {
    fn shape(&self) -> Shape {
        self.shape.clone()
    }

    fn dtype(&self) -> DType {
        DType::F32
    }

    fn device(&self) -> Device {
        self.storage.device
    }

    fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    fn is_contiguous(&self) -> bool {
        let mut expected = 1usize;
        for (&dim, &stride) in self.shape.dims().iter().zip(&self.strides).rev() {
            if dim == 0 {
                return true;
            }
            if dim != 1 && stride != expected {
                return false;
            }
            expected *= dim;
        }
        true
    }

    fn contiguous(&self) -> EngineResult<TensorHandle> {
        if self.is_contiguous() {
            return Ok(TensorHandle::new(self.clone()));
        }
        tracing::debug!(shape = %self.shape, "ref-cpu contiguous copy");
        Ok(TensorHandle::new(RefTensor::dense(
            Storage::new(self.storage.device, self.gather()),
            self.shape.clone(),
            self.derived_requires_grad(),
            self.accelerator,
        )))
    }

    fn to_device(&self, device: Device) -> EngineResult<TensorHandle> {
        self.accelerator.check(device)?;
        if device == self.storage.device {
            return Ok(TensorHandle::new(self.clone()));
        }
        tracing::debug!(from = %self.storage.device, to = %device, "ref-cpu device copy");
        Ok(TensorHandle::new(RefTensor::dense(
            Storage::new(device, self.gather()),
            self.shape.clone(),
            self.derived_requires_grad(),
            self.accelerator,
        )))
    }

    fn transpose(&self, dim0: usize, dim1: usize) -> EngineResult<TensorHandle> {
        let rank = self.shape.rank();
        for dim in [dim0, dim1] {
            if dim >= rank {
                return Err(EngineError::DimensionOutOfRange { dim, rank });
            }
        }
        let mut dims = self.shape.dims().to_vec();
        let mut strides = self.strides.clone();
        dims.swap(dim0, dim1);
        strides.swap(dim0, dim1);
        Ok(TensorHandle::new(RefTensor {
            storage: Arc::clone(&self.storage),
            shape: Shape::new(dims),
            strides,
            offset: self.offset,
            requires_grad: self.derived_requires_grad(),
            accelerator: self.accelerator,
        }))
    }

    fn shares_storage(&self, other: &dyn NativeTensor) -> bool {
        other
            .as_any()
            .downcast_ref::<RefTensor>()
            .is_some_and(|other| Arc::ptr_eq(&self.storage, &other.storage))
    }

    fn read_elements(&self, visit: &mut dyn FnMut(&[f32])) -> EngineResult<()> {
        self.check_raw_access()?;
        let data = self.storage.read();
        let numel = self.shape.num_elements();
        visit(&data[self.offset..self.offset + numel]);
        Ok(())
    }

    fn write_elements(&self, fill: &mut dyn FnMut(&mut [f32])) -> EngineResult<()> {
        self.check_raw_access()?;
        self.check_in_place()?;
        let mut data = self.storage.write();
        let numel = self.shape.num_elements();
        fill(&mut data[self.offset..self.offset + numel]);
        Ok(())
    }

    fn copy_from(&self, src: &dyn NativeTensor) -> EngineResult<()> {
        let src = src
            .as_any()
            .downcast_ref::<RefTensor>()
            .ok_or_else(|| EngineError::backend("cannot copy from a tensor of another engine"))?;
        let expected = self.shape.num_elements();
        let found = src.shape.num_elements();
        if expected != found {
            return Err(EngineError::ElementCountMismatch { expected, found });
        }
        self.check_in_place()?;
        // Gather first: `src` may share storage with `self`.
        let values = src.gather();
        let mut data = self.storage.write();
        for (offset, value) in self.storage_offsets().into_iter().zip(values) {
            data[offset] = value;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

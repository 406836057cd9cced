//! libtorch-backed engine via `tch`.
//!
//! Every tensor this engine creates has kind `Float`, so `dtype()` is always
//! [`DType::F32`].

use std::any::Any;
use std::sync::Arc;

use tch::{Cuda, Kind, TchError};

use super::{NativeTensor, TensorEngine, TensorHandle, TensorOptions};
use crate::error::{EngineError, EngineResult};
use crate::grad_mode;
use crate::tensor::{DType, Device, Shape};

fn engine_err(err: TchError) -> EngineError {
    EngineError::backend(err.to_string())
}

fn to_tch(device: Device) -> tch::Device {
    match device {
        Device::Cpu => tch::Device::Cpu,
        Device::Cuda(index) => tch::Device::Cuda(index),
    }
}

fn from_tch(device: tch::Device) -> Device {
    match device {
        tch::Device::Cuda(index) => Device::Cuda(index),
        _ => Device::Cpu,
    }
}

/// Runs `op` with libtorch's grad mode matching the bridge's.
fn with_grad_mode<T>(op: impl FnOnce() -> T) -> T {
    if grad_mode::is_enabled() {
        op()
    } else {
        tch::no_grad(op)
    }
}

fn check_device(device: Device) -> EngineResult<()> {
    if let Device::Cuda(index) = device {
        let count = usize::try_from(Cuda::device_count()).unwrap_or(0);
        if !Cuda::is_available() || index >= count {
            return Err(EngineError::AcceleratorUnavailable(device));
        }
    }
    Ok(())
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TorchEngine;

impl TorchEngine {
    pub fn new() -> Self {
        TorchEngine
    }
}

impl TensorEngine for TorchEngine {
    fn engine_name(&self) -> &str {
        "libtorch"
    }

    fn accelerator_available(&self) -> bool {
        Cuda::is_available()
    }

    fn full(
        &self,
        dims: &[i64],
        value: f32,
        options: TensorOptions,
    ) -> EngineResult<TensorHandle> {
        if let Some((index, &dim)) = dims.iter().enumerate().find(|&(_, &d)| d < 0) {
            return Err(EngineError::NegativeDimension { index, dim });
        }
        check_device(options.device)?;
        let tensor = with_grad_mode(|| {
            tch::Tensor::f_full(dims, f64::from(value), (Kind::Float, to_tch(options.device)))
        })
        .map_err(engine_err)?;
        let tensor = tensor.set_requires_grad(options.requires_grad);
        Ok(TensorHandle::new(TorchTensor { inner: tensor }))
    }
}

/// Wrapper over one `tch::Tensor`. `tch` handles are themselves reference
/// counted by libtorch; `shallow_clone` shares the underlying `TensorImpl`.
#[derive(Debug)]
pub struct TorchTensor {
    inner: tch::Tensor,
}

impl TorchTensor {
    fn wrap(inner: tch::Tensor) -> TensorHandle {
        TensorHandle::new(TorchTensor { inner })
    }

    fn check_raw_access(&self) -> EngineResult<()> {
        let device = self.device();
        if !device.is_host() {
            return Err(EngineError::NotHostResident(device));
        }
        if !self.inner.is_contiguous() {
            return Err(EngineError::NotContiguous);
        }
        Ok(())
    }

    fn check_in_place(&self) -> EngineResult<()> {
        if self.inner.requires_grad() && grad_mode::is_enabled() {
            return Err(EngineError::InPlaceOnLeaf);
        }
        Ok(())
    }
}

impl NativeTensor for TorchTensor {
    fn shape(&self) -> Shape {
        Shape::new(
            self.inner
                .size()
                .into_iter()
                .map(|d| d as usize)
                .collect::<Vec<_>>(),
        )
    }

    fn dtype(&self) -> DType {
        DType::F32
    }

    fn device(&self) -> Device {
        from_tch(self.inner.device())
    }

    fn requires_grad(&self) -> bool {
        self.inner.requires_grad()
    }

    fn is_contiguous(&self) -> bool {
        self.inner.is_contiguous()
    }

    fn contiguous(&self) -> EngineResult<TensorHandle> {
        let out = with_grad_mode(|| self.inner.f_contiguous()).map_err(engine_err)?;
        Ok(Self::wrap(out))
    }

    fn to_device(&self, device: Device) -> EngineResult<TensorHandle> {
        check_device(device)?;
        let out = with_grad_mode(|| self.inner.f_to_device(to_tch(device))).map_err(engine_err)?;
        Ok(Self::wrap(out))
    }

    fn transpose(&self, dim0: usize, dim1: usize) -> EngineResult<TensorHandle> {
        let rank = self.inner.dim();
        for dim in [dim0, dim1] {
            if dim >= rank {
                return Err(EngineError::DimensionOutOfRange { dim, rank });
            }
        }
        let out = with_grad_mode(|| self.inner.f_transpose(dim0 as i64, dim1 as i64))
            .map_err(engine_err)?;
        Ok(Self::wrap(out))
    }

    fn shares_storage(&self, other: &dyn NativeTensor) -> bool {
        // Marshalling compares a tensor with either itself or a fresh allocation,
        // so equal data pointers identify shared storage.
        other
            .as_any()
            .downcast_ref::<TorchTensor>()
            .is_some_and(|other| self.inner.data_ptr() == other.inner.data_ptr())
    }

    fn read_elements(&self, visit: &mut dyn FnMut(&[f32])) -> EngineResult<()> {
        self.check_raw_access()?;
        let numel = self.inner.numel();
        if numel == 0 {
            visit(&[]);
            return Ok(());
        }
        // SAFETY: the tensor is a contiguous Float tensor on the host holding
        // `numel` elements, and `self.inner` keeps the storage alive for the call.
        let elements =
            unsafe { std::slice::from_raw_parts(self.inner.data_ptr() as *const f32, numel) };
        visit(elements);
        Ok(())
    }

    fn write_elements(&self, fill: &mut dyn FnMut(&mut [f32])) -> EngineResult<()> {
        self.check_raw_access()?;
        self.check_in_place()?;
        let numel = self.inner.numel();
        if numel == 0 {
            fill(&mut []);
            return Ok(());
        }
        // SAFETY: as in `read_elements`; the bridge runs on a single script thread
        // and concurrent writers to shared storage are the caller's responsibility.
        let elements =
            unsafe { std::slice::from_raw_parts_mut(self.inner.data_ptr() as *mut f32, numel) };
        fill(elements);
        Ok(())
    }

    fn copy_from(&self, src: &dyn NativeTensor) -> EngineResult<()> {
        let src = src
            .as_any()
            .downcast_ref::<TorchTensor>()
            .ok_or_else(|| EngineError::backend("cannot copy from a tensor of another engine"))?;
        if src.inner.numel() != self.inner.numel() {
            return Err(EngineError::ElementCountMismatch {
                expected: self.inner.numel(),
                found: src.inner.numel(),
            });
        }
        self.check_in_place()?;
        let mut dst = self.inner.shallow_clone();
        let src = src.inner.f_reshape_as(&dst).map_err(engine_err)?;
        with_grad_mode(|| dst.f_copy_(&src)).map_err(engine_err)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Register the libtorch engine under `"libtorch"`.
pub fn register_torch_engine() {
    super::registry::register_engine("libtorch", || Arc::new(TorchEngine::new()));
}

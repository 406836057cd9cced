//! The script-visible tensor object.

use std::fmt;

use crate::config;
use crate::engine::TensorHandle;
use crate::error::{BridgeError, BridgeResult, EngineError};
use crate::grad_mode;
use crate::host::HostValue;
use crate::marshal;
use crate::tensor::{DType, Device};

/// How the host is trying to create a [`Tensor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    /// Instantiation on behalf of a factory function.
    Factory,
    /// A script calling the constructor itself.
    Direct,
}

/// Bridge object wrapping exactly one native tensor handle.
///
/// The handle slot starts empty and is filled by [`Tensor::set_tensor`]. Dropping
/// the object releases its reference; storage is freed only if that was the last
/// one.
#[derive(Debug, Default)]
pub struct Tensor {
    handle: Option<TensorHandle>,
}

impl Tensor {
    /// Constructor entry point. Only factory instantiation is sanctioned.
    pub fn construct(invocation: Invocation) -> BridgeResult<Self> {
        match invocation {
            Invocation::Factory => Ok(Tensor { handle: None }),
            Invocation::Direct => Err(BridgeError::InvalidInvocation(
                "Tensor cannot be constructed directly; use ones() or zeros()".to_string(),
            )),
        }
    }

    /// Wraps an existing handle, sharing its storage.
    pub fn from_handle(handle: TensorHandle) -> Self {
        Tensor {
            handle: Some(handle),
        }
    }

    /// Attaches `handle`, releasing whatever the slot held before.
    pub fn set_tensor(&mut self, handle: TensorHandle) {
        self.handle = Some(handle);
    }

    /// Returns a new reference to the held handle.
    pub fn tensor(&self) -> BridgeResult<TensorHandle> {
        Ok(self.handle()?.clone())
    }

    pub fn is_defined(&self) -> bool {
        self.handle.is_some()
    }

    fn handle(&self) -> BridgeResult<&TensorHandle> {
        self.handle
            .as_ref()
            .ok_or(BridgeError::Engine(EngineError::UndefinedTensor))
    }

    /// Getter for `data`: a fresh host buffer with every element in row-major order.
    pub fn data(&self) -> BridgeResult<Vec<f32>> {
        let _no_grad = grad_mode::no_grad();
        let handle = self.handle()?;
        Ok(marshal::read_buffer(handle)?)
    }

    /// Setter for `data` from an already typed buffer.
    pub fn set_data(&mut self, values: &[f32]) -> BridgeResult<()> {
        let _no_grad = grad_mode::no_grad();
        let handle = self.handle()?;
        let expected = handle.numel();
        if values.len() != expected {
            return Err(BridgeError::type_mismatch(format!(
                "data has {} elements but the tensor holds {expected}",
                values.len()
            )));
        }
        marshal::write_buffer(handle, values)?;
        Ok(())
    }

    /// Setter for `data` from an arbitrary host value.
    pub fn assign_data(&mut self, value: &HostValue) -> BridgeResult<()> {
        let values = value.as_f32_slice().ok_or_else(|| {
            BridgeError::type_mismatch(format!(
                "expected value to be a Float32Array, got {}",
                value.kind()
            ))
        })?;
        self.set_data(values)
    }

    /// Getter for `sizes`: one extent per dimension, in dimension order.
    pub fn sizes(&self) -> BridgeResult<Vec<usize>> {
        let _no_grad = grad_mode::no_grad();
        Ok(self.handle()?.shape().dims().to_vec())
    }

    /// Getter for `type`: `"<dtype>_<device>"`, e.g. `"float_cpu"`.
    pub fn type_name(&self) -> BridgeResult<String> {
        let _no_grad = grad_mode::no_grad();
        let handle = self.handle()?;
        Ok(format!("{}_{}", handle.dtype(), handle.device()))
    }

    pub fn dtype(&self) -> BridgeResult<DType> {
        Ok(self.handle()?.dtype())
    }

    pub fn device(&self) -> BridgeResult<Device> {
        Ok(self.handle()?.device())
    }

    pub fn requires_grad(&self) -> BridgeResult<bool> {
        Ok(self.handle()?.requires_grad())
    }

    /// Moves the tensor to the configured accelerator.
    pub fn cuda(&mut self) -> BridgeResult<()> {
        self.to_device(config::global().accelerator_device())
    }

    /// Moves the tensor back to host memory.
    pub fn cpu(&mut self) -> BridgeResult<()> {
        self.to_device(Device::Cpu)
    }

    /// Replaces the held handle with its transfer to `device`. On failure the
    /// held handle is left untouched.
    pub fn to_device(&mut self, device: Device) -> BridgeResult<()> {
        let _no_grad = grad_mode::no_grad();
        let moved = {
            let handle = self.handle()?;
            if handle.device() == device {
                return Ok(());
            }
            tracing::debug!(from = %handle.device(), to = %device, "transferring tensor");
            handle.to_device(device)?
        };
        self.handle = Some(moved);
        Ok(())
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let _no_grad = grad_mode::no_grad();
        match &self.handle {
            Some(handle) => write!(
                f,
                "Tensor[Type={}_{}, Size={}]",
                handle.dtype(),
                handle.device(),
                handle.shape()
            ),
            None => f.write_str("Tensor[undefined]"),
        }
    }
}

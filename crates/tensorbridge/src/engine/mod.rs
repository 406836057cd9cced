//! Seam between bridge objects and the native tensor engine.
//!
//! Engines own storage; the bridge only ever sees [`TensorHandle`]s. A handle is a
//! shared reference to one native tensor: cloning it never copies storage, and
//! dropping the last clone is what lets the engine release the tensor.

#[cfg(feature = "libtorch")]
pub mod libtorch;
pub mod registry;

use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::error::EngineResult;
use crate::tensor::{DType, Device, Shape};

/// Allocation options for engine factory calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TensorOptions {
    pub dtype: DType,
    pub device: Device,
    pub requires_grad: bool,
}

impl TensorOptions {
    pub fn device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    pub fn requires_grad(mut self, requires_grad: bool) -> Self {
        self.requires_grad = requires_grad;
        self
    }
}

/// Entry points of a native engine that do not need an existing tensor.
pub trait TensorEngine: Send + Sync {
    /// Human-readable engine identifier (e.g. `"ref-cpu"`, `"libtorch"`).
    fn engine_name(&self) -> &str;

    /// Whether transfers to an accelerator device can succeed.
    fn accelerator_available(&self) -> bool;

    /// Allocates a tensor of shape `dims` with every element set to `value`.
    ///
    /// Extents are signed so that negative requests reach the engine's own shape
    /// validation instead of wrapping.
    fn full(&self, dims: &[i64], value: f32, options: TensorOptions)
        -> EngineResult<TensorHandle>;
}

/// One native tensor as seen through a handle.
///
/// Methods that produce a tensor return a new handle; whether that handle shares
/// storage with `self` is engine policy, observable through
/// [`NativeTensor::shares_storage`].
pub trait NativeTensor: Send + Sync + fmt::Debug {
    fn shape(&self) -> Shape;
    fn dtype(&self) -> DType;
    fn device(&self) -> Device;
    fn requires_grad(&self) -> bool;
    fn is_contiguous(&self) -> bool;

    /// Returns a densely packed row-major tensor with the same values. Already
    /// contiguous tensors come back sharing storage.
    fn contiguous(&self) -> EngineResult<TensorHandle>;

    /// Returns the tensor on `device`. Transfers to the current device share storage.
    fn to_device(&self, device: Device) -> EngineResult<TensorHandle>;

    /// Strided view with two dimensions swapped. Always shares storage.
    fn transpose(&self, dim0: usize, dim1: usize) -> EngineResult<TensorHandle>;

    /// Whether `other` is backed by the same allocation.
    fn shares_storage(&self, other: &dyn NativeTensor) -> bool;

    /// Lends the element slice of a host-resident contiguous tensor.
    fn read_elements(&self, visit: &mut dyn FnMut(&[f32])) -> EngineResult<()>;

    /// Lends the mutable element slice of a host-resident contiguous tensor.
    fn write_elements(&self, fill: &mut dyn FnMut(&mut [f32])) -> EngineResult<()>;

    /// Overwrites this tensor's storage in place with the values of `src`,
    /// regardless of either tensor's layout or device.
    fn copy_from(&self, src: &dyn NativeTensor) -> EngineResult<()>;

    fn as_any(&self) -> &dyn Any;
}

/// Shared-ownership reference to a native tensor.
#[derive(Clone)]
pub struct TensorHandle {
    inner: Arc<dyn NativeTensor>,
}

impl TensorHandle {
    pub fn new<T: NativeTensor + 'static>(tensor: T) -> Self {
        TensorHandle {
            inner: Arc::new(tensor),
        }
    }

    /// Total element count (product of the shape extents).
    pub fn numel(&self) -> usize {
        self.inner.shape().num_elements()
    }

    /// Number of live handles referring to this tensor.
    pub fn reference_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Whether both handles refer to the same native tensor object.
    pub fn same_tensor(&self, other: &TensorHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn downcast_ref<T: NativeTensor + 'static>(&self) -> Option<&T> {
        self.inner.as_any().downcast_ref::<T>()
    }
}

impl Deref for TensorHandle {
    type Target = dyn NativeTensor;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl fmt::Debug for TensorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.inner.as_ref(), f)
    }
}

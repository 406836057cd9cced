//! Element-wise copies between native storage and flat host buffers.
//!
//! This is the only code that touches raw engine elements. Both directions go
//! through a host-resident contiguous staging handle that lives only for the
//! duration of the copy.

use crate::engine::TensorHandle;
use crate::error::{EngineError, EngineResult};
use crate::tensor::Device;

/// Host-resident, contiguous handle with the same values as `handle`.
///
/// Shares storage with `handle` when it already qualifies; otherwise the engine
/// allocates a temporary.
fn stage_on_host(handle: &TensorHandle) -> EngineResult<TensorHandle> {
    let hosted = if handle.device().is_host() {
        handle.clone()
    } else {
        tracing::debug!(device = %handle.device(), "staging tensor on host for marshalling");
        handle.to_device(Device::Cpu)?
    };
    if hosted.is_contiguous() {
        Ok(hosted)
    } else {
        hosted.contiguous()
    }
}

/// Copies every element of `handle`, in row-major order, into a new buffer.
pub fn read_buffer(handle: &TensorHandle) -> EngineResult<Vec<f32>> {
    let staged = stage_on_host(handle)?;
    let mut buffer = vec![0.0f32; staged.numel()];
    staged.read_elements(&mut |src| {
        for (dst, value) in buffer.iter_mut().zip(src) {
            *dst = *value;
        }
    })?;
    Ok(buffer)
}

/// Copies `src` element-for-element into the storage of `handle`.
///
/// The write always lands in `handle`'s own storage: when staging had to allocate
/// a temporary, the temporary is copied back in place.
pub fn write_buffer(handle: &TensorHandle, src: &[f32]) -> EngineResult<()> {
    let expected = handle.numel();
    if src.len() != expected {
        return Err(EngineError::ElementCountMismatch {
            expected,
            found: src.len(),
        });
    }

    let staged = stage_on_host(handle)?;
    staged.write_elements(&mut |dst| {
        for (slot, value) in dst.iter_mut().zip(src) {
            *slot = *value;
        }
    })?;

    if !staged.shares_storage(&**handle) {
        tracing::debug!("copying staged buffer back into tensor storage");
        handle.copy_from(&*staged)?;
    }
    Ok(())
}

//! Metadata types describing native tensors at the bridge boundary.
//!
//! Shapes, dtypes and devices are plain values: they are snapshots read out of a
//! native handle and never alias engine state.

pub mod device;
pub mod dtype;
pub mod shape;

pub use device::Device;
pub use dtype::DType;
pub use shape::Shape;

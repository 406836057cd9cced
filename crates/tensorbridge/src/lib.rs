//! Bridges a host scripting runtime to a native tensor engine.
//!
//! A [`Tensor`] is the script-visible object; it holds one shared
//! [`engine::TensorHandle`] and exposes `data`, `sizes`, `type`, `cuda()`, `cpu()`
//! and `toString()`. [`factory::ones`] and [`factory::zeros`] are the sanctioned
//! ways to create one. Engines plug in through [`engine::TensorEngine`] and the
//! [`engine::registry`].

pub mod bridge;
pub mod config;
pub mod engine;
pub mod error;
pub mod factory;
pub mod grad_mode;
pub mod host;
pub mod marshal;
pub mod tensor;

pub use bridge::{Invocation, Tensor};
pub use config::BridgeConfig;
pub use engine::{NativeTensor, TensorEngine, TensorHandle, TensorOptions};
pub use error::{BridgeError, BridgeResult, ConfigError, EngineError, EngineResult};
pub use host::HostValue;
pub use tensor::{DType, Device, Shape};

#![allow(clippy::useless_conversion)]

use pyo3::prelude::*;

mod engine;
mod errors;
mod factory;
mod host;
mod tensor;

pub use tensor::PyTensor;

/// Populates `m` with the bridge's classes, functions and exception types.
pub fn init_module(m: &Bound<'_, PyModule>) -> PyResult<()> {
    tensorbridge_backend_ref_cpu::register_ref_engine();
    #[cfg(feature = "libtorch")]
    tensorbridge::engine::libtorch::register_torch_engine();
    tracing::debug!(
        engines = ?tensorbridge::engine::registry::list_engines(),
        "initializing python module"
    );

    // Core types
    m.add_class::<tensor::PyTensor>()?;

    // Factory functions
    m.add_function(wrap_pyfunction!(factory::ones, m)?)?;
    m.add_function(wrap_pyfunction!(factory::zeros, m)?)?;

    // Engine management
    m.add_function(wrap_pyfunction!(engine::set_engine, m)?)?;
    m.add_function(wrap_pyfunction!(engine::get_engine, m)?)?;
    m.add_function(wrap_pyfunction!(engine::list_engines, m)?)?;

    errors::add_exceptions(m)?;
    Ok(())
}

#[pymodule]
fn _native(m: &Bound<'_, PyModule>) -> PyResult<()> {
    init_module(m)
}

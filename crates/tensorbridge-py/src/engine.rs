use pyo3::prelude::*;
use tensorbridge::engine::registry;

use crate::errors::map_bridge_err;

/// Select the engine used by subsequent `ones`/`zeros` calls.
/// Existing tensors keep the handles they already hold.
#[pyfunction]
pub fn set_engine(name: &str) -> PyResult<()> {
    registry::select_engine(name).map_err(|err| {
        tracing::warn!(engine = name, %err, "engine selection failed");
        map_bridge_err(err)
    })
}

/// Get the current engine name
#[pyfunction]
pub fn get_engine() -> String {
    registry::current_engine_name()
}

/// List all available engines
#[pyfunction]
pub fn list_engines() -> Vec<String> {
    registry::list_engines()
}

use pyo3::prelude::*;
use pyo3::types::PyTuple;
use tensorbridge::engine::registry;
use tensorbridge::{BridgeResult, HostValue, Tensor, TensorEngine};

use crate::errors::map_bridge_err;
use crate::host::host_value;
use crate::tensor::PyTensor;

type Factory = fn(&dyn TensorEngine, &[HostValue]) -> BridgeResult<Tensor>;

fn call_factory(factory: Factory, args: &Bound<'_, PyTuple>) -> PyResult<PyTensor> {
    let values = args
        .iter()
        .map(|arg| host_value(&arg))
        .collect::<PyResult<Vec<_>>>()?;
    let engine = registry::current_engine().map_err(map_bridge_err)?;
    factory(engine.as_ref(), &values)
        .map(PyTensor::from)
        .map_err(map_bridge_err)
}

/// ones(shape, requires_grad) -> Tensor filled with 1.0
#[pyfunction]
#[pyo3(signature = (*args))]
pub fn ones(args: &Bound<'_, PyTuple>) -> PyResult<PyTensor> {
    call_factory(tensorbridge::factory::ones, args)
}

/// zeros(shape, requires_grad) -> Tensor filled with 0.0
#[pyfunction]
#[pyo3(signature = (*args))]
pub fn zeros(args: &Bound<'_, PyTuple>) -> PyResult<PyTensor> {
    call_factory(tensorbridge::factory::zeros, args)
}

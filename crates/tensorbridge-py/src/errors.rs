use pyo3::prelude::*;
use tensorbridge::BridgeError;

pyo3::create_exception!(tensorbridge, TensorBridgeError, pyo3::exceptions::PyException);
pyo3::create_exception!(tensorbridge, InvalidInvocationError, TensorBridgeError);
pyo3::create_exception!(tensorbridge, ArityError, TensorBridgeError);
pyo3::create_exception!(tensorbridge, TypeMismatchError, TensorBridgeError);
pyo3::create_exception!(tensorbridge, EngineError, TensorBridgeError);

pub(crate) fn map_bridge_err(err: BridgeError) -> PyErr {
    match err {
        BridgeError::InvalidInvocation(_) => InvalidInvocationError::new_err(err.to_string()),
        BridgeError::Arity { .. } => ArityError::new_err(err.to_string()),
        BridgeError::TypeMismatch(_) => TypeMismatchError::new_err(err.to_string()),
        BridgeError::Engine(_) => EngineError::new_err(err.to_string()),
        BridgeError::UnknownEngine { .. } => {
            pyo3::exceptions::PyValueError::new_err(err.to_string())
        }
        BridgeError::Config(_) => TensorBridgeError::new_err(err.to_string()),
    }
}

pub(crate) fn add_exceptions(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let py = m.py();
    m.add("TensorBridgeError", py.get_type_bound::<TensorBridgeError>())?;
    m.add(
        "InvalidInvocationError",
        py.get_type_bound::<InvalidInvocationError>(),
    )?;
    m.add("ArityError", py.get_type_bound::<ArityError>())?;
    m.add("TypeMismatchError", py.get_type_bound::<TypeMismatchError>())?;
    m.add("EngineError", py.get_type_bound::<EngineError>())?;
    Ok(())
}

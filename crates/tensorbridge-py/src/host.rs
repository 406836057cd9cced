use numpy::{PyArrayDyn, PyArrayMethods};
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyFloat, PyInt, PyList, PyString, PyTuple};
use tensorbridge::HostValue;

/// Converts a Python object into the bridge's host value model.
///
/// `bool` is checked before `int` because Python booleans are integers.
pub(crate) fn host_value(value: &Bound<'_, PyAny>) -> PyResult<HostValue> {
    if value.is_none() {
        return Ok(HostValue::Null);
    }
    if let Ok(flag) = value.downcast::<PyBool>() {
        return Ok(HostValue::Bool(flag.is_true()));
    }
    if value.is_instance_of::<PyInt>() || value.is_instance_of::<PyFloat>() {
        return Ok(HostValue::Number(value.extract::<f64>()?));
    }
    if value.is_instance_of::<PyString>() {
        return Ok(HostValue::String(value.extract::<String>()?));
    }
    if let Ok(array) = value.downcast::<PyArrayDyn<f32>>() {
        let readonly = array.readonly();
        return Ok(HostValue::Float32Array(
            readonly.as_array().iter().copied().collect(),
        ));
    }
    if let Ok(list) = value.downcast::<PyList>() {
        return list
            .iter()
            .map(|item| host_value(&item))
            .collect::<PyResult<Vec<_>>>()
            .map(HostValue::Array);
    }
    if let Ok(tuple) = value.downcast::<PyTuple>() {
        return tuple
            .iter()
            .map(|item| host_value(&item))
            .collect::<PyResult<Vec<_>>>()
            .map(HostValue::Array);
    }
    // Integer-like objects outside `int`, e.g. numpy integer scalars.
    if let Ok(index) = value.call_method0("__index__") {
        if let Ok(integer) = index.extract::<i64>() {
            return Ok(HostValue::Number(integer as f64));
        }
    }
    Ok(HostValue::Object(value.get_type().name()?.to_string()))
}

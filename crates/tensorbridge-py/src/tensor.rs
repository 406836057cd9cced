use numpy::PyArray1;
use pyo3::prelude::*;
use tensorbridge::{Invocation, Tensor};

use crate::errors::map_bridge_err;
use crate::host::host_value;

/// Python-exposed tensor bridge object.
/// Holds one shared native handle; only `ones`/`zeros` create instances.
#[pyclass(name = "Tensor", module = "tensorbridge")]
pub struct PyTensor {
    inner: Tensor,
}

impl From<Tensor> for PyTensor {
    fn from(inner: Tensor) -> Self {
        PyTensor { inner }
    }
}

#[pymethods]
impl PyTensor {
    /// Direct construction is not a sanctioned path.
    #[new]
    fn new() -> PyResult<Self> {
        Tensor::construct(Invocation::Direct)
            .map(PyTensor::from)
            .map_err(map_bridge_err)
    }

    /// Element values as a fresh 1-D float32 numpy array (always copies)
    #[getter]
    fn data<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyArray1<f32>>> {
        let values = self.inner.data().map_err(map_bridge_err)?;
        Ok(PyArray1::from_vec_bound(py, values))
    }

    /// Overwrite every element from a float32 numpy array of matching size
    #[setter]
    fn set_data(&mut self, value: &Bound<'_, PyAny>) -> PyResult<()> {
        let value = host_value(value)?;
        self.inner.assign_data(&value).map_err(map_bridge_err)
    }

    #[getter]
    fn sizes(&self) -> PyResult<Vec<usize>> {
        self.inner.sizes().map_err(map_bridge_err)
    }

    #[getter]
    fn r#type(&self) -> PyResult<String> {
        self.inner.type_name().map_err(map_bridge_err)
    }

    #[getter]
    fn requires_grad(&self) -> PyResult<bool> {
        self.inner.requires_grad().map_err(map_bridge_err)
    }

    #[getter]
    fn device(&self) -> PyResult<String> {
        self.inner
            .device()
            .map(|device| device.to_string())
            .map_err(map_bridge_err)
    }

    fn cuda(&mut self) -> PyResult<()> {
        self.inner.cuda().map_err(map_bridge_err)
    }

    fn cpu(&mut self) -> PyResult<()> {
        self.inner.cpu().map_err(map_bridge_err)
    }

    #[pyo3(name = "toString")]
    fn display(&self) -> String {
        self.inner.to_string()
    }

    fn __str__(&self) -> String {
        self.inner.to_string()
    }

    fn __repr__(&self) -> String {
        self.inner.to_string()
    }
}

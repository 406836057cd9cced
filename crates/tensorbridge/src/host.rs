//! Dynamically typed values as they arrive from the host scripting runtime.
//!
//! Host adapters translate their native objects into [`HostValue`] so argument
//! validation happens once, in Rust, with the same error taxonomy for every host.

/// A script value crossing the bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<HostValue>),
    /// Flat 32-bit float buffer owned by the host.
    Float32Array(Vec<f32>),
    /// Any other host object, carried by its type name for diagnostics.
    Object(String),
}

impl HostValue {
    /// Short type name used in error messages.
    pub fn kind(&self) -> &str {
        match self {
            HostValue::Undefined => "undefined",
            HostValue::Null => "null",
            HostValue::Bool(_) => "boolean",
            HostValue::Number(_) => "number",
            HostValue::String(_) => "string",
            HostValue::Array(_) => "array",
            HostValue::Float32Array(_) => "Float32Array",
            HostValue::Object(name) => name.as_str(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HostValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[HostValue]> {
        match self {
            HostValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_f32_slice(&self) -> Option<&[f32]> {
        match self {
            HostValue::Float32Array(values) => Some(values),
            _ => None,
        }
    }

    /// Integral value of a finite number, if it is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            HostValue::Number(n)
                if n.is_finite()
                    && n.fract() == 0.0
                    && *n >= i64::MIN as f64
                    && *n <= i64::MAX as f64 =>
            {
                Some(*n as i64)
            }
            _ => None,
        }
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        HostValue::Bool(value)
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        HostValue::Number(value)
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        HostValue::String(value.to_string())
    }
}

impl From<Vec<f32>> for HostValue {
    fn from(values: Vec<f32>) -> Self {
        HostValue::Float32Array(values)
    }
}

impl<const N: usize> From<[i64; N]> for HostValue {
    fn from(dims: [i64; N]) -> Self {
        HostValue::Array(dims.iter().map(|&d| HostValue::Number(d as f64)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_must_be_whole_and_finite() {
        assert_eq!(HostValue::Number(3.0).as_integer(), Some(3));
        assert_eq!(HostValue::Number(-2.0).as_integer(), Some(-2));
        assert_eq!(HostValue::Number(2.5).as_integer(), None);
        assert_eq!(HostValue::Number(f64::NAN).as_integer(), None);
        assert_eq!(HostValue::Bool(true).as_integer(), None);
    }

    #[test]
    fn shape_literals_become_arrays() {
        let value = HostValue::from([2, 3]);
        assert_eq!(
            value.as_array(),
            Some(&[HostValue::Number(2.0), HostValue::Number(3.0)][..])
        );
        assert_eq!(value.kind(), "array");
    }
}

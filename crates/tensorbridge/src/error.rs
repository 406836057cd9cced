//! Error taxonomy for the bridge and the engines behind it.

use thiserror::Error;

use crate::tensor::Device;

/// Failure raised by a native tensor engine. Propagated unmodified by the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("negative dimension {dim} at index {index}")]
    NegativeDimension { index: usize, dim: i64 },
    #[error("tensor is undefined")]
    UndefinedTensor,
    #[error("raw element access requires a contiguous tensor")]
    NotContiguous,
    #[error("raw element access requires host storage, tensor lives on {0}")]
    NotHostResident(Device),
    #[error("accelerator device {0} is not available")]
    AcceleratorUnavailable(Device),
    #[error("dimension {dim} out of range for tensor of rank {rank}")]
    DimensionOutOfRange { dim: usize, rank: usize },
    #[error("element count mismatch: tensor holds {expected} elements, got {found}")]
    ElementCountMismatch { expected: usize, found: usize },
    #[error("a leaf tensor that requires grad cannot be written in place while grad mode is enabled")]
    InPlaceOnLeaf,
    #[error("engine failure: {0}")]
    Backend(String),
}

impl EngineError {
    pub fn backend(message: impl Into<String>) -> Self {
        EngineError::Backend(message.into())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Configuration could not be read or parsed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// Errors surfaced at the script boundary.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Construction attempted outside the sanctioned factory path.
    #[error("invalid invocation: {0}")]
    InvalidInvocation(String),
    /// Fewer arguments than the callee requires.
    #[error("{function}: expected {expected} arguments, got {found}")]
    Arity {
        function: &'static str,
        expected: usize,
        found: usize,
    },
    /// An argument or assigned value has the wrong type or size.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    #[error("no tensor engine named '{name}' (available: {available})")]
    UnknownEngine { name: String, available: String },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl BridgeError {
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        BridgeError::TypeMismatch(message.into())
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;

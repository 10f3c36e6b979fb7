//! Error types for specification building, differentiation and emission.

use std::path::PathBuf;

use symc_ir::{MissingCapability, ShapeError};
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = CodegenError> = std::result::Result<T, E>;

/// Top-level failure of a codegen operation.
#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("contract violation: {0}")]
    ContractViolation(#[from] ContractViolation),

    #[error("type `{type_name}` is missing the `{operation}` operation")]
    CapabilityMissing {
        type_name: String,
        operation: &'static str,
    },

    #[error("unsupported backend `{0}`")]
    UnsupportedBackend(String),

    #[error("type `{type_name}` is already registered in namespace `{namespace}` with a different structure")]
    TypeConflict { type_name: String, namespace: String },

    #[error("i/o error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid backend configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Shape(#[from] ShapeError),
}

impl From<MissingCapability> for CodegenError {
    fn from(err: MissingCapability) -> Self {
        CodegenError::CapabilityMissing {
            type_name: err.type_name,
            operation: err.operation,
        }
    }
}

impl CodegenError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CodegenError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A broken invariant of a codegen specification or transformation request.
///
/// Every variant is detected before any differentiation or file output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    #[error("outputs depend on symbols missing from inputs: {}", .symbols.join(", "))]
    UndeclaredSymbols { symbols: Vec<String> },

    #[error("`{key}` is not a valid identifier")]
    InvalidIdentifier { key: String },

    #[error("input `{key}` has a non-symbol storage slot `{expr}`")]
    NonSymbolInput { key: String, expr: String },

    #[error("input symbols must be unique, duplicated: {}", .symbols.join(", "))]
    DuplicateInputSymbols { symbols: Vec<String> },

    #[error("keys used as both input and output: {}", .keys.join(", "))]
    OverlappingKeys { keys: Vec<String> },

    #[error("sequence `{key}` is empty")]
    EmptySequence { key: String },

    #[error("sequence `{key}` mixes element types")]
    HeterogeneousSequence { key: String },

    #[error("return key `{key}` is not an output")]
    UnknownReturnKey { key: String },

    #[error("sparse output `{key}` is not an output")]
    UnknownSparseKey { key: String },

    #[error("sparse output `{key}` is not a matrix")]
    SparseOutputNotMatrix { key: String },

    #[error("a name is required; set one at construction or when deriving")]
    MissingName,

    #[error("cannot differentiate with respect to zero arguments")]
    NoArguments,

    #[error("`{name}` is not an input argument")]
    UnknownArgument { name: String },

    #[error("expected exactly one output, found {count}")]
    NotSingleOutput { count: usize },

    #[error("output `{key}` must be a column vector for a full linearization")]
    ResultNotVector { key: String },

    #[error("result indices must be strictly ascending: {indices:?}")]
    UnsortedResults { indices: Vec<usize> },

    #[error("result index {index} out of range for {count} outputs")]
    ResultIndexOutOfRange { index: usize, count: usize },

    #[error("custom jacobian has shape {actual:?}, expected {expected:?}")]
    CustomJacobianShape {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("a function with several return values needs output names")]
    MissingOutputNames,

    #[error("{names} output names given for {values} return values")]
    OutputNameCount { names: usize, values: usize },
}

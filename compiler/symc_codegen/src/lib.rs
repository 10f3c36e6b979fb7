//! Symc Codegen - from symbolic contracts to generated source
//!
//! This crate takes a validated mapping from symbolic inputs to symbolic
//! outputs and turns it into backend source code:
//!
//! - `Codegen`: the immutable, validated specification
//! - `with_linearization` / `with_jacobians`: tangent-space derivative
//!   transformations producing new specifications
//! - `CscFormat`: static sparsity layout of symbolic matrices
//! - `generate`: composite type discovery, shared-type deduplication and
//!   template emission for the C++ and Python backends
//!
//! # Pipeline
//!
//! ```text
//! Values ──► CodegenBuilder::build ──► Codegen ──► with_* ──► Codegen
//!                                                              │
//!                       SharedTypes ◄──► generate ◄────────────┘
//!                                           │
//!                                           ▼
//!                                     GenerateReport
//! ```

mod config;
mod derivatives;
pub mod docstring;
mod emit;
mod error;
mod jacobian;
mod sparse;
mod spec;
mod types;

pub use config::{BackendConfig, CppConfig, PythonConfig, RenderOptions};
pub use derivatives::{JacobianOptions, LinearizationMode, LinearizationOptions, SparseSelection};
pub use docstring::{DocEntry, Docstring};
pub use emit::{GenerateOptions, GenerateReport};
pub use error::{CodegenError, ContractViolation, Result};
pub use jacobian::tangent_jacobians;
pub use sparse::{should_set_zero, CscFormat};
pub use spec::{Args, Codegen, CodegenBuilder, FunctionBuilder, FunctionOutput, InputType};
pub use types::{CompositeType, EmissionContext, Field, FieldKind, SharedType, SharedTypes};

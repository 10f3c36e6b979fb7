//! Specifications built from Rust closures.
//!
//! Declared parameters become fresh symbolic inputs named after the
//! parameter, the closure is called on them and its result becomes the
//! outputs:
//!
//! ```text
//! Codegen::function("pose_prior_residual", config)
//!     .arg("pose", InputType::Pose3)
//!     .arg("target", InputType::Pose3)
//!     .build(|args| { ... Ok(FunctionOutput::Single(residual.into())) })
//! ```

use symc_ir::{DualQuaternion, Expr, Matrix, Pose3, Quaternion, Rot3, Value, Values};
use tracing::{info, warn};

use super::{Codegen, CodegenBuilder};
use crate::config::BackendConfig;
use crate::docstring::Docstring;
use crate::error::{CodegenError, ContractViolation, Result};

/// Type of a declared function parameter.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InputType {
    Scalar,
    Matrix { rows: usize, cols: usize },
    Rot3,
    Pose3,
    Quaternion,
    DualQuaternion,
}

impl InputType {
    /// Column vector of `n` entries.
    pub const fn vector(n: usize) -> Self {
        InputType::Matrix { rows: n, cols: 1 }
    }

    /// Fresh symbolic value named after the parameter.
    fn symbolic(self, name: &str) -> Value {
        match self {
            InputType::Scalar => Value::Scalar(Expr::symbol(name)),
            InputType::Matrix { rows, cols } => Value::Matrix(Matrix::symbolic(name, rows, cols)),
            InputType::Rot3 => Value::Rot3(Rot3::symbolic(name)),
            InputType::Pose3 => Value::Pose3(Pose3::symbolic(name)),
            InputType::Quaternion => Value::Quaternion(Quaternion::symbolic(name)),
            InputType::DualQuaternion => Value::DualQuaternion(DualQuaternion::symbolic(name)),
        }
    }
}

/// What a function closure returns.
#[derive(Clone, Debug)]
pub enum FunctionOutput {
    /// One output value.
    Single(Value),
    /// Several outputs, named by [`FunctionBuilder::output_names`].
    Tuple(Vec<Value>),
    /// A plain list of expressions, emitted as one column matrix.
    Sequence(Vec<Expr>),
}

/// Typed view of the symbolic arguments handed to a function closure.
#[derive(Debug)]
pub struct Args<'a> {
    values: &'a Values,
}

impl<'a> Args<'a> {
    pub fn get(&self, name: &str) -> Result<&'a Value> {
        self.values.get(name).ok_or_else(|| unknown(name))
    }

    pub fn scalar(&self, name: &str) -> Result<&'a Expr> {
        match self.get(name)? {
            Value::Scalar(e) => Ok(e),
            _ => Err(unknown(name)),
        }
    }

    pub fn matrix(&self, name: &str) -> Result<&'a Matrix> {
        self.get(name)?.as_matrix().ok_or_else(|| unknown(name))
    }

    pub fn rot3(&self, name: &str) -> Result<&'a Rot3> {
        match self.get(name)? {
            Value::Rot3(r) => Ok(r),
            _ => Err(unknown(name)),
        }
    }

    pub fn pose3(&self, name: &str) -> Result<&'a Pose3> {
        match self.get(name)? {
            Value::Pose3(p) => Ok(p),
            _ => Err(unknown(name)),
        }
    }

    pub fn quaternion(&self, name: &str) -> Result<&'a Quaternion> {
        match self.get(name)? {
            Value::Quaternion(q) => Ok(q),
            _ => Err(unknown(name)),
        }
    }
}

fn unknown(name: &str) -> CodegenError {
    ContractViolation::UnknownArgument { name: name.to_owned() }.into()
}

/// Builder returned by [`Codegen::function`].
#[derive(Debug)]
pub struct FunctionBuilder {
    name: String,
    config: BackendConfig,
    inputs: Values,
    output_names: Option<Vec<String>>,
    return_key: Option<String>,
    sparse_outputs: Vec<String>,
    docstring: Option<String>,
}

impl FunctionBuilder {
    pub(super) fn new(name: impl Into<String>, config: BackendConfig) -> Self {
        FunctionBuilder {
            name: name.into(),
            config,
            inputs: Values::new(),
            output_names: None,
            return_key: None,
            sparse_outputs: Vec::new(),
            docstring: None,
        }
    }

    /// Declare a parameter with a fresh symbolic value.
    #[must_use]
    pub fn arg(mut self, name: impl Into<String>, ty: InputType) -> Self {
        let name = name.into();
        let value = ty.symbolic(&name);
        self.inputs.insert(name, value);
        self
    }

    /// Declare a parameter with an explicit symbolic value, for aggregates
    /// and sequences that have no [`InputType`].
    #[must_use]
    pub fn arg_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inputs.insert(name, value);
        self
    }

    #[must_use]
    pub fn output_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn return_key(mut self, key: impl Into<String>) -> Self {
        self.return_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn sparse_outputs<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sparse_outputs = keys.into_iter().map(Into::into).collect();
        self
    }

    /// User docstring, dedented before parsing.
    #[must_use]
    pub fn docstring(mut self, text: impl Into<String>) -> Self {
        self.docstring = Some(text.into());
        self
    }

    /// Call `body` on the symbolic arguments and build the specification.
    pub fn build<F>(self, body: F) -> Result<Codegen>
    where
        F: FnOnce(&Args<'_>) -> Result<FunctionOutput>,
    {
        let output = body(&Args {
            values: &self.inputs,
        })?;

        let values = match output {
            FunctionOutput::Single(value) => vec![value],
            FunctionOutput::Sequence(exprs) => vec![Value::Matrix(Matrix::column(exprs))],
            FunctionOutput::Tuple(values) => {
                if self.output_names.is_none() {
                    return Err(ContractViolation::MissingOutputNames.into());
                }
                values
            }
        };

        // An unnamed single output is always `res`, and is what gets returned.
        let (names, return_key) = match self.output_names {
            Some(names) => (names, self.return_key),
            None => {
                if let Some(key) = self.return_key.as_deref().filter(|key| *key != "res") {
                    warn!(name = %self.name, key, "unnamed output is returned as `res`");
                }
                (vec!["res".to_owned()], Some("res".to_owned()))
            }
        };
        if names.len() != values.len() {
            return Err(ContractViolation::OutputNameCount {
                names: names.len(),
                values: values.len(),
            }
            .into());
        }
        if let Some(key) = &return_key {
            if !names.contains(key) {
                return Err(ContractViolation::UnknownReturnKey { key: key.clone() }.into());
            }
        }

        let outputs: Values = names.into_iter().zip(values).collect();
        let docstring = match &self.docstring {
            Some(text) => Docstring::parse(text, outputs.keys()),
            None => Docstring::from_function(&self.name, &self.inputs, &outputs),
        };

        info!(
            name = %self.name,
            inputs = self.inputs.len(),
            outputs = outputs.len(),
            "created codegen function"
        );

        CodegenBuilder::new(self.inputs, outputs, self.config)
            .name(self.name)
            .optional_return_key(return_key)
            .sparse_outputs(self.sparse_outputs)
            .structured_docstring(docstring)
            .build()
    }
}

//! Codegen specifications.
//!
//! A [`Codegen`] is a validated mapping from named symbolic inputs to named
//! symbolic outputs together with everything emission needs: a name, a
//! return key, the sparse outputs and their layouts, the docstring and the
//! backend configuration. Specifications are immutable; transformations
//! such as [`Codegen::with_linearization`] return new ones.

mod function;
mod validate;

use indexmap::IndexMap;
use symc_ir::{Value, Values};
use tracing::debug;

pub use function::{Args, FunctionBuilder, FunctionOutput, InputType};

use crate::config::BackendConfig;
use crate::docstring::Docstring;
use crate::error::{ContractViolation, Result};
use crate::sparse::CscFormat;

/// A validated codegen specification.
#[derive(Clone, Debug)]
pub struct Codegen {
    name: Option<String>,
    inputs: Values,
    outputs: Values,
    config: BackendConfig,
    return_key: Option<String>,
    sparse_outputs: IndexMap<String, CscFormat>,
    docstring: Docstring,
}

impl Codegen {
    /// Start building a specification from explicit inputs and outputs.
    pub fn builder(inputs: Values, outputs: Values, config: BackendConfig) -> CodegenBuilder {
        CodegenBuilder::new(inputs, outputs, config)
    }

    /// Start building a specification by calling a closure on fresh
    /// symbolic arguments.
    pub fn function(name: impl Into<String>, config: BackendConfig) -> FunctionBuilder {
        FunctionBuilder::new(name, config)
    }

    /// Docstring listing argument and output types.
    pub fn default_docstring(inputs: &Values, outputs: &Values) -> Docstring {
        Docstring::from_types(inputs, outputs)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn inputs(&self) -> &Values {
        &self.inputs
    }

    pub fn outputs(&self) -> &Values {
        &self.outputs
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub fn return_key(&self) -> Option<&str> {
        self.return_key.as_deref()
    }

    /// Sparse outputs in declaration order, with their layouts.
    pub fn sparse_outputs(&self) -> &IndexMap<String, CscFormat> {
        &self.sparse_outputs
    }

    pub fn is_sparse(&self, key: &str) -> bool {
        self.sparse_outputs.contains_key(key)
    }

    pub fn sparse_layout(&self, key: &str) -> Option<&CscFormat> {
        self.sparse_outputs.get(key)
    }

    pub fn docstring(&self) -> &Docstring {
        &self.docstring
    }

    /// The same specification under another configuration.
    #[must_use]
    pub fn with_config(&self, config: BackendConfig) -> Codegen {
        Codegen {
            config,
            ..self.clone()
        }
    }
}

#[derive(Debug)]
enum DocSource {
    Text(String),
    Structured(Docstring),
}

/// Builder for [`Codegen`]. Nothing is checked until [`CodegenBuilder::build`].
#[derive(Debug)]
pub struct CodegenBuilder {
    inputs: Values,
    outputs: Values,
    config: BackendConfig,
    name: Option<String>,
    return_key: Option<String>,
    sparse_outputs: Vec<String>,
    docstring: Option<DocSource>,
}

impl CodegenBuilder {
    pub fn new(inputs: Values, outputs: Values, config: BackendConfig) -> Self {
        CodegenBuilder {
            inputs,
            outputs,
            config,
            name: None,
            return_key: None,
            sparse_outputs: Vec::new(),
            docstring: None,
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
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

    /// User docstring. Entries under an `Outputs:` header are tagged with
    /// the output they document.
    #[must_use]
    pub fn docstring(mut self, text: impl Into<String>) -> Self {
        self.docstring = Some(DocSource::Text(text.into()));
        self
    }

    #[must_use]
    pub(crate) fn structured_docstring(mut self, docstring: Docstring) -> Self {
        self.docstring = Some(DocSource::Structured(docstring));
        self
    }

    #[must_use]
    pub(crate) fn optional_return_key(mut self, key: Option<String>) -> Self {
        self.return_key = key;
        self
    }

    /// Validate the contract and produce the specification.
    pub fn build(self) -> Result<Codegen> {
        validate::check_contract(&self.inputs, &self.outputs)?;

        if let Some(key) = &self.return_key {
            if !self.outputs.contains_key(key) {
                return Err(ContractViolation::UnknownReturnKey { key: key.clone() }.into());
            }
        }

        let mut sparse_outputs = IndexMap::with_capacity(self.sparse_outputs.len());
        for key in self.sparse_outputs {
            let layout = match self.outputs.get(&key) {
                None => return Err(ContractViolation::UnknownSparseKey { key }.into()),
                Some(Value::Matrix(matrix)) => CscFormat::from_matrix(matrix),
                Some(_) => return Err(ContractViolation::SparseOutputNotMatrix { key }.into()),
            };
            sparse_outputs.insert(key, layout);
        }

        let docstring = match self.docstring {
            Some(DocSource::Text(text)) => Docstring::parse(&text, self.outputs.keys()),
            Some(DocSource::Structured(doc)) => doc,
            None => Docstring::from_types(&self.inputs, &self.outputs),
        };

        debug!(
            name = self.name.as_deref().unwrap_or("<unnamed>"),
            inputs = self.inputs.len(),
            outputs = self.outputs.len(),
            sparse = sparse_outputs.len(),
            "built codegen specification"
        );

        Ok(Codegen {
            name: self.name,
            inputs: self.inputs,
            outputs: self.outputs,
            config: self.config,
            return_key: self.return_key,
            sparse_outputs,
            docstring,
        })
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;

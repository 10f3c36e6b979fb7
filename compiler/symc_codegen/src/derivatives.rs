//! Derivative transformations of a specification.
//!
//! Both transformations validate everything up front (argument names,
//! output counts, capabilities, shapes) and only then differentiate, so a
//! failed request never pays for symbolic work.

use symc_ir::{Matrix, Value, Values};
use tracing::{debug, instrument};

use crate::docstring::wrap_description;
use crate::error::{ContractViolation, Result};
use crate::jacobian::tangent_jacobians;
use crate::spec::{Codegen, CodegenBuilder};

/// Shape of a linearization.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LinearizationMode {
    /// Result and one stacked jacobian over all requested arguments.
    StackedJacobian,
    /// Result, jacobian, Gauss-Newton hessian (lower triangle) and rhs.
    #[default]
    FullLinearization,
}

/// Options of [`Codegen::with_linearization`].
#[derive(Clone, Debug)]
pub struct LinearizationOptions {
    /// Arguments to differentiate against, in this order. `None` means all
    /// inputs.
    pub which_args: Option<Vec<String>>,
    /// Keep the result among the outputs. Always kept in full mode.
    pub include_result: bool,
    /// Name of the new specification, derived from the source name if unset.
    pub name: Option<String>,
    pub mode: LinearizationMode,
    /// Emit `jacobian` and `hessian` as sparse matrices.
    pub sparse_linearization: bool,
    /// Use this jacobian instead of differentiating.
    pub custom_jacobian: Option<Matrix>,
}

impl Default for LinearizationOptions {
    fn default() -> Self {
        LinearizationOptions {
            which_args: None,
            include_result: true,
            name: None,
            mode: LinearizationMode::default(),
            sparse_linearization: false,
            custom_jacobian: None,
        }
    }
}

/// Which generated jacobians are emitted sparse.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SparseSelection {
    #[default]
    Dense,
    All,
    /// Only the named jacobian outputs.
    Only(Vec<String>),
}

/// Options of [`Codegen::with_jacobians`].
#[derive(Clone, Debug)]
pub struct JacobianOptions {
    pub which_args: Option<Vec<String>>,
    /// Indices of the outputs to differentiate, strictly ascending.
    pub which_results: Vec<usize>,
    /// Keep the differentiated outputs themselves.
    pub include_results: bool,
    pub name: Option<String>,
    pub sparse_jacobians: SparseSelection,
}

impl Default for JacobianOptions {
    fn default() -> Self {
        JacobianOptions {
            which_args: None,
            which_results: vec![0],
            include_results: true,
            name: None,
            sparse_jacobians: SparseSelection::Dense,
        }
    }
}

impl Codegen {
    /// Linearize the single output of this specification with respect to
    /// `which_args`.
    #[instrument(level = "debug", skip_all, fields(name = self.name().unwrap_or("<unnamed>")))]
    pub fn with_linearization(&self, options: LinearizationOptions) -> Result<Codegen> {
        let which_args = self.resolve_args(options.which_args.as_deref())?;
        if self.outputs().len() != 1 {
            return Err(ContractViolation::NotSingleOutput {
                count: self.outputs().len(),
            }
            .into());
        }
        let Some((result_name, result)) = self.outputs().get_index(0) else {
            return Err(ContractViolation::NotSingleOutput { count: 0 }.into());
        };
        let full = options.mode == LinearizationMode::FullLinearization;
        let residual = match result {
            Value::Matrix(m) if m.is_column_vector() => Some(m),
            _ if full => {
                return Err(ContractViolation::ResultNotVector {
                    key: result_name.to_owned(),
                }
                .into())
            }
            _ => None,
        };
        let name = match options.name {
            Some(name) => name,
            None => self.pick_name(&which_args, options.include_result, Some(options.mode))?,
        };

        let args = self.arg_values(&which_args);
        let result_dim = result.tangent_dim()?;
        let mut arg_dims = Vec::with_capacity(args.len());
        for (_, arg) in &args {
            arg_dims.push(arg.tangent_dim()?);
        }
        let total_dim: usize = arg_dims.iter().sum();
        if let Some(custom) = &options.custom_jacobian {
            if custom.shape() != (result_dim, total_dim) {
                return Err(ContractViolation::CustomJacobianShape {
                    expected: (result_dim, total_dim),
                    actual: custom.shape(),
                }
                .into());
            }
        }

        let jacobian = match options.custom_jacobian {
            Some(custom) => custom,
            None => Matrix::hstack(&tangent_jacobians(result, &args)?)?,
        };

        let render = self.config().render();
        let width = render
            .line_length
            .saturating_sub(render.doc_comment_line_prefix.chars().count());
        let arg_list = format_arg_list(&which_args, &arg_dims);

        let include_result = full || options.include_result;
        let mut outputs = Values::new();
        let mut docstring = self.docstring().clone();
        if include_result {
            outputs.insert(result_name, result.clone());
        } else {
            docstring.remove(result_name);
        }
        docstring.push(
            "jacobian",
            wrap_description(
                "    jacobian: ",
                &format!(
                    "({}x{}) jacobian of {result_name} wrt {arg_list}",
                    jacobian.rows(),
                    jacobian.cols()
                ),
                width,
            ),
        );

        let mut sparse = Vec::new();
        if options.sparse_linearization {
            sparse.push("jacobian".to_owned());
        }
        if let (true, Some(residual)) = (full, residual) {
            let hessian = jacobian.compute_ata(true);
            let rhs = jacobian.transpose().matmul(residual)?;
            docstring.push(
                "hessian",
                wrap_description(
                    "    hessian: ",
                    &format!(
                        "({0}x{0}) Gauss-Newton hessian for {arg_list}",
                        hessian.rows()
                    ),
                    width,
                ),
            );
            docstring.push(
                "rhs",
                wrap_description(
                    "    rhs: ",
                    &format!("({}x1) Gauss-Newton rhs for {arg_list}", rhs.rows()),
                    width,
                ),
            );
            outputs.insert("jacobian", jacobian);
            outputs.insert("hessian", hessian);
            outputs.insert("rhs", rhs);
            if options.sparse_linearization {
                sparse.push("hessian".to_owned());
            }
        } else {
            outputs.insert("jacobian", jacobian);
        }

        let return_key = single_key(&outputs);
        debug!(%name, outputs = outputs.len(), "linearized");
        CodegenBuilder::new(self.inputs().clone(), outputs, self.config().clone())
            .name(name)
            .optional_return_key(return_key)
            .sparse_outputs(sparse)
            .structured_docstring(docstring)
            .build()
    }

    /// Add jacobians of the outputs at `which_results` with respect to
    /// `which_args`, one output per (result, arg) pair.
    #[instrument(level = "debug", skip_all, fields(name = self.name().unwrap_or("<unnamed>")))]
    pub fn with_jacobians(&self, options: JacobianOptions) -> Result<Codegen> {
        let which_args = self.resolve_args(options.which_args.as_deref())?;
        let results = &options.which_results;
        if results.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ContractViolation::UnsortedResults {
                indices: results.clone(),
            }
            .into());
        }
        let count = self.outputs().len();
        if let Some(&index) = results.iter().find(|&&i| i >= count) {
            return Err(ContractViolation::ResultIndexOutOfRange { index, count }.into());
        }
        let name = match options.name {
            Some(name) => name,
            None => self.pick_name(&which_args, options.include_results, None)?,
        };

        let args = self.arg_values(&which_args);
        let mut arg_dims = Vec::with_capacity(args.len());
        for (_, arg) in &args {
            arg_dims.push(arg.tangent_dim()?);
        }
        let mut differentiated = Vec::with_capacity(results.len());
        for &index in results {
            if let Some((key, value)) = self.outputs().get_index(index) {
                differentiated.push((key, value, value.tangent_dim()?));
            }
        }

        let mut outputs = Values::new();
        let mut docstring = self.docstring().clone();
        for (index, (key, value)) in self.outputs().iter().enumerate() {
            if options.include_results || !results.contains(&index) {
                outputs.insert(key, value.clone());
            } else {
                docstring.remove(key);
            }
        }

        let mut jacobian_names = Vec::new();
        for (result_name, result, result_dim) in differentiated {
            let jacobians = tangent_jacobians(result, &args)?;
            let blocks = jacobians.into_iter().zip(&arg_dims);
            for ((arg_name, _), (jacobian, arg_dim)) in args.iter().zip(blocks) {
                let output_name = format!("{result_name}_D_{arg_name}");
                docstring.push(
                    output_name.clone(),
                    vec![format!(
                        "    {output_name}: ({result_dim}x{arg_dim}) jacobian of {result_name} \
                         ({result_dim}) wrt arg {arg_name} ({arg_dim})"
                    )],
                );
                outputs.insert(output_name.clone(), jacobian);
                jacobian_names.push(output_name);
            }
        }

        let sparse = match options.sparse_jacobians {
            SparseSelection::Dense => Vec::new(),
            SparseSelection::All => jacobian_names,
            SparseSelection::Only(names) => {
                if let Some(key) = names.iter().find(|n| !jacobian_names.contains(n)) {
                    return Err(ContractViolation::UnknownSparseKey { key: key.clone() }.into());
                }
                names
            }
        };

        let return_key = single_key(&outputs).or_else(|| {
            self.return_key()
                .filter(|key| outputs.contains_key(key))
                .map(str::to_owned)
        });
        debug!(%name, outputs = outputs.len(), "added jacobians");
        CodegenBuilder::new(self.inputs().clone(), outputs, self.config().clone())
            .name(name)
            .optional_return_key(return_key)
            .sparse_outputs(sparse)
            .structured_docstring(docstring)
            .build()
    }

    /// `which_args`, or every input key, checked against the inputs.
    fn resolve_args(&self, which_args: Option<&[String]>) -> Result<Vec<String>> {
        let args: Vec<String> = match which_args {
            Some(args) => args.to_vec(),
            None => self.inputs().keys().map(str::to_owned).collect(),
        };
        if args.is_empty() {
            return Err(ContractViolation::NoArguments.into());
        }
        if let Some(name) = args.iter().find(|a| !self.inputs().contains_key(a)) {
            return Err(ContractViolation::UnknownArgument { name: name.clone() }.into());
        }
        Ok(args)
    }

    fn arg_values<'a>(&'a self, which_args: &'a [String]) -> Vec<(&'a str, &'a Value)> {
        which_args
            .iter()
            .filter_map(|name| self.inputs().get(name).map(|value| (name.as_str(), value)))
            .collect()
    }

    /// Name of a derived specification.
    ///
    /// Full linearizations turn `foo_residual` into `foo_factor`. Everything
    /// else appends `_with` when results are kept, then `_jacobian` or
    /// `_jacobians`, then the declaration indices of the arguments when only
    /// some of them are differentiated.
    fn pick_name(
        &self,
        which_args: &[String],
        include_results: bool,
        mode: Option<LinearizationMode>,
    ) -> Result<String> {
        let Some(source) = self.name() else {
            return Err(ContractViolation::MissingName.into());
        };
        if mode == Some(LinearizationMode::FullLinearization) {
            let stem = source.strip_suffix("_residual").unwrap_or(source);
            return Ok(if stem.ends_with("_factor") {
                stem.to_owned()
            } else {
                format!("{stem}_factor")
            });
        }

        let mut name = source.to_owned();
        if include_results {
            name.push_str("_with");
        }
        name.push_str(if which_args.len() == 1 { "_jacobian" } else { "_jacobians" });
        if which_args.len() != self.inputs().len() {
            for arg in which_args {
                if let Some(position) = self.inputs().position(arg) {
                    name.push_str(&position.to_string());
                }
            }
        }
        Ok(name)
    }
}

/// `arg a (3)` or `args a (3), b (6)`.
fn format_arg_list(names: &[String], dims: &[usize]) -> String {
    let list = names
        .iter()
        .zip(dims)
        .map(|(name, dim)| format!("{name} ({dim})"))
        .collect::<Vec<_>>()
        .join(", ");
    let word = if names.len() == 1 { "arg" } else { "args" };
    format!("{word} {list}")
}

fn single_key(outputs: &Values) -> Option<String> {
    if outputs.len() == 1 {
        outputs.keys().next().map(str::to_owned)
    } else {
        None
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;

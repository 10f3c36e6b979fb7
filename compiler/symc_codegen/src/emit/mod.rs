//! Emission: type resolution, template queueing and file output.
//!
//! `generate` runs in three phases:
//!
//! 1. **Resolve**: discover composite types and check them against the
//!    shared registry. Conflicts fail here, before anything touches disk.
//! 2. **Queue**: dispatch once on the backend and queue the function, type
//!    and package files.
//! 3. **Flush**: render and write the queue, write the schema for newly
//!    generated types, then register those types.

mod body;
mod cpp;
mod cse;
mod lcm;
mod printer;
mod python;
mod template;
mod writer;

use std::path::{Path, PathBuf};

use heck::ToSnakeCase;
use tracing::{debug, info, instrument};

use self::template::{Template, TemplateQueue};
use crate::config::BackendConfig;
use crate::error::{CodegenError, ContractViolation, Result};
use crate::spec::Codegen;
use crate::types::{discover, resolve, EmissionContext, SharedTypes};

/// Where and how a specification is emitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Root of the generated tree. A fresh temporary directory
    /// `symc_<name>_*` is created when unset.
    pub output_dir: Option<PathBuf>,
    /// Root of the `lcmtypes/` schema directory, `output_dir` when unset.
    pub schema_output_dir: Option<PathBuf>,
    pub namespace: String,
    /// Stem of the generated files, the snake-cased name when unset.
    pub generated_file_name: Option<String>,
    /// Write the function directly into `output_dir`.
    pub flat_layout: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        GenerateOptions {
            output_dir: None,
            schema_output_dir: None,
            namespace: "sym".to_owned(),
            generated_file_name: None,
            flat_layout: false,
        }
    }
}

impl GenerateOptions {
    /// Default options writing under `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        GenerateOptions {
            output_dir: Some(dir.into()),
            ..GenerateOptions::default()
        }
    }
}

/// Everything a `generate` call produced.
#[derive(Clone, Debug)]
pub struct GenerateReport {
    pub output_dir: PathBuf,
    pub function_dir: PathBuf,
    pub types_dir: PathBuf,
    pub schema_dir: PathBuf,
    /// Function, type and package files, in write order.
    pub generated_files: Vec<PathBuf>,
    pub schema_files: Vec<PathBuf>,
    /// Composite types taken from the registry instead of generated.
    pub reused_types: Vec<String>,
    pub emission: EmissionContext,
}

impl Codegen {
    /// Emit this specification's function and its new composite types.
    ///
    /// Types generated here are added to `shared` once every file is
    /// written; later calls reuse them.
    #[instrument(level = "debug", skip_all, fields(name = self.name().unwrap_or("<unnamed>")))]
    pub fn generate(
        &self,
        options: &GenerateOptions,
        shared: &mut SharedTypes,
    ) -> Result<GenerateReport> {
        let name = self.name().ok_or(ContractViolation::MissingName)?;
        let resolution = resolve(
            discover(self.inputs(), self.outputs()),
            shared,
            &options.namespace,
        )?;

        let output_dir = match &options.output_dir {
            Some(dir) => dir.clone(),
            None => temp_output_dir(name)?,
        };
        let function_dir = if options.flat_layout {
            output_dir.clone()
        } else {
            output_dir
                .join(self.config().kind())
                .join("symc")
                .join(&options.namespace)
        };
        let types_dir = function_dir.join("types");
        let schema_dir = options
            .schema_output_dir
            .as_deref()
            .unwrap_or(output_dir.as_path())
            .join("lcmtypes");
        let file_name = options
            .generated_file_name
            .clone()
            .unwrap_or_else(|| name.to_snake_case());
        let extension = self.config().extension();
        let file = |dir: &Path, stem: &str| dir.join(format!("{stem}.{extension}"));

        let context = &resolution.context;
        let mut queue = TemplateQueue::default();
        match self.config() {
            BackendConfig::Cpp(config) => {
                queue.push(
                    file(&function_dir, &file_name),
                    Template::CppFunction(cpp::FunctionFile {
                        spec: self,
                        config,
                        context,
                    }),
                );
                for ty in &resolution.generate {
                    queue.push(
                        file(&types_dir, &ty.name),
                        Template::CppType(cpp::TypeFile { ty, config, context }),
                    );
                }
            }
            BackendConfig::Python(config) => {
                queue.push(
                    file(&function_dir, &file_name),
                    Template::PythonFunction(python::FunctionFile {
                        spec: self,
                        config,
                        context,
                    }),
                );
                if !options.flat_layout {
                    queue.push(
                        function_dir.join("__init__.py"),
                        Template::PythonInit {
                            module: file_name.clone(),
                            name: python::function_name(self),
                        },
                    );
                }
                for ty in &resolution.generate {
                    queue.push(
                        file(&types_dir, &ty.name),
                        Template::PythonType(python::TypeFile { ty, config, context }),
                    );
                    queue.push(
                        types_dir.join("__init__.py"),
                        Template::PythonInit {
                            module: ty.name.clone(),
                            name: ty.name.clone(),
                        },
                    );
                }
            }
        }

        let autoformat = self.config().render().autoformat;
        let generated_files = queue.flush(autoformat)?;

        let schema_files = if resolution.generate.is_empty() {
            Vec::new()
        } else {
            let mut schema = TemplateQueue::default();
            schema.push(
                schema_dir.join(format!("{file_name}.lcm")),
                Template::Schema(lcm::SchemaFile {
                    types: &resolution.generate,
                    context,
                }),
            );
            schema.flush(autoformat)?
        };

        shared.register(&resolution.generate, &options.namespace);
        info!(
            %name,
            backend = self.config().kind(),
            files = generated_files.len(),
            generated_types = resolution.generate.len(),
            reused_types = resolution.reused.len(),
            "generated function"
        );

        Ok(GenerateReport {
            output_dir,
            function_dir,
            types_dir,
            schema_dir,
            generated_files,
            schema_files,
            reused_types: resolution.reused,
            emission: resolution.context,
        })
    }
}

fn temp_output_dir(name: &str) -> Result<PathBuf> {
    let dir = tempfile::Builder::new()
        .prefix(&format!("symc_{name}_"))
        .tempdir()
        .map_err(|e| CodegenError::io(std::env::temp_dir(), e))?;
    let path = dir.keep();
    debug!(path = %path.display(), "created temporary output directory");
    Ok(path)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;

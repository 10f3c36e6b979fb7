//! `symc generate`: emit catalogue functions for one backend.
//!
//! All functions of a run share one type registry, so a composite type used
//! by several functions is written once. With `--jobs` the specifications
//! are built on a rayon pool and each `generate` call holds the registry
//! lock for its whole duration.

use std::fs;
use std::path::PathBuf;

use parking_lot::Mutex;
use rayon::prelude::*;
use symc_codegen::{
    BackendConfig, CodegenError, GenerateOptions, GenerateReport, Result, SharedTypes,
};
use tracing::{info, warn};

use crate::catalogue::{self, Entry, CATALOGUE};

/// Parsed `generate` arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerateCommand {
    pub backend: Option<String>,
    /// JSON backend configuration; takes precedence over `backend`.
    pub config: Option<PathBuf>,
    pub out: PathBuf,
    pub namespace: Option<String>,
    pub flat: bool,
    pub jobs: bool,
    /// Catalogue entries to generate, all of them when empty.
    pub functions: Vec<String>,
}

impl Default for GenerateCommand {
    fn default() -> Self {
        GenerateCommand {
            backend: None,
            config: None,
            out: PathBuf::from("generated"),
            namespace: None,
            flat: false,
            jobs: false,
            functions: Vec::new(),
        }
    }
}

/// Parse the arguments following `generate`.
pub fn parse_generate_options(args: &[String]) -> std::result::Result<GenerateCommand, String> {
    let mut command = GenerateCommand::default();
    for arg in args {
        if let Some(backend) = arg.strip_prefix("--backend=") {
            command.backend = Some(backend.to_string());
        } else if let Some(path) = arg.strip_prefix("--config=") {
            command.config = Some(PathBuf::from(path));
        } else if let Some(dir) = arg.strip_prefix("--out=") {
            command.out = PathBuf::from(dir);
        } else if let Some(namespace) = arg.strip_prefix("--namespace=") {
            command.namespace = Some(namespace.to_string());
        } else if arg == "--flat" {
            command.flat = true;
        } else if arg == "--jobs" || arg == "-j" {
            command.jobs = true;
        } else if arg.starts_with('-') {
            return Err(format!("unknown option '{arg}'"));
        } else if catalogue::find(arg).is_some() {
            command.functions.push(arg.clone());
        } else {
            return Err(format!("unknown function '{arg}', see `symc list`"));
        }
    }
    Ok(command)
}

impl GenerateCommand {
    fn backend_config(&self) -> Result<BackendConfig> {
        let Some(path) = &self.config else {
            return BackendConfig::from_kind(self.backend.as_deref().unwrap_or("cpp"));
        };
        let text = fs::read_to_string(path).map_err(|source| CodegenError::Io {
            path: path.clone(),
            source,
        })?;
        let config = BackendConfig::from_json(&text)?;
        if let Some(backend) = self.backend.as_deref().filter(|b| *b != config.kind()) {
            warn!(
                requested = backend,
                configured = config.kind(),
                "--backend ignored in favor of the configuration file"
            );
        }
        Ok(config)
    }

    fn entries(&self) -> Vec<&'static Entry> {
        if self.functions.is_empty() {
            return CATALOGUE.iter().collect();
        }
        CATALOGUE
            .iter()
            .filter(|entry| self.functions.iter().any(|f| f == entry.name))
            .collect()
    }

    fn options(&self) -> GenerateOptions {
        let mut options = GenerateOptions::in_dir(&self.out);
        if let Some(namespace) = &self.namespace {
            options.namespace.clone_from(namespace);
        }
        options.flat_layout = self.flat;
        options
    }
}

/// Build and emit the selected functions. Reports come back in catalogue
/// order.
pub fn generate(command: &GenerateCommand) -> Result<Vec<GenerateReport>> {
    let config = command.backend_config()?;
    let options = command.options();
    let entries = command.entries();
    info!(
        backend = config.kind(),
        functions = entries.len(),
        out = %command.out.display(),
        parallel = command.jobs,
        "generating catalogue"
    );

    let shared = Mutex::new(SharedTypes::new());
    let run = |entry: &&Entry| -> Result<GenerateReport> {
        let spec = entry.build(&config)?;
        let mut registry = shared.lock();
        spec.generate(&options, &mut registry)
    };

    if !command.jobs {
        return entries.iter().map(run).collect();
    }
    rayon::ThreadPoolBuilder::new()
        .build_scoped(rayon::ThreadBuilder::run, |pool| {
            pool.install(|| entries.par_iter().map(run).collect::<Result<Vec<_>>>())
        })
        .unwrap_or_else(|e| {
            warn!("failed to create thread pool ({e}), generating sequentially");
            entries.iter().map(run).collect()
        })
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]

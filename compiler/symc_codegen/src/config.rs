//! Backend configuration.
//!
//! The set of backends is closed: each variant of [`BackendConfig`] owns its
//! templates and formatting rules, and emission dispatches on it exactly once.
//! Configurations deserialize from JSON tagged by a `backend` field:
//!
//! ```json
//! { "backend": "cpp", "line_length": 80, "use_eigen_types": false }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CodegenError, Result};

/// Formatting and numeric options shared by all backends.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenderOptions {
    /// Maximum generated line length, also used to wrap docstrings.
    pub line_length: usize,
    /// Prefix of each docstring line inside a doc comment.
    pub doc_comment_line_prefix: String,
    /// Normalize whitespace of rendered files.
    pub autoformat: bool,
    /// Scalar type name used in generated signatures.
    pub scalar_type: String,
    /// Dense outputs whose nonzero density is below this threshold are
    /// zero-initialized before the nonzero entries are assigned.
    pub zero_initialization_sparsity_threshold: f64,
}

impl RenderOptions {
    fn with_prefix(prefix: &str, scalar_type: &str) -> Self {
        RenderOptions {
            line_length: 100,
            doc_comment_line_prefix: prefix.to_owned(),
            autoformat: true,
            scalar_type: scalar_type.to_owned(),
            zero_initialization_sparsity_threshold: 0.5,
        }
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions::with_prefix("", "double")
    }
}

/// Fields accepted in a configuration file; anything left out keeps the
/// backend's default.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    line_length: Option<usize>,
    doc_comment_line_prefix: Option<String>,
    autoformat: Option<bool>,
    scalar_type: Option<String>,
    zero_initialization_sparsity_threshold: Option<f64>,
    use_eigen_types: Option<bool>,
}

impl ConfigFile {
    fn apply(self, render: &mut RenderOptions, use_eigen_types: &mut bool) {
        if let Some(v) = self.line_length {
            render.line_length = v;
        }
        if let Some(v) = self.doc_comment_line_prefix {
            render.doc_comment_line_prefix = v;
        }
        if let Some(v) = self.autoformat {
            render.autoformat = v;
        }
        if let Some(v) = self.scalar_type {
            render.scalar_type = v;
        }
        if let Some(v) = self.zero_initialization_sparsity_threshold {
            render.zero_initialization_sparsity_threshold = v;
        }
        if let Some(v) = self.use_eigen_types {
            *use_eigen_types = v;
        }
    }
}

/// C++ backend: header-only functions templated on the scalar type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "ConfigFile")]
pub struct CppConfig {
    #[serde(flatten)]
    pub render: RenderOptions,
    /// Eigen matrices in generated types instead of flat `std::array`s.
    pub use_eigen_types: bool,
}

impl Default for CppConfig {
    fn default() -> Self {
        CppConfig {
            render: RenderOptions::with_prefix(" * ", "double"),
            use_eigen_types: true,
        }
    }
}

impl From<ConfigFile> for CppConfig {
    fn from(file: ConfigFile) -> Self {
        let mut config = CppConfig::default();
        file.apply(&mut config.render, &mut config.use_eigen_types);
        config
    }
}

/// Python backend: plain functions over `numpy` arrays or lists.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "ConfigFile")]
pub struct PythonConfig {
    #[serde(flatten)]
    pub render: RenderOptions,
    /// `numpy.ndarray` fields in generated types instead of lists.
    pub use_eigen_types: bool,
}

impl Default for PythonConfig {
    fn default() -> Self {
        PythonConfig {
            render: RenderOptions::with_prefix("", "float"),
            use_eigen_types: true,
        }
    }
}

impl From<ConfigFile> for PythonConfig {
    fn from(file: ConfigFile) -> Self {
        let mut config = PythonConfig::default();
        file.apply(&mut config.render, &mut config.use_eigen_types);
        config
    }
}

/// Target backend and its options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum BackendConfig {
    Cpp(CppConfig),
    Python(PythonConfig),
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Cpp(CppConfig::default())
    }
}

impl BackendConfig {
    /// Names accepted by [`BackendConfig::from_kind`].
    pub const KINDS: [&'static str; 2] = ["cpp", "python"];

    /// Default configuration for a backend name.
    pub fn from_kind(kind: &str) -> Result<Self> {
        match kind {
            "cpp" => Ok(BackendConfig::Cpp(CppConfig::default())),
            "python" => Ok(BackendConfig::Python(PythonConfig::default())),
            other => Err(CodegenError::UnsupportedBackend(other.to_owned())),
        }
    }

    /// Parse a JSON configuration. An unknown `backend` tag is reported as
    /// [`CodegenError::UnsupportedBackend`], malformed input as
    /// [`CodegenError::Config`].
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_str(text)?;
        if let Some(kind) = raw.get("backend").and_then(serde_json::Value::as_str) {
            if !Self::KINDS.contains(&kind) {
                return Err(CodegenError::UnsupportedBackend(kind.to_owned()));
            }
        }
        Ok(serde_json::from_value(raw)?)
    }

    /// Backend name, also the top-level output directory.
    pub fn kind(&self) -> &'static str {
        match self {
            BackendConfig::Cpp(_) => "cpp",
            BackendConfig::Python(_) => "python",
        }
    }

    pub fn render(&self) -> &RenderOptions {
        match self {
            BackendConfig::Cpp(c) => &c.render,
            BackendConfig::Python(c) => &c.render,
        }
    }

    pub fn use_eigen_types(&self) -> bool {
        match self {
            BackendConfig::Cpp(c) => c.use_eigen_types,
            BackendConfig::Python(c) => c.use_eigen_types,
        }
    }

    /// Extension of generated source files.
    pub fn extension(&self) -> &'static str {
        match self {
            BackendConfig::Cpp(_) => "h",
            BackendConfig::Python(_) => "py",
        }
    }
}

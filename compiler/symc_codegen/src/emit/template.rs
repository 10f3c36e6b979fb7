//! Queue of files to render and write.
//!
//! Templates are queued while the emission plan is built and rendered only
//! when the queue is flushed, after every check that can fail without I/O
//! has passed.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::trace;

use super::{cpp, lcm, python};
use crate::error::{CodegenError, Result};

/// One renderable file.
pub(crate) enum Template<'a> {
    CppFunction(cpp::FunctionFile<'a>),
    CppType(cpp::TypeFile<'a>),
    PythonFunction(python::FunctionFile<'a>),
    PythonType(python::TypeFile<'a>),
    /// Package `__init__.py`, merged with the file already on disk.
    PythonInit { module: String, name: String },
    Schema(lcm::SchemaFile<'a>),
}

impl Template<'_> {
    fn render(&self, path: &Path) -> Result<String> {
        Ok(match self {
            Template::CppFunction(file) => file.render(),
            Template::CppType(file) => file.render(),
            Template::PythonFunction(file) => file.render(),
            Template::PythonType(file) => file.render(),
            Template::PythonInit { module, name } => {
                let existing = match fs::read_to_string(path) {
                    Ok(text) => text,
                    Err(err) if err.kind() == ErrorKind::NotFound => String::new(),
                    Err(err) => return Err(CodegenError::io(path, err)),
                };
                python::merge_init(&existing, module, name)
            }
            Template::Schema(file) => file.render(),
        })
    }

    /// Longest run of blank lines kept by [`autoformat`].
    fn max_blank_lines(&self) -> usize {
        match self {
            Template::PythonFunction(_) | Template::PythonType(_) | Template::PythonInit { .. } => 2,
            Template::CppFunction(_) | Template::CppType(_) | Template::Schema(_) => 1,
        }
    }
}

/// Normalize whitespace: no trailing spaces, no leading blank lines, blank
/// runs capped at `max_blank_lines` and exactly one final newline.
pub(crate) fn autoformat(text: &str, max_blank_lines: usize) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blanks = 0;
    for line in text.lines().map(str::trim_end) {
        if line.is_empty() {
            blanks += 1;
            continue;
        }
        if !out.is_empty() {
            for _ in 0..blanks.min(max_blank_lines) {
                out.push('\n');
            }
        }
        blanks = 0;
        out.push_str(line);
        out.push('\n');
    }
    out
}

#[derive(Default)]
pub(crate) struct TemplateQueue<'a> {
    items: Vec<(PathBuf, Template<'a>)>,
}

impl<'a> TemplateQueue<'a> {
    pub(crate) fn push(&mut self, path: PathBuf, template: Template<'a>) {
        self.items.push((path, template));
    }

    /// Render and write every queued file, creating directories as needed.
    /// Returns the distinct paths written.
    pub(crate) fn flush(self, autoformat_output: bool) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.items.len());
        for (path, template) in self.items {
            let mut text = template.render(&path)?;
            if autoformat_output {
                text = autoformat(&text, template.max_blank_lines());
            }
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| CodegenError::io(parent, e))?;
            }
            fs::write(&path, text).map_err(|e| CodegenError::io(&path, e))?;
            trace!(path = %path.display(), "wrote generated file");
            if !written.contains(&path) {
                written.push(path);
            }
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn autoformat_normalizes_whitespace() {
        let raw = "\n\nfirst   \n\n\n\nsecond\n\n\nthird\n\n\n";
        assert_eq!(autoformat(raw, 1), "first\n\nsecond\n\nthird\n");
        assert_eq!(autoformat(raw, 2), "first\n\n\nsecond\n\n\nthird\n");
        assert_eq!(autoformat("", 1), "");
    }
}

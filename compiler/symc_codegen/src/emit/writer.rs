//! Indented source writer.
//!
//! Holds the output buffer, the current indentation and the counter used
//! for intermediate names while a file is rendered.

use rustc_hash::FxHashSet;

/// Source writer shared by the backend renderers.
#[derive(Debug)]
pub(crate) struct SourceWriter {
    /// Current indentation level.
    indent: usize,
    /// Indentation unit.
    unit: &'static str,
    /// Generated code output.
    output: String,
    /// Counter for generating unique temporary names.
    temp_counter: u32,
    /// Names temporaries must not take.
    reserved: FxHashSet<String>,
}

impl SourceWriter {
    /// Writer indenting with `unit` per level.
    pub(crate) fn new(unit: &'static str) -> Self {
        SourceWriter {
            indent: 0,
            unit,
            output: String::with_capacity(4096),
            temp_counter: 0,
            reserved: FxHashSet::default(),
        }
    }

    /// Keep `names` out of later temporaries.
    pub(crate) fn reserve(&mut self, names: impl IntoIterator<Item = String>) {
        self.reserved.extend(names);
    }

    /// Generate a unique temporary variable name.
    pub(crate) fn fresh_temp(&mut self) -> String {
        loop {
            let name = format!("_tmp{}", self.temp_counter);
            self.temp_counter += 1;
            if !self.reserved.contains(&name) {
                return name;
            }
        }
    }

    pub(crate) fn indent(&mut self) {
        self.indent += 1;
    }

    pub(crate) fn dedent(&mut self) {
        debug_assert!(self.indent > 0, "dedent called with zero indent");
        self.indent = self.indent.saturating_sub(1);
    }

    /// Write a line with indentation and newline.
    pub(crate) fn writeln(&mut self, s: &str) {
        for _ in 0..self.indent {
            self.output.push_str(self.unit);
        }
        self.output.push_str(s);
        self.output.push('\n');
    }

    /// Write each line of `block` at the current indentation.
    pub(crate) fn write_block(&mut self, block: &str) {
        for line in block.lines() {
            if line.is_empty() {
                self.newline();
            } else {
                self.writeln(line);
            }
        }
    }

    pub(crate) fn newline(&mut self) {
        self.output.push('\n');
    }

    /// Take the generated output.
    pub(crate) fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fresh_temp() {
        let mut w = SourceWriter::new("  ");
        assert_eq!(w.fresh_temp(), "_tmp0");
        assert_eq!(w.fresh_temp(), "_tmp1");
        assert_eq!(w.fresh_temp(), "_tmp2");
    }

    #[test]
    fn fresh_temp_skips_reserved_names() {
        let mut w = SourceWriter::new("  ");
        w.reserve(["_tmp0".to_owned(), "_tmp2".to_owned()]);
        assert_eq!(w.fresh_temp(), "_tmp1");
        assert_eq!(w.fresh_temp(), "_tmp3");
    }

    #[test]
    fn test_indent_dedent() {
        let mut w = SourceWriter::new("  ");
        w.writeln("line1");
        w.indent();
        w.writeln("line2");
        w.indent();
        w.write_block("line3\n\nline4");
        w.dedent();
        w.dedent();
        w.writeln("line5");
        assert_eq!(w.take_output(), "line1\n  line2\n    line3\n\n    line4\nline5\n");
    }
}

//! Structured docstrings.
//!
//! A docstring is a free-text head followed by one entry per output. Each
//! entry is a list of lines tagged with its output name, so removing an
//! output's documentation is correct no matter how many lines it spans.

use std::fmt;

use symc_ir::Values;

/// Documentation of one output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocEntry {
    pub name: String,
    pub lines: Vec<String>,
}

/// A docstring with per-output entries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Docstring {
    head: Vec<String>,
    entries: Vec<DocEntry>,
}

const OUTPUT_HEADERS: [&str; 2] = ["Outputs:", "Output args:"];

impl Docstring {
    /// Parse user text. Lines under the last `Outputs:` / `Output args:`
    /// header that start with `<output>:` (indented one level) open an
    /// entry; deeper or unrecognized lines continue the current entry.
    pub fn parse<'a>(text: &str, output_keys: impl IntoIterator<Item = &'a str>) -> Self {
        let keys: Vec<&str> = output_keys.into_iter().collect();
        let dedented = dedent(text);
        let lines: Vec<&str> = dedented.trim_end().trim_start_matches('\n').lines().collect();

        let Some(header) = lines
            .iter()
            .rposition(|line| OUTPUT_HEADERS.contains(&line.trim()))
        else {
            return Docstring {
                head: lines.iter().map(|l| (*l).to_owned()).collect(),
                entries: Vec::new(),
            };
        };

        let header_indent = indentation(lines[header]);
        let mut doc = Docstring {
            head: lines[..=header].iter().map(|l| (*l).to_owned()).collect(),
            entries: Vec::new(),
        };
        for line in &lines[header + 1..] {
            let opens = entry_name(line, header_indent).filter(|name| keys.contains(name));
            match (opens, doc.entries.last_mut()) {
                (Some(name), _) => doc.entries.push(DocEntry {
                    name: name.to_owned(),
                    lines: vec![(*line).to_owned()],
                }),
                (None, Some(entry)) => entry.lines.push((*line).to_owned()),
                (None, None) => doc.head.push((*line).to_owned()),
            }
        }
        doc
    }

    /// Docstring derived from argument and output type names.
    pub fn from_types(inputs: &Values, outputs: &Values) -> Self {
        Self::derived(&["This function was autogenerated. Do not modify by hand."], inputs, outputs)
    }

    /// Docstring for a specification built from a closure.
    pub fn from_function(function_name: &str, inputs: &Values, outputs: &Values) -> Self {
        let symbolic = format!("Symbolic function: {function_name}");
        Self::derived(
            &[
                "This function was autogenerated from a symbolic function. Do not modify by hand.",
                "",
                &symbolic,
            ],
            inputs,
            outputs,
        )
    }

    fn derived(preamble: &[&str], inputs: &Values, outputs: &Values) -> Self {
        let mut head: Vec<String> = preamble.iter().map(|l| (*l).to_owned()).collect();
        head.push(String::new());
        head.push("Args:".to_owned());
        for (name, value) in inputs.iter() {
            head.push(format!("    {name}: {}", value.type_name()));
        }
        head.push(String::new());
        head.push("Outputs:".to_owned());
        let entries = outputs
            .iter()
            .map(|(name, value)| DocEntry {
                name: name.to_owned(),
                lines: vec![format!("    {name}: {}", value.type_name())],
            })
            .collect();
        Docstring { head, entries }
    }

    pub fn head(&self) -> &[String] {
        &self.head
    }

    pub fn entries(&self) -> &[DocEntry] {
        &self.entries
    }

    pub fn entry(&self, name: &str) -> Option<&DocEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Remove the entry documenting `name`, whatever its length.
    pub fn remove(&mut self, name: &str) -> Option<DocEntry> {
        let pos = self.entries.iter().position(|e| e.name == name)?;
        Some(self.entries.remove(pos))
    }

    pub fn push(&mut self, name: impl Into<String>, lines: Vec<String>) {
        self.entries.push(DocEntry {
            name: name.into(),
            lines,
        });
    }

    /// All lines, head first.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.head
            .iter()
            .chain(self.entries.iter().flat_map(|e| e.lines.iter()))
            .map(String::as_str)
    }
}

impl fmt::Display for Docstring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.lines().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            f.write_str(line)?;
        }
        Ok(())
    }
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// `name` if `line` reads `<indent + 4 spaces>name: ...`.
fn entry_name(line: &str, header_indent: usize) -> Option<&str> {
    if indentation(line) != header_indent + 4 {
        return None;
    }
    let (name, _) = line.trim_start().split_once(':')?;
    is_identifier(name).then_some(name)
}

/// ASCII identifier check used for all input and output keys.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// Remove the common leading whitespace of all non-blank lines.
///
/// The margin is the longest whitespace prefix shared by those lines, so a
/// tab and a space never count as the same indentation.
pub fn dedent(text: &str) -> String {
    let mut margin: Option<&str> = None;
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let leading = &line[..indentation(line)];
        margin = Some(match margin {
            None => leading,
            Some(m) => common_prefix(m, leading),
        });
    }
    let margin = margin.unwrap_or("");
    let mut out = String::with_capacity(text.len());
    for (i, line) in text.lines().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if line.trim().is_empty() {
            continue;
        }
        out.push_str(line.strip_prefix(margin).unwrap_or(line));
    }
    out
}

/// Longest common prefix of `a` and `b`, split on a char boundary.
fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let end = a
        .char_indices()
        .zip(b.chars())
        .find(|((_, ca), cb)| ca != cb)
        .map_or_else(|| a.len().min(b.len()), |((i, _), _)| i);
    &a[..end]
}

/// Greedy word wrap: the first line starts with `preamble`, later lines are
/// indented by its width, and no line exceeds `width` unless a single word
/// does.
pub fn wrap_description(preamble: &str, description: &str, width: usize) -> Vec<String> {
    let indent = " ".repeat(preamble.chars().count());
    let mut lines = Vec::new();
    let mut current = preamble.to_owned();
    let mut current_len = preamble.chars().count();
    let mut has_word = false;

    for word in description.split_whitespace() {
        let word_len = word.chars().count();
        if has_word && current_len + 1 + word_len > width {
            lines.push(std::mem::replace(&mut current, indent.clone()));
            current_len = indent.len();
            has_word = false;
        }
        if has_word {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
        has_word = true;
    }
    if has_word {
        lines.push(current);
    }
    lines
}

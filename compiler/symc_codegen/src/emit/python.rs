//! Python backend: plain functions over `numpy` arrays and `sym` geometry
//! types, plus one class per generated composite type.

use std::collections::BTreeSet;

use heck::ToSnakeCase;
use symc_ir::{Expr, Value};

use super::body::{self, assignments, is_sequence, Layout, OutputForm, OutputPlan, Slot};
use super::printer::{Dialect, Printer};
use super::writer::SourceWriter;
use crate::config::PythonConfig;
use crate::sparse::CscFormat;
use crate::spec::Codegen;
use crate::types::{field_kind, CompositeType, EmissionContext, FieldKind};

const BANNER: &str = "\
# -----------------------------------------------------------------------------
# This file was autogenerated by symc. Do not modify by hand.
# -----------------------------------------------------------------------------";

/// Default-constructed value of a field kind.
fn default_of(kind: &FieldKind, flat_matrices: bool) -> String {
    match kind {
        FieldKind::Scalar => "0.0".to_owned(),
        FieldKind::Matrix { rows, cols } if flat_matrices => format!("[0.0] * {}", rows * cols),
        FieldKind::Matrix { rows, cols } => format!("numpy.zeros(({rows}, {cols}))"),
        FieldKind::Geo { name, .. } => format!("sym.{name}()"),
        FieldKind::Composite(type_name) => format!("{type_name}()"),
        FieldKind::Sequence { len, element } => {
            format!("[{} for _ in range({len})]", default_of(element, flat_matrices))
        }
    }
}

/// `from symc.<ns>.types.<t> import <t>` for every composite type used.
fn type_imports(
    types: impl IntoIterator<Item = String>,
    context: &EmissionContext,
) -> Vec<String> {
    let unique: BTreeSet<String> = types.into_iter().collect();
    unique
        .into_iter()
        .map(|type_name| {
            let namespace = context.namespaces.get(&type_name).unwrap_or(&context.namespace);
            format!("from symc.{namespace}.types.{type_name} import {type_name}")
        })
        .collect()
}

fn composites(kind: &FieldKind, out: &mut Vec<String>) {
    match kind {
        FieldKind::Composite(type_name) => out.push(type_name.clone()),
        FieldKind::Sequence { element, .. } => composites(element, out),
        FieldKind::Scalar | FieldKind::Matrix { .. } | FieldKind::Geo { .. } => {}
    }
}

fn write_docstring<'l>(w: &mut SourceWriter, lines: impl Iterator<Item = &'l str>) {
    w.writeln("\"\"\"");
    for line in lines {
        if line.is_empty() {
            w.newline();
        } else {
            w.writeln(line);
        }
    }
    w.writeln("\"\"\"");
}

/// Name of the generated Python function for `spec`.
pub(crate) fn function_name(spec: &Codegen) -> String {
    spec.name().unwrap_or("function").to_snake_case()
}

/// A generated function module.
pub(crate) struct FunctionFile<'a> {
    pub spec: &'a Codegen,
    pub config: &'a PythonConfig,
    pub context: &'a EmissionContext,
}

impl FunctionFile<'_> {
    pub(crate) fn render(&self) -> String {
        let spec = self.spec;
        let mut w = SourceWriter::new("    ");

        w.write_block(BANNER);
        w.newline();
        w.writeln("# pylint: disable=too-many-locals,too-many-statements,unused-argument");
        w.newline();
        w.writeln("import math  # noqa: F401");
        w.newline();
        w.writeln("import numpy  # noqa: F401");
        if !spec.sparse_outputs().is_empty() {
            w.writeln("from scipy import sparse");
        }
        w.newline();
        w.writeln("import sym  # noqa: F401");
        let mut used = Vec::new();
        for (key, value) in spec.inputs().iter().chain(spec.outputs().iter()) {
            composites(&field_kind(key, value), &mut used);
        }
        let imports = type_imports(used, self.context);
        if !imports.is_empty() {
            w.newline();
            for import in &imports {
                w.writeln(import);
            }
        }
        w.newline();
        w.newline();

        let args: Vec<&str> = spec.inputs().keys().collect();
        w.writeln(&format!("def {}({}):", function_name(spec), args.join(", ")));
        w.indent();
        write_docstring(&mut w, spec.docstring().lines());
        w.newline();

        let layout = Layout {
            dialect: Dialect::Python,
            use_eigen_types: self.config.use_eigen_types,
        };
        let planned = body::plan(spec, layout, &mut w);
        let printer = Printer::new(Dialect::Python, &planned.accesses);

        w.writeln(&format!("# Total ops: {}", planned.total_ops));
        w.newline();
        w.writeln("# Input arrays");
        for (key, value) in spec.inputs().iter() {
            if let Some(local) = planned.storage_local(key) {
                w.writeln(&format!("{local} = {key}.to_storage()"));
            } else if let Value::Matrix(m) = value {
                w.writeln(&format!(
                    "{key} = numpy.asarray({key}).reshape(({}, {}))",
                    m.rows(),
                    m.cols()
                ));
            }
        }
        w.newline();
        w.writeln(&format!("# Intermediate terms ({})", planned.temps.len()));
        for (temp, expr) in &planned.temps {
            w.writeln(&format!("{temp} = {}", printer.print(expr)));
        }
        w.newline();
        w.writeln(&format!("# Output terms ({})", planned.output_term_count()));
        for output in &planned.outputs {
            write_output(&mut w, layout, &printer, output);
        }

        let returned: Vec<&str> = planned.outputs.iter().map(|o| o.local.as_str()).collect();
        if !returned.is_empty() {
            w.writeln(&format!("return {}", returned.join(", ")));
        }
        w.dedent();
        w.take_output()
    }
}

fn write_output(
    w: &mut SourceWriter,
    layout: Layout,
    printer: &Printer<'_>,
    output: &OutputPlan<'_>,
) {
    let local = &output.local;
    match output.form {
        OutputForm::Sparse(csc) => write_sparse(w, printer, local, csc, &output.terms),
        OutputForm::Dense | OutputForm::Zeroed => {
            let value = output.value;
            if matches!(value, Value::Matrix(_) | Value::Values(_)) || is_sequence(value) {
                let kind = field_kind(output.key, value);
                w.writeln(&format!("{local} = {}", default_of(&kind, false)));
            }
            let mut slots = Vec::new();
            layout.output_slots(local, value, false, &mut slots);
            let zeroed = matches!(output.form, OutputForm::Zeroed);
            for (slot, terms) in assignments(slots, &output.terms, zeroed) {
                write_slot(w, printer, &slot, terms);
            }
        }
    }
}

fn write_slot(w: &mut SourceWriter, printer: &Printer<'_>, slot: &Slot, terms: &[Expr]) {
    match slot {
        Slot::Entry(target) => {
            let term = terms.first().map_or_else(|| "0".to_owned(), |t| printer.print(t));
            w.writeln(&format!("{target} = {term}"));
        }
        Slot::Geo {
            target, type_name, ..
        } => {
            let storage: Vec<String> = terms.iter().map(|t| printer.print(t)).collect();
            w.writeln(&format!(
                "{target} = sym.{type_name}.from_storage([{}])",
                storage.join(", ")
            ));
        }
    }
}

fn write_sparse(
    w: &mut SourceWriter,
    printer: &Printer<'_>,
    local: &str,
    csc: &CscFormat,
    terms: &[Expr],
) {
    let list = |items: &[usize]| {
        items
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };
    w.writeln(&format!("{local}_value = [0.0] * {}", csc.nnz()));
    for (k, term) in terms.iter().enumerate() {
        w.writeln(&format!("{local}_value[{k}] = {}", printer.print(term)));
    }
    w.writeln(&format!(
        "{local} = sparse.csc_matrix(({local}_value, [{}], [{}]), shape=({}, {}))",
        list(&csc.row_indices),
        list(&csc.col_ptrs),
        csc.rows,
        csc.cols
    ));
}

/// A generated composite type module.
pub(crate) struct TypeFile<'a> {
    pub ty: &'a CompositeType,
    pub config: &'a PythonConfig,
    pub context: &'a EmissionContext,
}

impl TypeFile<'_> {
    pub(crate) fn render(&self) -> String {
        let flat = !self.config.use_eigen_types;
        let mut used = Vec::new();
        for field in &self.ty.fields {
            composites(&field.kind, &mut used);
        }

        let mut w = SourceWriter::new("    ");
        w.write_block(BANNER);
        w.newline();
        w.writeln("import numpy  # noqa: F401");
        w.newline();
        w.writeln("import sym  # noqa: F401");
        let imports = type_imports(used, self.context);
        if !imports.is_empty() {
            w.newline();
            for import in &imports {
                w.writeln(import);
            }
        }
        w.newline();
        w.newline();
        w.writeln(&format!("class {}:", self.ty.name));
        w.indent();
        let doc = format!("Composite type generated for `{}`.", self.ty.key);
        write_docstring(&mut w, std::iter::once(doc.as_str()));
        w.newline();
        let slots: Vec<String> = self.ty.fields.iter().map(|f| format!("\"{}\"", f.name)).collect();
        let trailing = if slots.len() == 1 { "," } else { "" };
        w.writeln(&format!("__slots__ = ({}{trailing})", slots.join(", ")));
        w.newline();
        w.writeln("def __init__(self):");
        w.indent();
        if self.ty.fields.is_empty() {
            w.writeln("pass");
        }
        for field in &self.ty.fields {
            w.writeln(&format!("self.{} = {}", field.name, default_of(&field.kind, flat)));
        }
        w.dedent();
        w.dedent();
        w.take_output()
    }
}

/// Merge `from .<module> import <name>` into an existing `__init__.py`.
pub(crate) fn merge_init(existing: &str, module: &str, name: &str) -> String {
    let mut lines: BTreeSet<String> = existing
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("from ."))
        .map(str::to_owned)
        .collect();
    lines.insert(format!("from .{module} import {name}"));

    let mut w = SourceWriter::new("    ");
    w.write_block(BANNER);
    w.newline();
    for line in &lines {
        w.writeln(line);
    }
    w.take_output()
}

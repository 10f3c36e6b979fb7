//! C++ backend: header-only functions templated on `Scalar`, plus one
//! struct header per generated composite type.

use std::collections::BTreeSet;

use heck::{ToSnakeCase, ToUpperCamelCase};
use symc_ir::{Expr, Value};

use super::body::{self, assignments, Layout, OutputForm, OutputPlan, Slot};
use super::printer::{Dialect, Printer};
use super::writer::SourceWriter;
use crate::config::CppConfig;
use crate::sparse::CscFormat;
use crate::spec::Codegen;
use crate::types::{field_kind, CompositeType, EmissionContext, FieldKind};

const BANNER: &str = "\
// -----------------------------------------------------------------------------
// This file was autogenerated by symc. Do not modify by hand.
// -----------------------------------------------------------------------------";

/// Scalar template parameter of generated functions.
const SCALAR: &str = "Scalar";

/// Spelling of a field or argument type.
fn type_of(
    kind: &FieldKind,
    scalar: &str,
    flat_matrices: bool,
    context: &EmissionContext,
) -> String {
    match kind {
        FieldKind::Scalar => scalar.to_owned(),
        FieldKind::Matrix { rows, cols } if flat_matrices => {
            format!("std::array<{scalar}, {}>", rows * cols)
        }
        FieldKind::Matrix { rows, cols } => format!("Eigen::Matrix<{scalar}, {rows}, {cols}>"),
        FieldKind::Geo { name, .. } => format!("sym::{name}<{scalar}>"),
        FieldKind::Composite(type_name) => context.qualified(type_name, "::"),
        FieldKind::Sequence { len, element } => format!(
            "std::array<{}, {len}>",
            type_of(element, scalar, flat_matrices, context)
        ),
    }
}

/// Includes needed by the given field kinds.
fn collect_includes(
    kind: &FieldKind,
    context: &EmissionContext,
    includes: &mut BTreeSet<String>,
) {
    match kind {
        FieldKind::Scalar => {}
        FieldKind::Matrix { .. } => {
            includes.insert("<Eigen/Core>".to_owned());
        }
        FieldKind::Geo { name, .. } => {
            includes.insert(format!("<sym/{}.h>", name.to_snake_case()));
        }
        FieldKind::Composite(type_name) => {
            let namespace = context.namespaces.get(type_name).unwrap_or(&context.namespace);
            includes.insert(format!("<symc/{namespace}/types/{type_name}.h>"));
        }
        FieldKind::Sequence { element, .. } => {
            includes.insert("<array>".to_owned());
            collect_includes(element, context, includes);
        }
    }
}

/// A generated function header.
pub(crate) struct FunctionFile<'a> {
    pub spec: &'a Codegen,
    pub config: &'a CppConfig,
    pub context: &'a EmissionContext,
}

impl FunctionFile<'_> {
    fn value_type(&self, key: &str, value: &Value) -> String {
        if self.spec.is_sparse(key) {
            return format!("Eigen::SparseMatrix<{SCALAR}>");
        }
        type_of(&field_kind(key, value), SCALAR, false, self.context)
    }

    pub(crate) fn render(&self) -> String {
        let spec = self.spec;
        let name = spec.name().unwrap_or("function").to_upper_camel_case();
        let mut w = SourceWriter::new("  ");

        w.write_block(BANNER);
        w.newline();
        w.writeln("#pragma once");
        w.newline();
        for include in self.includes() {
            w.writeln(&format!("#include {include}"));
        }
        w.newline();
        w.writeln(&format!("namespace {} {{", self.context.namespace));
        w.newline();
        self.doc_comment(&mut w);
        w.writeln(&format!("template <typename {SCALAR}>"));
        self.signature(&mut w, &name);

        w.indent();
        let layout = Layout {
            dialect: Dialect::Cpp,
            use_eigen_types: self.config.use_eigen_types,
        };
        let planned = body::plan(spec, layout, &mut w);
        let printer = Printer::new(Dialect::Cpp, &planned.accesses);

        w.writeln(&format!("// Total ops: {}", planned.total_ops));
        w.newline();
        w.writeln("// Input arrays");
        for (key, value) in spec.inputs().iter() {
            if let Some(local) = planned.storage_local(key) {
                w.writeln(&format!(
                    "const Eigen::Matrix<{SCALAR}, {}, 1>& {local} = {key}.Data();",
                    value.storage_dim()
                ));
            }
        }
        w.newline();
        w.writeln(&format!("// Intermediate terms ({})", planned.temps.len()));
        for (temp, expr) in &planned.temps {
            w.writeln(&format!("const {SCALAR} {temp} = {};", printer.print(expr)));
        }
        w.newline();
        w.writeln(&format!("// Output terms ({})", planned.output_term_count()));
        for output in &planned.outputs {
            self.write_output(&mut w, layout, &printer, output);
        }
        if let Some(local) = spec.return_key().and_then(|key| planned.output_local(key)) {
            w.newline();
            w.writeln(&format!("return {local};"));
        }
        w.dedent();
        w.writeln("}");
        w.newline();
        w.writeln(&format!("}}  // namespace {}", self.context.namespace));
        w.take_output()
    }

    fn includes(&self) -> Vec<String> {
        let mut includes = BTreeSet::from(["<cmath>".to_owned(), "<Eigen/Core>".to_owned()]);
        for (key, value) in self.spec.inputs().iter().chain(self.spec.outputs().iter()) {
            collect_includes(&field_kind(key, value), self.context, &mut includes);
        }
        if !self.spec.sparse_outputs().is_empty() {
            includes.insert("<algorithm>".to_owned());
            includes.insert("<Eigen/SparseCore>".to_owned());
        }
        includes.into_iter().collect()
    }

    fn doc_comment(&self, w: &mut SourceWriter) {
        let prefix = &self.config.render.doc_comment_line_prefix;
        w.writeln("/**");
        for line in self.spec.docstring().lines() {
            w.writeln(format!("{prefix}{line}").trim_end());
        }
        w.writeln(" */");
    }

    fn signature(&self, w: &mut SourceWriter, name: &str) {
        let spec = self.spec;
        let return_type = spec
            .return_key()
            .and_then(|key| spec.outputs().get(key).map(|value| self.value_type(key, value)))
            .unwrap_or_else(|| "void".to_owned());

        let mut params: Vec<String> = spec
            .inputs()
            .iter()
            .map(|(key, value)| format!("const {}& {key}", self.value_type(key, value)))
            .collect();
        params.extend(
            spec.outputs()
                .iter()
                .filter(|(key, _)| Some(*key) != spec.return_key())
                .map(|(key, value)| format!("{}* const {key} = nullptr", self.value_type(key, value))),
        );

        let single = format!("{return_type} {name}({}) {{", params.join(", "));
        if single.len() <= self.config.render.line_length {
            w.writeln(&single);
            return;
        }
        w.writeln(&format!("{return_type} {name}("));
        w.indent();
        w.indent();
        let last = params.len().saturating_sub(1);
        for (i, param) in params.iter().enumerate() {
            let end = if i == last { ") {" } else { "," };
            w.writeln(&format!("{param}{end}"));
        }
        w.dedent();
        w.dedent();
    }

    fn write_output(
        &self,
        w: &mut SourceWriter,
        layout: Layout,
        printer: &Printer<'_>,
        output: &OutputPlan<'_>,
    ) {
        let key = output.key;
        let local = &output.local;
        let ty = self.value_type(key, output.value);
        let returned = self.spec.return_key() == Some(key);

        w.newline();
        if returned {
            w.writeln(&format!("{ty} {local};"));
        } else {
            w.writeln(&format!("if ({key} != nullptr) {{"));
            w.indent();
            w.writeln(&format!("{ty}& {local} = (*{key});"));
        }

        match output.form {
            OutputForm::Sparse(csc) => write_sparse(w, printer, local, csc, &output.terms),
            OutputForm::Dense | OutputForm::Zeroed => {
                let zeroed = matches!(output.form, OutputForm::Zeroed);
                if zeroed {
                    w.writeln(&format!("{local}.setZero();"));
                }
                let mut slots = Vec::new();
                layout.output_slots(local, output.value, false, &mut slots);
                for (slot, terms) in assignments(slots, &output.terms, zeroed) {
                    write_slot(w, printer, &slot, terms);
                }
            }
        }

        if !returned {
            w.dedent();
            w.writeln("}");
        }
    }
}

fn write_slot(w: &mut SourceWriter, printer: &Printer<'_>, slot: &Slot, terms: &[Expr]) {
    match slot {
        Slot::Entry(target) => {
            let term = terms.first().map_or_else(|| "0".to_owned(), |t| printer.print(t));
            w.writeln(&format!("{target} = {term};"));
        }
        Slot::Geo {
            target,
            type_name,
            storage_dim,
        } => {
            let storage: Vec<String> = terms.iter().map(|t| printer.print(t)).collect();
            let data = format!("Eigen::Matrix<{SCALAR}, {storage_dim}, 1>()");
            w.writeln(&format!(
                "{target} = sym::{type_name}<{SCALAR}>(({data} << {}).finished());",
                storage.join(", ")
            ));
        }
    }
}

/// Fill a CSC matrix: the layout is rebuilt only when the nonzero count
/// differs, then the value array is written in place.
fn write_sparse(
    w: &mut SourceWriter,
    printer: &Printer<'_>,
    local: &str,
    csc: &CscFormat,
    terms: &[Expr],
) {
    let join = |items: &[usize]| {
        items
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };
    if csc.nnz() == 0 {
        w.writeln(&format!("{local}.resize({}, {});", csc.rows, csc.cols));
        w.writeln(&format!("{local}.setZero();"));
        return;
    }
    w.writeln(&format!("if ({local}.nonZeros() != {}) {{", csc.nnz()));
    w.indent();
    w.writeln(&format!("static constexpr int kRows = {};", csc.rows));
    w.writeln(&format!("static constexpr int kCols = {};", csc.cols));
    w.writeln(&format!("static constexpr int kNumNonZero = {};", csc.nnz()));
    w.writeln(&format!("static constexpr int kColPtrs[] = {{{}}};", join(&csc.col_ptrs)));
    w.writeln(&format!("static constexpr int kRowIndices[] = {{{}}};", join(&csc.row_indices)));
    w.writeln(&format!("{local}.resize(kRows, kCols);"));
    w.writeln(&format!("{local}.data().resize(kNumNonZero);"));
    w.writeln(&format!("std::copy(kColPtrs, kColPtrs + kCols + 1, {local}.outerIndexPtr());"));
    w.writeln(&format!("std::copy(kRowIndices, kRowIndices + kNumNonZero, {local}.innerIndexPtr());"));
    w.dedent();
    w.writeln("}");
    w.writeln(&format!("{SCALAR}* {local}_value_ptr = {local}.valuePtr();"));
    for (k, term) in terms.iter().enumerate() {
        w.writeln(&format!("{local}_value_ptr[{k}] = {};", printer.print(term)));
    }
}

/// A generated composite type header.
pub(crate) struct TypeFile<'a> {
    pub ty: &'a CompositeType,
    pub config: &'a CppConfig,
    pub context: &'a EmissionContext,
}

impl TypeFile<'_> {
    pub(crate) fn render(&self) -> String {
        let flat = !self.config.use_eigen_types;
        let scalar = &self.config.render.scalar_type;
        let mut includes = BTreeSet::new();
        for field in &self.ty.fields {
            collect_includes(&field.kind, self.context, &mut includes);
            if flat && matches!(field.kind, FieldKind::Matrix { .. }) {
                includes.insert("<array>".to_owned());
            }
        }
        if flat {
            includes.remove("<Eigen/Core>");
        }

        let mut w = SourceWriter::new("  ");
        w.write_block(BANNER);
        w.newline();
        w.writeln("#pragma once");
        w.newline();
        for include in &includes {
            w.writeln(&format!("#include {include}"));
        }
        w.newline();
        w.writeln(&format!("namespace {} {{", self.context.namespace));
        w.newline();
        w.writeln(&format!("/// Composite type generated for `{}`.", self.ty.key));
        w.writeln(&format!("struct {} {{", self.ty.name));
        w.indent();
        for field in &self.ty.fields {
            let ty = type_of(&field.kind, scalar, flat, self.context);
            w.writeln(&format!("{ty} {};", field.name));
        }
        w.dedent();
        w.writeln("};");
        w.newline();
        w.writeln(&format!("}}  // namespace {}", self.context.namespace));
        w.take_output()
    }
}

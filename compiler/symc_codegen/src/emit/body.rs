//! Function body planning shared by the backends.
//!
//! Every input storage slot is bound to an access expression, all output
//! terms go through one common-subexpression pass, and each output is
//! tagged with how it gets written: element by element, zero-filled with
//! only the nonzero entries assigned, or as the value array of a CSC
//! matrix.

use rustc_hash::{FxHashMap, FxHashSet};
use symc_ir::{Expr, Symbol, Value};

use super::cse::eliminate;
use super::printer::Dialect;
use super::writer::SourceWriter;
use crate::sparse::{should_set_zero, CscFormat};
use crate::spec::Codegen;

/// Name of the geometric type stored in `value`, if it is one.
fn geo_name(value: &Value) -> Option<&'static str> {
    match value {
        Value::Quaternion(_) => Some("Quaternion"),
        Value::DualQuaternion(_) => Some("DualQuaternion"),
        Value::Rot3(_) => Some("Rot3"),
        Value::Pose3(_) => Some("Pose3"),
        _ => None,
    }
}

pub(crate) fn is_sequence(value: &Value) -> bool {
    matches!(value, Value::Sequence(_))
}

/// Suffixes the backends append to an output local.
const DERIVED_SUFFIXES: [&str; 2] = ["_value", "_value_ptr"];

/// Names the body cannot bind: every argument and every input symbol.
fn taken_names(spec: &Codegen) -> FxHashSet<String> {
    let mut taken: FxHashSet<String> = spec
        .inputs()
        .keys()
        .chain(spec.outputs().keys())
        .map(str::to_owned)
        .collect();
    for (_, value) in spec.inputs().iter() {
        for expr in value.to_storage() {
            if let Some(symbol) = expr.as_symbol() {
                taken.insert(symbol.name().to_owned());
            }
        }
    }
    taken
}

/// `_{key}`, with more leading underscores until neither it nor a name
/// derived from it is taken.
fn local_name(key: &str, taken: &mut FxHashSet<String>) -> String {
    let mut local = format!("_{key}");
    while taken.contains(&local)
        || DERIVED_SUFFIXES
            .iter()
            .any(|suffix| taken.contains(&format!("{local}{suffix}")))
    {
        local.insert(0, '_');
    }
    taken.insert(local.clone());
    taken.extend(DERIVED_SUFFIXES.iter().map(|suffix| format!("{local}{suffix}")));
    local
}

/// An assignable destination for output terms.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Slot {
    /// One storage entry.
    Entry(String),
    /// A whole geometric value, built from `storage_dim` consecutive terms.
    Geo {
        target: String,
        type_name: &'static str,
        storage_dim: usize,
    },
}

/// How values are addressed in one dialect.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Layout {
    pub dialect: Dialect,
    /// Matrices inside generated types are matrices rather than flat arrays.
    pub use_eigen_types: bool,
}

impl Layout {
    fn matrix_entry(self, path: &str, i: usize, j: usize, k: usize, in_type: bool) -> String {
        match (self.dialect, in_type && !self.use_eigen_types) {
            (_, true) => format!("{path}[{k}]"),
            (Dialect::Cpp, false) => format!("{path}({i}, {j})"),
            (Dialect::Python, false) => format!("{path}[{i}, {j}]"),
        }
    }

    fn geo_storage(self, path: &str) -> String {
        match self.dialect {
            Dialect::Cpp => format!("{path}.Data()"),
            Dialect::Python => format!("{path}.to_storage()"),
        }
    }

    /// Access expressions of every storage slot of `value`, in storage order.
    pub(crate) fn input_slots(
        self,
        path: &str,
        value: &Value,
        in_type: bool,
        out: &mut Vec<String>,
    ) {
        match value {
            Value::Scalar(_) => out.push(path.to_owned()),
            Value::Matrix(m) => {
                for j in 0..m.cols() {
                    for i in 0..m.rows() {
                        out.push(self.matrix_entry(path, i, j, j * m.rows() + i, in_type));
                    }
                }
            }
            Value::Quaternion(_) | Value::DualQuaternion(_) | Value::Rot3(_) | Value::Pose3(_) => {
                let storage = self.geo_storage(path);
                out.extend((0..value.storage_dim()).map(|k| format!("{storage}[{k}]")));
            }
            Value::Sequence(items) => {
                for (i, item) in items.iter().enumerate() {
                    self.input_slots(&format!("{path}[{i}]"), item, in_type, out);
                }
            }
            Value::Values(values) => {
                for (key, field) in values.iter() {
                    self.input_slots(&format!("{path}.{key}"), field, true, out);
                }
            }
        }
    }

    /// Destinations of every storage slot of `value`, in storage order.
    pub(crate) fn output_slots(
        self,
        target: &str,
        value: &Value,
        in_type: bool,
        out: &mut Vec<Slot>,
    ) {
        match value {
            Value::Scalar(_) => out.push(Slot::Entry(target.to_owned())),
            Value::Matrix(m) => {
                for j in 0..m.cols() {
                    for i in 0..m.rows() {
                        let k = j * m.rows() + i;
                        out.push(Slot::Entry(self.matrix_entry(target, i, j, k, in_type)));
                    }
                }
            }
            Value::Quaternion(_) => out.push(geo_slot(target, "Quaternion", value)),
            Value::DualQuaternion(_) => out.push(geo_slot(target, "DualQuaternion", value)),
            Value::Rot3(_) => out.push(geo_slot(target, "Rot3", value)),
            Value::Pose3(_) => out.push(geo_slot(target, "Pose3", value)),
            Value::Sequence(items) => {
                for (i, item) in items.iter().enumerate() {
                    self.output_slots(&format!("{target}[{i}]"), item, in_type, out);
                }
            }
            Value::Values(values) => {
                for (key, field) in values.iter() {
                    self.output_slots(&format!("{target}.{key}"), field, true, out);
                }
            }
        }
    }
}

fn geo_slot(target: &str, type_name: &'static str, value: &Value) -> Slot {
    Slot::Geo {
        target: target.to_owned(),
        type_name,
        storage_dim: value.storage_dim(),
    }
}

/// How an output is written.
#[derive(Clone, Copy, Debug)]
pub(crate) enum OutputForm<'a> {
    /// Every storage entry is assigned.
    Dense,
    /// Zero-filled first; only nonzero entries are assigned.
    Zeroed,
    /// Only the nonzero values of a CSC layout are assigned.
    Sparse(&'a CscFormat),
}

#[derive(Debug)]
pub(crate) struct OutputPlan<'a> {
    pub key: &'a str,
    /// Local the output is assembled in.
    pub local: String,
    pub value: &'a Value,
    pub form: OutputForm<'a>,
    /// Terms after elimination: storage order, or nonzero order if sparse.
    pub terms: Vec<Expr>,
}

#[derive(Debug)]
pub(crate) struct Body<'a> {
    /// Input symbol → access expression.
    pub accesses: FxHashMap<Symbol, String>,
    /// Geometric input → local holding its storage.
    pub storage_locals: FxHashMap<&'a str, String>,
    pub temps: Vec<(String, Expr)>,
    pub outputs: Vec<OutputPlan<'a>>,
    pub total_ops: usize,
}

impl Body<'_> {
    pub(crate) fn storage_local(&self, key: &str) -> Option<&str> {
        self.storage_locals.get(key).map(String::as_str)
    }

    /// Local of the output `key`.
    pub(crate) fn output_local(&self, key: &str) -> Option<&str> {
        self.outputs.iter().find(|o| o.key == key).map(|o| o.local.as_str())
    }

    pub(crate) fn output_term_count(&self) -> usize {
        self.outputs.iter().map(|o| o.terms.len()).sum()
    }
}

/// Plan the body of `spec`'s function.
pub(crate) fn plan<'a>(spec: &'a Codegen, layout: Layout, writer: &mut SourceWriter) -> Body<'a> {
    let mut taken = taken_names(spec);
    let mut accesses = FxHashMap::default();
    let mut storage_locals = FxHashMap::default();
    for (key, value) in spec.inputs().iter() {
        let mut slots = Vec::with_capacity(value.storage_dim());
        if geo_name(value).is_some() {
            let local = local_name(key, &mut taken);
            slots.extend((0..value.storage_dim()).map(|k| format!("{local}[{k}]")));
            storage_locals.insert(key, local);
        } else {
            layout.input_slots(key, value, false, &mut slots);
        }
        for (expr, access) in value.to_storage().iter().zip(slots) {
            if let Some(symbol) = expr.as_symbol() {
                accesses.insert(symbol.clone(), access);
            }
        }
    }

    let threshold = spec
        .config()
        .render()
        .zero_initialization_sparsity_threshold;
    let mut forms = Vec::with_capacity(spec.outputs().len());
    let mut all_terms = Vec::new();
    for (key, value) in spec.outputs().iter() {
        let (form, terms) = match (spec.sparse_layout(key), value) {
            (Some(csc), _) => (OutputForm::Sparse(csc), csc.nonzero_elements.clone()),
            (None, Value::Matrix(m)) if should_set_zero(m, threshold) => {
                (OutputForm::Zeroed, value.to_storage())
            }
            (None, _) => (OutputForm::Dense, value.to_storage()),
        };
        forms.push((key, local_name(key, &mut taken), value, form, terms.len()));
        all_terms.extend(terms);
    }

    writer.reserve(taken);
    let eliminated = eliminate(&all_terms, writer);
    let total_ops = eliminated
        .temps
        .iter()
        .map(|(_, e)| e.count_ops())
        .chain(eliminated.terms.iter().map(Expr::count_ops))
        .sum();

    let mut remaining = eliminated.terms.into_iter();
    let outputs = forms
        .into_iter()
        .map(|(key, local, value, form, len)| OutputPlan {
            key,
            local,
            value,
            form,
            terms: remaining.by_ref().take(len).collect(),
        })
        .collect();

    Body {
        accesses,
        storage_locals,
        temps: eliminated.temps,
        outputs,
        total_ops,
    }
}

/// Pair each slot with the terms it consumes. Structural zeros are dropped
/// for zero-filled outputs.
pub(crate) fn assignments(
    slots: Vec<Slot>,
    terms: &[Expr],
    skip_zeros: bool,
) -> Vec<(Slot, &[Expr])> {
    let mut out = Vec::with_capacity(slots.len());
    let mut offset = 0;
    for slot in slots {
        let width = match &slot {
            Slot::Entry(_) => 1,
            Slot::Geo { storage_dim, .. } => *storage_dim,
        };
        let end = (offset + width).min(terms.len());
        let chunk = &terms[offset..end];
        offset = end;
        if skip_zeros && matches!(slot, Slot::Entry(_)) && chunk.iter().all(Expr::is_zero) {
            continue;
        }
        out.push((slot, chunk));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use pretty_assertions::assert_eq;
    use symc_ir::{Matrix, Pose3, Values};

    fn layout(dialect: Dialect, use_eigen_types: bool) -> Layout {
        Layout {
            dialect,
            use_eigen_types,
        }
    }

    #[test]
    fn input_accesses_follow_storage_order() {
        let value = Value::Matrix(Matrix::symbolic("m", 2, 2));
        let mut cpp = Vec::new();
        layout(Dialect::Cpp, true).input_slots("m", &value, false, &mut cpp);
        assert_eq!(cpp, ["m(0, 0)", "m(1, 0)", "m(0, 1)", "m(1, 1)"]);

        let state = Value::Values(
            Values::new()
                .with("v", Matrix::symbolic("v", 2, 1))
                .with("pose", Pose3::symbolic("p")),
        );
        let mut py = Vec::new();
        layout(Dialect::Python, false).input_slots("state", &state, false, &mut py);
        assert_eq!(py[..3], ["state.v[0]", "state.v[1]", "state.pose.to_storage()[0]"]);
        assert_eq!(py.len(), 9);
    }

    #[test]
    fn geometric_outputs_are_single_slots() {
        let outputs = Value::Sequence(vec![
            Value::Pose3(Pose3::symbolic("a")),
            Value::Pose3(Pose3::symbolic("b")),
        ]);
        let mut slots = Vec::new();
        layout(Dialect::Cpp, true).output_slots("_res", &outputs, false, &mut slots);
        assert_eq!(
            slots[1],
            Slot::Geo {
                target: "_res[1]".to_owned(),
                type_name: "Pose3",
                storage_dim: 7,
            }
        );
    }

    #[test]
    fn plan_shares_terms_across_outputs() {
        let x = Expr::symbol("x");
        let y = Expr::symbol("y");
        let s = (&x + &y).sin();
        let inputs = Values::new().with("x", x.clone()).with("y", y.clone());
        let outputs = Values::new()
            .with("a", &s * &x)
            .with("b", Matrix::column(vec![s.clone(), Expr::zero(), Expr::zero()]));
        let spec = Codegen::builder(inputs, outputs, BackendConfig::default())
            .name("f")
            .build()
            .unwrap_or_else(|e| panic!("{e}"));

        let mut writer = SourceWriter::new("  ");
        let body = plan(&spec, layout(Dialect::Cpp, true), &mut writer);
        assert_eq!(body.temps.len(), 1);
        assert_eq!(body.temps[0].1.to_string(), "sin(x + y)");
        assert_eq!(body.outputs[1].terms.len(), 3);
        assert!(matches!(body.outputs[1].form, OutputForm::Zeroed));
        assert_eq!(body.accesses.get(&Symbol::new("y")).map(String::as_str), Some("y"));

        let mut slots = Vec::new();
        layout(Dialect::Cpp, true).output_slots("_b", body.outputs[1].value, false, &mut slots);
        let written = assignments(slots, &body.outputs[1].terms, true);
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].0, Slot::Entry("_b(0, 0)".to_owned()));
    }
}

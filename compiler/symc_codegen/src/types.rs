//! Composite type discovery and the shared-type registry.
//!
//! Every aggregate (`Values`) among a specification's inputs and outputs
//! becomes a generated composite type: `state` → `state_t`, and an aggregate
//! `inner` nested in it → `state_inner_t`. Sequences contribute the type of
//! their first element.
//!
//! The registry is owned by the caller and threaded through every
//! `generate` call. The first call that generates a type registers it; later
//! calls reuse it when the structure matches and fail with
//! [`CodegenError::TypeConflict`] when it does not.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use symc_ir::{Value, Values, ValuesIndex};
use tracing::debug;

use crate::error::{CodegenError, Result};

/// Kind of a composite type field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    Matrix { rows: usize, cols: usize },
    /// Geometric type by name (`Rot3`, `Pose3`, ...).
    Geo { name: &'static str, storage_dim: usize },
    /// Another generated composite type.
    Composite(String),
    Sequence { len: usize, element: Box<FieldKind> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
}

/// A composite type discovered in a specification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositeType {
    /// Generated type name, e.g. `state_inner_t`.
    pub name: String,
    /// Dotted key path of the aggregate, e.g. `state.inner`.
    pub key: String,
    pub index: ValuesIndex,
    pub fields: Vec<Field>,
}

/// A type registered by an earlier emission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SharedType {
    /// Qualified handle, `<namespace>.<type>`.
    pub handle: String,
    pub namespace: String,
    pub index: ValuesIndex,
}

/// Caller-owned registry of generated composite types, keyed by type name.
#[derive(Clone, Debug, Default)]
pub struct SharedTypes {
    types: IndexMap<String, SharedType>,
}

impl SharedTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, type_name: &str) -> Option<&SharedType> {
        self.types.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SharedType)> {
        self.types.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Register a type generated elsewhere, e.g. by another build step.
    pub fn insert(
        &mut self,
        type_name: impl Into<String>,
        namespace: impl Into<String>,
        index: ValuesIndex,
    ) {
        let type_name = type_name.into();
        let namespace = namespace.into();
        let handle = format!("{namespace}.{type_name}");
        self.types.insert(
            type_name,
            SharedType {
                handle,
                namespace,
                index,
            },
        );
    }

    pub(crate) fn register(&mut self, types: &[CompositeType], namespace: &str) {
        for ty in types {
            self.insert(ty.name.clone(), namespace, ty.index.clone());
        }
    }
}

/// Per-call emission caches, returned in the report.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmissionContext {
    /// Namespace of the generated function.
    pub namespace: String,
    /// Non-composite type names used by the function (`Scalar`, `Pose3`, ...).
    pub types_included: BTreeSet<String>,
    /// Aggregate key path → composite type name.
    pub typenames: BTreeMap<String, String>,
    /// Composite type name → namespace it lives in.
    pub namespaces: BTreeMap<String, String>,
}

impl EmissionContext {
    /// `namespace<sep>type_name`, using the namespace the type lives in.
    pub fn qualified(&self, type_name: &str, separator: &str) -> String {
        let namespace = self.namespaces.get(type_name).unwrap_or(&self.namespace);
        format!("{namespace}{separator}{type_name}")
    }
}

/// Everything found by walking inputs and outputs.
#[derive(Debug, Default)]
pub(crate) struct Discovered {
    /// Composite types, nested types before the types that hold them.
    pub composites: Vec<CompositeType>,
    pub types_included: BTreeSet<String>,
}

pub(crate) fn discover(inputs: &Values, outputs: &Values) -> Discovered {
    let mut found = Discovered::default();
    for (key, value) in inputs.iter().chain(outputs.iter()) {
        visit(key, key, value, &mut found);
    }
    found
}

fn visit(key_path: &str, type_stem: &str, value: &Value, found: &mut Discovered) {
    match value.base_instance() {
        Value::Values(values) => {
            let mut fields = Vec::with_capacity(values.len());
            for (key, field) in values.iter() {
                let stem = format!("{type_stem}_{key}");
                visit(&format!("{key_path}.{key}"), &stem, field, found);
                fields.push(Field {
                    name: key.to_owned(),
                    kind: field_kind(&stem, field),
                });
            }
            found.composites.push(CompositeType {
                name: format!("{type_stem}_t"),
                key: key_path.to_owned(),
                index: values.index(),
                fields,
            });
        }
        other => {
            found.types_included.insert(other.type_name());
        }
    }
}

/// Kind of `value` as a field; aggregates are named after `type_stem`.
pub(crate) fn field_kind(type_stem: &str, value: &Value) -> FieldKind {
    match value {
        Value::Scalar(_) => FieldKind::Scalar,
        Value::Matrix(m) => FieldKind::Matrix {
            rows: m.rows(),
            cols: m.cols(),
        },
        Value::Quaternion(_) => geo("Quaternion", value),
        Value::DualQuaternion(_) => geo("DualQuaternion", value),
        Value::Rot3(_) => geo("Rot3", value),
        Value::Pose3(_) => geo("Pose3", value),
        Value::Sequence(items) => FieldKind::Sequence {
            len: items.len(),
            element: Box::new(
                items
                    .first()
                    .map_or(FieldKind::Scalar, |v| field_kind(type_stem, v)),
            ),
        },
        Value::Values(_) => FieldKind::Composite(format!("{type_stem}_t")),
    }
}

fn geo(name: &'static str, value: &Value) -> FieldKind {
    FieldKind::Geo {
        name,
        storage_dim: value.storage_dim(),
    }
}

/// Discovered types split against the registry.
#[derive(Debug)]
pub(crate) struct Resolution {
    /// Types this call generates and will register.
    pub generate: Vec<CompositeType>,
    /// Types reused from the registry.
    pub reused: Vec<String>,
    pub context: EmissionContext,
}

/// Check discovered types against the registry without modifying it.
pub(crate) fn resolve(
    found: Discovered,
    registry: &SharedTypes,
    namespace: &str,
) -> Result<Resolution> {
    let mut context = EmissionContext {
        namespace: namespace.to_owned(),
        types_included: found.types_included,
        ..EmissionContext::default()
    };
    let mut generate: Vec<CompositeType> = Vec::new();
    let mut reused = Vec::new();
    let mut seen: FxHashMap<String, ValuesIndex> = FxHashMap::default();

    for ty in found.composites {
        context.typenames.insert(ty.key.clone(), ty.name.clone());
        if let Some(index) = seen.get(&ty.name) {
            if *index != ty.index {
                return Err(CodegenError::TypeConflict {
                    type_name: ty.name,
                    namespace: namespace.to_owned(),
                });
            }
            continue;
        }
        seen.insert(ty.name.clone(), ty.index.clone());

        match registry.get(&ty.name) {
            Some(shared) if shared.index == ty.index => {
                debug!(type_name = %ty.name, namespace = %shared.namespace, "reusing shared type");
                context.namespaces.insert(ty.name.clone(), shared.namespace.clone());
                reused.push(ty.name);
            }
            Some(shared) => {
                return Err(CodegenError::TypeConflict {
                    type_name: ty.name,
                    namespace: shared.namespace.clone(),
                });
            }
            None => {
                context.namespaces.insert(ty.name.clone(), namespace.to_owned());
                generate.push(ty);
            }
        }
    }

    Ok(Resolution {
        generate,
        reused,
        context,
    })
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]

//! Symbolic values and ordered aggregates of them.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::expr::Expr;
use crate::geo::{DualQuaternion, Pose3, Quaternion, Rot3};
use crate::index::{IndexEntry, Shape, ValuesIndex};
use crate::matrix::Matrix;
use crate::symbol::Symbol;

/// A symbolic value: a scalar, a matrix, a geometric value, a homogeneous
/// sequence or a nested aggregate.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Value {
    Scalar(Expr),
    Matrix(Matrix),
    Quaternion(Quaternion),
    DualQuaternion(DualQuaternion),
    Rot3(Rot3),
    Pose3(Pose3),
    Sequence(Vec<Value>),
    Values(Values),
}

impl Value {
    /// Type name used in docstrings and include resolution.
    pub fn type_name(&self) -> String {
        match self {
            Value::Scalar(_) => "Scalar".to_owned(),
            Value::Matrix(m) if m.rows() <= 9 && m.cols() <= 9 => {
                format!("Matrix{}{}", m.rows(), m.cols())
            }
            Value::Matrix(_) => "Matrix".to_owned(),
            Value::Quaternion(_) => "Quaternion".to_owned(),
            Value::DualQuaternion(_) => "DualQuaternion".to_owned(),
            Value::Rot3(_) => "Rot3".to_owned(),
            Value::Pose3(_) => "Pose3".to_owned(),
            Value::Sequence(_) => "list".to_owned(),
            Value::Values(_) => "Values".to_owned(),
        }
    }

    /// Flattened storage, in the fixed per-type order.
    pub fn to_storage(&self) -> Vec<Expr> {
        let mut out = Vec::new();
        self.extend_storage(&mut out);
        out
    }

    fn extend_storage(&self, out: &mut Vec<Expr>) {
        match self {
            Value::Scalar(e) => out.push(e.clone()),
            Value::Matrix(m) => out.extend(m.to_storage()),
            Value::Quaternion(q) => out.extend(q.to_storage()),
            Value::DualQuaternion(d) => out.extend(d.to_storage()),
            Value::Rot3(r) => out.extend(r.to_storage()),
            Value::Pose3(p) => out.extend(p.to_storage()),
            Value::Sequence(items) => {
                for item in items {
                    item.extend_storage(out);
                }
            }
            Value::Values(values) => {
                for value in values.values() {
                    value.extend_storage(out);
                }
            }
        }
    }

    pub fn storage_dim(&self) -> usize {
        match self {
            Value::Scalar(_) => 1,
            Value::Matrix(m) => m.len(),
            Value::Quaternion(_) => Quaternion::STORAGE_DIM,
            Value::DualQuaternion(_) => DualQuaternion::STORAGE_DIM,
            Value::Rot3(_) => Rot3::STORAGE_DIM,
            Value::Pose3(_) => Pose3::STORAGE_DIM,
            Value::Sequence(items) => items.iter().map(Value::storage_dim).sum(),
            Value::Values(values) => values.storage_dim(),
        }
    }

    pub fn free_symbols(&self) -> BTreeSet<Symbol> {
        let mut out = BTreeSet::new();
        for e in self.to_storage() {
            e.collect_free_symbols(&mut out);
        }
        out
    }

    /// Substitute symbols in every storage slot, keeping the value's shape.
    pub fn subs(&self, map: &FxHashMap<Symbol, Expr>) -> Value {
        let q = |q: &Quaternion| Quaternion {
            x: q.x.subs(map),
            y: q.y.subs(map),
            z: q.z.subs(map),
            w: q.w.subs(map),
        };
        match self {
            Value::Scalar(e) => Value::Scalar(e.subs(map)),
            Value::Matrix(m) => Value::Matrix(m.subs(map)),
            Value::Quaternion(v) => Value::Quaternion(q(v)),
            Value::DualQuaternion(d) => Value::DualQuaternion(DualQuaternion {
                real: q(&d.real),
                inf: q(&d.inf),
            }),
            Value::Rot3(r) => Value::Rot3(Rot3::from_quaternion(q(&r.q))),
            Value::Pose3(p) => Value::Pose3(Pose3 {
                rotation: Rot3::from_quaternion(q(&p.rotation.q)),
                position: p.position.subs(map),
            }),
            Value::Sequence(items) => Value::Sequence(items.iter().map(|v| v.subs(map)).collect()),
            Value::Values(values) => Value::Values(values.subs(map)),
        }
    }

    /// The representative element used for type discovery: the value
    /// itself, or the first element (recursively) of a sequence.
    pub fn base_instance(&self) -> &Value {
        match self {
            Value::Sequence(items) => items.first().map_or(self, Value::base_instance),
            _ => self,
        }
    }

    /// Layout shape of this value.
    pub fn shape(&self) -> Shape {
        match self {
            Value::Scalar(_) => Shape::Scalar,
            Value::Matrix(m) => Shape::Matrix {
                rows: m.rows(),
                cols: m.cols(),
            },
            Value::Quaternion(_) => Shape::Geo("Quaternion"),
            Value::DualQuaternion(_) => Shape::Geo("DualQuaternion"),
            Value::Rot3(_) => Shape::Geo("Rot3"),
            Value::Pose3(_) => Shape::Geo("Pose3"),
            Value::Sequence(items) => Shape::Sequence {
                len: items.len(),
                element: Box::new(items.first().map_or(Shape::Scalar, Value::shape)),
            },
            Value::Values(values) => Shape::Values(values.index()),
        }
    }

    pub fn as_matrix(&self) -> Option<&Matrix> {
        match self {
            Value::Matrix(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_values(&self) -> Option<&Values> {
        match self {
            Value::Values(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Expr> for Value {
    fn from(e: Expr) -> Self {
        Value::Scalar(e)
    }
}

impl From<Matrix> for Value {
    fn from(m: Matrix) -> Self {
        Value::Matrix(m)
    }
}

impl From<Rot3> for Value {
    fn from(r: Rot3) -> Self {
        Value::Rot3(r)
    }
}

impl From<Pose3> for Value {
    fn from(p: Pose3) -> Self {
        Value::Pose3(p)
    }
}

impl From<Quaternion> for Value {
    fn from(q: Quaternion) -> Self {
        Value::Quaternion(q)
    }
}

impl From<DualQuaternion> for Value {
    fn from(d: DualQuaternion) -> Self {
        Value::DualQuaternion(d)
    }
}

impl From<Values> for Value {
    fn from(v: Values) -> Self {
        Value::Values(v)
    }
}

/// An ordered aggregate of named values.
///
/// Keys are unique; insertion order is declaration order and is preserved
/// through every transformation.
#[derive(Clone, Debug, Default)]
pub struct Values {
    entries: IndexMap<String, Value>,
}

// `IndexMap` equality ignores order; aggregates compare in declaration order.
impl PartialEq for Values {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self.entries.iter().zip(&other.entries).all(|(a, b)| a == b)
    }
}

impl Eq for Values {}

impl std::hash::Hash for Values {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.entries.len().hash(state);
        for (key, value) in &self.entries {
            key.hash(state);
            value.hash(state);
        }
    }
}

impl Values {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `key`. A replaced key keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Builder-style [`Values::insert`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Remove `key`, preserving the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Declaration position of `key`.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.entries.get_index_of(key)
    }

    pub fn get_index(&self, index: usize) -> Option<(&str, &Value)> {
        self.entries.get_index(index).map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn storage_dim(&self) -> usize {
        self.entries.values().map(Value::storage_dim).sum()
    }

    pub fn to_storage(&self) -> Vec<Expr> {
        self.entries.values().flat_map(Value::to_storage).collect()
    }

    pub fn free_symbols(&self) -> BTreeSet<Symbol> {
        let mut out = BTreeSet::new();
        for value in self.entries.values() {
            out.extend(value.free_symbols());
        }
        out
    }

    pub fn subs(&self, map: &FxHashMap<Symbol, Expr>) -> Values {
        Values {
            entries: self
                .entries
                .iter()
                .map(|(k, v)| (k.clone(), v.subs(map)))
                .collect(),
        }
    }

    /// Structural description of the flattened layout.
    pub fn index(&self) -> ValuesIndex {
        let mut offset = 0;
        let mut entries = Vec::with_capacity(self.entries.len());
        for (key, value) in &self.entries {
            let storage_dim = value.storage_dim();
            entries.push((
                key.clone(),
                IndexEntry {
                    offset,
                    storage_dim,
                    shape: value.shape(),
                },
            ));
            offset += storage_dim;
        }
        ValuesIndex::new(entries)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Values {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = Values::new();
        for (k, v) in iter {
            values.insert(k, v);
        }
        values
    }
}

impl<'a> IntoIterator for &'a Values {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

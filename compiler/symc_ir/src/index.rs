//! Flattened layout descriptions.
//!
//! A [`ValuesIndex`] records, per key, where a value lives in the flattened
//! storage of its aggregate and what shape it has. Two aggregates with equal
//! indices generate the same composite type, so the index doubles as the
//! structural identity used by type deduplication.

/// Shape of one entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    Scalar,
    Matrix { rows: usize, cols: usize },
    /// A geometric value, by type name.
    Geo(&'static str),
    Sequence { len: usize, element: Box<Shape> },
    Values(ValuesIndex),
}

/// Location and shape of one entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IndexEntry {
    pub offset: usize,
    pub storage_dim: usize,
    pub shape: Shape,
}

/// Ordered layout of an aggregate.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ValuesIndex {
    entries: Vec<(String, IndexEntry)>,
}

impl ValuesIndex {
    pub fn new(entries: Vec<(String, IndexEntry)>) -> Self {
        ValuesIndex { entries }
    }

    pub fn get(&self, key: &str) -> Option<&IndexEntry> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, e)| e)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndexEntry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total flattened size.
    pub fn storage_dim(&self) -> usize {
        self.entries.last().map_or(0, |(_, e)| e.offset + e.storage_dim)
    }
}

//! BTreeMap-based index structures
//!
//! Indexes use BTreeMap<IndexKey, BTreeSet<IndexKey>> (field value to
//! identities) for deterministic ordering.

use std::collections::{BTreeMap, BTreeSet};

use crate::record::Value;

/// Index key representing a field value.
///
/// Ordering is deterministic: Bool < Int < Float < String < Symbol < Bytes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexKey {
    /// Boolean value (false < true)
    Bool(bool),
    /// Any integer width, widened so u64 fits
    Int(i128),
    /// Float value (stored as bits for total ordering)
    Float(u64),
    /// String value
    String(String),
    /// Enum symbol
    Symbol(String),
    /// Byte sequence
    Bytes(Vec<u8>),
}

impl IndexKey {
    /// Create a key from a float
    ///
    /// Uses bit representation for total ordering.
    pub fn from_float(v: f64) -> Self {
        let bits = v.to_bits();
        let ordered = if (bits >> 63) == 1 {
            !bits // Negative: flip all bits
        } else {
            bits ^ (1 << 63) // Positive: flip sign bit
        };
        IndexKey::Float(ordered)
    }

    /// Create a key from a record value
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Bool(b) => IndexKey::Bool(*b),
            Value::Int32(v) => IndexKey::Int(*v as i128),
            Value::Int64(v) => IndexKey::Int(*v as i128),
            Value::UInt32(v) => IndexKey::Int(*v as i128),
            Value::UInt64(v) => IndexKey::Int(*v as i128),
            Value::Float(v) => IndexKey::from_float(*v as f64),
            Value::Double(v) => IndexKey::from_float(*v),
            Value::String(s) => IndexKey::String(s.clone()),
            Value::Enum(s) => IndexKey::Symbol(s.clone()),
            Value::Bytes(b) => IndexKey::Bytes(b.clone()),
        }
    }
}

/// A single field index mapping values to the identities holding them.
#[derive(Debug, Default)]
pub struct IndexTree {
    tree: BTreeMap<IndexKey, BTreeSet<IndexKey>>,
}

impl IndexTree {
    /// Creates a new empty index tree
    pub fn new() -> Self {
        Self {
            tree: BTreeMap::new(),
        }
    }

    /// Insert an identity for a key
    pub fn insert(&mut self, key: IndexKey, identity: IndexKey) {
        self.tree.entry(key).or_default().insert(identity);
    }

    /// Remove an identity for a key.
    ///
    /// If the key has no more identities, removes the key entirely.
    pub fn remove(&mut self, key: &IndexKey, identity: &IndexKey) {
        if let Some(identities) = self.tree.get_mut(key) {
            identities.remove(identity);
            if identities.is_empty() {
                self.tree.remove(key);
            }
        }
    }

    /// Identities for an exact key match, ascending
    pub fn lookup_eq(&self, key: &IndexKey) -> Vec<IndexKey> {
        self.tree
            .get(key)
            .map(|identities| identities.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Clear all entries
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Returns the number of distinct keys
    pub fn key_count(&self) -> usize {
        self.tree.len()
    }
}

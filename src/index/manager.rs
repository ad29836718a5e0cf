//! Record index
//!
//! Holds full records by identity plus one [`IndexTree`] per secondary
//! index field. Rebuilt from a full scan, then kept current by applying
//! writes and deletes after the backing store has accepted them.
//!
//! # API
//!
//! - `rebuild(records)` - Replace contents from a scan
//! - `apply_write(record)` - Insert or replace a record
//! - `apply_delete(identity)` - Remove a record
//! - `lookup_identity(value)` - Exact identity match
//! - `lookup_eq(field, value)` - Exact secondary index match
//! - `all()` - Every record in identity order

use std::collections::BTreeMap;

use super::btree::{IndexKey, IndexTree};
use crate::record::{Record, Value};
use crate::schema::FieldId;
use crate::store::{StoreError, StoreResult};

/// Identity and secondary index maps over full records
#[derive(Debug)]
pub struct RecordIndex {
    identity: FieldId,
    records: BTreeMap<IndexKey, Record>,
    field_indexes: Vec<(FieldId, IndexTree)>,
}

impl RecordIndex {
    /// Creates an empty index over the given identity and index fields
    pub fn new(identity: FieldId, indexed_fields: impl IntoIterator<Item = FieldId>) -> Self {
        Self {
            identity,
            records: BTreeMap::new(),
            field_indexes: indexed_fields
                .into_iter()
                .map(|field| (field, IndexTree::new()))
                .collect(),
        }
    }

    /// Replaces the contents with a full scan.
    ///
    /// Fails on the first record without an identity or the first scan error.
    pub fn rebuild<I>(&mut self, records: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = StoreResult<Record>>,
    {
        self.clear();
        for record in records {
            self.apply_write(record?)?;
        }
        Ok(())
    }

    /// Inserts or replaces a record, re-indexing its secondary fields
    pub fn apply_write(&mut self, record: Record) -> StoreResult<()> {
        let key = self.identity_key(&record)?;
        if let Some(previous) = self.records.remove(&key) {
            self.unindex(&key, &previous);
        }
        for (field, tree) in &mut self.field_indexes {
            if let Some(value) = record.get(*field) {
                tree.insert(IndexKey::from_value(value), key.clone());
            }
        }
        self.records.insert(key, record);
        Ok(())
    }

    /// Removes the record with the given identity, returning it
    pub fn apply_delete(&mut self, identity: &Value) -> Option<Record> {
        let key = IndexKey::from_value(identity);
        let removed = self.records.remove(&key)?;
        self.unindex(&key, &removed);
        Some(removed)
    }

    /// Record with an exact identity
    pub fn lookup_identity(&self, identity: &Value) -> Option<&Record> {
        self.records.get(&IndexKey::from_value(identity))
    }

    /// Records whose indexed field equals the value.
    ///
    /// None if the field is not indexed here.
    pub fn lookup_eq(&self, field: FieldId, value: &Value) -> Option<Vec<Record>> {
        let (_, tree) = self.field_indexes.iter().find(|(f, _)| *f == field)?;
        let records = tree
            .lookup_eq(&IndexKey::from_value(value))
            .iter()
            .filter_map(|key| self.records.get(key).cloned())
            .collect();
        Some(records)
    }

    /// Every record in identity order
    pub fn all(&self) -> Vec<Record> {
        self.records.values().cloned().collect()
    }

    /// Number of indexed records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing is indexed
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drops all records and index entries
    pub fn clear(&mut self) {
        self.records.clear();
        for (_, tree) in &mut self.field_indexes {
            tree.clear();
        }
    }

    fn identity_key(&self, record: &Record) -> StoreResult<IndexKey> {
        record
            .get(self.identity)
            .map(IndexKey::from_value)
            .ok_or_else(|| StoreError::MissingField {
                field: record
                    .schema()
                    .field(self.identity)
                    .map(|f| f.name.clone())
                    .unwrap_or_default(),
                operation: "indexing",
            })
    }

    fn unindex(&mut self, key: &IndexKey, record: &Record) {
        for (field, tree) in &mut self.field_indexes {
            if let Some(value) = record.get(*field) {
                tree.remove(&IndexKey::from_value(value), key);
            }
        }
    }
}

//! Sort-field ordering for the in-memory store

use std::cmp::Ordering;

use crate::record::Record;
use crate::schema::FieldId;
use crate::store::SortOrder;

/// Compares records on one sort field.
///
/// Ordering rules:
/// - absent < present
/// - present values compare naturally (floats by total order)
/// - mismatched value types compare equal
#[derive(Debug, Clone, Copy)]
pub struct RecordComparator {
    field: FieldId,
    order: SortOrder,
}

impl RecordComparator {
    pub fn new(field: FieldId, order: SortOrder) -> Self {
        Self { field, order }
    }

    /// Compares two records in the configured direction
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        let ordering = match (a.get(self.field), b.get(self.field)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a_val), Some(b_val)) => a_val.compare(b_val).unwrap_or(Ordering::Equal),
        };
        self.order.apply(ordering)
    }

    /// Position at which `record` keeps `sorted` ordered.
    ///
    /// Binary search past every element that compares equal, so ties keep
    /// insertion order.
    pub fn insertion_point(&self, sorted: &[Record], record: &Record) -> usize {
        sorted.partition_point(|existing| self.compare(existing, record) != Ordering::Greater)
    }

    /// Stable re-sort after a sort key changed in place
    pub fn sort(&self, records: &mut [Record]) {
        records.sort_by(|a, b| self.compare(a, b));
    }
}

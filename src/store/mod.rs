//! Store contract shared by every backend
//!
//! # Operation surface
//!
//! - `create(candidate)` - allocate identity, initialise version, store
//! - `read(filter)` - identity, then first set index field, then everything
//! - `read_one(filter)` - first match of `read` or NotFound
//! - `update(candidate)` - version-gated wholesale replacement
//! - `delete(record)` - version-gated removal
//! - `close()` - idempotent release of backend resources
//!
//! # Invariants
//!
//! - A store is built once from a validated [`StoreLayout`] and never
//!   changes its field roles afterwards
//! - Two updates that loaded the same version cannot both succeed
//! - Every failure is returned to the caller; only identity collisions are
//!   retried internally

mod config;
mod errors;
mod sequence;
mod version;

use std::sync::Arc;

pub use config::{Selection, SortOrder, SortSpec, StoreConfig, StoreLayout};
pub use errors::{ErrorKind, StoreError, StoreResult};
pub use sequence::{Cursor, RecordSequence, SnapshotCursor};
pub use version::{initial_version, next_version, INITIAL_VERSION};

use crate::record::Record;
use crate::schema::Schema;

/// CRUD storage for records of one schema
pub trait RecordStore: Send + Sync {
    /// Schema this store was built for
    fn schema(&self) -> &Arc<Schema>;

    /// Stores a new record and returns the stored snapshot
    fn create(&self, candidate: Record) -> StoreResult<Record>;

    /// Reads the records selected by the filter
    fn read(&self, filter: &Record) -> StoreResult<RecordSequence>;

    /// Replaces an existing record and returns the stored snapshot
    fn update(&self, candidate: Record) -> StoreResult<Record>;

    /// Removes an existing record
    fn delete(&self, record: &Record) -> StoreResult<()>;

    /// Releases backend resources. Idempotent.
    fn close(&self) -> StoreResult<()>;

    /// First record selected by the filter
    fn read_one(&self, filter: &Record) -> StoreResult<Record> {
        let mut records = self.read(filter)?;
        match records.next() {
            Some(record) => {
                let record = record?;
                records.close()?;
                Ok(record)
            }
            None => Err(StoreError::NotFound(filter.to_string())),
        }
    }

    /// Empty filter record for this store's schema
    fn prototype(&self) -> Record {
        Record::new(self.schema().clone())
    }
}

impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    fn schema(&self) -> &Arc<Schema> {
        (**self).schema()
    }

    fn create(&self, candidate: Record) -> StoreResult<Record> {
        (**self).create(candidate)
    }

    fn read(&self, filter: &Record) -> StoreResult<RecordSequence> {
        (**self).read(filter)
    }

    fn update(&self, candidate: Record) -> StoreResult<Record> {
        (**self).update(candidate)
    }

    fn delete(&self, record: &Record) -> StoreResult<()> {
        (**self).delete(record)
    }

    fn close(&self) -> StoreResult<()> {
        (**self).close()
    }

    fn read_one(&self, filter: &Record) -> StoreResult<Record> {
        (**self).read_one(filter)
    }
}

/// Rejects records built for a different schema
pub(crate) fn check_schema(schema: &Arc<Schema>, record: &Record) -> StoreResult<()> {
    if record.is_instance_of(schema) {
        Ok(())
    } else {
        Err(StoreError::SchemaMismatch {
            expected: schema.name.clone(),
            found: record.schema().name.clone(),
        })
    }
}

/// Identity value of a record addressed by update/delete
pub(crate) fn require_identity<'a>(
    layout: &StoreLayout,
    record: &'a Record,
    operation: &'static str,
) -> StoreResult<&'a crate::record::Value> {
    record
        .get(layout.identity().id())
        .ok_or_else(|| StoreError::MissingField {
            field: layout.identity().name().to_string(),
            operation,
        })
}

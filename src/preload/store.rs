//! Preloading cache store

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::index::RecordIndex;
use crate::record::Record;
use crate::schema::Schema;
use crate::store::{
    check_schema, require_identity, RecordSequence, RecordStore, Selection, StoreConfig,
    StoreError, StoreLayout, StoreResult,
};

/// Read-through cache over a backing store.
///
/// The whole backing store is scanned into a [`RecordIndex`] at
/// construction. Reads are answered from the index alone, in identity
/// order; the backing store's sort order is not reproduced. Writes go to
/// the backing store first and reach the index only when they succeed.
///
/// Writers that bypass this wrapper leave the index stale.
pub struct PreloadStore<S: RecordStore> {
    backing: S,
    layout: StoreLayout,
    index: RwLock<RecordIndex>,
    closed: AtomicBool,
}

impl<S: RecordStore> PreloadStore<S> {
    /// Wraps a backing store and loads its full contents.
    ///
    /// The configuration's identity and index fields drive the cache.
    pub fn new(backing: S, config: &StoreConfig) -> StoreResult<Self> {
        let layout = config.resolve(backing.schema())?;
        let mut index = RecordIndex::new(
            layout.identity().id(),
            layout.indexes().iter().map(|f| f.id()),
        );

        let scan = backing.read(&backing.prototype())?;
        index.rebuild(scan)?;

        info!(
            schema = %backing.schema().name,
            records = index.len(),
            indexes = layout.indexes().len(),
            "preload store ready"
        );

        Ok(Self {
            backing,
            layout,
            index: RwLock::new(index),
            closed: AtomicBool::new(false),
        })
    }

    /// Backing store
    pub fn backing(&self) -> &S {
        &self.backing
    }

    /// Validated field roles of the cache
    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Number of cached records
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    /// True when nothing is cached
    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

impl<S: RecordStore> RecordStore for PreloadStore<S> {
    fn schema(&self) -> &Arc<Schema> {
        self.backing.schema()
    }

    fn create(&self, candidate: Record) -> StoreResult<Record> {
        self.ensure_open()?;
        // held across the delegate call so index updates land in backing order
        let mut index = self.index.write();
        let created = self.backing.create(candidate)?;
        index.apply_write(created.clone())?;
        Ok(created)
    }

    fn read(&self, filter: &Record) -> StoreResult<RecordSequence> {
        self.ensure_open()?;
        check_schema(self.schema(), filter)?;

        let index = self.index.read();
        let records: Vec<Record> = match self.layout.select(filter) {
            Selection::Identity(identity) => {
                index.lookup_identity(identity).cloned().into_iter().collect()
            }
            Selection::Index(field, value) => {
                index.lookup_eq(field.id(), value).unwrap_or_default()
            }
            Selection::All => index.all(),
        };
        Ok(RecordSequence::from_records(records))
    }

    fn update(&self, candidate: Record) -> StoreResult<Record> {
        self.ensure_open()?;
        let mut index = self.index.write();
        let updated = self.backing.update(candidate)?;
        index.apply_write(updated.clone())?;
        Ok(updated)
    }

    fn delete(&self, record: &Record) -> StoreResult<()> {
        self.ensure_open()?;
        let mut index = self.index.write();
        self.backing.delete(record)?;
        let identity = require_identity(&self.layout, record, "delete")?;
        if index.apply_delete(identity).is_none() {
            debug!(schema = %self.schema().name, %identity, "deleted record was not cached");
        }
        Ok(())
    }

    fn close(&self) -> StoreResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.index.write().clear();
        info!(schema = %self.schema().name, "preload store closed");
        self.backing.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::record::Value;
    use crate::schema::FieldType;
    use crate::store::{ErrorKind, SortOrder};

    fn task_schema() -> Arc<Schema> {
        Arc::new(
            Schema::builder("Task")
                .field("urn", FieldType::String)
                .field("path", FieldType::String)
                .field("runTime", FieldType::Int64)
                .field("vector", FieldType::Int64)
                .build()
                .unwrap(),
        )
    }

    fn config() -> StoreConfig {
        StoreConfig::new("urn")
            .with_index("path")
            .with_sort("runTime", SortOrder::Ascending)
            .with_version("vector")
    }

    fn task<S: RecordStore>(store: &S, path: &str, run_time: i64) -> Record {
        store
            .prototype()
            .with("path", path)
            .unwrap()
            .with("runTime", run_time)
            .unwrap()
    }

    fn seeded() -> (Arc<InMemoryStore>, Vec<Record>) {
        let backing = Arc::new(InMemoryStore::new(task_schema(), &config()).unwrap());
        let created = vec![
            backing.create(task(&backing, "/x", 10)).unwrap(),
            backing.create(task(&backing, "/x", 5)).unwrap(),
            backing.create(task(&backing, "/y", 7)).unwrap(),
        ];
        (backing, created)
    }

    #[test]
    fn test_build_loads_everything() {
        let (backing, created) = seeded();
        let store = PreloadStore::new(backing, &config()).unwrap();
        assert_eq!(store.len(), 3);

        let filter = store.prototype().with("path", "/x").unwrap();
        let found = store.read(&filter).unwrap().collect_records().unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.contains(&created[0]) && found.contains(&created[1]));
    }

    #[test]
    fn test_reads_do_not_reach_backing() {
        let (backing, created) = seeded();
        let store = PreloadStore::new(backing.clone(), &config()).unwrap();

        // a write that bypasses the cache stays invisible to it
        backing.delete(&created[2]).unwrap();
        let filter = store
            .prototype()
            .with("urn", created[2].get_by_name("urn").unwrap().clone())
            .unwrap();
        assert_eq!(store.read_one(&filter).unwrap(), created[2]);
    }

    #[test]
    fn test_writes_keep_index_current() {
        let (backing, _) = seeded();
        let store = PreloadStore::new(backing.clone(), &config()).unwrap();

        let created = store.create(task(&store, "/z", 1)).unwrap();
        let moved = store.update(created.clone().with("path", "/w").unwrap()).unwrap();
        assert_eq!(moved.get_by_name("vector"), Some(&Value::Int64(1)));

        let by_old_path = store.prototype().with("path", "/z").unwrap();
        assert!(!store.read(&by_old_path).unwrap().has_next().unwrap());
        let by_new_path = store.prototype().with("path", "/w").unwrap();
        assert_eq!(store.read_one(&by_new_path).unwrap(), moved);

        store.delete(&moved).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(backing.len(), 3);
    }

    #[test]
    fn test_failed_write_leaves_index_untouched() {
        let (backing, created) = seeded();
        let store = PreloadStore::new(backing, &config()).unwrap();

        store.update(created[0].clone()).unwrap();
        let stale = created[0].clone().with("path", "/stale").unwrap();
        assert_eq!(
            store.update(stale).unwrap_err().kind(),
            ErrorKind::VersionConflict
        );
        let filter = store.prototype().with("path", "/stale").unwrap();
        assert!(store.read(&filter).unwrap().collect_records().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_identity_reads_empty() {
        let (backing, _) = seeded();
        let store = PreloadStore::new(backing, &config()).unwrap();
        let filter = store.prototype().with("urn", "missing").unwrap();
        assert!(store.read(&filter).unwrap().collect_records().unwrap().is_empty());
        assert_eq!(store.read_one(&filter).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_close_closes_backing() {
        let (backing, _) = seeded();
        let store = PreloadStore::new(backing.clone(), &config()).unwrap();
        store.close().unwrap();
        store.close().unwrap();
        assert!(store.is_empty());
        assert_eq!(
            backing.read(&backing.prototype()).unwrap_err().kind(),
            ErrorKind::Closed
        );
    }
}

//! In-memory reference store
//!
//! Records live in one ordered `Vec` guarded by a single mutex per store:
//! every create, read, update and delete runs inside that one critical
//! section, which is what makes the version check race free.
//!
//! Costs with N stored records:
//! - create: O(N) collision scan + O(log N) search + O(N) shift
//! - read: O(N) scan and snapshot copy
//! - update: O(N) lookup + re-sort (near sorted, so close to linear)
//! - delete: O(N)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::sorter::RecordComparator;
use crate::record::{Record, Value};
use crate::schema::{FieldType, Schema, SchemaError};
use crate::store::{
    check_schema, initial_version, next_version, require_identity, RecordSequence, RecordStore,
    Selection, StoreConfig, StoreError, StoreLayout, StoreResult,
};

/// Collisions beyond this many in a row mean identity generation is broken
const SUSPICIOUS_COLLISIONS: u32 = 8;

/// In-memory reference implementation of [`RecordStore`].
///
/// Identities are random version 4 UUID strings, so the identity field must
/// be a string field.
pub struct InMemoryStore {
    schema: Arc<Schema>,
    layout: StoreLayout,
    comparator: Option<RecordComparator>,
    data: Mutex<Vec<Record>>,
    closed: AtomicBool,
}

impl InMemoryStore {
    /// Builds a store from a validated configuration
    pub fn new(schema: Arc<Schema>, config: &StoreConfig) -> StoreResult<Self> {
        let layout = config.resolve(&schema)?;

        let identity = layout.identity();
        if *identity.field_type() != FieldType::String {
            return Err(SchemaError::InvalidRole {
                field: identity.name().to_string(),
                role: "identity",
                found: identity.field_type().type_name(),
                reason: "generated identities are UUID strings",
            }
            .into());
        }

        let comparator = layout
            .sort()
            .map(|(field, order)| RecordComparator::new(field.id(), order));

        info!(
            schema = %schema.name,
            identity = identity.name(),
            indexes = layout.indexes().len(),
            sorted = comparator.is_some(),
            versioned = layout.version().is_some(),
            "in-memory store ready"
        );

        Ok(Self {
            schema,
            layout,
            comparator,
            data: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        })
    }

    /// Validated field roles
    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    /// True when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.data.lock().is_empty()
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn position_of(&self, data: &[Record], identity: &Value) -> Option<usize> {
        let field = self.layout.identity().id();
        data.iter().position(|r| r.get(field) == Some(identity))
    }

    /// Fresh identity not used by any stored record
    fn allocate_identity(&self, data: &[Record]) -> Value {
        let mut collisions = 0u32;
        loop {
            let candidate = Value::String(Uuid::new_v4().to_string());
            if self.position_of(data, &candidate).is_none() {
                return candidate;
            }
            collisions += 1;
            warn!(schema = %self.schema.name, collisions, "identity collision, regenerating");
            debug_assert!(
                collisions < SUSPICIOUS_COLLISIONS,
                "identity generator keeps colliding"
            );
        }
    }

    /// Checks the candidate's version against the stored one.
    ///
    /// Returns the stored record's successor version on a match.
    fn check_version(
        &self,
        stored: &Record,
        candidate: &Record,
        operation: &str,
    ) -> StoreResult<Option<Value>> {
        let Some(version) = self.layout.version() else {
            return Ok(None);
        };
        let identity = self.layout.identity().id();
        let current = stored.get(version.id());
        match candidate.get(version.id()) {
            None => Err(StoreError::VersionConflict(format!(
                "{} of {} is missing version field '{}'",
                operation,
                stored.get(identity).map(|v| v.to_string()).unwrap_or_default(),
                version.name()
            ))),
            Some(given) if Some(given) != current => Err(StoreError::VersionConflict(format!(
                "{} of {} carries version {} but stored version is {}",
                operation,
                stored.get(identity).map(|v| v.to_string()).unwrap_or_default(),
                given,
                current.map(|v| v.to_string()).unwrap_or_else(|| "absent".into())
            ))),
            Some(given) => Ok(next_version(given)),
        }
    }
}

impl RecordStore for InMemoryStore {
    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn create(&self, mut candidate: Record) -> StoreResult<Record> {
        self.ensure_open()?;
        check_schema(&self.schema, &candidate)?;

        let mut data = self.data.lock();

        let identity = self.allocate_identity(&data);
        candidate.put(self.layout.identity().id(), Some(identity));
        if let Some(version) = self.layout.version() {
            candidate.put(version.id(), Some(initial_version(version.field_type())));
        }

        let position = match &self.comparator {
            Some(comparator) => comparator.insertion_point(&data, &candidate),
            None => data.len(),
        };
        data.insert(position, candidate.clone());

        debug!(schema = %self.schema.name, position, "created record");
        Ok(candidate)
    }

    fn read(&self, filter: &Record) -> StoreResult<RecordSequence> {
        self.ensure_open()?;
        check_schema(&self.schema, filter)?;

        let data = self.data.lock();
        let snapshot: Vec<Record> = match self.layout.select(filter) {
            Selection::Identity(identity) => {
                let field = self.layout.identity().id();
                data.iter()
                    .filter(|r| r.get(field) == Some(identity))
                    .cloned()
                    .collect()
            }
            Selection::Index(field, value) => data
                .iter()
                .filter(|r| r.get(field.id()) == Some(value))
                .cloned()
                .collect(),
            Selection::All => data.clone(),
        };

        Ok(RecordSequence::from_records(snapshot))
    }

    fn update(&self, mut candidate: Record) -> StoreResult<Record> {
        self.ensure_open()?;
        check_schema(&self.schema, &candidate)?;
        let identity = require_identity(&self.layout, &candidate, "update")?.clone();

        let mut data = self.data.lock();
        let position = self.position_of(&data, &identity).ok_or_else(|| {
            StoreError::NotFound(format!("{} {} cannot be updated", self.schema.name, identity))
        })?;

        if let Some(next) = self.check_version(&data[position], &candidate, "update")? {
            if let Some(version) = self.layout.version() {
                debug!(schema = %self.schema.name, %identity, version = %next, "version advanced");
                candidate.put(version.id(), Some(next));
            }
        }

        data[position] = candidate.clone();
        if let Some(comparator) = &self.comparator {
            comparator.sort(&mut data);
        }

        Ok(candidate)
    }

    fn delete(&self, record: &Record) -> StoreResult<()> {
        self.ensure_open()?;
        check_schema(&self.schema, record)?;
        let identity = require_identity(&self.layout, record, "delete")?;

        let mut data = self.data.lock();
        let position = self.position_of(&data, identity).ok_or_else(|| {
            StoreError::NotFound(format!("{} {} cannot be deleted", self.schema.name, identity))
        })?;
        self.check_version(&data[position], record, "delete")?;

        data.remove(position);
        debug!(schema = %self.schema.name, %identity, "deleted record");
        Ok(())
    }

    fn close(&self) -> StoreResult<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.data.lock().clear();
            info!(schema = %self.schema.name, "in-memory store closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ErrorKind, SortOrder};

    const TEST_PATH: &str = "/path";
    const HOME_PATH: &str = "/";

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

    fn build_store() -> InMemoryStore {
        let config = StoreConfig::new("urn")
            .with_index("path")
            .with_sort("runTime", SortOrder::Ascending)
            .with_version("vector");
        InMemoryStore::new(task_schema(), &config).unwrap()
    }

    fn task(store: &InMemoryStore, path: &str, run_time: i64) -> Record {
        store
            .prototype()
            .with("path", path)
            .unwrap()
            .with("runTime", run_time)
            .unwrap()
    }

    fn run_times(records: &[Record]) -> Vec<i64> {
        records
            .iter()
            .map(|r| r.get_by_name("runTime").and_then(|v| v.as_i64()).unwrap())
            .collect()
    }

    #[test]
    fn test_identity_must_be_string() {
        let schema = Arc::new(
            Schema::builder("Counter")
                .field("id", FieldType::Int64)
                .build()
                .unwrap(),
        );
        let err = InMemoryStore::new(schema, &StoreConfig::new("id"))
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_create_assigns_identity_and_version() {
        let store = build_store();
        let created = store.create(task(&store, TEST_PATH, 0)).unwrap();

        let urn = created.get_by_name("urn").and_then(|v| v.as_str()).unwrap();
        assert!(Uuid::parse_str(urn).is_ok());
        assert_eq!(created.get_by_name("vector"), Some(&Value::Int64(0)));
    }

    #[test]
    fn test_read_all_in_order() {
        let store = build_store();
        store.create(task(&store, TEST_PATH, 0)).unwrap();
        store.create(task(&store, TEST_PATH, 1)).unwrap();

        let mut tasks = store.read(&store.prototype()).unwrap();
        assert!(tasks.has_next().unwrap());
        assert_eq!(run_times(&[tasks.next().unwrap().unwrap()]), vec![0]);
        assert!(tasks.has_next().unwrap());
        assert_eq!(run_times(&[tasks.next().unwrap().unwrap()]), vec![1]);
        assert!(!tasks.has_next().unwrap());
    }

    #[test]
    fn test_sorted_results() {
        let store = build_store();
        store.create(task(&store, TEST_PATH, 11)).unwrap();
        store.create(task(&store, TEST_PATH, 1)).unwrap();
        store.create(task(&store, HOME_PATH, 7)).unwrap();

        let tasks = store.read(&store.prototype()).unwrap().collect_records().unwrap();
        assert_eq!(run_times(&tasks), vec![1, 7, 11]);
    }

    #[test]
    fn test_unsorted_store_appends() {
        let store = InMemoryStore::new(task_schema(), &StoreConfig::new("urn")).unwrap();
        for t in [5, 1, 3] {
            store.create(task(&store, TEST_PATH, t)).unwrap();
        }
        let tasks = store.read(&store.prototype()).unwrap().collect_records().unwrap();
        assert_eq!(run_times(&tasks), vec![5, 1, 3]);
    }

    #[test]
    fn test_secondary_index() {
        let store = build_store();
        store.create(task(&store, HOME_PATH, 1)).unwrap();
        store.create(task(&store, HOME_PATH, 2)).unwrap();
        store.create(task(&store, TEST_PATH, 1)).unwrap();

        let filter = store.prototype().with("path", HOME_PATH).unwrap();
        let tasks = store.read(&filter).unwrap().collect_records().unwrap();
        assert_eq!(tasks.len(), 2);
        assert!(tasks
            .iter()
            .all(|t| t.get_by_name("path") == Some(&Value::from(HOME_PATH))));
    }

    #[test]
    fn test_default_value_is_indexed() {
        let store = build_store();
        store.create(task(&store, "", 0)).unwrap();
        store.create(task(&store, TEST_PATH, 1)).unwrap();

        let filter = store.prototype().with("path", "").unwrap();
        let tasks = store.read(&filter).unwrap().collect_records().unwrap();
        assert_eq!(run_times(&tasks), vec![0]);
    }

    #[test]
    fn test_non_index_filter_reads_all() {
        let store = build_store();
        store.create(task(&store, "", 0)).unwrap();
        store.create(task(&store, TEST_PATH, 1)).unwrap();

        // runTime is not an index: the filter selects everything
        let filter = store.prototype().with("runTime", 0i64).unwrap();
        let tasks = store.read(&filter).unwrap().collect_records().unwrap();
        assert_eq!(tasks.len(), 2);
    }

    #[test]
    fn test_read_one_not_found() {
        let store = build_store();
        let filter = store.prototype().with("urn", "missing").unwrap();
        let err = store.read_one(&filter).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_version_clock_error() {
        let store = build_store();
        let prior = store.create(task(&store, TEST_PATH, 0)).unwrap();
        assert_eq!(prior.get_by_name("vector"), Some(&Value::Int64(0)));

        let updated = store
            .update(prior.clone().with("runTime", 7i64).unwrap())
            .unwrap();
        assert_eq!(updated.get_by_name("vector"), Some(&Value::Int64(1)));

        let err = store
            .update(prior.with("runTime", 11i64).unwrap())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::VersionConflict);
    }

    #[test]
    fn test_update_without_version_is_conflict() {
        let store = build_store();
        let mut prior = store.create(task(&store, TEST_PATH, 0)).unwrap();
        prior.clear(store.layout().version().unwrap().id());
        let err = store.update(prior).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::VersionConflict);
    }

    #[test]
    fn test_update_wraps_version() {
        let store = build_store();
        let created = store.create(task(&store, TEST_PATH, 0)).unwrap();

        // walk the stored version up to the maximum through the data lock
        {
            let mut data = store.data.lock();
            let version = store.layout().version().unwrap().id();
            data[0].put(version, Some(Value::Int64(i64::MAX)));
        }
        let at_max = created.with("vector", i64::MAX).unwrap();
        let updated = store.update(at_max).unwrap();
        assert_eq!(updated.get_by_name("vector"), Some(&Value::Int64(0)));
    }

    #[test]
    fn test_update_resorts() {
        let store = build_store();
        let first = store.create(task(&store, TEST_PATH, 1)).unwrap();
        store.create(task(&store, TEST_PATH, 5)).unwrap();

        store.update(first.with("runTime", 9i64).unwrap()).unwrap();
        let tasks = store.read(&store.prototype()).unwrap().collect_records().unwrap();
        assert_eq!(run_times(&tasks), vec![5, 9]);
    }

    #[test]
    fn test_update_missing_identity() {
        let store = build_store();
        let err = store.update(task(&store, TEST_PATH, 1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);

        let ghost = task(&store, TEST_PATH, 1)
            .with("urn", "ghost")
            .unwrap()
            .with("vector", 0i64)
            .unwrap();
        assert_eq!(store.update(ghost).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_delete_with_stale_version() {
        let store = build_store();
        let prior = store.create(task(&store, TEST_PATH, 0)).unwrap();
        let current = store.update(prior.clone()).unwrap();

        let err = store.delete(&prior).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::VersionConflict);
        assert_eq!(store.len(), 1);
        assert_eq!(store.read_one(&current).unwrap(), current);

        store.delete(&current).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.delete(&current).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_empty_store_reads_empty() {
        let store = build_store();
        let mut tasks = store.read(&store.prototype()).unwrap();
        assert!(!tasks.has_next().unwrap());
    }

    #[test]
    fn test_closed_store_rejects_operations() {
        let store = build_store();
        store.create(task(&store, TEST_PATH, 0)).unwrap();
        store.close().unwrap();
        store.close().unwrap();
        let err = store.read(&store.prototype()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Closed);
    }

    #[test]
    fn test_foreign_schema_rejected() {
        let store = build_store();
        let other = Arc::new(
            Schema::builder("Other")
                .field("urn", FieldType::String)
                .build()
                .unwrap(),
        );
        let err = store.create(Record::new(other)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }
}

//! Relational store over SQLite
//!
//! The store owns no schema DDL: the table must already exist with one
//! column per schema field, named after the field. Construction prepares
//! every generated statement once, so a missing table or column is a
//! construction failure rather than a first-call surprise.
//!
//! Version-gated writes are a single conditional statement:
//!
//! ```text
//! UPDATE t SET ... WHERE id = ? AND version = ?
//! ```
//!
//! Exactly one affected row means the compare-and-set succeeded. Zero rows
//! is resolved with a point lookup into NotFound or VersionConflict.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, TransactionBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::config::{IdentityStrategy, SqlStoreConfig};
use super::cursor::{fetch_rows, SqlCursor};
use super::marshal;
use super::statements::StatementSet;
use crate::record::{Record, Value};
use crate::schema::{FieldDescriptor, FieldId, FieldType, Schema, SchemaError, SchemaReflector};
use crate::store::{
    check_schema, initial_version, next_version, require_identity, RecordSequence, RecordStore,
    Selection, StoreError, StoreLayout, StoreResult,
};

/// Connection handle shared by the stores of one database
pub type SharedConnection = Arc<Mutex<Connection>>;

/// Relational implementation of [`RecordStore`]
pub struct SqlStore {
    schema: Arc<Schema>,
    layout: StoreLayout,
    table: String,
    fields: Arc<[FieldDescriptor]>,
    statements: StatementSet,
    strategy: IdentityStrategy,
    connection: SharedConnection,
    closed: AtomicBool,
}

impl SqlStore {
    /// Builds a store on a shared connection
    pub fn new(
        connection: SharedConnection,
        schema: Arc<Schema>,
        config: &SqlStoreConfig,
    ) -> StoreResult<Self> {
        let layout = config.store.resolve(&schema)?;
        check_strategy(layout.identity(), config.identity)?;

        let fields: Arc<[FieldDescriptor]> = SchemaReflector::fields_of(&schema).into();
        let statements = StatementSet::build(&config.table, &fields, &layout, config.identity)?;

        {
            let conn = connection.lock();
            for sql in statements.all() {
                conn.prepare_cached(sql)
                    .map_err(StoreError::backend(format!("cannot prepare `{}`", sql)))?;
            }
        }

        info!(
            schema = %schema.name,
            table = %config.table,
            strategy = ?config.identity,
            indexes = layout.indexes().len(),
            versioned = layout.version().is_some(),
            "sql store ready"
        );

        Ok(Self {
            schema,
            layout,
            table: config.table.clone(),
            fields,
            statements,
            strategy: config.identity,
            connection,
            closed: AtomicBool::new(false),
        })
    }

    /// Builds a store that takes ownership of a connection
    pub fn open(
        connection: Connection,
        schema: Arc<Schema>,
        config: &SqlStoreConfig,
    ) -> StoreResult<Self> {
        Self::new(Arc::new(Mutex::new(connection)), schema, config)
    }

    /// Backing table name
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Generated statements
    pub fn statements(&self) -> &StatementSet {
        &self.statements
    }

    /// Validated field roles
    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Identity assignment strategy
    pub fn strategy(&self) -> IdentityStrategy {
        self.strategy
    }

    /// Underlying connection handle
    pub fn connection(&self) -> &SharedConnection {
        &self.connection
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn field(&self, id: FieldId) -> &FieldDescriptor {
        &self.fields[id.index()]
    }

    fn bind_fields(&self, record: &Record, ids: &[FieldId]) -> StoreResult<Vec<SqlValue>> {
        ids.iter()
            .map(|id| marshal::bind(self.field(*id), record.get(*id)))
            .collect()
    }

    /// WHERE parameters of update and delete
    fn key_params(&self, identity: &Value, expected: Option<&Value>) -> StoreResult<Vec<SqlValue>> {
        let mut params = vec![marshal::bind(self.layout.identity(), Some(identity))?];
        if let (Some(version), Some(expected)) = (self.layout.version(), expected) {
            params.push(marshal::bind(version, Some(expected))?);
        }
        Ok(params)
    }

    fn identity_exists(&self, conn: &Connection, identity: &Value) -> StoreResult<bool> {
        let param = marshal::bind(self.layout.identity(), Some(identity))?;
        let mut stmt = conn
            .prepare_cached(self.statements.select_identity())
            .map_err(StoreError::backend("identity lookup"))?;
        stmt.exists(params_from_iter([param]))
            .map_err(StoreError::backend("identity lookup"))
    }

    /// Explains a version-gated statement that touched no row
    fn no_row_error(
        &self,
        conn: &Connection,
        identity: &Value,
        operation: &str,
    ) -> StoreResult<StoreError> {
        if !self.identity_exists(conn, identity)? {
            return Ok(StoreError::NotFound(format!(
                "{} {} cannot be {}",
                self.schema.name, identity, operation
            )));
        }
        Ok(StoreError::VersionConflict(format!(
            "{} {} was modified concurrently and cannot be {}",
            self.schema.name, identity, operation
        )))
    }

    fn insert(&self, conn: &Connection, record: &Record) -> StoreResult<usize> {
        let params = self.bind_fields(record, self.statements.insert_fields())?;
        let mut stmt = conn
            .prepare_cached(self.statements.insert())
            .map_err(StoreError::backend("insert"))?;
        stmt.execute(params_from_iter(params))
            .map_err(StoreError::backend(format!("insert into {}", self.table)))
    }

    /// Runs a keyed statement inside an immediate transaction, so writers on
    /// other connections queue on the busy handler. More than one affected
    /// row is rolled back.
    fn execute_keyed(
        &self,
        conn: &mut Connection,
        sql: &str,
        params: Vec<SqlValue>,
        identity: &Value,
        operation: &str,
    ) -> StoreResult<()> {
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::backend(format!("begin {}", operation)))?;
        let changed = {
            let mut stmt = tx
                .prepare_cached(sql)
                .map_err(StoreError::backend(operation.to_string()))?;
            stmt.execute(params_from_iter(params))
                .map_err(StoreError::backend(format!("{} in {}", operation, self.table)))?
        };

        match changed {
            1 => tx
                .commit()
                .map_err(StoreError::backend(format!("commit {}", operation))),
            0 => {
                let error = self.no_row_error(&tx, identity, operation)?;
                Err(error)
            }
            n => {
                tx.rollback()
                    .map_err(StoreError::backend(format!("rollback {}", operation)))?;
                Err(StoreError::Config(format!(
                    "identity {} matches {} rows in table {}",
                    identity, n, self.table
                )))
            }
        }
    }
}

impl RecordStore for SqlStore {
    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn create(&self, mut candidate: Record) -> StoreResult<Record> {
        self.ensure_open()?;
        check_schema(&self.schema, &candidate)?;

        if let Some(version) = self.layout.version() {
            candidate.put(version.id(), Some(initial_version(version.field_type())));
        }
        let identity = self.layout.identity();

        let conn = self.connection.lock();
        match self.strategy {
            IdentityStrategy::AutoIncrement => {
                self.insert(&conn, &candidate)?;
                let rowid = conn.last_insert_rowid();
                candidate.put(identity.id(), Some(marshal::identity_from_rowid(identity, rowid)?));
            }
            IdentityStrategy::GeneratedUrn => {
                let urn = loop {
                    let candidate_urn = Value::String(Uuid::new_v4().to_string());
                    if !self.identity_exists(&conn, &candidate_urn)? {
                        break candidate_urn;
                    }
                    warn!(table = %self.table, "identity collision, regenerating");
                };
                candidate.put(identity.id(), Some(urn));
                self.insert(&conn, &candidate)?;
            }
        }

        debug!(table = %self.table, identity = ?candidate.get(identity.id()), "created record");
        Ok(candidate)
    }

    /// Reads are materialized eagerly: every selected row is buffered before
    /// the first step, so a full scan holds the whole table in memory.
    fn read(&self, filter: &Record) -> StoreResult<RecordSequence> {
        self.ensure_open()?;
        check_schema(&self.schema, filter)?;

        let (sql, params) = match self.layout.select(filter) {
            Selection::Identity(value) => (
                self.statements.select_identity(),
                vec![marshal::bind(self.layout.identity(), Some(value))?],
            ),
            Selection::Index(field, value) => (
                self.statements.select_index(field.id()).ok_or_else(|| {
                    StoreError::Config(format!("no statement for index '{}'", field.name()))
                })?,
                vec![marshal::bind(field, Some(value))?],
            ),
            Selection::All => (self.statements.select_all(), Vec::new()),
        };

        let rows = {
            let conn = self.connection.lock();
            let mut stmt = conn
                .prepare_cached(sql)
                .map_err(StoreError::backend("select"))?;
            fetch_rows(&mut stmt, params_from_iter(params), self.fields.len())?
        };
        debug!(table = %self.table, rows = rows.len(), "read");

        Ok(RecordSequence::new(SqlCursor::new(
            self.schema.clone(),
            self.fields.clone(),
            rows,
        )))
    }

    fn update(&self, mut candidate: Record) -> StoreResult<Record> {
        self.ensure_open()?;
        check_schema(&self.schema, &candidate)?;
        let identity = require_identity(&self.layout, &candidate, "update")?.clone();

        let mut conn = self.connection.lock();

        let expected = match self.layout.version() {
            Some(version) => match candidate.get(version.id()).cloned() {
                Some(expected) => {
                    let next = backend_next_version(&expected).ok_or_else(|| {
                        StoreError::marshal(
                            version.name(),
                            format!("{} is not a version counter", expected.type_name()),
                        )
                    })?;
                    candidate.put(version.id(), Some(next));
                    Some(expected)
                }
                None => return Err(self.no_row_error(&conn, &identity, "updated")?),
            },
            None => None,
        };

        let mut params = self.bind_fields(&candidate, self.statements.update_fields())?;
        params.extend(self.key_params(&identity, expected.as_ref())?);
        self.execute_keyed(&mut conn, self.statements.update(), params, &identity, "updated")?;

        debug!(table = %self.table, %identity, "updated record");
        Ok(candidate)
    }

    fn delete(&self, record: &Record) -> StoreResult<()> {
        self.ensure_open()?;
        check_schema(&self.schema, record)?;
        let identity = require_identity(&self.layout, record, "delete")?;

        let mut conn = self.connection.lock();

        let expected = match self.layout.version() {
            Some(version) => match record.get(version.id()) {
                Some(expected) => Some(expected),
                None => return Err(self.no_row_error(&conn, identity, "deleted")?),
            },
            None => None,
        };

        let params = self.key_params(identity, expected)?;
        self.execute_keyed(&mut conn, self.statements.delete(), params, identity, "deleted")?;

        debug!(table = %self.table, %identity, "deleted record");
        Ok(())
    }

    fn close(&self) -> StoreResult<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.connection.lock().flush_prepared_statement_cache();
            info!(table = %self.table, "sql store closed");
        }
        Ok(())
    }
}

/// Successor of a stored version.
///
/// SQLite integers are signed, so a uint64 counter tops out at `i64::MAX`
/// here and wraps to 0 from there.
fn backend_next_version(current: &Value) -> Option<Value> {
    match *current {
        Value::UInt64(v) if v >= i64::MAX as u64 => Some(Value::UInt64(0)),
        _ => next_version(current),
    }
}

/// Checks that the identity field can carry the chosen strategy's values
fn check_strategy(identity: &FieldDescriptor, strategy: IdentityStrategy) -> StoreResult<()> {
    let reason = match strategy {
        IdentityStrategy::AutoIncrement if !identity.field_type().is_integral() => {
            "auto-increment identities are integers"
        }
        IdentityStrategy::GeneratedUrn if *identity.field_type() != FieldType::String => {
            "generated identities are UUID strings"
        }
        _ => return Ok(()),
    };
    Err(SchemaError::InvalidRole {
        field: identity.name().to_string(),
        role: "identity",
        found: identity.field_type().type_name(),
        reason,
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ErrorKind, SortOrder, StoreConfig};

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

    fn connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE Task (
                urn TEXT PRIMARY KEY,
                path TEXT,
                runTime INTEGER,
                vector INTEGER
            );",
        )
        .unwrap();
        conn
    }

    fn config() -> SqlStoreConfig {
        SqlStoreConfig::new(
            "Task",
            IdentityStrategy::GeneratedUrn,
            StoreConfig::new("urn")
                .with_index("path")
                .with_sort("runTime", SortOrder::Ascending)
                .with_version("vector"),
        )
    }

    fn build_store() -> SqlStore {
        SqlStore::open(connection(), task_schema(), &config()).unwrap()
    }

    fn task(store: &SqlStore, path: &str, run_time: i64) -> Record {
        store
            .prototype()
            .with("path", path)
            .unwrap()
            .with("runTime", run_time)
            .unwrap()
    }

    #[test]
    fn test_missing_table_fails_construction() {
        let conn = Connection::open_in_memory().unwrap();
        let err = SqlStore::open(conn, task_schema(), &config()).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Backend);
    }

    #[test]
    fn test_strategy_must_fit_identity() {
        let config = SqlStoreConfig::new(
            "Task",
            IdentityStrategy::AutoIncrement,
            StoreConfig::new("urn"),
        );
        let err = SqlStore::open(connection(), task_schema(), &config)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_create_then_read_one() {
        let store = build_store();
        let created = store.create(task(&store, "/x", 3)).unwrap();
        assert_eq!(created.get_by_name("vector"), Some(&Value::Int64(0)));

        let filter = store
            .prototype()
            .with("urn", created.get_by_name("urn").unwrap().clone())
            .unwrap();
        assert_eq!(store.read_one(&filter).unwrap(), created);
    }

    #[test]
    fn test_update_advances_version() {
        let store = build_store();
        let created = store.create(task(&store, "/x", 3)).unwrap();

        let updated = store
            .update(created.clone().with("path", "/y").unwrap())
            .unwrap();
        assert_eq!(updated.get_by_name("vector"), Some(&Value::Int64(1)));

        let err = store.update(created.clone()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::VersionConflict);

        let err = store.delete(&created).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::VersionConflict);
        store.delete(&updated).unwrap();
    }

    #[test]
    fn test_absent_record_is_not_found() {
        let store = build_store();
        let ghost = task(&store, "/x", 0)
            .with("urn", "missing")
            .unwrap()
            .with("vector", 0i64)
            .unwrap();
        assert_eq!(store.update(ghost.clone()).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(store.delete(&ghost).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_missing_version_conflicts() {
        let store = build_store();
        let mut created = store.create(task(&store, "/x", 3)).unwrap();
        created.clear(task_schema().field_id("vector").unwrap());
        assert_eq!(
            store.update(created).unwrap_err().kind(),
            ErrorKind::VersionConflict
        );
    }

    #[test]
    fn test_auto_increment_identity() {
        let schema = Arc::new(
            Schema::builder("Counter")
                .field("id", FieldType::Int32)
                .field("label", FieldType::String)
                .build()
                .unwrap(),
        );
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE Counter (id INTEGER PRIMARY KEY AUTOINCREMENT, label TEXT);")
            .unwrap();
        let config = SqlStoreConfig::new(
            "Counter",
            IdentityStrategy::AutoIncrement,
            StoreConfig::new("id"),
        );
        let store = SqlStore::open(conn, schema, &config).unwrap();

        let first = store.create(store.prototype().with("label", "a").unwrap()).unwrap();
        let second = store.create(store.prototype().with("label", "b").unwrap()).unwrap();
        assert_eq!(first.get_by_name("id"), Some(&Value::Int32(1)));
        assert_eq!(second.get_by_name("id"), Some(&Value::Int32(2)));

        // unversioned delete ignores the version gate entirely
        store.delete(&first).unwrap();
        assert_eq!(store.delete(&first).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_backend_version_successor() {
        assert_eq!(
            backend_next_version(&Value::UInt64(i64::MAX as u64)),
            Some(Value::UInt64(0))
        );
        assert_eq!(backend_next_version(&Value::UInt64(41)), Some(Value::UInt64(42)));
        assert_eq!(
            backend_next_version(&Value::Int64(i64::MAX)),
            Some(Value::Int64(0))
        );
    }

    #[test]
    fn test_close_is_idempotent() {
        let store = build_store();
        store.close().unwrap();
        store.close().unwrap();
        assert_eq!(
            store.read(&store.prototype()).unwrap_err().kind(),
            ErrorKind::Closed
        );
    }
}

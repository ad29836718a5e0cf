//! Shared fixtures for store integration tests

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use recordstore::memory::InMemoryStore;
use recordstore::sql::{IdentityStrategy, SqlStore, SqlStoreConfig};
use recordstore::{FieldType, Record, RecordStore, Schema, SortOrder, StoreConfig};
use rusqlite::Connection;

/// Table matching [`task_schema`]
pub const TASK_DDL: &str = "CREATE TABLE IF NOT EXISTS Task (
    urn TEXT PRIMARY KEY,
    path TEXT,
    time INTEGER,
    vector INTEGER
)";

/// urn / path / time / vector
pub fn task_schema() -> Arc<Schema> {
    Arc::new(
        Schema::builder("Task")
            .field("urn", FieldType::String)
            .field("path", FieldType::String)
            .field("time", FieldType::Int64)
            .field("vector", FieldType::Int64)
            .build()
            .unwrap(),
    )
}

/// Index on path, ascending by time, versioned by vector
pub fn task_config() -> StoreConfig {
    StoreConfig::new("urn")
        .with_index("path")
        .with_sort("time", SortOrder::Ascending)
        .with_version("vector")
}

pub fn task_sql_config() -> SqlStoreConfig {
    SqlStoreConfig::new("Task", IdentityStrategy::GeneratedUrn, task_config())
}

pub fn memory_store() -> InMemoryStore {
    InMemoryStore::new(task_schema(), &task_config()).unwrap()
}

pub fn sql_connection() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(TASK_DDL).unwrap();
    conn
}

pub fn file_connection(path: &Path) -> Connection {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(TASK_DDL).unwrap();
    conn
}

pub fn sql_store() -> SqlStore {
    SqlStore::open(sql_connection(), task_schema(), &task_sql_config()).unwrap()
}

/// Unsaved task with a path and time
pub fn task<S: RecordStore + ?Sized>(store: &S, path: &str, time: i64) -> Record {
    store
        .prototype()
        .with("path", path)
        .unwrap()
        .with("time", time)
        .unwrap()
}

/// Filter selecting a stored record by identity
pub fn by_urn<S: RecordStore + ?Sized>(store: &S, record: &Record) -> Record {
    store
        .prototype()
        .with("urn", record.get_by_name("urn").unwrap().clone())
        .unwrap()
}

pub fn by_path<S: RecordStore + ?Sized>(store: &S, path: &str) -> Record {
    store.prototype().with("path", path).unwrap()
}

pub fn read_all<S: RecordStore + ?Sized>(store: &S) -> Vec<Record> {
    store
        .read(&store.prototype())
        .unwrap()
        .collect_records()
        .unwrap()
}

pub fn times(records: &[Record]) -> Vec<i64> {
    records
        .iter()
        .map(|r| r.get_by_name("time").and_then(|v| v.as_i64()).unwrap())
        .collect()
}

pub fn version(record: &Record) -> i64 {
    record.get_by_name("vector").and_then(|v| v.as_i64()).unwrap()
}

//! recordstore - Uniform CRUD storage for schema-described records
//!
//! One [`RecordStore`] contract over interchangeable backends:
//!
//! - [`memory::InMemoryStore`] - sorted, indexed, mutex-guarded reference store
//! - [`sql::SqlStore`] - SQLite tables driven by generated statements
//! - [`preload::PreloadStore`] - read cache over any other store
//!
//! Every store supports identity allocation, secondary-index reads, an
//! optional sort order, and optimistic concurrency through a version field.

pub mod index;
pub mod memory;
pub mod preload;
pub mod record;
pub mod schema;
pub mod sql;
pub mod store;

pub use record::{Record, Value};
pub use schema::{FieldType, Schema};
pub use store::{
    ErrorKind, RecordSequence, RecordStore, SortOrder, StoreConfig, StoreError, StoreResult,
};

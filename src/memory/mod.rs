//! In-memory reference store
//!
//! Reference semantics for every other backend:
//!
//! - random UUID identity with collision re-generation
//! - binary-search sorted insertion (ties keep insertion order)
//! - linear secondary-index scans over snapshots
//! - version compare-and-set under one mutex per store

mod sorter;
mod store;

pub use sorter::RecordComparator;
pub use store::InMemoryStore;

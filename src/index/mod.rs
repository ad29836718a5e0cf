//! Index subsystem
//!
//! Ordered in-memory indexes over full records, used by the preloading
//! cache store. Keys are derived from record values with a total order, so
//! lookups and full scans return records deterministically.

mod btree;
mod manager;

pub use btree::{IndexKey, IndexTree};
pub use manager::RecordIndex;

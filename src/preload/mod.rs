//! Preloading cache store
//!
//! Wraps any [`crate::store::RecordStore`] and serves reads from an
//! in-memory [`crate::index::RecordIndex`] loaded once from a full scan.

mod store;

pub use store::PreloadStore;

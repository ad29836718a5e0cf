//! Relational store
//!
//! Maps runtime-described schemas onto SQLite tables through statements
//! generated once per store.
//!
//! # Components
//!
//! - `config` - table binding and identity strategy
//! - `statements` - INSERT / SELECT / UPDATE / DELETE generation
//! - `marshal` - value binding and column extraction per field type
//! - `cursor` - buffered result rows decoded on demand
//! - `store` - the [`SqlStore`] itself
//! - `naming` - stores bound purely by field naming convention
//!
//! # Concurrency
//!
//! Stores built on the same [`SharedConnection`] serialize their statements
//! on its mutex. Stores on separate connections to the same database rely on
//! SQLite executing each conditional UPDATE / DELETE atomically.

mod config;
mod cursor;
mod marshal;
mod naming;
mod statements;
mod store;

pub use config::{IdentityStrategy, SqlStoreConfig};
pub use cursor::SqlCursor;
pub use marshal::{bind, extract};
pub use naming::{NamedStoreFactory, NamingConvention, INDEX_SUFFIX, URN_FIELD, VERSION_FIELD};
pub use statements::{quote_identifier, StatementSet};
pub use store::{SharedConnection, SqlStore};

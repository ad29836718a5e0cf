//! Schema subsystem
//!
//! A schema is an ordered list of named, typed fields describing one record
//! type. Stores never look fields up by name while serving requests: names
//! are resolved once, at configuration time, into [`FieldDescriptor`]s
//! carrying a positional [`FieldId`].
//!
//! # Role constraints
//!
//! - identity: equality-comparable scalar (not bytes, bool or floating point)
//! - version: 64-bit integer
//! - sort: totally ordered scalar (not enum or bytes)
//! - index: any field

mod errors;
mod reflector;
mod types;

pub use errors::{SchemaError, SchemaResult};
pub use reflector::{FieldDescriptor, SchemaReflector};
pub use types::{FieldDef, FieldId, FieldType, Schema, SchemaBuilder};

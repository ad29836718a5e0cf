//! Records and field values
//!
//! A [`Record`] is bound to one [`crate::schema::Schema`] and holds one
//! optional [`Value`] per declared field. Stores replace records wholesale;
//! a record is never mutated in place once stored.

mod record;
mod value;

pub use record::Record;
pub use value::Value;

//! Version counter arithmetic for optimistic concurrency
//!
//! A version starts at [`INITIAL_VERSION`] and increments by one on every
//! successful update, wrapping back to the initial value after the maximum
//! of the field's integer type.

use crate::record::Value;
use crate::schema::FieldType;

/// Version assigned on create
pub const INITIAL_VERSION: i64 = 0;

/// Initial version value for a version field of the given type
pub fn initial_version(field_type: &FieldType) -> Value {
    match field_type {
        FieldType::UInt64 => Value::UInt64(INITIAL_VERSION as u64),
        _ => Value::Int64(INITIAL_VERSION),
    }
}

/// Successor of a version value, None if the value is not a 64-bit integer
pub fn next_version(current: &Value) -> Option<Value> {
    match *current {
        Value::Int64(v) if v == i64::MAX => Some(Value::Int64(INITIAL_VERSION)),
        Value::Int64(v) => Some(Value::Int64(v + 1)),
        Value::UInt64(v) if v == u64::MAX => Some(Value::UInt64(INITIAL_VERSION as u64)),
        Value::UInt64(v) => Some(Value::UInt64(v + 1)),
        _ => None,
    }
}

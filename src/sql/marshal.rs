//! Type marshaling between record values and SQLite values
//!
//! | Field type | Bound as | Notes |
//! |---|---|---|
//! | int32, int64, uint32 | INTEGER | |
//! | uint64 | INTEGER | values above i64::MAX are refused |
//! | float, double | REAL | |
//! | bool | INTEGER | 0 / 1 |
//! | string | TEXT | |
//! | enum | TEXT | symbol name, checked on extraction |
//! | bytes | BLOB | |
//!
//! An absent field binds as NULL and NULL extracts as absent.

use rusqlite::types::Value as SqlValue;

use crate::record::Value;
use crate::schema::{FieldDescriptor, FieldType};
use crate::store::{StoreError, StoreResult};

/// Converts a field value into a bound parameter
pub fn bind(field: &FieldDescriptor, value: Option<&Value>) -> StoreResult<SqlValue> {
    let Some(value) = value else {
        return Ok(SqlValue::Null);
    };
    if !value.matches_type(field.field_type()) {
        return Err(StoreError::marshal(
            field.name(),
            format!(
                "{} value cannot be bound to a {} column",
                value.type_name(),
                field.field_type()
            ),
        ));
    }

    let bound = match value {
        Value::Int32(v) => SqlValue::Integer(*v as i64),
        Value::Int64(v) => SqlValue::Integer(*v),
        Value::UInt32(v) => SqlValue::Integer(*v as i64),
        Value::UInt64(v) => SqlValue::Integer(i64::try_from(*v).map_err(|_| {
            StoreError::marshal(field.name(), format!("{} exceeds the backend integer range", v))
        })?),
        Value::Float(v) => SqlValue::Real(*v as f64),
        Value::Double(v) => SqlValue::Real(*v),
        Value::Bool(v) => SqlValue::Integer(i64::from(*v)),
        Value::String(s) | Value::Enum(s) => SqlValue::Text(s.clone()),
        Value::Bytes(b) => SqlValue::Blob(b.clone()),
    };
    Ok(bound)
}

/// Converts an extracted column into a field value
pub fn extract(field: &FieldDescriptor, raw: SqlValue) -> StoreResult<Option<Value>> {
    let value = match (field.field_type(), raw) {
        (_, SqlValue::Null) => return Ok(None),
        (FieldType::Int32, SqlValue::Integer(i)) => Value::Int32(narrow(field, i)?),
        (FieldType::Int64, SqlValue::Integer(i)) => Value::Int64(i),
        (FieldType::UInt32, SqlValue::Integer(i)) => Value::UInt32(narrow(field, i)?),
        (FieldType::UInt64, SqlValue::Integer(i)) => Value::UInt64(narrow(field, i)?),
        (FieldType::Float, SqlValue::Real(f)) => Value::Float(f as f32),
        (FieldType::Float, SqlValue::Integer(i)) => Value::Float(i as f32),
        (FieldType::Double, SqlValue::Real(f)) => Value::Double(f),
        (FieldType::Double, SqlValue::Integer(i)) => Value::Double(i as f64),
        (FieldType::Bool, SqlValue::Integer(i)) => Value::Bool(i != 0),
        (FieldType::String, SqlValue::Text(s)) => Value::String(s),
        (FieldType::Enum { symbols }, SqlValue::Text(s)) => {
            if !symbols.contains(&s) {
                return Err(StoreError::marshal(
                    field.name(),
                    format!("unknown enum symbol '{}'", s),
                ));
            }
            Value::Enum(s)
        }
        (FieldType::Bytes, SqlValue::Blob(b)) => Value::Bytes(b),
        (field_type, raw) => {
            return Err(StoreError::marshal(
                field.name(),
                format!("{} column cannot hold {:?}", field_type, raw.data_type()),
            ))
        }
    };
    Ok(Some(value))
}

/// Identity value for a backend-assigned row id
pub fn identity_from_rowid(field: &FieldDescriptor, rowid: i64) -> StoreResult<Value> {
    match field.field_type() {
        FieldType::Int32 => Ok(Value::Int32(narrow(field, rowid)?)),
        FieldType::Int64 => Ok(Value::Int64(rowid)),
        FieldType::UInt32 => Ok(Value::UInt32(narrow(field, rowid)?)),
        FieldType::UInt64 => Ok(Value::UInt64(narrow(field, rowid)?)),
        other => Err(StoreError::marshal(
            field.name(),
            format!("{} field cannot hold a generated row id", other),
        )),
    }
}

fn narrow<T: TryFrom<i64>>(field: &FieldDescriptor, value: i64) -> StoreResult<T> {
    T::try_from(value).map_err(|_| {
        StoreError::marshal(
            field.name(),
            format!("{} does not fit a {} field", value, field.field_type()),
        )
    })
}

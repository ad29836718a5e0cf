//! Schema-bound records

use std::fmt;
use std::sync::Arc;

use super::value::Value;
use crate::schema::{FieldId, Schema, SchemaError, SchemaReflector, SchemaResult};

/// An instance of a schema-described structured value.
///
/// Every field is either present (`Some`) or absent (`None`); there is no
/// other null. Records handed back by a store are snapshots owned by the
/// caller.
#[derive(Clone)]
pub struct Record {
    schema: Arc<Schema>,
    values: Vec<Option<Value>>,
}

impl Record {
    /// Creates a record with every field absent
    pub fn new(schema: Arc<Schema>) -> Self {
        let values = vec![None; schema.fields.len()];
        Self { schema, values }
    }

    /// Returns the record's schema
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// True if this record was built for the given schema
    pub fn is_instance_of(&self, schema: &Arc<Schema>) -> bool {
        Arc::ptr_eq(&self.schema, schema) || *self.schema == **schema
    }

    /// Value of a field, None when absent
    pub fn get(&self, field: FieldId) -> Option<&Value> {
        self.values.get(field.0).and_then(Option::as_ref)
    }

    /// Value of a field looked up by name
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.schema.field_id(name).and_then(|id| self.get(id))
    }

    /// Whether a field is present
    pub fn has(&self, field: FieldId) -> bool {
        self.get(field).is_some()
    }

    /// Sets a field after checking the value against the field's type
    pub fn set(&mut self, field: FieldId, value: Value) -> SchemaResult<()> {
        let def = self.schema.field(field).ok_or_else(|| SchemaError::UnknownField {
            schema: self.schema.name.clone(),
            field: format!("#{}", field.0),
            available: format!("{} fields", self.schema.fields.len()),
        })?;
        if !value.matches_type(&def.field_type) {
            return Err(SchemaError::TypeMismatch {
                field: def.name.clone(),
                expected: def.field_type.type_name().to_string(),
                found: match &value {
                    Value::Enum(symbol) => format!("enum symbol '{}'", symbol),
                    other => other.type_name().to_string(),
                },
            });
        }
        self.values[field.0] = Some(value);
        Ok(())
    }

    /// Sets a field looked up by name
    pub fn set_by_name(&mut self, name: &str, value: impl Into<Value>) -> SchemaResult<()> {
        let field = SchemaReflector::resolve(&self.schema, name)?;
        self.set(field.id(), value.into())
    }

    /// Builder-style [`Record::set_by_name`]
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> SchemaResult<Self> {
        self.set_by_name(name, value)?;
        Ok(self)
    }

    /// Marks a field absent
    pub fn clear(&mut self, field: FieldId) {
        if let Some(slot) = self.values.get_mut(field.0) {
            *slot = None;
        }
    }

    /// Sets a field without a type check.
    ///
    /// Only used by stores writing values they derived from the schema.
    pub(crate) fn put(&mut self, field: FieldId, value: Option<Value>) {
        self.values[field.0] = value;
    }

    /// Field values in schema order
    pub fn values(&self) -> impl Iterator<Item = (FieldId, Option<&Value>)> {
        self.values
            .iter()
            .enumerate()
            .map(|(position, value)| (FieldId(position), value.as_ref()))
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.is_instance_of(&other.schema) && self.values == other.values
    }
}

impl Eq for Record {}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct(&self.schema.name);
        for (def, value) in self.schema.fields.iter().zip(&self.values) {
            if let Some(value) = value {
                out.field(&def.name, value);
            }
        }
        out.finish()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.schema.name)?;
        let mut first = true;
        for (def, value) in self.schema.fields.iter().zip(&self.values) {
            if let Some(value) = value {
                if !first {
                    f.write_str(",")?;
                }
                write!(f, " {}: {}", def.name, value)?;
                first = false;
            }
        }
        f.write_str(" }")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::builder("Task")
                .field("urn", FieldType::String)
                .field("path", FieldType::String)
                .field("runTime", FieldType::Int64)
                .field("state", FieldType::enumeration(["NEW", "DONE"]))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_new_record_all_absent() {
        let record = Record::new(schema());
        assert!(record.values().all(|(_, v)| v.is_none()));
    }

    #[test]
    fn test_set_and_get_by_name() {
        let record = Record::new(schema())
            .with("path", "/x")
            .unwrap()
            .with("runTime", 10i64)
            .unwrap();
        assert_eq!(record.get_by_name("path"), Some(&Value::from("/x")));
        assert_eq!(record.get_by_name("runTime"), Some(&Value::Int64(10)));
        assert_eq!(record.get_by_name("urn"), None);
    }

    #[test]
    fn test_set_rejects_wrong_type() {
        let mut record = Record::new(schema());
        let err = record.set_by_name("runTime", "ten").unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { .. }));

        let err = record
            .set_by_name("state", Value::Enum("LOST".into()))
            .unwrap_err();
        assert!(err.to_string().contains("LOST"));
    }

    #[test]
    fn test_clear_field() {
        let mut record = Record::new(schema()).with("path", "/x").unwrap();
        let path = record.schema().field_id("path").unwrap();
        assert!(record.has(path));
        record.clear(path);
        assert!(!record.has(path));
    }

    #[test]
    fn test_equality_includes_presence() {
        let a = Record::new(schema()).with("runTime", 0i64).unwrap();
        let b = Record::new(schema());
        assert_ne!(a, b);
        assert_eq!(a.clone(), a);
    }

    #[test]
    fn test_display_lists_present_fields() {
        let record = Record::new(schema()).with("path", "/x").unwrap();
        assert_eq!(record.to_string(), "Task { path: \"/x\" }");
    }
}

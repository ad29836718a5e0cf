//! Schema reflection
//!
//! Translates configuration-time field names into validated
//! [`FieldDescriptor`]s, checking the type constraints of the role a field
//! is asked to play (identity, version, sort, index).

use super::errors::{SchemaError, SchemaResult};
use super::types::{FieldId, FieldType, Schema};

/// A resolved field: position, name and type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    id: FieldId,
    name: String,
    field_type: FieldType,
}

impl FieldDescriptor {
    /// Positional handle
    pub fn id(&self) -> FieldId {
        self.id
    }

    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field type
    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }
}

/// Stateless schema reflector
pub struct SchemaReflector;

impl SchemaReflector {
    /// All fields of the schema in declaration order
    pub fn fields_of(schema: &Schema) -> Vec<FieldDescriptor> {
        schema
            .fields
            .iter()
            .enumerate()
            .map(|(position, def)| FieldDescriptor {
                id: FieldId(position),
                name: def.name.clone(),
                field_type: def.field_type.clone(),
            })
            .collect()
    }

    /// Resolve a field by name
    pub fn resolve(schema: &Schema, name: &str) -> SchemaResult<FieldDescriptor> {
        let id = schema.field_id(name).ok_or_else(|| SchemaError::UnknownField {
            schema: schema.name.clone(),
            field: name.to_string(),
            available: schema
                .fields
                .iter()
                .map(|f| f.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        })?;

        Ok(FieldDescriptor {
            id,
            name: name.to_string(),
            field_type: schema.fields[id.0].field_type.clone(),
        })
    }

    /// Resolve the identity field.
    ///
    /// Identity values are compared for equality only, so bytes and
    /// floating point fields are refused.
    pub fn resolve_identity(schema: &Schema, name: &str) -> SchemaResult<FieldDescriptor> {
        let field = Self::resolve(schema, name)?;
        match field.field_type {
            FieldType::Bytes | FieldType::Float | FieldType::Double | FieldType::Bool => {
                Err(invalid_role(&field, "identity", "type cannot address a record"))
            }
            _ => Ok(field),
        }
    }

    /// Resolve the version field, which must be a 64-bit integer
    pub fn resolve_version(schema: &Schema, name: &str) -> SchemaResult<FieldDescriptor> {
        let field = Self::resolve(schema, name)?;
        if !field.field_type.is_integral_64() {
            return Err(invalid_role(&field, "version", "must be a 64-bit integer"));
        }
        Ok(field)
    }

    /// Resolve the sort field, which must be totally ordered
    pub fn resolve_sort(schema: &Schema, name: &str) -> SchemaResult<FieldDescriptor> {
        let field = Self::resolve(schema, name)?;
        if !field.field_type.is_orderable() {
            return Err(invalid_role(&field, "sort", "type has no total order"));
        }
        Ok(field)
    }

    /// Resolve a secondary index field
    pub fn resolve_index(schema: &Schema, name: &str) -> SchemaResult<FieldDescriptor> {
        Self::resolve(schema, name)
    }
}

fn invalid_role(field: &FieldDescriptor, role: &'static str, reason: &'static str) -> SchemaError {
    SchemaError::InvalidRole {
        field: field.name.clone(),
        role,
        found: field.field_type.type_name(),
        reason,
    }
}

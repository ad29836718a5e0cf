//! Schema type definitions
//!
//! Supported field types:
//! - int32 / int64: signed integers
//! - uint32 / uint64: unsigned integers
//! - float / double: 32 and 64-bit floating point
//! - bool: Boolean
//! - string: UTF-8 string
//! - bytes: opaque byte sequence
//! - enum: symbolic value drawn from a fixed symbol list

use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::{SchemaError, SchemaResult};

/// Supported field types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldType {
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 32-bit unsigned integer
    UInt32,
    /// 64-bit unsigned integer
    UInt64,
    /// 32-bit floating point
    Float,
    /// 64-bit floating point
    Double,
    /// Boolean
    Bool,
    /// UTF-8 string
    String,
    /// Byte sequence
    Bytes,
    /// Enumerated symbol
    Enum {
        /// Allowed symbols in declaration order
        symbols: Vec<String>,
    },
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Int32 => "int32",
            FieldType::Int64 => "int64",
            FieldType::UInt32 => "uint32",
            FieldType::UInt64 => "uint64",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::Bool => "bool",
            FieldType::String => "string",
            FieldType::Bytes => "bytes",
            FieldType::Enum { .. } => "enum",
        }
    }

    /// Integer types of any width
    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            FieldType::Int32 | FieldType::Int64 | FieldType::UInt32 | FieldType::UInt64
        )
    }

    /// 64-bit integer types, the only ones allowed to carry a version
    pub fn is_integral_64(&self) -> bool {
        matches!(self, FieldType::Int64 | FieldType::UInt64)
    }

    /// Types with a total order usable as a sort key.
    ///
    /// Enum and bytes fields are rejected as sort keys.
    pub fn is_orderable(&self) -> bool {
        !matches!(self, FieldType::Bytes | FieldType::Enum { .. })
    }

    /// Create an enum type from a symbol list
    pub fn enumeration<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldType::Enum {
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Stable positional handle for a field within one schema.
///
/// Resolved once from a field name at configuration time; all per-call
/// field access goes through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldId(pub(crate) usize);

impl FieldId {
    /// Position of the field in schema declaration order
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Field definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name, unique within the schema
    pub name: String,
    /// Field data type
    #[serde(flatten)]
    pub field_type: FieldType,
}

impl FieldDef {
    /// Create a field definition
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// Ordered record type description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Declaring type name (also the default table name)
    pub name: String,
    /// Field definitions in declaration order
    pub fields: Vec<FieldDef>,
}

impl Schema {
    /// Create a schema from an ordered field list.
    ///
    /// Fails on an empty field list or duplicate field names.
    pub fn new(name: impl Into<String>, fields: Vec<FieldDef>) -> SchemaResult<Self> {
        let schema = Self {
            name: name.into(),
            fields,
        };
        schema.validate_structure()?;
        Ok(schema)
    }

    /// Start a schema with no fields, to be filled with [`Schema::field`]
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Validates the schema structure itself (not a record)
    pub fn validate_structure(&self) -> SchemaResult<()> {
        if self.fields.is_empty() {
            return Err(SchemaError::EmptySchema {
                schema: self.name.clone(),
            });
        }

        for (position, field) in self.fields.iter().enumerate() {
            if self.fields[..position].iter().any(|f| f.name == field.name) {
                return Err(SchemaError::DuplicateField {
                    schema: self.name.clone(),
                    field: field.name.clone(),
                });
            }
        }

        Ok(())
    }

    /// Field definition for a resolved id
    pub fn field(&self, id: FieldId) -> Option<&FieldDef> {
        self.fields.get(id.0)
    }

    /// Look up a field id by name
    pub fn field_id(&self, name: &str) -> Option<FieldId> {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .map(FieldId)
    }

    /// Number of declared fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when no fields are declared
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Incremental schema construction
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<FieldDef>,
}

impl SchemaBuilder {
    /// Append a field
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push(FieldDef::new(name, field_type));
        self
    }

    /// Validate and finish the schema
    pub fn build(self) -> SchemaResult<Schema> {
        Schema::new(self.name, self.fields)
    }
}

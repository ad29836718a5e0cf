//! Schema error types
//!
//! Error codes:
//! - SCHEMA_EMPTY
//! - SCHEMA_DUPLICATE_FIELD
//! - SCHEMA_UNKNOWN_FIELD
//! - SCHEMA_INVALID_ROLE
//! - SCHEMA_TYPE_MISMATCH

use thiserror::Error;

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Schema and reflection errors.
///
/// All of these are raised while configuring a store or building a record,
/// never mid-operation against a backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Schema '{schema}' declares no fields")]
    EmptySchema { schema: String },

    #[error("Schema '{schema}' declares field '{field}' more than once")]
    DuplicateField { schema: String, field: String },

    #[error("Schema '{schema}' has no field named '{field}' (fields: {available})")]
    UnknownField {
        schema: String,
        field: String,
        available: String,
    },

    #[error("Field '{field}' of type {found} cannot be used as the {role} field: {reason}")]
    InvalidRole {
        field: String,
        role: &'static str,
        found: &'static str,
        reason: &'static str,
    },

    #[error("Field '{field}' expects {expected}, got {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: String,
    },
}

impl SchemaError {
    /// Returns the string code for this error
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::EmptySchema { .. } => "SCHEMA_EMPTY",
            SchemaError::DuplicateField { .. } => "SCHEMA_DUPLICATE_FIELD",
            SchemaError::UnknownField { .. } => "SCHEMA_UNKNOWN_FIELD",
            SchemaError::InvalidRole { .. } => "SCHEMA_INVALID_ROLE",
            SchemaError::TypeMismatch { .. } => "SCHEMA_TYPE_MISMATCH",
        }
    }
}

//! Store error types
//!
//! Error codes:
//! - STORE_CONFIG (construction aborted)
//! - STORE_NOT_FOUND
//! - STORE_VERSION_CONFLICT (caller re-reads and retries)
//! - STORE_BACKEND
//! - STORE_MARSHAL
//! - STORE_INVALID_REQUEST
//! - STORE_CLOSED

use std::fmt;

use thiserror::Error;

use crate::schema::SchemaError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Error taxonomy shared by every store implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unresolved field or invalid field role, raised at construction
    Configuration,
    /// The addressed record is absent
    NotFound,
    /// A version-gated write observed a stale version
    VersionConflict,
    /// Underlying storage failure
    Backend,
    /// A value could not be bound or extracted
    Marshal,
    /// The request itself is malformed
    InvalidRequest,
    /// The store has been closed
    Closed,
}

impl ErrorKind {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "STORE_CONFIG",
            ErrorKind::NotFound => "STORE_NOT_FOUND",
            ErrorKind::VersionConflict => "STORE_VERSION_CONFLICT",
            ErrorKind::Backend => "STORE_BACKEND",
            ErrorKind::Marshal => "STORE_MARSHAL",
            ErrorKind::InvalidRequest => "STORE_INVALID_REQUEST",
            ErrorKind::Closed => "STORE_CLOSED",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid store configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Version conflict: {0}")]
    VersionConflict(String),

    #[error("{operation} requires field '{field}' to be set")]
    MissingField {
        field: String,
        operation: &'static str,
    },

    #[error("Record of schema '{found}' passed to store for schema '{expected}'")]
    SchemaMismatch { expected: String, found: String },

    #[error("Backend error: {context}")]
    Backend {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Cannot marshal field '{field}': {reason}")]
    Marshal { field: String, reason: String },

    #[error("Store is closed")]
    Closed,
}

impl StoreError {
    /// Returns the taxonomy bucket for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Config(_) | StoreError::Schema(_) => ErrorKind::Configuration,
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::VersionConflict(_) => ErrorKind::VersionConflict,
            StoreError::MissingField { .. } | StoreError::SchemaMismatch { .. } => {
                ErrorKind::InvalidRequest
            }
            StoreError::Backend { .. } => ErrorKind::Backend,
            StoreError::Marshal { .. } => ErrorKind::Marshal,
            StoreError::Closed => ErrorKind::Closed,
        }
    }

    /// Returns the string code
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// Whether re-reading and retrying the operation can succeed
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::VersionConflict
    }

    /// Adapter for `map_err` on backend calls
    pub fn backend(context: impl Into<String>) -> impl FnOnce(rusqlite::Error) -> StoreError {
        let context = context.into();
        move |source| StoreError::Backend { context, source }
    }

    pub(crate) fn marshal(field: impl Into<String>, reason: impl Into<String>) -> Self {
        StoreError::Marshal {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

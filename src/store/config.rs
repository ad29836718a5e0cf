//! Store configuration
//!
//! [`StoreConfig`] is the plain, serializable description a caller writes;
//! [`StoreConfig::resolve`] validates it once against a schema and yields the
//! immutable [`StoreLayout`] every store operation runs from.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::errors::{StoreError, StoreResult};
use crate::record::{Record, Value};
use crate::schema::{FieldDescriptor, Schema, SchemaReflector};

/// Read ordering direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    /// SQL keyword for ORDER BY
    pub fn sql_keyword(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }

    /// Orients an ascending comparison result
    pub fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

/// Sort field and direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    #[serde(default)]
    pub order: SortOrder,
}

impl SortSpec {
    /// Ascending sort on a field
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Ascending,
        }
    }

    /// Descending sort on a field
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Descending,
        }
    }
}

/// Field roles for one store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Field uniquely addressing a record
    pub identity_field: String,
    /// Secondary index fields, consulted in this order on read
    #[serde(default)]
    pub index_fields: Vec<String>,
    /// Optional read ordering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortSpec>,
    /// Optional optimistic concurrency counter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_field: Option<String>,
}

impl StoreConfig {
    /// Configuration with only an identity field
    pub fn new(identity_field: impl Into<String>) -> Self {
        Self {
            identity_field: identity_field.into(),
            ..Self::default()
        }
    }

    /// Adds a secondary index field
    pub fn with_index(mut self, field: impl Into<String>) -> Self {
        self.index_fields.push(field.into());
        self
    }

    /// Sets the sort field and direction
    pub fn with_sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some(SortSpec {
            field: field.into(),
            order,
        });
        self
    }

    /// Sets the version field
    pub fn with_version(mut self, field: impl Into<String>) -> Self {
        self.version_field = Some(field.into());
        self
    }

    /// Parses a configuration from JSON
    pub fn from_json(json: &str) -> StoreResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| StoreError::Config(format!("Malformed store configuration: {}", e)))
    }

    /// Validates the configuration against a schema.
    ///
    /// Fails on unknown fields, role type violations, duplicate index
    /// fields, and the identity field being reused as index or version.
    pub fn resolve(&self, schema: &Schema) -> StoreResult<StoreLayout> {
        if self.identity_field.is_empty() {
            return Err(StoreError::Config("An identity field is required".into()));
        }
        let identity = SchemaReflector::resolve_identity(schema, &self.identity_field)?;

        let mut indexes: Vec<FieldDescriptor> = Vec::with_capacity(self.index_fields.len());
        for name in &self.index_fields {
            let field = SchemaReflector::resolve_index(schema, name)?;
            if field.id() == identity.id() {
                return Err(StoreError::Config(format!(
                    "Identity field '{}' cannot also be a secondary index",
                    name
                )));
            }
            if indexes.iter().any(|f| f.id() == field.id()) {
                return Err(StoreError::Config(format!(
                    "Index field '{}' configured more than once",
                    name
                )));
            }
            indexes.push(field);
        }

        let sort = match &self.sort {
            Some(spec) => Some((SchemaReflector::resolve_sort(schema, &spec.field)?, spec.order)),
            None => None,
        };

        let version = match &self.version_field {
            Some(name) => {
                let field = SchemaReflector::resolve_version(schema, name)?;
                if field.id() == identity.id() {
                    return Err(StoreError::Config(format!(
                        "Identity field '{}' cannot also be the version field",
                        name
                    )));
                }
                Some(field)
            }
            None => None,
        };

        Ok(StoreLayout {
            identity,
            indexes,
            sort,
            version,
        })
    }
}

/// Read path chosen for a filter record
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selection<'a> {
    /// Exact identity match
    Identity(&'a Value),
    /// Equality on a secondary index field
    Index(&'a FieldDescriptor, &'a Value),
    /// Unfiltered scan
    All,
}

/// Validated, immutable field roles of one store
#[derive(Debug, Clone)]
pub struct StoreLayout {
    identity: FieldDescriptor,
    indexes: Vec<FieldDescriptor>,
    sort: Option<(FieldDescriptor, SortOrder)>,
    version: Option<FieldDescriptor>,
}

impl StoreLayout {
    /// Identity field
    pub fn identity(&self) -> &FieldDescriptor {
        &self.identity
    }

    /// Secondary index fields in registration order
    pub fn indexes(&self) -> &[FieldDescriptor] {
        &self.indexes
    }

    /// Sort field and direction
    pub fn sort(&self) -> Option<(&FieldDescriptor, SortOrder)> {
        self.sort.as_ref().map(|(field, order)| (field, *order))
    }

    /// Version field
    pub fn version(&self) -> Option<&FieldDescriptor> {
        self.version.as_ref()
    }

    /// Chooses the read path for a filter.
    ///
    /// Identity wins; otherwise the first index field, in registration
    /// order, that the filter sets; otherwise everything. A present
    /// default value (0, "") selects like any other value.
    pub fn select<'a>(&'a self, filter: &'a Record) -> Selection<'a> {
        if let Some(value) = filter.get(self.identity.id()) {
            return Selection::Identity(value);
        }
        for field in &self.indexes {
            if let Some(value) = filter.get(field.id()) {
                return Selection::Index(field, value);
            }
        }
        Selection::All
    }
}

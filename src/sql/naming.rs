//! Naming-convention store factory
//!
//! Binds schemas to tables without explicit configuration:
//!
//! - schema name is the table name
//! - the field named `urn` is the identity, generated as a UUID string
//! - fields ending in `Urn`, plus registered names, are secondary indexes
//! - the field named `vector`, when present, is the version
//! - a registered sort field present in the schema sets the read order
//!
//! One store is built per schema name and shared by later callers.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::{IdentityStrategy, SqlStoreConfig};
use super::store::{SharedConnection, SqlStore};
use crate::schema::Schema;
use crate::store::{RecordStore, SortOrder, SortSpec, StoreConfig, StoreError, StoreResult};

/// Identity field name
pub const URN_FIELD: &str = "urn";

/// Version field name
pub const VERSION_FIELD: &str = "vector";

/// Suffix marking a secondary index field
pub const INDEX_SUFFIX: &str = "Urn";

/// Extra index and sort registrations on top of the fixed names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingConvention {
    /// Additional index field names
    #[serde(default)]
    pub index_fields: Vec<String>,
    /// Candidate sort fields; the first one a schema declares is used
    #[serde(default)]
    pub sort_fields: Vec<SortSpec>,
}

impl NamingConvention {
    /// Registers an additional index field name
    pub fn with_index(mut self, field: impl Into<String>) -> Self {
        self.index_fields.push(field.into());
        self
    }

    /// Registers a sort field name and direction
    pub fn with_sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort_fields.push(SortSpec {
            field: field.into(),
            order,
        });
        self
    }

    /// Parses a convention from JSON
    pub fn from_json(json: &str) -> StoreResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| StoreError::Config(format!("Malformed naming convention: {}", e)))
    }

    /// Derives the store configuration for a schema
    pub fn config_for(&self, schema: &Schema) -> SqlStoreConfig {
        let mut store = StoreConfig::new(URN_FIELD);
        for field in &schema.fields {
            let name = field.name.as_str();
            if name == VERSION_FIELD {
                store.version_field = Some(VERSION_FIELD.to_string());
            }
            if name != URN_FIELD
                && (name.ends_with(INDEX_SUFFIX) || self.index_fields.iter().any(|f| f == name))
            {
                store.index_fields.push(name.to_string());
            }
        }
        store.sort = self
            .sort_fields
            .iter()
            .find(|spec| schema.field_id(&spec.field).is_some())
            .cloned();

        SqlStoreConfig::new(schema.name.clone(), IdentityStrategy::GeneratedUrn, store)
    }
}

/// Builds and caches convention-bound stores on one connection
pub struct NamedStoreFactory {
    connection: SharedConnection,
    convention: NamingConvention,
    registered: Mutex<HashSet<String>>,
    stores: Mutex<HashMap<String, Arc<SqlStore>>>,
}

impl NamedStoreFactory {
    pub fn new(connection: SharedConnection, convention: NamingConvention) -> Self {
        Self {
            connection,
            convention,
            registered: Mutex::new(HashSet::new()),
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// Declares a schema as supported before any store is built for it
    pub fn register(&self, schema: &Schema) {
        self.registered.lock().insert(schema.name.clone());
    }

    /// True if the schema was registered or already has a store
    pub fn is_supported(&self, schema: &Schema) -> bool {
        self.registered.lock().contains(&schema.name)
            || self.stores.lock().contains_key(&schema.name)
    }

    /// Convention in effect
    pub fn convention(&self) -> &NamingConvention {
        &self.convention
    }

    /// Store for a schema, built on first request
    pub fn store_for(&self, schema: &Arc<Schema>) -> StoreResult<Arc<SqlStore>> {
        let mut stores = self.stores.lock();
        if let Some(store) = stores.get(&schema.name) {
            return Ok(store.clone());
        }

        let config = self.convention.config_for(schema);
        debug!(schema = %schema.name, ?config, "binding store by convention");
        let store = Arc::new(SqlStore::new(
            self.connection.clone(),
            schema.clone(),
            &config,
        )?);
        stores.insert(schema.name.clone(), store.clone());
        Ok(store)
    }

    /// Closes every store built so far
    pub fn close(&self) -> StoreResult<()> {
        let stores: Vec<Arc<SqlStore>> = self.stores.lock().drain().map(|(_, s)| s).collect();
        for store in stores {
            store.close()?;
        }
        Ok(())
    }
}

//! Relational store configuration

use serde::{Deserialize, Serialize};

use crate::store::{StoreConfig, StoreError, StoreResult};

/// How a relational store assigns identities
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityStrategy {
    /// The backend assigns an integer on insert (rowid / AUTOINCREMENT)
    AutoIncrement,
    /// The store generates a random UUID string before insert
    #[default]
    GeneratedUrn,
}

/// Table binding plus field roles for a [`super::SqlStore`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlStoreConfig {
    /// Backing table name
    pub table: String,
    /// Identity assignment strategy
    #[serde(default)]
    pub identity: IdentityStrategy,
    /// Field roles
    #[serde(flatten)]
    pub store: StoreConfig,
}

impl SqlStoreConfig {
    /// Binds field roles to a table
    pub fn new(table: impl Into<String>, identity: IdentityStrategy, store: StoreConfig) -> Self {
        Self {
            table: table.into(),
            identity,
            store,
        }
    }

    /// Parses a configuration from JSON
    pub fn from_json(json: &str) -> StoreResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| StoreError::Config(format!("Malformed SQL store configuration: {}", e)))
    }
}

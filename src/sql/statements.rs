//! Parameterized statement construction
//!
//! Every statement a [`super::SqlStore`] will ever run is generated once,
//! when the store is built, from the schema field list and the validated
//! layout. Columns are always listed in schema declaration order and all
//! parameters are positional (`?`).

use tracing::debug;

use super::config::IdentityStrategy;
use crate::schema::{FieldDescriptor, FieldId};
use crate::store::{StoreError, StoreLayout, StoreResult};

/// Statements derived from one schema and layout
#[derive(Debug, Clone)]
pub struct StatementSet {
    insert: String,
    insert_fields: Vec<FieldId>,
    select_all: String,
    select_identity: String,
    select_indexes: Vec<(FieldId, String)>,
    update: String,
    update_fields: Vec<FieldId>,
    delete: String,
}

impl StatementSet {
    /// Generates all statements for a table.
    ///
    /// - insert: every column, minus the identity for auto-increment
    /// - select: one per index field, one by identity, one unconditional,
    ///   each with the optional ORDER BY
    /// - update: SET every non-identity column WHERE identity [AND version]
    /// - delete: WHERE identity [AND version]
    pub fn build(
        table: &str,
        fields: &[FieldDescriptor],
        layout: &StoreLayout,
        strategy: IdentityStrategy,
    ) -> StoreResult<Self> {
        if table.trim().is_empty() {
            return Err(StoreError::Config("A table name is required".into()));
        }
        let table = quote_identifier(table);
        let identity = layout.identity();

        let insert_fields: Vec<&FieldDescriptor> = fields
            .iter()
            .filter(|f| strategy != IdentityStrategy::AutoIncrement || f.id() != identity.id())
            .collect();
        let insert = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            column_list(&insert_fields),
            placeholders(insert_fields.len())
        );

        let all_fields: Vec<&FieldDescriptor> = fields.iter().collect();
        let select_all = select_statement(&table, &all_fields, None, layout);
        let select_identity = select_statement(&table, &all_fields, Some(identity), layout);
        let select_indexes = layout
            .indexes()
            .iter()
            .map(|field| {
                (
                    field.id(),
                    select_statement(&table, &all_fields, Some(field), layout),
                )
            })
            .collect();

        let update_fields: Vec<&FieldDescriptor> =
            fields.iter().filter(|f| f.id() != identity.id()).collect();
        if update_fields.is_empty() {
            return Err(StoreError::Config(format!(
                "Table {} has no columns besides the identity to update",
                table
            )));
        }
        let update = format!(
            "UPDATE {} SET {} WHERE {}",
            table,
            update_fields
                .iter()
                .map(|f| format!("{} = ?", quote_identifier(f.name())))
                .collect::<Vec<_>>()
                .join(", "),
            key_predicate(layout)
        );

        let delete = format!("DELETE FROM {} WHERE {}", table, key_predicate(layout));

        let set = Self {
            insert,
            insert_fields: insert_fields.iter().map(|f| f.id()).collect(),
            select_all,
            select_identity,
            select_indexes,
            update,
            update_fields: update_fields.iter().map(|f| f.id()).collect(),
            delete,
        };
        for sql in set.all() {
            debug!(%sql, "generated statement");
        }
        Ok(set)
    }

    /// INSERT statement
    pub fn insert(&self) -> &str {
        &self.insert
    }

    /// Fields bound by the INSERT, in placeholder order
    pub fn insert_fields(&self) -> &[FieldId] {
        &self.insert_fields
    }

    /// Unconditional SELECT
    pub fn select_all(&self) -> &str {
        &self.select_all
    }

    /// SELECT by identity
    pub fn select_identity(&self) -> &str {
        &self.select_identity
    }

    /// SELECT by a secondary index field
    pub fn select_index(&self, field: FieldId) -> Option<&str> {
        self.select_indexes
            .iter()
            .find(|(id, _)| *id == field)
            .map(|(_, sql)| sql.as_str())
    }

    /// UPDATE statement
    pub fn update(&self) -> &str {
        &self.update
    }

    /// Fields bound by the SET list, in placeholder order.
    ///
    /// The identity and, when versioned, the expected version follow.
    pub fn update_fields(&self) -> &[FieldId] {
        &self.update_fields
    }

    /// DELETE statement
    pub fn delete(&self) -> &str {
        &self.delete
    }

    /// Every statement, for preparation and logging
    pub fn all(&self) -> impl Iterator<Item = &str> {
        [
            self.insert.as_str(),
            self.select_all.as_str(),
            self.select_identity.as_str(),
            self.update.as_str(),
            self.delete.as_str(),
        ]
        .into_iter()
        .chain(self.select_indexes.iter().map(|(_, sql)| sql.as_str()))
    }
}

/// Double-quotes an SQL identifier
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn column_list(fields: &[&FieldDescriptor]) -> String {
    fields
        .iter()
        .map(|f| quote_identifier(f.name()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn key_predicate(layout: &StoreLayout) -> String {
    let mut predicate = format!("{} = ?", quote_identifier(layout.identity().name()));
    if let Some(version) = layout.version() {
        predicate.push_str(&format!(" AND {} = ?", quote_identifier(version.name())));
    }
    predicate
}

fn select_statement(
    table: &str,
    fields: &[&FieldDescriptor],
    filter: Option<&FieldDescriptor>,
    layout: &StoreLayout,
) -> String {
    let mut sql = format!("SELECT {} FROM {}", column_list(fields), table);
    if let Some(field) = filter {
        sql.push_str(&format!(" WHERE {} = ?", quote_identifier(field.name())));
    }
    // rowid breaks ties in insertion order
    if let Some((field, order)) = layout.sort() {
        sql.push_str(&format!(
            " ORDER BY {} {}, rowid ASC",
            quote_identifier(field.name()),
            order.sql_keyword()
        ));
    }
    sql
}

//! Cursor over a relational result set
//!
//! Rows are fetched as raw column values while the connection lock is held
//! and decoded into records one at a time as the sequence advances, so a
//! marshaling failure surfaces on the step that hits the bad row.

use std::collections::VecDeque;
use std::sync::Arc;

use rusqlite::types::Value as SqlValue;
use rusqlite::{Params, Statement};

use super::marshal;
use crate::record::Record;
use crate::schema::{FieldDescriptor, Schema};
use crate::store::{Cursor, StoreError, StoreResult};

pub struct SqlCursor {
    schema: Arc<Schema>,
    fields: Arc<[FieldDescriptor]>,
    rows: VecDeque<Vec<SqlValue>>,
}

impl SqlCursor {
    pub fn new(
        schema: Arc<Schema>,
        fields: Arc<[FieldDescriptor]>,
        rows: VecDeque<Vec<SqlValue>>,
    ) -> Self {
        Self {
            schema,
            fields,
            rows,
        }
    }

    /// Rows not yet decoded
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    fn decode(&self, row: Vec<SqlValue>) -> StoreResult<Record> {
        let mut record = Record::new(self.schema.clone());
        for (field, raw) in self.fields.iter().zip(row) {
            record.put(field.id(), marshal::extract(field, raw)?);
        }
        Ok(record)
    }
}

impl Cursor for SqlCursor {
    fn fetch(&mut self) -> StoreResult<Option<Record>> {
        match self.rows.pop_front() {
            Some(row) => self.decode(row).map(Some),
            None => Ok(None),
        }
    }

    fn release(&mut self) -> StoreResult<()> {
        self.rows.clear();
        Ok(())
    }
}

/// Runs a query and buffers every row as raw column values
pub fn fetch_rows<P: Params>(
    statement: &mut Statement<'_>,
    params: P,
    columns: usize,
) -> StoreResult<VecDeque<Vec<SqlValue>>> {
    let mut rows = statement
        .query(params)
        .map_err(StoreError::backend("query failed"))?;
    let mut buffered = VecDeque::new();
    while let Some(row) = rows.next().map_err(StoreError::backend("row fetch failed"))? {
        let mut values = Vec::with_capacity(columns);
        for column in 0..columns {
            values.push(
                row.get::<_, SqlValue>(column)
                    .map_err(StoreError::backend("column read failed"))?,
            );
        }
        buffered.push_back(values);
    }
    Ok(buffered)
}

//! Result sequences
//!
//! A [`RecordSequence`] is the lazy, forward-only, resource-owning result of
//! a read. It pulls records from a backend [`Cursor`] on demand and releases
//! the cursor when closed, when exhausted, or at the latest when dropped.

use std::fmt;

use tracing::{debug, warn};

use super::errors::StoreResult;
use crate::record::Record;

/// Backend cursor behind a sequence
pub trait Cursor: Send {
    /// Produces the next record, None once exhausted
    fn fetch(&mut self) -> StoreResult<Option<Record>>;

    /// Releases backend resources. Called at most once.
    fn release(&mut self) -> StoreResult<()>;
}

/// Cursor over an owned snapshot of records
pub struct SnapshotCursor {
    records: std::vec::IntoIter<Record>,
}

impl SnapshotCursor {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: records.into_iter(),
        }
    }
}

impl Cursor for SnapshotCursor {
    fn fetch(&mut self) -> StoreResult<Option<Record>> {
        Ok(self.records.next())
    }

    fn release(&mut self) -> StoreResult<()> {
        self.records = Vec::new().into_iter();
        Ok(())
    }
}

/// Lazy forward-only sequence of records.
///
/// - `has_next` peeks without moving the position and may be called any
///   number of times
/// - iteration yields exactly one record per step and closes the sequence
///   on exhaustion or on the first error
/// - `close` is idempotent
///
/// Not meant for concurrent consumption.
pub struct RecordSequence {
    cursor: Option<Box<dyn Cursor>>,
    peeked: Option<Record>,
}

impl RecordSequence {
    /// Wraps a backend cursor
    pub fn new(cursor: impl Cursor + 'static) -> Self {
        Self {
            cursor: Some(Box::new(cursor)),
            peeked: None,
        }
    }

    /// Sequence over an owned snapshot
    pub fn from_records(records: Vec<Record>) -> Self {
        Self::new(SnapshotCursor::new(records))
    }

    /// Sequence with no records
    pub fn empty() -> Self {
        Self {
            cursor: None,
            peeked: None,
        }
    }

    /// True if another record is available.
    ///
    /// A peeked record is buffered so the next step still yields it.
    pub fn has_next(&mut self) -> StoreResult<bool> {
        if self.peeked.is_some() {
            return Ok(true);
        }
        match self.pull()? {
            Some(record) => {
                self.peeked = Some(record);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// True once the cursor has been released
    pub fn is_closed(&self) -> bool {
        self.cursor.is_none()
    }

    /// Releases the cursor; further steps yield nothing
    pub fn close(&mut self) -> StoreResult<()> {
        self.peeked = None;
        match self.cursor.take() {
            Some(mut cursor) => cursor.release(),
            None => Ok(()),
        }
    }

    /// Drains the remaining records and closes the sequence
    pub fn collect_records(mut self) -> StoreResult<Vec<Record>> {
        let mut records = Vec::new();
        for record in &mut self {
            records.push(record?);
        }
        self.close()?;
        Ok(records)
    }

    fn pull(&mut self) -> StoreResult<Option<Record>> {
        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(None);
        };
        match cursor.fetch() {
            Ok(Some(record)) => Ok(Some(record)),
            Ok(None) => {
                self.close()?;
                Ok(None)
            }
            Err(e) => {
                // the error is what the caller needs; a failed release adds nothing
                let _ = self.close();
                Err(e)
            }
        }
    }
}

impl Iterator for RecordSequence {
    type Item = StoreResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(record) = self.peeked.take() {
            return Some(Ok(record));
        }
        self.pull().transpose()
    }
}

impl Drop for RecordSequence {
    fn drop(&mut self) {
        if self.cursor.is_some() {
            debug!("record sequence dropped without close");
            if let Err(e) = self.close() {
                warn!(error = %e, "failed to release cursor of dropped record sequence");
            }
        }
    }
}

impl fmt::Debug for RecordSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordSequence")
            .field("closed", &self.is_closed())
            .field("peeked", &self.peeked.is_some())
            .finish()
    }
}

//! In-memory exporters modelling the two physical backend shapes.
//!
//! [`TableExporter`] behaves like a relational table keyed by an integer
//! primary key: `MAX(id)` counts and id-range windows. [`SortedSetExporter`]
//! behaves like a key/value store's sorted set: exact cardinality and rank
//! windows. Both are used by tests and by embedders that stage data in
//! memory.

use std::collections::BTreeMap;

use porter_types::{ExportRecord, ObjectType};

use crate::error::{RowError, SourceError, SourceResult};
use crate::traits::{ObjectExporter, RowResult};
use crate::window::{RecordCount, Window};

#[derive(Clone, Debug)]
enum StoredRow {
    Record(ExportRecord),
    Malformed(String),
}

impl StoredRow {
    fn to_result(&self, object: ObjectType, key: impl ToString) -> RowResult {
        match self {
            Self::Record(record) => Ok(record.clone()),
            Self::Malformed(reason) => Err(RowError::new(object, key, reason.clone())),
        }
    }
}

/// A table keyed by an integer row id.
///
/// The row id is the physical primary key; the record's own source id may
/// differ (relation rows export no source id at all).
#[derive(Clone, Debug)]
pub struct TableExporter {
    object_type: ObjectType,
    table: String,
    available: bool,
    rows: BTreeMap<i64, StoredRow>,
}

impl TableExporter {
    pub fn new(object_type: ObjectType, table: impl Into<String>) -> Self {
        Self {
            object_type,
            table: table.into(),
            available: true,
            rows: BTreeMap::new(),
        }
    }

    /// A table that does not exist in the source; probing it fails.
    pub fn unavailable(object_type: ObjectType, table: impl Into<String>) -> Self {
        Self {
            available: false,
            ..Self::new(object_type, table)
        }
    }

    pub fn insert(&mut self, row_id: i64, record: ExportRecord) {
        self.rows.insert(row_id, StoredRow::Record(record));
    }

    /// Store a row that fails to decode.
    pub fn insert_malformed(&mut self, row_id: i64, reason: impl Into<String>) {
        self.rows.insert(row_id, StoredRow::Malformed(reason.into()));
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn check(&self) -> SourceResult<()> {
        if self.available {
            Ok(())
        } else {
            Err(SourceError::Schema {
                object: self.table.clone(),
                detail: "table does not exist".into(),
            })
        }
    }
}

impl ObjectExporter for TableExporter {
    fn object_type(&self) -> ObjectType {
        self.object_type
    }

    fn validate(&self) -> SourceResult<()> {
        self.check()
    }

    fn count(&self) -> SourceResult<RecordCount> {
        self.check()?;
        let max = self.rows.keys().next_back().copied().unwrap_or(0).max(0);
        Ok(RecordCount::upper_bound(max as u64))
    }

    fn export(&self, window: Window) -> SourceResult<Vec<RowResult>> {
        self.check()?;
        if window.limit == 0 {
            return Ok(Vec::new());
        }
        Ok(self
            .rows
            .range(window.id_range())
            .map(|(id, row)| row.to_result(self.object_type, id))
            .collect())
    }
}

/// A sorted set of members, each with a score and a record.
///
/// Members are ordered by score, then by insertion order among equal scores.
#[derive(Clone, Debug)]
pub struct SortedSetExporter {
    object_type: ObjectType,
    key: String,
    available: bool,
    members: Vec<(i64, StoredRow)>,
}

impl SortedSetExporter {
    pub fn new(object_type: ObjectType, key: impl Into<String>) -> Self {
        Self {
            object_type,
            key: key.into(),
            available: true,
            members: Vec::new(),
        }
    }

    pub fn unavailable(object_type: ObjectType, key: impl Into<String>) -> Self {
        Self {
            available: false,
            ..Self::new(object_type, key)
        }
    }

    pub fn insert(&mut self, score: i64, record: ExportRecord) {
        self.insert_row(score, StoredRow::Record(record));
    }

    pub fn insert_malformed(&mut self, score: i64, reason: impl Into<String>) {
        self.insert_row(score, StoredRow::Malformed(reason.into()));
    }

    fn insert_row(&mut self, score: i64, row: StoredRow) {
        let at = self.members.partition_point(|(s, _)| *s <= score);
        self.members.insert(at, (score, row));
    }

    fn check(&self) -> SourceResult<()> {
        if self.available {
            Ok(())
        } else {
            Err(SourceError::Schema {
                object: self.key.clone(),
                detail: "sorted set does not exist".into(),
            })
        }
    }
}

impl ObjectExporter for SortedSetExporter {
    fn object_type(&self) -> ObjectType {
        self.object_type
    }

    fn validate(&self) -> SourceResult<()> {
        self.check()
    }

    fn count(&self) -> SourceResult<RecordCount> {
        self.check()?;
        Ok(RecordCount::exact(self.members.len() as u64))
    }

    fn export(&self, window: Window) -> SourceResult<Vec<RowResult>> {
        self.check()?;
        let len = self.members.len() as u64;
        let range = window.rank_range();
        let start = range.start.min(len) as usize;
        let end = range.end.min(len) as usize;
        Ok(self.members[start..end]
            .iter()
            .enumerate()
            .map(|(i, (_, row))| row.to_result(self.object_type, start + i))
            .collect())
    }
}

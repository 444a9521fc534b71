use std::ops::{Range, RangeInclusive};

use serde::{Deserialize, Serialize};

/// A pagination window over one object type.
///
/// Relational backends read it as an id range (`BETWEEN offset+1 AND
/// offset+limit`), sorted-set backends as a rank range. Consecutive windows
/// never overlap and leave no gaps under either reading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    pub offset: u64,
    pub limit: u64,
}

impl Window {
    pub fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    /// First offset after this window.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.limit)
    }

    /// The window that follows this one.
    pub fn next(&self) -> Self {
        Self::new(self.end(), self.limit)
    }

    /// Inclusive id range `offset+1 ..= offset+limit`.
    pub fn id_range(&self) -> RangeInclusive<i64> {
        let start = i64::try_from(self.offset.saturating_add(1)).unwrap_or(i64::MAX);
        let end = i64::try_from(self.end()).unwrap_or(i64::MAX);
        start..=end
    }

    /// Half-open rank range `offset .. offset+limit`.
    pub fn rank_range(&self) -> Range<u64> {
        self.offset..self.end()
    }
}

/// The size a source reports for one object type.
///
/// Sources with gaps in their ids report `MAX(id)`, an upper bound. Either
/// way the number is a progress estimate: the records actually produced may
/// be fewer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCount {
    pub total: u64,
    pub exact: bool,
}

impl RecordCount {
    pub fn exact(total: u64) -> Self {
        Self { total, exact: true }
    }

    pub fn upper_bound(total: u64) -> Self {
        Self {
            total,
            exact: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

use tracing::{debug, warn};

use porter_types::{ExportRecord, ObjectType};

use crate::error::SourceResult;
use crate::traits::SourceConnector;
use crate::window::{RecordCount, Window};

/// One window's worth of usable records.
#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
    pub window: Window,
    pub records: Vec<ExportRecord>,
    /// Malformed rows dropped from this window.
    pub skipped: usize,
}

/// Walks one object type of one connector in fixed-size windows.
///
/// The count is taken once, up front, and is only used to decide when to
/// stop: enumeration ends at the first window starting at or beyond it.
pub struct ChunkedEnumerator<'a> {
    connector: &'a dyn SourceConnector,
    object_type: ObjectType,
    chunk_size: u64,
    count: RecordCount,
    next_offset: u64,
}

impl<'a> ChunkedEnumerator<'a> {
    pub fn new(
        connector: &'a dyn SourceConnector,
        object_type: ObjectType,
        chunk_size: usize,
    ) -> SourceResult<Self> {
        let count = connector.count(object_type)?;
        Ok(Self {
            connector,
            object_type,
            chunk_size: (chunk_size as u64).max(1),
            count,
            next_offset: 0,
        })
    }

    /// Continue from a previously completed offset.
    pub fn resume_at(mut self, offset: u64) -> Self {
        self.next_offset = offset;
        self
    }

    /// The source's count for this type; a progress estimate.
    pub fn estimate(&self) -> RecordCount {
        self.count
    }

    /// Offset the next chunk starts at.
    pub fn offset(&self) -> u64 {
        self.next_offset
    }

    pub fn is_done(&self) -> bool {
        self.next_offset >= self.count.total
    }

    /// Fetch the next window, or `None` once past the count.
    pub fn next_chunk(&mut self) -> SourceResult<Option<Chunk>> {
        if self.is_done() {
            return Ok(None);
        }
        let window = Window::new(self.next_offset, self.chunk_size);
        let rows = self.connector.export(self.object_type, window)?;

        let mut records = Vec::with_capacity(rows.len());
        let mut skipped = 0;
        for row in rows {
            match row {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(object = %self.object_type, error = %e, "skipping malformed row");
                    skipped += 1;
                }
            }
        }

        debug!(
            object = %self.object_type,
            offset = window.offset,
            records = records.len(),
            skipped,
            "chunk exported"
        );
        self.next_offset = window.end();
        Ok(Some(Chunk {
            window,
            records,
            skipped,
        }))
    }
}

impl Iterator for ChunkedEnumerator<'_> {
    type Item = SourceResult<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{SortedSetExporter, TableExporter};
    use crate::registry::{ExporterRegistry, RegistryConnector};
    use porter_markup::Dialect;
    use porter_types::SourceId;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn table_connector(ids: &[i64]) -> RegistryConnector {
        let mut posts = TableExporter::new(ObjectType::Post, "posts");
        for &id in ids {
            posts.insert(id, ExportRecord::new(id).with_field("message", "m"));
        }
        RegistryConnector::new("t", Dialect::BbCode, ExporterRegistry::new().with(posts))
    }

    fn collect_ids(connector: &RegistryConnector, ty: ObjectType, chunk: usize) -> Vec<SourceId> {
        ChunkedEnumerator::new(connector, ty, chunk)
            .unwrap()
            .flat_map(|c| c.unwrap().records)
            .filter_map(|r| r.source_id)
            .collect()
    }

    #[test]
    fn gaps_in_ids_are_covered() {
        let c = table_connector(&[1, 2, 5, 9, 10, 11, 40]);
        let ids = collect_ids(&c, ObjectType::Post, 3);
        let expected: Vec<SourceId> = [1, 2, 5, 9, 10, 11, 40].into_iter().map(SourceId::Int).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn estimate_is_not_a_postcondition() {
        let c = table_connector(&[3, 100]);
        let e = ChunkedEnumerator::new(&c, ObjectType::Post, 10).unwrap();
        assert_eq!(e.estimate(), RecordCount::upper_bound(100));
        assert_eq!(e.estimate().total, 100);
        assert_eq!(collect_ids(&c, ObjectType::Post, 10).len(), 2);
        // Iterator::count walks every window up to the estimate.
        assert_eq!(e.count(), 10);
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let mut posts = TableExporter::new(ObjectType::Post, "posts");
        posts.insert(1, ExportRecord::new(1));
        posts.insert_malformed(2, "bad encoding");
        posts.insert(3, ExportRecord::new(3));
        let c = RegistryConnector::new("t", Dialect::BbCode, ExporterRegistry::new().with(posts));

        let mut e = ChunkedEnumerator::new(&c, ObjectType::Post, 10).unwrap();
        let chunk = e.next_chunk().unwrap().unwrap();
        assert_eq!(chunk.records.len(), 2);
        assert_eq!(chunk.skipped, 1);
        assert!(e.next_chunk().unwrap().is_none());
    }

    #[test]
    fn resume_skips_completed_windows() {
        let c = table_connector(&[1, 2, 3, 4, 5, 6]);
        let e = ChunkedEnumerator::new(&c, ObjectType::Post, 2).unwrap().resume_at(4);
        let ids: Vec<_> = e.flat_map(|c| c.unwrap().records).filter_map(|r| r.source_id).collect();
        assert_eq!(ids, vec![SourceId::Int(5), SourceId::Int(6)]);
    }

    #[test]
    fn empty_source_yields_nothing() {
        let c = table_connector(&[]);
        let mut e = ChunkedEnumerator::new(&c, ObjectType::Post, 5).unwrap();
        assert!(e.is_done());
        assert!(e.next_chunk().unwrap().is_none());
    }

    proptest! {
        #[test]
        fn table_windows_cover_every_row_once(
            ids in prop::collection::btree_set(1i64..500, 0..60),
            chunk in 1usize..40,
        ) {
            let ids: Vec<i64> = ids.into_iter().collect();
            let c = table_connector(&ids);
            let got = collect_ids(&c, ObjectType::Post, chunk);
            let expected: Vec<SourceId> = ids.iter().copied().map(SourceId::Int).collect();
            prop_assert_eq!(got, expected);
        }

        #[test]
        fn sorted_set_windows_cover_every_member_once(
            members in prop::collection::btree_set("[a-z]{1,6}", 0..60),
            chunk in 1usize..40,
        ) {
            let mut set = SortedSetExporter::new(ObjectType::User, "users:joindate");
            for (score, member) in members.iter().enumerate() {
                set.insert(score as i64, ExportRecord::new(member.as_str()));
            }
            let c = RegistryConnector::new("s", Dialect::Markdown, ExporterRegistry::new().with(set));
            let got: BTreeSet<SourceId> = collect_ids(&c, ObjectType::User, chunk).into_iter().collect();
            let all = collect_ids(&c, ObjectType::User, chunk);
            prop_assert_eq!(all.len(), members.len());
            let expected: BTreeSet<SourceId> = members.iter().map(|m| SourceId::from(m.as_str())).collect();
            prop_assert_eq!(got, expected);
        }
    }
}

//! Parent-before-child export of parent-indexed records (board trees).

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use tracing::warn;

use porter_types::{ExportRecord, FieldValue, ObjectType, SourceId};

use crate::error::SourceResult;
use crate::traits::{ObjectExporter, RowResult};
use crate::window::{RecordCount, Window};

/// Exports a hierarchy so that every parent precedes its children.
///
/// The order is computed once, at construction: the parent-to-children map
/// is built in one pass and walked depth-first with an explicit stack,
/// siblings ordered by their position field and then by source id. Records
/// that no root reaches (members of a parent cycle, children of a missing
/// parent) come last. Each such group is entered at its topmost record, or
/// at the first-sorting member of its cycle; that record has its parent
/// reference cleared and the rest of the group follows it in tree order.
#[derive(Clone, Debug)]
pub struct HierarchyExporter {
    object_type: ObjectType,
    ordered: Vec<ExportRecord>,
}

impl HierarchyExporter {
    pub fn new(
        object_type: ObjectType,
        parent_field: &str,
        position_field: &str,
        records: Vec<ExportRecord>,
    ) -> Self {
        let ordered = order_hierarchy(object_type, parent_field, position_field, records);
        Self {
            object_type,
            ordered,
        }
    }

    /// Records in export order.
    pub fn ordered(&self) -> &[ExportRecord] {
        &self.ordered
    }
}

impl ObjectExporter for HierarchyExporter {
    fn object_type(&self) -> ObjectType {
        self.object_type
    }

    fn validate(&self) -> SourceResult<()> {
        Ok(())
    }

    fn count(&self) -> SourceResult<RecordCount> {
        Ok(RecordCount::exact(self.ordered.len() as u64))
    }

    fn export(&self, window: Window) -> SourceResult<Vec<RowResult>> {
        let len = self.ordered.len() as u64;
        let range = window.rank_range();
        let (start, end) = (range.start.min(len) as usize, range.end.min(len) as usize);
        Ok(self.ordered[start..end].iter().cloned().map(Ok).collect())
    }
}

fn order_hierarchy(
    object_type: ObjectType,
    parent_field: &str,
    position_field: &str,
    records: Vec<ExportRecord>,
) -> Vec<ExportRecord> {
    let sort_key = |r: &ExportRecord| {
        let position = r.field(position_field).and_then(FieldValue::as_int).unwrap_or(0);
        (position, r.source_id.clone())
    };

    let mut index: HashMap<SourceId, usize> = HashMap::new();
    for (i, record) in records.iter().enumerate() {
        if let Some(id) = record.identity() {
            index.entry(id.clone()).or_insert(i);
        }
    }

    let mut roots = Vec::new();
    let mut parents: HashMap<usize, usize> = HashMap::new();
    let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
    for (i, record) in records.iter().enumerate() {
        match record.field(parent_field).and_then(FieldValue::to_source_id) {
            None => roots.push(i),
            Some(parent) => {
                // a dangling parent is handled with the unreachable records
                if let Some(&p) = index.get(&parent) {
                    parents.insert(i, p);
                    children.entry(p).or_default().push(i);
                }
            }
        }
    }

    let by_key = |a: &usize, b: &usize| sort_key(&records[*a]).cmp(&sort_key(&records[*b]));
    roots.sort_by(by_key);
    for list in children.values_mut() {
        list.sort_by(by_key);
    }

    let mut order = Vec::with_capacity(records.len());
    let mut visited = HashSet::new();
    let mut cleared = HashSet::new();
    walk(&roots, &children, &mut visited, &mut order);

    let mut rest: Vec<usize> = (0..records.len()).filter(|i| !visited.contains(i)).collect();
    rest.sort_by(by_key);
    for i in rest {
        if visited.contains(&i) {
            continue;
        }
        let entry = group_entry(i, &parents, |a, b| by_key(&a, &b));
        warn!(
            object = %object_type,
            id = ?records[entry].source_id,
            "record unreachable from a root; parent reference cleared"
        );
        cleared.insert(entry);
        walk(&[entry], &children, &mut visited, &mut order);
    }

    let mut slots: Vec<Option<ExportRecord>> = records.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|i| {
            let mut record = slots[i].take()?;
            if cleared.contains(&i) {
                record.fields.insert(parent_field.to_string(), FieldValue::Null);
            }
            Some(record)
        })
        .collect()
}

/// The record an unreachable group is exported from.
///
/// Climbs the parent chain from `start`. A chain ending at a missing parent
/// enters at its top record; a chain closing a cycle enters at the cycle
/// member that sorts first.
fn group_entry<F>(start: usize, parents: &HashMap<usize, usize>, by_key: F) -> usize
where
    F: Fn(usize, usize) -> Ordering,
{
    let mut path = vec![start];
    let mut current = start;
    while let Some(&parent) = parents.get(&current) {
        if let Some(pos) = path.iter().position(|&p| p == parent) {
            return path[pos..]
                .iter()
                .copied()
                .min_by(|a, b| by_key(*a, *b))
                .unwrap_or(parent);
        }
        path.push(parent);
        current = parent;
    }
    current
}

fn walk(
    start: &[usize],
    children: &HashMap<usize, Vec<usize>>,
    visited: &mut HashSet<usize>,
    order: &mut Vec<usize>,
) {
    let mut stack: Vec<usize> = start.iter().rev().copied().collect();
    while let Some(node) = stack.pop() {
        if !visited.insert(node) {
            continue;
        }
        order.push(node);
        if let Some(kids) = children.get(&node) {
            stack.extend(kids.iter().rev().filter(|k| !visited.contains(*k)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(id: i64, parent: Option<i64>, position: i64) -> ExportRecord {
        ExportRecord::new(id)
            .with_field("parentID", parent)
            .with_field("position", position)
    }

    fn ids(e: &HierarchyExporter) -> Vec<i64> {
        e.ordered()
            .iter()
            .map(|r| r.source_id.as_ref().and_then(SourceId::as_int).unwrap())
            .collect()
    }

    fn parent_of(e: &HierarchyExporter, id: i64) -> Option<SourceId> {
        e.ordered()
            .iter()
            .find(|r| r.source_id == Some(SourceId::Int(id)))
            .and_then(|r| r.field("parentID"))
            .and_then(FieldValue::to_source_id)
    }

    #[test]
    fn parents_come_before_children() {
        let e = HierarchyExporter::new(
            ObjectType::Board,
            "parentID",
            "position",
            vec![
                board(3, Some(1), 0),
                board(2, None, 2),
                board(1, None, 1),
                board(4, Some(3), 0),
                board(5, Some(1), -1),
            ],
        );
        assert_eq!(ids(&e), vec![1, 5, 3, 4, 2]);
        assert_eq!(e.count().unwrap(), RecordCount::exact(5));
    }

    #[test]
    fn cycles_are_broken() {
        let e = HierarchyExporter::new(
            ObjectType::Board,
            "parentID",
            "position",
            vec![board(1, None, 0), board(2, Some(3), 0), board(3, Some(2), 0)],
        );
        assert_eq!(ids(&e), vec![1, 2, 3]);
        assert_eq!(parent_of(&e, 2), None);
        assert_eq!(parent_of(&e, 3), Some(SourceId::Int(2)));
    }

    #[test]
    fn self_parent_is_cleared() {
        let e = HierarchyExporter::new(
            ObjectType::Board,
            "parentID",
            "position",
            vec![board(7, Some(7), 0)],
        );
        assert_eq!(ids(&e), vec![7]);
        assert_eq!(parent_of(&e, 7), None);
    }

    #[test]
    fn dangling_parents_come_last() {
        let e = HierarchyExporter::new(
            ObjectType::Board,
            "parentID",
            "position",
            vec![board(10, Some(99), 0), board(11, Some(10), 0), board(1, None, 5)],
        );
        assert_eq!(ids(&e), vec![1, 10, 11]);
        assert_eq!(parent_of(&e, 10), None);
        assert_eq!(parent_of(&e, 11), Some(SourceId::Int(10)));
    }

    #[test]
    fn detached_group_enters_at_its_top_record() {
        let e = HierarchyExporter::new(
            ObjectType::Board,
            "parentID",
            "position",
            vec![board(10, Some(99), 5), board(11, Some(10), 0), board(12, Some(11), -3)],
        );
        assert_eq!(ids(&e), vec![10, 11, 12]);
        assert_eq!(parent_of(&e, 10), None);
        assert_eq!(parent_of(&e, 11), Some(SourceId::Int(10)));
        assert_eq!(parent_of(&e, 12), Some(SourceId::Int(11)));
    }

    #[test]
    fn branch_into_a_cycle_follows_the_cycle() {
        let e = HierarchyExporter::new(
            ObjectType::Board,
            "parentID",
            "position",
            vec![board(4, Some(3), -1), board(2, Some(3), 0), board(3, Some(2), 0)],
        );
        assert_eq!(ids(&e), vec![2, 3, 4]);
        assert_eq!(parent_of(&e, 2), None);
        assert_eq!(parent_of(&e, 4), Some(SourceId::Int(3)));
    }

    #[test]
    fn deep_chains_do_not_recurse() {
        let mut records = vec![board(1, None, 0)];
        for id in 2..20_000 {
            records.push(board(id, Some(id - 1), 0));
        }
        records.reverse();
        let e = HierarchyExporter::new(ObjectType::Board, "parentID", "position", records);
        let order = ids(&e);
        assert_eq!(order.len(), 19_999);
        assert!(order.windows(2).all(|w| w[0] + 1 == w[1]));
    }

    #[test]
    fn windows_slice_the_order() {
        let e = HierarchyExporter::new(
            ObjectType::Board,
            "parentID",
            "position",
            vec![board(1, None, 0), board(2, Some(1), 0), board(3, None, 1)],
        );
        let rows = e.export(Window::new(1, 5)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].as_ref().unwrap().source_id, Some(SourceId::Int(2)));
    }
}

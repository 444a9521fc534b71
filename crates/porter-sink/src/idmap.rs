//! Write-once source to destination id mapping.

use std::collections::{BTreeMap, HashMap};

use porter_types::{DestinationId, ObjectType, SourceId};

use crate::error::{Result, SinkError};

/// Per object type, the destination id assigned to each source id.
///
/// Entries are append-only: recording the same pair again is a no-op and
/// recording a different destination for a mapped source id is a
/// [`SinkError::Conflict`]. Relation markers (`0`, `""`) are never stored.
#[derive(Clone, Debug, Default)]
pub struct IdMap {
    maps: BTreeMap<ObjectType, HashMap<SourceId, DestinationId>>,
}

impl IdMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `source_id -> destination` for `object_type`.
    pub fn insert(
        &mut self,
        object_type: ObjectType,
        source_id: SourceId,
        destination: DestinationId,
    ) -> Result<()> {
        if source_id.is_relation() {
            return Ok(());
        }
        let map = self.maps.entry(object_type).or_default();
        match map.get(&source_id) {
            Some(&existing) if existing == destination => Ok(()),
            Some(&existing) => Err(SinkError::Conflict {
                object: object_type,
                source_id,
                existing,
                attempted: destination,
            }),
            None => {
                map.insert(source_id, destination);
                Ok(())
            }
        }
    }

    pub fn get(&self, object_type: ObjectType, source_id: &SourceId) -> Option<DestinationId> {
        self.maps.get(&object_type)?.get(source_id).copied()
    }

    /// Number of mapped source ids of `object_type`.
    pub fn len(&self, object_type: ObjectType) -> usize {
        self.maps.get(&object_type).map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.maps.values().all(HashMap::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn write_once() {
        let mut ids = IdMap::new();
        ids.insert(ObjectType::User, SourceId::Int(5), DestinationId::new(1)).unwrap();
        ids.insert(ObjectType::User, SourceId::Int(5), DestinationId::new(1)).unwrap();
        let err = ids
            .insert(ObjectType::User, SourceId::Int(5), DestinationId::new(2))
            .unwrap_err();
        assert!(matches!(err, SinkError::Conflict { existing, .. } if existing == DestinationId::new(1)));
        assert_eq!(ids.get(ObjectType::User, &SourceId::Int(5)), Some(DestinationId::new(1)));
    }

    #[test]
    fn types_are_separate_namespaces() {
        let mut ids = IdMap::new();
        ids.insert(ObjectType::User, SourceId::Int(1), DestinationId::new(10)).unwrap();
        ids.insert(ObjectType::Board, SourceId::Int(1), DestinationId::new(20)).unwrap();
        assert_eq!(ids.get(ObjectType::Board, &SourceId::Int(1)), Some(DestinationId::new(20)));
        assert_eq!(ids.get(ObjectType::Post, &SourceId::Int(1)), None);
        assert_eq!(ids.len(ObjectType::User), 1);
    }

    #[test]
    fn relation_markers_are_not_stored() {
        let mut ids = IdMap::new();
        ids.insert(ObjectType::PostLike, SourceId::Int(0), DestinationId::new(1)).unwrap();
        ids.insert(ObjectType::PostLike, SourceId::Int(0), DestinationId::new(2)).unwrap();
        assert!(ids.is_empty());
    }

    proptest! {
        #[test]
        fn first_assignment_is_stable(
            ops in prop::collection::vec((1i64..20, 1u64..100), 1..80),
        ) {
            let mut ids = IdMap::new();
            let mut first: HashMap<i64, u64> = HashMap::new();
            for (src, dst) in ops {
                let _ = ids.insert(ObjectType::Thread, SourceId::Int(src), DestinationId::new(dst));
                first.entry(src).or_insert(dst);
            }
            for (src, dst) in first {
                prop_assert_eq!(
                    ids.get(ObjectType::Thread, &SourceId::Int(src)),
                    Some(DestinationId::new(dst))
                );
            }
        }
    }
}

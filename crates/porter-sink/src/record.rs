use serde::{Deserialize, Serialize};

use porter_types::{AssociationKind, DestinationId, FieldMap, ObjectType, SourceId};

/// An association whose targets are already destination ids.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAssociation {
    pub kind: AssociationKind,
    pub target: ObjectType,
    pub destination_ids: Vec<DestinationId>,
}

/// A fully composed record handed to the sink.
///
/// Transcoding is done and every reference field already holds a
/// destination id (or its fallback).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub object_type: ObjectType,
    /// `None` for relation rows.
    pub source_id: Option<SourceId>,
    pub fields: FieldMap,
    #[serde(default)]
    pub aux: FieldMap,
    #[serde(default)]
    pub associations: Vec<ResolvedAssociation>,
}

impl ImportRecord {
    pub fn new(object_type: ObjectType, source_id: Option<SourceId>, fields: FieldMap) -> Self {
        Self {
            object_type,
            source_id: source_id.filter(|id| !id.is_relation()),
            fields,
            aux: FieldMap::new(),
            associations: Vec::new(),
        }
    }

    /// The source id when the record has a per-row identity.
    pub fn identity(&self) -> Option<&SourceId> {
        self.source_id.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_markers_drop_identity() {
        let like = ImportRecord::new(ObjectType::PostLike, Some(SourceId::Int(0)), FieldMap::new());
        assert!(like.identity().is_none());
        let user = ImportRecord::new(ObjectType::User, Some(SourceId::Int(4)), FieldMap::new());
        assert_eq!(user.identity(), Some(&SourceId::Int(4)));
    }
}
